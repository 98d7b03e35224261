//! Concurrent call graphs sharing one router

use crate::common::*;
use tokio::task::JoinSet;

const TASKS: usize = 32;
const WRITES: usize = 4;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interleaved_call_graphs_never_see_each_others_handles() {
    let coord = coordinator();
    let mut set = JoinSet::new();

    for i in 0..TASKS {
        let coord = coord.clone();
        set.spawn(txscope::enter(async move {
            let router = coord.router().clone();
            if i % 2 == 0 {
                let id = coord
                    .run_in_transaction(|tx| async move {
                        for n in 0..WRITES {
                            record_visit(&router, &format!("u{}:{}", i, n)).await?;
                            assert_eq!(router.active_handle(), Some(tx.id()));
                        }
                        Ok::<_, Error>(tx.id())
                    })
                    .await?;
                Ok::<_, Error>((i, Some(id)))
            } else {
                for n in 0..WRITES {
                    record_visit(&router, &format!("u{}:{}", i, n)).await?;
                    assert!(!router.in_transaction());
                }
                Ok((i, None))
            }
        }));
    }

    let mut seen = Vec::new();
    while let Some(joined) = set.join_next().await {
        seen.push(joined.unwrap().unwrap());
    }
    assert_eq!(seen.len(), TASKS);

    let ops = coord.driver().journal().ops();
    for (i, id) in seen {
        let expected = match id {
            Some(id) => HandleKind::Transaction(id),
            None => HandleKind::Default,
        };
        let prefix = format!("u{}:", i);
        let mine: Vec<_> = ops.iter().filter(|r| r.key.starts_with(&prefix)).collect();
        // one get and one put per visit
        assert_eq!(mine.len(), WRITES * 2);
        assert!(mine.iter().all(|r| r.target == expected), "task {} misrouted", i);
        for n in 0..WRITES {
            assert_eq!(
                coord.driver().committed(&format!("u{}:{}", i, n)),
                Some(Value::Int(1))
            );
        }
    }

    let metrics = coord.metrics();
    assert_eq!(metrics.committed, (TASKS / 2) as u64);
    assert_eq!(metrics.active, 0);
}

#[tokio::test]
async fn two_scopes_polled_on_one_task_stay_separate() {
    let coord = coordinator();
    let a = coord.clone();
    let b = coord.clone();

    let left = txscope::enter(async move {
        let router = a.router().clone();
        a.run_in_transaction(|tx| async move {
            for n in 0..3 {
                record_visit(&router, &format!("left:{}", n)).await?;
                assert_eq!(router.active_handle(), Some(tx.id()));
            }
            Ok::<_, Error>(tx.id())
        })
        .await
    });
    let right = txscope::enter(async move {
        let router = b.router().clone();
        b.run_in_transaction(|tx| async move {
            for n in 0..3 {
                record_visit(&router, &format!("right:{}", n)).await?;
                assert_eq!(router.active_handle(), Some(tx.id()));
            }
            Ok::<_, Error>(tx.id())
        })
        .await
    });

    let (left, right) = futures::join!(left, right);
    let (left, right) = (left.unwrap(), right.unwrap());
    assert_ne!(left, right);

    for record in coord.driver().journal().ops() {
        let expected = if record.key.starts_with("left:") { left } else { right };
        assert_eq!(record.target, HandleKind::Transaction(expected));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scoped_and_unscoped_work_race_on_the_same_key() {
    let coord = coordinator();
    let scoped = coord.clone();
    let plain = coord.clone();

    let in_tx = tokio::spawn(txscope::enter(async move {
        let router = scoped.router().clone();
        scoped
            .run_in_transaction(|_tx| async move {
                router.put("shared", Value::Int(100)).await?;
                tokio::time::sleep(Duration::from_millis(20)).await;
                router.get("shared").await
            })
            .await
    }));
    let outside = tokio::spawn(txscope::enter(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        plain.router().put("shared", Value::Int(1)).await
    }));

    outside.await.unwrap().unwrap();
    // the transaction reads its own buffered write
    assert_eq!(in_tx.await.unwrap().unwrap(), Some(Value::Int(100)));
    assert_eq!(coord.driver().committed("shared"), Some(Value::Int(100)));
}
