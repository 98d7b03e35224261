//! Property tests over arbitrary nesting and operation sequences

use crate::common::*;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(fut)
}

/// Open one scope per flag, each nested in the previous one
///
/// A level fails when its flag is set; its parent swallows the failure.
fn nest(
    coord: Fixture,
    flags: Arc<Vec<bool>>,
    level: usize,
) -> LocalBoxFuture<'static, Result<()>> {
    async move {
        let router = coord.router().clone();
        let inner = coord.clone();
        let fail = flags[level];
        coord
            .run_in_transaction(|tx| async move {
                assert_eq!(router.active_handle(), Some(tx.id()));
                assert_eq!(router.depth(), level + 1);
                if level + 1 < flags.len() {
                    let _ = nest(inner, Arc::clone(&flags), level + 1).await;
                    assert_eq!(router.active_handle(), Some(tx.id()));
                    assert_eq!(router.depth(), level + 1);
                }
                router
                    .put(&format!("level{}", level), Value::Int(level as i64))
                    .await?;
                if fail {
                    Err(Error::Conflict(format!("level {} fails", level)))
                } else {
                    Ok(())
                }
            })
            .await
    }
    .boxed_local()
}

proptest! {
    #[test]
    fn nested_scopes_restore_exactly(flags in prop::collection::vec(any::<bool>(), 1..6)) {
        let coord = coordinator();
        let flags = Arc::new(flags);
        let outcome = block_on(txscope::enter(nest(coord.clone(), Arc::clone(&flags), 0)));

        prop_assert_eq!(outcome.is_err(), flags[0]);
        prop_assert!(!coord.router().in_transaction());

        let failures = flags.iter().filter(|f| **f).count() as u64;
        let metrics = coord.metrics();
        prop_assert_eq!(metrics.started, flags.len() as u64);
        prop_assert_eq!(metrics.rolled_back, failures);
        prop_assert_eq!(metrics.committed, flags.len() as u64 - failures);
        prop_assert_eq!(metrics.active, 0);

        for (level, fail) in flags.iter().enumerate() {
            let stored = coord.driver().committed(&format!("level{}", level));
            if *fail {
                prop_assert_eq!(stored, None);
            } else {
                prop_assert_eq!(stored, Some(Value::Int(level as i64)));
            }
        }
    }

    #[test]
    fn scope_outcome_decides_visibility(
        ops in prop::collection::vec((0u8..4, prop::option::of(-100i64..100)), 0..20),
        commit in any::<bool>(),
    ) {
        let coord = coordinator();
        let router = coord.router().clone();
        let script = ops.clone();

        let result: Result<()> = block_on(coord.run_in_transaction(|_tx| async move {
            let mut model = BTreeMap::new();
            for (slot, value) in script {
                let key = format!("k{}", slot);
                match value {
                    Some(v) => {
                        router.put(&key, Value::Int(v)).await?;
                        model.insert(key.clone(), v);
                    }
                    None => {
                        let existed = router.delete(&key).await?;
                        assert_eq!(existed, model.remove(&key).is_some());
                    }
                }
                assert_eq!(router.get(&key).await?, model.get(&key).map(|v| Value::Int(*v)));
            }
            if commit {
                Ok(())
            } else {
                Err(Error::Conflict("abandon".into()))
            }
        }));
        prop_assert_eq!(result.is_ok(), commit);

        let mut expected = BTreeMap::new();
        if commit {
            for (slot, value) in &ops {
                let key = format!("k{}", slot);
                match value {
                    Some(v) => { expected.insert(key, *v); }
                    None => { expected.remove(&key); }
                }
            }
        }
        for slot in 0u8..4 {
            let key = format!("k{}", slot);
            prop_assert_eq!(
                coord.driver().committed(&key),
                expected.get(&key).map(|v| Value::Int(*v))
            );
        }
    }
}
