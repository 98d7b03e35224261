//! Carrying the active handle into spawned work

use crate::common::*;
use tokio::sync::oneshot;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn spawned_children_inherit_only_through_txscope_spawn() {
    let coord = coordinator();
    let router = coord.router().clone();

    let id = coord
        .run_in_transaction(|tx| async move {
            let carried = router.clone();
            let child = txscope::spawn(async move {
                record_visit(&carried, "carried").await?;
                Ok::<_, Error>(carried.active_handle())
            });
            let detached = router.clone();
            let orphan = tokio::spawn(async move {
                record_visit(&detached, "detached").await?;
                Ok::<_, Error>(detached.active_handle())
            });

            assert_eq!(child.await.unwrap()?, Some(tx.id()));
            assert_eq!(orphan.await.unwrap()?, None);
            Ok::<_, Error>(tx.id())
        })
        .await
        .unwrap();

    assert_eq!(ops_for(&coord, "carried")[1].target, HandleKind::Transaction(id));
    assert_eq!(ops_for(&coord, "detached")[1].target, HandleKind::Default);
    assert_eq!(coord.driver().committed("carried"), Some(Value::Int(1)));
    assert_eq!(coord.driver().committed("detached"), Some(Value::Int(1)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_work_inherits_the_transaction() {
    let coord = coordinator();
    let router = coord.router().clone();

    let id = coord
        .run_in_transaction(|tx| async move {
            let r = router.clone();
            let seen = txscope::spawn_blocking(move || {
                let runtime = tokio::runtime::Handle::current();
                runtime.block_on(r.put("from-blocking", Value::Int(9)))?;
                Ok::<_, Error>(r.active_handle())
            })
            .await
            .unwrap()?;
            assert_eq!(seen, Some(tx.id()));
            Ok::<_, Error>(tx.id())
        })
        .await
        .unwrap();

    assert_eq!(
        ops_for(&coord, "from-blocking")[0].target,
        HandleKind::Transaction(id)
    );
    assert_eq!(coord.driver().committed("from-blocking"), Some(Value::Int(9)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn child_outliving_its_scope_fails_loudly() {
    let coord = coordinator();
    let router = coord.router().clone();
    let (go_tx, go_rx) = oneshot::channel::<()>();

    let child = coord
        .run_in_transaction(|_tx| async move {
            let late = router.clone();
            let child = txscope::spawn(async move {
                let _ = go_rx.await;
                late.put("too-late", Value::Int(1)).await
            });
            Ok::<_, Error>(child)
        })
        .await
        .unwrap();

    go_tx.send(()).unwrap();
    let result = child.await.unwrap();
    assert!(matches!(result, Err(Error::TransactionNotActive { .. })));
    assert_eq!(coord.driver().committed("too-late"), None);
}

#[tokio::test]
async fn propagate_binds_context_at_creation() {
    let coord = coordinator();
    let router = coord.router().clone();

    let (id, pending) = coord
        .run_in_transaction(|tx| async move {
            let r = router.clone();
            let pending = txscope::propagate(async move { r.active_handle() });
            Ok::<_, Error>((tx.id(), pending))
        })
        .await
        .unwrap();

    // the scope is gone, but the captured context still names its handle
    assert_eq!(pending.await, Some(id));
    assert!(!coord.router().in_transaction());
}

#[tokio::test]
async fn enter_inside_a_scope_starts_clean() {
    let coord = coordinator();
    let router = coord.router().clone();

    coord
        .run_in_transaction(|tx| async move {
            let graph = txscope::call_graph_id();
            let r = router.clone();
            let (fresh, inside) = txscope::enter_with_id(async move {
                r.put("fresh", Value::Int(1)).await?;
                Ok::<_, Error>(r.in_transaction())
            })
            .await;
            assert!(!inside?);
            assert_ne!(Some(fresh), graph);
            assert_eq!(router.active_handle(), Some(tx.id()));
            Ok::<_, Error>(())
        })
        .await
        .unwrap();

    assert_eq!(ops_for(&coord, "fresh")[0].target, HandleKind::Default);
}

#[tokio::test]
async fn call_graph_token_is_shared_by_children() {
    let (root, (here, child)) = txscope::enter_with_id(async {
        let here = txscope::call_graph_id();
        let child = txscope::spawn(async { txscope::call_graph_id() })
            .await
            .unwrap();
        (here, child)
    })
    .await;
    assert_eq!(here, Some(root));
    assert_eq!(child, Some(root));
    assert!(!txscope::in_call_graph());
}
