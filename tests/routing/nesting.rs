//! Nested scopes: shadowing and exact restoration

use crate::common::*;

#[tokio::test]
async fn inner_scope_shadows_then_outer_is_visible_again() {
    let coord = coordinator();
    let router = coord.router().clone();
    let nested = coord.clone();

    let (outer_id, inner_id) = coord
        .run_in_transaction(|outer| async move {
            let outer_id = outer.id();
            router.put("before", Value::Int(1)).await?;

            let r = router.clone();
            let inner_id = nested
                .run_in_transaction(|inner| async move {
                    assert_eq!(r.active_handle(), Some(inner.id()));
                    assert_eq!(r.depth(), 2);
                    r.put("inside", Value::Int(2)).await?;
                    Ok::<_, Error>(inner.id())
                })
                .await?;

            assert_eq!(router.active_handle(), Some(outer_id));
            assert_eq!(router.depth(), 1);
            router.put("after", Value::Int(3)).await?;
            Ok::<_, Error>((outer_id, inner_id))
        })
        .await
        .unwrap();

    assert_ne!(outer_id, inner_id);
    assert_eq!(ops_for(&coord, "before")[0].target, HandleKind::Transaction(outer_id));
    assert_eq!(ops_for(&coord, "inside")[0].target, HandleKind::Transaction(inner_id));
    assert_eq!(ops_for(&coord, "after")[0].target, HandleKind::Transaction(outer_id));
    assert!(!coord.router().in_transaction());
}

#[tokio::test]
async fn failing_inner_scope_restores_outer_handle() {
    let coord = coordinator();
    let router = coord.router().clone();
    let nested = coord.clone();

    coord
        .run_in_transaction(|outer| async move {
            let r = router.clone();
            let inner: Result<()> = nested
                .run_in_transaction(|_inner| async move {
                    r.put("doomed", Value::Int(1)).await?;
                    Err(Error::Conflict("inner fails".into()))
                })
                .await;
            assert!(inner.is_err());
            assert_eq!(router.active_handle(), Some(outer.id()));
            router.put("kept", Value::Int(1)).await
        })
        .await
        .unwrap();

    assert_eq!(coord.driver().committed("doomed"), None);
    assert_eq!(coord.driver().committed("kept"), Some(Value::Int(1)));
    let metrics = coord.metrics();
    assert_eq!(metrics.committed, 1);
    assert_eq!(metrics.rolled_back, 1);
}

#[tokio::test]
async fn timed_out_inner_scope_restores_outer_handle() {
    let coord = coordinator();
    let router = coord.router().clone();
    let nested = coord.clone();

    coord
        .run_in_transaction(|outer| async move {
            let options = TransactionOptions::new().timeout(Duration::from_millis(10));
            let inner: Result<()> = nested
                .run_in_transaction_with(options, |_inner| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(())
                })
                .await;
            assert!(inner.unwrap_err().is_timeout());
            assert_eq!(router.active_handle(), Some(outer.id()));
            Ok::<_, Error>(())
        })
        .await
        .unwrap();

    assert_eq!(coord.metrics().timed_out, 1);
    assert_eq!(coord.metrics().committed, 1);
}

#[tokio::test]
async fn sequential_scopes_get_distinct_handles() {
    let coord = coordinator();
    let first = coord
        .run_in_transaction(|tx| async move { Ok::<_, Error>(tx.id()) })
        .await
        .unwrap();
    let second = coord
        .run_in_transaction(|tx| async move { Ok::<_, Error>(tx.id()) })
        .await
        .unwrap();
    assert_ne!(first, second);
    assert!(!coord.router().in_transaction());
}

#[tokio::test]
async fn nesting_limit_is_enforced_without_touching_the_driver() {
    let coord = Fixture::build(CoordinatorBuilder::new().max_nesting_depth(2));
    let level2 = coord.clone();
    let level3 = coord.clone();

    let result: Result<()> = coord
        .run_in_transaction(|_a| async move {
            level2
                .run_in_transaction(|_b| async move {
                    level3
                        .run_in_transaction(|_c| async { Ok::<_, Error>(()) })
                        .await
                })
                .await
        })
        .await;

    assert!(matches!(result, Err(Error::NestingTooDeep { depth: 3, limit: 2 })));
    assert_eq!(coord.metrics().started, 2);
    assert_eq!(coord.driver().journal().transactions().len(), 2);
}

#[tokio::test]
async fn inner_begin_failure_leaves_outer_scope_in_place() {
    let coord = coordinator();
    let router = coord.router().clone();
    let nested = coord.clone();

    let outer_id = coord
        .run_in_transaction(|outer| async move {
            router.put("before", Value::Int(1)).await?;

            nested.driver().faults().fail_next_begin();
            let mut ran = false;
            let inner: Result<()> = nested
                .run_in_transaction(|_inner| {
                    ran = true;
                    async { Ok(()) }
                })
                .await;
            assert!(matches!(inner, Err(Error::BeginFailed(_))));
            assert!(!ran);

            assert_eq!(router.active_handle(), Some(outer.id()));
            assert_eq!(router.depth(), 1);
            router.put("after", Value::Int(2)).await?;
            Ok::<_, Error>(outer.id())
        })
        .await
        .unwrap();

    assert_eq!(ops_for(&coord, "after")[0].target, HandleKind::Transaction(outer_id));
    assert_eq!(coord.driver().committed("before"), Some(Value::Int(1)));
    assert_eq!(coord.driver().committed("after"), Some(Value::Int(2)));
    let metrics = coord.metrics();
    assert_eq!(metrics.started, 1);
    assert_eq!(metrics.committed, 1);
    assert_eq!(metrics.active, 0);
    assert!(!coord.router().in_transaction());
}
