//! Tests for ambient context propagation: nesting, unwinding, task isolation

use borow_runtime::*;
use std::sync::Arc;

fn named(name: &str) -> Context {
    Context::new(name)
}

fn current_name() -> Option<String> {
    current_context().map(|c| c.name)
}

// ===========================================================================
// Synchronous scoping
// ===========================================================================

#[test]
fn no_context_by_default() {
    assert!(current_context().is_none());
}

#[test]
fn nested_enter_restores_outer_then_none() {
    let outer = enter_context(named("outer"));
    assert_eq!(current_name().as_deref(), Some("outer"));

    let inner = enter_context(named("inner").with_respect_level(5));
    assert_eq!(current_context().unwrap().respect_level, 5);

    drop(inner);
    assert_eq!(current_context(), Some(named("outer")));

    drop(outer);
    assert!(current_context().is_none());
}

#[test]
fn guard_restores_on_panic() {
    let _outer = enter_context(named("outer"));
    let result = std::panic::catch_unwind(|| {
        let _inner = enter_context(named("inner"));
        panic!("boom");
    });
    assert!(result.is_err());
    assert_eq!(current_name().as_deref(), Some("outer"));
}

#[test]
fn with_context_scopes_closure() {
    let seen = with_context(named("closure"), current_name);
    assert_eq!(seen.as_deref(), Some("closure"));
    assert!(current_context().is_none());
}

#[test]
fn threads_do_not_share_entered_context() {
    let _guard = enter_context(named("main"));
    let seen = std::thread::spawn(current_name).join().unwrap();
    assert!(seen.is_none());
}

#[test]
fn spawn_thread_propagates_context() {
    let _guard = enter_context(named("parent"));
    let seen = spawn_thread(current_name).join().unwrap();
    assert_eq!(seen.as_deref(), Some("parent"));
    assert_eq!(current_name().as_deref(), Some("parent"));
}

// ===========================================================================
// Async scoping
// ===========================================================================

#[tokio::test]
async fn scope_sets_context_for_future() {
    let seen = scope(named("task"), async { current_name() }).await;
    assert_eq!(seen.as_deref(), Some("task"));
    assert!(current_context().is_none());
}

#[tokio::test]
async fn guard_inside_scope_survives_await() {
    scope(named("outer"), async {
        {
            let _inner = enter_context(named("inner"));
            tokio::task::yield_now().await;
            assert_eq!(current_name().as_deref(), Some("inner"));
        }
        assert_eq!(current_name().as_deref(), Some("outer"));
    })
    .await;
}

#[tokio::test]
async fn nested_scopes_restore_outer() {
    scope(named("outer"), async {
        let inner = scope(named("inner"), async { current_name() }).await;
        assert_eq!(inner.as_deref(), Some("inner"));
        assert_eq!(current_name().as_deref(), Some("outer"));
    })
    .await;
}

#[tokio::test]
async fn scope_hides_thread_context() {
    let _guard = enter_context(named("thread"));
    let seen = scope(named("task"), async { current_name() }).await;
    assert_eq!(seen.as_deref(), Some("task"));
    assert_eq!(current_name().as_deref(), Some("thread"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_scopes_are_isolated() {
    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let name = format!("flow-{}", i);
            tokio::spawn(scope(named(&name), async move {
                for _ in 0..50 {
                    tokio::task::yield_now().await;
                    assert_eq!(current_name().as_deref(), Some(name.as_str()));
                }
            }))
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        result.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn spawn_propagates_current_context() {
    let seen = scope(named("parent"), async {
        spawn(async {
            tokio::task::yield_now().await;
            current_name()
        })
        .await
        .unwrap()
    })
    .await;
    assert_eq!(seen.as_deref(), Some("parent"));
}

#[tokio::test]
async fn spawn_hands_entered_context_to_child() {
    let _guard = enter_context(named("entered"));
    let child = spawn(async { current_name() });
    let plain = tokio::spawn(async { current_name() });
    assert_eq!(child.await.unwrap().as_deref(), Some("entered"));
    assert!(plain.await.unwrap().is_none());
}

#[tokio::test]
async fn sibling_task_does_not_see_later_entered_context() {
    let (wake_tx, wake_rx) = tokio::sync::oneshot::channel::<()>();
    let sibling = tokio::spawn(async move {
        wake_rx.await.unwrap();
        current_name()
    });

    let _guard = enter_context(named("main-only"));
    wake_tx.send(()).unwrap();
    assert!(sibling.await.unwrap().is_none());
    assert_eq!(current_name().as_deref(), Some("main-only"));
}

#[tokio::test]
async fn local_tasks_do_not_share_entered_context() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let (entered_tx, entered_rx) = tokio::sync::oneshot::channel::<()>();
            let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();

            let holder = tokio::task::spawn_local(async move {
                let _guard = enter_context(named("holder"));
                entered_tx.send(()).unwrap();
                done_rx.await.unwrap();
                current_name()
            });
            let sibling = tokio::task::spawn_local(async move {
                entered_rx.await.unwrap();
                let seen = current_name();
                done_tx.send(()).unwrap();
                seen
            });

            assert!(sibling.await.unwrap().is_none());
            assert_eq!(holder.await.unwrap().as_deref(), Some("holder"));
        })
        .await;
}

#[tokio::test]
async fn spawn_without_context_sees_none() {
    let seen = spawn(async { current_name() }).await.unwrap();
    assert!(seen.is_none());
}

// ===========================================================================
// Acquisition under async scopes
// ===========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn acquisitions_record_their_own_flow_context() {
    let registry = Arc::new(ConceptRegistry::new());
    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let registry = registry.clone();
            let ctx = named(&format!("flow-{}", i)).with_respect_level(i);
            tokio::spawn(scope(ctx, async move {
                tokio::task::yield_now().await;
                let mut slot = i;
                let id = format!("flow-concept-{}", i);
                let meta = registry
                    .acquire(&mut slot, None, Some(id.as_str()), Callsite::new("slot", "flows.rs", 1))
                    .unwrap()
                    .metadata();
                meta
            }))
        })
        .collect();

    for (i, result) in futures::future::join_all(tasks).await.into_iter().enumerate() {
        let meta = result.unwrap();
        assert_eq!(meta.context_name, format!("flow-{}", i));
        assert_eq!(meta.respect_level, i as i32);
    }
    assert_eq!(registry.len(), 20);
}
