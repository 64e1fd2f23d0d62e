//! Ambient context propagation
//!
//! The current context follows the logical flow of control, not the OS
//! thread. Inside an async [`scope`] it lives in a tokio task-local and moves
//! with the task across `.await` points and worker threads. A tokio task
//! outside any scope gets frames of its own, keyed by task id. Plain threads
//! (including the future driven by `block_on`) use a per-thread stack.
//! Synchronous [`enter_context`] guards nest on whichever stack is active for
//! the caller, and only ever restore that stack.

use borow_core::Context;
use dashmap::DashMap;
use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::task::Id as TaskId;

type Frames = Vec<Arc<Context>>;

struct ScopeFrames {
    scope: u64,
    frames: Frames,
}

impl ScopeFrames {
    fn new(frames: Frames) -> Self {
        Self {
            scope: NEXT_SCOPE.fetch_add(1, Ordering::Relaxed),
            frames,
        }
    }
}

static NEXT_SCOPE: AtomicU64 = AtomicU64::new(1);

/// Frames entered by tokio tasks that run outside any [`scope`], keyed by
/// task so that tasks sharing a worker thread never see each other's frames.
static TASK_FRAMES: OnceLock<DashMap<TaskId, Frames>> = OnceLock::new();

thread_local! {
    static THREAD_FRAMES: RefCell<Frames> = const { RefCell::new(Vec::new()) };
}

tokio::task_local! {
    static SCOPE_FRAMES: RefCell<ScopeFrames>;
}

fn task_frames() -> &'static DashMap<TaskId, Frames> {
    TASK_FRAMES.get_or_init(DashMap::new)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stack {
    Scope(u64),
    Task(TaskId),
    Thread,
}

fn active_stack() -> Stack {
    if let Ok(scope) = SCOPE_FRAMES.try_with(|frames| frames.borrow().scope) {
        return Stack::Scope(scope);
    }
    match tokio::task::try_id() {
        Some(id) => Stack::Task(id),
        None => Stack::Thread,
    }
}

/// Run `f` on the frames of `stack`. `None` when that stack is not reachable
/// from here (another scope is active, or thread-locals are torn down).
fn with_stack<R>(stack: Stack, f: impl FnOnce(&mut Frames) -> R) -> Option<R> {
    match stack {
        Stack::Scope(scope) => SCOPE_FRAMES
            .try_with(|frames| {
                let mut frames = frames.borrow_mut();
                if frames.scope != scope {
                    return None;
                }
                Some(f(&mut frames.frames))
            })
            .ok()
            .flatten(),
        Stack::Task(id) => {
            let mut frames = task_frames().entry(id).or_default();
            Some(f(&mut frames))
        }
        Stack::Thread => THREAD_FRAMES
            .try_with(|frames| f(&mut frames.borrow_mut()))
            .ok(),
    }
}

/// Restores the previously active context when dropped, including during
/// unwinding. Not `Send`: a guard belongs to the flow that entered it.
#[must_use = "the context is exited as soon as the guard is dropped"]
pub struct ContextGuard {
    stack: Stack,
    depth: Option<usize>,
    _flow: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let Some(depth) = self.depth else { return };
        match self.stack {
            Stack::Task(id) => {
                if let Some(mut frames) = task_frames().get_mut(&id) {
                    frames.truncate(depth);
                }
                task_frames().remove_if(&id, |_, frames| frames.is_empty());
            }
            stack => {
                let restored = with_stack(stack, |frames| frames.truncate(depth));
                if restored.is_none() {
                    tracing::debug!(?stack, "Context guard dropped outside the flow that entered it");
                }
            }
        }
    }
}

impl std::fmt::Debug for ContextGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextGuard")
            .field("stack", &self.stack)
            .field("depth", &self.depth)
            .finish()
    }
}

fn push(context: Arc<Context>) -> ContextGuard {
    let stack = active_stack();
    let depth = with_stack(stack, |frames| {
        let depth = frames.len();
        frames.push(context);
        depth
    });
    ContextGuard {
        stack,
        depth,
        _flow: PhantomData,
    }
}

/// Make `context` current until the returned guard is dropped.
pub fn enter_context(context: Context) -> ContextGuard {
    tracing::trace!(context = %context.name, "Entering context");
    push(Arc::new(context))
}

/// The context active for the calling flow, if any.
pub fn current_context() -> Option<Context> {
    current_frame().map(|ctx| (*ctx).clone())
}

pub(crate) fn current_frame() -> Option<Arc<Context>> {
    match active_stack() {
        Stack::Task(id) => task_frames()
            .get(&id)
            .and_then(|frames| frames.last().cloned()),
        stack => with_stack(stack, |frames| frames.last().cloned()).flatten(),
    }
}

/// Run `f` with `context` entered.
pub fn with_context<R>(context: Context, f: impl FnOnce() -> R) -> R {
    let _guard = enter_context(context);
    f()
}

/// Run `future` with `context` as its ambient context. The context flows with
/// the task and is invisible to every other task.
pub async fn scope<F>(context: Context, future: F) -> F::Output
where
    F: Future,
{
    SCOPE_FRAMES
        .scope(RefCell::new(ScopeFrames::new(vec![Arc::new(context)])), future)
        .await
}

/// `tokio::spawn` that hands the caller's current context to the new task.
/// A caller with no context spawns a task with none, regardless of what the
/// polling worker thread has entered.
pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let frames: Vec<_> = current_frame().into_iter().collect();
    tokio::spawn(SCOPE_FRAMES.scope(RefCell::new(ScopeFrames::new(frames)), future))
}

/// `std::thread::spawn` that hands the caller's current context to the new thread.
pub fn spawn_thread<F, R>(f: F) -> std::thread::JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let inherited = current_frame();
    std::thread::spawn(move || {
        let _guard = inherited.map(push);
        f()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outside_scope_uses_thread_stack() {
        assert_eq!(active_stack(), Stack::Thread);
        let guard = enter_context(Context::new("t"));
        assert_eq!(guard.stack, Stack::Thread);
        assert_eq!(guard.depth, Some(0));
    }

    #[tokio::test]
    async fn test_inside_scope_uses_scope_stack() {
        scope(Context::new("outer"), async {
            assert!(matches!(active_stack(), Stack::Scope(_)));
            let guard = enter_context(Context::new("inner"));
            assert_eq!(guard.depth, Some(1));
        })
        .await;
    }

    #[tokio::test]
    async fn test_unscoped_task_uses_own_frames_and_cleans_up() {
        let id = tokio::spawn(async {
            let id = tokio::task::id();
            assert_eq!(active_stack(), Stack::Task(id));
            let guard = enter_context(Context::new("task"));
            assert!(task_frames().contains_key(&id));
            drop(guard);
            id
        })
        .await
        .unwrap();
        assert!(!task_frames().contains_key(&id));
    }

    #[tokio::test]
    async fn test_guard_from_another_scope_leaves_current_scope_alone() {
        let stray = scope(Context::new("first"), async { enter_context(Context::new("stray")) }).await;
        scope(Context::new("second"), async move {
            let _inner = enter_context(Context::new("inner"));
            drop(stray);
            assert_eq!(current_context().map(|c| c.name).as_deref(), Some("inner"));
        })
        .await;
    }
}
