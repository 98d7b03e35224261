//! Call-graph context store
//!
//! Holds the active transactional handle for the logically current call
//! graph. The value lives in tokio task-local storage, so it follows the
//! future that carries it rather than the worker thread polling it:
//!
//! - Two futures scoped with different contexts never see each other's value,
//!   even when polled by the same worker, or joined inside the same task
//! - A value survives every `.await`, including resumption on another worker
//! - Leaving a scope restores the previous value, whether the inner future
//!   completed, panicked or was dropped
//!
//! ## Structure
//!
//! ```text
//! CallGraphContext { graph, frame } ──► Frame(source B, tx3, depth 1)
//!                                          │
//!                                          ▼
//!                                       Frame(source A, tx2, depth 2)
//!                                          │
//!                                          ▼
//!                                       Frame(source A, tx1, depth 1)
//! ```
//!
//! Frames are immutable. A nested scope pushes a new frame on top of the
//! current chain; the outer chain is untouched, which is what makes
//! restoration exact. Lookups walk the chain to the first frame of the asking
//! source, so coordinators of different resources do not interfere.
//!
//! [`with_handle`] is the only way to change the value, and it needs the
//! [`SourceKey`] of the source being shadowed. Keys are not `Clone`; the
//! coordinator that mints one keeps it private, so nothing else can install
//! a handle that its router would pick up.

use std::future::Future;
use std::sync::Arc;
use txscope_core::{CallGraphId, Handle, HandleId, SourceId};

tokio::task_local! {
    static CONTEXT: CallGraphContext;
}

/// Exclusive right to install handles for one [`SourceId`]
///
/// Every key carries a freshly generated source, so holding a key never
/// grants access to a source minted by someone else.
#[derive(Debug)]
pub struct SourceKey {
    source: SourceId,
}

impl SourceKey {
    /// Mint a key for a new, unique source
    pub fn new() -> Self {
        SourceKey {
            source: SourceId::new(),
        }
    }

    /// The source this key installs handles for
    pub fn source(&self) -> SourceId {
        self.source
    }
}

impl Default for SourceKey {
    fn default() -> Self {
        Self::new()
    }
}

/// One node of the active-handle chain
struct Frame {
    source: SourceId,
    handle: Handle,
    /// Number of frames of `source` in the chain, this one included
    depth: usize,
    parent: Option<Arc<Frame>>,
}

/// Immutable snapshot of a call graph's ambient values
#[derive(Clone)]
pub struct CallGraphContext {
    graph: CallGraphId,
    frame: Option<Arc<Frame>>,
}

impl CallGraphContext {
    /// Context for a freshly triggered unit of work: new id, nothing active
    pub fn root() -> Self {
        CallGraphContext {
            graph: CallGraphId::new(),
            frame: None,
        }
    }

    /// The call-graph token
    pub fn graph(&self) -> CallGraphId {
        self.graph
    }

    /// Active handle for `source`, if any
    pub fn handle(&self, source: SourceId) -> Option<Handle> {
        self.find(source).map(|frame| frame.handle.clone())
    }

    /// Nesting depth for `source` (0 when nothing is active)
    pub fn depth(&self, source: SourceId) -> usize {
        self.find(source).map_or(0, |frame| frame.depth)
    }

    /// Number of frames across all sources
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut cursor = self.frame.as_deref();
        while let Some(frame) = cursor {
            count += 1;
            cursor = frame.parent.as_deref();
        }
        count
    }

    /// Check if no handle is active for any source
    pub fn is_empty(&self) -> bool {
        self.frame.is_none()
    }

    /// A child context with `handle` shadowing the current one for `source`
    fn push(&self, source: SourceId, handle: Handle) -> Self {
        let depth = self.depth(source) + 1;
        CallGraphContext {
            graph: self.graph,
            frame: Some(Arc::new(Frame {
                source,
                handle,
                depth,
                parent: self.frame.clone(),
            })),
        }
    }

    fn find(&self, source: SourceId) -> Option<&Frame> {
        let mut cursor = self.frame.as_deref();
        while let Some(frame) = cursor {
            if frame.source == source {
                return Some(frame);
            }
            cursor = frame.parent.as_deref();
        }
        None
    }
}

impl std::fmt::Debug for CallGraphContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut handles: Vec<HandleId> = Vec::new();
        let mut cursor = self.frame.as_deref();
        while let Some(frame) = cursor {
            handles.push(frame.handle.id());
            cursor = frame.parent.as_deref();
        }
        f.debug_struct("CallGraphContext")
            .field("graph", &self.graph)
            .field("handles", &handles)
            .finish()
    }
}

/// Snapshot of the current context, `None` outside any call graph
pub fn current() -> Option<CallGraphContext> {
    CONTEXT.try_with(|ctx| ctx.clone()).ok()
}

/// Active handle for `source` in the current call graph
///
/// `None` is a valid state: callers fall back to the default resource.
pub fn active_handle(source: SourceId) -> Option<Handle> {
    CONTEXT.try_with(|ctx| ctx.handle(source)).ok().flatten()
}

/// Nesting depth for `source` in the current call graph
pub fn depth(source: SourceId) -> usize {
    CONTEXT.try_with(|ctx| ctx.depth(source)).unwrap_or(0)
}

/// Token of the current call graph
pub fn call_graph_id() -> Option<CallGraphId> {
    CONTEXT.try_with(|ctx| ctx.graph).ok()
}

/// Whether the caller runs inside a call graph
pub fn in_call_graph() -> bool {
    CONTEXT.try_with(|_| ()).is_ok()
}

/// Run `fut` with `handle` active for the key's source
///
/// The new frame is computed when the returned future is first polled, from
/// the context visible at that point. Outside any call graph a new one is
/// started. The previous value is visible again as soon as `fut` finishes,
/// before the output reaches the caller; dropping the returned future early
/// restores it as well.
pub fn with_handle<F>(key: &SourceKey, handle: Handle, fut: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    let source = key.source;
    async move {
        let ctx = current().unwrap_or_else(CallGraphContext::root).push(source, handle);
        tracing::trace!(
            call_graph = %ctx.graph,
            source = %source,
            depth = ctx.depth(source),
            "installing handle"
        );
        CONTEXT.scope(ctx, fut).await
    }
}

/// Synchronous variant of [`with_handle`] for blocking sections
pub fn with_handle_sync<F, R>(key: &SourceKey, handle: Handle, f: F) -> R
where
    F: FnOnce() -> R,
{
    let ctx = current()
        .unwrap_or_else(CallGraphContext::root)
        .push(key.source, handle);
    CONTEXT.sync_scope(ctx, f)
}

/// Run `fut` with an explicit context
pub(crate) async fn scoped<F>(ctx: CallGraphContext, fut: F) -> F::Output
where
    F: Future,
{
    CONTEXT.scope(ctx, fut).await
}

/// Run `f` synchronously with an explicit context
pub(crate) fn sync_scoped<F, R>(ctx: CallGraphContext, f: F) -> R
where
    F: FnOnce() -> R,
{
    CONTEXT.sync_scope(ctx, f)
}
