//! Call-graph entry and context propagation
//!
//! `tokio::spawn` and `spawn_blocking` start tasks with empty task-local
//! storage. These helpers carry the parent's context into the child so that
//! descendants of a unit of work keep routing to its active handle.
//!
//! - [`enter`]: start an independently-triggered unit of work (e.g. one
//!   inbound request) with a fresh call-graph token
//! - [`propagate`]: capture the current context now, apply it when polled
//! - [`spawn`] / [`spawn_blocking`]: spawn with the current context
//!
//! A propagated child sees the handle that was active when it was spawned.
//! Once the scope that opened the handle closes, the driver refuses further
//! operations on it, so a child that outlives its parent's scope fails
//! loudly instead of writing outside the transaction.

use crate::context::{self, CallGraphContext};
use std::future::Future;
use tokio::task::JoinHandle;
use txscope_core::CallGraphId;

/// Run `fut` as a new, independent call graph
///
/// Nothing is active inside, even if the caller had an active handle.
pub async fn enter<F>(fut: F) -> F::Output
where
    F: Future,
{
    let ctx = CallGraphContext::root();
    tracing::trace!(call_graph = %ctx.graph(), "entering call graph");
    context::scoped(ctx, fut).await
}

/// Run `fut` as a new call graph and return its token alongside the output
pub async fn enter_with_id<F>(fut: F) -> (CallGraphId, F::Output)
where
    F: Future,
{
    let ctx = CallGraphContext::root();
    let graph = ctx.graph();
    let output = context::scoped(ctx, fut).await;
    (graph, output)
}

/// Bind `fut` to the context visible right now
///
/// Outside any call graph the future gets a fresh root context.
pub fn propagate<F>(fut: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    let ctx = context::current().unwrap_or_else(CallGraphContext::root);
    context::scoped(ctx, fut)
}

/// Spawn `fut` on the runtime, carrying the current context
pub fn spawn<F>(fut: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(propagate(fut))
}

/// Run blocking `f` on the blocking pool, carrying the current context
pub fn spawn_blocking<F, R>(f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let ctx = context::current().unwrap_or_else(CallGraphContext::root);
    tokio::task::spawn_blocking(move || context::sync_scoped(ctx, f))
}
