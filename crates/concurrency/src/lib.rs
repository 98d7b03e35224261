//! Concurrency layer for txscope
//!
//! This crate implements the call-graph context store:
//! - [`context`]: task-local active-handle chain and its scoped-set operation
//! - [`propagate`]: call-graph entry and context-carrying spawn helpers
//!
//! The store needs no locks: isolation comes from tokio task-local storage,
//! which swaps the carried value in and out around every poll.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod propagate;

pub use context::{
    active_handle, call_graph_id, current, depth, in_call_graph, with_handle, with_handle_sync,
    CallGraphContext, SourceKey,
};
pub use propagate::{enter, enter_with_id, propagate, spawn, spawn_blocking};
