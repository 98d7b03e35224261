//! # txscope
//!
//! Call-graph scoped transactional resource routing.
//!
//! Code deep inside a request handler keeps calling the same [`Router`]; while
//! a transactional scope is open on that request's call graph, the router
//! sends every operation to the scope's transaction instead of the default
//! resource. Nobody threads a transaction handle through function signatures.
//!
//! ## Quick Start
//!
//! ```ignore
//! use txscope::prelude::*;
//!
//! let coordinator = Coordinator::new(MemoryDriver::new());
//! let router = coordinator.router().clone();
//!
//! // Outside a scope: default handle
//! router.put("visits", Value::Int(1)).await?;
//!
//! // Inside a scope: the scope's transaction, also in helpers
//! coordinator
//!     .run_in_transaction(|_tx| async {
//!         record_order(&router).await?;   // uses the transaction
//!         Ok::<_, Error>(())
//!     })
//!     .await?;
//! ```
//!
//! ## Layers
//!
//! - [`txscope_core`]: values, ids, errors, driver boundary traits
//! - [`txscope_concurrency`]: the task-local call-graph context
//! - [`txscope_engine`]: [`Router`] and [`Coordinator`]
//! - [`txscope_storage`]: an in-memory reference driver
//!
//! ## Tasks
//!
//! `tokio::spawn` does not inherit the call-graph context. Use
//! [`spawn`] / [`spawn_blocking`] (or [`propagate`]) for children that should
//! keep routing to the parent's transaction, and [`enter`] at the top of each
//! independently-triggered unit of work.

#![warn(missing_docs)]

pub mod logging;
pub mod prelude;

pub use txscope_concurrency::{
    call_graph_id, enter, enter_with_id, in_call_graph, propagate, spawn, spawn_blocking,
};
pub use txscope_core::{
    CallGraphId, Driver, Error, Handle, HandleId, HandleKind, Resource, Result, SourceId,
    Transaction, TransactionOptions, Value,
};
pub use txscope_engine::{
    Coordinator, CoordinatorBuilder, CoordinatorConfig, Router, ScopeMetrics,
    DEFAULT_MAX_NESTING_DEPTH,
};
pub use txscope_storage::MemoryDriver;

pub use txscope_concurrency;
pub use txscope_core;
pub use txscope_engine;
pub use txscope_storage;
