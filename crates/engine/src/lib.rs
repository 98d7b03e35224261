//! Routing engine for txscope
//!
//! This crate provides:
//! - [`Router`]: late-binding dispatch to the active transaction or the
//!   default handle
//! - [`Coordinator`]: the scope manager, the only component that installs
//!   handles into the call-graph context
//! - [`CoordinatorConfig`] / [`CoordinatorBuilder`]: configuration
//! - [`ScopeMetrics`]: scope counters

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod coordinator;
pub mod metrics;
pub mod router;

pub use config::{CoordinatorBuilder, CoordinatorConfig, DEFAULT_MAX_NESTING_DEPTH};
pub use coordinator::Coordinator;
pub use metrics::ScopeMetrics;
pub use router::Router;
