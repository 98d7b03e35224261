//! Core types and traits for txscope
//!
//! This crate defines the vocabulary shared by every layer:
//! - [`Value`]: what resources store
//! - [`HandleId`], [`SourceId`], [`CallGraphId`]: identifiers
//! - [`Resource`], [`Transaction`], [`Driver`]: the driver boundary
//! - [`Error`]: the unified error type

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use traits::{Driver, Handle, Resource, Transaction, TransactionOptions};
pub use types::{CallGraphId, HandleId, HandleKind, SourceId};
pub use value::Value;
