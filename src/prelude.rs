//! Convenient imports for txscope.
//!
//! ```ignore
//! use txscope::prelude::*;
//!
//! let coordinator = Coordinator::new(MemoryDriver::new());
//! coordinator.router().put("key", Value::Int(1)).await?;
//! ```

// Entry points
pub use crate::{Coordinator, CoordinatorBuilder, CoordinatorConfig, Router};

// Error handling
pub use crate::{Error, Result};

// Operation surface (brings the router's methods into scope)
pub use crate::{Handle, HandleKind, Resource, TransactionOptions, Value};

// Context propagation
pub use crate::{enter, spawn, spawn_blocking};

// Reference driver
pub use crate::MemoryDriver;
