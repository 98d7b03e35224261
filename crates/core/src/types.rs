//! Core identifier types
//!
//! This module defines the identifiers used throughout the system:
//! - [`HandleId`]: Unique identifier for one open transactional handle
//! - [`SourceId`]: Identity of one coordinator (one routed resource)
//! - [`CallGraphId`]: Token for one independently-triggered unit of work
//! - [`HandleKind`]: Which kind of handle served an operation

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random id using UUID v4
            pub fn new() -> Self {
                $name(Uuid::new_v4())
            }

            /// Create an id from raw bytes
            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                $name(Uuid::from_bytes(bytes))
            }

            /// Get raw bytes representation
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an open transaction
    ///
    /// Assigned by the driver when the transaction begins. Used in:
    /// - Routing introspection (`Router::active_handle`)
    /// - Tracing fields on scope spans
    /// - Operation journals in the reference driver
    HandleId
);

uuid_id!(
    /// Identity of a coordinator
    ///
    /// Every frame in the call-graph context is tagged with the source that
    /// installed it, so routers of different coordinators never observe each
    /// other's transactions.
    SourceId
);

uuid_id!(
    /// Token identifying one independently-triggered unit of work
    ///
    /// Generated when a call graph is entered and inherited by every
    /// descendant that the call graph propagates its context to.
    CallGraphId
);

/// Which kind of handle served an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// The process-wide, non-transactional resource
    Default,
    /// An open transaction
    Transaction(HandleId),
}

impl HandleKind {
    /// Returns the transaction id if this is a transactional handle
    pub fn transaction_id(&self) -> Option<HandleId> {
        match self {
            HandleKind::Default => None,
            HandleKind::Transaction(id) => Some(*id),
        }
    }

    /// Check if this is the default handle
    pub fn is_default(&self) -> bool {
        matches!(self, HandleKind::Default)
    }
}

impl std::fmt::Display for HandleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandleKind::Default => write!(f, "default"),
            HandleKind::Transaction(id) => write!(f, "tx:{}", id),
        }
    }
}
