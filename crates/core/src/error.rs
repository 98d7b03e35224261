//! Unified error type for routed operations and transactional scopes
//!
//! Drivers report failures with this type, and the router and scope manager
//! pass them through unchanged. The only errors raised by txscope itself are
//! [`Error::NestingTooDeep`], [`Error::TransactionTimeout`] and
//! [`Error::InvalidConfig`].
//!
//! ## Error Codes
//!
//! | Code | Raised by |
//! |------|-----------|
//! | NotFound | driver |
//! | Conflict | driver |
//! | TransactionNotActive | driver (operation on a closed handle) |
//! | TransactionTimeout | scope manager, enforcing the driver's time budget (classified as a driver error) |
//! | BeginFailed / CommitFailed / RollbackFailed | driver |
//! | NestingTooDeep | scope manager |
//! | Driver | driver (opaque source error) |
//! | InvalidConfig | configuration |
//! | Internal | bug or invariant violation |

use crate::types::HandleId;
use thiserror::Error;

/// All txscope errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Key not found where the operation requires one
    #[error("not found: {0}")]
    NotFound(String),

    /// Concurrent modification detected by the driver
    #[error("conflict: {0}")]
    Conflict(String),

    /// Operation issued on a transaction that already committed or rolled back
    #[error("transaction {id} is not active")]
    TransactionNotActive {
        /// The closed transaction
        id: HandleId,
    },

    /// The unit of work exceeded its time budget and was rolled back
    #[error("transaction timeout after {duration_ms}ms")]
    TransactionTimeout {
        /// Configured budget in milliseconds
        duration_ms: u64,
    },

    /// The driver could not open a transaction
    #[error("failed to begin transaction: {0}")]
    BeginFailed(String),

    /// The driver could not commit
    #[error("failed to commit transaction: {0}")]
    CommitFailed(String),

    /// The driver could not roll back
    #[error("failed to roll back transaction: {0}")]
    RollbackFailed(String),

    /// Nested scopes exceeded the configured depth
    #[error("transaction nesting too deep: depth {depth} exceeds limit {limit}")]
    NestingTooDeep {
        /// Depth the new scope would have had
        depth: usize,
        /// Configured maximum
        limit: usize,
    },

    /// Opaque driver failure
    #[error("driver error: {0}")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Configuration rejected during validation or parsing
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal error (bug or invariant violation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for txscope operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap an arbitrary driver error.
    pub fn driver<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Driver(Box::new(err))
    }

    /// Check if this error is retryable.
    ///
    /// Retryable errors may succeed on retry with fresh data. txscope never
    /// retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_) | Error::TransactionTimeout { .. })
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::TransactionTimeout { .. })
    }

    /// Check if this error originated in the driver.
    ///
    /// Timeouts count: the scope manager raises them on the driver's behalf
    /// when a transaction outlives its time budget.
    pub fn is_driver(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::Conflict(_)
                | Error::TransactionNotActive { .. }
                | Error::TransactionTimeout { .. }
                | Error::BeginFailed(_)
                | Error::CommitFailed(_)
                | Error::RollbackFailed(_)
                | Error::Driver(_)
        )
    }
}
