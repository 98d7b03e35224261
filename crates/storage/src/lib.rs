//! In-memory reference driver for txscope
//!
//! Stands in for an external database driver in tests and demos. It
//! implements the full driver boundary and additionally records which handle
//! served every operation:
//! - Sharded committed state with versioned entries
//! - Buffered-write transactions with commit and rollback
//! - Operation and transaction journals
//! - Failure injection for begin, commit, rollback and individual keys

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod driver;
pub mod faults;
pub mod journal;
pub mod sharded;

pub use driver::{DefaultResource, MemoryDriver, MemoryTransaction};
pub use faults::{Faults, StorageError};
pub use journal::{Journal, OpKind, OpRecord, TxOutcome, TxRecord};
pub use sharded::{ShardedStore, VersionedValue};
