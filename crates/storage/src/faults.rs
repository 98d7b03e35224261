//! Failure injection for the memory driver

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use txscope_core::Error;

/// Failures produced by the memory driver itself
///
/// Surfaced to callers wrapped in [`Error::Driver`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Write attempted inside a read-only transaction
    #[error("write to '{key}' rejected: transaction is read-only")]
    ReadOnly {
        /// Target key
        key: String,
    },

    /// Operation on a key configured to fail
    #[error("injected failure on '{key}'")]
    Injected {
        /// Target key
        key: String,
    },
}

/// One-shot and per-key failure switches
#[derive(Debug, Default)]
pub struct Faults {
    fail_begin: AtomicBool,
    fail_commit: AtomicBool,
    fail_rollback: AtomicBool,
    failing_keys: Mutex<FxHashSet<String>>,
}

impl Faults {
    /// Make the next `begin` fail
    pub fn fail_next_begin(&self) {
        self.fail_begin.store(true, Ordering::SeqCst);
    }

    /// Make the next `commit` fail
    pub fn fail_next_commit(&self) {
        self.fail_commit.store(true, Ordering::SeqCst);
    }

    /// Make the next `rollback` fail
    pub fn fail_next_rollback(&self) {
        self.fail_rollback.store(true, Ordering::SeqCst);
    }

    /// Make every operation on `key` fail, on every handle
    pub fn fail_key(&self, key: impl Into<String>) {
        self.failing_keys.lock().insert(key.into());
    }

    /// Clear all switches
    pub fn reset(&self) {
        self.fail_begin.store(false, Ordering::SeqCst);
        self.fail_commit.store(false, Ordering::SeqCst);
        self.fail_rollback.store(false, Ordering::SeqCst);
        self.failing_keys.lock().clear();
    }

    pub(crate) fn take_begin(&self) -> bool {
        self.fail_begin.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn take_commit(&self) -> bool {
        self.fail_commit.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn take_rollback(&self) -> bool {
        self.fail_rollback.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn check_key(&self, key: &str) -> Result<(), Error> {
        if self.failing_keys.lock().contains(key) {
            return Err(Error::driver(StorageError::Injected {
                key: key.to_string(),
            }));
        }
        Ok(())
    }
}
