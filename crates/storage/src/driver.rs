//! In-memory reference driver
//!
//! - [`MemoryDriver`]: owns the committed state, the journals and the fault
//!   switches, and begins transactions
//! - [`DefaultResource`]: the non-transactional handle, writes straight into
//!   committed state
//! - [`MemoryTransaction`]: buffers writes, reads its own writes, applies the
//!   buffer atomically on commit
//!
//! Transactions are independent of each other: a transaction begun while
//! another is open does not see the other's uncommitted writes. There is no
//! conflict detection; the last commit wins per key.

use crate::faults::{Faults, StorageError};
use crate::journal::{Journal, OpKind, TxOutcome};
use crate::sharded::ShardedStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use txscope_core::{
    Driver, Error, HandleId, HandleKind, Resource, Result, Transaction, TransactionOptions, Value,
};

/// State shared by the driver, its default handle and its transactions
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) store: ShardedStore,
    pub(crate) journal: Journal,
    pub(crate) faults: Faults,
    /// Serializes batch application so a commit is applied all at once
    pub(crate) commit_lock: Mutex<()>,
}

/// In-memory driver
#[derive(Clone)]
pub struct MemoryDriver {
    shared: Arc<Shared>,
    default: Arc<dyn Resource>,
}

impl MemoryDriver {
    /// Create a driver with empty state
    pub fn new() -> Self {
        let shared = Arc::new(Shared::default());
        let default: Arc<dyn Resource> = Arc::new(DefaultResource {
            shared: Arc::clone(&shared),
        });
        Self { shared, default }
    }

    /// Operation and transaction journals
    pub fn journal(&self) -> &Journal {
        &self.shared.journal
    }

    /// Failure switches
    pub fn faults(&self) -> &Faults {
        &self.shared.faults
    }

    /// Committed value of `key`, bypassing routing and journals
    pub fn committed(&self, key: &str) -> Option<Value> {
        self.shared.store.get(key).map(|v| v.value)
    }

    /// Current committed version
    pub fn version(&self) -> u64 {
        self.shared.store.version()
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDriver")
            .field("store", &self.shared.store)
            .finish()
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    type Transaction = MemoryTransaction;

    fn default_handle(&self) -> Arc<dyn Resource> {
        Arc::clone(&self.default)
    }

    async fn begin(&self, options: &TransactionOptions) -> Result<MemoryTransaction> {
        if self.shared.faults.take_begin() {
            return Err(Error::BeginFailed("injected begin failure".to_string()));
        }
        let tx = MemoryTransaction {
            id: HandleId::new(),
            read_only: options.read_only,
            shared: Arc::clone(&self.shared),
            state: Mutex::new(TxState::Active(FxHashMap::default())),
        };
        tracing::debug!(handle = %tx.id, read_only = tx.read_only, "memory transaction begun");
        Ok(tx)
    }
}

/// Non-transactional handle over committed state
pub struct DefaultResource {
    shared: Arc<Shared>,
}

impl DefaultResource {
    fn enter(&self, op: OpKind, key: &str) -> Result<()> {
        self.shared.faults.check_key(key)?;
        self.shared.journal.record_op(HandleKind::Default, op, key);
        Ok(())
    }
}

#[async_trait]
impl Resource for DefaultResource {
    fn kind(&self) -> HandleKind {
        HandleKind::Default
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.enter(OpKind::Get, key)?;
        Ok(self.shared.store.get(key).map(|v| v.value))
    }

    async fn put(&self, key: &str, value: Value) -> Result<()> {
        self.enter(OpKind::Put, key)?;
        self.shared.store.put(key, value);
        Ok(())
    }

    async fn update(&self, key: &str, value: Value) -> Result<bool> {
        self.enter(OpKind::Update, key)?;
        let _guard = self.shared.commit_lock.lock();
        if !self.shared.store.contains(key) {
            return Ok(false);
        }
        self.shared.store.put(key, value);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.enter(OpKind::Delete, key)?;
        Ok(self.shared.store.delete(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.enter(OpKind::Exists, key)?;
        Ok(self.shared.store.contains(key))
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Value)>> {
        self.enter(OpKind::Scan, prefix)?;
        Ok(self.shared.store.list_by_prefix(prefix))
    }
}

/// Buffered writes: `Some` is a put, `None` a delete
type WriteSet = FxHashMap<String, Option<Value>>;

enum TxState {
    Active(WriteSet),
    Finished,
}

/// An open in-memory transaction
pub struct MemoryTransaction {
    id: HandleId,
    read_only: bool,
    shared: Arc<Shared>,
    state: Mutex<TxState>,
}

impl MemoryTransaction {
    fn enter(&self, op: OpKind, key: &str) -> Result<()> {
        self.shared.faults.check_key(key)?;
        if !self.is_active() {
            return Err(Error::TransactionNotActive { id: self.id });
        }
        self.shared
            .journal
            .record_op(HandleKind::Transaction(self.id), op, key);
        Ok(())
    }

    fn check_writable(&self, key: &str) -> Result<()> {
        if self.read_only {
            return Err(Error::driver(StorageError::ReadOnly {
                key: key.to_string(),
            }));
        }
        Ok(())
    }

    /// Run `f` on the write set, or fail if the transaction has finished
    fn with_writes<R>(&self, f: impl FnOnce(&mut WriteSet) -> R) -> Result<R> {
        match &mut *self.state.lock() {
            TxState::Active(writes) => Ok(f(writes)),
            TxState::Finished => Err(Error::TransactionNotActive { id: self.id }),
        }
    }

    fn read(&self, key: &str) -> Result<Option<Value>> {
        let buffered = self.with_writes(|writes| writes.get(key).cloned())?;
        Ok(match buffered {
            Some(write) => write,
            None => self.shared.store.get(key).map(|v| v.value),
        })
    }

    /// Swap the state to finished and hand back the write set
    fn finish(&self) -> Option<WriteSet> {
        match std::mem::replace(&mut *self.state.lock(), TxState::Finished) {
            TxState::Active(writes) => Some(writes),
            TxState::Finished => None,
        }
    }
}

impl std::fmt::Debug for MemoryTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransaction")
            .field("id", &self.id)
            .field("read_only", &self.read_only)
            .field("active", &self.is_active())
            .finish()
    }
}

#[async_trait]
impl Resource for MemoryTransaction {
    fn kind(&self) -> HandleKind {
        HandleKind::Transaction(self.id)
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.enter(OpKind::Get, key)?;
        self.read(key)
    }

    async fn put(&self, key: &str, value: Value) -> Result<()> {
        self.enter(OpKind::Put, key)?;
        self.check_writable(key)?;
        self.with_writes(|writes| {
            writes.insert(key.to_string(), Some(value));
        })
    }

    async fn update(&self, key: &str, value: Value) -> Result<bool> {
        self.enter(OpKind::Update, key)?;
        self.check_writable(key)?;
        if self.read(key)?.is_none() {
            return Ok(false);
        }
        self.with_writes(|writes| {
            writes.insert(key.to_string(), Some(value));
        })?;
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.enter(OpKind::Delete, key)?;
        self.check_writable(key)?;
        let existed = self.read(key)?.is_some();
        self.with_writes(|writes| {
            writes.insert(key.to_string(), None);
        })?;
        Ok(existed)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.enter(OpKind::Exists, key)?;
        Ok(self.read(key)?.is_some())
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Value)>> {
        self.enter(OpKind::Scan, prefix)?;
        let mut merged: BTreeMap<String, Value> =
            self.shared.store.list_by_prefix(prefix).into_iter().collect();
        self.with_writes(|writes| {
            for (key, write) in writes.iter().filter(|(k, _)| k.starts_with(prefix)) {
                match write {
                    Some(value) => {
                        merged.insert(key.clone(), value.clone());
                    }
                    None => {
                        merged.remove(key);
                    }
                }
            }
        })?;
        Ok(merged.into_iter().collect())
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    fn id(&self) -> HandleId {
        self.id
    }

    fn is_active(&self) -> bool {
        matches!(*self.state.lock(), TxState::Active(_))
    }

    async fn commit(&self) -> Result<()> {
        let writes = self
            .finish()
            .ok_or(Error::TransactionNotActive { id: self.id })?;
        let count = writes.len();
        if self.shared.faults.take_commit() {
            self.shared
                .journal
                .record_tx(self.id, TxOutcome::RolledBack, count);
            return Err(Error::CommitFailed("injected commit failure".to_string()));
        }
        let version = {
            let _guard = self.shared.commit_lock.lock();
            self.shared.store.apply_batch(writes)
        };
        self.shared
            .journal
            .record_tx(self.id, TxOutcome::Committed, count);
        tracing::debug!(handle = %self.id, writes = count, version, "memory transaction committed");
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let writes = self
            .finish()
            .ok_or(Error::TransactionNotActive { id: self.id })?;
        self.shared
            .journal
            .record_tx(self.id, TxOutcome::RolledBack, writes.len());
        if self.shared.faults.take_rollback() {
            return Err(Error::RollbackFailed(
                "injected rollback failure".to_string(),
            ));
        }
        tracing::debug!(handle = %self.id, discarded = writes.len(), "memory transaction rolled back");
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if let Some(writes) = self.finish() {
            tracing::warn!(
                handle = %self.id,
                discarded = writes.len(),
                "transaction dropped while active, rolling back"
            );
            self.shared
                .journal
                .record_tx(self.id, TxOutcome::Dropped, writes.len());
        }
    }
}
