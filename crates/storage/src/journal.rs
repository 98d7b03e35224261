//! Operation and transaction journals
//!
//! The memory driver records which handle served every operation and how
//! every transaction ended, so tests can assert on routing decisions.

use parking_lot::Mutex;
use txscope_core::{HandleId, HandleKind};

/// Kind of routed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// `get`
    Get,
    /// `put`
    Put,
    /// `update`
    Update,
    /// `delete`
    Delete,
    /// `exists`
    Exists,
    /// `scan`
    Scan,
}

/// One served operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpRecord {
    /// Handle that served the operation
    pub target: HandleKind,
    /// What was done
    pub op: OpKind,
    /// Key or prefix
    pub key: String,
}

/// How a transaction ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    /// Writes applied
    Committed,
    /// Writes discarded by an explicit rollback
    RolledBack,
    /// Writes discarded because the last reference was dropped while active
    Dropped,
}

/// One finished transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRecord {
    /// The transaction
    pub id: HandleId,
    /// Outcome
    pub outcome: TxOutcome,
    /// Number of buffered writes at the end
    pub writes: usize,
}

/// Append-only journals
#[derive(Debug, Default)]
pub struct Journal {
    ops: Mutex<Vec<OpRecord>>,
    txs: Mutex<Vec<TxRecord>>,
}

impl Journal {
    pub(crate) fn record_op(&self, target: HandleKind, op: OpKind, key: &str) {
        self.ops.lock().push(OpRecord {
            target,
            op,
            key: key.to_string(),
        });
    }

    pub(crate) fn record_tx(&self, id: HandleId, outcome: TxOutcome, writes: usize) {
        self.txs.lock().push(TxRecord {
            id,
            outcome,
            writes,
        });
    }

    /// All served operations, oldest first
    pub fn ops(&self) -> Vec<OpRecord> {
        self.ops.lock().clone()
    }

    /// All finished transactions, oldest first
    pub fn transactions(&self) -> Vec<TxRecord> {
        self.txs.lock().clone()
    }

    /// Operations served by `target`
    pub fn ops_on(&self, target: HandleKind) -> Vec<OpRecord> {
        self.ops
            .lock()
            .iter()
            .filter(|record| record.target == target)
            .cloned()
            .collect()
    }

    /// Outcome of transaction `id`, if it has finished
    pub fn outcome(&self, id: HandleId) -> Option<TxOutcome> {
        self.txs
            .lock()
            .iter()
            .find(|record| record.id == id)
            .map(|record| record.outcome)
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.ops.lock().clear();
        self.txs.lock().clear();
    }
}
