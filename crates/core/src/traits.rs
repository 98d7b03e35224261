//! Driver boundary traits
//!
//! - [`Resource`]: the operation surface shared by the default handle,
//!   transactional handles and the router
//! - [`Transaction`]: an open transaction, adds commit/rollback
//! - [`Driver`]: hands out the default handle and begins transactions
//!
//! All three are implemented by the external driver. txscope only consumes
//! them, so every error they return reaches the caller unchanged.

use crate::error::Result;
use crate::types::{HandleId, HandleKind};
use crate::value::Value;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Uniform operation surface
///
/// Implemented by the default resource handle and by every transactional
/// handle, which lets the router substitute one for the other.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Which handle this is
    fn kind(&self) -> HandleKind;

    /// Read a key
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Write a key, creating or overwriting it
    async fn put(&self, key: &str, value: Value) -> Result<()>;

    /// Overwrite an existing key
    ///
    /// Returns `false` and writes nothing if the key does not exist.
    async fn update(&self, key: &str, value: Value) -> Result<bool>;

    /// Remove a key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// All entries whose key starts with `prefix`, sorted by key
    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Value)>>;
}

/// An open transaction
///
/// Once `commit` or `rollback` has run, every [`Resource`] operation on the
/// transaction must fail with [`Error::TransactionNotActive`](crate::Error).
#[async_trait]
pub trait Transaction: Resource {
    /// Driver-assigned id
    fn id(&self) -> HandleId;

    /// Whether the transaction still accepts operations
    fn is_active(&self) -> bool;

    /// Make all writes visible
    async fn commit(&self) -> Result<()>;

    /// Discard all writes
    async fn rollback(&self) -> Result<()>;
}

/// Options passed to [`Driver::begin`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Time budget for the whole unit of work
    pub timeout: Option<Duration>,
    /// Reject writes inside the transaction
    pub read_only: bool,
    /// Free-form label, attached to tracing spans
    pub label: Option<String>,
}

impl TransactionOptions {
    /// Options with no timeout, read-write, unlabelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time budget
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Mark the transaction read-only
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Attach a label
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// The underlying resource driver
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    /// Transaction type produced by [`Driver::begin`]
    type Transaction: Transaction + 'static;

    /// The process-wide default handle
    ///
    /// Must return the same long-lived resource on every call.
    fn default_handle(&self) -> Arc<dyn Resource>;

    /// Open a new transaction
    async fn begin(&self, options: &TransactionOptions) -> Result<Self::Transaction>;
}

/// Shared, clonable reference to an open transaction
///
/// This is what a unit of work receives and what the context store carries.
/// It exposes only the [`Resource`] surface: committing and rolling back stay
/// with the scope that opened the transaction.
#[derive(Clone)]
pub struct Handle {
    id: HandleId,
    inner: Arc<dyn Resource>,
}

impl Handle {
    /// Wrap an open transaction
    pub fn new<T>(tx: Arc<T>) -> Self
    where
        T: Transaction + 'static,
    {
        let id = tx.id();
        Handle { id, inner: tx }
    }

    /// The transaction id
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// The underlying resource
    pub fn resource(&self) -> &Arc<dyn Resource> {
        &self.inner
    }

    /// Whether two handles refer to the same transaction
    pub fn same_as(&self, other: &Handle) -> bool {
        self.id == other.id
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle").field("id", &self.id).finish()
    }
}

#[async_trait]
impl Resource for Handle {
    fn kind(&self) -> HandleKind {
        self.inner.kind()
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: Value) -> Result<()> {
        self.inner.put(key, value).await
    }

    async fn update(&self, key: &str, value: Value) -> Result<bool> {
        self.inner.update(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Value)>> {
        self.inner.scan(prefix).await
    }
}
