//! Resource router
//!
//! The [`Router`] is what callers hold instead of a connection. It implements
//! the same [`Resource`] surface as the driver's handles, and every operation
//! resolves its target when it is issued:
//!
//! ```text
//! router.put(k, v)
//!   └─► context::active_handle(source)
//!         ├─ Some(tx)  ─► tx.put(k, v)
//!         └─ None      ─► default.put(k, v)
//! ```
//!
//! Nothing is cached between operations. The same router value, used by the
//! same caller, can hit the default handle, then a transaction, then the
//! default handle again as scopes open and close around it. Errors from the
//! target are returned untouched.

use async_trait::async_trait;
use std::sync::Arc;
use txscope_concurrency::context;
use txscope_core::{HandleId, HandleKind, Resource, Result, SourceId, Value};

/// Late-binding dispatcher over the default handle and the active transaction
#[derive(Clone)]
pub struct Router {
    source: SourceId,
    default: Arc<dyn Resource>,
}

impl Router {
    pub(crate) fn new(source: SourceId, default: Arc<dyn Resource>) -> Self {
        Self { source, default }
    }

    /// Identity of the coordinator this router belongs to
    pub fn source(&self) -> SourceId {
        self.source
    }

    /// Id of the transaction the next operation would use
    pub fn active_handle(&self) -> Option<HandleId> {
        context::active_handle(self.source).map(|handle| handle.id())
    }

    /// Whether the next operation would run inside a transaction
    pub fn in_transaction(&self) -> bool {
        self.active_handle().is_some()
    }

    /// Nesting depth of the current scope (0 outside any scope)
    pub fn depth(&self) -> usize {
        context::depth(self.source)
    }

    fn target(&self) -> Arc<dyn Resource> {
        match context::active_handle(self.source) {
            Some(handle) => Arc::clone(handle.resource()),
            None => Arc::clone(&self.default),
        }
    }

    fn route(&self, op: &'static str, key: &str) -> Arc<dyn Resource> {
        let target = self.target();
        tracing::trace!(op, key, target = %target.kind(), "routing operation");
        target
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("source", &self.source)
            .field("active", &self.active_handle())
            .finish()
    }
}

#[async_trait]
impl Resource for Router {
    /// Kind of the handle the next operation would use
    fn kind(&self) -> HandleKind {
        self.target().kind()
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.route("get", key).get(key).await
    }

    async fn put(&self, key: &str, value: Value) -> Result<()> {
        self.route("put", key).put(key, value).await
    }

    async fn update(&self, key: &str, value: Value) -> Result<bool> {
        self.route("update", key).update(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.route("delete", key).delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.route("exists", key).exists(key).await
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Value)>> {
        self.route("scan", prefix).scan(prefix).await
    }
}
