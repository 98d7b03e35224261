//! Sharded committed-state store
//!
//! Holds the committed state that the default handle reads and writes
//! directly and that transactions apply their write sets to.
//!
//! # Design
//!
//! - DashMap: sharded by key, lock-free reads
//! - Every entry carries the version of the write that produced it
//! - One global version counter, bumped once per applied batch

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use txscope_core::Value;

/// A stored value and the version that wrote it
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedValue {
    /// The value
    pub value: Value,
    /// Version of the write
    pub version: u64,
}

/// Committed key/value state
pub struct ShardedStore {
    data: DashMap<String, VersionedValue>,
    version: AtomicU64,
}

impl ShardedStore {
    /// Create new empty store
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            version: AtomicU64::new(0),
        }
    }

    /// Get current version
    #[inline]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Increment version and return new value
    #[inline]
    pub fn next_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a value by key
    #[inline]
    pub fn get(&self, key: &str) -> Option<VersionedValue> {
        self.data.get(key).map(|entry| entry.value().clone())
    }

    /// Check if a key exists
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Write a single key at a fresh version
    pub fn put(&self, key: &str, value: Value) -> u64 {
        let version = self.next_version();
        self.data
            .insert(key.to_string(), VersionedValue { value, version });
        version
    }

    /// Delete a key, returning the removed value
    pub fn delete(&self, key: &str) -> Option<VersionedValue> {
        self.data.remove(key).map(|(_, v)| v)
    }

    /// Apply a batch of writes (`Some`) and deletes (`None`) at one version
    ///
    /// Callers serialize batches; concurrent single-key writes from the
    /// default handle interleave at key granularity.
    pub fn apply_batch<I>(&self, batch: I) -> u64
    where
        I: IntoIterator<Item = (String, Option<Value>)>,
    {
        let version = self.next_version();
        for (key, write) in batch {
            match write {
                Some(value) => {
                    self.data.insert(key, VersionedValue { value, version });
                }
                None => {
                    self.data.remove(&key);
                }
            }
        }
        version
    }

    /// List entries matching a key prefix, sorted by key
    ///
    /// NOTE: Requires filter + sort, O(n) in the number of keys.
    pub fn list_by_prefix(&self, prefix: &str) -> Vec<(String, Value)> {
        let mut results: Vec<_> = self
            .data
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| (entry.key().clone(), entry.value().value.clone()))
            .collect();
        results.sort_by(|(a, _), (b, _)| a.cmp(b));
        results
    }
}

impl Default for ShardedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShardedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedStore")
            .field("keys", &self.len())
            .field("version", &self.version())
            .finish()
    }
}
