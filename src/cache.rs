//! Timestamp cache
//!
//! In-memory index from composite key to the highest timestamp known to have
//! been durably applied for that key. Consulted before every SET to gate
//! stale writes. Derived and rebuildable; the source of truth is always the
//! record table plus the oplog.

use crate::store::RecordStore;
use crate::types::{CompositeKey, Timestamp, TS_UNSEEN};
use crate::error::StorageError;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Unbounded map of `CompositeKey -> last_applied_timestamp`. Size is bounded
/// by the number of distinct keys in the store; there is no eviction.
#[derive(Debug, Default)]
pub struct TimestampCache {
    inner: RwLock<HashMap<CompositeKey, Timestamp>>,
}

impl TimestampCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last applied timestamp for `key`, or [`TS_UNSEEN`] (-1) if unknown.
    pub fn get(&self, key: &CompositeKey) -> Timestamp {
        self.inner.read().get(key).copied().unwrap_or(TS_UNSEEN)
    }

    /// Unconditionally overwrite the cached timestamp for `key`.
    pub fn set(&self, key: CompositeKey, timestamp: Timestamp) {
        self.inner.write().insert(key, timestamp);
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Rebuild the cache from a store scan, retaining for each key the
    /// maximum of the scanned row timestamp and any already-cached value.
    ///
    /// Idempotent: running it twice leaves the cache unchanged. Returns
    /// the number of keys whose cached value was raised.
    pub fn rebuild(&self, store: &dyn RecordStore, table: &str) -> Result<usize, StorageError> {
        let scanned = store.scan_with_timestamps(table)?;
        let mut raised = 0;
        let mut inner = self.inner.write();
        for (key, timestamp) in scanned {
            let current = inner.get(&key).copied().unwrap_or(TS_UNSEEN);
            if timestamp > current {
                inner.insert(key, timestamp);
                raised += 1;
            }
        }
        debug!(table, entries = inner.len(), raised, "timestamp cache rebuilt");
        Ok(raised)
    }
}
