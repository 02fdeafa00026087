//! Per-backend system context
//!
//! One `System` per registered store. Owns the record store adapter, the
//! oplog sink and the timestamp cache, and implements the SET/GET paths the
//! command interpreter and the merge engine both route through. There is no
//! process-wide state; every handle is owned here and passed explicitly.

use crate::cache::TimestampCache;
use crate::error::StorageError;
use crate::oplog::{EntryFilter, LogEntry, Oplog};
use crate::store::{self, Record, RecordStore, TableSchema};
use crate::types::{CompositeKey, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// How GET operations interact with the oplog and the cache. The original
/// adapters disagreed on this; here it is explicit per-system policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPolicy {
    /// Append GET entries to the oplog as historical annotations.
    #[serde(default = "default_true")]
    pub log_gets: bool,
    /// Let a GET's timestamp advance the cache. Off by default: reads carry
    /// no state and should not gate later writes.
    #[serde(default)]
    pub gets_advance_cache: bool,
}

fn default_true() -> bool {
    true
}

impl Default for GetPolicy {
    fn default() -> Self {
        GetPolicy {
            log_gets: true,
            gets_advance_cache: false,
        }
    }
}

/// Result of a SET. A stale write is a deliberate no-op, observable but
/// never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Applied,
    SkippedStale { cached: Timestamp },
}

impl SetOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, SetOutcome::Applied)
    }
}

/// One store plus its oplog, cache and policy.
pub struct System {
    name: String,
    table: String,
    store: Box<dyn RecordStore>,
    oplog: Box<dyn Oplog>,
    cache: TimestampCache,
    policy: GetPolicy,
}

impl System {
    pub fn new(
        name: &str,
        table: &str,
        store: Box<dyn RecordStore>,
        oplog: Box<dyn Oplog>,
        policy: GetPolicy,
    ) -> Self {
        System {
            name: name.to_uppercase(),
            table: table.to_string(),
            store,
            oplog,
            cache: TimestampCache::new(),
            policy,
        }
    }

    /// Registered system name, uppercased for case-insensitive addressing.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn schema(&self) -> Result<TableSchema, StorageError> {
        self.store.schema(&self.table)
    }

    /// Last cached timestamp for `key` (-1 when unseen).
    pub fn cached_timestamp(&self, key: &CompositeKey) -> Timestamp {
        self.cache.get(key)
    }

    /// SET path: cache gate, partial-field upsert, oplog append, cache
    /// update — in that order. A timestamp at or below the cached value is
    /// skipped and reported as [`SetOutcome::SkippedStale`].
    pub fn set(
        &self,
        key: &CompositeKey,
        item: &BTreeMap<String, String>,
        timestamp: Timestamp,
    ) -> Result<SetOutcome, StorageError> {
        let cached = self.cache.get(key);
        if timestamp <= cached {
            debug!(
                system = %self.name,
                %key,
                timestamp,
                cached,
                "skipping stale SET"
            );
            return Ok(SetOutcome::SkippedStale { cached });
        }

        let schema = self.schema()?;
        self.store.write(&self.table, key, item, timestamp)?;
        self.oplog.append(&LogEntry::set(
            timestamp,
            &self.table,
            schema.named_key(key),
            item.clone(),
        ))?;
        self.cache.set(key.clone(), timestamp);
        debug!(system = %self.name, %key, timestamp, "applied SET");
        Ok(SetOutcome::Applied)
    }

    /// SET with positional values, as issued by the command grammar: values
    /// map onto the settable columns in schema order.
    pub fn set_positional(
        &self,
        key_parts: &[String],
        values: &[String],
        timestamp: Timestamp,
    ) -> Result<SetOutcome, StorageError> {
        let schema = self.schema()?;
        let key = schema.key_from_positional(key_parts)?;
        let item = schema.item_from_positional(values)?;
        self.set(&key, &item, timestamp)
    }

    /// GET path: reads the current record, optionally logging the read and
    /// advancing the cache per [`GetPolicy`].
    pub fn get(
        &self,
        key: &CompositeKey,
        timestamp: Timestamp,
    ) -> Result<Option<Record>, StorageError> {
        let schema = self.schema()?;
        let record = self.store.read(&self.table, key)?;
        if self.policy.log_gets {
            self.oplog
                .append(&LogEntry::get(timestamp, &self.table, schema.named_key(key)))?;
        }
        if self.policy.gets_advance_cache && timestamp > self.cache.get(key) {
            self.cache.set(key.clone(), timestamp);
        }
        Ok(record)
    }

    pub fn get_positional(
        &self,
        key_parts: &[String],
        timestamp: Timestamp,
    ) -> Result<Option<Record>, StorageError> {
        let schema = self.schema()?;
        let key = schema.key_from_positional(key_parts)?;
        self.get(&key, timestamp)
    }

    /// Full or filtered oplog, ascending by timestamp.
    pub fn oplog_entries(&self, filter: &EntryFilter) -> Result<Vec<LogEntry>, StorageError> {
        self.oplog.read(filter)
    }

    /// Rebuild the timestamp cache from the store's current rows. Safe to
    /// re-run at any time.
    pub fn rebuild_cache(&self) -> Result<usize, StorageError> {
        self.cache.rebuild(self.store.as_ref(), &self.table)
    }

    /// Bulk-load the table from CSV (timestamp 0, no oplog entries), then
    /// fold the seeded rows into the cache.
    pub fn load_csv(&self, path: &Path) -> Result<usize, StorageError> {
        let schema = self.schema()?;
        let loaded = store::load_csv(self.store.as_ref(), &self.table, schema.key_width, path)?;
        self.rebuild_cache()?;
        info!(system = %self.name, rows = loaded, "CSV load complete");
        Ok(loaded)
    }

    /// Current rows with their keys, for display. Ordered by key.
    pub fn rows(&self) -> Result<Vec<(CompositeKey, Record)>, StorageError> {
        let mut rows = Vec::new();
        for (key, _) in self.store.scan_with_timestamps(&self.table)? {
            if let Some(record) = self.store.read(&self.table, &key)? {
                rows.push((key, record));
            }
        }
        rows.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(rows)
    }
}
