//! Operation log
//!
//! Append-only, per-store sequence of log entries recording every SET/GET
//! with its logical timestamp, target table, key values and changed
//! attributes. Entries are immutable once appended; an oplog is the complete
//! causal history of one store's local operations.

pub mod persistence;

pub use persistence::{MemoryOplog, SledOplog};

use crate::error::StorageError;
use crate::types::{CompositeKey, Operation, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One oplog record. All key and item values are strings keyed by attribute
/// name so every backend can represent the same entry regardless of native
/// typing; attribute typing is re-derived from the record schema on apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: Timestamp,
    pub operation: Operation,
    pub table: String,
    /// Ordered (column name, value) pairs; order follows schema position.
    pub keys: Vec<(String, String)>,
    /// Changed attributes; empty for GET.
    #[serde(default)]
    pub item: BTreeMap<String, String>,
}

impl LogEntry {
    pub fn set(
        timestamp: Timestamp,
        table: &str,
        keys: Vec<(String, String)>,
        item: BTreeMap<String, String>,
    ) -> Self {
        LogEntry {
            timestamp,
            operation: Operation::Set,
            table: table.to_string(),
            keys,
            item,
        }
    }

    pub fn get(timestamp: Timestamp, table: &str, keys: Vec<(String, String)>) -> Self {
        LogEntry {
            timestamp,
            operation: Operation::Get,
            table: table.to_string(),
            keys,
            item: BTreeMap::new(),
        }
    }

    /// Composite key addressed by this entry, in declared component order.
    pub fn key(&self) -> CompositeKey {
        CompositeKey::new(self.keys.iter().map(|(_, v)| v.clone()))
    }
}

/// Filter for [`Oplog::read`]. The default filter matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub operation: Option<Operation>,
    /// Keep entries with `timestamp >= since`.
    pub since: Option<Timestamp>,
}

impl EntryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn sets() -> Self {
        EntryFilter {
            operation: Some(Operation::Set),
            since: None,
        }
    }

    pub fn since(mut self, timestamp: Timestamp) -> Self {
        self.since = Some(timestamp);
        self
    }

    pub fn matches(&self, entry: &LogEntry) -> bool {
        if let Some(op) = self.operation {
            if entry.operation != op {
                return false;
            }
        }
        if let Some(since) = self.since {
            if entry.timestamp < since {
                return false;
            }
        }
        true
    }
}

/// Oplog persistence interface.
///
/// `append` must preserve insertion order for entries from the same process;
/// cross-process ordering is resolved by timestamp, not append order. `read`
/// returns matching entries ascending by timestamp, with append order as the
/// stable order for ties.
pub trait Oplog {
    fn append(&self, entry: &LogEntry) -> Result<(), StorageError>;
    fn read(&self, filter: &EntryFilter) -> Result<Vec<LogEntry>, StorageError>;
}
