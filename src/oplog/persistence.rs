//! Persistence layer for the operation log.

use crate::error::StorageError;
use crate::oplog::{EntryFilter, LogEntry, Oplog};
use parking_lot::RwLock;
use std::path::Path;

/// Sled-backed oplog. Entries are keyed by a big-endian monotonic sequence
/// number so iteration yields append order, and encoded as JSON — the
/// portable string-keyed encoding every backend can produce and consume.
pub struct SledOplog {
    db: sled::Db,
}

impl SledOplog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }
}

impl Oplog for SledOplog {
    fn append(&self, entry: &LogEntry) -> Result<(), StorageError> {
        let seq = self.db.generate_id()?;
        let value = serde_json::to_vec(entry)
            .map_err(|e| StorageError::Codec(format!("failed to encode log entry: {}", e)))?;
        self.db.insert(seq.to_be_bytes(), value)?;
        self.db.flush()?;
        Ok(())
    }

    fn read(&self, filter: &EntryFilter) -> Result<Vec<LogEntry>, StorageError> {
        let mut entries = Vec::new();
        for item in self.db.iter() {
            let (_, value) = item?;
            let entry: LogEntry = serde_json::from_slice(&value)
                .map_err(|e| StorageError::Codec(format!("failed to decode log entry: {}", e)))?;
            if filter.matches(&entry) {
                entries.push(entry);
            }
        }
        // Iteration order is append order; the stable sort keeps it for ties.
        entries.sort_by_key(|e| e.timestamp);
        Ok(entries)
    }
}

/// In-memory oplog for memory-backed systems and tests.
#[derive(Debug, Default)]
pub struct MemoryOplog {
    entries: RwLock<Vec<LogEntry>>,
}

impl MemoryOplog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Oplog for MemoryOplog {
    fn append(&self, entry: &LogEntry) -> Result<(), StorageError> {
        self.entries.write().push(entry.clone());
        Ok(())
    }

    fn read(&self, filter: &EntryFilter) -> Result<Vec<LogEntry>, StorageError> {
        let mut entries: Vec<LogEntry> = self
            .entries
            .read()
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.timestamp);
        Ok(entries)
    }
}
