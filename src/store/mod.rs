//! Record stores
//!
//! Per-backend adapters exposing read/write of rows by composite key plus
//! schema introspection. Adapters carry no reconciliation logic; the cache
//! gate and oplog append live in [`crate::system::System`].

pub mod memory;
pub mod persistence;

pub use memory::MemoryRecordStore;
pub use persistence::SledRecordStore;

use crate::error::StorageError;
use crate::types::{CompositeKey, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// Current row for one composite key: non-key attribute values plus the
/// logical timestamp of the last applied write (0 for bulk-loaded data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub values: BTreeMap<String, String>,
    pub timestamp: Timestamp,
}

/// Declared shape of one table: ordered column names with the key columns
/// first, by schema convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<String>,
    pub key_width: usize,
}

impl TableSchema {
    pub fn new(table: &str, columns: Vec<String>, key_width: usize) -> Self {
        TableSchema {
            table: table.to_string(),
            columns,
            key_width,
        }
    }

    /// Key columns, in declared order.
    pub fn key_columns(&self) -> &[String] {
        &self.columns[..self.key_width]
    }

    /// Settable (non-key) columns, in declared order.
    pub fn value_columns(&self) -> &[String] {
        &self.columns[self.key_width..]
    }

    /// Build a key from positional literals, checking arity.
    pub fn key_from_positional(&self, parts: &[String]) -> Result<CompositeKey, StorageError> {
        if parts.len() != self.key_width {
            return Err(StorageError::KeyWidthMismatch {
                table: self.table.clone(),
                expected: self.key_width,
                actual: parts.len(),
            });
        }
        Ok(CompositeKey::new(parts.iter().cloned()))
    }

    /// Pair key components with their column names, preserving order.
    pub fn named_key(&self, key: &CompositeKey) -> Vec<(String, String)> {
        self.key_columns()
            .iter()
            .cloned()
            .zip(key.parts().iter().cloned())
            .collect()
    }

    /// Map positional values onto the settable columns. Fewer values than
    /// columns is a partial update; more is an arity error.
    pub fn item_from_positional(
        &self,
        values: &[String],
    ) -> Result<BTreeMap<String, String>, StorageError> {
        let settable = self.value_columns();
        if values.len() > settable.len() {
            return Err(StorageError::UnknownAttribute {
                table: self.table.clone(),
                attribute: format!("positional value #{}", settable.len() + 1),
            });
        }
        Ok(settable
            .iter()
            .cloned()
            .zip(values.iter().cloned())
            .collect())
    }

    /// Apply-time validation of string-typed oplog payloads: every attribute
    /// must name a settable column of this table.
    pub fn validate_item(&self, item: &BTreeMap<String, String>) -> Result<(), StorageError> {
        for attribute in item.keys() {
            if !self.value_columns().iter().any(|c| c == attribute) {
                return Err(StorageError::UnknownAttribute {
                    table: self.table.clone(),
                    attribute: attribute.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_key_width(&self, key: &CompositeKey) -> Result<(), StorageError> {
        if key.len() != self.key_width {
            return Err(StorageError::KeyWidthMismatch {
                table: self.table.clone(),
                expected: self.key_width,
                actual: key.len(),
            });
        }
        Ok(())
    }
}

/// RecordStore adapter interface, implemented per backend.
///
/// `write` is an upsert: `partial` is layered onto the existing record's
/// other attributes, never a full-row replace. Timestamp comparison is not
/// the adapter's job; callers gate staleness through the timestamp cache.
pub trait RecordStore {
    /// Declare a table. Idempotent for an identical declaration; a differing
    /// one is a [`StorageError::SchemaConflict`].
    fn create_table(&self, schema: &TableSchema) -> Result<(), StorageError>;

    fn schema(&self, table: &str) -> Result<TableSchema, StorageError>;

    fn read(&self, table: &str, key: &CompositeKey) -> Result<Option<Record>, StorageError>;

    fn write(
        &self,
        table: &str,
        key: &CompositeKey,
        partial: &BTreeMap<String, String>,
        timestamp: Timestamp,
    ) -> Result<(), StorageError>;

    /// All current (key, timestamp) pairs of a table, for cache rebuild.
    fn scan_with_timestamps(
        &self,
        table: &str,
    ) -> Result<Vec<(CompositeKey, Timestamp)>, StorageError>;
}

/// Bulk-load a table from a headered CSV file. The header row names the
/// columns; the first `key_width` columns form the composite key. Rows are
/// seeded at timestamp 0 and bypass the oplog — initial population is not
/// an operation.
///
/// Values are split on plain commas; quoted fields are not supported.
pub fn load_csv(
    store: &dyn RecordStore,
    table: &str,
    key_width: usize,
    path: &Path,
) -> Result<usize, StorageError> {
    let text = fs::read_to_string(path)?;
    let mut lines = text.lines();

    let header = lines.next().ok_or_else(|| {
        StorageError::Codec(format!("CSV file {} is empty", path.display()))
    })?;
    let columns: Vec<String> = header.split(',').map(|c| c.trim().to_string()).collect();
    if key_width == 0 || key_width >= columns.len() {
        return Err(StorageError::KeyWidthMismatch {
            table: table.to_string(),
            expected: key_width,
            actual: columns.len(),
        });
    }

    let schema = TableSchema::new(table, columns, key_width);
    store.create_table(&schema)?;

    let mut loaded = 0;
    for (line_no, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<String> = line.split(',').map(|f| f.trim().to_string()).collect();
        if fields.len() != schema.columns.len() {
            return Err(StorageError::Codec(format!(
                "CSV row {} has {} fields, expected {}",
                line_no + 2,
                fields.len(),
                schema.columns.len()
            )));
        }
        let key = CompositeKey::new(fields[..key_width].iter().cloned());
        let partial: BTreeMap<String, String> = schema
            .value_columns()
            .iter()
            .cloned()
            .zip(fields[key_width..].iter().cloned())
            .collect();
        store.write(table, &key, &partial, 0)?;
        loaded += 1;
    }

    info!(table, rows = loaded, path = %path.display(), "bulk-loaded table from CSV");
    Ok(loaded)
}
