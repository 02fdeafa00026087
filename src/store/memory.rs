//! In-memory record store, the document-store-shaped backend. Also the
//! default backend for tests.

use crate::error::StorageError;
use crate::store::{Record, RecordStore, TableSchema};
use crate::types::{CompositeKey, Timestamp};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug)]
struct MemoryTable {
    schema: TableSchema,
    rows: HashMap<CompositeKey, Record>,
}

/// HashMap-backed implementation of [`RecordStore`].
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: RwLock<HashMap<String, MemoryTable>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn create_table(&self, schema: &TableSchema) -> Result<(), StorageError> {
        let mut tables = self.tables.write();
        if let Some(existing) = tables.get(&schema.table) {
            if existing.schema != *schema {
                return Err(StorageError::SchemaConflict {
                    table: schema.table.clone(),
                });
            }
            return Ok(());
        }
        tables.insert(
            schema.table.clone(),
            MemoryTable {
                schema: schema.clone(),
                rows: HashMap::new(),
            },
        );
        Ok(())
    }

    fn schema(&self, table: &str) -> Result<TableSchema, StorageError> {
        self.tables
            .read()
            .get(table)
            .map(|t| t.schema.clone())
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))
    }

    fn read(&self, table: &str, key: &CompositeKey) -> Result<Option<Record>, StorageError> {
        let tables = self.tables.read();
        let t = tables
            .get(table)
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))?;
        Ok(t.rows.get(key).cloned())
    }

    fn write(
        &self,
        table: &str,
        key: &CompositeKey,
        partial: &BTreeMap<String, String>,
        timestamp: Timestamp,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))?;
        t.schema.validate_item(partial)?;
        if key.len() != t.schema.key_width {
            return Err(StorageError::KeyWidthMismatch {
                table: table.to_string(),
                expected: t.schema.key_width,
                actual: key.len(),
            });
        }

        let record = t.rows.entry(key.clone()).or_insert_with(|| Record {
            values: BTreeMap::new(),
            timestamp,
        });
        for (attribute, value) in partial {
            record.values.insert(attribute.clone(), value.clone());
        }
        record.timestamp = timestamp;
        Ok(())
    }

    fn scan_with_timestamps(
        &self,
        table: &str,
    ) -> Result<Vec<(CompositeKey, Timestamp)>, StorageError> {
        let tables = self.tables.read();
        let t = tables
            .get(table)
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))?;
        Ok(t.rows
            .iter()
            .map(|(key, record)| (key.clone(), record.timestamp))
            .collect())
    }
}
