//! Sled-backed record store, the relational/warehouse-shaped backend.

use crate::error::StorageError;
use crate::store::{Record, RecordStore, TableSchema};
use crate::types::{CompositeKey, Timestamp};
use std::collections::BTreeMap;
use std::path::Path;

/// Sled-based implementation of [`RecordStore`]. Schemas live under a
/// `schema:` prefix, rows under `row:<table>:` with the composite key
/// components bincode-encoded after the prefix. The length-prefixed
/// encoding keeps components with arbitrary content (separators, control
/// characters) from colliding or splitting on scan.
pub struct SledRecordStore {
    db: sled::Db,
}

impl SledRecordStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    fn schema_key(table: &str) -> String {
        format!("schema:{}", table)
    }

    fn row_prefix(table: &str) -> String {
        format!("row:{}:", table)
    }

    fn row_key(table: &str, key: &CompositeKey) -> Result<Vec<u8>, StorageError> {
        let mut bytes = Self::row_prefix(table).into_bytes();
        let encoded = bincode::serialize(key.parts())
            .map_err(|e| StorageError::Codec(format!("failed to encode row key: {}", e)))?;
        bytes.extend_from_slice(&encoded);
        Ok(bytes)
    }

    fn decode_record(value: &[u8]) -> Result<Record, StorageError> {
        bincode::deserialize(value)
            .map_err(|e| StorageError::Codec(format!("failed to decode record: {}", e)))
    }

    fn encode_record(record: &Record) -> Result<Vec<u8>, StorageError> {
        bincode::serialize(record)
            .map_err(|e| StorageError::Codec(format!("failed to encode record: {}", e)))
    }
}

impl RecordStore for SledRecordStore {
    fn create_table(&self, schema: &TableSchema) -> Result<(), StorageError> {
        let key = Self::schema_key(&schema.table);
        if let Some(existing) = self.db.get(key.as_bytes())? {
            let stored: TableSchema = bincode::deserialize(&existing)
                .map_err(|e| StorageError::Codec(format!("failed to decode schema: {}", e)))?;
            if stored != *schema {
                return Err(StorageError::SchemaConflict {
                    table: schema.table.clone(),
                });
            }
            return Ok(());
        }
        let value = bincode::serialize(schema)
            .map_err(|e| StorageError::Codec(format!("failed to encode schema: {}", e)))?;
        self.db.insert(key.as_bytes(), value)?;
        self.db.flush()?;
        Ok(())
    }

    fn schema(&self, table: &str) -> Result<TableSchema, StorageError> {
        match self.db.get(Self::schema_key(table).as_bytes())? {
            Some(value) => bincode::deserialize(&value)
                .map_err(|e| StorageError::Codec(format!("failed to decode schema: {}", e))),
            None => Err(StorageError::TableNotFound(table.to_string())),
        }
    }

    fn read(&self, table: &str, key: &CompositeKey) -> Result<Option<Record>, StorageError> {
        // Schema lookup doubles as the table-exists check.
        let schema = self.schema(table)?;
        if key.len() != schema.key_width {
            return Err(StorageError::KeyWidthMismatch {
                table: table.to_string(),
                expected: schema.key_width,
                actual: key.len(),
            });
        }
        match self.db.get(Self::row_key(table, key)?)? {
            Some(value) => Ok(Some(Self::decode_record(&value)?)),
            None => Ok(None),
        }
    }

    fn write(
        &self,
        table: &str,
        key: &CompositeKey,
        partial: &BTreeMap<String, String>,
        timestamp: Timestamp,
    ) -> Result<(), StorageError> {
        let schema = self.schema(table)?;
        schema.validate_item(partial)?;
        if key.len() != schema.key_width {
            return Err(StorageError::KeyWidthMismatch {
                table: table.to_string(),
                expected: schema.key_width,
                actual: key.len(),
            });
        }

        let row_key = Self::row_key(table, key)?;
        let mut record = match self.db.get(&row_key)? {
            Some(value) => Self::decode_record(&value)?,
            None => Record {
                values: BTreeMap::new(),
                timestamp,
            },
        };
        for (attribute, value) in partial {
            record.values.insert(attribute.clone(), value.clone());
        }
        record.timestamp = timestamp;

        self.db.insert(row_key, Self::encode_record(&record)?)?;
        self.db.flush()?;
        Ok(())
    }

    fn scan_with_timestamps(
        &self,
        table: &str,
    ) -> Result<Vec<(CompositeKey, Timestamp)>, StorageError> {
        // Ensure the table is declared before scanning an empty prefix.
        self.schema(table)?;
        let prefix = Self::row_prefix(table);
        let mut pairs = Vec::new();
        for item in self.db.scan_prefix(prefix.as_bytes()) {
            let (key_bytes, value) = item?;
            let parts: Vec<String> = bincode::deserialize(&key_bytes[prefix.len()..])
                .map_err(|e| StorageError::Codec(format!("failed to decode row key: {}", e)))?;
            let key = CompositeKey::new(parts);
            let record = Self::decode_record(&value)?;
            pairs.push((key, record.timestamp));
        }
        Ok(pairs)
    }
}
