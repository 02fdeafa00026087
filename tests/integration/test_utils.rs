//! Shared helpers for integration tests.

use rowsync::error::StorageError;
use rowsync::oplog::{LogEntry, MemoryOplog};
use rowsync::store::{MemoryRecordStore, Record, RecordStore, TableSchema};
use rowsync::system::{GetPolicy, System};
use rowsync::types::{CompositeKey, Timestamp};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const GRADE_COLUMNS: [&str; 4] = ["student_id", "course_id", "roll_no", "grade"];

pub fn grades_schema() -> TableSchema {
    TableSchema::new(
        "grades",
        GRADE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        2,
    )
}

/// Memory-backed system over the grades table.
pub fn grades_system(name: &str) -> System {
    let store = MemoryRecordStore::new();
    store.create_table(&grades_schema()).unwrap();
    System::new(
        name,
        "grades",
        Box::new(store),
        Box::new(MemoryOplog::new()),
        GetPolicy::default(),
    )
}

/// Store wrapper that refuses writes once a budget is spent, for exercising
/// mid-batch failure behavior. Reads and scans always pass through.
pub struct FaultyStore {
    inner: MemoryRecordStore,
    writes_left: Arc<AtomicUsize>,
}

impl FaultyStore {
    pub fn new(writes_allowed: usize) -> (Self, Arc<AtomicUsize>) {
        let writes_left = Arc::new(AtomicUsize::new(writes_allowed));
        let store = FaultyStore {
            inner: MemoryRecordStore::new(),
            writes_left: Arc::clone(&writes_left),
        };
        (store, writes_left)
    }
}

impl RecordStore for FaultyStore {
    fn create_table(&self, schema: &TableSchema) -> Result<(), StorageError> {
        self.inner.create_table(schema)
    }

    fn schema(&self, table: &str) -> Result<TableSchema, StorageError> {
        self.inner.schema(table)
    }

    fn read(&self, table: &str, key: &CompositeKey) -> Result<Option<Record>, StorageError> {
        self.inner.read(table, key)
    }

    fn write(
        &self,
        table: &str,
        key: &CompositeKey,
        partial: &BTreeMap<String, String>,
        timestamp: Timestamp,
    ) -> Result<(), StorageError> {
        let spent = self
            .writes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err();
        if spent {
            return Err(StorageError::Backend("injected write failure".to_string()));
        }
        self.inner.write(table, key, partial, timestamp)
    }

    fn scan_with_timestamps(
        &self,
        table: &str,
    ) -> Result<Vec<(CompositeKey, Timestamp)>, StorageError> {
        self.inner.scan_with_timestamps(table)
    }
}

/// Grades system whose store fails every write after the first
/// `writes_allowed`. The returned handle refills the budget.
pub fn faulty_grades_system(name: &str, writes_allowed: usize) -> (System, Arc<AtomicUsize>) {
    let (store, budget) = FaultyStore::new(writes_allowed);
    store.create_table(&grades_schema()).unwrap();
    let system = System::new(
        name,
        "grades",
        Box::new(store),
        Box::new(MemoryOplog::new()),
        GetPolicy::default(),
    );
    (system, budget)
}

pub fn item(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// SET entry for the grades table, keyed by (student, course).
pub fn set_entry(ts: i64, student: &str, course: &str, pairs: &[(&str, &str)]) -> LogEntry {
    LogEntry::set(
        ts,
        "grades",
        vec![
            ("student_id".to_string(), student.to_string()),
            ("course_id".to_string(), course.to_string()),
        ],
        item(pairs),
    )
}

pub fn get_entry(ts: i64, student: &str, course: &str) -> LogEntry {
    LogEntry::get(
        ts,
        "grades",
        vec![
            ("student_id".to_string(), student.to_string()),
            ("course_id".to_string(), course.to_string()),
        ],
    )
}
