//! Error types for the rowsync replication engine.

use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table {table} already exists with a different schema")]
    SchemaConflict { table: String },

    #[error("Unknown attribute {attribute:?} for table {table}")]
    UnknownAttribute { table: String, attribute: String },

    #[error("Table {table} expects {expected} key components, got {actual}")]
    KeyWidthMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("Corrupt stored value: {0}")]
    Codec(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

/// Command-grammar parse errors. Malformed input is reported and the
/// offending line skipped; it is never fatal to the surrounding batch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unexpected end of input (expected {expected})")]
    UnexpectedEof { expected: String },

    #[error("Expected {expected}, found {found:?} at column {column}")]
    UnexpectedToken {
        expected: String,
        found: String,
        column: usize,
    },

    #[error("Empty literal at column {column}")]
    EmptyLiteral { column: usize },

    #[error("Invalid timestamp {literal:?}")]
    InvalidTimestamp { literal: String },

    #[error("Unknown operation {found:?} (expected SET, GET or MERGE)")]
    UnknownOperation { found: String },

    #[error("Trailing input after command at column {column}")]
    TrailingInput { column: usize },
}

/// Top-level errors surfaced to the CLI and script runner.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Unknown system: {0}")]
    UnknownSystem(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        SyncError::Config(err.to_string())
    }
}
