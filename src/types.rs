//! Shared domain types
//!
//! The scalar logical timestamp, the composite record key, and the two
//! logged operation kinds. Everything here is plain data passed by value
//! between the store, oplog, cache and merge layers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical timestamp carried by every operation. Larger wins; wall-clock
/// meaning is up to the caller.
pub type Timestamp = i64;

/// Cache sentinel for a key that has never been written.
pub const TS_UNSEEN: Timestamp = -1;

/// Ordered key components identifying one record, compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompositeKey(Vec<String>);

impl CompositeKey {
    pub fn new<I>(parts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        CompositeKey(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

/// Kind of a logged operation. SETs carry state; GETs are annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Set,
    Get,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Set => write!(f, "SET"),
            Operation::Get => write!(f, "GET"),
        }
    }
}
