//! Integration tests for the rowsync replication engine

mod config_integration;
mod merge_semantics;
mod store_integration;
mod test_utils;
