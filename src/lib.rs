//! Rowsync: operation-log replication with last-writer-wins merge
//!
//! Synchronizes a single logical record set across independently-managed
//! stores. Each store keeps its own rows plus an append-only operation log;
//! divergent copies are reconciled by replaying only the log entries each
//! store is missing, gated per key by a timestamp cache so effects are never
//! duplicated or re-ordered.

pub mod cache;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod merge;
pub mod oplog;
pub mod store;
pub mod system;
pub mod types;
