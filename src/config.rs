//! Configuration System
//!
//! Declares the registered systems (backend kind, storage paths, table shape,
//! GET policy) plus logging. Loaded with the `config` crate: an optional TOML
//! file layered under `ROWSYNC_*` environment overrides.

use crate::error::SyncError;
use crate::logging::LoggingConfig;
use crate::system::GetPolicy;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Storage backend for one system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    Sled,
}

/// One registered system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub backend: BackendKind,

    /// Record store directory (sled backend only).
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Oplog directory (sled backend only).
    #[serde(default)]
    pub oplog_path: Option<PathBuf>,

    /// Table this system replicates.
    pub table: String,

    /// Ordered column names, key columns first.
    pub columns: Vec<String>,

    /// How many leading columns form the composite key.
    pub key_columns: usize,

    #[serde(default)]
    pub policy: GetPolicy,
}

impl SystemConfig {
    /// Shape checks that do not require touching storage.
    pub fn validate(&self, name: &str) -> Result<(), SyncError> {
        if self.key_columns == 0 || self.key_columns >= self.columns.len() {
            return Err(SyncError::Config(format!(
                "system {}: key_columns must be between 1 and {} (columns: {})",
                name,
                self.columns.len().saturating_sub(1),
                self.columns.len()
            )));
        }
        if self.backend == BackendKind::Sled && (self.path.is_none() || self.oplog_path.is_none())
        {
            return Err(SyncError::Config(format!(
                "system {}: sled backend requires both path and oplog_path",
                name
            )));
        }
        Ok(())
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowsyncConfig {
    /// Registered systems by name (names are matched case-insensitively).
    #[serde(default)]
    pub systems: HashMap<String, SystemConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RowsyncConfig {
    pub fn validate(&self) -> Result<(), SyncError> {
        for (name, system) in &self.systems {
            system.validate(name)?;
        }
        Ok(())
    }
}

/// Configuration loading facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from an explicit file, or from `rowsync.toml` in the working
    /// directory when present, with `ROWSYNC_*` environment overrides
    /// (`__` as the nesting separator) applied last.
    pub fn load(path: Option<&Path>) -> Result<RowsyncConfig, SyncError> {
        let mut builder = Config::builder();

        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name("rowsync").required(false)),
        };
        builder = builder.add_source(Environment::with_prefix("ROWSYNC").separator("__"));

        let config: RowsyncConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
