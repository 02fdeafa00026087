//! CLI parse: clap types for rowsync. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Rowsync CLI - operation-log replication with last-writer-wins merge
#[derive(Parser)]
#[command(name = "rowsync")]
#[command(about = "Operation-log replication and last-writer-wins merge for keyed record sets")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (defaults to ./rowsync.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a command file against the registered systems
    Run {
        /// UTF-8 command file, one command per line
        file: PathBuf,
    },
    /// Execute a single command line
    Exec {
        /// Command, e.g. "10, HIVE.SET((SID1033, CSE016), A)"
        line: String,
    },
    /// Bulk-load a system's table from a headered CSV file
    Load {
        system: String,
        csv: PathBuf,
    },
    /// Merge one system's oplog into another
    Merge {
        target: String,
        source: String,
    },
    /// Print a system's current table
    Show {
        system: String,
    },
    /// Print a system's oplog
    Log {
        system: String,
    },
    /// List registered systems
    Systems,
}
