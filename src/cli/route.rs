//! CLI route: builds the system registry from configuration and dispatches
//! subcommands to the interpreter and presentation.

use crate::cli::output::{render_log, render_records};
use crate::cli::parse::Commands;
use crate::command::{Command, Executed, Interpreter};
use crate::config::{BackendKind, RowsyncConfig, SystemConfig};
use crate::error::SyncError;
use crate::oplog::{EntryFilter, MemoryOplog, Oplog, SledOplog};
use crate::store::{MemoryRecordStore, RecordStore, SledRecordStore, TableSchema};
use crate::system::{SetOutcome, System};
use std::fs::File;
use std::io::BufReader;
use tracing::info;

/// Runtime context for CLI execution: the interpreter with every configured
/// system registered and its cache rebuilt from the backing store.
pub struct RunContext {
    interpreter: Interpreter,
}

impl RunContext {
    pub fn new(config: &RowsyncConfig) -> Result<Self, SyncError> {
        config.validate()?;
        let mut interpreter = Interpreter::new();
        for (name, system_config) in &config.systems {
            let system = build_system(name, system_config)?;
            info!(system = system.name(), table = system.table(), "registered system");
            interpreter.register(system);
        }
        Ok(RunContext { interpreter })
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    fn require(&self, name: &str) -> Result<&System, SyncError> {
        self.interpreter
            .system(name)
            .ok_or_else(|| SyncError::UnknownSystem(name.to_uppercase()))
    }

    /// Execute one CLI subcommand, producing the text to print.
    pub fn execute(&self, command: &Commands) -> Result<String, SyncError> {
        match command {
            Commands::Run { file } => {
                let reader = BufReader::new(File::open(file)?);
                let report = self.interpreter.run_script(reader)?;
                Ok(report.to_string())
            }
            Commands::Exec { line } => {
                let executed = self.interpreter.run_line(line)?;
                Ok(describe_executed(&executed))
            }
            Commands::Load { system, csv } => {
                let target = self.require(system)?;
                let loaded = target.load_csv(csv)?;
                Ok(format!("Loaded {} rows into {}", loaded, target.name()))
            }
            Commands::Merge { target, source } => {
                let command = Command::Merge {
                    target: target.to_uppercase(),
                    source: source.to_uppercase(),
                };
                let executed = self.interpreter.dispatch(&command)?;
                Ok(describe_executed(&executed))
            }
            Commands::Show { system } => {
                let target = self.require(system)?;
                let schema = target.schema()?;
                let rows = target.rows()?;
                Ok(render_records(&schema, &rows))
            }
            Commands::Log { system } => {
                let target = self.require(system)?;
                let entries = target.oplog_entries(&EntryFilter::all())?;
                Ok(render_log(&entries))
            }
            Commands::Systems => Ok(self.interpreter.system_names().join("\n")),
        }
    }
}

/// Assemble one system from its configuration: backend store, oplog sink,
/// declared table, and a cache rebuilt from whatever rows already exist.
pub fn build_system(name: &str, config: &SystemConfig) -> Result<System, SyncError> {
    config.validate(name)?;
    let schema = TableSchema::new(&config.table, config.columns.clone(), config.key_columns);

    let (store, oplog): (Box<dyn RecordStore>, Box<dyn Oplog>) = match config.backend {
        BackendKind::Memory => (
            Box::new(MemoryRecordStore::new()),
            Box::new(MemoryOplog::new()),
        ),
        BackendKind::Sled => {
            let path = config
                .path
                .as_ref()
                .ok_or_else(|| SyncError::Config(format!("system {}: missing path", name)))?;
            let oplog_path = config
                .oplog_path
                .as_ref()
                .ok_or_else(|| SyncError::Config(format!("system {}: missing oplog_path", name)))?;
            (
                Box::new(SledRecordStore::open(path)?),
                Box::new(SledOplog::open(oplog_path)?),
            )
        }
    };
    store.create_table(&schema)?;

    let system = System::new(name, &config.table, store, oplog, config.policy);
    system.rebuild_cache()?;
    Ok(system)
}

fn describe_executed(executed: &Executed) -> String {
    match executed {
        Executed::Set(SetOutcome::Applied) => "SET applied".to_string(),
        Executed::Set(SetOutcome::SkippedStale { cached }) => {
            format!("SET skipped as stale (cached timestamp {})", cached)
        }
        Executed::Get(Some(record)) => {
            let values = record
                .values
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} (timestamp {})", values, record.timestamp)
        }
        Executed::Get(None) => "no record".to_string(),
        Executed::Merge(outcome) => format!(
            "Merge applied {} entries ({} stale, {} GETs ignored)",
            outcome.applied, outcome.stale_skipped, outcome.gets_ignored
        ),
    }
}
