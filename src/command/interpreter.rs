//! Command interpreter
//!
//! Owns the registry of named systems and dispatches parsed commands: SET
//! and GET route to the addressed system (which performs the cache gate and
//! log append), MERGE routes to the merge engine with the named system's
//! full oplog as source. Commands are processed strictly one at a time.

use crate::command::{parse_command, Command};
use crate::error::SyncError;
use crate::merge::{merge_logs, MergeOutcome};
use crate::oplog::EntryFilter;
use crate::store::Record;
use crate::system::{SetOutcome, System};
use std::collections::HashMap;
use std::fmt;
use std::io::BufRead;
use tracing::{info, warn};

/// What a dispatched command did.
#[derive(Debug)]
pub enum Executed {
    Set(SetOutcome),
    Get(Option<Record>),
    Merge(MergeOutcome),
}

/// Tally for one command batch. Parse failures and failed operations skip
/// the offending line only; the batch always runs to end of input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub lines: usize,
    pub executed: usize,
    pub applied_sets: usize,
    pub stale_skips: usize,
    pub merges: usize,
    pub parse_failures: usize,
    pub failed_ops: usize,
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} lines: {} executed ({} sets applied, {} stale, {} merges), {} parse failures, {} failed",
            self.lines,
            self.executed,
            self.applied_sets,
            self.stale_skips,
            self.merges,
            self.parse_failures,
            self.failed_ops
        )
    }
}

/// Registry of systems plus the dispatch loop.
#[derive(Default)]
pub struct Interpreter {
    systems: HashMap<String, System>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a system under its (uppercased) name. A second registration
    /// under the same name replaces the first.
    pub fn register(&mut self, system: System) {
        self.systems.insert(system.name().to_string(), system);
    }

    pub fn system(&self, name: &str) -> Option<&System> {
        self.systems.get(&name.to_uppercase())
    }

    pub fn system_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.systems.keys().cloned().collect();
        names.sort();
        names
    }

    fn require(&self, name: &str) -> Result<&System, SyncError> {
        self.systems
            .get(name)
            .ok_or_else(|| SyncError::UnknownSystem(name.to_string()))
    }

    /// Dispatch one parsed command.
    pub fn dispatch(&self, command: &Command) -> Result<Executed, SyncError> {
        match command {
            Command::Set {
                system,
                timestamp,
                keys,
                values,
            } => {
                let target = self.require(system)?;
                let outcome = target.set_positional(keys, values, *timestamp)?;
                Ok(Executed::Set(outcome))
            }
            Command::Get {
                system,
                timestamp,
                keys,
            } => {
                let target = self.require(system)?;
                let record = target.get_positional(keys, *timestamp)?;
                Ok(Executed::Get(record))
            }
            Command::Merge { target, source } => {
                let target_system = self.require(target)?;
                let source_system = self.require(source)?;
                let source_log = source_system.oplog_entries(&EntryFilter::all())?;
                let outcome = merge_logs(target_system, &source_log)?;
                Ok(Executed::Merge(outcome))
            }
        }
    }

    /// Parse and dispatch a single command line.
    pub fn run_line(&self, line: &str) -> Result<Executed, SyncError> {
        let command = parse_command(line)?;
        self.dispatch(&command)
    }

    /// Run a UTF-8, line-oriented command stream to end of input. Blank
    /// lines are ignored; malformed or failing lines are logged, counted
    /// and skipped.
    pub fn run_script<R: BufRead>(&self, reader: R) -> Result<BatchReport, SyncError> {
        let mut report = BatchReport::default();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            report.lines += 1;

            let command = match parse_command(line) {
                Ok(command) => command,
                Err(e) => {
                    warn!(line = line_no + 1, input = line, error = %e, "skipping malformed command");
                    report.parse_failures += 1;
                    continue;
                }
            };

            match self.dispatch(&command) {
                Ok(Executed::Set(SetOutcome::Applied)) => {
                    report.executed += 1;
                    report.applied_sets += 1;
                }
                Ok(Executed::Set(SetOutcome::SkippedStale { cached })) => {
                    report.executed += 1;
                    report.stale_skips += 1;
                    info!(line = line_no + 1, cached, "stale SET skipped");
                }
                Ok(Executed::Get(record)) => {
                    report.executed += 1;
                    match record {
                        Some(record) => info!(line = line_no + 1, ?record, "GET"),
                        None => info!(line = line_no + 1, "GET: no record"),
                    }
                }
                Ok(Executed::Merge(outcome)) => {
                    report.executed += 1;
                    report.merges += 1;
                    report.applied_sets += outcome.applied;
                    report.stale_skips += outcome.stale_skipped;
                }
                Err(e) => {
                    warn!(line = line_no + 1, input = line, error = %e, "command failed");
                    report.failed_ops += 1;
                }
            }
        }
        info!(%report, "batch complete");
        Ok(report)
    }
}
