//! Merge engine
//!
//! Reconciles a local system against a log fetched from a remote store by
//! last-writer-wins over scalar timestamps. Only entries strictly newer than
//! the locally cached timestamp for their key are applied, and application
//! routes through the normal SET path so writes are validated, persisted,
//! logged and cached exactly once. Re-running a merge with the same source
//! log applies zero further writes.

use crate::error::StorageError;
use crate::oplog::{EntryFilter, LogEntry};
use crate::system::{SetOutcome, System};
use crate::types::{CompositeKey, Operation};
use std::collections::HashMap;
use tracing::{debug, info};

/// What a merge pass did. Stale skips are expected, not failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Entries applied through the SET path.
    pub applied: usize,
    /// Remote SET entries rejected by the timestamp gate.
    pub stale_skipped: usize,
    /// Remote GET entries discarded; reads carry no state.
    pub gets_ignored: usize,
}

struct Candidate {
    entry: LogEntry,
    local: bool,
}

/// Merge `source` entries into `target`.
///
/// Remote SET entries are unioned with the target's own SET entries newer
/// than the remote batch's earliest timestamp, grouped by (table, key), and
/// only the newest entry per group survives. Ties never replace the
/// incumbent, and local entries are seeded first, so on equal timestamps the
/// local write wins — a deterministic rule independent of iteration order.
pub fn merge_logs(target: &System, source: &[LogEntry]) -> Result<MergeOutcome, StorageError> {
    let mut outcome = MergeOutcome::default();

    let mut remote_sets: Vec<&LogEntry> = Vec::new();
    for entry in source {
        match entry.operation {
            Operation::Set => remote_sets.push(entry),
            Operation::Get => outcome.gets_ignored += 1,
        }
    }
    if remote_sets.is_empty() {
        debug!(system = target.name(), "merge source has no SET entries");
        return Ok(outcome);
    }

    let horizon = remote_sets
        .iter()
        .map(|e| e.timestamp)
        .min()
        .unwrap_or_default();
    let local_sets = target.oplog_entries(&EntryFilter::sets().since(horizon))?;

    // Group by (table, key), keeping the max-timestamp entry. Local entries
    // are seeded first; replacement requires a strictly greater timestamp.
    let mut groups: HashMap<(String, CompositeKey), Candidate> = HashMap::new();
    for entry in local_sets {
        let slot = (entry.table.clone(), entry.key());
        let newer = groups
            .get(&slot)
            .map_or(true, |current| entry.timestamp > current.entry.timestamp);
        if newer {
            groups.insert(slot, Candidate { entry, local: true });
        }
    }
    for entry in remote_sets {
        let slot = (entry.table.clone(), entry.key());
        let newer = groups
            .get(&slot)
            .map_or(true, |current| entry.timestamp > current.entry.timestamp);
        if newer {
            let displaced = groups.insert(
                slot,
                Candidate {
                    entry: entry.clone(),
                    local: false,
                },
            );
            if matches!(displaced, Some(ref c) if !c.local) {
                outcome.stale_skipped += 1;
            }
        } else {
            // Shadowed within the batch, by a newer remote entry or a local
            // write at the same or a later timestamp.
            outcome.stale_skipped += 1;
        }
    }

    // Deterministic application order: ascending timestamp, then key.
    let mut survivors: Vec<Candidate> = groups.into_values().filter(|c| !c.local).collect();
    survivors.sort_by(|a, b| {
        a.entry
            .timestamp
            .cmp(&b.entry.timestamp)
            .then_with(|| a.entry.key().cmp(&b.entry.key()))
    });

    for candidate in survivors {
        let entry = candidate.entry;
        if entry.table != target.table() {
            debug!(
                system = target.name(),
                table = entry.table,
                "skipping entry for foreign table"
            );
            continue;
        }
        let key = entry.key();
        match target.set(&key, &entry.item, entry.timestamp)? {
            SetOutcome::Applied => outcome.applied += 1,
            SetOutcome::SkippedStale { .. } => outcome.stale_skipped += 1,
        }
    }

    info!(
        system = target.name(),
        applied = outcome.applied,
        stale = outcome.stale_skipped,
        gets = outcome.gets_ignored,
        "merge pass complete"
    );
    Ok(outcome)
}
