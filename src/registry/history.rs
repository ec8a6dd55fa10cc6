//! Ownership history reconstruction
//!
//! Two independent sources describe the transfers of a plot:
//!
//! 1. the land record's own version history, whose `transferHistory` lists
//!    point at transfer records;
//! 2. the transfer records themselves, found by range-scanning the plot's
//!    reserved key prefix.
//!
//! Both feed one map keyed by transfer id, so a transfer reachable from both
//! appears once. Output is ordered by (timestamp, transaction id).

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::error::RegistryError;
use super::store::{RecordStore, decode};
use super::types::{LandRecord, TransferRecord, transfer_key_range, validate_plot_id};
use crate::ledger::WorldState;

/// Per-source counters from one reconstruction
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    pub versions_scanned: usize,
    pub from_versions: usize,
    pub from_range: usize,
    pub skipped: usize,
}

pub struct HistoryReconstructor<'a, W: WorldState + ?Sized> {
    state: &'a W,
    merged: FxHashMap<String, TransferRecord>,
    stats: MergeStats,
}

impl<'a, W: WorldState + ?Sized> HistoryReconstructor<'a, W> {
    pub fn new(state: &'a W) -> Self {
        Self {
            state,
            merged: FxHashMap::default(),
            stats: MergeStats::default(),
        }
    }

    /// Deduplicated, deterministically ordered transfer timeline
    pub fn reconstruct(self, plot_id: &str) -> Result<Vec<TransferRecord>, RegistryError> {
        self.reconstruct_with_stats(plot_id).map(|(history, _)| history)
    }

    /// Same as [`Self::reconstruct`], plus per-source counters
    pub fn reconstruct_with_stats(
        mut self,
        plot_id: &str,
    ) -> Result<(Vec<TransferRecord>, MergeStats), RegistryError> {
        validate_plot_id(plot_id)?;

        self.merge_version_history(plot_id)?;
        self.merge_transfer_range(plot_id)?;

        let mut history: Vec<TransferRecord> = self.merged.into_values().collect();
        history.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.transaction_id.cmp(&b.transaction_id))
                .then_with(|| a.transfer_id.cmp(&b.transfer_id))
        });

        debug!(
            plot_id = %plot_id,
            transfers = history.len(),
            versions = self.stats.versions_scanned,
            from_versions = self.stats.from_versions,
            from_range = self.stats.from_range,
            skipped = self.stats.skipped,
            "Reconstructed land history"
        );
        Ok((history, self.stats))
    }

    fn insert(&mut self, transfer: TransferRecord) -> bool {
        if self.merged.contains_key(&transfer.transfer_id) {
            return false;
        }
        self.merged.insert(transfer.transfer_id.clone(), transfer);
        true
    }

    /// Source 1: resolve every key listed by any version of the record
    fn merge_version_history(&mut self, plot_id: &str) -> Result<(), RegistryError> {
        let state = self.state;
        // later versions repeat earlier keys; transfer records are immutable
        let mut resolved: FxHashSet<String> = FxHashSet::default();

        for modification in state.version_history(plot_id)? {
            let modification = modification?;
            self.stats.versions_scanned += 1;

            let version: LandRecord = match decode(plot_id, &modification.value) {
                Ok(version) => version,
                Err(e) => {
                    self.stats.skipped += 1;
                    debug!(plot_id = %plot_id, commit_id = %modification.commit_id, error = %e, "Skipping undecodable record version");
                    continue;
                }
            };

            for key in version.transfer_history {
                if !resolved.insert(key.clone()) {
                    continue;
                }
                match state.get_transfer(&key) {
                    Ok(Some(transfer)) if transfer.plot_id == plot_id => {
                        if self.insert(transfer) {
                            self.stats.from_versions += 1;
                        }
                    }
                    Ok(_) | Err(_) => {
                        self.stats.skipped += 1;
                        debug!(plot_id = %plot_id, key = %key, "Skipping unresolvable transfer key");
                    }
                }
            }
        }
        Ok(())
    }

    /// Source 2: scan the plot's transfer-key range directly
    fn merge_transfer_range(&mut self, plot_id: &str) -> Result<(), RegistryError> {
        let state = self.state;
        let (start, end) = transfer_key_range(plot_id);

        for entry in state.range_scan(&start, &end)? {
            let entry = entry?;
            match decode::<TransferRecord>(&entry.key, &entry.value) {
                // a plot id containing '-' can share this prefix with another plot
                Ok(transfer) if transfer.plot_id == plot_id => {
                    if self.insert(transfer) {
                        self.stats.from_range += 1;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    self.stats.skipped += 1;
                    debug!(key = %entry.key, error = %e, "Skipping undecodable transfer record");
                }
            }
        }
        Ok(())
    }
}
