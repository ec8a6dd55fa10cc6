//! In-memory versioned world state
//!
//! Each key maps to an append-only vector of immutable versions. Nothing is
//! ever deleted, so the full history of every key is the audit trail.
//!
//! # Commit protocol
//!
//! ```text
//! begin(commit_id) → get/put/scan on TxContext → commit(tx)
//!                                                 ├─ read set still current → apply all writes
//!                                                 └─ any read key moved     → ReadConflict, apply nothing
//! ```
//!
//! Reads inside a unit observe committed state only; a unit does not see its
//! own buffered writes. Dropping a `TxContext` without committing discards it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use super::{KeyModification, KeyValue, StateIter, StoreError, WorldState};

#[derive(Debug, Clone)]
struct Version {
    commit_id: String,
    timestamp: DateTime<Utc>,
    value: Vec<u8>,
}

#[derive(Default)]
struct LedgerState {
    keys: BTreeMap<String, Vec<Version>>,
    commits: FxHashSet<String>,
    height: u64,
}

impl LedgerState {
    fn version_of(&self, key: &str) -> usize {
        self.keys.get(key).map_or(0, Vec::len)
    }
}

/// Result of a successful commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub commit_id: String,
    /// Number of committed units including this one
    pub height: u64,
    pub keys_written: usize,
}

/// Shared in-memory ledger
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a commit unit
    pub fn begin(&self, commit_id: impl Into<String>, timestamp: DateTime<Utc>) -> TxContext<'_> {
        TxContext {
            ledger: self,
            commit_id: commit_id.into(),
            timestamp,
            read_set: RefCell::new(FxHashMap::default()),
            write_set: BTreeMap::new(),
        }
    }

    /// Validate the unit's read set and apply its write set atomically
    pub fn commit(&self, tx: TxContext<'_>) -> Result<CommitReceipt, StoreError> {
        let mut state = self.state();

        if state.commits.contains(&tx.commit_id) {
            warn!(commit_id = %tx.commit_id, "Commit rejected: duplicate commit id");
            return Err(StoreError::DuplicateCommit(tx.commit_id));
        }

        for (key, seen) in tx.read_set.borrow().iter() {
            if state.version_of(key) != *seen {
                warn!(commit_id = %tx.commit_id, key = %key, "Commit rejected: read conflict");
                return Err(StoreError::ReadConflict { key: key.clone() });
            }
        }

        let keys_written = tx.write_set.len();
        for (key, value) in tx.write_set {
            state.keys.entry(key).or_default().push(Version {
                commit_id: tx.commit_id.clone(),
                timestamp: tx.timestamp,
                value,
            });
        }
        state.commits.insert(tx.commit_id.clone());
        state.height += 1;

        debug!(
            commit_id = %tx.commit_id,
            height = state.height,
            keys_written,
            "Commit applied"
        );

        Ok(CommitReceipt {
            commit_id: tx.commit_id,
            height: state.height,
            keys_written,
        })
    }

    /// Latest committed value of `key`
    pub fn latest(&self, key: &str) -> Option<Vec<u8>> {
        self.state()
            .keys
            .get(key)
            .and_then(|versions| versions.last())
            .map(|v| v.value.clone())
    }

    /// Number of committed versions of `key`
    pub fn version_count(&self, key: &str) -> usize {
        self.state().version_of(key)
    }

    /// Number of committed units
    pub fn height(&self) -> u64 {
        self.state().height
    }
}

/// One commit unit against a [`MemoryLedger`]
pub struct TxContext<'a> {
    ledger: &'a MemoryLedger,
    commit_id: String,
    timestamp: DateTime<Utc>,
    /// key -> number of versions observed at read time (0 = absent)
    read_set: RefCell<FxHashMap<String, usize>>,
    write_set: BTreeMap<String, Vec<u8>>,
}

impl TxContext<'_> {
    /// Keys buffered for write, in key order
    pub fn pending_writes(&self) -> impl Iterator<Item = &str> {
        self.write_set.keys().map(String::as_str)
    }
}

impl WorldState for TxContext<'_> {
    fn commit_id(&self) -> &str {
        &self.commit_id
    }

    fn commit_timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let state = self.ledger.state();
        let versions = state.keys.get(key);
        let seen = versions.map_or(0, Vec::len);
        // first read wins: OCC validates against what the unit first observed
        self.read_set
            .borrow_mut()
            .entry(key.to_string())
            .or_insert(seen);
        Ok(versions.and_then(|v| v.last()).map(|v| v.value.clone()))
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::Io("empty key".to_string()));
        }
        self.write_set.insert(key.to_string(), value);
        Ok(())
    }

    fn state_range<'a>(
        &'a self,
        start: &str,
        end: &str,
    ) -> Result<StateIter<'a, KeyValue>, StoreError> {
        if !end.is_empty() && start >= end {
            return Ok(Box::new(std::iter::empty()));
        }
        let upper = if end.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(end)
        };

        // snapshot at scan time; later commits are not reflected
        let snapshot: Vec<KeyValue> = self
            .ledger
            .state()
            .keys
            .range::<str, _>((Bound::Included(start), upper))
            .filter_map(|(key, versions)| {
                versions.last().map(|v| KeyValue {
                    key: key.clone(),
                    value: v.value.clone(),
                })
            })
            .collect();

        Ok(Box::new(snapshot.into_iter().map(Ok)))
    }

    fn key_history<'a>(
        &'a self,
        key: &str,
    ) -> Result<StateIter<'a, KeyModification>, StoreError> {
        let history: Vec<KeyModification> = self
            .ledger
            .state()
            .keys
            .get(key)
            .map(|versions| {
                versions
                    .iter()
                    .map(|v| KeyModification {
                        commit_id: v.commit_id.clone(),
                        timestamp: v.timestamp,
                        value: v.value.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Box::new(history.into_iter().map(Ok)))
    }
}
