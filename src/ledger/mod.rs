//! World State - versioned key-value collaborator
//!
//! The registry never owns storage. Every operation runs against a
//! [`WorldState`] scoped to exactly one commit unit: reads observe committed
//! state, writes are buffered and become visible only when the ordering layer
//! commits the unit as a whole.
//!
//! [`MemoryLedger`] is an in-process implementation with the same contract:
//! arena-style version history per key and optimistic concurrency control on
//! the point-read set at commit time.

pub mod memory;

pub use memory::{CommitReceipt, MemoryLedger, TxContext};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Store-side failures (I/O, codec, commit-time aborts)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("World state I/O error: {0}")]
    Io(String),

    #[error("Failed to (de)serialize value at key {key}: {reason}")]
    Serialization { key: String, reason: String },

    #[error("Read conflict on key {key}: version changed since it was read")]
    ReadConflict { key: String },

    #[error("Duplicate commit id: {0}")]
    DuplicateCommit(String),
}

/// One entry of a range scan
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

/// One historical version of a key
#[derive(Debug, Clone, PartialEq)]
pub struct KeyModification {
    /// Commit that wrote this version
    pub commit_id: String,
    pub timestamp: DateTime<Utc>,
    pub value: Vec<u8>,
}

/// Lazy, finite, single-pass sequence produced by scans
pub type StateIter<'a, T> = Box<dyn Iterator<Item = Result<T, StoreError>> + 'a>;

/// Versioned store handle for the currently executing commit unit
pub trait WorldState {
    /// Identifier the ordering layer assigned to this unit
    fn commit_id(&self) -> &str;

    /// Timestamp the ordering layer assigned to this unit
    fn commit_timestamp(&self) -> DateTime<Utc>;

    /// Point read of committed state. `None` means absent, not an error.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Buffer a write into the current unit
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Keys in `[start, end)` by byte order. An empty `end` is unbounded.
    fn state_range<'a>(&'a self, start: &str, end: &str)
    -> Result<StateIter<'a, KeyValue>, StoreError>;

    /// Every committed version of `key`, oldest first
    fn key_history<'a>(&'a self, key: &str)
    -> Result<StateIter<'a, KeyModification>, StoreError>;
}

/// Test doubles for the world state
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::BTreeMap;

    /// World state that fails selected calls on demand
    pub struct FaultyState {
        pub data: BTreeMap<String, Vec<u8>>,
        pub history: BTreeMap<String, Vec<KeyModification>>,
        pub writes: Vec<(String, Vec<u8>)>,
        pub fail_get: bool,
        pub fail_put: bool,
        pub fail_range: bool,
        pub fail_history: bool,
        /// Yield an error item in the middle of range scans
        pub poison_range_item: bool,
    }

    impl FaultyState {
        pub fn new() -> Self {
            Self {
                data: BTreeMap::new(),
                history: BTreeMap::new(),
                writes: Vec::new(),
                fail_get: false,
                fail_put: false,
                fail_range: false,
                fail_history: false,
                poison_range_item: false,
            }
        }

        pub fn seed(&mut self, key: &str, value: &[u8]) {
            self.data.insert(key.to_string(), value.to_vec());
        }
    }

    impl WorldState for FaultyState {
        fn commit_id(&self) -> &str {
            "mock-commit"
        }

        fn commit_timestamp(&self) -> DateTime<Utc> {
            DateTime::<Utc>::UNIX_EPOCH
        }

        fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            if self.fail_get {
                return Err(StoreError::Io("mock get failure".to_string()));
            }
            Ok(self.data.get(key).cloned())
        }

        fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
            if self.fail_put {
                return Err(StoreError::Io("mock put failure".to_string()));
            }
            self.writes.push((key.to_string(), value));
            Ok(())
        }

        fn state_range<'a>(
            &'a self,
            start: &str,
            end: &str,
        ) -> Result<StateIter<'a, KeyValue>, StoreError> {
            if self.fail_range {
                return Err(StoreError::Io("mock range failure".to_string()));
            }
            let mut items: Vec<Result<KeyValue, StoreError>> = self
                .data
                .iter()
                .filter(|(k, _)| k.as_str() >= start && (end.is_empty() || k.as_str() < end))
                .map(|(k, v)| {
                    Ok(KeyValue {
                        key: k.clone(),
                        value: v.clone(),
                    })
                })
                .collect();
            if self.poison_range_item {
                items.insert(0, Err(StoreError::Io("mock iterator failure".to_string())));
            }
            Ok(Box::new(items.into_iter()))
        }

        fn key_history<'a>(
            &'a self,
            key: &str,
        ) -> Result<StateIter<'a, KeyModification>, StoreError> {
            if self.fail_history {
                return Err(StoreError::Io("mock history failure".to_string()));
            }
            let versions = self.history.get(key).cloned().unwrap_or_default();
            Ok(Box::new(versions.into_iter().map(Ok)))
        }
    }
}
