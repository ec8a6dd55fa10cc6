//! Typed record access over the world state
//!
//! JSON in, JSON out. Absence is `Ok(None)`; codec faults surface as
//! `StoreError::Serialization` with the offending key.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::RegistryError;
use super::types::{LandRecord, TransferRecord};
use crate::ledger::{KeyModification, KeyValue, StateIter, StoreError, WorldState};

pub fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

pub fn encode<T: Serialize>(key: &str, value: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value).map_err(|e| StoreError::Serialization {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Record-level accessors available on every [`WorldState`]
pub trait RecordStore: WorldState {
    /// Raw point read; `None` when the key is absent
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RegistryError> {
        Ok(self.get_state(key)?)
    }

    /// Raw buffered write into the current unit
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), RegistryError> {
        Ok(self.put_state(key, value)?)
    }

    /// Decode the land record at `plot_id`
    fn get_land(&self, plot_id: &str) -> Result<Option<LandRecord>, RegistryError> {
        match self.get_state(plot_id)? {
            Some(bytes) => Ok(Some(decode(plot_id, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Encode and write a land record under its plot id
    fn put_land(&mut self, record: &LandRecord) -> Result<(), RegistryError> {
        let bytes = encode(&record.plot_id, record)?;
        self.put(&record.plot_id, bytes)
    }

    /// Decode the transfer record at `key`
    fn get_transfer(&self, key: &str) -> Result<Option<TransferRecord>, RegistryError> {
        match self.get_state(key)? {
            Some(bytes) => Ok(Some(decode(key, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Encode and write a transfer record under `key`
    fn put_transfer(&mut self, key: &str, record: &TransferRecord) -> Result<(), RegistryError> {
        let bytes = encode(key, record)?;
        self.put(key, bytes)
    }

    /// Latest values for keys in `[start, end)`, key order
    fn range_scan(&self, start: &str, end: &str) -> Result<StateIter<'_, KeyValue>, RegistryError> {
        Ok(self.state_range(start, end)?)
    }

    /// Every committed value of `key`, oldest first
    fn version_history(&self, key: &str) -> Result<StateIter<'_, KeyModification>, RegistryError> {
        Ok(self.key_history(key)?)
    }
}

impl<W: WorldState + ?Sized> RecordStore for W {}
