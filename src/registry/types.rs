//! Registry Core Types
//!
//! Persisted shapes of land records and transfer records, the key scheme that
//! links them, and input validation for the public operations.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::error::RegistryError;
use super::status::LandStatus;

/// Reserved prefix separating transfer-record keys from land-record keys
pub const TRANSFER_KEY_PREFIX: &str = "TRANSFER-";

/// World-state key of the transfer written by `commit_id` for `plot_id`
pub fn transfer_key(plot_id: &str, commit_id: &str) -> String {
    format!("{}{}-{}", TRANSFER_KEY_PREFIX, plot_id, commit_id)
}

/// Half-open key range `[start, end)` holding every transfer key of a plot
///
/// `end` is the prefix with its trailing `-` bumped to `.`, the next byte.
pub fn transfer_key_range(plot_id: &str) -> (String, String) {
    (
        format!("{}{}-", TRANSFER_KEY_PREFIX, plot_id),
        format!("{}{}.", TRANSFER_KEY_PREFIX, plot_id),
    )
}

#[inline]
pub fn is_transfer_key(key: &str) -> bool {
    key.starts_with(TRANSFER_KEY_PREFIX)
}

/// Human-readable transfer id: plot, unix seconds, commit
pub fn transfer_id(plot_id: &str, at: DateTime<Utc>, commit_id: &str) -> String {
    format!(
        "{}{}-{}-{}",
        TRANSFER_KEY_PREFIX,
        plot_id,
        at.timestamp(),
        commit_id
    )
}

/// Second-precision UTC, the persisted timestamp granularity
pub fn truncate_to_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(at.timestamp(), 0).unwrap_or(at)
}

/// RFC 3339 rendering used in logs (`2024-01-01T00:00:00Z`)
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Authoritative ownership record, keyed by `plot_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandRecord {
    pub plot_id: String,
    pub owner_id: String,
    pub owner_name: String,
    pub area: f64,
    pub location: String,
    /// Time of the last mutation
    pub timestamp: DateTime<Utc>,
    /// Owner before the most recent transfer; empty if never transferred
    #[serde(default, deserialize_with = "null_as_default")]
    pub previous_owner_id: String,
    /// Transfer-record keys, append-only, chronological
    #[serde(default, deserialize_with = "null_as_default")]
    pub transfer_history: Vec<String>,
    pub status: LandStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_by: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_modified_by: String,
}

impl LandRecord {
    /// Fresh record as written by CreateLandRecord
    pub fn new(input: NewLandRecord, caller_id: &str, at: DateTime<Utc>) -> Self {
        Self {
            plot_id: input.plot_id,
            owner_id: input.owner_id,
            owner_name: input.owner_name,
            area: input.area,
            location: input.location,
            timestamp: at,
            previous_owner_id: String::new(),
            transfer_history: Vec::new(),
            status: LandStatus::Active,
            created_by: caller_id.to_string(),
            last_modified_by: caller_id.to_string(),
        }
    }

    /// Apply an ownership transfer. Status is left untouched.
    pub fn apply_transfer(&mut self, transfer: &TransferRecord, transfer_key: String) {
        self.previous_owner_id = std::mem::replace(&mut self.owner_id, transfer.to_owner_id.clone());
        self.owner_name = transfer.to_owner_name.clone();
        self.timestamp = transfer.timestamp;
        self.last_modified_by = transfer.authorized_by.clone();
        self.transfer_history.push(transfer_key);
    }

    /// Apply a status change. Ownership fields are left untouched.
    pub fn apply_status(&mut self, status: LandStatus, caller_id: &str, at: DateTime<Utc>) {
        self.status = status;
        self.last_modified_by = caller_id.to_string();
        self.timestamp = at;
    }
}

/// Immutable provenance of one ownership transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub transfer_id: String,
    pub plot_id: String,
    pub from_owner_id: String,
    pub to_owner_id: String,
    pub to_owner_name: String,
    pub timestamp: DateTime<Utc>,
    /// Caller identifier of the authorizing party
    pub authorized_by: String,
    /// Commit that wrote this transfer
    pub transaction_id: String,
}

// ============================================================================
// Operation inputs
// ============================================================================

fn require(field: &'static str, value: &str) -> Result<(), RegistryError> {
    if value.is_empty() {
        return Err(RegistryError::EmptyField(field));
    }
    Ok(())
}

/// Arguments of CreateLandRecord
#[derive(Debug, Clone, PartialEq)]
pub struct NewLandRecord {
    pub plot_id: String,
    pub owner_id: String,
    pub owner_name: String,
    pub area: f64,
    pub location: String,
}

impl NewLandRecord {
    pub fn new(
        plot_id: impl Into<String>,
        owner_id: impl Into<String>,
        owner_name: impl Into<String>,
        area: f64,
        location: impl Into<String>,
    ) -> Self {
        Self {
            plot_id: plot_id.into(),
            owner_id: owner_id.into(),
            owner_name: owner_name.into(),
            area,
            location: location.into(),
        }
    }

    /// Field checks in declaration order; the first failure is reported
    pub fn validate(&self) -> Result<(), RegistryError> {
        require("plotId", &self.plot_id)?;
        if is_transfer_key(&self.plot_id) {
            return Err(RegistryError::ReservedPlotId(self.plot_id.clone()));
        }
        require("ownerId", &self.owner_id)?;
        require("ownerName", &self.owner_name)?;
        if !(self.area.is_finite() && self.area > 0.0) {
            return Err(RegistryError::InvalidArea(self.area));
        }
        require("location", &self.location)?;
        Ok(())
    }
}

/// Arguments of TransferLand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub plot_id: String,
    pub new_owner_id: String,
    pub new_owner_name: String,
}

impl TransferRequest {
    pub fn new(
        plot_id: impl Into<String>,
        new_owner_id: impl Into<String>,
        new_owner_name: impl Into<String>,
    ) -> Self {
        Self {
            plot_id: plot_id.into(),
            new_owner_id: new_owner_id.into(),
            new_owner_name: new_owner_name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        require("plotId", &self.plot_id)?;
        require("newOwnerId", &self.new_owner_id)?;
        require("newOwnerName", &self.new_owner_name)?;
        Ok(())
    }
}

/// Plot id check shared by the single-plot operations
pub fn validate_plot_id(plot_id: &str) -> Result<(), RegistryError> {
    require("plotId", plot_id)
}
