//! Land Status Definitions
//!
//! ```text
//!        ┌──────────┐
//!   ┌───▶│  active  │◀───┐        any → any (authorized caller)
//!   │    └──────────┘    │
//!   ▼                    ▼        only `active` is transferable;
//! ┌─────────┐      ┌──────────┐   pending / disputed block TransferLand
//! │ pending │◀────▶│ disputed │
//! └─────────┘      └──────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::RegistryError;

/// Status of a land record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LandStatus {
    /// Normal state; ownership may be transferred
    Active,
    /// Administrative action in progress; transfers blocked
    Pending,
    /// Ownership contested; transfers blocked
    Disputed,
}

impl LandStatus {
    pub const ALL: [LandStatus; 3] = [LandStatus::Active, LandStatus::Pending, LandStatus::Disputed];

    /// Whether TransferLand may proceed from this status
    #[inline]
    pub fn is_transferable(&self) -> bool {
        matches!(self, LandStatus::Active)
    }

    /// Persisted literal
    pub fn as_str(&self) -> &'static str {
        match self {
            LandStatus::Active => "active",
            LandStatus::Pending => "pending",
            LandStatus::Disputed => "disputed",
        }
    }
}

impl fmt::Display for LandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Exact, case-sensitive match on the persisted literal
impl FromStr for LandStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(LandStatus::Active),
            "pending" => Ok(LandStatus::Pending),
            "disputed" => Ok(LandStatus::Disputed),
            _ => Err(()),
        }
    }
}

/// Which statuses UpdateLandStatus may set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPolicy {
    settable: Vec<LandStatus>,
}

impl StatusPolicy {
    pub fn new(settable: impl IntoIterator<Item = LandStatus>) -> Self {
        let mut unique = Vec::with_capacity(LandStatus::ALL.len());
        for status in settable {
            if !unique.contains(&status) {
                unique.push(status);
            }
        }
        Self { settable: unique }
    }

    /// Statuses UpdateLandStatus accepts, in configured order
    pub fn settable(&self) -> &[LandStatus] {
        &self.settable
    }

    /// Parse and admit a requested status
    pub fn validate(&self, status: &str) -> Result<LandStatus, RegistryError> {
        if status.is_empty() {
            return Err(RegistryError::EmptyField("status"));
        }
        match status.parse::<LandStatus>() {
            Ok(parsed) if self.settable.contains(&parsed) => Ok(parsed),
            _ => Err(RegistryError::InvalidStatus {
                status: status.to_string(),
                allowed: self
                    .settable
                    .iter()
                    .map(LandStatus::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Gate for TransferLand
    pub fn check_transferable(&self, plot_id: &str, status: LandStatus) -> Result<(), RegistryError> {
        if status.is_transferable() {
            Ok(())
        } else {
            Err(RegistryError::NotTransferable {
                plot_id: plot_id.to_string(),
                status,
            })
        }
    }
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self::new(LandStatus::ALL)
    }
}
