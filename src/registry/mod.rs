//! Land Registry
//!
//! Ownership records for land parcels on top of a versioned world state.
//!
//! # Architecture
//!
//! ```text
//! caller ──▶ AuthorizationGuard ──▶ LandRegistry ──┬──▶ RecordStore ──▶ WorldState
//!                                        │         │
//!                                        ▼         │
//!                                   StatusPolicy   │
//!                                                  │
//! caller ──▶ HistoryReconstructor ─────────────────┘
//! ```
//!
//! # Persisted layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `<plotId>` | [`LandRecord`] JSON |
//! | `TRANSFER-<plotId>-<commitId>` | [`TransferRecord`] JSON, never rewritten |
//!
//! # Invariants
//!
//! 1. **Single creation**: a plot id is written by CreateLandRecord at most once
//! 2. **Owner follows transfers**: `ownerId` equals the `toOwnerId` of the last
//!    key in `transferHistory`, or the creation owner if it is empty
//! 3. **Append-only provenance**: `transferHistory` only grows; transfer records
//!    are never rewritten
//! 4. **Orthogonal fields**: status changes never touch ownership, transfers
//!    never touch status (a non-active status only blocks them)

pub mod auth;
pub mod engine;
pub mod error;
pub mod history;
pub mod status;
pub mod store;
pub mod types;


// Re-exports for convenience
pub use auth::{AuthorizationGuard, ClientIdentity, StaticIdentity};
pub use engine::LandRegistry;
pub use error::{ErrorKind, RegistryError};
pub use history::{HistoryReconstructor, MergeStats};
pub use status::{LandStatus, StatusPolicy};
pub use store::RecordStore;
pub use types::{
    LandRecord, NewLandRecord, TRANSFER_KEY_PREFIX, TransferRecord, TransferRequest, transfer_key,
};
