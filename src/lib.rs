//! Land Registry - authoritative land-parcel ownership records
//!
//! Record and transfer state transitions plus ownership-history
//! reconstruction, executed as atomic read-validate-write units over an
//! external versioned key-value store.
//!
//! # Modules
//!
//! - [`registry`] - Records, transfers, authorization, status and history
//! - [`ledger`] - World-state collaborator interface and in-memory ledger
//! - [`config`] - YAML configuration (allow-list, statuses, logging)
//! - [`logging`] - tracing subscriber setup
//! - [`scenario`] - Replay of scripted invocations against a ledger

pub mod config;
pub mod ledger;
pub mod logging;
pub mod registry;
pub mod scenario;

// Convenient re-exports at crate root
pub use config::{AppConfig, RegistryConfig, TimestampSource};
pub use ledger::{MemoryLedger, StoreError, TxContext, WorldState};
pub use registry::{
    ClientIdentity, ErrorKind, LandRecord, LandRegistry, LandStatus, NewLandRecord,
    RegistryError, StaticIdentity, TransferRecord, TransferRequest,
};
