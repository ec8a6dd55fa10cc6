//! Registry Error Types
//!
//! Every failure maps onto one of five kinds (validation, authorization,
//! not found, conflict, storage) and carries a stable code for API responses.

use thiserror::Error;

use super::status::LandStatus;
use crate::ledger::StoreError;

/// Coarse error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Conflict,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Authorization => "AUTHORIZATION",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Storage => "STORAGE",
        }
    }
}

/// Registry error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    // === Validation Errors ===
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    #[error("area must be greater than 0 (got {0})")]
    InvalidArea(f64),

    #[error("plotId {0} uses the reserved TRANSFER- prefix")]
    ReservedPlotId(String),

    #[error("invalid status: {status}. Valid statuses are: {allowed}")]
    InvalidStatus { status: String, allowed: String },

    // === Authorization Errors ===
    #[error("unauthorized: caller with org {0} is not authorized")]
    Unauthorized(String),

    #[error("failed to get caller identity: {0}")]
    Identity(String),

    // === Lookup Errors ===
    #[error("land record with plotId {0} does not exist")]
    RecordNotFound(String),

    // === Conflict Errors ===
    #[error("land record with plotId {0} already exists")]
    AlreadyExists(String),

    #[error("cannot transfer land with {status} status")]
    NotTransferable { plot_id: String, status: LandStatus },

    #[error("cannot transfer to the same owner")]
    SameOwner(String),

    // === Storage Errors ===
    #[error("world state error: {0}")]
    Storage(#[from] StoreError),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::EmptyField(_)
            | RegistryError::InvalidArea(_)
            | RegistryError::ReservedPlotId(_)
            | RegistryError::InvalidStatus { .. } => ErrorKind::Validation,
            RegistryError::Unauthorized(_) | RegistryError::Identity(_) => {
                ErrorKind::Authorization
            }
            RegistryError::RecordNotFound(_) => ErrorKind::NotFound,
            RegistryError::AlreadyExists(_)
            | RegistryError::NotTransferable { .. }
            | RegistryError::SameOwner(_) => ErrorKind::Conflict,
            RegistryError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::EmptyField(_) => "EMPTY_FIELD",
            RegistryError::InvalidArea(_) => "INVALID_AREA",
            RegistryError::ReservedPlotId(_) => "RESERVED_PLOT_ID",
            RegistryError::InvalidStatus { .. } => "INVALID_STATUS",
            RegistryError::Unauthorized(_) => "UNAUTHORIZED",
            RegistryError::Identity(_) => "IDENTITY_UNAVAILABLE",
            RegistryError::RecordNotFound(_) => "RECORD_NOT_FOUND",
            RegistryError::AlreadyExists(_) => "RECORD_EXISTS",
            RegistryError::NotTransferable { .. } => "NOT_TRANSFERABLE",
            RegistryError::SameOwner(_) => "SAME_OWNER",
            RegistryError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Authorization => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Storage => 500,
        }
    }
}
