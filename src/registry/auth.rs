//! Caller authorization
//!
//! Privileged operations are open only to callers whose organization is on the
//! configured allow-list. The caller's unique id is what provenance fields
//! (`createdBy`, `lastModifiedBy`, `authorizedBy`) record.

use rustc_hash::FxHashSet;
use tracing::warn;

use super::error::RegistryError;

/// Identity service for the current invocation
pub trait ClientIdentity {
    /// Organization the caller's credential belongs to
    fn org_id(&self) -> Result<String, RegistryError>;

    /// Stable, globally unique identifier of the caller
    fn unique_id(&self) -> Result<String, RegistryError>;
}

/// Identity resolved ahead of time (tests, scenario replay)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentity {
    pub org_id: String,
    pub unique_id: String,
}

impl StaticIdentity {
    pub fn new(org_id: impl Into<String>, unique_id: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            unique_id: unique_id.into(),
        }
    }
}

impl ClientIdentity for StaticIdentity {
    fn org_id(&self) -> Result<String, RegistryError> {
        if self.org_id.is_empty() {
            return Err(RegistryError::Identity("credential has no organization".into()));
        }
        Ok(self.org_id.clone())
    }

    fn unique_id(&self) -> Result<String, RegistryError> {
        if self.unique_id.is_empty() {
            return Err(RegistryError::Identity("credential has no subject id".into()));
        }
        Ok(self.unique_id.clone())
    }
}

/// Organization allow-list check
#[derive(Debug, Clone)]
pub struct AuthorizationGuard {
    authorized_orgs: FxHashSet<String>,
}

impl AuthorizationGuard {
    pub fn new<I, S>(authorized_orgs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            authorized_orgs: authorized_orgs.into_iter().map(Into::into).collect(),
        }
    }

    /// Membership test against the allow-list
    pub fn is_authorized_org(&self, org_id: &str) -> bool {
        self.authorized_orgs.contains(org_id)
    }

    /// Fail unless the caller's organization is allow-listed
    pub fn verify_authorized_caller(
        &self,
        identity: &dyn ClientIdentity,
    ) -> Result<(), RegistryError> {
        let org_id = identity.org_id()?;
        if !self.is_authorized_org(&org_id) {
            warn!(org_id = %org_id, "Rejected caller from unauthorized organization");
            return Err(RegistryError::Unauthorized(org_id));
        }
        Ok(())
    }

    /// Provenance identifier of the caller
    pub fn caller_id(&self, identity: &dyn ClientIdentity) -> Result<String, RegistryError> {
        identity.unique_id()
    }
}
