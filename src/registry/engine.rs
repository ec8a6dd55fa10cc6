//! Land Registry Engine
//!
//! Entry points for every registry operation. Each call runs inside exactly
//! one commit unit supplied by the caller as a [`WorldState`]: everything it
//! writes is derived from what it read in the same call, and the ordering
//! layer decides whether the buffered writes land together or not at all.
//! Nothing here retries.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::auth::{AuthorizationGuard, ClientIdentity};
use super::error::RegistryError;
use super::history::HistoryReconstructor;
use super::status::StatusPolicy;
use super::store::{RecordStore, decode};
use super::types::{
    LandRecord, NewLandRecord, TransferRecord, TransferRequest, format_timestamp, is_transfer_key,
    transfer_id, transfer_key, truncate_to_seconds, validate_plot_id,
};
use crate::config::{RegistryConfig, TimestampSource};
use crate::ledger::WorldState;

/// Land registry - orchestrates record creation, transfer and status changes
#[derive(Debug, Clone)]
pub struct LandRegistry {
    guard: AuthorizationGuard,
    statuses: StatusPolicy,
    timestamps: TimestampSource,
}

impl LandRegistry {
    /// Registry with explicit policy parts
    pub fn new(
        guard: AuthorizationGuard,
        statuses: StatusPolicy,
        timestamps: TimestampSource,
    ) -> Self {
        Self {
            guard,
            statuses,
            timestamps,
        }
    }

    /// Registry built from the `registry` section of the app config
    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(
            AuthorizationGuard::new(config.authorized_orgs.iter().cloned()),
            StatusPolicy::new(config.settable_statuses.iter().copied()),
            config.timestamp_source,
        )
    }

    /// Org allow-list applied to privileged operations
    pub fn guard(&self) -> &AuthorizationGuard {
        &self.guard
    }

    /// Settable statuses and the transfer gate
    pub fn status_policy(&self) -> &StatusPolicy {
        &self.statuses
    }

    /// Mutation timestamp for the current unit
    fn now<W: WorldState + ?Sized>(&self, state: &W) -> DateTime<Utc> {
        let at = match self.timestamps {
            TimestampSource::WallClock => Utc::now(),
            TimestampSource::Commit => state.commit_timestamp(),
        };
        truncate_to_seconds(at)
    }

    /// Load a record that must exist
    fn load<W: WorldState + ?Sized>(
        &self,
        state: &W,
        plot_id: &str,
    ) -> Result<LandRecord, RegistryError> {
        state
            .get_land(plot_id)?
            .ok_or_else(|| RegistryError::RecordNotFound(plot_id.to_string()))
    }

    /// Create a new land record (authorized callers only)
    pub fn create_land_record<W: WorldState + ?Sized>(
        &self,
        state: &mut W,
        identity: &dyn ClientIdentity,
        input: NewLandRecord,
    ) -> Result<LandRecord, RegistryError> {
        self.guard.verify_authorized_caller(identity)?;
        input.validate()?;

        if state.get(&input.plot_id)?.is_some() {
            return Err(RegistryError::AlreadyExists(input.plot_id));
        }

        let caller_id = self.guard.caller_id(identity)?;
        let record = LandRecord::new(input, &caller_id, self.now(&*state));
        state.put_land(&record)?;

        info!(
            plot_id = %record.plot_id,
            owner_id = %record.owner_id,
            caller = %caller_id,
            commit_id = %state.commit_id(),
            "Land record created"
        );
        Ok(record)
    }

    /// Transfer ownership of an active plot (authorized callers only)
    ///
    /// Writes the transfer record and the updated land record into the same
    /// commit unit. Returns the transfer record.
    pub fn transfer_land<W: WorldState + ?Sized>(
        &self,
        state: &mut W,
        identity: &dyn ClientIdentity,
        req: TransferRequest,
    ) -> Result<TransferRecord, RegistryError> {
        self.guard.verify_authorized_caller(identity)?;
        req.validate()?;

        let mut record = self.load(&*state, &req.plot_id)?;

        self.statuses.check_transferable(&record.plot_id, record.status)?;
        if record.owner_id == req.new_owner_id {
            return Err(RegistryError::SameOwner(req.plot_id));
        }

        let caller_id = self.guard.caller_id(identity)?;
        let commit_id = state.commit_id().to_string();
        let now = self.now(&*state);

        let transfer = TransferRecord {
            transfer_id: transfer_id(&req.plot_id, now, &commit_id),
            plot_id: req.plot_id.clone(),
            from_owner_id: record.owner_id.clone(),
            to_owner_id: req.new_owner_id,
            to_owner_name: req.new_owner_name,
            timestamp: now,
            authorized_by: caller_id,
            transaction_id: commit_id.clone(),
        };
        let key = transfer_key(&req.plot_id, &commit_id);
        state.put_transfer(&key, &transfer)?;

        record.apply_transfer(&transfer, key);
        state.put_land(&record)?;

        info!(
            plot_id = %transfer.plot_id,
            from = %transfer.from_owner_id,
            to = %transfer.to_owner_id,
            transfer_id = %transfer.transfer_id,
            commit_id = %commit_id,
            at = %format_timestamp(now),
            "Land transferred"
        );
        Ok(transfer)
    }

    /// Set the status of an existing record (authorized callers only)
    pub fn update_land_status<W: WorldState + ?Sized>(
        &self,
        state: &mut W,
        identity: &dyn ClientIdentity,
        plot_id: &str,
        status: &str,
    ) -> Result<LandRecord, RegistryError> {
        self.guard.verify_authorized_caller(identity)?;
        validate_plot_id(plot_id)?;
        let status = self.statuses.validate(status)?;

        let mut record = self.load(&*state, plot_id)?;
        let caller_id = self.guard.caller_id(identity)?;
        let previous = record.status;
        record.apply_status(status, &caller_id, self.now(&*state));
        state.put_land(&record)?;

        info!(
            plot_id = %plot_id,
            from = %previous,
            to = %status,
            caller = %caller_id,
            "Land status updated"
        );
        Ok(record)
    }

    /// Current snapshot of a record (public)
    pub fn query_land_record<W: WorldState + ?Sized>(
        &self,
        state: &W,
        plot_id: &str,
    ) -> Result<LandRecord, RegistryError> {
        validate_plot_id(plot_id)?;
        self.load(state, plot_id)
    }

    /// Ownership-transfer timeline of a plot (public)
    pub fn query_land_history<W: WorldState + ?Sized>(
        &self,
        state: &W,
        plot_id: &str,
    ) -> Result<Vec<TransferRecord>, RegistryError> {
        HistoryReconstructor::new(state).reconstruct(plot_id)
    }

    /// Every land record in the world state (authorized callers only)
    ///
    /// Transfer keys are excluded; undecodable entries are skipped.
    pub fn get_all_land_records<W: WorldState + ?Sized>(
        &self,
        state: &W,
        identity: &dyn ClientIdentity,
    ) -> Result<Vec<LandRecord>, RegistryError> {
        self.guard.verify_authorized_caller(identity)?;

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for entry in state.range_scan("", "")? {
            let entry = entry?;
            if is_transfer_key(&entry.key) {
                continue;
            }
            match decode::<LandRecord>(&entry.key, &entry.value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    skipped += 1;
                    debug!(key = %entry.key, error = %e, "Skipping undecodable land record");
                }
            }
        }

        debug!(returned = records.len(), skipped, "Listed land records");
        Ok(records)
    }
}

impl Default for LandRegistry {
    fn default() -> Self {
        Self::from_config(&RegistryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::StoreError;
    use crate::ledger::mock::FaultyState;
    use crate::registry::auth::StaticIdentity;
    use crate::registry::error::ErrorKind;
    use crate::registry::status::LandStatus;

    fn registrar() -> StaticIdentity {
        StaticIdentity::new("LandRegMSP", "admin@landreg.example.com")
    }

    fn public() -> StaticIdentity {
        StaticIdentity::new("PublicMSP", "public@example.com")
    }

    fn commit_clock() -> LandRegistry {
        LandRegistry::new(
            AuthorizationGuard::new(["LandRegMSP", "CourtMSP"]),
            StatusPolicy::default(),
            TimestampSource::Commit,
        )
    }

    fn plot001() -> NewLandRecord {
        NewLandRecord::new("PLOT001", "OWNER001", "John Doe", 100.5, "City Center")
    }

    fn seeded(status: LandStatus) -> FaultyState {
        let mut state = FaultyState::new();
        let mut record = LandRecord::new(plot001(), "admin", DateTime::<Utc>::UNIX_EPOCH);
        record.status = status;
        state.seed("PLOT001", &serde_json::to_vec(&record).unwrap());
        state
    }

    #[test]
    fn test_create_writes_one_active_record() {
        let registry = commit_clock();
        let mut state = FaultyState::new();
        let record = registry
            .create_land_record(&mut state, &registrar(), plot001())
            .unwrap();

        assert_eq!(record.status, LandStatus::Active);
        assert_eq!(record.created_by, "admin@landreg.example.com");
        assert_eq!(record.last_modified_by, "admin@landreg.example.com");
        assert_eq!(record.timestamp, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(state.writes.len(), 1);
        assert_eq!(state.writes[0].0, "PLOT001");
    }

    #[test]
    fn test_create_existing_is_conflict() {
        let registry = commit_clock();
        let mut state = seeded(LandStatus::Active);
        let err = registry
            .create_land_record(&mut state, &registrar(), plot001())
            .unwrap_err();
        assert_eq!(err, RegistryError::AlreadyExists("PLOT001".into()));
        assert!(state.writes.is_empty());
    }

    #[test]
    fn test_unauthorized_rejected_before_any_read() {
        let registry = commit_clock();
        let mut state = FaultyState::new();
        // a read would fail with a storage error; authorization must come first
        state.fail_get = true;
        state.fail_range = true;
        let caller = public();

        let errors = [
            registry
                .create_land_record(&mut state, &caller, plot001())
                .unwrap_err(),
            registry
                .transfer_land(&mut state, &caller, TransferRequest::new("PLOT001", "O2", "N"))
                .unwrap_err(),
            registry
                .update_land_status(&mut state, &caller, "PLOT001", "pending")
                .unwrap_err(),
            registry.get_all_land_records(&state, &caller).unwrap_err(),
        ];
        for err in errors {
            assert_eq!(err.kind(), ErrorKind::Authorization);
        }
        assert!(state.writes.is_empty());
    }

    #[test]
    fn test_transfer_writes_transfer_then_record() {
        let registry = commit_clock();
        let mut state = seeded(LandStatus::Active);
        let transfer = registry
            .transfer_land(
                &mut state,
                &registrar(),
                TransferRequest::new("PLOT001", "OWNER002", "Jane Smith"),
            )
            .unwrap();

        assert_eq!(transfer.from_owner_id, "OWNER001");
        assert_eq!(transfer.to_owner_id, "OWNER002");
        assert_eq!(transfer.transaction_id, "mock-commit");
        assert_eq!(transfer.transfer_id, "TRANSFER-PLOT001-0-mock-commit");
        assert_eq!(transfer.authorized_by, "admin@landreg.example.com");

        let keys: Vec<&str> = state.writes.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["TRANSFER-PLOT001-mock-commit", "PLOT001"]);

        let updated: LandRecord = serde_json::from_slice(&state.writes[1].1).unwrap();
        assert_eq!(updated.owner_id, "OWNER002");
        assert_eq!(updated.previous_owner_id, "OWNER001");
        assert_eq!(updated.transfer_history, vec!["TRANSFER-PLOT001-mock-commit"]);
        assert_eq!(updated.status, LandStatus::Active);
    }

    #[test]
    fn test_transfer_blocked_by_status() {
        let registry = commit_clock();
        for status in [LandStatus::Pending, LandStatus::Disputed] {
            let mut state = seeded(status);
            let err = registry
                .transfer_land(
                    &mut state,
                    &registrar(),
                    TransferRequest::new("PLOT001", "OWNER002", "Jane Smith"),
                )
                .unwrap_err();
            assert!(matches!(err, RegistryError::NotTransferable { status: s, .. } if s == status));
            assert_eq!(err.kind(), ErrorKind::Conflict);
            assert!(state.writes.is_empty());
        }
    }

    #[test]
    fn test_transfer_to_same_owner_is_conflict() {
        let registry = commit_clock();
        let mut state = seeded(LandStatus::Active);
        let err = registry
            .transfer_land(
                &mut state,
                &registrar(),
                TransferRequest::new("PLOT001", "OWNER001", "John Doe"),
            )
            .unwrap_err();
        assert_eq!(err, RegistryError::SameOwner("PLOT001".into()));
        assert!(state.writes.is_empty());
    }

    #[test]
    fn test_transfer_missing_record() {
        let registry = commit_clock();
        let mut state = FaultyState::new();
        let err = registry
            .transfer_land(
                &mut state,
                &registrar(),
                TransferRequest::new("NOPE", "OWNER002", "Jane Smith"),
            )
            .unwrap_err();
        assert_eq!(err, RegistryError::RecordNotFound("NOPE".into()));
    }

    #[test]
    fn test_transfer_storage_fault_surfaces() {
        let registry = commit_clock();
        let mut state = seeded(LandStatus::Active);
        state.fail_put = true;
        let err = registry
            .transfer_land(
                &mut state,
                &registrar(),
                TransferRequest::new("PLOT001", "OWNER002", "Jane Smith"),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::Storage(StoreError::Io(_))));
    }

    #[test]
    fn test_update_status_validates_before_reading() {
        let registry = commit_clock();
        let mut state = FaultyState::new();
        state.fail_get = true;
        let err = registry
            .update_land_status(&mut state, &registrar(), "PLOT001", "archived")
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidStatus { .. }));
    }

    #[test]
    fn test_update_status_keeps_ownership() {
        let registry = commit_clock();
        let court = StaticIdentity::new("CourtMSP", "judge@court.example.com");
        let mut state = seeded(LandStatus::Active);
        let record = registry
            .update_land_status(&mut state, &court, "PLOT001", "disputed")
            .unwrap();
        assert_eq!(record.status, LandStatus::Disputed);
        assert_eq!(record.owner_id, "OWNER001");
        assert_eq!(record.last_modified_by, "judge@court.example.com");
        assert_eq!(record.created_by, "admin");
        assert_eq!(state.writes.len(), 1);
    }

    #[test]
    fn test_query_record() {
        let registry = commit_clock();
        let state = seeded(LandStatus::Active);
        let record = registry.query_land_record(&state, "PLOT001").unwrap();
        assert_eq!(record.area, 100.5);

        assert_eq!(
            registry.query_land_record(&state, "").unwrap_err(),
            RegistryError::EmptyField("plotId")
        );
        assert_eq!(
            registry.query_land_record(&state, "PLOT404").unwrap_err(),
            RegistryError::RecordNotFound("PLOT404".into())
        );
    }

    #[test]
    fn test_query_record_fails_hard_on_malformed_value() {
        let registry = commit_clock();
        let mut state = FaultyState::new();
        state.seed("PLOT001", b"garbage");
        let err = registry.query_land_record(&state, "PLOT001").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_get_all_skips_transfers_and_garbage() {
        let registry = commit_clock();
        let mut state = seeded(LandStatus::Active);
        state.seed("PLOT002", b"garbage");
        state.seed("TRANSFER-PLOT001-tx1", b"{}");

        let records = registry.get_all_land_records(&state, &registrar()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].plot_id, "PLOT001");
    }

    #[test]
    fn test_get_all_iterator_fault_is_storage_error() {
        let registry = commit_clock();
        let mut state = seeded(LandStatus::Active);
        state.poison_range_item = true;
        let err = registry.get_all_land_records(&state, &registrar()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_from_config() {
        let registry = LandRegistry::default();
        assert!(registry.guard().is_authorized_org("SubRegistrarMSP"));
        assert_eq!(registry.status_policy().settable().len(), 3);
    }
}
