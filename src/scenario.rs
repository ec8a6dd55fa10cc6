//! Scenario replay
//!
//! Replays a scripted list of registry invocations against a [`MemoryLedger`],
//! one commit unit per step. Mutating steps commit on success and are
//! discarded on failure; read steps never commit.
//!
//! ```yaml
//! steps:
//!   - op: create
//!     caller: { org: LandRegMSP, id: admin@landreg.example.com }
//!     plot_id: PLOT001
//!     owner_id: OWNER001
//!     owner_name: John Doe
//!     area: 100.5
//!     location: City Center
//!   - op: history
//!     plot_id: PLOT001
//! ```

use std::cell::RefCell;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use ulid::Generator;

use crate::ledger::MemoryLedger;
use crate::registry::{
    LandRecord, LandRegistry, NewLandRecord, RegistryError, StaticIdentity, TransferRecord,
    TransferRequest,
};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse scenario {path}: {reason}")]
    Parse { path: String, reason: String },
}

/// Caller credential for one step
#[derive(Debug, Clone, Deserialize)]
pub struct Caller {
    pub org: String,
    pub id: String,
}

impl From<&Caller> for StaticIdentity {
    fn from(caller: &Caller) -> Self {
        StaticIdentity::new(caller.org.clone(), caller.id.clone())
    }
}

/// One scripted invocation
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Invocation {
    Create {
        caller: Caller,
        plot_id: String,
        owner_id: String,
        owner_name: String,
        area: f64,
        location: String,
    },
    Transfer {
        caller: Caller,
        plot_id: String,
        new_owner_id: String,
        new_owner_name: String,
    },
    UpdateStatus {
        caller: Caller,
        plot_id: String,
        status: String,
    },
    Query {
        plot_id: String,
    },
    History {
        plot_id: String,
    },
    List {
        caller: Caller,
    },
}

impl Invocation {
    pub fn name(&self) -> &'static str {
        match self {
            Invocation::Create { .. } => "create",
            Invocation::Transfer { .. } => "transfer",
            Invocation::UpdateStatus { .. } => "update_status",
            Invocation::Query { .. } => "query",
            Invocation::History { .. } => "history",
            Invocation::List { .. } => "list",
        }
    }

    /// Whether a successful run must be committed
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Invocation::Create { .. } | Invocation::Transfer { .. } | Invocation::UpdateStatus { .. }
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub steps: Vec<Invocation>,
}

impl Scenario {
    pub fn from_file(path: &str) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(path, &content)
    }

    pub fn from_yaml(path: &str, content: &str) -> Result<Self, ScenarioError> {
        serde_yaml::from_str(content).map_err(|e| ScenarioError::Parse {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Result payload of one step
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Record { record: LandRecord },
    Records { records: Vec<LandRecord> },
    Transfer { transfer: TransferRecord },
    History { transfers: Vec<TransferRecord> },
    Error {
        kind: &'static str,
        code: &'static str,
        message: String,
    },
}

impl From<RegistryError> for Outcome {
    fn from(e: RegistryError) -> Self {
        Outcome::Error {
            kind: e.kind().as_str(),
            code: e.code(),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub op: &'static str,
    pub commit_id: String,
    pub committed: bool,
    #[serde(flatten)]
    pub outcome: Outcome,
}

pub struct ScenarioRunner<'a> {
    registry: &'a LandRegistry,
    ledger: &'a MemoryLedger,
    /// Monotonic within a millisecond, so commit ids sort in step order
    ids: RefCell<Generator>,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(registry: &'a LandRegistry, ledger: &'a MemoryLedger) -> Self {
        Self {
            registry,
            ledger,
            ids: RefCell::new(Generator::new()),
        }
    }

    /// Next commit id, strictly greater than every id handed out before
    fn next_commit_id(&self) -> String {
        let id = self.ids.borrow_mut().generate().unwrap_or_else(|e| {
            // random bits exhausted within one millisecond
            warn!(error = %e, "Monotonic commit id overflow, falling back to a fresh ulid");
            ulid::Ulid::new()
        });
        id.to_string().to_lowercase()
    }

    /// Replay every step in order; a failed step does not stop the run
    pub fn run(&self, scenario: &Scenario) -> Vec<StepReport> {
        scenario
            .steps
            .iter()
            .enumerate()
            .map(|(i, invocation)| self.run_step(i + 1, invocation))
            .collect()
    }

    /// Execute one invocation in its own commit unit
    pub fn run_step(&self, step: usize, invocation: &Invocation) -> StepReport {
        let commit_id = self.next_commit_id();
        let mut tx = self.ledger.begin(commit_id.clone(), Utc::now());
        let registry = self.registry;

        let result: Result<Outcome, RegistryError> = match invocation {
            Invocation::Create {
                caller,
                plot_id,
                owner_id,
                owner_name,
                area,
                location,
            } => registry
                .create_land_record(
                    &mut tx,
                    &StaticIdentity::from(caller),
                    NewLandRecord::new(
                        plot_id.as_str(),
                        owner_id.as_str(),
                        owner_name.as_str(),
                        *area,
                        location.as_str(),
                    ),
                )
                .map(|record| Outcome::Record { record }),
            Invocation::Transfer {
                caller,
                plot_id,
                new_owner_id,
                new_owner_name,
            } => registry
                .transfer_land(
                    &mut tx,
                    &StaticIdentity::from(caller),
                    TransferRequest::new(
                        plot_id.as_str(),
                        new_owner_id.as_str(),
                        new_owner_name.as_str(),
                    ),
                )
                .map(|transfer| Outcome::Transfer { transfer }),
            Invocation::UpdateStatus {
                caller,
                plot_id,
                status,
            } => registry
                .update_land_status(&mut tx, &StaticIdentity::from(caller), plot_id, status)
                .map(|record| Outcome::Record { record }),
            Invocation::Query { plot_id } => registry
                .query_land_record(&tx, plot_id)
                .map(|record| Outcome::Record { record }),
            Invocation::History { plot_id } => registry
                .query_land_history(&tx, plot_id)
                .map(|transfers| Outcome::History { transfers }),
            Invocation::List { caller } => registry
                .get_all_land_records(&tx, &StaticIdentity::from(caller))
                .map(|records| Outcome::Records { records }),
        };

        let (outcome, committed) = match result {
            Ok(outcome) if invocation.is_mutation() => match self.ledger.commit(tx) {
                Ok(receipt) => {
                    info!(step, op = invocation.name(), height = receipt.height, "Step committed");
                    (outcome, true)
                }
                Err(e) => {
                    warn!(step, op = invocation.name(), error = %e, "Step aborted at commit");
                    (Outcome::from(RegistryError::from(e)), false)
                }
            },
            Ok(outcome) => (outcome, false),
            Err(e) => {
                warn!(step, op = invocation.name(), code = e.code(), error = %e, "Step rejected");
                (Outcome::from(e), false)
            }
        };

        StepReport {
            step,
            op: invocation.name(),
            commit_id,
            committed,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
steps:
  - op: create
    caller: { org: LandRegMSP, id: admin@landreg.example.com }
    plot_id: PLOT001
    owner_id: OWNER001
    owner_name: John Doe
    area: 100.5
    location: City Center
  - op: transfer
    caller: { org: SubRegistrarMSP, id: clerk@subreg.example.com }
    plot_id: PLOT001
    new_owner_id: OWNER002
    new_owner_name: Jane Smith
  - op: transfer
    caller: { org: SubRegistrarMSP, id: clerk@subreg.example.com }
    plot_id: PLOT001
    new_owner_id: OWNER002
    new_owner_name: Jane Smith
  - op: update_status
    caller: { org: PublicMSP, id: someone@example.com }
    plot_id: PLOT001
    status: disputed
  - op: query
    plot_id: PLOT001
  - op: history
    plot_id: PLOT001
  - op: list
    caller: { org: CourtMSP, id: judge@court.example.com }
"#;

    #[test]
    fn test_replay() {
        let scenario = Scenario::from_yaml("inline", SCRIPT).unwrap();
        assert_eq!(scenario.steps.len(), 7);

        let ledger = MemoryLedger::new();
        let registry = LandRegistry::default();
        let reports = ScenarioRunner::new(&registry, &ledger).run(&scenario);

        let committed: Vec<bool> = reports.iter().map(|r| r.committed).collect();
        assert_eq!(committed, vec![true, true, false, false, false, false, false]);
        assert_eq!(ledger.height(), 2);

        assert!(matches!(
            &reports[2].outcome,
            Outcome::Error { code: "SAME_OWNER", kind: "CONFLICT", .. }
        ));
        assert!(matches!(
            &reports[3].outcome,
            Outcome::Error { kind: "AUTHORIZATION", .. }
        ));
        match &reports[4].outcome {
            Outcome::Record { record } => {
                assert_eq!(record.owner_id, "OWNER002");
                assert_eq!(record.previous_owner_id, "OWNER001");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        match &reports[5].outcome {
            Outcome::History { transfers } => assert_eq!(transfers.len(), 1),
            other => panic!("unexpected outcome {other:?}"),
        }
        match &reports[6].outcome {
            Outcome::Records { records } => assert_eq!(records.len(), 1),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_report_json_shape() {
        let report = StepReport {
            step: 1,
            op: "query",
            commit_id: "c1".into(),
            committed: false,
            outcome: Outcome::from(RegistryError::RecordNotFound("P9".into())),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "error");
        assert_eq!(json["code"], "RECORD_NOT_FOUND");
        assert_eq!(json["kind"], "NOT_FOUND");
        assert_eq!(json["step"], 1);
    }

    #[test]
    fn test_unknown_op_rejected() {
        let err = Scenario::from_yaml("inline", "steps:\n  - op: delete\n    plot_id: P1\n")
            .unwrap_err();
        assert!(matches!(err, ScenarioError::Parse { .. }));
    }

    #[test]
    fn test_back_to_back_transfers_keep_chain_order() {
        let mut yaml = String::from(
            "steps:\n  - op: create\n    caller: { org: LandRegMSP, id: admin }\n    \
             plot_id: PLOT001\n    owner_id: O0\n    owner_name: Zero\n    area: 1.0\n    \
             location: Here\n",
        );
        for i in 1..=8 {
            yaml.push_str(&format!(
                "  - op: transfer\n    caller: {{ org: LandRegMSP, id: admin }}\n    \
                 plot_id: PLOT001\n    new_owner_id: O{i}\n    new_owner_name: Owner {i}\n"
            ));
        }
        yaml.push_str("  - op: history\n    plot_id: PLOT001\n");
        let scenario = Scenario::from_yaml("inline", &yaml).unwrap();

        let ledger = MemoryLedger::new();
        let registry = LandRegistry::default();
        let reports = ScenarioRunner::new(&registry, &ledger).run(&scenario);

        let ids: Vec<&str> = reports.iter().map(|r| r.commit_id.as_str()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids not increasing: {ids:?}");

        let expected: Vec<String> = (1..=8).map(|i| format!("O{i}")).collect();
        match &reports[9].outcome {
            Outcome::History { transfers } => {
                let owners: Vec<String> =
                    transfers.iter().map(|t| t.to_owner_id.clone()).collect();
                assert_eq!(owners, expected);
                for pair in transfers.windows(2) {
                    assert_eq!(pair[1].from_owner_id, pair[0].to_owner_id);
                }
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
