//! Drift detection
//!
//! Reads every active resource back through its adapter and compares what
//! the provider reports with what was last applied.

use crate::graph::ResourceGraph;
use crate::planner::checksum_of;
use crate::provider::ProviderRegistry;
use crate::state::{ResourceStatus, StateSnapshot};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DriftStatus {
    InSync,
    /// Observed properties differ from the last-applied ones
    Drifted { expected: String, actual: String },
    /// The provider no longer knows the resource
    Missing,
    /// The read failed; nothing is concluded
    Unreadable { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftFinding {
    pub name: String,
    pub kind: String,
    pub external_id: String,
    #[serde(flatten)]
    pub status: DriftStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriftReport {
    pub findings: Vec<DriftFinding>,
}

impl DriftReport {
    pub fn get(&self, name: &str) -> Option<&DriftFinding> {
        self.findings.iter().find(|f| f.name == name)
    }

    /// Whether any resource is drifted or missing
    pub fn has_drift(&self) -> bool {
        self.findings
            .iter()
            .any(|f| matches!(f.status, DriftStatus::Drifted { .. } | DriftStatus::Missing))
    }

    /// Rewrite `prior` so the planner converges drifted resources.
    ///
    /// Missing resources become absent with no id (planned as create);
    /// drifted ones lose their checksum (planned as update).
    pub fn fold_into(&self, prior: &mut StateSnapshot) {
        for finding in &self.findings {
            let Some(record) = prior.get_mut(&finding.name) else {
                continue;
            };
            match finding.status {
                DriftStatus::Missing => {
                    *record = record.transition(ResourceStatus::Absent);
                    record.external_id = None;
                    record.checksum = None;
                }
                DriftStatus::Drifted { .. } => record.checksum = None,
                DriftStatus::InSync | DriftStatus::Unreadable { .. } => {}
            }
        }
    }
}

/// Read back every declared resource whose record is active with an id.
///
/// Adapter errors are reported as `Unreadable` and never abort detection.
pub async fn detect_drift(
    graph: &ResourceGraph,
    prior: &StateSnapshot,
    registry: &ProviderRegistry,
) -> DriftReport {
    let mut findings = Vec::new();

    for name in graph.topological_order() {
        let Some(record) = prior.get(&name) else {
            continue;
        };
        if record.status != ResourceStatus::Active {
            continue;
        }
        let Some(external_id) = record.external_id.clone() else {
            continue;
        };

        let status = match registry.resolve(&record.kind) {
            Err(e) => DriftStatus::Unreadable {
                message: e.message().to_string(),
            },
            Ok(adapter) => match adapter.read(&record.kind, &external_id).await {
                Ok(None) => DriftStatus::Missing,
                Ok(Some(observed)) => {
                    let expected = checksum_of(&record.kind, &record.properties);
                    let actual = checksum_of(&record.kind, &observed);
                    if expected == actual {
                        DriftStatus::InSync
                    } else {
                        DriftStatus::Drifted { expected, actual }
                    }
                }
                Err(e) => DriftStatus::Unreadable {
                    message: e.message().to_string(),
                },
            },
        };

        match &status {
            DriftStatus::InSync => tracing::debug!("{} is in sync", name),
            DriftStatus::Drifted { .. } => tracing::warn!("{} has drifted", name),
            DriftStatus::Missing => tracing::warn!("{} ({}) no longer exists", name, external_id),
            DriftStatus::Unreadable { message } => {
                tracing::warn!("Could not read {}: {}", name, message)
            }
        }

        findings.push(DriftFinding {
            name,
            kind: record.kind.clone(),
            external_id,
            status,
        });
    }

    DriftReport { findings }
}
