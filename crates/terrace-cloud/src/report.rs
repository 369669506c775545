//! Execution report returned by an apply

use crate::plan::Action;
use serde::{Deserialize, Serialize};

/// How a single operation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Provider call completed
    Succeeded,
    /// No-op; nothing was sent to the provider
    Unchanged,
    Failed,
    /// A dependency failed or was skipped, so this was never attempted
    Skipped,
    /// Never dispatched because the run was cancelled
    Cancelled,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Succeeded => write!(f, "succeeded"),
            Outcome::Unchanged => write!(f, "unchanged"),
            Outcome::Failed => write!(f, "failed"),
            Outcome::Skipped => write!(f, "skipped"),
            Outcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Overall result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    /// Some operations were skipped because of failed dependencies
    Partial,
    Failed,
    Cancelled,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Success => write!(f, "success"),
            RunStatus::Partial => write!(f, "partial"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of a single operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceOutcome {
    pub target: String,

    pub kind: String,

    pub action: Action,

    pub outcome: Outcome,

    /// Provider calls made, retries included
    pub attempts: u32,

    /// External identifier after the operation, if any
    pub external_id: Option<String>,

    /// Failure diagnostic or skip reason
    pub message: Option<String>,
}

/// Per-operation outcomes plus the overall status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Outcomes in plan order
    pub outcomes: Vec<ResourceOutcome>,

    pub status: RunStatus,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ExecutionReport {
    pub fn new(outcomes: Vec<ResourceOutcome>, duration_ms: u64) -> Self {
        let status = Self::derive_status(&outcomes);
        Self {
            outcomes,
            status,
            duration_ms,
        }
    }

    fn derive_status(outcomes: &[ResourceOutcome]) -> RunStatus {
        let any = |o: Outcome| outcomes.iter().any(|r| r.outcome == o);
        if any(Outcome::Cancelled) {
            RunStatus::Cancelled
        } else if any(Outcome::Failed) {
            RunStatus::Failed
        } else if any(Outcome::Skipped) {
            RunStatus::Partial
        } else {
            RunStatus::Success
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn get(&self, target: &str) -> Option<&ResourceOutcome> {
        self.outcomes.iter().find(|o| o.target == target)
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.iter().filter(|o| o.outcome == outcome).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} succeeded, {} unchanged, {} failed, {} skipped, {} cancelled",
            self.status,
            self.count(Outcome::Succeeded),
            self.count(Outcome::Unchanged),
            self.count(Outcome::Failed),
            self.count(Outcome::Skipped),
            self.count(Outcome::Cancelled)
        )
    }
}
