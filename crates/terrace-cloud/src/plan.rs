//! Plan types

use crate::resource::Properties;
use crate::state::ActualStateRecord;
use serde::{Deserialize, Serialize};

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Create a new resource
    Create,
    /// Update an existing resource
    Update,
    /// Delete a resource
    Delete,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Create => write!(f, "create"),
            Action::Update => write!(f, "update"),
            Action::Delete => write!(f, "delete"),
            Action::NoOp => write!(f, "no-op"),
        }
    }
}

/// One planned step against one resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Logical name of the target resource
    pub target: String,

    /// Kind tag used to pick the provider adapter
    pub kind: String,

    pub action: Action,

    /// Declared properties to apply (last-applied ones for deletes)
    pub properties: Properties,

    /// Checksum of the declaration; `None` for deletes
    pub checksum: Option<String>,

    /// Dependencies per the graph, or as recorded for deletes
    pub depends_on: Vec<String>,

    /// Record this operation was planned against
    pub prior: Option<ActualStateRecord>,
}

impl Operation {
    /// Provider-assigned identifier known before the operation runs
    pub fn external_id(&self) -> Option<&str> {
        self.prior.as_ref().and_then(|r| r.external_id.as_deref())
    }

    pub fn description(&self) -> String {
        match self.action {
            Action::Create => format!("{}: create {}", self.target, self.kind),
            Action::Update => match self.prior.as_ref().map(|r| r.status) {
                Some(status) if status != crate::state::ResourceStatus::Active => {
                    format!("{}: update (resuming from {})", self.target, status)
                }
                _ => format!("{}: update (declaration changed)", self.target),
            },
            Action::Delete => format!("{}: delete {}", self.target, self.kind),
            Action::NoOp => format!("{}: no changes", self.target),
        }
    }
}

/// Ordered operations for one run
///
/// Creates, updates and no-ops come first in dependency order, followed by
/// deletes in reverse dependency order. Each resource appears at most once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub operations: Vec<Operation>,
}

impl Plan {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    /// Whether the plan has any changes
    pub fn has_changes(&self) -> bool {
        self.operations.iter().any(|o| o.action != Action::NoOp)
    }

    pub fn get(&self, target: &str) -> Option<&Operation> {
        self.operations.iter().find(|o| o.target == target)
    }

    /// Get operations by action
    pub fn operations_by_action(&self, action: Action) -> Vec<&Operation> {
        self.operations
            .iter()
            .filter(|o| o.action == action)
            .collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.operations_by_action(Action::Create).len(),
            update: self.operations_by_action(Action::Update).len(),
            delete: self.operations_by_action(Action::Delete).len(),
            no_change: self.operations_by_action(Action::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}
