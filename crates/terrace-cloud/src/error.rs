//! Error types for the reconciliation core

use thiserror::Error;

/// Problems found while building a resource graph.
///
/// Any of these aborts a run before a provider is contacted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Resource name must not be empty")]
    EmptyName,

    #[error("Resource '{0}' has an empty kind")]
    EmptyKind(String),

    #[error("Duplicate resource name: {0}")]
    DuplicateName(String),

    #[error("Resource '{resource}' depends on unknown resource '{dependency}'")]
    UnknownDependency { resource: String, dependency: String },

    #[error("Resource '{0}' depends on itself")]
    SelfDependency(String),

    #[error("Dependency cycle detected: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },
}

/// Failure reported by a provider adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Worth retrying: timeouts, throttling, connection resets.
    #[error("Transient provider error: {0}")]
    Transient(String),

    #[error("Provider error: {0}")]
    Permanent(String),
}

impl ProviderError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// The message without the classification prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Transient(m) | Self::Permanent(m) => m,
        }
    }
}

/// Errors that are fatal to a reconciliation run
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Invalid declaration: {0}")]
    Validation(#[from] ValidationError),

    #[error("State store error: {0}")]
    StateStore(String),

    #[error("Lock acquisition failed: {0}")]
    Lock(String),

    #[error("Operation task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Whether the error concerns the state ledger rather than the declaration.
    pub fn is_state_error(&self) -> bool {
        matches!(self, Self::StateStore(_) | Self::Io(_) | Self::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
