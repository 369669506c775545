//! Sandbox provider error types

use terrace_cloud::ProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Invalid resource kind: {0}")]
    InvalidKind(String),

    #[error("Invalid external id: {0}")]
    InvalidId(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Injected {} fault on {op}:{kind}", fault_label(.transient))]
    Injected {
        op: String,
        kind: String,
        transient: bool,
    },

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

fn fault_label(transient: &bool) -> &'static str {
    if *transient { "transient" } else { "permanent" }
}

impl SandboxError {
    /// Whether retrying the same call could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SandboxError::Injected { transient, .. } => *transient,
            SandboxError::IoError(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }
}

impl From<SandboxError> for ProviderError {
    fn from(e: SandboxError) -> Self {
        if e.is_transient() {
            ProviderError::transient(e.to_string())
        } else {
            ProviderError::permanent(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, SandboxError>;
