use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Declaration file not found. Looked in:\n\
        - current directory: terrace.local.yaml, terrace.yaml\n\
        - ./.terrace/ directory\n\
        - ~/.config/terrace/terrace.yaml\n\
        Set TERRACE_CONFIG to point at a file directly"
    )]
    NotFound,

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid declaration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
