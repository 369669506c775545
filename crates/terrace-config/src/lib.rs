pub mod document;
pub mod error;

pub use document::{Document, ResourceSpec, RetrySettings, Settings, load_document, parse_document};
pub use error::*;

use std::path::PathBuf;

/// Environment variable naming a declaration file directly
pub const CONFIG_ENV: &str = "TERRACE_CONFIG";

const CANDIDATES: [&str; 2] = ["terrace.local.yaml", "terrace.yaml"];

/// Global declaration path (`<config dir>/terrace/terrace.yaml`)
pub fn global_declaration_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("terrace").join("terrace.yaml"))
}

/// Locate the declaration file.
///
/// Search order:
/// 1. `TERRACE_CONFIG`
/// 2. current directory: terrace.local.yaml, terrace.yaml
/// 3. `./.terrace/`, same names
/// 4. `<config dir>/terrace/terrace.yaml`
pub fn find_declaration_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let project_dir = current_dir.join(".terrace");
    if project_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = project_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(global) = global_declaration_path() {
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::NotFound)
}
