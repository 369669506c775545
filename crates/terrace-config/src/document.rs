//! Declaration document

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use terrace_cloud::{ExecutorConfig, Properties, Resource, RetryConfig};

/// A parsed `terrace.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Document {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub settings: Settings,

    /// Logical name → declaration
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceSpec>,

    /// File the document was read from
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceSpec {
    pub kind: String,

    #[serde(default)]
    pub properties: Properties,

    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Where state.json lives; relative paths are taken from the document's directory
    pub state_dir: PathBuf,

    /// Maximum provider operations in flight
    pub concurrency: usize,

    pub retry: RetrySettings,

    /// Root of the sandbox provider's object store
    pub sandbox_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".terrace"),
            concurrency: 4,
            retry: RetrySettings::default(),
            sandbox_dir: PathBuf::from(".terrace/sandbox"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(s: &RetrySettings) -> Self {
        RetryConfig {
            max_attempts: s.max_attempts,
            initial_delay: Duration::from_millis(s.initial_delay_ms),
            max_delay: Duration::from_millis(s.max_delay_ms),
            backoff_multiplier: s.backoff_multiplier,
        }
    }
}

impl Settings {
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            concurrency: self.concurrency,
            retry: RetryConfig::from(&self.retry),
        }
    }
}

/// Read and validate the document at `path`.
pub fn load_document(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let mut document = parse_document(&content).map_err(|e| match e {
        ConfigError::Parse { source, .. } => ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })?;
    document.path = path.to_path_buf();
    Ok(document)
}

/// Parse and validate YAML text. The document path is left empty.
pub fn parse_document(content: &str) -> Result<Document> {
    let document: Document = if content.trim().is_empty() {
        Document::default()
    } else {
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?
    };
    document.validate()?;
    Ok(document)
}

impl Document {
    fn validate(&self) -> Result<()> {
        if self.settings.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "settings.concurrency must be at least 1".to_string(),
            ));
        }
        if self.settings.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "settings.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if !self.settings.retry.backoff_multiplier.is_finite()
            || self.settings.retry.backoff_multiplier < 1.0
        {
            return Err(ConfigError::Invalid(
                "settings.retry.backoff_multiplier must be a number >= 1.0".to_string(),
            ));
        }
        for (name, spec) in &self.resources {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("resource name must not be empty".to_string()));
            }
            if spec.kind.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "resource '{}' has an empty kind",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Declared resources in name order
    pub fn to_resources(&self) -> Vec<Resource> {
        self.resources
            .iter()
            .map(|(name, spec)| Resource {
                name: name.clone(),
                kind: spec.kind.clone(),
                properties: spec.properties.clone(),
                depends_on: spec.depends_on.clone(),
            })
            .collect()
    }

    /// Directory relative settings paths are taken from
    pub fn base_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn state_dir(&self) -> PathBuf {
        self.base_dir().join(&self.settings.state_dir)
    }

    pub fn sandbox_dir(&self) -> PathBuf {
        self.base_dir().join(&self.settings.sandbox_dir)
    }

    /// Project name, falling back to the document's directory name
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        self.base_dir()
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .unwrap_or_else(|| "terrace".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    const SAMPLE: &str = r#"
name: openmetadata
settings:
  concurrency: 2
  retry:
    max_attempts: 5
    initial_delay_ms: 50
resources:
  vpc:
    kind: network.vpc
    properties:
      cidr: 10.0.0.0/16
  database:
    kind: database.cluster
    depends_on: [vpc]
    properties:
      engine: mysql
      vpc_id: "${vpc.id}"
      replicas: 2
"#;

    #[test]
    fn test_parse_sample() {
        let doc = parse_document(SAMPLE).unwrap();
        assert_eq!(doc.name.as_deref(), Some("openmetadata"));
        assert_eq!(doc.settings.concurrency, 2);
        assert_eq!(doc.settings.retry.max_attempts, 5);
        // Unset fields keep their defaults
        assert_eq!(doc.settings.retry.max_delay_ms, 30000);
        assert_eq!(doc.settings.state_dir, PathBuf::from(".terrace"));

        let resources = doc.to_resources();
        assert_eq!(resources.len(), 2);
        let db = &resources[0];
        assert_eq!(db.name, "database");
        assert_eq!(db.depends_on, vec!["vpc"]);
        assert_eq!(db.properties["replicas"], json!(2));
        assert_eq!(db.properties["vpc_id"], json!("${vpc.id}"));
    }

    #[test]
    fn test_executor_config_from_settings() {
        let doc = parse_document(SAMPLE).unwrap();
        let config = doc.settings.executor_config();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(50));
        assert_eq!(config.retry.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_empty_document() {
        let doc = parse_document("").unwrap();
        assert!(doc.resources.is_empty());
        assert_eq!(doc.settings, Settings::default());
    }

    #[test]
    fn test_rejects_invalid_settings_and_kinds() {
        let err = parse_document("settings:\n  concurrency: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = parse_document("resources:\n  vpc:\n    kind: \"\"\n").unwrap_err();
        assert!(err.to_string().contains("vpc"));

        let err = parse_document("resources:\n  vpc:\n    kind: network.vpc\n    colour: red\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_resolves_paths_against_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terrace.yaml");
        fs::write(&path, "settings:\n  state_dir: state\n").unwrap();

        let doc = load_document(&path).unwrap();
        assert_eq!(doc.state_dir(), dir.path().join("state"));
        assert_eq!(doc.sandbox_dir(), dir.path().join(".terrace/sandbox"));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "resources: [unclosed").unwrap();

        let err = load_document(&path).unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
    }
}
