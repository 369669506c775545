//! Sandbox object store
//!
//! Each simulated resource is a JSON file at `<root>/<kind>/<id>.json`.
//! Scripted faults are read from `<root>/faults.json`.

use crate::error::{Result, SandboxError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use terrace_cloud::Properties;
use tokio::sync::Mutex;

const FAULTS_FILE: &str = "faults.json";

/// A resource as stored by the sandbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxObject {
    pub id: String,
    pub kind: String,
    pub properties: Properties,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    Transient,
    Permanent,
}

/// `"<op>:<kind>"` → faults consumed one per call, front first
pub type FaultPlan = BTreeMap<String, Vec<Fault>>;

pub struct SandboxClient {
    root: PathBuf,
    latency: Duration,
    seq: AtomicU64,
    faults: Mutex<()>,
}

impl SandboxClient {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            latency: Duration::ZERO,
            seq: AtomicU64::new(0),
            faults: Mutex::new(()),
        }
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn create(&self, kind: &str, properties: &Properties) -> Result<SandboxObject> {
        self.enter("create", kind).await?;

        let id = self.next_id(kind);
        let now = Utc::now();
        let object = SandboxObject {
            id: id.clone(),
            kind: kind.to_string(),
            properties: properties.clone(),
            created_at: now,
            updated_at: now,
        };
        self.write_object(&object).await?;
        tracing::debug!("sandbox: created {} {}", kind, id);
        Ok(object)
    }

    pub async fn get(&self, kind: &str, id: &str) -> Result<Option<SandboxObject>> {
        self.enter("read", kind).await?;
        let path = self.object_path(kind, id)?;

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update(
        &self,
        kind: &str,
        id: &str,
        properties: &Properties,
    ) -> Result<SandboxObject> {
        self.enter("update", kind).await?;
        let path = self.object_path(kind, id)?;

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SandboxError::NotFound(format!("{}/{}", kind, id)));
            }
            Err(e) => return Err(e.into()),
        };
        let mut object: SandboxObject = serde_json::from_str(&content)?;
        object.properties = properties.clone();
        object.updated_at = Utc::now();
        self.write_object(&object).await?;
        tracing::debug!("sandbox: updated {} {}", kind, id);
        Ok(object)
    }

    /// Returns whether the object existed.
    pub async fn delete(&self, kind: &str, id: &str) -> Result<bool> {
        self.enter("delete", kind).await?;
        let path = self.object_path(kind, id)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("sandbox: deleted {} {}", kind, id);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Every stored object, ordered by kind then id
    pub async fn list(&self) -> Result<Vec<SandboxObject>> {
        let mut objects = Vec::new();
        let mut kinds = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(objects),
            Err(e) => return Err(e.into()),
        };

        while let Some(kind_dir) = kinds.next_entry().await? {
            if !kind_dir.file_type().await?.is_dir() {
                continue;
            }
            let mut entries = tokio::fs::read_dir(kind_dir.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let content = tokio::fs::read_to_string(&path).await?;
                objects.push(serde_json::from_str::<SandboxObject>(&content)?);
            }
        }

        objects.sort_by(|a, b| (&a.kind, &a.id).cmp(&(&b.kind, &b.id)));
        Ok(objects)
    }

    /// Queue `faults` for future `op` calls on `kind`.
    pub async fn inject(&self, op: &str, kind: &str, faults: &[Fault]) -> Result<()> {
        let _guard = self.faults.lock().await;
        let mut plan = self.read_faults().await?;
        plan.entry(format!("{}:{}", op, kind))
            .or_default()
            .extend_from_slice(faults);
        self.write_faults(&plan).await
    }

    /// Apply latency and consume the next scripted fault, if any.
    async fn enter(&self, op: &str, kind: &str) -> Result<()> {
        if !is_valid_segment(kind) {
            return Err(SandboxError::InvalidKind(kind.to_string()));
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let _guard = self.faults.lock().await;
        let mut plan = self.read_faults().await?;
        let key = format!("{}:{}", op, kind);
        let Some(queue) = plan.get_mut(&key) else {
            return Ok(());
        };
        if queue.is_empty() {
            return Ok(());
        }
        let fault = queue.remove(0);
        if queue.is_empty() {
            plan.remove(&key);
        }
        self.write_faults(&plan).await?;

        tracing::debug!("sandbox: injecting {:?} fault on {}", fault, key);
        Err(SandboxError::Injected {
            op: op.to_string(),
            kind: kind.to_string(),
            transient: fault == Fault::Transient,
        })
    }

    async fn read_faults(&self) -> Result<FaultPlan> {
        match tokio::fs::read_to_string(self.root.join(FAULTS_FILE)).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FaultPlan::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_faults(&self, plan: &FaultPlan) -> Result<()> {
        let path = self.root.join(FAULTS_FILE);
        if plan.is_empty() {
            return match tokio::fs::remove_file(&path).await {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }
        tokio::fs::create_dir_all(&self.root).await?;
        write_atomic(&path, &serde_json::to_string_pretty(plan)?).await
    }

    fn next_id(&self, kind: &str) -> String {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let digest = blake3::hash(format!("{}:{}:{}", kind, nanos, seq).as_bytes());
        let prefix = kind.rsplit('.').next().unwrap_or(kind);
        format!("{}-{}", prefix, &digest.to_hex()[..12])
    }

    fn object_path(&self, kind: &str, id: &str) -> Result<PathBuf> {
        if !is_valid_segment(id) {
            return Err(SandboxError::InvalidId(id.to_string()));
        }
        Ok(self.root.join(kind).join(format!("{}.json", id)))
    }

    async fn write_object(&self, object: &SandboxObject) -> Result<()> {
        let path = self.object_path(&object.kind, &object.id)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        write_atomic(&path, &serde_json::to_string_pretty(object)?).await
    }
}

/// Kinds and ids become path segments.
fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with('.')
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

async fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn props(value: serde_json::Value) -> Properties {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_object_lifecycle() {
        let dir = tempdir().unwrap();
        let client = SandboxClient::new(dir.path());

        let created = client
            .create("network.vpc", &props(json!({"cidr": "10.0.0.0/16"})))
            .await
            .unwrap();
        assert!(created.id.starts_with("vpc-"));
        assert!(
            dir.path()
                .join("network.vpc")
                .join(format!("{}.json", created.id))
                .exists()
        );

        let fetched = client.get("network.vpc", &created.id).await.unwrap().unwrap();
        assert_eq!(fetched.properties["cidr"], json!("10.0.0.0/16"));

        let updated = client
            .update("network.vpc", &created.id, &props(json!({"cidr": "10.1.0.0/16"})))
            .await
            .unwrap();
        assert_eq!(updated.created_at, created.created_at);

        assert!(client.delete("network.vpc", &created.id).await.unwrap());
        assert!(!client.delete("network.vpc", &created.id).await.unwrap());
        assert!(client.get("network.vpc", &created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let dir = tempdir().unwrap();
        let client = SandboxClient::new(dir.path());
        let a = client.create("storage.bucket", &Properties::new()).await.unwrap();
        let b = client.create("storage.bucket", &Properties::new()).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(client.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let client = SandboxClient::new(dir.path());
        let err = client
            .update("storage.bucket", "bucket-000", &Properties::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rejects_path_like_segments() {
        let dir = tempdir().unwrap();
        let client = SandboxClient::new(dir.path());
        assert!(matches!(
            client.create("../escape", &Properties::new()).await,
            Err(SandboxError::InvalidKind(_))
        ));
        assert!(matches!(
            client.get("storage.bucket", "a/b").await,
            Err(SandboxError::InvalidId(_))
        ));
    }

    #[tokio::test]
    async fn test_faults_consumed_in_order() {
        let dir = tempdir().unwrap();
        let client = SandboxClient::new(dir.path());
        client
            .inject("create", "iam.role", &[Fault::Transient, Fault::Permanent])
            .await
            .unwrap();

        let first = client.create("iam.role", &Properties::new()).await.unwrap_err();
        assert!(first.is_transient());
        let second = client.create("iam.role", &Properties::new()).await.unwrap_err();
        assert!(!second.is_transient());
        assert!(client.create("iam.role", &Properties::new()).await.is_ok());
        assert!(!dir.path().join(FAULTS_FILE).exists());
    }

    #[tokio::test]
    async fn test_list_empty_root() {
        let dir = tempdir().unwrap();
        let client = SandboxClient::new(dir.path().join("missing"));
        assert!(client.list().await.unwrap().is_empty());
    }
}
