//! State management for reconciled resources
//!
//! The state store is the ledger of what the engine believes exists. The
//! executor writes one record per transition and waits for the write to be
//! durable before moving on, so an interrupted run can be resumed from
//! `.terrace/state.json`.

use crate::error::{CloudError, Result};
use crate::resource::Properties;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const STATE_VERSION: u32 = 1;
const STATE_FILE: &str = "state.json";
const STATE_TMP: &str = "state.json.tmp";
const STATE_BACKUP: &str = "state.json.backup";
const LOCK_FILE: &str = "lock.json";

/// Snapshot of all records keyed by logical name
pub type StateSnapshot = BTreeMap<String, ActualStateRecord>;

/// Last observed status of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Never created, or deleted
    Absent,
    /// Create was issued and has not finished
    Creating,
    /// Resource exists and matches its last-applied declaration
    Active,
    /// Update was issued and has not finished
    Updating,
    /// Delete was issued and has not finished
    Deleting,
    /// Last operation failed permanently
    Failed,
}

impl ResourceStatus {
    /// Whether an operation was interrupted while in this status.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Creating | Self::Updating | Self::Deleting)
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Absent => write!(f, "absent"),
            ResourceStatus::Creating => write!(f, "creating"),
            ResourceStatus::Active => write!(f, "active"),
            ResourceStatus::Updating => write!(f, "updating"),
            ResourceStatus::Deleting => write!(f, "deleting"),
            ResourceStatus::Failed => write!(f, "failed"),
        }
    }
}

/// What the engine last knew about one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualStateRecord {
    /// Provider-assigned identifier
    #[serde(default)]
    pub external_id: Option<String>,

    /// Kind tag the resource was applied with
    pub kind: String,

    /// Checksum of the last successfully applied declaration
    #[serde(default)]
    pub checksum: Option<String>,

    pub status: ResourceStatus,

    /// Diagnostic from the last failure
    #[serde(default)]
    pub message: Option<String>,

    /// Dependencies at last apply; orders deletes once the resource is undeclared
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Last applied properties
    #[serde(default)]
    pub properties: Properties,

    pub updated_at: DateTime<Utc>,
}

impl ActualStateRecord {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            external_id: None,
            kind: kind.into(),
            checksum: None,
            status: ResourceStatus::Absent,
            message: None,
            depends_on: Vec::new(),
            properties: Properties::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn with_depends_on(mut self, depends_on: Vec<String>) -> Self {
        self.depends_on = depends_on;
        self
    }

    /// Copy of this record moved to `status`, message cleared, timestamp bumped.
    pub fn transition(&self, status: ResourceStatus) -> Self {
        Self {
            status,
            message: None,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    /// Whether the provider knows this resource.
    pub fn exists(&self) -> bool {
        self.status != ResourceStatus::Absent && self.external_id.is_some()
    }
}

/// Persistence for actual state
///
/// Implementations must make each `record_transition` durable before
/// returning; the executor relies on that for crash recovery.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load all records. An empty store yields an empty snapshot.
    async fn load(&self) -> Result<StateSnapshot>;

    /// Atomically replace the record for `name`.
    async fn record_transition(&self, name: &str, record: ActualStateRecord) -> Result<()>;

    /// Current in-memory view of the store.
    async fn snapshot(&self) -> Result<StateSnapshot>;
}

/// On-disk state document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDocument {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Records indexed by logical name
    pub resources: StateSnapshot,
}

impl Default for StateDocument {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: StateSnapshot::new(),
        }
    }
}

/// JSON-file state store
///
/// Every transition rewrites `state.json` through a temp file and a rename,
/// keeping the previous document as `state.json.backup`.
pub struct FileStateStore {
    state_dir: PathBuf,
    document: Mutex<Option<StateDocument>>,
}

impl FileStateStore {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            state_dir: state_dir.as_ref().to_path_buf(),
            document: Mutex::new(None),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Get the state file path
    pub fn state_path(&self) -> PathBuf {
        self.state_dir.join(STATE_FILE)
    }

    fn tmp_path(&self) -> PathBuf {
        self.state_dir.join(STATE_TMP)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir.join(STATE_BACKUP)
    }

    fn lock_path(&self) -> PathBuf {
        self.state_dir.join(LOCK_FILE)
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        if !self.state_dir.exists() {
            fs::create_dir_all(&self.state_dir).await?;
            tracing::debug!("Created state directory: {}", self.state_dir.display());
        }
        Ok(())
    }

    async fn read_document(&self) -> Result<StateDocument> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, returning empty state");
            return Ok(StateDocument::default());
        }

        let content = fs::read_to_string(&path).await?;
        let document: StateDocument = serde_json::from_str(&content).map_err(|e| {
            CloudError::StateStore(format!("invalid state file {}: {}", path.display(), e))
        })?;

        if document.version > STATE_VERSION {
            return Err(CloudError::StateStore(format!(
                "State file version {} is newer than supported version {}",
                document.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} resources", document.resources.len());
        Ok(document)
    }

    async fn write_document(&self, document: &StateDocument) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let tmp = self.tmp_path();
        let content = serde_json::to_string_pretty(document)?;

        let mut file = fs::File::create(&tmp).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        if path.exists() {
            fs::copy(&path, self.backup_path()).await?;
        }
        fs::rename(&tmp, &path).await?;

        tracing::debug!("Saved state with {} resources", document.resources.len());
        Ok(())
    }

    /// Acquire the advisory lock for exclusive access to this ledger
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_state_dir().await?;

        let lock_path = self.lock_path();

        if lock_path.exists() {
            let content = fs::read_to_string(&lock_path).await?;
            let lock_info: LockInfo = serde_json::from_str(&content)?;

            // Check if lock is stale (older than 1 hour)
            let age = Utc::now().signed_duration_since(lock_info.acquired_at);
            if age.num_hours() < 1 {
                return Err(CloudError::Lock(format!(
                    "State is locked by {} since {}",
                    lock_info.holder, lock_info.acquired_at
                )));
            }

            tracing::warn!("Removing stale lock from {}", lock_info.holder);
        }

        let lock_info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            acquired_at: Utc::now(),
        };

        let content = serde_json::to_string_pretty(&lock_info)?;
        fs::write(&lock_path, content).await?;

        tracing::debug!("Acquired state lock");
        Ok(StateLock {
            lock_path,
            released: false,
        })
    }
}

fn store_error(e: CloudError) -> CloudError {
    match e {
        CloudError::StateStore(_) => e,
        other => CloudError::StateStore(other.to_string()),
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<StateSnapshot> {
        let mut cached = self.document.lock().await;
        let document = self.read_document().await.map_err(store_error)?;
        let resources = document.resources.clone();
        *cached = Some(document);
        Ok(resources)
    }

    async fn record_transition(&self, name: &str, record: ActualStateRecord) -> Result<()> {
        let mut cached = self.document.lock().await;
        let mut document = match cached.take() {
            Some(doc) => doc,
            None => self.read_document().await.map_err(store_error)?,
        };

        tracing::debug!("Recording {} -> {}", name, record.status);
        let previous = document.resources.insert(name.to_string(), record);
        document.updated_at = Utc::now();

        match self.write_document(&document).await {
            Ok(()) => {
                *cached = Some(document);
                Ok(())
            }
            Err(e) => {
                // Keep the in-memory view identical to what is on disk.
                match previous {
                    Some(prev) => {
                        document.resources.insert(name.to_string(), prev);
                    }
                    None => {
                        document.resources.remove(name);
                    }
                }
                *cached = Some(document);
                Err(store_error(e))
            }
        }
    }

    async fn snapshot(&self) -> Result<StateSnapshot> {
        {
            let cached = self.document.lock().await;
            if let Some(doc) = cached.as_ref() {
                return Ok(doc.resources.clone());
            }
        }
        self.load().await
    }
}

/// Lock information
#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    acquired_at: DateTime<Utc>,
}

/// RAII guard for the state lock
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    /// Release the lock
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            if self.lock_path.exists() {
                fs::remove_file(&self.lock_path).await?;
                tracing::debug!("Released state lock");
            }
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released && self.lock_path.exists() {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}

/// In-process state store for dry runs and tests
#[derive(Default)]
pub struct MemoryStateStore {
    records: Mutex<StateSnapshot>,
    writes: AtomicUsize,
    fail_after: Option<usize>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: StateSnapshot) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Make every write after the first `writes` fail.
    pub fn failing_after(mut self, writes: usize) -> Self {
        self.fail_after = Some(writes);
        self
    }

    /// Number of successful writes so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<StateSnapshot> {
        Ok(self.records.lock().await.clone())
    }

    async fn record_transition(&self, name: &str, record: ActualStateRecord) -> Result<()> {
        let mut records = self.records.lock().await;
        if let Some(limit) = self.fail_after {
            if self.writes.load(Ordering::SeqCst) >= limit {
                return Err(CloudError::StateStore(format!(
                    "write of '{}' rejected: store unavailable",
                    name
                )));
            }
        }
        records.insert(name.to_string(), record);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn snapshot(&self) -> Result<StateSnapshot> {
        self.load().await
    }
}
