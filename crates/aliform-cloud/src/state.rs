//! Identity state store
//!
//! Manages the `.aliform/state.json` file which maps each resource address
//! to the identity of the object it manages. Besides the identity, the file
//! keeps the last observed non-sensitive fields and SHA-256 fingerprints of
//! sensitive ones, so a later run can tell whether a write-only value
//! changed without ever storing it.

use crate::data::{Record, ResourceData};
use crate::error::{CloudError, Result};
use crate::identity::Identity;
use crate::schema::Schema;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".aliform";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const STATE_STAGING: &str = "state.json.tmp";
const LOCK_FILE: &str = "lock.json";

/// Global state containing every managed resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalState {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Resources indexed by address (kind.name)
    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get resources of a specific kind
    pub fn get_kind_resources(&self, kind: &str) -> Vec<(&String, &ResourceState)> {
        self.resources
            .iter()
            .filter(|(_, r)| r.kind == kind)
            .collect()
    }

    /// Add or update a resource
    pub fn set_resource(&mut self, address: String, state: ResourceState) {
        self.resources.insert(address, state);
        self.updated_at = Utc::now();
    }

    /// Remove a resource
    pub fn remove_resource(&mut self, address: &str) -> Option<ResourceState> {
        let result = self.resources.remove(address);
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }

    /// Get a resource by address
    pub fn get_resource(&self, address: &str) -> Option<&ResourceState> {
        self.resources.get(address)
    }
}

/// Persisted state of a single managed object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource kind
    pub kind: String,

    /// Identity handed back to Read/Update/Delete
    pub id: Identity,

    /// Lifecycle status at the end of the last run
    pub status: ResourceStatus,

    /// Last observed non-sensitive fields
    #[serde(default)]
    pub attributes: Record,

    /// SHA-256 fingerprints of sensitive fields
    #[serde(default)]
    pub fingerprints: BTreeMap<String, String>,

    /// When the resource was created
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(kind: impl Into<String>, id: impl Into<Identity>) -> Self {
        let now = Utc::now();
        Self {
            kind: kind.into(),
            id: id.into(),
            status: ResourceStatus::Active,
            attributes: Record::new(),
            fingerprints: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    /// Snapshot observed data, splitting sensitive fields into fingerprints
    ///
    /// `desired` supplies values of sensitive fields the control plane never
    /// echoes back.
    pub fn capture(&mut self, schema: &Schema, observed: &ResourceData, desired: &Record) {
        let mut attributes = Record::new();
        let mut fingerprints = BTreeMap::new();

        for field in schema.fields() {
            if field.sensitive {
                if let Some(value) = desired.get(field.name).or_else(|| observed.get(field.name)) {
                    fingerprints.insert(field.name.to_string(), fingerprint(&value.render()));
                }
            } else if let Some(value) = observed.get(field.name) {
                attributes.set(field.name, value.clone());
            }
        }

        self.attributes = attributes;
        self.fingerprints = fingerprints;
        self.updated_at = Utc::now();
    }

    /// Observed data rebuilt from the snapshot, carrying the identity
    pub fn to_data(&self) -> ResourceData {
        ResourceData::new(self.attributes.clone()).with_id(self.id.clone())
    }
}

/// SHA-256 hex digest of a sensitive value
pub fn fingerprint(value: &str) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}

/// Lifecycle status of a managed object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Not present on the control plane
    Absent,
    /// Usable
    Active,
    /// Last operation failed
    ///
    /// A failed create stores no entry. A failed update or delete keeps the
    /// identity with this status so the next plan refreshes it.
    Failed,
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Absent => write!(f, "absent"),
            ResourceStatus::Active => write!(f, "active"),
            ResourceStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Reads and writes the state directory of one project
pub struct StateManager {
    dir: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            dir: project_root.as_ref().join(STATE_DIR),
        }
    }

    fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Current state; an absent file is an empty state
    pub async fn load(&self) -> Result<GlobalState> {
        let path = self.file(STATE_FILE);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!("No state at {}, starting empty", path.display());
                return Ok(GlobalState::new());
            }
            Err(err) => return Err(err.into()),
        };

        let state: GlobalState = serde_json::from_str(&content)?;
        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "{} has format version {}, this build reads up to {}",
                path.display(),
                state.version,
                STATE_VERSION
            )));
        }
        tracing::debug!("Read {} tracked resources", state.resources.len());
        Ok(state)
    }

    /// Persist `state`
    ///
    /// The previous file is copied to `state.json.backup` and the new content
    /// is renamed into place, so a crash never leaves a truncated state file.
    pub async fn save(&self, state: &GlobalState) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.file(STATE_FILE);

        if fs::try_exists(&path).await? {
            fs::copy(&path, self.file(STATE_BACKUP)).await?;
        }

        let staging = self.file(STATE_STAGING);
        fs::write(&staging, serde_json::to_vec_pretty(state)?).await?;
        fs::rename(&staging, &path).await?;

        tracing::debug!("Wrote {} tracked resources", state.resources.len());
        Ok(())
    }

    /// Take the project lock, breaking it when its holder is older than an hour
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.file(LOCK_FILE);
        let holder = LockHolder::current();

        for _ in 0..2 {
            match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(mut file) => {
                    file.write_all(&serde_json::to_vec_pretty(&holder)?).await?;
                    file.flush().await?;
                    tracing::debug!("Locked {}", path.display());
                    return Ok(StateLock {
                        path,
                        released: false,
                    });
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    let existing: LockHolder =
                        serde_json::from_str(&fs::read_to_string(&path).await?)?;
                    if Utc::now().signed_duration_since(existing.acquired_at) < stale_after() {
                        return Err(CloudError::LockError(format!(
                            "held by {} (pid {}) since {}",
                            existing.host, existing.pid, existing.acquired_at
                        )));
                    }
                    tracing::warn!(
                        "Breaking stale lock of {} (pid {}) from {}",
                        existing.host,
                        existing.pid,
                        existing.acquired_at
                    );
                    fs::remove_file(&path).await?;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(CloudError::LockError(format!(
            "{} was re-created while breaking a stale lock",
            path.display()
        )))
    }
}

fn stale_after() -> chrono::Duration {
    chrono::Duration::hours(1)
}

/// Content of the lock file
#[derive(Debug, Serialize, Deserialize)]
struct LockHolder {
    host: String,
    pid: u32,
    acquired_at: DateTime<Utc>,
}

impl LockHolder {
    fn current() -> Self {
        let host = ["HOSTNAME", "HOST", "COMPUTERNAME"]
            .iter()
            .find_map(|var| std::env::var(var).ok())
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            host,
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }
}

/// Held project lock; dropping it without [`StateLock::release`] still removes the file
#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!("Unlocked {}", self.path.display());
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
