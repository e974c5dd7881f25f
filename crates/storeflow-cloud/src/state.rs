//! State snapshot model and persistence
//!
//! The snapshot is what the reconciler hands back after every lifecycle call
//! and what it consumes on the next one. It is stored in
//! `.storeflow/state.json`; the field names (`items`, `lastUpdated`,
//! `providerIdentity`, and per item `id`, `name`, `date`, `tags`,
//! `parentGroup`) are the compatibility contract across versions.

use crate::error::{CloudError, Result};
use crate::model::{ObservedResource, ProviderContext};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".storeflow";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const LOCK_FILE: &str = "lock.json";

/// Observed state of every managed resource at the end of a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    pub items: Vec<ObservedResource>,
    pub last_updated: DateTime<Utc>,
    pub provider_identity: ProviderContext,
}

fn default_version() -> u32 {
    STATE_VERSION
}

impl StateSnapshot {
    pub fn new(provider_identity: ProviderContext, last_updated: DateTime<Utc>) -> Self {
        Self {
            version: STATE_VERSION,
            items: Vec::new(),
            last_updated,
            provider_identity,
        }
    }

    /// Snapshot with no items, stamped now
    pub fn empty(provider_identity: ProviderContext) -> Self {
        Self::new(provider_identity, Utc::now())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ObservedResource> {
        self.items.iter().find(|item| item.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.name.as_str())
    }

    /// Copy of this snapshot restricted to the given names
    pub fn subset<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Self {
        let keep: HashSet<&str> = names.into_iter().collect();
        Self {
            items: self
                .items
                .iter()
                .filter(|item| keep.contains(item.name.as_str()))
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    /// Differences between this (freshly read) snapshot and a previous one
    pub fn drift_from(&self, previous: &StateSnapshot) -> Drift {
        let before: HashSet<&str> = previous.names().collect();
        let after: HashSet<&str> = self.names().collect();

        Drift {
            added: self
                .names()
                .filter(|name| !before.contains(name))
                .map(str::to_string)
                .collect(),
            removed: previous
                .names()
                .filter(|name| !after.contains(name))
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Timestamp for the next snapshot, strictly after `previous`
pub fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

/// Resources that appeared or disappeared between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drift {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl Drift {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// State manager for reading/writing state files
pub struct StateManager {
    /// Project root directory
    project_root: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    fn lock_path(&self) -> PathBuf {
        self.state_dir().join(LOCK_FILE)
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the last persisted snapshot, if any
    pub async fn load(&self) -> Result<Option<StateSnapshot>> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found");
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let state: StateSnapshot = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} resources", state.items.len());
        Ok(Some(state))
    }

    /// Persist a snapshot, keeping the previous file as a backup
    pub async fn save(&self, state: &StateSnapshot) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        self.rotate_backup(&path).await?;

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state with {} resources", state.items.len());
        Ok(())
    }

    /// Drop the current snapshot (after a destroy); the backup is kept
    pub async fn discard(&self) -> Result<()> {
        let path = self.state_path();
        if path.exists() {
            self.rotate_backup(&path).await?;
            tracing::debug!("Discarded state");
        }
        Ok(())
    }

    async fn rotate_backup(&self, path: &Path) -> Result<()> {
        if path.exists() {
            let backup = self.backup_path();
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(path, &backup).await?;
            tracing::debug!("Created state backup");
        }
        Ok(())
    }

    /// Acquire a lock for exclusive access
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_state_dir().await?;

        let lock_path = self.lock_path();

        if lock_path.exists() {
            let content = fs::read_to_string(&lock_path).await?;
            let lock_info: LockInfo = serde_json::from_str(&content)?;

            // Locks older than an hour are considered abandoned
            let age = Utc::now().signed_duration_since(lock_info.acquired_at);
            if age.num_hours() < 1 {
                return Err(CloudError::LockError(format!(
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

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    acquired_at: DateTime<Utc>,
}

/// RAII guard for state lock
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
