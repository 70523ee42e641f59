//! Recorded state
//!
//! Tracks what has been materialized so far in `.groundwork/state.json`.
//! Saving keeps a backup of the previous file; concurrent runs are excluded
//! through a lock file with stale-lock detection.

use crate::error::{EngineError, Result};
use crate::provider::Materialized;
use crate::resolve::AttributeStore;
use chrono::{DateTime, Utc};
use groundwork_core::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".groundwork";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const LOCK_FILE: &str = "lock.json";

/// Everything recorded about a project's materialized resources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectState {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Recorded resources keyed by `type.name`
    pub resources: HashMap<String, RecordedState>,
}

impl Default for ProjectState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: HashMap::new(),
        }
    }
}

impl ProjectState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a materialized resource
    pub fn record(&mut self, id: &ResourceId, provider: &str, materialized: &Materialized) {
        let now = Utc::now();
        let created_at = self
            .resources
            .get(&id.to_string())
            .map(|r| r.created_at)
            .unwrap_or(now);
        self.resources.insert(
            id.to_string(),
            RecordedState {
                provider: provider.to_string(),
                provider_id: materialized.id.clone(),
                resource_type: id.resource_type.clone(),
                name: id.name.clone(),
                attributes: materialized.attributes.clone(),
                created_at,
                updated_at: now,
            },
        );
        self.updated_at = now;
    }

    /// Forget a resource (after deletion)
    pub fn forget(&mut self, id: &ResourceId) -> Option<RecordedState> {
        let removed = self.resources.remove(&id.to_string());
        if removed.is_some() {
            self.updated_at = Utc::now();
        }
        removed
    }

    pub fn get(&self, id: &ResourceId) -> Option<&RecordedState> {
        self.resources.get(&id.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Seed an attribute store with every recorded resource's attributes
    pub fn attribute_store(&self) -> AttributeStore {
        let mut store = AttributeStore::new();
        for recorded in self.resources.values() {
            store.insert(
                ResourceId::new(&recorded.resource_type, &recorded.name),
                recorded.attributes.clone(),
            );
        }
        store
    }
}

/// Recorded attributes of one materialized resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedState {
    /// Owning provider
    pub provider: String,

    /// Provider-assigned id
    pub provider_id: String,

    /// Declared type
    pub resource_type: String,

    /// Declared name
    pub name: String,

    /// Materialized attribute values
    pub attributes: HashMap<String, serde_json::Value>,

    /// When the resource was first materialized
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Reads and writes the state file
pub struct StateManager {
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

    fn state_path(&self) -> PathBuf {
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

    /// Load the current state, empty if no state file exists yet
    pub async fn load(&self) -> Result<ProjectState> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, returning empty state");
            return Ok(ProjectState::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: ProjectState = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(EngineError::StateError(format!(
                "state file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} resources", state.resources.len());
        Ok(state)
    }

    /// Save the state, keeping the previous file as a backup
    pub async fn save(&self, state: &ProjectState) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let backup = self.backup_path();

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created state backup");
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state with {} resources", state.resources.len());
        Ok(())
    }

    /// Acquire the project lock
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_state_dir().await?;

        let lock_path = self.lock_path();

        if lock_path.exists() {
            let content = fs::read_to_string(&lock_path).await?;
            let lock_info: LockInfo = serde_json::from_str(&content)?;

            // A lock older than an hour is considered abandoned
            let age = Utc::now().signed_duration_since(lock_info.acquired_at);
            if age.num_hours() < 1 {
                return Err(EngineError::LockError(format!(
                    "state is locked by {} since {}",
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
            // Synchronous cleanup in drop - not ideal but necessary
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}
