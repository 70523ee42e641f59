//! Local provider implementation
//!
//! Materializes resources as JSON records under a directory. Each record is
//! one file named `<type>.<name>.json`. Useful for development and for
//! exercising the engine without a cloud account; the record layout mirrors
//! what a real provider would hand back.

use crate::error::{LocalError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use groundwork_engine::{
    AuthStatus, EngineError, Materialized, ResolvedResource, ResourceProvider,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Default record directory, relative to the project root
pub const DEFAULT_ROOT: &str = ".groundwork/resources";

/// On-disk record of one materialized resource
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Record {
    id: String,
    resource_type: String,
    name: String,
    attributes: HashMap<String, serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Provider backed by a local directory of JSON records
pub struct LocalProvider {
    root: PathBuf,
}

impl LocalProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn record_path(&self, resource_type: &str, name: &str) -> PathBuf {
        self.root.join(format!("{resource_type}.{name}.json"))
    }

    async fn ensure_root(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)
                .await
                .map_err(|e| LocalError::RootUnavailable {
                    path: self.root.clone(),
                    message: e.to_string(),
                })?;
            debug!("Created record directory: {}", self.root.display());
        }
        Ok(())
    }

    async fn load_record(&self, path: &Path) -> Result<Option<Record>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).await?;
        let record: Record =
            serde_json::from_str(&content).map_err(|e| LocalError::CorruptRecord {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(Some(record))
    }

    async fn save_record(&self, path: &Path, record: &Record) -> Result<()> {
        self.ensure_root().await?;
        let content = serde_json::to_string_pretty(record)?;
        fs::write(path, content).await?;
        Ok(())
    }

    fn materialize(record: &Record) -> Materialized {
        Materialized {
            id: record.id.clone(),
            attributes: record.attributes.clone(),
        }
    }

    fn build_record(desired: &ResolvedResource, created_at: Option<DateTime<Utc>>) -> Record {
        let now = Utc::now();
        let id = format!("local-{}-{}", desired.id.resource_type, desired.id.name);
        let mut attributes = desired.attributes.clone();
        attributes.insert("id".to_string(), serde_json::json!(id));
        Record {
            id,
            resource_type: desired.id.resource_type.clone(),
            name: desired.id.name.clone(),
            attributes,
            created_at: created_at.unwrap_or(now),
            updated_at: now,
        }
    }
}

fn engine_err(e: LocalError) -> EngineError {
    EngineError::ProviderFailed(e.to_string())
}

#[async_trait]
impl ResourceProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn display_name(&self) -> &str {
        "Local records"
    }

    async fn check_auth(&self) -> groundwork_engine::Result<AuthStatus> {
        match self.ensure_root().await {
            Ok(()) => Ok(AuthStatus::ok(self.root.display().to_string())),
            Err(e) => Ok(AuthStatus::failed(e.to_string())),
        }
    }

    async fn read(
        &self,
        resource_type: &str,
        name: &str,
    ) -> groundwork_engine::Result<Option<Materialized>> {
        let path = self.record_path(resource_type, name);
        let record = self.load_record(&path).await.map_err(engine_err)?;
        Ok(record.as_ref().map(Self::materialize))
    }

    async fn create(
        &self,
        desired: &ResolvedResource,
    ) -> groundwork_engine::Result<Materialized> {
        let path = self.record_path(&desired.id.resource_type, &desired.id.name);
        let record = Self::build_record(desired, None);
        self.save_record(&path, &record).await.map_err(engine_err)?;
        debug!(resource = %desired.id, "Created record");
        Ok(Self::materialize(&record))
    }

    async fn update(
        &self,
        _current: &Materialized,
        desired: &ResolvedResource,
    ) -> groundwork_engine::Result<Materialized> {
        let path = self.record_path(&desired.id.resource_type, &desired.id.name);
        let created_at = self
            .load_record(&path)
            .await
            .map_err(engine_err)?
            .map(|r| r.created_at);
        let record = Self::build_record(desired, created_at);
        self.save_record(&path, &record).await.map_err(engine_err)?;
        debug!(resource = %desired.id, "Updated record");
        Ok(Self::materialize(&record))
    }

    async fn delete(&self, resource_type: &str, name: &str) -> groundwork_engine::Result<()> {
        let path = self.record_path(resource_type, name);
        if path.exists() {
            fs::remove_file(&path)
                .await
                .map_err(|e| engine_err(LocalError::Io(e)))?;
            debug!(resource_type, name, "Deleted record");
        }
        Ok(())
    }
}
