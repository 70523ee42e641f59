//! Resource provider trait
//!
//! The seam between the engine and whatever actually owns the resources.
//! Providers implement per-resource create/read/update/delete; ordering,
//! diffing and failure handling stay in the engine.

use crate::error::{EngineError, Result};
use async_trait::async_trait;
use groundwork_core::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Provider abstraction
///
/// Implementations translate a resolved resource into real API calls. All
/// operations address resources by declared type and name; the provider's
/// own id for a resource travels in [`Materialized`].
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Provider name as referenced from configuration (e.g. "local")
    fn name(&self) -> &str;

    /// Human-readable name for output
    fn display_name(&self) -> &str;

    /// Check that the provider is configured and reachable
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Read the current state of a resource, `None` if it does not exist
    async fn read(&self, resource_type: &str, name: &str) -> Result<Option<Materialized>>;

    /// Create the resource and return its materialized attributes
    async fn create(&self, desired: &ResolvedResource) -> Result<Materialized>;

    /// Update an existing resource to the desired attributes
    async fn update(
        &self,
        current: &Materialized,
        desired: &ResolvedResource,
    ) -> Result<Materialized>;

    /// Delete a resource; succeeds if it is already gone
    async fn delete(&self, resource_type: &str, name: &str) -> Result<()>;
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether the provider is usable
    pub authenticated: bool,

    /// Account or endpoint information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// A resource with every reference resolved to a concrete value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedResource {
    /// Declared identifier
    pub id: ResourceId,

    /// Owning provider
    pub provider: String,

    /// Attribute name to concrete value
    pub attributes: HashMap<String, serde_json::Value>,
}

/// Attributes of a resource as the provider reports them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Materialized {
    /// Provider-assigned resource id
    pub id: String,

    /// Materialized attribute values (includes everything declared plus
    /// provider-computed attributes such as `id`)
    pub attributes: HashMap<String, serde_json::Value>,
}

impl Materialized {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// True when every desired attribute matches the materialized value
    pub fn satisfies(&self, desired: &ResolvedResource) -> bool {
        desired
            .attributes
            .iter()
            .all(|(key, value)| self.attributes.get(key) == Some(value))
    }
}

/// Providers indexed by name
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ResourceProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn ResourceProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Result<&Arc<dyn ResourceProvider>> {
        self.providers
            .get(name)
            .ok_or_else(|| EngineError::ProviderNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_satisfies_subset_match() {
        let materialized = Materialized::new("prov-1")
            .with_attribute("cidr", serde_json::json!("10.0.0.0/16"))
            .with_attribute("id", serde_json::json!("prov-1"));

        let desired = ResolvedResource {
            id: ResourceId::new("network", "core"),
            provider: "local".to_string(),
            attributes: [("cidr".to_string(), serde_json::json!("10.0.0.0/16"))]
                .into_iter()
                .collect(),
        };

        assert!(materialized.satisfies(&desired));
    }

    #[test]
    fn test_satisfies_detects_drift() {
        let materialized =
            Materialized::new("prov-1").with_attribute("cidr", serde_json::json!("10.1.0.0/16"));

        let desired = ResolvedResource {
            id: ResourceId::new("network", "core"),
            provider: "local".to_string(),
            attributes: [("cidr".to_string(), serde_json::json!("10.0.0.0/16"))]
                .into_iter()
                .collect(),
        };

        assert!(!materialized.satisfies(&desired));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ProviderRegistry::new();
        assert!(registry.get("missing").is_err());
    }
}
