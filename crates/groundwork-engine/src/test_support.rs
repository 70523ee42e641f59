//! In-memory provider for engine tests

use crate::error::{EngineError, Result};
use crate::provider::{AuthStatus, Materialized, ResolvedResource, ResourceProvider};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Provider keeping everything in memory, with failure injection and
/// mutation counting
pub struct MockProvider {
    records: Mutex<HashMap<String, Materialized>>,
    fail_on: HashSet<String>,
    /// create/update/delete calls
    pub mutations: AtomicUsize,
    /// delete calls in order, as `type.name`
    pub deletions: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            fail_on: HashSet::new(),
            mutations: AtomicUsize::new(0),
            deletions: Mutex::new(Vec::new()),
        }
    }

    /// Provider that fails create/update for the given `type.name` keys
    pub fn failing(keys: &[&str]) -> Self {
        Self {
            fail_on: keys.iter().map(|k| k.to_string()).collect(),
            ..Self::new()
        }
    }

    pub fn stored(&self, resource_type: &str, name: &str) -> Option<Materialized> {
        self.records
            .lock()
            .unwrap()
            .get(&key(resource_type, name))
            .cloned()
    }

    fn materialize(&self, desired: &ResolvedResource) -> Result<Materialized> {
        let k = desired.id.to_string();
        if self.fail_on.contains(&k) {
            return Err(EngineError::ProviderFailed(format!(
                "simulated failure for {k}"
            )));
        }
        self.mutations.fetch_add(1, Ordering::SeqCst);

        let provider_id = format!("local-{}-{}", desired.id.resource_type, desired.id.name);
        let mut materialized = Materialized::new(provider_id.clone());
        materialized.attributes = desired.attributes.clone();
        materialized
            .attributes
            .insert("id".to_string(), serde_json::json!(provider_id));

        self.records
            .lock()
            .unwrap()
            .insert(key(&desired.id.resource_type, &desired.id.name), materialized.clone());
        Ok(materialized)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn key(resource_type: &str, name: &str) -> String {
    format!("{resource_type}.{name}")
}

#[async_trait]
impl ResourceProvider for MockProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn display_name(&self) -> &str {
        "Local (in-memory)"
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        Ok(AuthStatus::ok("in-memory"))
    }

    async fn read(&self, resource_type: &str, name: &str) -> Result<Option<Materialized>> {
        Ok(self.stored(resource_type, name))
    }

    async fn create(&self, desired: &ResolvedResource) -> Result<Materialized> {
        self.materialize(desired)
    }

    async fn update(
        &self,
        _current: &Materialized,
        desired: &ResolvedResource,
    ) -> Result<Materialized> {
        self.materialize(desired)
    }

    async fn delete(&self, resource_type: &str, name: &str) -> Result<()> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        self.deletions
            .lock()
            .unwrap()
            .push(key(resource_type, name));
        self.records.lock().unwrap().remove(&key(resource_type, name));
        Ok(())
    }
}
