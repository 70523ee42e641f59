//! Apply executor
//!
//! Walks the execution order sequentially: a node's references are only
//! readable once every producer before it has been materialized. The first
//! provider failure halts the walk; everything not yet executed is reported
//! as skipped. Already-applied resources stay in place.

use crate::error::{EngineError, Result};
use crate::plan::{ActionType, Plan};
use crate::provider::{Materialized, ProviderRegistry};
use crate::resolve::resolve_resource;
use crate::state::ProjectState;
use groundwork_core::{Blueprint, ResourceId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{info, warn};

/// Cooperative cancellation handle
///
/// Checked between nodes and raced against the in-flight provider call, so
/// cancelling marks the current node and everything after it as skipped.
#[derive(Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender kept alive by every clone; unreachable in practice
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Final status of a node after an apply or destroy pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::Succeeded => write!(f, "succeeded"),
            NodeStatus::Failed => write!(f, "failed"),
            NodeStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Per-node outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeOutcome {
    pub resource: ResourceId,
    pub action: ActionType,
    pub status: NodeStatus,
    pub message: String,
    pub error: Option<String>,
}

/// Full report of an apply or destroy pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyReport {
    /// Outcomes in execution order
    pub outcomes: Vec<NodeOutcome>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyReport {
    pub fn new() -> Self {
        Self {
            outcomes: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.status == NodeStatus::Succeeded)
    }

    pub fn outcome_for(&self, resource: &ResourceId) -> Option<&NodeOutcome> {
        self.outcomes.iter().find(|o| &o.resource == resource)
    }

    pub fn with_status(&self, status: NodeStatus) -> Vec<&NodeOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == status)
            .collect()
    }

    fn add_succeeded(&mut self, resource: ResourceId, action: ActionType, message: String) {
        self.outcomes.push(NodeOutcome {
            resource,
            action,
            status: NodeStatus::Succeeded,
            message,
            error: None,
        });
    }

    fn add_failed(&mut self, resource: ResourceId, action: ActionType, error: String) {
        self.outcomes.push(NodeOutcome {
            resource,
            action,
            status: NodeStatus::Failed,
            message: String::new(),
            error: Some(error),
        });
    }

    fn add_skipped(&mut self, resource: ResourceId, action: ActionType, message: String) {
        self.outcomes.push(NodeOutcome {
            resource,
            action,
            status: NodeStatus::Skipped,
            message,
            error: None,
        });
    }
}

impl Default for ApplyReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Sequential apply/destroy executor
pub struct Executor {
    registry: ProviderRegistry,
    cancel: CancelToken,
}

impl Executor {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            cancel: CancelToken::new(),
        }
    }

    /// Handle for cancelling this executor from another task
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Apply a plan
    ///
    /// Provider failures do not return `Err`; they are recorded in the
    /// report and halt the walk. `Err` is reserved for configuration-level
    /// problems (unknown resource or provider).
    pub async fn apply(
        &self,
        blueprint: &Blueprint,
        order: &[ResourceId],
        plan: &Plan,
        state: &mut ProjectState,
    ) -> Result<ApplyReport> {
        let start = Instant::now();
        let mut store = state.attribute_store();
        let mut report = ApplyReport::new();
        let mut halt_reason: Option<String> = None;

        for id in order {
            let action = plan
                .action_for(id)
                .map(|a| a.action_type)
                .unwrap_or(ActionType::NoOp);

            if halt_reason.is_none() && self.cancel.is_cancelled() {
                halt_reason = Some("apply cancelled".to_string());
            }
            if let Some(reason) = &halt_reason {
                report.add_skipped(id.clone(), action, reason.clone());
                continue;
            }

            match action {
                ActionType::NoOp => {
                    report.add_succeeded(id.clone(), action, "up to date".to_string());
                    continue;
                }
                ActionType::Delete => {
                    // Apply plans never carry deletes; destroy is the path
                    report.add_skipped(id.clone(), action, "delete requires destroy".to_string());
                    continue;
                }
                ActionType::Create | ActionType::Update => {}
            }

            let decl = blueprint
                .resource(id)
                .ok_or_else(|| EngineError::ResourceNotFound(id.to_string()))?;
            let provider = self.registry.get(&decl.provider)?;

            let resolved = match resolve_resource(decl, &store) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(resource = %id, error = %e, "Reference resolution failed");
                    report.add_failed(id.clone(), action, e.to_string());
                    halt_reason = Some(format!("apply halted after failure of {id}"));
                    continue;
                }
            };

            // Current attributes for update, cloned out of state before the
            // provider call so the in-flight future borrows nothing mutable
            let current = state.get(id).map(|r| Materialized {
                id: r.provider_id.clone(),
                attributes: r.attributes.clone(),
            });

            info!(resource = %id, action = %action, provider = %decl.provider, "Applying");

            let operation = async {
                match action {
                    ActionType::Create => provider.create(&resolved).await,
                    ActionType::Update => {
                        let current = match current {
                            Some(current) => current,
                            None => provider
                                .read(&id.resource_type, &id.name)
                                .await?
                                .ok_or_else(|| EngineError::ResourceNotFound(id.to_string()))?,
                        };
                        provider.update(&current, &resolved).await
                    }
                    _ => unreachable!("only create and update reach the provider here"),
                }
            };

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    report.add_skipped(id.clone(), action, "apply cancelled".to_string());
                    halt_reason = Some("apply cancelled".to_string());
                    continue;
                }
                result = operation => result,
            };

            match result {
                Ok(materialized) => {
                    state.record(id, &decl.provider, &materialized);
                    store.insert(id.clone(), materialized.attributes.clone());
                    report.add_succeeded(
                        id.clone(),
                        action,
                        format!("{action}d {id} (id: {})", materialized.id),
                    );
                }
                Err(e) => {
                    warn!(resource = %id, error = %e, "Provider operation failed");
                    report.add_failed(id.clone(), action, e.to_string());
                    halt_reason = Some(format!("apply halted after failure of {id}"));
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }

    /// Destroy recorded resources, consumers before producers
    pub async fn destroy(
        &self,
        order: &[ResourceId],
        state: &mut ProjectState,
    ) -> Result<ApplyReport> {
        let start = Instant::now();
        let mut report = ApplyReport::new();
        let mut halt_reason: Option<String> = None;

        for id in order.iter().rev() {
            if halt_reason.is_none() && self.cancel.is_cancelled() {
                halt_reason = Some("destroy cancelled".to_string());
            }
            if let Some(reason) = &halt_reason {
                report.add_skipped(id.clone(), ActionType::Delete, reason.clone());
                continue;
            }

            let Some(recorded) = state.get(id).cloned() else {
                report.add_succeeded(id.clone(), ActionType::NoOp, "not present".to_string());
                continue;
            };
            let provider = self.registry.get(&recorded.provider)?;

            info!(resource = %id, provider = %recorded.provider, "Destroying");

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    report.add_skipped(id.clone(), ActionType::Delete, "destroy cancelled".to_string());
                    halt_reason = Some("destroy cancelled".to_string());
                    continue;
                }
                result = provider.delete(&id.resource_type, &id.name) => result,
            };

            match result {
                Ok(()) => {
                    state.forget(id);
                    report.add_succeeded(
                        id.clone(),
                        ActionType::Delete,
                        format!("deleted {id}"),
                    );
                }
                Err(e) => {
                    warn!(resource = %id, error = %e, "Delete failed");
                    report.add_failed(id.clone(), ActionType::Delete, e.to_string());
                    halt_reason = Some(format!("destroy halted after failure of {id}"));
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::build_plan;
    use crate::provider::{AuthStatus, ResolvedResource, ResourceProvider};
    use crate::test_support::MockProvider;
    use async_trait::async_trait;
    use groundwork_core::parse_kdl_string;
    use groundwork_graph::ResourceGraph;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    const WEB_STACK: &str = r#"
        provider "local"

        resource "network" "core" {
            cidr "10.0.0.0/16"
        }

        resource "security-group" "web" {
            network "@network.core.id"
        }

        resource "instance" "web-01" {
            network "@network.core.id"
            security_group "@security-group.web.id"
        }
    "#;

    fn load(kdl: &str) -> (groundwork_core::Blueprint, Vec<ResourceId>) {
        let mut blueprint = parse_kdl_string(kdl, "test".to_string()).unwrap();
        blueprint.resolve_providers().unwrap();
        let graph = ResourceGraph::build(&blueprint.resources).unwrap();
        let order = graph.execution_order().unwrap();
        (blueprint, order)
    }

    fn registry_with(provider: Arc<MockProvider>) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        registry.register(provider);
        registry
    }

    #[tokio::test]
    async fn test_apply_creates_in_order_and_resolves_references() {
        let (blueprint, order) = load(WEB_STACK);
        let provider = Arc::new(MockProvider::new());
        let registry = registry_with(provider.clone());
        let executor = Executor::new(registry.clone());
        let mut state = ProjectState::new();

        let plan = build_plan(&blueprint, &order, &registry, &state)
            .await
            .unwrap();
        assert_eq!(plan.summary().create, 3);

        let report = executor
            .apply(&blueprint, &order, &plan, &mut state)
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.outcomes.len(), 3);

        // The instance's reference resolved to the network's materialized id
        let instance = provider
            .stored("instance", "web-01")
            .expect("instance materialized");
        assert_eq!(
            instance.attributes.get("network"),
            Some(&serde_json::json!("local-network-core"))
        );

        // All three recorded in state
        assert_eq!(state.resources.len(), 3);
    }

    #[tokio::test]
    async fn test_second_apply_is_idempotent() {
        let (blueprint, order) = load(WEB_STACK);
        let provider = Arc::new(MockProvider::new());
        let registry = registry_with(provider.clone());
        let executor = Executor::new(registry.clone());
        let mut state = ProjectState::new();

        let plan = build_plan(&blueprint, &order, &registry, &state)
            .await
            .unwrap();
        executor
            .apply(&blueprint, &order, &plan, &mut state)
            .await
            .unwrap();
        let mutations_after_first = provider.mutations.load(Ordering::SeqCst);

        // Unchanged configuration plans to NoOp everywhere
        let second_plan = build_plan(&blueprint, &order, &registry, &state)
            .await
            .unwrap();
        assert!(!second_plan.has_changes);
        assert_eq!(second_plan.summary().no_change, 3);

        let report = executor
            .apply(&blueprint, &order, &second_plan, &mut state)
            .await
            .unwrap();
        assert!(report.is_success());

        // No mutation calls on the second pass
        assert_eq!(provider.mutations.load(Ordering::SeqCst), mutations_after_first);
    }

    #[tokio::test]
    async fn test_failure_halts_and_skips_the_rest() {
        let (blueprint, order) = load(WEB_STACK);
        let provider = Arc::new(MockProvider::failing(&["security-group.web"]));
        let registry = registry_with(provider.clone());
        let executor = Executor::new(registry.clone());
        let mut state = ProjectState::new();

        let plan = build_plan(&blueprint, &order, &registry, &state)
            .await
            .unwrap();
        let report = executor
            .apply(&blueprint, &order, &plan, &mut state)
            .await
            .unwrap();

        assert!(!report.is_success());

        // Ordered before the failure: succeeded
        let network = report
            .outcome_for(&ResourceId::new("network", "core"))
            .unwrap();
        assert_eq!(network.status, NodeStatus::Succeeded);

        // The failing node itself
        let sg = report
            .outcome_for(&ResourceId::new("security-group", "web"))
            .unwrap();
        assert_eq!(sg.status, NodeStatus::Failed);
        assert!(sg.error.is_some());

        // Descendant: skipped, with the failed node named
        let instance = report
            .outcome_for(&ResourceId::new("instance", "web-01"))
            .unwrap();
        assert_eq!(instance.status, NodeStatus::Skipped);
        assert!(instance.message.contains("security-group.web"));

        // The already-applied resource stays recorded
        assert!(state.get(&ResourceId::new("network", "core")).is_some());
        assert!(state.get(&ResourceId::new("instance", "web-01")).is_none());
    }

    #[tokio::test]
    async fn test_cancel_before_apply_skips_everything() {
        let (blueprint, order) = load(WEB_STACK);
        let provider = Arc::new(MockProvider::new());
        let registry = registry_with(provider.clone());
        let executor = Executor::new(registry.clone());
        let mut state = ProjectState::new();

        let plan = build_plan(&blueprint, &order, &registry, &state)
            .await
            .unwrap();

        executor.cancel_token().cancel();
        let report = executor
            .apply(&blueprint, &order, &plan, &mut state)
            .await
            .unwrap();

        assert_eq!(report.with_status(NodeStatus::Skipped).len(), 3);
        assert_eq!(provider.mutations.load(Ordering::SeqCst), 0);
    }

    /// Provider whose create blocks until the test lets it proceed
    struct GatedProvider {
        inner: MockProvider,
        entered: tokio::sync::Notify,
        gate: tokio::sync::Notify,
    }

    #[async_trait]
    impl ResourceProvider for GatedProvider {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn display_name(&self) -> &str {
            self.inner.display_name()
        }

        async fn check_auth(&self) -> crate::error::Result<AuthStatus> {
            self.inner.check_auth().await
        }

        async fn read(
            &self,
            resource_type: &str,
            name: &str,
        ) -> crate::error::Result<Option<Materialized>> {
            self.inner.read(resource_type, name).await
        }

        async fn create(
            &self,
            desired: &ResolvedResource,
        ) -> crate::error::Result<Materialized> {
            if desired.id.name == "web" {
                self.entered.notify_one();
                self.gate.notified().await;
            }
            self.inner.create(desired).await
        }

        async fn update(
            &self,
            current: &Materialized,
            desired: &ResolvedResource,
        ) -> crate::error::Result<Materialized> {
            self.inner.update(current, desired).await
        }

        async fn delete(&self, resource_type: &str, name: &str) -> crate::error::Result<()> {
            self.inner.delete(resource_type, name).await
        }
    }

    #[tokio::test]
    async fn test_cancel_halts_in_flight_operation() {
        let (blueprint, order) = load(WEB_STACK);
        let provider = Arc::new(GatedProvider {
            inner: MockProvider::new(),
            entered: tokio::sync::Notify::new(),
            gate: tokio::sync::Notify::new(),
        });
        let mut registry = ProviderRegistry::new();
        registry.register(provider.clone());
        let executor = Executor::new(registry.clone());
        let cancel = executor.cancel_token();
        let mut state = ProjectState::new();

        let plan = build_plan(&blueprint, &order, &registry, &state)
            .await
            .unwrap();

        let apply = tokio::spawn(async move {
            let report = executor
                .apply(&blueprint, &order, &plan, &mut state)
                .await
                .unwrap();
            (report, state)
        });

        // Wait until the second node is in flight, then cancel
        provider.entered.notified().await;
        cancel.cancel();

        let (report, state) = apply.await.unwrap();

        let network = report
            .outcome_for(&ResourceId::new("network", "core"))
            .unwrap();
        assert_eq!(network.status, NodeStatus::Succeeded);

        // The in-flight node and everything after it are skipped
        let sg = report
            .outcome_for(&ResourceId::new("security-group", "web"))
            .unwrap();
        assert_eq!(sg.status, NodeStatus::Skipped);
        assert!(sg.message.contains("cancelled"));

        let instance = report
            .outcome_for(&ResourceId::new("instance", "web-01"))
            .unwrap();
        assert_eq!(instance.status, NodeStatus::Skipped);

        assert!(state.get(&ResourceId::new("security-group", "web")).is_none());
    }

    #[tokio::test]
    async fn test_destroy_walks_in_reverse() {
        let (blueprint, order) = load(WEB_STACK);
        let provider = Arc::new(MockProvider::new());
        let registry = registry_with(provider.clone());
        let executor = Executor::new(registry.clone());
        let mut state = ProjectState::new();

        let plan = build_plan(&blueprint, &order, &registry, &state)
            .await
            .unwrap();
        executor
            .apply(&blueprint, &order, &plan, &mut state)
            .await
            .unwrap();

        let report = executor.destroy(&order, &mut state).await.unwrap();
        assert!(report.is_success());

        // Consumers deleted before their producers
        let deletions = provider.deletions.lock().unwrap().clone();
        let pos = |key: &str| deletions.iter().position(|d| d == key).unwrap();
        assert!(pos("instance.web-01") < pos("network.core"));
        assert!(pos("security-group.web") < pos("network.core"));

        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn test_destroy_with_empty_state_is_noop() {
        let (_, order) = load(WEB_STACK);
        let provider = Arc::new(MockProvider::new());
        let registry = registry_with(provider.clone());
        let executor = Executor::new(registry);
        let mut state = ProjectState::new();

        let report = executor.destroy(&order, &mut state).await.unwrap();
        assert!(report.is_success());
        assert_eq!(provider.mutations.load(Ordering::SeqCst), 0);
    }
}
