//! Plan construction
//!
//! Diffs the declared configuration against what providers report, walking
//! the execution order so producer attributes recorded in state are
//! available when their consumers are diffed.

use crate::error::{EngineError, Result};
use crate::plan::{Action, ActionType, Plan};
use crate::provider::ProviderRegistry;
use crate::resolve::resolve_resource;
use crate::state::ProjectState;
use groundwork_core::{Blueprint, ResourceId};
use tracing::debug;

/// Build a plan for the given execution order
///
/// Never emits Delete: resources present only in state are left alone
/// (destroy is the explicit path for removal).
pub async fn build_plan(
    blueprint: &Blueprint,
    order: &[ResourceId],
    registry: &ProviderRegistry,
    state: &ProjectState,
) -> Result<Plan> {
    let store = state.attribute_store();
    let mut actions = Vec::with_capacity(order.len());

    for id in order {
        let decl = blueprint
            .resource(id)
            .ok_or_else(|| EngineError::ResourceNotFound(id.to_string()))?;
        let provider = registry.get(&decl.provider)?;

        let current = provider.read(&id.resource_type, &id.name).await?;
        let action = match current {
            None => Action {
                action_type: ActionType::Create,
                resource: id.clone(),
                provider: decl.provider.clone(),
                description: format!("create {id}"),
            },
            Some(materialized) => match resolve_resource(decl, &store) {
                Ok(resolved) if materialized.satisfies(&resolved) => Action {
                    action_type: ActionType::NoOp,
                    resource: id.clone(),
                    provider: decl.provider.clone(),
                    description: format!("{id} is up to date"),
                },
                Ok(_) => Action {
                    action_type: ActionType::Update,
                    resource: id.clone(),
                    provider: decl.provider.clone(),
                    description: format!("update {id} (attributes differ)"),
                },
                // Producer attributes are unknown until apply; assume a change
                Err(EngineError::UnresolvedReference { reference, .. }) => Action {
                    action_type: ActionType::Update,
                    resource: id.clone(),
                    provider: decl.provider.clone(),
                    description: format!("update {id} ({reference} resolves during apply)"),
                },
                Err(e) => return Err(e),
            },
        };

        debug!(resource = %id, action = %action.action_type, "Planned");
        actions.push(action);
    }

    Ok(Plan::new(actions))
}
