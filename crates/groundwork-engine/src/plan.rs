//! Planned actions

use groundwork_core::ResourceId;
use serde::{Deserialize, Serialize};

/// A planned operation on a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Type of action to perform
    pub action_type: ActionType,

    /// Target resource
    pub resource: ResourceId,

    /// Provider responsible for the resource
    pub provider: String,

    /// One-line description for output
    pub description: String,
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Update an existing resource
    Update,
    /// Delete a resource
    Delete,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Plan covering the whole execution order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Actions in execution order
    pub actions: Vec<Action>,

    /// Whether the plan contains any non-NoOp action
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    pub fn empty() -> Self {
        Self {
            actions: Vec::new(),
            has_changes: false,
        }
    }

    pub fn action_for(&self, resource: &ResourceId) -> Option<&Action> {
        self.actions.iter().find(|a| &a.resource == resource)
    }

    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Counts per action type
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(action_type: ActionType, name: &str) -> Action {
        Action {
            action_type,
            resource: ResourceId::new("instance", name),
            provider: "local".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_plan_has_changes() {
        let plan = Plan::new(vec![action(ActionType::NoOp, "a")]);
        assert!(!plan.has_changes);

        let plan = Plan::new(vec![
            action(ActionType::NoOp, "a"),
            action(ActionType::Create, "b"),
        ]);
        assert!(plan.has_changes);
    }

    #[test]
    fn test_plan_summary() {
        let plan = Plan::new(vec![
            action(ActionType::Create, "a"),
            action(ActionType::Create, "b"),
            action(ActionType::Update, "c"),
            action(ActionType::NoOp, "d"),
        ]);

        let summary = plan.summary();
        assert_eq!(summary.create, 2);
        assert_eq!(summary.update, 1);
        assert_eq!(summary.delete, 0);
        assert_eq!(summary.no_change, 1);
        assert_eq!(
            summary.to_string(),
            "2 to create, 1 to update, 0 to delete, 1 unchanged"
        );
    }

    #[test]
    fn test_action_for() {
        let plan = Plan::new(vec![action(ActionType::Create, "a")]);
        assert!(plan.action_for(&ResourceId::new("instance", "a")).is_some());
        assert!(plan.action_for(&ResourceId::new("instance", "b")).is_none());
    }
}
