//! Plan types for storage resource reconciliation
//!
//! A [`Plan`] is the host-side diff between the desired resources and the last
//! snapshot. The reconciler executes it with [`crate::Reconciler::apply`].

use crate::model::DesiredResource;
use crate::state::StateSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Represents a planned action for one storage resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Type of action to perform
    pub action_type: ActionType,

    /// Resource name
    pub name: String,

    /// Description of the action
    pub description: String,

    /// Desired definition (absent for deletions)
    pub resource: Option<DesiredResource>,
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Re-apply tags on an existing resource
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

/// Plan containing all actions to be applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// List of actions, desired resources first in caller order, then deletions
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
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

    /// Diff desired resources against the previous snapshot
    ///
    /// Unknown names are created, known names whose tags changed are updated,
    /// snapshot items no longer desired are deleted.
    pub fn diff(desired: &[DesiredResource], previous: Option<&StateSnapshot>) -> Self {
        let mut actions = Vec::new();

        for resource in desired {
            let (action_type, description) = match previous.and_then(|s| s.get(&resource.name)) {
                None => (
                    ActionType::Create,
                    format!("create {} with tags \"{}\"", resource.name, resource.tags),
                ),
                Some(existing) if existing.tags != resource.tags => (
                    ActionType::Update,
                    format!(
                        "update tags of {}: \"{}\" -> \"{}\"",
                        resource.name, existing.tags, resource.tags
                    ),
                ),
                Some(_) => (
                    ActionType::NoOp,
                    format!("{} is up to date", resource.name),
                ),
            };

            actions.push(Action {
                action_type,
                name: resource.name.clone(),
                description,
                resource: Some(resource.clone()),
            });
        }

        if let Some(previous) = previous {
            let wanted: HashSet<&str> = desired.iter().map(|r| r.name.as_str()).collect();
            for name in previous.names().filter(|name| !wanted.contains(name)) {
                actions.push(Action {
                    action_type: ActionType::Delete,
                    name: name.to_string(),
                    description: format!("delete {}", name),
                    resource: None,
                });
            }
        }

        Self::new(actions)
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Desired resources of all actions of the given type, in plan order
    pub fn resources_for(&self, action_type: ActionType) -> Vec<DesiredResource> {
        self.actions_by_type(action_type)
            .into_iter()
            .filter_map(|a| a.resource.clone())
            .collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone, PartialEq, Eq)]
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
