//! Plans, actions and apply results

use crate::data::{Record, ResourceData};
use crate::diagnostics::Diagnostics;
use crate::state::ResourceStatus;
use serde::{Deserialize, Serialize};

/// One planned step for a resource address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// `<type>-<address>`, unique within a plan
    pub id: String,
    pub action_type: ActionType,
    /// e.g. `aliyun_fc_trigger`
    pub kind: String,
    /// `kind.name`
    pub address: String,
    /// Human-readable line for plan output
    pub description: String,

    /// Fields whose desired value differs from the observed one
    pub changed_fields: Vec<String>,

    /// Desired record (absent for deletes)
    pub desired: Option<Record>,

    /// Observed data including the stored identity (absent for creates)
    pub prior: Option<ResourceData>,
}

/// What the reconciler will do to one address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Create,
    /// In-place update of mutable fields
    Update,
    /// Delete followed by create, forced by an immutable field
    Replace,
    Delete,
    NoOp,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
            Self::NoOp => "no-op",
        }
    }

    /// Whether applying this action touches the control plane
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoOp)
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`crate::Reconciler::apply`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyResult {
    pub succeeded: Vec<ActionResult>,
    pub failed: Vec<ActionResult>,
    /// Wall-clock time of the whole apply
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, action: &Action, status: ResourceStatus, message: String) {
        self.succeeded.push(ActionResult {
            message,
            ..ActionResult::blank(action, status, true)
        });
    }

    pub fn add_failure(&mut self, action: &Action, status: ResourceStatus, diagnostics: Diagnostics) {
        self.failed.push(ActionResult {
            diagnostics,
            ..ActionResult::blank(action, status, false)
        });
    }

    /// Diagnostics of every failed action, in apply order
    pub fn diagnostics(&self) -> Diagnostics {
        self.failed
            .iter()
            .fold(Diagnostics::new(), |mut all, result| {
                all.extend(result.diagnostics.clone());
                all
            })
    }
}

/// How one action ended
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_id: String,
    pub address: String,
    pub success: bool,
    /// Lifecycle state the resource ended in
    pub status: ResourceStatus,
    pub message: String,
    /// Empty on success
    pub diagnostics: Diagnostics,
}

impl ActionResult {
    fn blank(action: &Action, status: ResourceStatus, success: bool) -> Self {
        Self {
            action_id: action.id.clone(),
            address: action.address.clone(),
            success,
            status,
            message: String::new(),
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Ordered actions computed by [`crate::Reconciler::plan`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<Action>,
    /// True when any action is not a no-op
    pub has_changes: bool,
    /// Warnings raised while refreshing prior state
    pub diagnostics: Diagnostics,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        Self {
            has_changes: actions.iter().any(|action| action.action_type.is_change()),
            actions,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|action| action.action_type == action_type)
            .collect()
    }

    pub fn action_for(&self, address: &str) -> Option<&Action> {
        self.actions.iter().find(|action| action.address == address)
    }

    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for action in &self.actions {
            let slot = match action.action_type {
                ActionType::Create => &mut summary.create,
                ActionType::Update => &mut summary.update,
                ActionType::Replace => &mut summary.replace,
                ActionType::Delete => &mut summary.delete,
                ActionType::NoOp => &mut summary.no_change,
            };
            *slot += 1;
        }
        summary
    }
}

/// Per-type action counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to replace, {} to delete, {} unchanged",
            self.create, self.update, self.replace, self.delete, self.no_change
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(address: &str, action_type: ActionType) -> Action {
        Action {
            id: format!("{}-{}", action_type, address),
            action_type,
            kind: "aliyun_dcdn_domain".to_string(),
            address: address.to_string(),
            description: String::new(),
            changed_fields: Vec::new(),
            desired: None,
            prior: None,
        }
    }

    #[test]
    fn test_plan_summary() {
        let plan = Plan::new(vec![
            action("aliyun_dcdn_domain.a", ActionType::Create),
            action("aliyun_dcdn_domain.b", ActionType::Replace),
            action("aliyun_dcdn_domain.c", ActionType::NoOp),
        ]);

        assert!(plan.has_changes);
        assert_eq!(
            plan.summary().to_string(),
            "1 to create, 0 to update, 1 to replace, 0 to delete, 1 unchanged"
        );
        assert!(plan.action_for("aliyun_dcdn_domain.b").is_some());
    }

    #[test]
    fn test_noop_plan_has_no_changes() {
        let plan = Plan::new(vec![action("aliyun_dcdn_domain.a", ActionType::NoOp)]);
        assert!(!plan.has_changes);
        assert!(!Plan::empty().has_changes);
    }
}
