// engine.rs - Authorization policy evaluation.
//
// Every request passes through `evaluate_with_trace()`, which checks:
//
// 1. Does the action apply to this kind of resource? → No → Deny
// 2. Does the actor's role hold the action at all? → No → Deny
// 3. Is the actor the party the resource names for this action? → No → Deny
// 4. → Allow
//
// Task review state (e.g. progress only on approved tasks) is a lifecycle
// rule, not an actor rule, and is enforced by `pm_goal::Task`.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pm_goal::{Goal, Task};
use pm_identity::{Actor, Role, User};

use crate::error::PolicyError;

/// Everything a caller can ask the tracker to do.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CreateGoal,
    ChangeGoalStatus,
    CreateTask,
    ReviewTask,
    UpdateTaskProgress,
    AddFeedback,
    /// Read a goal, its tasks, or its feedback.
    View,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::CreateGoal => "create goal",
            Action::ChangeGoalStatus => "change goal status",
            Action::CreateTask => "create task",
            Action::ReviewTask => "review task",
            Action::UpdateTaskProgress => "update task progress",
            Action::AddFeedback => "add feedback",
            Action::View => "view",
        };
        write!(f, "{}", s)
    }
}

/// The facts about a target the policy needs. Built from stored records,
/// never from caller input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    /// A user who would receive a new goal.
    Employee {
        user_id: Uuid,
        role: Role,
        manager_id: Option<Uuid>,
    },
    /// A goal, or its feedback.
    Goal {
        goal_id: Uuid,
        employee_id: Uuid,
        manager_id: Uuid,
    },
    /// A task together with its parent goal's parties.
    Task {
        task_id: Uuid,
        goal_id: Uuid,
        employee_id: Uuid,
        manager_id: Uuid,
    },
}

impl Resource {
    pub fn employee(user: &User) -> Self {
        Resource::Employee {
            user_id: user.user_id,
            role: user.role,
            manager_id: user.manager_id,
        }
    }

    pub fn goal(goal: &Goal) -> Self {
        Resource::Goal {
            goal_id: goal.goal_id,
            employee_id: goal.employee_id,
            manager_id: goal.manager_id,
        }
    }

    pub fn task(task: &Task, parent: &Goal) -> Self {
        Resource::Task {
            task_id: task.task_id,
            goal_id: parent.goal_id,
            employee_id: parent.employee_id,
            manager_id: parent.manager_id,
        }
    }

    fn describe(&self) -> String {
        match self {
            Resource::Employee { user_id, .. } => format!("user {}", user_id),
            Resource::Goal { goal_id, .. } => format!("goal {}", goal_id),
            Resource::Task { task_id, .. } => format!("task {}", task_id),
        }
    }
}

/// A request to perform an action: submitted to the policy engine for evaluation.
#[derive(Debug, Clone)]
pub struct PolicyRequest {
    pub actor: Actor,
    pub action: Action,
    pub resource: Resource,
}

impl PolicyRequest {
    pub fn new(actor: &Actor, action: Action, resource: Resource) -> Self {
        Self {
            actor: actor.clone(),
            action,
            resource,
        }
    }
}

/// The result of a policy evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PolicyDecision {
    Allow,
    Deny { reason: String },
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PolicyDecision::Allow)
    }
}

/// One check in the evaluation chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationStep {
    /// Which check was performed (e.g., "applicability", "role_grant").
    pub check: String,
    /// The outcome of this check (e.g., "passed", "failed: not the goal's manager").
    pub outcome: String,
    /// Whether this step was the terminal decision point.
    pub terminal: bool,
}

/// Full evaluation trace returned alongside a PolicyDecision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationTrace {
    pub decision: PolicyDecision,
    pub steps: Vec<EvaluationStep>,
}

impl EvaluationTrace {
    fn new() -> Self {
        Self {
            decision: PolicyDecision::Allow,
            steps: Vec::new(),
        }
    }

    fn pass(&mut self, check: &str) {
        self.steps.push(EvaluationStep {
            check: check.to_string(),
            outcome: "passed".to_string(),
            terminal: false,
        });
    }

    fn deny(mut self, check: &str, reason: String) -> Self {
        self.steps.push(EvaluationStep {
            check: check.to_string(),
            outcome: format!("failed: {}", reason),
            terminal: true,
        });
        self.decision = PolicyDecision::Deny { reason };
        self
    }

    fn allow(mut self) -> Self {
        self.steps.push(EvaluationStep {
            check: "decision".to_string(),
            outcome: "allowed".to_string(),
            terminal: true,
        });
        self.decision = PolicyDecision::Allow;
        self
    }
}

/// The policy engine. Holds no state: every fact it needs is on the request.
#[derive(Debug, Clone, Copy)]
pub struct PolicyEngine;

impl PolicyEngine {
    pub fn new() -> Self {
        PolicyEngine
    }

    /// Evaluate a request and return a decision.
    pub fn evaluate(&self, request: &PolicyRequest) -> PolicyDecision {
        self.evaluate_with_trace(request).decision
    }

    /// Evaluate a request and record every check performed.
    pub fn evaluate_with_trace(&self, request: &PolicyRequest) -> EvaluationTrace {
        let mut trace = EvaluationTrace::new();
        let actor = &request.actor;
        let action = request.action;

        // Step 1: the action must make sense for the resource kind.
        if !applies_to(action, &request.resource) {
            return trace.deny(
                "applicability",
                format!("'{}' does not apply to {}", action, request.resource.describe()),
            );
        }
        trace.pass("applicability");

        // Step 2: the role must hold the action.
        if !role_permits(actor.role, action) {
            return trace.deny(
                "role_grant",
                format!("role '{}' cannot {}", actor.role, action),
            );
        }
        trace.pass("role_grant");

        // Step 3: the actor must be the party named on the resource.
        if let Err(reason) = check_relationship(actor.user_id, action, &request.resource) {
            return trace.deny("relationship", reason);
        }
        trace.pass("relationship");

        trace.allow()
    }

    /// Evaluate and turn a denial into a [`PolicyError`].
    ///
    /// This is the single chokepoint the tracker calls before acting.
    pub fn authorize(&self, request: &PolicyRequest) -> Result<(), PolicyError> {
        let trace = self.evaluate_with_trace(request);
        tracing::debug!(
            actor = %request.actor,
            action = %request.action,
            steps = ?trace.steps,
            "policy evaluated"
        );
        match trace.decision {
            PolicyDecision::Allow => Ok(()),
            PolicyDecision::Deny { reason } => {
                tracing::warn!(
                    actor = %request.actor,
                    action = %request.action,
                    "policy denied: {}",
                    reason
                );
                Err(PolicyError::Denied {
                    actor: request.actor.to_string(),
                    action: request.action,
                    reason,
                })
            }
        }
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Which resource kinds each action targets.
fn applies_to(action: Action, resource: &Resource) -> bool {
    match action {
        Action::CreateGoal => matches!(resource, Resource::Employee { .. }),
        Action::ChangeGoalStatus | Action::CreateTask | Action::AddFeedback => {
            matches!(resource, Resource::Goal { .. })
        }
        Action::ReviewTask | Action::UpdateTaskProgress => {
            matches!(resource, Resource::Task { .. })
        }
        Action::View => matches!(resource, Resource::Goal { .. } | Resource::Task { .. }),
    }
}

/// Role grants. Managers direct and review; employees propose and report.
fn role_permits(role: Role, action: Action) -> bool {
    match role {
        Role::Manager => match action {
            Action::CreateGoal
            | Action::ChangeGoalStatus
            | Action::ReviewTask
            | Action::AddFeedback
            | Action::View => true,
            Action::CreateTask | Action::UpdateTaskProgress => false,
        },
        Role::Employee => match action {
            Action::CreateTask | Action::UpdateTaskProgress | Action::View => true,
            Action::CreateGoal
            | Action::ChangeGoalStatus
            | Action::ReviewTask
            | Action::AddFeedback => false,
        },
    }
}

fn check_relationship(actor_id: Uuid, action: Action, resource: &Resource) -> Result<(), String> {
    match resource {
        Resource::Employee {
            role, manager_id, ..
        } => match (role, manager_id) {
            (Role::Employee, Some(m)) if *m == actor_id => Ok(()),
            (Role::Employee, _) => Err("not this employee's manager".to_string()),
            (Role::Manager, _) => Err("goals can only be set for employees".to_string()),
        },
        Resource::Goal {
            employee_id,
            manager_id,
            ..
        }
        | Resource::Task {
            employee_id,
            manager_id,
            ..
        } => {
            let ok = match action {
                Action::ChangeGoalStatus | Action::ReviewTask | Action::AddFeedback => {
                    *manager_id == actor_id
                }
                Action::CreateTask | Action::UpdateTaskProgress => *employee_id == actor_id,
                Action::View => *manager_id == actor_id || *employee_id == actor_id,
                Action::CreateGoal => false,
            };
            if ok {
                Ok(())
            } else {
                Err(match action {
                    Action::CreateTask | Action::UpdateTaskProgress => {
                        "not the goal's employee".to_string()
                    }
                    Action::View => "not a party to this goal".to_string(),
                    _ => "not the goal's manager".to_string(),
                })
            }
        }
    }
}
