// repository.rs - The typed persistence contract.
//
// Each operation either returns the affected record(s) or one of
// NotFound / ConstraintViolation / StaleWrite. Conditional writes take the
// state the caller observed; the implementation checks it and writes inside
// one critical section, so a write is all-or-nothing.

use std::fmt;

use uuid::Uuid;

use pm_goal::{Feedback, Goal, GoalStatus, Task, TaskProgress, TaskStatus};
use pm_identity::{Role, User};

use crate::error::StoreError;

/// The review/progress pair a task update is conditioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskState {
    pub status: TaskStatus,
    pub progress: TaskProgress,
}

impl From<&Task> for TaskState {
    fn from(task: &Task) -> Self {
        Self {
            status: task.status,
            progress: task.progress,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.status, self.progress)
    }
}

/// Persistence operations the tracker relies on.
///
/// Implementations must be safe to share across threads.
pub trait Repository: Send + Sync {
    /// Insert a new user. Usernames are unique (case-insensitive) and an
    /// employee's manager must exist with the manager role.
    fn insert_user(&self, user: &User) -> Result<User, StoreError>;

    fn user(&self, user_id: Uuid) -> Result<User, StoreError>;

    fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    fn users(&self) -> Result<Vec<User>, StoreError>;

    /// Replace a user's credential hash if it still equals `expected_hash`.
    fn update_credential(
        &self,
        user_id: Uuid,
        expected_hash: &str,
        new_hash: &str,
    ) -> Result<User, StoreError>;

    /// Insert a goal. Its employee must exist, hold the employee role, and
    /// currently report to `goal.manager_id`.
    fn insert_goal(&self, goal: &Goal) -> Result<Goal, StoreError>;

    fn goal(&self, goal_id: Uuid) -> Result<Goal, StoreError>;

    /// Goals set by `manager_id`, oldest first.
    fn goals_for_manager(&self, manager_id: Uuid) -> Result<Vec<Goal>, StoreError>;

    /// Goals assigned to `employee_id`, oldest first.
    fn goals_for_employee(&self, employee_id: Uuid) -> Result<Vec<Goal>, StoreError>;

    /// Store `goal` if the stored status is still `expected`.
    fn update_goal(&self, goal: &Goal, expected: GoalStatus) -> Result<Goal, StoreError>;

    /// Insert a task if its goal's stored status is still `goal_status`.
    fn insert_task(&self, task: &Task, goal_status: GoalStatus) -> Result<Task, StoreError>;

    fn task(&self, task_id: Uuid) -> Result<Task, StoreError>;

    /// Tasks under `goal_id`, oldest first.
    fn tasks_for_goal(&self, goal_id: Uuid) -> Result<Vec<Task>, StoreError>;

    /// Store `task` if both the stored task state and its goal's status are
    /// still what the caller observed.
    fn update_task(
        &self,
        task: &Task,
        expected: TaskState,
        goal_status: GoalStatus,
    ) -> Result<Task, StoreError>;

    /// Append feedback to an existing goal. There is no update or delete.
    fn append_feedback(&self, feedback: &Feedback) -> Result<Feedback, StoreError>;

    /// Feedback on `goal_id` in append order.
    fn feedback_for_goal(&self, goal_id: Uuid) -> Result<Vec<Feedback>, StoreError>;
}

/// Checks shared by every implementation, run inside the write lock.
pub(crate) fn check_new_user<'a>(
    existing: impl IntoIterator<Item = &'a User>,
    user: &User,
) -> Result<(), StoreError> {
    user.check_manager_link()
        .map_err(|e| StoreError::ConstraintViolation(e.to_string()))?;

    let mut manager_ok = user.manager_id.is_none();
    for other in existing {
        if other.user_id == user.user_id {
            return Err(StoreError::ConstraintViolation(format!(
                "user id {} already exists",
                user.user_id
            )));
        }
        if other.username.eq_ignore_ascii_case(&user.username) {
            return Err(StoreError::ConstraintViolation(format!(
                "username '{}' is taken",
                user.username
            )));
        }
        if Some(other.user_id) == user.manager_id {
            if other.role != Role::Manager {
                return Err(StoreError::ConstraintViolation(format!(
                    "user '{}' is not a manager",
                    other.username
                )));
            }
            manager_ok = true;
        }
    }
    if !manager_ok {
        // check_manager_link guarantees manager_id is Some here.
        let id = user.manager_id.map(|m| m.to_string()).unwrap_or_default();
        return Err(StoreError::not_found("manager", id));
    }
    Ok(())
}

pub(crate) fn check_goal_link(employee: Option<&User>, goal: &Goal) -> Result<(), StoreError> {
    let employee = employee.ok_or_else(|| StoreError::not_found("user", goal.employee_id))?;
    if employee.role != Role::Employee {
        return Err(StoreError::ConstraintViolation(format!(
            "goals can only be assigned to employees; '{}' is a {}",
            employee.username, employee.role
        )));
    }
    if employee.manager_id != Some(goal.manager_id) {
        return Err(StoreError::ConstraintViolation(format!(
            "goal manager {} is not the current manager of '{}'",
            goal.manager_id, employee.username
        )));
    }
    Ok(())
}

pub(crate) fn check_goal_status(stored: &Goal, expected: GoalStatus) -> Result<(), StoreError> {
    if stored.status != expected {
        return Err(StoreError::StaleWrite {
            entity: "goal",
            id: stored.goal_id.to_string(),
            expected: expected.to_string(),
            actual: stored.status.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn check_task_state(stored: &Task, expected: TaskState) -> Result<(), StoreError> {
    let actual = TaskState::from(stored);
    if actual != expected {
        return Err(StoreError::StaleWrite {
            entity: "task",
            id: stored.task_id.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn check_credential(stored: &User, expected_hash: &str) -> Result<(), StoreError> {
    if stored.credential_hash != expected_hash {
        return Err(StoreError::StaleWrite {
            entity: "user",
            id: stored.user_id.to_string(),
            expected: "unchanged credential".to_string(),
            actual: "rotated credential".to_string(),
        });
    }
    Ok(())
}
