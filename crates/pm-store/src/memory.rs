// memory.rs - In-process repository.
//
// All tables sit behind a single mutex, so every check-then-write runs as
// one critical section. Rows are kept in insertion order.

use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use pm_goal::{Feedback, Goal, GoalStatus, Task};
use pm_identity::User;

use crate::error::StoreError;
use crate::repository::{self, Repository, TaskState};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    goals: Vec<Goal>,
    tasks: Vec<Task>,
    feedback: Vec<Feedback>,
}

impl Tables {
    fn goal_mut(&mut self, goal_id: Uuid) -> Result<&mut Goal, StoreError> {
        self.goals
            .iter_mut()
            .find(|g| g.goal_id == goal_id)
            .ok_or_else(|| StoreError::not_found("goal", goal_id))
    }

    fn goal(&self, goal_id: Uuid) -> Result<&Goal, StoreError> {
        self.goals
            .iter()
            .find(|g| g.goal_id == goal_id)
            .ok_or_else(|| StoreError::not_found("goal", goal_id))
    }
}

/// A repository that lives only as long as the process.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl Repository for MemoryRepository {
    fn insert_user(&self, user: &User) -> Result<User, StoreError> {
        let mut t = self.lock()?;
        repository::check_new_user(&t.users, user)?;
        t.users.push(user.clone());
        Ok(user.clone())
    }

    fn user(&self, user_id: Uuid) -> Result<User, StoreError> {
        self.lock()?
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", user_id))
    }

    fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    fn users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.lock()?.users.clone())
    }

    fn update_credential(
        &self,
        user_id: Uuid,
        expected_hash: &str,
        new_hash: &str,
    ) -> Result<User, StoreError> {
        let mut t = self.lock()?;
        let user = t
            .users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or_else(|| StoreError::not_found("user", user_id))?;
        repository::check_credential(user, expected_hash)?;
        user.credential_hash = new_hash.to_string();
        Ok(user.clone())
    }

    fn insert_goal(&self, goal: &Goal) -> Result<Goal, StoreError> {
        let mut t = self.lock()?;
        if t.goals.iter().any(|g| g.goal_id == goal.goal_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "goal id {} already exists",
                goal.goal_id
            )));
        }
        let employee = t.users.iter().find(|u| u.user_id == goal.employee_id);
        repository::check_goal_link(employee, goal)?;
        t.goals.push(goal.clone());
        Ok(goal.clone())
    }

    fn goal(&self, goal_id: Uuid) -> Result<Goal, StoreError> {
        self.lock()?.goal(goal_id).cloned()
    }

    fn goals_for_manager(&self, manager_id: Uuid) -> Result<Vec<Goal>, StoreError> {
        Ok(self
            .lock()?
            .goals
            .iter()
            .filter(|g| g.manager_id == manager_id)
            .cloned()
            .collect())
    }

    fn goals_for_employee(&self, employee_id: Uuid) -> Result<Vec<Goal>, StoreError> {
        Ok(self
            .lock()?
            .goals
            .iter()
            .filter(|g| g.employee_id == employee_id)
            .cloned()
            .collect())
    }

    fn update_goal(&self, goal: &Goal, expected: GoalStatus) -> Result<Goal, StoreError> {
        let mut t = self.lock()?;
        let stored = t.goal_mut(goal.goal_id)?;
        repository::check_goal_status(stored, expected)?;
        *stored = goal.clone();
        Ok(goal.clone())
    }

    fn insert_task(&self, task: &Task, goal_status: GoalStatus) -> Result<Task, StoreError> {
        let mut t = self.lock()?;
        repository::check_goal_status(t.goal(task.goal_id)?, goal_status)?;
        if t.tasks.iter().any(|x| x.task_id == task.task_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "task id {} already exists",
                task.task_id
            )));
        }
        t.tasks.push(task.clone());
        Ok(task.clone())
    }

    fn task(&self, task_id: Uuid) -> Result<Task, StoreError> {
        self.lock()?
            .tasks
            .iter()
            .find(|x| x.task_id == task_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("task", task_id))
    }

    fn tasks_for_goal(&self, goal_id: Uuid) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .lock()?
            .tasks
            .iter()
            .filter(|x| x.goal_id == goal_id)
            .cloned()
            .collect())
    }

    fn update_task(
        &self,
        task: &Task,
        expected: TaskState,
        goal_status: GoalStatus,
    ) -> Result<Task, StoreError> {
        let mut t = self.lock()?;
        repository::check_goal_status(t.goal(task.goal_id)?, goal_status)?;
        let stored = t
            .tasks
            .iter_mut()
            .find(|x| x.task_id == task.task_id)
            .ok_or_else(|| StoreError::not_found("task", task.task_id))?;
        repository::check_task_state(stored, expected)?;
        *stored = task.clone();
        Ok(task.clone())
    }

    fn append_feedback(&self, feedback: &Feedback) -> Result<Feedback, StoreError> {
        let mut t = self.lock()?;
        t.goal(feedback.goal_id)?;
        t.feedback.push(feedback.clone());
        Ok(feedback.clone())
    }

    fn feedback_for_goal(&self, goal_id: Uuid) -> Result<Vec<Feedback>, StoreError> {
        Ok(self
            .lock()?
            .feedback
            .iter()
            .filter(|f| f.goal_id == goal_id)
            .cloned()
            .collect())
    }
}
