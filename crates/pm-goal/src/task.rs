// task.rs - A concrete action an employee proposes toward a goal.
//
// Two independent tracks:
//   status:   Pending → Approved | Rejected          (manager-owned, terminal)
//   progress: NotStarted → InProgress → Completed    (employee-owned, one step
//                                                     at a time, never backward)
// Progress only moves while status = Approved and the parent goal is open.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LifecycleError;
use crate::goal::Goal;

/// Manager review status of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Proposed by the employee, waiting for review.
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Approved => write!(f, "approved"),
            TaskStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Employee-reported completion stage of an approved task.
///
/// Variants are declared in order, so `Ord` follows the progress track.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskProgress {
    NotStarted,
    InProgress,
    Completed,
}

impl fmt::Display for TaskProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskProgress::NotStarted => write!(f, "not_started"),
            TaskProgress::InProgress => write!(f, "in_progress"),
            TaskProgress::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for TaskProgress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "not_started" => Ok(TaskProgress::NotStarted),
            "in_progress" => Ok(TaskProgress::InProgress),
            "completed" => Ok(TaskProgress::Completed),
            other => Err(format!("unknown task progress '{}'", other)),
        }
    }
}

impl TaskProgress {
    /// The single stage that may follow this one, if any.
    pub fn next(&self) -> Option<TaskProgress> {
        match self {
            TaskProgress::NotStarted => Some(TaskProgress::InProgress),
            TaskProgress::InProgress => Some(TaskProgress::Completed),
            TaskProgress::Completed => None,
        }
    }

    pub fn can_advance_to(&self, next: TaskProgress) -> bool {
        self.next() == Some(next)
    }
}

/// A manager's verdict on a pending task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    /// The status a pending task moves to under this decision.
    pub fn target_status(&self) -> TaskStatus {
        match self {
            ReviewDecision::Approve => TaskStatus::Approved,
            ReviewDecision::Reject => TaskStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub task_id: Uuid,

    /// The goal this task works toward.
    pub goal_id: Uuid,

    pub description: String,

    pub status: TaskStatus,

    pub progress: TaskProgress,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Propose a new task under `goal`. Starts Pending / NotStarted.
    ///
    /// Fails with [`LifecycleError::GoalClosed`] if the goal is terminal.
    pub fn new(goal: &Goal, description: &str) -> Result<Self, LifecycleError> {
        goal.ensure_open()?;
        let description = description.trim();
        if description.is_empty() {
            return Err(LifecycleError::required("description"));
        }
        let now = Utc::now();
        Ok(Self {
            task_id: Uuid::new_v4(),
            goal_id: goal.goal_id,
            description: description.to_string(),
            status: TaskStatus::Pending,
            progress: TaskProgress::NotStarted,
            created_at: now,
            updated_at: now,
        })
    }

    /// Approve or reject a pending task.
    pub fn review(&mut self, parent: &Goal, decision: ReviewDecision) -> Result<(), LifecycleError> {
        let target = decision.target_status();
        self.check_parent(parent)?;
        if !parent.is_open() || self.status != TaskStatus::Pending {
            return Err(self.invalid(self.status.to_string(), target.to_string()));
        }
        self.status = target;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Advance progress by exactly one stage.
    pub fn advance(&mut self, parent: &Goal, next: TaskProgress) -> Result<(), LifecycleError> {
        self.check_parent(parent)?;
        if !parent.is_open()
            || self.status != TaskStatus::Approved
            || !self.progress.can_advance_to(next)
        {
            return Err(self.invalid(self.progress.to_string(), next.to_string()));
        }
        self.progress = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn check_parent(&self, parent: &Goal) -> Result<(), LifecycleError> {
        if parent.goal_id != self.goal_id {
            return Err(LifecycleError::Validation {
                field: "goal_id",
                reason: format!(
                    "task {} belongs to goal {}, not {}",
                    self.task_id, self.goal_id, parent.goal_id
                ),
            });
        }
        Ok(())
    }

    fn invalid(&self, from: String, to: String) -> LifecycleError {
        LifecycleError::InvalidTransition {
            entity: "task",
            id: self.task_id,
            from,
            to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::GoalStatus;
    use chrono::NaiveDate;

    fn open_goal() -> Goal {
        Goal::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Reduce build times",
            "",
            NaiveDate::from_ymd_opt(2026, 11, 30).unwrap(),
        )
        .unwrap()
    }

    fn approved_task(goal: &Goal) -> Task {
        let mut t = Task::new(goal, "Cache dependencies in CI").unwrap();
        t.review(goal, ReviewDecision::Approve).unwrap();
        t
    }

    #[test]
    fn new_task_is_pending_and_not_started() {
        let g = open_goal();
        let t = Task::new(&g, "Profile the slowest crate").unwrap();
        assert_eq!(t.status, TaskStatus::Pending);
        assert_eq!(t.progress, TaskProgress::NotStarted);
        assert_eq!(t.goal_id, g.goal_id);
    }

    #[test]
    fn empty_description_rejected() {
        let g = open_goal();
        assert!(matches!(
            Task::new(&g, "   "),
            Err(LifecycleError::Validation { field: "description", .. })
        ));
    }

    #[test]
    fn cannot_create_under_terminal_goal() {
        let mut g = open_goal();
        g.transition(GoalStatus::Cancelled).unwrap();
        assert!(matches!(
            Task::new(&g, "Too late"),
            Err(LifecycleError::GoalClosed { .. })
        ));
    }

    #[test]
    fn review_is_one_shot() {
        let g = open_goal();
        let mut t = Task::new(&g, "Write RFC").unwrap();
        t.review(&g, ReviewDecision::Reject).unwrap();
        assert_eq!(t.status, TaskStatus::Rejected);
        assert!(matches!(
            t.review(&g, ReviewDecision::Approve),
            Err(LifecycleError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn review_under_closed_goal_fails() {
        let mut g = open_goal();
        let mut t = Task::new(&g, "Write RFC").unwrap();
        g.transition(GoalStatus::Cancelled).unwrap();
        assert!(matches!(
            t.review(&g, ReviewDecision::Approve),
            Err(LifecycleError::InvalidTransition { .. })
        ));
        assert_eq!(t.status, TaskStatus::Pending);
    }

    #[test]
    fn progress_follows_track() {
        let g = open_goal();
        let mut t = approved_task(&g);
        t.advance(&g, TaskProgress::InProgress).unwrap();
        t.advance(&g, TaskProgress::Completed).unwrap();
        assert_eq!(t.progress, TaskProgress::Completed);
    }

    #[test]
    fn progress_cannot_skip_or_regress() {
        let g = open_goal();
        let mut t = approved_task(&g);
        assert!(t.advance(&g, TaskProgress::Completed).is_err());
        assert!(t.advance(&g, TaskProgress::NotStarted).is_err());
        t.advance(&g, TaskProgress::InProgress).unwrap();
        assert!(t.advance(&g, TaskProgress::InProgress).is_err());
        assert!(t.advance(&g, TaskProgress::NotStarted).is_err());
        assert_eq!(t.progress, TaskProgress::InProgress);
    }

    #[test]
    fn pending_task_progress_is_locked() {
        let g = open_goal();
        let mut t = Task::new(&g, "Wait for approval").unwrap();
        assert!(matches!(
            t.advance(&g, TaskProgress::InProgress),
            Err(LifecycleError::InvalidTransition { .. })
        ));
        assert_eq!(t.progress, TaskProgress::NotStarted);
    }

    #[test]
    fn progress_locked_once_goal_closes() {
        let mut g = open_goal();
        let mut t = approved_task(&g);
        g.transition(GoalStatus::InProgress).unwrap();
        g.transition(GoalStatus::Completed).unwrap();
        assert!(t.advance(&g, TaskProgress::InProgress).is_err());
    }

    #[test]
    fn foreign_parent_rejected() {
        let g = open_goal();
        let other = open_goal();
        let mut t = Task::new(&g, "Mine").unwrap();
        assert!(matches!(
            t.review(&other, ReviewDecision::Approve),
            Err(LifecycleError::Validation { field: "goal_id", .. })
        ));
    }

    #[test]
    fn progress_parses_spaced_form() {
        assert_eq!("not started".parse::<TaskProgress>().unwrap(), TaskProgress::NotStarted);
        assert!(TaskProgress::NotStarted < TaskProgress::Completed);
        assert_eq!(TaskProgress::Completed.next(), None);
    }
}
