// goal.rs - A performance objective a manager sets for an employee.
//
// The state machine:
//   Draft → InProgress → Completed
//   Draft | InProgress → Cancelled
// Completed and Cancelled are terminal.
//
// `manager_id` is captured when the goal is created and never re-derived.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LifecycleError;

/// The lifecycle status of a goal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// Set by the manager, work has not started.
    Draft,
    /// Work toward the goal is under way.
    InProgress,
    /// The goal was met.
    Completed,
    /// The goal was withdrawn.
    Cancelled,
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalStatus::Draft => write!(f, "draft"),
            GoalStatus::InProgress => write!(f, "in_progress"),
            GoalStatus::Completed => write!(f, "completed"),
            GoalStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for GoalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "draft" => Ok(GoalStatus::Draft),
            "in_progress" => Ok(GoalStatus::InProgress),
            "completed" => Ok(GoalStatus::Completed),
            "cancelled" | "canceled" => Ok(GoalStatus::Cancelled),
            other => Err(format!("unknown goal status '{}'", other)),
        }
    }
}

impl GoalStatus {
    /// Completed and Cancelled accept no further transitions or work.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GoalStatus::Completed | GoalStatus::Cancelled)
    }

    /// Check whether moving from this status to `next` is an edge of the machine.
    pub fn can_transition_to(&self, next: GoalStatus) -> bool {
        if next == GoalStatus::Cancelled {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (GoalStatus::Draft, GoalStatus::InProgress)
                | (GoalStatus::InProgress, GoalStatus::Completed)
        )
    }
}

/// A goal owned by one manager and assigned to one employee.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    pub goal_id: Uuid,

    /// The employee working toward this goal.
    pub employee_id: Uuid,

    /// The manager who set the goal (captured at creation).
    pub manager_id: Uuid,

    pub title: String,

    #[serde(default)]
    pub description: String,

    pub due_date: NaiveDate,

    pub status: GoalStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Goal {
    /// Create a new goal in the Draft state.
    ///
    /// The caller is responsible for checking that `manager_id` is the
    /// employee's current manager.
    pub fn new(
        employee_id: Uuid,
        manager_id: Uuid,
        title: &str,
        description: &str,
        due_date: NaiveDate,
    ) -> Result<Self, LifecycleError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(LifecycleError::required("title"));
        }
        let now = Utc::now();
        Ok(Self {
            goal_id: Uuid::new_v4(),
            employee_id,
            manager_id,
            title: title.to_string(),
            description: description.trim().to_string(),
            due_date,
            status: GoalStatus::Draft,
            created_at: now,
            updated_at: now,
        })
    }

    /// Move to `next`. Returns an error if the edge does not exist.
    pub fn transition(&mut self, next: GoalStatus) -> Result<(), LifecycleError> {
        if !self.status.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                entity: "goal",
                id: self.goal_id,
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Fail with [`LifecycleError::GoalClosed`] if the goal is terminal.
    pub fn ensure_open(&self) -> Result<(), LifecycleError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(LifecycleError::GoalClosed {
                goal_id: self.goal_id,
                status: self.status.to_string(),
            })
        }
    }
}
