// feedback.rs - Manager commentary attached to a goal.
//
// Feedback is append-only: there is no update or delete anywhere in the
// system. Fields are set once in `Feedback::new`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LifecycleError;
use crate::goal::Goal;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub feedback_id: Uuid,
    pub goal_id: Uuid,
    /// The manager who wrote it. Always the goal's manager.
    pub manager_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    /// Write feedback on `goal` as its manager.
    ///
    /// Feedback is accepted on closed goals too; a review after completion
    /// is still commentary on the goal.
    pub fn new(goal: &Goal, text: &str) -> Result<Self, LifecycleError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(LifecycleError::Validation {
                field: "text",
                reason: "feedback must not be empty".to_string(),
            });
        }
        Ok(Self {
            feedback_id: Uuid::new_v4(),
            goal_id: goal.goal_id,
            manager_id: goal.manager_id,
            text: text.to_string(),
            created_at: Utc::now(),
        })
    }
}
