// error.rs - Error types for the goal/task/feedback lifecycles.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by lifecycle state machines and event sinks.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The requested status or progress move is not an edge of the machine.
    #[error("invalid transition from {from} to {to} for {entity} {id}")]
    InvalidTransition {
        entity: &'static str,
        id: Uuid,
        from: String,
        to: String,
    },

    /// The goal is completed or cancelled and accepts no new work.
    #[error("goal {goal_id} is {status} and accepts no further changes")]
    GoalClosed { goal_id: Uuid, status: String },

    /// A required field is missing or malformed.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// A file I/O operation failed (event sinks).
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    /// Failed to serialize an event.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl LifecycleError {
    pub(crate) fn required(field: &'static str) -> Self {
        LifecycleError::Validation {
            field,
            reason: "must not be empty".to_string(),
        }
    }
}
