// error.rs - The error taxonomy every tracker operation reports.
//
// Lower crates have their own error enums; this module folds them into the
// eight kinds a presentation layer has to handle.

use thiserror::Error;
use uuid::Uuid;

use pm_goal::LifecycleError;
use pm_identity::IdentityError;
use pm_policy::PolicyError;
use pm_store::StoreError;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// Unknown username or wrong credential. Deliberately not told apart.
    #[error("invalid username or credential")]
    InvalidCredentials,

    /// The actor lacks rights for the action.
    #[error("not authorized: {reason}")]
    Authorization { reason: String },

    /// The requested status or progress move is not allowed from the current state.
    #[error("cannot move {entity} {id} from {from} to {to}")]
    InvalidStateTransition {
        entity: &'static str,
        id: Uuid,
        from: String,
        to: String,
    },

    /// The goal is completed or cancelled.
    #[error("goal {goal_id} is {status} and accepts no new tasks")]
    GoalClosed { goal_id: Uuid, status: String },

    /// A required field is missing or malformed.
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Someone else changed the record after it was read. Refetch and retry.
    #[error("{entity} {id} was changed concurrently; refresh and try again")]
    ConcurrentModification { entity: &'static str, id: String },

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The storage layer failed. Surfaced as-is.
    #[error("storage failure: {0}")]
    Persistence(#[source] StoreError),
}

impl TrackerError {
    /// Only concurrent modifications are safe to retry after a refetch.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TrackerError::ConcurrentModification { .. })
    }

    /// Stable short name for each kind.
    pub fn kind(&self) -> &'static str {
        match self {
            TrackerError::InvalidCredentials => "invalid_credentials",
            TrackerError::Authorization { .. } => "authorization",
            TrackerError::InvalidStateTransition { .. } => "invalid_state_transition",
            TrackerError::GoalClosed { .. } => "goal_closed",
            TrackerError::Validation { .. } => "validation",
            TrackerError::ConcurrentModification { .. } => "concurrent_modification",
            TrackerError::NotFound { .. } => "not_found",
            TrackerError::Persistence(_) => "persistence",
        }
    }

    pub(crate) fn unauthorized(reason: impl Into<String>) -> Self {
        TrackerError::Authorization {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        TrackerError::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for TrackerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => TrackerError::NotFound { entity, id },
            StoreError::StaleWrite { entity, id, .. } => {
                TrackerError::ConcurrentModification { entity, id }
            }
            StoreError::ConstraintViolation(reason) => TrackerError::Validation {
                field: "record".to_string(),
                reason,
            },
            other => TrackerError::Persistence(other),
        }
    }
}

impl From<LifecycleError> for TrackerError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::InvalidTransition {
                entity,
                id,
                from,
                to,
            } => TrackerError::InvalidStateTransition {
                entity,
                id,
                from,
                to,
            },
            LifecycleError::GoalClosed { goal_id, status } => {
                TrackerError::GoalClosed { goal_id, status }
            }
            LifecycleError::Validation { field, reason } => TrackerError::Validation {
                field: field.to_string(),
                reason,
            },
            LifecycleError::IoError { path, source } => {
                TrackerError::Persistence(StoreError::IoError {
                    path: path.into(),
                    source,
                })
            }
            LifecycleError::SerializationError(e) => {
                TrackerError::Persistence(StoreError::SerializationError(e))
            }
        }
    }
}

impl From<PolicyError> for TrackerError {
    fn from(e: PolicyError) -> Self {
        TrackerError::Authorization {
            reason: e.to_string(),
        }
    }
}

impl From<IdentityError> for TrackerError {
    fn from(e: IdentityError) -> Self {
        let field = match &e {
            IdentityError::EmptyUsername => "username",
            IdentityError::EmptyCredential | IdentityError::Hashing(_) => "credential",
            IdentityError::MissingManager { .. }
            | IdentityError::ManagerHasManager { .. }
            | IdentityError::NotAManager { .. } => "manager",
        };
        TrackerError::invalid(field, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_write_becomes_retryable_conflict() {
        let err: TrackerError = StoreError::StaleWrite {
            entity: "goal",
            id: "g-1".to_string(),
            expected: "in_progress".to_string(),
            actual: "cancelled".to_string(),
        }
        .into();
        assert!(err.is_retryable());
        assert_eq!(err.kind(), "concurrent_modification");
    }

    #[test]
    fn storage_failures_pass_through() {
        let err: TrackerError = StoreError::Poisoned.into();
        assert!(matches!(err, TrackerError::Persistence(StoreError::Poisoned)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn lifecycle_errors_map_to_distinct_kinds() {
        let id = Uuid::new_v4();
        let closed: TrackerError = LifecycleError::GoalClosed {
            goal_id: id,
            status: "completed".to_string(),
        }
        .into();
        assert_eq!(closed.kind(), "goal_closed");

        let bad_move: TrackerError = LifecycleError::InvalidTransition {
            entity: "task",
            id,
            from: "completed".to_string(),
            to: "in_progress".to_string(),
        }
        .into();
        assert_eq!(bad_move.kind(), "invalid_state_transition");
    }

    #[test]
    fn messages_are_distinct() {
        let errors = [
            TrackerError::InvalidCredentials,
            TrackerError::unauthorized("x"),
            TrackerError::invalid("title", "must not be empty"),
            TrackerError::NotFound {
                entity: "goal",
                id: "1".to_string(),
            },
        ];
        let messages: std::collections::HashSet<String> =
            errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(messages.len(), errors.len());
    }
}
