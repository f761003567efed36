// error.rs - Error types for the policy subsystem.

use thiserror::Error;

use crate::engine::Action;

/// Errors returned by [`PolicyEngine::authorize`](crate::PolicyEngine::authorize).
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The actor may not perform the action on the resource.
    #[error("{actor} may not {action}: {reason}")]
    Denied {
        actor: String,
        action: Action,
        reason: String,
    },
}
