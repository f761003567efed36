// error.rs - Error types for user provisioning and credentials.

use thiserror::Error;

/// Errors raised while building or checking user records.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Usernames are the login key and cannot be blank.
    #[error("username must not be empty")]
    EmptyUsername,

    /// An empty credential would hash fine but is never accepted.
    #[error("credential must not be empty")]
    EmptyCredential,

    /// An employee was provisioned without a manager.
    #[error("employee '{username}' must be assigned a manager")]
    MissingManager { username: String },

    /// A manager was provisioned with a manager of their own.
    #[error("manager '{username}' cannot report to another user")]
    ManagerHasManager { username: String },

    /// The referenced manager does not have the manager role.
    #[error("user '{username}' is not a manager")]
    NotAManager { username: String },

    /// The argon2 hasher rejected its input.
    #[error("credential hashing failed: {0}")]
    Hashing(String),
}
