// user.rs - User records, roles, and the request-scoped actor.
//
// The manager/employee hierarchy is a single stored link: an employee's
// `manager_id`. Nothing re-derives it from lists at render time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::credential;
use crate::error::IdentityError;

/// The two roles a user can hold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Sets goals, reviews tasks, writes feedback.
    Manager,
    /// Owns goals, proposes tasks, reports progress.
    Employee,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Manager => write!(f, "manager"),
            Role::Employee => write!(f, "employee"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manager" => Ok(Role::Manager),
            "employee" => Ok(Role::Employee),
            other => Err(format!(
                "unknown role '{}' (expected 'manager' or 'employee')",
                other
            )),
        }
    }
}

/// A provisioned account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier for this user.
    pub user_id: Uuid,

    /// Login name (unique across the store).
    pub username: String,

    /// Name used for ordering and rendering. Defaults to the username.
    pub display_name: String,

    /// argon2 PHC string. Never the plaintext credential.
    pub credential_hash: String,

    pub role: Role,

    /// The employee's manager. Always `None` for managers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

impl User {
    /// Provision a manager account.
    pub fn new_manager(username: &str, credential: &str) -> Result<Self, IdentityError> {
        Self::build(username, credential, Role::Manager, None)
    }

    /// Provision an employee reporting to `manager`.
    ///
    /// Fails with [`IdentityError::NotAManager`] if `manager` is not a manager.
    pub fn new_employee(
        username: &str,
        credential: &str,
        manager: &User,
    ) -> Result<Self, IdentityError> {
        if manager.role != Role::Manager {
            return Err(IdentityError::NotAManager {
                username: manager.username.clone(),
            });
        }
        Self::build(username, credential, Role::Employee, Some(manager.user_id))
    }

    fn build(
        username: &str,
        credential: &str,
        role: Role,
        manager_id: Option<Uuid>,
    ) -> Result<Self, IdentityError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(IdentityError::EmptyUsername);
        }
        let user = Self {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            display_name: username.to_string(),
            credential_hash: credential::hash_credential(credential)?,
            role,
            manager_id,
            created_at: Utc::now(),
        };
        user.check_manager_link()?;
        Ok(user)
    }

    /// Set a display name other than the username.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        let name = display_name.into();
        if !name.trim().is_empty() {
            self.display_name = name.trim().to_string();
        }
        self
    }

    /// Check the role/manager-link shape of this record on its own.
    ///
    /// Whether `manager_id` points at an actual manager needs the store and
    /// is checked there.
    pub fn check_manager_link(&self) -> Result<(), IdentityError> {
        match (self.role, self.manager_id) {
            (Role::Manager, None) | (Role::Employee, Some(_)) => Ok(()),
            (Role::Manager, Some(_)) => Err(IdentityError::ManagerHasManager {
                username: self.username.clone(),
            }),
            (Role::Employee, None) => Err(IdentityError::MissingManager {
                username: self.username.clone(),
            }),
        }
    }

    /// Constant-time check of a candidate credential.
    pub fn verify_credential(&self, candidate: &str) -> bool {
        credential::verify_credential(candidate, &self.credential_hash)
    }

    /// Replace the stored hash. The only mutation a user record allows.
    pub fn rotate_credential(&mut self, new_credential: &str) -> Result<(), IdentityError> {
        self.credential_hash = credential::hash_credential(new_credential)?;
        Ok(())
    }

    /// The user without the credential hash, for views and listings.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            user_id: self.user_id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            role: self.role,
            manager_id: self.manager_id,
        }
    }

    /// The request-scoped identity for this user.
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// Public view of a user. Carries no credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<Uuid>,
}

/// Who is making a request. Passed explicitly into every tracker call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.username, self.role)
    }
}
