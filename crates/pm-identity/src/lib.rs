//! # pm-identity
//!
//! Users, roles, and credentials for the performance tracker.
//!
//! A [`User`] is either a [`Role::Manager`] or a [`Role::Employee`]; an
//! employee always points at exactly one manager through `manager_id`.
//! Requests into the tracker carry an explicit [`Actor`] (who is calling),
//! never an ambient session.
//!
//! ## Key invariants
//!
//! - **Closed roles**: role is an enum, every check site matches it exhaustively.
//! - **Manager link**: an employee's manager must have role = manager; a
//!   manager has no manager.
//! - **Hashed credentials**: only argon2 PHC strings are stored, and
//!   verification is constant-time.

pub mod credential;
pub mod error;
pub mod user;

pub use credential::{hash_credential, verify_credential, verify_unknown_user};
pub use error::IdentityError;
pub use user::{Actor, Role, User, UserProfile};
