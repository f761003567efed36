//! # pm-service
//!
//! The operations of the performance tracker and the views built from them.
//!
//! [`Tracker`] is the only entry point a presentation layer needs. Every call
//! takes an explicit [`Actor`](pm_identity::Actor), re-resolves it against
//! the store, asks the policy engine, runs the lifecycle rule, and only then
//! issues a conditional write. Failures come back as one [`TrackerError`].

pub mod config;
pub mod error;
pub mod tracker;
pub mod views;

pub use config::{ConfigError, TrackerConfig};
pub use error::TrackerError;
pub use tracker::{with_retry, NewGoal, Tracker};
pub use views::{EmployeeDashboard, EmployeeGoals, GoalView, ManagerDashboard};
