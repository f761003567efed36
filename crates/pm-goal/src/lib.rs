//! # pm-goal
//!
//! Goal, task, and feedback lifecycles for the performance tracker.
//!
//! Each entity carries its own state machine and refuses illegal moves with
//! a [`LifecycleError`]. Who is *allowed* to make a move is decided
//! elsewhere (`pm-policy`); this crate only decides whether the move itself
//! is legal.
//!
//! ## Key components
//!
//! - [`Goal`]: `Draft → InProgress → Completed`, or `Cancelled` from any
//!   non-terminal state
//! - [`Task`]: review status (`Pending → Approved | Rejected`) and a
//!   monotonic progress track (`NotStarted → InProgress → Completed`)
//! - [`Feedback`]: append-only manager commentary
//! - [`PmEvent`] / [`EventDispatcher`]: lifecycle notifications to sinks

pub mod error;
pub mod events;
pub mod feedback;
pub mod goal;
pub mod task;

pub use error::LifecycleError;
pub use events::{EventDispatcher, LogSink, NotificationSink, PmEvent};
pub use feedback::Feedback;
pub use goal::{Goal, GoalStatus};
pub use task::{ReviewDecision, Task, TaskProgress, TaskStatus};
