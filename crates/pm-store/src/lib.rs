//! # pm-store
//!
//! The persistence boundary of the performance tracker.
//!
//! The tracker never issues raw queries; it calls the typed operations of
//! the [`Repository`] trait. Every state-changing update is a
//! compare-and-set against the state the caller observed, so a concurrent
//! writer surfaces as [`StoreError::StaleWrite`] instead of a lost update.
//!
//! ## Implementations
//!
//! - [`MemoryRepository`]: process-local tables behind one mutex
//! - [`JsonFileRepository`]: one JSON file per user/goal/task, plus a
//!   hash-chained [`FeedbackLog`] for the append-only feedback history.
//!   Writes hold an exclusive `flock` on a lock file, so several processes
//!   can share one store directory.

pub mod error;
pub mod feedback_log;
mod flock;
pub mod hasher;
pub mod json;
pub mod memory;
pub mod repository;

pub use error::StoreError;
pub use feedback_log::{FeedbackEntry, FeedbackLog};
pub use json::JsonFileRepository;
pub use memory::MemoryRepository;
pub use repository::{Repository, TaskState};
