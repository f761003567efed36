//! # pm-policy
//!
//! Authorization policy for the performance tracker.
//!
//! Every mutation, and every read of goal-scoped data, passes through
//! [`PolicyEngine::authorize`] before anything is written. The engine answers
//! one question: may this [`Actor`](pm_identity::Actor) perform this
//! [`Action`] on this [`Resource`]?
//!
//! ## Key invariants
//!
//! - **Default deny**: an action that does not apply to the resource, or a
//!   role that does not hold the action, is denied.
//! - **Relationship bound**: holding the role is not enough; the actor must
//!   be the goal's manager (or employee) named on the resource itself.
//! - **Check before act**: the engine only reads; callers write after it allows.

pub mod engine;
pub mod error;

pub use engine::{
    Action, EvaluationStep, EvaluationTrace, PolicyDecision, PolicyEngine, PolicyRequest, Resource,
};
pub use error::PolicyError;
