//! Flowdesk Workflow
//!
//! This crate provides the "locked" workflow representation for Flowdesk.
//! A locked workflow is a validated form of a workflow definition that is
//! ready to be queried by the engine.
//!
//! Key differences from `flowdesk-config`:
//! - States and roles referenced by rules are checked against the declared sets
//! - The "done" sentinel is resolved to the final state
//! - Every target state either is final or has a way out
//! - Field lists are duplicate free and carry their `required` flag

mod error;
mod rule;
mod workflow;

pub use error::WorkflowError;
pub use rule::{FieldSpec, TransitionRule};
pub use workflow::Workflow;
