//! Flowdesk Workflow Engine
//!
//! This crate runs state-table workflows: each entity type declares which
//! role moves a record out of which state, which fields it fills in doing
//! so, and the state reached next.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WorkflowEngine                         │
//! │  - current_steps(type, instance, role) → legal steps        │
//! │  - apply_transition(type, instance, step, role, fields)     │
//! │  - view / create_options / open_work for front-ends         │
//! └─────────────────────────────────────────────────────────────┘
//!          │                    │                     │
//!          ▼                    ▼                     ▼
//! ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────┐
//! │ WorkflowRegistry │ │      Store       │ │    Notifier      │
//! │ type → Workflow  │ │ load / CAS write │ │ TransitionEvent  │
//! └──────────────────┘ └──────────────────┘ └──────────────────┘
//! ```
//!
//! The step functions in [`step`] are pure and work on a single
//! [`Workflow`](flowdesk_workflow::Workflow); the engine adds loading,
//! re-validation, persistence and notification around them.
//!
//! # Usage
//!
//! ```ignore
//! use flowdesk_engine::{WorkflowEngine, WorkflowRegistry};
//! use flowdesk_store::MemoryStore;
//!
//! let registry = WorkflowRegistry::load_dir("workflows").await?;
//! let engine = WorkflowEngine::new(registry, MemoryStore::new());
//!
//! let income = engine.create("Income", 0, "organizer", fields).await?;
//! let steps = engine
//!   .current_steps("Income", Some(&income.instance_id), "admin")
//!   .await?;
//! ```

mod engine;
mod error;
mod events;
mod registry;
pub mod step;
mod view;

pub use engine::WorkflowEngine;
pub use error::EngineError;
pub use events::{ChannelNotifier, LogNotifier, NoopNotifier, TransitionEvent, TransitionNotifier};
pub use registry::WorkflowRegistry;
pub use step::{
  Step, Steps, create_roles, current_steps, require_steps, step_by_index, steps,
};
pub use view::{ActionView, InstanceView, SubmitTarget};
