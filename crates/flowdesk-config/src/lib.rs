//! Flowdesk Config
//!
//! This crate contains the serializable workflow configuration types for Flowdesk.
//! A workflow definition is a state table for one entity type: which role may
//! move a record out of which state, which fields it may fill in while doing so,
//! and where the record lands afterwards.
//!
//! Configuration is loaded from JSON files (one file per entity type). The
//! `flowdesk-workflow` crate validates these definitions and turns them into
//! locked workflows the engine can run.

mod field;
mod rule;
mod workflow;

pub use field::FieldDef;
pub use rule::RuleDef;
pub use workflow::WorkflowDef;
