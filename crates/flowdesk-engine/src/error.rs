//! Engine errors.

use std::path::PathBuf;

use flowdesk_workflow::WorkflowError;

/// Errors that can occur while querying or advancing workflows.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  /// Step index is not a position in the workflow's table.
  #[error("step {index} is out of range for '{entity_type}' ({len} steps)")]
  OutOfRange {
    entity_type: String,
    index: usize,
    len: usize,
  },

  /// The caller needed at least one legal step and there is none.
  #[error("role '{role}' has nothing to do on '{entity_type}' in state {state:?}")]
  NoLegalStep {
    entity_type: String,
    state: Option<String>,
    role: String,
  },

  /// The instance is not (or no longer) in the state the step starts from.
  #[error("instance {instance_id:?} expected state {expected:?} but found {actual:?}")]
  StaleState {
    instance_id: Option<String>,
    expected: Option<String>,
    actual: Option<String>,
  },

  /// A supplied field is not editable in this step.
  #[error("field '{field}' cannot be set by step {step_index}")]
  InvalidField { field: String, step_index: usize },

  /// A required field of this step was not supplied.
  #[error("field '{field}' is required by step {step_index}")]
  MissingField { field: String, step_index: usize },

  /// The acting role is not responsible for this step.
  #[error("role '{role}' may not fire step {step_index}")]
  NotPermitted { role: String, step_index: usize },

  #[error("unknown entity type '{0}'")]
  UnknownEntityType(String),

  #[error("entity type '{0}' is already registered")]
  DuplicateEntityType(String),

  #[error("instance '{instance_id}' of '{entity_type}' not found")]
  InstanceNotFound {
    entity_type: String,
    instance_id: String,
  },

  #[error("invalid workflow definition")]
  Workflow(#[from] WorkflowError),

  #[error("failed to read workflow definition {path}")]
  ReadDefinition {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse workflow definition {path}")]
  ParseDefinition {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("storage error")]
  Store(#[source] flowdesk_store::Error),
}
