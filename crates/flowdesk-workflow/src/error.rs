use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("state '{state}' is not declared by entity type '{entity_type}'")]
  UnknownState { entity_type: String, state: String },

  #[error("role '{role}' is not declared by entity type '{entity_type}'")]
  UnknownRole { entity_type: String, role: String },

  #[error("state '{0}' is declared more than once")]
  DuplicateState(String),

  #[error("role '{0}' is declared more than once")]
  DuplicateRole(String),

  #[error("rule {index} lists field '{field}' more than once")]
  DuplicateField { index: usize, field: String },

  #[error("rule {index} leaves the final state '{state}'")]
  RuleFromFinalState { index: usize, state: String },

  #[error("rule {index} leads to '{state}', which is not final and has no outgoing rule")]
  DeadEndState { index: usize, state: String },

  #[error("declared creators {declared:?} do not match creation rules {actual:?}")]
  CreatorsMismatch {
    declared: Vec<String>,
    actual: Vec<String>,
  },
}
