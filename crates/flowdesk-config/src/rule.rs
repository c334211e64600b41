use serde::{Deserialize, Serialize};

use crate::field::FieldDef;

/// One row of a workflow's state table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDef {
  /// State the record must be in. `None` means the rule creates the record.
  #[serde(default)]
  pub from: Option<String>,
  /// Role that has to act for the rule to fire.
  pub role: String,
  /// State reached afterwards. `None` means "done": the workflow's final state.
  #[serde(default)]
  pub to: Option<String>,
  #[serde(default)]
  pub fields: Vec<FieldDef>,
}

impl RuleDef {
  pub fn new(from: Option<&str>, role: &str, to: Option<&str>, fields: &[&str]) -> Self {
    Self {
      from: from.map(str::to_string),
      role: role.to_string(),
      to: to.map(str::to_string),
      fields: fields.iter().map(|f| FieldDef::from(*f)).collect(),
    }
  }

  /// Whether firing this rule creates a new record.
  pub fn is_create(&self) -> bool {
    self.from.is_none()
  }
}
