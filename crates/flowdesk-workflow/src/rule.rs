use serde::{Deserialize, Serialize};

/// A field an actor may supply while firing a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
  pub name: String,
  pub required: bool,
}

/// A validated row of a workflow's state table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRule {
  /// `None` for rules that create a record.
  pub from_state: Option<String>,
  pub role: String,
  /// Always a declared state; "done" has been resolved to the final state.
  pub to_state: String,
  pub fields: Vec<FieldSpec>,
}

impl TransitionRule {
  pub fn is_create(&self) -> bool {
    self.from_state.is_none()
  }

  /// Whether the rule is offered to `role` for a record in `state`.
  pub fn matches(&self, state: Option<&str>, role: &str) -> bool {
    self.from_state.as_deref() == state && self.role == role
  }

  pub fn field(&self, name: &str) -> Option<&FieldSpec> {
    self.fields.iter().find(|f| f.name == name)
  }

  pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
    self.fields.iter().filter(|f| f.required)
  }
}
