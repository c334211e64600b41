use serde::{Deserialize, Serialize};

/// A field a rule lets the actor fill in.
///
/// Written either as a bare name or as an object carrying metadata:
///
/// ```json
/// ["invoice", { "name": "extra_docs", "required": false }]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldDef {
  Name(String),
  Spec {
    name: String,
    #[serde(default = "default_required")]
    required: bool,
  },
}

fn default_required() -> bool {
  true
}

impl FieldDef {
  pub fn name(&self) -> &str {
    match self {
      FieldDef::Name(name) => name,
      FieldDef::Spec { name, .. } => name,
    }
  }

  /// Bare names are required.
  pub fn required(&self) -> bool {
    match self {
      FieldDef::Name(_) => true,
      FieldDef::Spec { required, .. } => *required,
    }
  }
}

impl From<&str> for FieldDef {
  fn from(name: &str) -> Self {
    FieldDef::Name(name.to_string())
  }
}
