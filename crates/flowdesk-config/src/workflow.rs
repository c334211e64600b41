use serde::{Deserialize, Serialize};

use crate::rule::RuleDef;

/// The state table for one entity type, as written in a definition file.
///
/// ```json
/// {
///   "entity_type": "Income",
///   "states": ["init", "have-invoice", "payment-done"],
///   "roles": ["organizer", "admin"],
///   "final_state": "payment-done",
///   "rules": [
///     { "from": null, "role": "organizer", "to": "init", "fields": ["event"] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  pub entity_type: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  /// Every state the entity type can be in.
  pub states: Vec<String>,
  /// Every role that appears in the rules.
  pub roles: Vec<String>,
  pub final_state: String,
  /// Records of this type are never updated in place: each transition
  /// writes a fresh record that supersedes the previous one.
  #[serde(default)]
  pub always_new: bool,
  /// Roles expected to own the creation rules. Checked against the rules
  /// when present.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub creators: Option<Vec<String>>,
  pub rules: Vec<RuleDef>,
}
