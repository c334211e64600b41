//! Step lookup over a workflow's state table.
//!
//! A [`Step`] is a resolved view of one rule, addressed by its position in the
//! table. These functions are pure: they only read the workflow.

use std::collections::BTreeSet;
use std::iter::Enumerate;
use std::slice;

use flowdesk_store::{Fields, Instance};
use flowdesk_workflow::{FieldSpec, TransitionRule, Workflow};
use serde::Serialize;

use crate::error::EngineError;

/// One rule of a workflow, as offered to an actor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
  pub index: usize,
  /// `None` for creation steps.
  pub from_state: Option<String>,
  pub role: String,
  pub to_state: String,
  pub fields: Vec<FieldSpec>,
}

impl Step {
  fn from_rule(index: usize, rule: &TransitionRule) -> Self {
    Self {
      index,
      from_state: rule.from_state.clone(),
      role: rule.role.clone(),
      to_state: rule.to_state.clone(),
      fields: rule.fields.clone(),
    }
  }

  pub fn is_create(&self) -> bool {
    self.from_state.is_none()
  }

  /// Check supplied values against this step's fields.
  ///
  /// Every supplied name must be one of the step's fields, and every required
  /// field must be present and not null.
  pub fn check_fields(&self, values: &Fields) -> Result<(), EngineError> {
    if let Some(field) = values
      .keys()
      .find(|name| !self.fields.iter().any(|f| f.name == **name))
    {
      return Err(EngineError::InvalidField {
        field: field.clone(),
        step_index: self.index,
      });
    }

    for field in self.fields.iter().filter(|f| f.required) {
      if values.get(&field.name).is_none_or(|v| v.is_null()) {
        return Err(EngineError::MissingField {
          field: field.name.clone(),
          step_index: self.index,
        });
      }
    }

    Ok(())
  }
}

/// Get the step at a position in the workflow's table.
pub fn step_by_index(workflow: &Workflow, index: usize) -> Result<Step, EngineError> {
  workflow
    .rule(index)
    .map(|rule| Step::from_rule(index, rule))
    .ok_or_else(|| EngineError::OutOfRange {
      entity_type: workflow.entity_type().to_string(),
      index,
      len: workflow.rules().len(),
    })
}

/// Lazily yields the steps `role` may take from `state`, in table order.
///
/// `state` is `None` for a record that does not exist yet.
pub fn steps<'a>(workflow: &'a Workflow, state: Option<&'a str>, role: &'a str) -> Steps<'a> {
  Steps {
    rules: workflow.rules().iter().enumerate(),
    state,
    role,
  }
}

/// Iterator returned by [`steps`].
#[derive(Debug, Clone)]
pub struct Steps<'a> {
  rules: Enumerate<slice::Iter<'a, TransitionRule>>,
  state: Option<&'a str>,
  role: &'a str,
}

impl Iterator for Steps<'_> {
  type Item = Step;

  fn next(&mut self) -> Option<Step> {
    let (state, role) = (self.state, self.role);
    self
      .rules
      .find(|(_, rule)| rule.matches(state, role))
      .map(|(index, rule)| Step::from_rule(index, rule))
  }
}

/// Roles holding at least one creation rule.
///
/// A workflow nobody can create yields an empty set.
pub fn create_roles(workflow: &Workflow) -> BTreeSet<&str> {
  workflow
    .rules()
    .iter()
    .filter(|rule| rule.is_create())
    .map(|rule| rule.role.as_str())
    .collect()
}

/// Steps `role` may take on `instance` right now.
pub fn current_steps(workflow: &Workflow, instance: &Instance, role: &str) -> Vec<Step> {
  steps(workflow, instance.state.as_deref(), role).collect()
}

/// Fail with [`EngineError::NoLegalStep`] when `steps` is empty.
pub fn require_steps(
  workflow: &Workflow,
  state: Option<&str>,
  role: &str,
  steps: Vec<Step>,
) -> Result<Vec<Step>, EngineError> {
  if steps.is_empty() {
    return Err(EngineError::NoLegalStep {
      entity_type: workflow.entity_type().to_string(),
      state: state.map(str::to_string),
      role: role.to_string(),
    });
  }
  Ok(steps)
}

#[cfg(test)]
mod tests {
  use super::*;
  use flowdesk_config::{FieldDef, RuleDef, WorkflowDef};
  use serde_json::json;

  fn income() -> Workflow {
    let mut rules = vec![
      RuleDef::new(None, "organizer", Some("init"), &["event", "sponsor", "category"]),
      RuleDef::new(Some("init"), "admin", Some("have-invoice"), &["invoice"]),
      RuleDef::new(
        Some("have-invoice"),
        "organizer",
        Some("ready-to-payment"),
        &["ready_to_payment"],
      ),
      RuleDef::new(Some("ready-to-payment"), "admin", None, &["payment_done"]),
      RuleDef::new(
        Some("ready-to-payment"),
        "admin",
        Some("partial-payment"),
        &["payments_received"],
      ),
      RuleDef::new(
        Some("partial-payment"),
        "organizer",
        Some("ready-to-payment"),
        &[],
      ),
    ];
    rules[5].fields.push(FieldDef::Spec {
      name: "extra_docs".to_string(),
      required: false,
    });

    Workflow::from_def(WorkflowDef {
      entity_type: "Income".to_string(),
      description: None,
      states: [
        "init",
        "have-invoice",
        "ready-to-payment",
        "payment-done",
        "partial-payment",
      ]
      .iter()
      .map(|s| s.to_string())
      .collect(),
      roles: vec!["organizer".to_string(), "admin".to_string()],
      final_state: "payment-done".to_string(),
      always_new: false,
      creators: None,
      rules,
    })
    .unwrap()
  }

  fn indices(steps: impl Iterator<Item = Step>) -> Vec<usize> {
    steps.map(|s| s.index).collect()
  }

  #[test]
  fn test_step_by_index() {
    let workflow = income();

    let step = step_by_index(&workflow, 4).unwrap();
    assert_eq!(step.index, 4);
    assert_eq!(step.from_state.as_deref(), Some("ready-to-payment"));
    assert_eq!(step.role, "admin");
    assert_eq!(step.to_state, "partial-payment");

    let err = step_by_index(&workflow, 6).unwrap_err();
    assert!(matches!(err, EngineError::OutOfRange { index: 6, len: 6, .. }));
  }

  #[test]
  fn test_steps_filters_by_state_and_role() {
    let workflow = income();

    assert_eq!(indices(steps(&workflow, None, "organizer")), vec![0]);
    assert!(steps(&workflow, None, "admin").next().is_none());
    assert_eq!(
      indices(steps(&workflow, Some("ready-to-payment"), "admin")),
      vec![3, 4]
    );
    // Same state, other role
    assert!(
      steps(&workflow, Some("ready-to-payment"), "organizer")
        .next()
        .is_none()
    );
    assert!(steps(&workflow, Some("unknown"), "admin").next().is_none());
  }

  #[test]
  fn test_steps_match_reconstruction_from_indices() {
    let workflow = income();
    let all: Vec<Step> = (0..workflow.rules().len())
      .map(|i| step_by_index(&workflow, i).unwrap())
      .collect();

    let mut states: Vec<Option<&str>> = vec![None];
    states.extend(workflow.states().iter().map(|s| Some(s.as_str())));

    for state in states {
      for role in workflow.roles() {
        let rebuilt: Vec<Step> = all
          .iter()
          .filter(|s| s.from_state.as_deref() == state && s.role == *role)
          .cloned()
          .collect();
        let direct: Vec<Step> = steps(&workflow, state, role).collect();
        assert_eq!(rebuilt, direct, "state {state:?} role {role}");
      }
    }
  }

  #[test]
  fn test_final_state_has_no_steps() {
    let workflow = income();
    for role in workflow.roles() {
      assert!(steps(&workflow, Some("payment-done"), role).next().is_none());
    }
  }

  #[test]
  fn test_create_roles() {
    let workflow = income();
    assert_eq!(create_roles(&workflow), BTreeSet::from(["organizer"]));
  }

  #[test]
  fn test_check_fields() {
    let workflow = income();
    let create = step_by_index(&workflow, 0).unwrap();

    let mut values = Fields::new();
    values.insert("event".to_string(), json!(1));
    values.insert("sponsor".to_string(), json!(2));
    assert!(matches!(
      create.check_fields(&values),
      Err(EngineError::MissingField { field, .. }) if field == "category"
    ));

    values.insert("category".to_string(), json!(null));
    assert!(matches!(
      create.check_fields(&values),
      Err(EngineError::MissingField { field, .. }) if field == "category"
    ));

    values.insert("category".to_string(), json!(3));
    assert!(create.check_fields(&values).is_ok());

    values.insert("invoice".to_string(), json!(4));
    assert!(matches!(
      create.check_fields(&values),
      Err(EngineError::InvalidField { field, step_index: 0 }) if field == "invoice"
    ));

    let optional = step_by_index(&workflow, 5).unwrap();
    assert!(optional.check_fields(&Fields::new()).is_ok());
  }

  #[test]
  fn test_require_steps() {
    let workflow = income();
    let found: Vec<Step> = steps(&workflow, Some("init"), "organizer").collect();

    let err = require_steps(&workflow, Some("init"), "organizer", found).unwrap_err();
    assert!(matches!(err, EngineError::NoLegalStep { role, .. } if role == "organizer"));
  }
}
