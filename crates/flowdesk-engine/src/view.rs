//! What a front-end needs to render a record for one role.

use std::fmt;

use flowdesk_store::{Fields, Instance};
use flowdesk_workflow::Workflow;
use serde::Serialize;

use crate::step::{Step, current_steps, steps};

/// Where a filled-in step is submitted: `(entity type, instance, step)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitTarget {
  pub entity_type: String,
  /// `None` when the step creates the record.
  pub instance_id: Option<String>,
  pub step_index: usize,
}

impl fmt::Display for SubmitTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.instance_id {
      Some(id) => write!(f, "flow/{}/{}/{}", self.entity_type, id, self.step_index),
      None => write!(f, "flow/{}/{}", self.entity_type, self.step_index),
    }
  }
}

/// A legal step and where to submit it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionView {
  pub step: Step,
  pub target: SubmitTarget,
}

/// A record as seen by one role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceView {
  pub entity_type: String,
  pub instance_id: Option<String>,
  pub state: Option<String>,
  pub terminal: bool,
  /// Set when the record was replaced by a newer one; such a record offers no steps.
  pub superseded_by: Option<String>,
  /// Values filled in so far; nulls are left out.
  pub fields: Fields,
  pub actions: Vec<ActionView>,
}

impl InstanceView {
  /// View of an existing record.
  pub fn of_instance(workflow: &Workflow, instance: &Instance, role: &str) -> Self {
    let actions = actions(
      workflow.entity_type(),
      Some(&instance.instance_id),
      current_steps(workflow, instance, role),
    );

    Self {
      entity_type: workflow.entity_type().to_string(),
      instance_id: Some(instance.instance_id.clone()),
      state: instance.state.clone(),
      terminal: workflow.is_final(instance.state.as_deref()),
      superseded_by: None,
      fields: instance
        .fields
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect(),
      actions,
    }
  }

  /// View of a record that does not exist yet: the creation steps open to `role`.
  pub fn of_new(workflow: &Workflow, role: &str) -> Self {
    Self {
      entity_type: workflow.entity_type().to_string(),
      instance_id: None,
      state: None,
      terminal: false,
      superseded_by: None,
      fields: Fields::new(),
      actions: actions(workflow.entity_type(), None, steps(workflow, None, role).collect()),
    }
  }

  /// Mark the record as replaced by `successor`, dropping its actions.
  pub fn replaced_by(mut self, successor: String) -> Self {
    self.actions.clear();
    self.superseded_by = Some(successor);
    self
  }
}

fn actions(entity_type: &str, instance_id: Option<&String>, steps: Vec<Step>) -> Vec<ActionView> {
  steps
    .into_iter()
    .map(|step| ActionView {
      target: SubmitTarget {
        entity_type: entity_type.to_string(),
        instance_id: instance_id.cloned(),
        step_index: step.index,
      },
      step,
    })
    .collect()
}
