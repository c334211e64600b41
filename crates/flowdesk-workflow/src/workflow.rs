use std::collections::{BTreeSet, HashSet};

use flowdesk_config::WorkflowDef;
use serde::Serialize;

use crate::error::WorkflowError;
use crate::rule::{FieldSpec, TransitionRule};

/// A locked workflow: the validated state table of one entity type.
///
/// Immutable once built. Rule order is significant; a rule's position is the
/// step index callers use to address it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workflow {
  entity_type: String,
  description: Option<String>,
  states: Vec<String>,
  roles: Vec<String>,
  final_state: String,
  always_new: bool,
  rules: Vec<TransitionRule>,
}

impl Workflow {
  /// Validate a definition and lock it.
  pub fn from_def(def: WorkflowDef) -> Result<Self, WorkflowError> {
    let mut seen = HashSet::new();
    for state in &def.states {
      if !seen.insert(state.as_str()) {
        return Err(WorkflowError::DuplicateState(state.clone()));
      }
    }
    let mut seen = HashSet::new();
    for role in &def.roles {
      if !seen.insert(role.as_str()) {
        return Err(WorkflowError::DuplicateRole(role.clone()));
      }
    }

    let check_state = |state: &str| {
      if def.states.iter().any(|s| s == state) {
        Ok(())
      } else {
        Err(WorkflowError::UnknownState {
          entity_type: def.entity_type.clone(),
          state: state.to_string(),
        })
      }
    };

    check_state(&def.final_state)?;

    let mut rules = Vec::with_capacity(def.rules.len());
    for (index, rule) in def.rules.iter().enumerate() {
      if let Some(from) = &rule.from {
        check_state(from)?;
        if *from == def.final_state {
          return Err(WorkflowError::RuleFromFinalState {
            index,
            state: from.clone(),
          });
        }
      }
      if !def.roles.iter().any(|r| *r == rule.role) {
        return Err(WorkflowError::UnknownRole {
          entity_type: def.entity_type.clone(),
          role: rule.role.clone(),
        });
      }
      let to_state = rule.to.clone().unwrap_or_else(|| def.final_state.clone());
      check_state(&to_state)?;

      let mut fields: Vec<FieldSpec> = Vec::with_capacity(rule.fields.len());
      for field in &rule.fields {
        if fields.iter().any(|f| f.name == field.name()) {
          return Err(WorkflowError::DuplicateField {
            index,
            field: field.name().to_string(),
          });
        }
        fields.push(FieldSpec {
          name: field.name().to_string(),
          required: field.required(),
        });
      }

      rules.push(TransitionRule {
        from_state: rule.from.clone(),
        role: rule.role.clone(),
        to_state,
        fields,
      });
    }

    for (index, rule) in rules.iter().enumerate() {
      let has_exit = rules
        .iter()
        .any(|r| r.from_state.as_deref() == Some(rule.to_state.as_str()));
      if rule.to_state != def.final_state && !has_exit {
        return Err(WorkflowError::DeadEndState {
          index,
          state: rule.to_state.clone(),
        });
      }
    }

    if let Some(declared) = &def.creators {
      let declared: BTreeSet<&str> = declared.iter().map(String::as_str).collect();
      let actual: BTreeSet<&str> = rules
        .iter()
        .filter(|r| r.is_create())
        .map(|r| r.role.as_str())
        .collect();
      if declared != actual {
        return Err(WorkflowError::CreatorsMismatch {
          declared: declared.into_iter().map(str::to_string).collect(),
          actual: actual.into_iter().map(str::to_string).collect(),
        });
      }
    }

    Ok(Self {
      entity_type: def.entity_type,
      description: def.description,
      states: def.states,
      roles: def.roles,
      final_state: def.final_state,
      always_new: def.always_new,
      rules,
    })
  }

  pub fn entity_type(&self) -> &str {
    &self.entity_type
  }

  pub fn description(&self) -> Option<&str> {
    self.description.as_deref()
  }

  /// The ordered state table.
  pub fn rules(&self) -> &[TransitionRule] {
    &self.rules
  }

  /// Get a rule by its position in the table.
  pub fn rule(&self, index: usize) -> Option<&TransitionRule> {
    self.rules.get(index)
  }

  /// The terminal state. No role can act on a record in this state.
  pub fn final_state(&self) -> &str {
    &self.final_state
  }

  pub fn is_final(&self, state: Option<&str>) -> bool {
    state == Some(self.final_state.as_str())
  }

  pub fn states(&self) -> &[String] {
    &self.states
  }

  pub fn roles(&self) -> &[String] {
    &self.roles
  }

  /// Whether each transition writes a fresh record instead of updating in place.
  pub fn always_new(&self) -> bool {
    self.always_new
  }
}

impl TryFrom<WorkflowDef> for Workflow {
  type Error = WorkflowError;

  fn try_from(def: WorkflowDef) -> Result<Self, Self::Error> {
    Self::from_def(def)
  }
}
