//! Registry of workflows keyed by entity type.
//!
//! Every entity type the application knows about is registered here
//! explicitly, at startup, from its definition.

use std::collections::BTreeMap;
use std::path::Path;

use flowdesk_config::WorkflowDef;
use flowdesk_workflow::Workflow;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::step::create_roles;

/// Locked workflows keyed by entity type name.
#[derive(Debug, Clone, Default)]
pub struct WorkflowRegistry {
  workflows: BTreeMap<String, Workflow>,
}

impl WorkflowRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Validate and register each definition.
  pub fn from_defs(defs: impl IntoIterator<Item = WorkflowDef>) -> Result<Self, EngineError> {
    let mut registry = Self::new();
    for def in defs {
      registry.register(Workflow::from_def(def)?)?;
    }
    Ok(registry)
  }

  /// Load every `*.json` definition in a directory, in file name order.
  pub async fn load_dir(dir: impl AsRef<Path>) -> Result<Self, EngineError> {
    let dir = dir.as_ref();
    let read_err = |source| EngineError::ReadDefinition {
      path: dir.to_path_buf(),
      source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_err)?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
      let path = entry.path();
      if path.extension().is_some_and(|ext| ext == "json") {
        paths.push(path);
      }
    }
    paths.sort();

    let mut defs = Vec::with_capacity(paths.len());
    for path in paths {
      let content =
        tokio::fs::read_to_string(&path)
          .await
          .map_err(|source| EngineError::ReadDefinition {
            path: path.clone(),
            source,
          })?;
      let def: WorkflowDef =
        serde_json::from_str(&content).map_err(|source| EngineError::ParseDefinition {
          path: path.clone(),
          source,
        })?;
      defs.push(def);
    }

    Self::from_defs(defs)
  }

  /// Register a locked workflow.
  pub fn register(&mut self, workflow: Workflow) -> Result<(), EngineError> {
    let entity_type = workflow.entity_type().to_string();
    if self.workflows.contains_key(&entity_type) {
      return Err(EngineError::DuplicateEntityType(entity_type));
    }

    if create_roles(&workflow).is_empty() {
      warn!(entity_type = %entity_type, "workflow has no creation rule; no role can create it");
    }
    info!(
      entity_type = %entity_type,
      rules = workflow.rules().len(),
      final_state = %workflow.final_state(),
      "workflow registered"
    );

    self.workflows.insert(entity_type, workflow);
    Ok(())
  }

  /// Get the workflow of an entity type.
  pub fn get(&self, entity_type: &str) -> Result<&Workflow, EngineError> {
    self
      .workflows
      .get(entity_type)
      .ok_or_else(|| EngineError::UnknownEntityType(entity_type.to_string()))
  }

  pub fn contains(&self, entity_type: &str) -> bool {
    self.workflows.contains_key(entity_type)
  }

  /// Workflows whose records `role` is allowed to create.
  pub fn creatable_by<'a>(&'a self, role: &'a str) -> impl Iterator<Item = &'a Workflow> + 'a {
    self
      .workflows
      .values()
      .filter(move |workflow| create_roles(workflow).contains(role))
  }

  /// All workflows, ordered by entity type.
  pub fn iter(&self) -> impl Iterator<Item = &Workflow> {
    self.workflows.values()
  }

  pub fn len(&self) -> usize {
    self.workflows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.workflows.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use flowdesk_config::RuleDef;

  fn def(entity_type: &str, creator: Option<&str>) -> WorkflowDef {
    let mut rules = vec![RuleDef::new(Some("open"), "admin", None, &[])];
    if let Some(role) = creator {
      rules.insert(0, RuleDef::new(None, role, Some("open"), &["name"]));
    }
    WorkflowDef {
      entity_type: entity_type.to_string(),
      description: None,
      states: vec!["open".to_string(), "closed".to_string()],
      roles: vec!["organizer".to_string(), "admin".to_string()],
      final_state: "closed".to_string(),
      always_new: false,
      creators: None,
      rules,
    }
  }

  #[test]
  fn test_register_and_get() {
    let registry = WorkflowRegistry::from_defs([def("Income", Some("organizer"))]).unwrap();

    assert_eq!(registry.len(), 1);
    assert!(registry.contains("Income"));
    assert_eq!(registry.get("Income").unwrap().final_state(), "closed");
    assert!(matches!(
      registry.get("Refund"),
      Err(EngineError::UnknownEntityType(name)) if name == "Refund"
    ));
  }

  #[test]
  fn test_duplicate_entity_type() {
    let result = WorkflowRegistry::from_defs([
      def("Income", Some("organizer")),
      def("Income", Some("admin")),
    ]);
    assert!(matches!(result, Err(EngineError::DuplicateEntityType(name)) if name == "Income"));
  }

  #[test]
  fn test_invalid_definition_is_rejected() {
    let mut bad = def("Income", Some("organizer"));
    bad.final_state = "archived".to_string();

    let result = WorkflowRegistry::from_defs([bad]);
    assert!(matches!(result, Err(EngineError::Workflow(_))));
  }

  #[test]
  fn test_creatable_by() {
    let registry = WorkflowRegistry::from_defs([
      def("Income", Some("organizer")),
      def("Invoice", Some("admin")),
      def("Report", None),
    ])
    .unwrap();

    let names = |role: &str| -> Vec<String> {
      registry
        .creatable_by(role)
        .map(|w| w.entity_type().to_string())
        .collect()
    };
    assert_eq!(names("organizer"), vec!["Income"]);
    assert_eq!(names("admin"), vec!["Invoice"]);
    assert!(names("sponsor").is_empty());
  }

  #[tokio::test]
  async fn test_load_dir() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    std::fs::write(
      dir.path().join("income.json"),
      serde_json::to_string(&def("Income", Some("organizer"))).unwrap(),
    )
    .unwrap();
    std::fs::write(dir.path().join("README.md"), "not a definition").unwrap();

    let registry = WorkflowRegistry::load_dir(dir.path()).await.unwrap();
    assert_eq!(registry.len(), 1);
    assert!(registry.contains("Income"));
  }

  #[tokio::test]
  async fn test_load_dir_reports_bad_json() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

    let err = WorkflowRegistry::load_dir(dir.path()).await.unwrap_err();
    assert!(matches!(
      err,
      EngineError::ParseDefinition { path, .. } if path.ends_with("broken.json")
    ));
  }
}
