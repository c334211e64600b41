//! Workflow engine.
//!
//! The `WorkflowEngine` answers "what can this role do to this record right
//! now?" and applies a chosen step. Applying re-checks everything the caller
//! was shown, because the record or the actor may have changed in between.

use flowdesk_store::{Fields, Instance, Store, WriteMode};
use flowdesk_workflow::Workflow;
use tracing::{info, instrument, warn};

use crate::error::EngineError;
use crate::events::{NoopNotifier, TransitionEvent, TransitionNotifier};
use crate::registry::WorkflowRegistry;
use crate::step::{Step, current_steps, step_by_index, steps};
use crate::view::InstanceView;

/// The workflow engine.
///
/// Generic over the store and over `N: TransitionNotifier` to allow different
/// notification strategies. Use `WorkflowEngine::new()` for an engine with
/// no-op notifications, or `WorkflowEngine::with_notifier()` to observe
/// transitions.
pub struct WorkflowEngine<S: Store, N: TransitionNotifier = NoopNotifier> {
  registry: WorkflowRegistry,
  store: S,
  notifier: N,
}

impl<S: Store> WorkflowEngine<S, NoopNotifier> {
  pub fn new(registry: WorkflowRegistry, store: S) -> Self {
    Self::with_notifier(registry, store, NoopNotifier)
  }
}

impl<S: Store, N: TransitionNotifier> WorkflowEngine<S, N> {
  pub fn with_notifier(registry: WorkflowRegistry, store: S, notifier: N) -> Self {
    Self {
      registry,
      store,
      notifier,
    }
  }

  pub fn registry(&self) -> &WorkflowRegistry {
    &self.registry
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  /// Get the workflow of an entity type.
  pub fn workflow(&self, entity_type: &str) -> Result<&Workflow, EngineError> {
    self.registry.get(entity_type)
  }

  /// Load a record, checking it belongs to `entity_type`.
  pub async fn get_instance(
    &self,
    entity_type: &str,
    instance_id: &str,
  ) -> Result<Instance, EngineError> {
    let not_found = || EngineError::InstanceNotFound {
      entity_type: entity_type.to_string(),
      instance_id: instance_id.to_string(),
    };

    let instance = match self.store.get_instance(instance_id).await {
      Ok(instance) => instance,
      Err(flowdesk_store::Error::NotFound(_)) => return Err(not_found()),
      Err(e) => return Err(EngineError::Store(e)),
    };
    if instance.entity_type != entity_type {
      return Err(not_found());
    }
    Ok(instance)
  }

  /// The record that replaced `instance_id`, if any.
  async fn successor_id(&self, instance_id: &str) -> Result<Option<String>, EngineError> {
    self
      .store
      .successor_id(instance_id)
      .await
      .map_err(EngineError::Store)
  }

  /// Steps `role` may take on a record, or on a new record when `instance_id`
  /// is `None`. A record that has been superseded offers none.
  pub async fn current_steps(
    &self,
    entity_type: &str,
    instance_id: Option<&str>,
    role: &str,
  ) -> Result<Vec<Step>, EngineError> {
    let workflow = self.workflow(entity_type)?;
    match instance_id {
      Some(id) => {
        let instance = self.get_instance(entity_type, id).await?;
        if self.successor_id(id).await?.is_some() {
          return Ok(Vec::new());
        }
        Ok(current_steps(workflow, &instance, role))
      }
      None => Ok(steps(workflow, None, role).collect()),
    }
  }

  /// Validate and apply one step.
  ///
  /// With `instance_id` of `None` the step must be a creation step; with an
  /// ID it must start from the record's current state. The record is written
  /// only if its state is still the one read here, so of two actors racing
  /// on the same record exactly one succeeds and the other gets
  /// [`EngineError::StaleState`].
  #[instrument(
    name = "apply_transition",
    skip_all,
    fields(
      entity_type = %entity_type,
      instance_id = ?instance_id,
      step_index = step_index,
      role = %role,
    )
  )]
  pub async fn apply_transition(
    &self,
    entity_type: &str,
    instance_id: Option<&str>,
    step_index: usize,
    role: &str,
    values: Fields,
  ) -> Result<Instance, EngineError> {
    let workflow = self.workflow(entity_type)?;
    let step = step_by_index(workflow, step_index)?;

    if step.role != role {
      return Err(EngineError::NotPermitted {
        role: role.to_string(),
        step_index,
      });
    }

    let current = match instance_id {
      Some(id) => self.get_instance(entity_type, id).await?,
      None => Instance::new(entity_type),
    };

    if current.state != step.from_state {
      return Err(EngineError::StaleState {
        instance_id: instance_id.map(str::to_string),
        expected: step.from_state,
        actual: current.state,
      });
    }

    step.check_fields(&values)?;

    let old_state = current.state.clone();
    let (mut next, mode) = match &old_state {
      None => (current, WriteMode::Insert),
      Some(_) if workflow.always_new() => (current.successor(), WriteMode::Insert),
      Some(state) => (
        current,
        WriteMode::Update {
          expected_state: state.clone(),
        },
      ),
    };
    for (name, value) in values {
      next.fields.insert(name, value);
    }
    next.state = Some(step.to_state.clone());

    if let Err(e) = self.store.save(&next, &mode).await {
      return Err(match e {
        flowdesk_store::Error::StaleState {
          instance_id,
          expected,
          actual,
        } => EngineError::StaleState {
          instance_id: Some(instance_id),
          expected: Some(expected),
          actual,
        },
        flowdesk_store::Error::AlreadySuperseded(previous) => EngineError::StaleState {
          instance_id: Some(previous),
          expected: old_state.clone(),
          actual: old_state,
        },
        other => {
          warn!(error = %other, "failed to store transition");
          EngineError::Store(other)
        }
      });
    }

    info!(
      new_instance_id = %next.instance_id,
      old_state = ?old_state,
      new_state = %step.to_state,
      "transition applied"
    );

    self.notifier.notify(TransitionEvent {
      entity_type: entity_type.to_string(),
      instance_id: next.instance_id.clone(),
      supersedes: next.supersedes.clone(),
      old_state,
      new_state: step.to_state,
      role: role.to_string(),
      step_index,
    });

    Ok(next)
  }

  /// Create a record by firing a creation step.
  pub async fn create(
    &self,
    entity_type: &str,
    step_index: usize,
    role: &str,
    values: Fields,
  ) -> Result<Instance, EngineError> {
    self
      .apply_transition(entity_type, None, step_index, role, values)
      .await
  }

  /// Move an existing record along by firing a step from its current state.
  pub async fn advance(
    &self,
    entity_type: &str,
    instance_id: &str,
    step_index: usize,
    role: &str,
    values: Fields,
  ) -> Result<Instance, EngineError> {
    self
      .apply_transition(entity_type, Some(instance_id), step_index, role, values)
      .await
  }

  /// Render a record (or a new one) for `role`.
  pub async fn view(
    &self,
    entity_type: &str,
    instance_id: Option<&str>,
    role: &str,
  ) -> Result<InstanceView, EngineError> {
    let workflow = self.workflow(entity_type)?;
    match instance_id {
      Some(id) => {
        let instance = self.get_instance(entity_type, id).await?;
        let view = InstanceView::of_instance(workflow, &instance, role);
        Ok(match self.successor_id(id).await? {
          Some(successor) => view.replaced_by(successor),
          None => view,
        })
      }
      None => Ok(InstanceView::of_new(workflow, role)),
    }
  }

  /// The entity types `role` may create, with their creation steps.
  pub fn create_options(&self, role: &str) -> Vec<InstanceView> {
    self
      .registry
      .creatable_by(role)
      .map(|workflow| InstanceView::of_new(workflow, role))
      .collect()
  }

  /// Open records on which `role` has something to do, across all entity types.
  pub async fn open_work(&self, role: &str) -> Result<Vec<InstanceView>, EngineError> {
    let mut work = Vec::new();
    for workflow in self.registry.iter() {
      let open = self
        .store
        .list_open(workflow.entity_type(), workflow.final_state())
        .await
        .map_err(EngineError::Store)?;
      work.extend(
        open
          .iter()
          .map(|instance| InstanceView::of_instance(workflow, instance, role))
          .filter(|view| !view.actions.is_empty()),
      );
    }
    Ok(work)
  }
}
