use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::{Error, Instance, Store};

/// In-memory store implementation.
///
/// Every operation runs under one lock, so conditional updates are atomic.
/// Suitable for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemoryStore {
  instances: Mutex<HashMap<String, Instance>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Instance>> {
    // A panic while holding the lock cannot leave a half-written instance
    self
      .instances
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn get_instance(&self, instance_id: &str) -> Result<Instance, Error> {
    self
      .lock()
      .get(instance_id)
      .cloned()
      .ok_or_else(|| Error::NotFound(instance_id.to_string()))
  }

  async fn insert_instance(&self, instance: &Instance) -> Result<(), Error> {
    let mut instances = self.lock();

    if instances.contains_key(&instance.instance_id) {
      return Err(Error::AlreadyExists(instance.instance_id.clone()));
    }
    if let Some(previous) = &instance.supersedes
      && instances
        .values()
        .any(|i| i.supersedes.as_ref() == Some(previous))
    {
      return Err(Error::AlreadySuperseded(previous.clone()));
    }

    instances.insert(instance.instance_id.clone(), instance.clone());
    Ok(())
  }

  async fn update_instance(&self, instance: &Instance, expected_state: &str) -> Result<(), Error> {
    let mut instances = self.lock();

    let stored = instances
      .get_mut(&instance.instance_id)
      .ok_or_else(|| Error::NotFound(instance.instance_id.clone()))?;

    if stored.state.as_deref() != Some(expected_state) {
      return Err(Error::StaleState {
        instance_id: instance.instance_id.clone(),
        expected: expected_state.to_string(),
        actual: stored.state.clone(),
      });
    }

    stored.state = instance.state.clone();
    stored.fields = instance.fields.clone();
    stored.updated_at = Utc::now();
    Ok(())
  }

  async fn successor_id(&self, instance_id: &str) -> Result<Option<String>, Error> {
    Ok(
      self
        .lock()
        .values()
        .find(|i| i.supersedes.as_deref() == Some(instance_id))
        .map(|i| i.instance_id.clone()),
    )
  }

  async fn list_open(&self, entity_type: &str, final_state: &str) -> Result<Vec<Instance>, Error> {
    let instances = self.lock();

    let mut open: Vec<Instance> = instances
      .values()
      .filter(|i| i.entity_type == entity_type)
      .filter(|i| matches!(i.state.as_deref(), Some(state) if state != final_state))
      .filter(|i| {
        !instances
          .values()
          .any(|s| s.supersedes.as_deref() == Some(i.instance_id.as_str()))
      })
      .cloned()
      .collect();
    open.sort_by(|a, b| {
      a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.instance_id.cmp(&b.instance_id))
    });

    Ok(open)
  }
}
