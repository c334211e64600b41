use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// Domain field values of an instance, keyed by field name.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// A workflow instance as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Instance {
  pub instance_id: String,
  pub entity_type: String,
  /// `None` until a creation rule has fired.
  pub state: Option<String>,
  pub fields: Json<Fields>,
  /// The record this one replaced, for always-new entity types.
  pub supersedes: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Instance {
  /// A not-yet-created instance with a fresh ID and no state.
  pub fn new(entity_type: impl Into<String>) -> Self {
    let now = Utc::now();
    Self {
      instance_id: uuid::Uuid::new_v4().to_string(),
      entity_type: entity_type.into(),
      state: None,
      fields: Json(Fields::new()),
      supersedes: None,
      created_at: now,
      updated_at: now,
    }
  }

  /// A fresh record carrying this one's state and fields that supersedes it.
  pub fn successor(&self) -> Self {
    let mut next = Self::new(self.entity_type.clone());
    next.state = self.state.clone();
    next.fields = self.fields.clone();
    next.supersedes = Some(self.instance_id.clone());
    next
  }

  pub fn is_created(&self) -> bool {
    self.state.is_some()
  }

  pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
    self.fields.get(name)
  }
}

/// How an instance should be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteMode {
  /// Write a new record.
  Insert,
  /// Overwrite the existing record if it is still in `expected_state`.
  Update { expected_state: String },
}
