//! Flowdesk Store
//!
//! This crate provides the storage trait and implementations for workflow
//! instances. Data is persisted to SQLite, or kept in memory for tests and
//! one-shot tools.
//!
//! The [`Store`] trait defines operations for:
//! - Loading an instance by ID
//! - Inserting new instances (creation, or a successor for always-new types)
//! - Updating an instance, conditioned on its state being unchanged
//! - Finding the record that superseded an instance
//! - Listing the open (non-final) instances of an entity type
//!
//! Conditional updates are what keeps two actors from both advancing the same
//! record: the loser gets [`Error::StaleState`].

mod memory;
mod sqlite;
mod types;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use types::{Fields, Instance, WriteMode};

use async_trait::async_trait;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested record was not found.
  #[error("not found: {0}")]
  NotFound(String),

  /// The record's state changed since it was read.
  #[error("instance '{instance_id}' is no longer in state '{expected}' (now {actual:?})")]
  StaleState {
    instance_id: String,
    expected: String,
    actual: Option<String>,
  },

  /// A record with this ID already exists.
  #[error("already exists: {0}")]
  AlreadyExists(String),

  /// Another record already supersedes this one.
  #[error("instance '{0}' has already been superseded")]
  AlreadySuperseded(String),

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
}

/// Storage trait for workflow instances.
#[async_trait]
pub trait Store: Send + Sync {
  /// Get an instance by ID.
  async fn get_instance(&self, instance_id: &str) -> Result<Instance, Error>;

  /// Insert a new instance.
  ///
  /// Fails with [`Error::AlreadySuperseded`] when the instance supersedes a
  /// record that already has a successor.
  async fn insert_instance(&self, instance: &Instance) -> Result<(), Error>;

  /// Write the instance's state and fields, but only if the stored state is
  /// still `expected_state`.
  async fn update_instance(&self, instance: &Instance, expected_state: &str) -> Result<(), Error>;

  /// ID of the record that superseded `instance_id`, if any.
  async fn successor_id(&self, instance_id: &str) -> Result<Option<String>, Error>;

  /// List instances of an entity type that are not in `final_state` and have
  /// not been superseded, oldest first.
  async fn list_open(&self, entity_type: &str, final_state: &str) -> Result<Vec<Instance>, Error>;

  /// Persist an instance according to a write directive.
  async fn save(&self, instance: &Instance, mode: &WriteMode) -> Result<(), Error> {
    match mode {
      WriteMode::Insert => self.insert_instance(instance).await,
      WriteMode::Update { expected_state } => self.update_instance(instance, expected_state).await,
    }
  }
}
