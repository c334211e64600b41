use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::{Error, Instance, Store};

/// SQLite-based store implementation.
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Open (creating if needed) a database file and run migrations.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
    let options = SqliteConnectOptions::new()
      .filename(path.as_ref())
      .create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    let store = Self::new(pool);
    store.migrate().await.map_err(sqlx::Error::from)?;
    Ok(store)
  }

  /// An empty in-memory database with migrations applied.
  ///
  /// Limited to a single connection so every query sees the same database.
  pub async fn in_memory() -> Result<Self, Error> {
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .idle_timeout(None)
      .max_lifetime(None)
      .connect("sqlite::memory:")
      .await?;
    let store = Self::new(pool);
    store.migrate().await.map_err(sqlx::Error::from)?;
    Ok(store)
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(&self.pool).await
  }

  async fn current_state(&self, instance_id: &str) -> Result<Option<Option<String>>, Error> {
    let row: Option<(Option<String>,)> =
      sqlx::query_as("SELECT state FROM workflow_instances WHERE instance_id = ?")
        .bind(instance_id)
        .fetch_optional(&self.pool)
        .await?;
    Ok(row.map(|(state,)| state))
  }
}

#[async_trait]
impl Store for SqliteStore {
  async fn get_instance(&self, instance_id: &str) -> Result<Instance, Error> {
    sqlx::query_as(
      r#"
            SELECT instance_id, entity_type, state, fields, supersedes, created_at, updated_at
            FROM workflow_instances
            WHERE instance_id = ?
            "#,
    )
    .bind(instance_id)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| Error::NotFound(instance_id.to_string()))
  }

  async fn insert_instance(&self, instance: &Instance) -> Result<(), Error> {
    let result = sqlx::query(
      r#"
            INSERT INTO workflow_instances (instance_id, entity_type, state, fields, supersedes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
    )
    .bind(&instance.instance_id)
    .bind(&instance.entity_type)
    .bind(&instance.state)
    .bind(&instance.fields)
    .bind(&instance.supersedes)
    .bind(instance.created_at)
    .bind(instance.updated_at)
    .execute(&self.pool)
    .await;

    match result {
      Ok(_) => Ok(()),
      Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
        match &instance.supersedes {
          Some(previous) if db.message().contains("supersedes") => {
            Err(Error::AlreadySuperseded(previous.clone()))
          }
          _ => Err(Error::AlreadyExists(instance.instance_id.clone())),
        }
      }
      Err(e) => Err(e.into()),
    }
  }

  async fn update_instance(&self, instance: &Instance, expected_state: &str) -> Result<(), Error> {
    let result = sqlx::query(
      r#"
            UPDATE workflow_instances
            SET state = ?, fields = ?, updated_at = ?
            WHERE instance_id = ? AND state = ?
            "#,
    )
    .bind(&instance.state)
    .bind(&instance.fields)
    .bind(Utc::now())
    .bind(&instance.instance_id)
    .bind(expected_state)
    .execute(&self.pool)
    .await?;

    if result.rows_affected() == 1 {
      return Ok(());
    }

    match self.current_state(&instance.instance_id).await? {
      None => Err(Error::NotFound(instance.instance_id.clone())),
      Some(actual) => Err(Error::StaleState {
        instance_id: instance.instance_id.clone(),
        expected: expected_state.to_string(),
        actual,
      }),
    }
  }

  async fn successor_id(&self, instance_id: &str) -> Result<Option<String>, Error> {
    let row: Option<(String,)> =
      sqlx::query_as("SELECT instance_id FROM workflow_instances WHERE supersedes = ?")
        .bind(instance_id)
        .fetch_optional(&self.pool)
        .await?;
    Ok(row.map(|(id,)| id))
  }

  async fn list_open(&self, entity_type: &str, final_state: &str) -> Result<Vec<Instance>, Error> {
    let instances = sqlx::query_as(
      r#"
            SELECT i.instance_id, i.entity_type, i.state, i.fields, i.supersedes, i.created_at, i.updated_at
            FROM workflow_instances i
            WHERE i.entity_type = ?
              AND i.state IS NOT NULL
              AND i.state != ?
              AND NOT EXISTS (
                SELECT 1 FROM workflow_instances s WHERE s.supersedes = i.instance_id
              )
            ORDER BY i.created_at ASC
            "#,
    )
    .bind(entity_type)
    .bind(final_state)
    .fetch_all(&self.pool)
    .await?;

    Ok(instances)
  }
}
