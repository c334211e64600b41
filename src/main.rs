use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use flowdesk_engine::{
  LogNotifier, TransitionNotifier, WorkflowEngine, WorkflowRegistry, create_roles, require_steps,
};
use flowdesk_store::{Fields, SqliteStore, Store};

/// Flowdesk - role-driven state-table workflows
#[derive(Parser)]
#[command(name = "flowdesk")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.flowdesk)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Directory holding the workflow definitions (*.json)
  #[arg(long, global = true, default_value = "workflows")]
  workflows: PathBuf,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Check every workflow definition and print a summary
  Validate,

  #[command(flatten)]
  Record(RecordCommand),
}

/// Commands that read or write records, and so need the database.
#[derive(Subcommand)]
enum RecordCommand {
  /// List the steps a role may take on a record, or on a new one
  Steps {
    entity_type: String,

    /// Record ID; omit for creation steps
    #[arg(long)]
    instance: Option<String>,

    #[arg(long)]
    role: String,

    /// Fail when the role has no legal step
    #[arg(long)]
    require: bool,
  },

  /// Create a record by firing a creation step
  Create {
    entity_type: String,

    #[arg(long)]
    role: String,

    #[arg(long)]
    step: usize,

    /// Field value as name=value; the value is parsed as JSON when possible
    #[arg(long = "field", value_parser = parse_field)]
    fields: Vec<(String, Value)>,
  },

  /// Fire a step on an existing record
  Apply {
    entity_type: String,

    instance_id: String,

    #[arg(long)]
    role: String,

    #[arg(long)]
    step: usize,

    /// Field value as name=value; the value is parsed as JSON when possible
    #[arg(long = "field", value_parser = parse_field)]
    fields: Vec<(String, Value)>,
  },

  /// Show a record as seen by a role
  Show {
    entity_type: String,

    instance_id: Option<String>,

    #[arg(long)]
    role: String,
  },

  /// What a role can create and the open records waiting on it
  Home {
    #[arg(long)]
    role: String,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  let Some(command) = cli.command else {
    println!("flowdesk - use --help to see available commands");
    return Ok(());
  };

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".flowdesk"),
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run(command, cli.workflows, data_dir).await })
}

async fn run(command: Commands, workflows: PathBuf, data_dir: PathBuf) -> Result<()> {
  let registry = WorkflowRegistry::load_dir(&workflows)
    .await
    .with_context(|| format!("failed to load workflows from {}", workflows.display()))?;

  let output = match command {
    Commands::Validate => {
      eprintln!("{} workflow(s) valid", registry.len());
      summary(&registry)
    }
    Commands::Record(command) => {
      tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;
      let db_path = data_dir.join("flowdesk.db");
      let store = SqliteStore::open(&db_path)
        .await
        .with_context(|| format!("failed to open database: {}", db_path.display()))?;

      let engine = WorkflowEngine::with_notifier(registry, store, LogNotifier);
      execute(&engine, command).await?
    }
  };

  println!("{}", serde_json::to_string_pretty(&output)?);

  Ok(())
}

async fn execute<S: Store, N: TransitionNotifier>(
  engine: &WorkflowEngine<S, N>,
  command: RecordCommand,
) -> Result<Value> {
  let output = match command {
    RecordCommand::Steps {
      entity_type,
      instance,
      role,
      require,
    } => {
      let mut steps = engine
        .current_steps(&entity_type, instance.as_deref(), &role)
        .await?;
      if require {
        let state = match &instance {
          Some(id) => engine.get_instance(&entity_type, id).await?.state,
          None => None,
        };
        let workflow = engine.workflow(&entity_type)?;
        steps = require_steps(workflow, state.as_deref(), &role, steps)?;
      }
      serde_json::to_value(steps)?
    }
    RecordCommand::Create {
      entity_type,
      role,
      step,
      fields,
    } => {
      let values = collect_fields(fields)?;
      let instance = engine.create(&entity_type, step, &role, values).await?;
      eprintln!("Created {} {}", entity_type, instance.instance_id);
      serde_json::to_value(instance)?
    }
    RecordCommand::Apply {
      entity_type,
      instance_id,
      role,
      step,
      fields,
    } => {
      let values = collect_fields(fields)?;
      let instance = engine
        .advance(&entity_type, &instance_id, step, &role, values)
        .await?;
      if instance.instance_id != instance_id {
        eprintln!("{} superseded by {}", instance_id, instance.instance_id);
      }
      serde_json::to_value(instance)?
    }
    RecordCommand::Show {
      entity_type,
      instance_id,
      role,
    } => {
      let view = engine
        .view(&entity_type, instance_id.as_deref(), &role)
        .await?;
      serde_json::to_value(view)?
    }
    RecordCommand::Home { role } => json!({
      "create": engine.create_options(&role),
      "open": engine.open_work(&role).await?,
    }),
  };
  Ok(output)
}

fn summary(registry: &WorkflowRegistry) -> Value {
  registry
    .iter()
    .map(|workflow| {
      json!({
        "entity_type": workflow.entity_type(),
        "final_state": workflow.final_state(),
        "always_new": workflow.always_new(),
        "rules": workflow.rules().len(),
        "create_roles": create_roles(workflow),
      })
    })
    .collect()
}

/// Merge a JSON object piped on stdin with the `--field` arguments, the latter winning.
fn collect_fields(args: Vec<(String, Value)>) -> Result<Fields> {
  let mut fields = match read_fields_from_stdin()? {
    Value::Object(map) => map,
    other => bail!("fields on stdin must be a JSON object, got {}", other),
  };
  fields.extend(args);
  Ok(fields)
}

fn read_fields_from_stdin() -> Result<Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(json!({}));
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read fields from stdin")?;

  if input.trim().is_empty() {
    Ok(json!({}))
  } else {
    serde_json::from_str(&input).context("failed to parse fields JSON from stdin")
  }
}

fn parse_field(arg: &str) -> Result<(String, Value), String> {
  let (name, raw) = arg
    .split_once('=')
    .ok_or_else(|| format!("expected name=value, got '{arg}'"))?;
  if name.is_empty() {
    return Err(format!("missing field name in '{arg}'"));
  }
  let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
  Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
  use super::*;
  use flowdesk_engine::EngineError;

  async fn engine() -> WorkflowEngine<SqliteStore> {
    let registry = WorkflowRegistry::load_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/workflows"))
      .await
      .unwrap();
    WorkflowEngine::new(registry, SqliteStore::in_memory().await.unwrap())
  }

  fn steps_command(instance: Option<&str>, role: &str, require: bool) -> RecordCommand {
    RecordCommand::Steps {
      entity_type: "Income".to_string(),
      instance: instance.map(str::to_string),
      role: role.to_string(),
      require,
    }
  }

  #[tokio::test]
  async fn test_steps_require() {
    let engine = engine().await;

    let values = [("event", "PyCon"), ("sponsor", "ACME"), ("category", "gold")]
      .into_iter()
      .map(|(name, value)| (name.to_string(), json!(value)))
      .collect();
    let created = engine.create("Income", 0, "organizer", values).await.unwrap();
    let id = created.instance_id;

    let listed = execute(&engine, steps_command(Some(&id), "organizer", false))
      .await
      .unwrap();
    assert_eq!(listed, json!([]));

    let err = execute(&engine, steps_command(Some(&id), "organizer", true))
      .await
      .unwrap_err();
    assert!(matches!(
      err.downcast_ref::<EngineError>(),
      Some(EngineError::NoLegalStep { state: Some(state), .. }) if state == "init"
    ));

    let admin = execute(&engine, steps_command(Some(&id), "admin", true))
      .await
      .unwrap();
    assert_eq!(admin[0]["index"], json!(1));
  }

  #[tokio::test]
  async fn test_steps_require_for_creation() {
    let engine = engine().await;

    let err = execute(&engine, steps_command(None, "admin", true))
      .await
      .unwrap_err();
    assert!(matches!(
      err.downcast_ref::<EngineError>(),
      Some(EngineError::NoLegalStep { state: None, .. })
    ));

    let organizer = execute(&engine, steps_command(None, "organizer", true))
      .await
      .unwrap();
    assert_eq!(organizer[0]["index"], json!(0));
  }

  #[test]
  fn test_parse_field() {
    assert_eq!(parse_field("amount=12.5").unwrap(), ("amount".to_string(), json!(12.5)));
    assert_eq!(parse_field("paid=true").unwrap(), ("paid".to_string(), json!(true)));
    assert_eq!(
      parse_field("sponsor=ACME Corp").unwrap(),
      ("sponsor".to_string(), json!("ACME Corp"))
    );
    assert_eq!(
      parse_field("note=a=b").unwrap(),
      ("note".to_string(), json!("a=b"))
    );
    assert!(parse_field("novalue").is_err());
    assert!(parse_field("=1").is_err());
  }
}
