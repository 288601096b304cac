//! Show command: inspect one persisted workflow

use cargo_relay::core::error::RelayResult;
use cargo_relay::workflow::WorkflowStore;
use std::env;

/// Run the show command
pub fn run_show(id: &str, json: bool) -> RelayResult<()> {
  let workspace_root = env::current_dir()?;
  let store = WorkflowStore::open(&WorkflowStore::default_root(&workspace_root))?;
  let workflow = store.load(id)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&workflow)?);
    return Ok(());
  }

  println!("📦 Workflow {}", workflow.id);
  println!();
  println!("  State:    {}", workflow.state);
  println!("  Started:  {}", workflow.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
  if let Some(completed_at) = workflow.completed_at {
    println!("  Ended:    {}", completed_at.format("%Y-%m-%d %H:%M:%S UTC"));
  }
  println!();

  println!("  Stages:");
  for (idx, stage) in workflow.stages.iter().enumerate() {
    let marker = if idx < workflow.current_stage {
      "✅"
    } else if idx == workflow.current_stage {
      "👉"
    } else {
      "  "
    };
    println!("    {} {}. {}", marker, idx + 1, stage);
  }

  if !workflow.context.errors.is_empty() {
    println!();
    println!("  Errors:");
    for error in &workflow.context.errors {
      println!("    ❌ {}", error);
    }
  }

  if !workflow.context.warnings.is_empty() {
    println!();
    println!("  Warnings:");
    for warning in &workflow.context.warnings {
      println!("    ⚠️  {}", warning);
    }
  }

  if let Some(rollback_state) = &workflow.context.rollback_state {
    println!();
    println!("  Rollback snapshot ({} component(s)):", rollback_state.len());
    for component in rollback_state.keys() {
      println!("    - {}", component);
    }
    println!();
    println!("  Compensate with: cargo relay rollback {} --apply", workflow.id);
  }

  Ok(())
}
