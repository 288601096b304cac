//! Status command: list persisted release workflows

use cargo_relay::core::error::RelayResult;
use cargo_relay::workflow::{ReleaseWorkflow, WorkflowState, WorkflowStore};
use rayon::prelude::*;
use std::env;

/// Run the status command
pub fn run_status(json: bool) -> RelayResult<()> {
  let workspace_root = env::current_dir()?;
  let store = WorkflowStore::open(&WorkflowStore::default_root(&workspace_root))?;

  let ids = store.list_ids()?;
  let workflows: Vec<ReleaseWorkflow> = ids
    .par_iter()
    .map(|id| store.load(id))
    .collect::<RelayResult<Vec<_>>>()?;

  if json {
    println!("{}", serde_json::to_string_pretty(&workflows)?);
    return Ok(());
  }

  if workflows.is_empty() {
    println!("⚠️  No release workflows recorded");
    println!();
    println!("Workflow state is written to .relay/workflows/ as releases run.");
    return Ok(());
  }

  println!("📋 Release Workflows");
  println!();

  for wf in &workflows {
    let icon = match wf.state {
      WorkflowState::Pending => "⚪",
      WorkflowState::InProgress => "🟡",
      WorkflowState::Completed => "✅",
      WorkflowState::Failed => "🔴",
    };

    println!("{} {} ({})", icon, wf.id, wf.state);
    println!(
      "   Stage:    {}/{}{}",
      wf.current_stage.min(wf.stages.len()),
      wf.stages.len(),
      wf.current_stage_name().map(|s| format!(" (next: {})", s)).unwrap_or_default()
    );
    println!("   Started:  {}", wf.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(completed_at) = wf.completed_at {
      println!("   Ended:    {}", completed_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if !wf.context.errors.is_empty() {
      println!("   Errors:   {}", wf.context.errors.len());
    }
    println!();
  }

  let failed: Vec<_> = workflows.iter().filter(|w| w.state == WorkflowState::Failed).collect();
  if !failed.is_empty() {
    println!("To inspect or compensate a failed release:");
    for wf in failed {
      println!("  cargo relay show {}", wf.id);
      println!("  cargo relay rollback {} --apply", wf.id);
    }
  }

  Ok(())
}
