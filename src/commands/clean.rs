//! Clean command: delete terminal workflow state files

use cargo_relay::core::error::RelayResult;
use cargo_relay::ui::FileProgress;
use cargo_relay::workflow::{WorkflowState, WorkflowStore};
use std::env;

/// Run the clean command
///
/// Removes completed workflow state; `--failed` also removes failed ones
/// (discarding their rollback snapshots).
pub fn run_clean(failed: bool) -> RelayResult<()> {
  let workspace_root = env::current_dir()?;
  let store = WorkflowStore::open(&WorkflowStore::default_root(&workspace_root))?;

  let mut removable = Vec::new();
  for id in store.list_ids()? {
    let workflow = store.load(&id)?;
    let matches = match workflow.state {
      WorkflowState::Completed => true,
      WorkflowState::Failed => failed,
      _ => false,
    };
    if matches {
      removable.push(id);
    }
  }

  if removable.is_empty() {
    println!("✅ Nothing to clean");
    return Ok(());
  }

  let mut progress = FileProgress::new(removable.len(), "Cleaning workflow state");
  for id in &removable {
    store.delete(id)?;
    progress.inc();
  }

  println!();
  println!("✅ Removed {} workflow state file(s)", removable.len());
  if !failed {
    println!("   (failed workflows kept; use --failed to remove them too)");
  }

  Ok(())
}
