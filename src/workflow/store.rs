//! Durable workflow state storage
//!
//! One JSON file per workflow id under `.relay/workflows/`. Files are written
//! atomically (write to a temp sibling, then rename) so a crash mid-save
//! never leaves a truncated state file behind. The store is safe for
//! concurrent use by independent workflows; each workflow owns its file.

use crate::core::error::{RelayError, RelayResult, ResultExt, WorkflowError};
use crate::rollback::{Component, ComponentState};
use crate::workflow::state::ReleaseWorkflow;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File-backed store of release workflow state
pub struct WorkflowStore {
  root: PathBuf,
}

impl WorkflowStore {
  /// Open a store rooted at the given directory, creating it if needed
  pub fn open(root: &Path) -> RelayResult<Self> {
    fs::create_dir_all(root).with_context(|| format!("Failed to create workflow state dir {}", root.display()))?;
    Ok(Self { root: root.to_path_buf() })
  }

  /// Default store location under a workspace root
  pub fn default_root(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".relay").join("workflows")
  }

  fn state_path(&self, id: &str) -> PathBuf {
    self.root.join(format!("{}.json", id))
  }

  /// Persist a workflow, overwriting any previous state
  pub fn save(&self, workflow: &ReleaseWorkflow) -> RelayResult<()> {
    let path = self.state_path(&workflow.id);
    let json = serde_json::to_string_pretty(workflow)?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("Failed to write workflow state to {}", tmp.display()))?;
    fs::rename(&tmp, &path).with_context(|| format!("Failed to finalize workflow state at {}", path.display()))?;
    Ok(())
  }

  /// Load a workflow by id
  pub fn load(&self, id: &str) -> RelayResult<ReleaseWorkflow> {
    let path = self.state_path(id);
    if !path.exists() {
      return Err(RelayError::Workflow(WorkflowError::NotFound { id: id.to_string() }));
    }

    let content =
      fs::read_to_string(&path).with_context(|| format!("Failed to read workflow state from {}", path.display()))?;
    let workflow = serde_json::from_str(&content)
      .with_context(|| format!("Corrupt workflow state file: {}", path.display()))?;
    Ok(workflow)
  }

  /// Whether a workflow with this id exists
  pub fn exists(&self, id: &str) -> bool {
    self.state_path(id).exists()
  }

  /// Ids of all persisted workflows
  pub fn list_ids(&self) -> RelayResult<Vec<String>> {
    let mut ids = Vec::new();
    for entry in fs::read_dir(&self.root).with_context(|| format!("Failed to list {}", self.root.display()))? {
      let path = entry.map_err(RelayError::from)?.path();
      if path.extension().is_some_and(|ext| ext == "json") {
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
          ids.push(stem.to_string());
        }
      }
    }
    ids.sort();
    Ok(ids)
  }

  /// Delete a workflow's state file
  pub fn delete(&self, id: &str) -> RelayResult<()> {
    let path = self.state_path(id);
    if !path.exists() {
      return Err(RelayError::Workflow(WorkflowError::NotFound { id: id.to_string() }));
    }
    fs::remove_file(&path).with_context(|| format!("Failed to delete workflow state {}", path.display()))?;
    Ok(())
  }

  /// Record a copy of the rollback coordinator's saved state on the workflow
  ///
  /// Called best-effort by `RollbackCoordinator::save_state`.
  pub fn record_rollback_state(
    &self,
    id: &str,
    state: &BTreeMap<Component, ComponentState>,
  ) -> RelayResult<()> {
    let mut workflow = self.load(id)?;
    workflow.context.rollback_state = Some(state.clone());
    workflow.updated_at = chrono::Utc::now();
    self.save(&workflow)
  }
}
