//! Integration tests for workflow persistence and lifecycle

use anyhow::Result;
use cargo_relay::core::error::{RelayError, ReleaseError, WorkflowError};
use cargo_relay::workflow::{ReleaseWorkflow, WorkflowState, WorkflowStore};
use tempfile::TempDir;

fn stages() -> Vec<String> {
  vec!["bump".into(), "publish".into(), "tag".into()]
}

#[test]
fn test_lifecycle_survives_persistence() -> Result<()> {
  let dir = TempDir::new()?;
  let store = WorkflowStore::open(dir.path())?;

  let mut wf = ReleaseWorkflow::new("wf-persist", stages());
  wf.begin()?;
  wf.advance();
  store.save(&wf)?;

  // a fresh process loads the workflow mid-flight
  let mut loaded = store.load("wf-persist")?;
  assert_eq!(loaded.state, WorkflowState::InProgress);
  assert_eq!(loaded.current_stage_name(), Some("publish"));

  loaded.fail(ReleaseError::new("TIMEOUT", "publish timed out"))?;
  store.save(&loaded)?;

  // and another resumes it at the same stage
  let mut resumed = store.load("wf-persist")?;
  resumed.resume()?;
  assert_eq!(resumed.state, WorkflowState::InProgress);
  assert_eq!(resumed.current_stage_name(), Some("publish"));
  Ok(())
}

#[test]
fn test_resume_rejected_for_completed_workflow() -> Result<()> {
  let dir = TempDir::new()?;
  let store = WorkflowStore::open(dir.path())?;

  let mut wf = ReleaseWorkflow::new("wf-done", stages());
  wf.begin()?;
  wf.complete()?;
  store.save(&wf)?;

  let mut loaded = store.load("wf-done")?;
  let err = loaded.resume().unwrap_err();
  assert!(matches!(err, RelayError::Workflow(WorkflowError::NotResumable { .. })));
  Ok(())
}

#[test]
fn test_corrupt_state_file_reports_path() -> Result<()> {
  let dir = TempDir::new()?;
  let store = WorkflowStore::open(dir.path())?;
  std::fs::write(dir.path().join("wf-bad.json"), "{not json")?;

  let err = store.load("wf-bad").unwrap_err();
  assert!(err.to_string().contains("wf-bad.json"));
  Ok(())
}

#[test]
fn test_independent_workflows_do_not_interfere() -> Result<()> {
  let dir = TempDir::new()?;
  let store = WorkflowStore::open(dir.path())?;

  let mut a = ReleaseWorkflow::new("wf-a", stages());
  let mut b = ReleaseWorkflow::new("wf-b", stages());
  a.begin()?;
  b.begin()?;
  a.advance();
  store.save(&a)?;
  store.save(&b)?;

  assert_eq!(store.load("wf-a")?.current_stage, 1);
  assert_eq!(store.load("wf-b")?.current_stage, 0);

  store.delete("wf-a")?;
  assert!(!store.exists("wf-a"));
  assert!(store.exists("wf-b"));
  Ok(())
}
