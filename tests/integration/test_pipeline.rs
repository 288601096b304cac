//! Integration tests for the release pipeline loop

use crate::helpers::fast_strategies;
use anyhow::Result;
use cargo_relay::core::error::ReleaseError;
use cargo_relay::pipeline::{ReleasePipeline, ReleaseStage, StageContext, StageStatus};
use cargo_relay::recovery::{codes, OperationError, RecoveryAction, RetryExecutor};
use cargo_relay::rollback::{ChangelogSnapshot, Component, ComponentHandles, ComponentState, RollbackCoordinator};
use cargo_relay::workflow::{ReleaseWorkflow, WorkflowState, WorkflowStore};
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Stage that fails `failures` times with the given code, then succeeds
struct FlakyStage {
  name: &'static str,
  critical: bool,
  code: &'static str,
  failures: AtomicU32,
}

impl FlakyStage {
  fn new(name: &'static str, critical: bool, code: &'static str, failures: u32) -> Self {
    Self {
      name,
      critical,
      code,
      failures: AtomicU32::new(failures),
    }
  }

  fn reliable(name: &'static str) -> Self {
    Self::new(name, false, codes::NETWORK_ERROR, 0)
  }
}

impl ReleaseStage for FlakyStage {
  fn name(&self) -> &str {
    self.name
  }

  fn critical(&self) -> bool {
    self.critical
  }

  fn fallback_code(&self) -> &str {
    self.code
  }

  fn run(&self, _cx: &StageContext) -> Result<serde_json::Value, OperationError> {
    let remaining = self.failures.load(Ordering::SeqCst);
    if remaining > 0 {
      self.failures.fetch_sub(1, Ordering::SeqCst);
      return Err(OperationError::from(ReleaseError::new(self.code, "stage operation failed")));
    }
    Ok(json!({"stage": self.name, "done": true}))
  }
}

/// Stage that checkpoints partial progress, fails once, and succeeds on resume
struct PartialStage;

impl ReleaseStage for PartialStage {
  fn name(&self) -> &str {
    "publish"
  }

  fn critical(&self) -> bool {
    true
  }

  fn run(&self, cx: &StageContext) -> Result<serde_json::Value, OperationError> {
    if cx.checkpoint.is_some() {
      return Ok(json!({"resumed": true}));
    }
    cx.checkpoints.create(&cx.stage_key, json!({"published": ["relay-core"]}));
    Err(OperationError::from(ReleaseError::new(
      codes::PARTIAL_FAILURE,
      "2 of 3 crates published, some failed",
    )))
  }
}

fn pipeline(dir: &TempDir) -> Result<(ReleasePipeline, Arc<WorkflowStore>)> {
  let store = Arc::new(WorkflowStore::open(dir.path())?);
  let pipeline = ReleasePipeline::new(Arc::clone(&store)).with_executor(RetryExecutor::new(fast_strategies()));
  Ok((pipeline, store))
}

#[test]
fn test_all_stages_complete() -> Result<()> {
  let dir = TempDir::new()?;
  let (pipeline, store) = pipeline(&dir)?;

  let stages: Vec<Arc<dyn ReleaseStage>> = vec![
    Arc::new(FlakyStage::reliable("bump")),
    Arc::new(FlakyStage::reliable("publish")),
  ];
  let mut workflow = ReleaseWorkflow::new("wf-ok", vec!["bump".into(), "publish".into()]);
  let mut coordinator = RollbackCoordinator::new();

  let outcome = pipeline.run(&mut workflow, &stages, &ComponentHandles::default(), &mut coordinator)?;

  assert!(outcome.completed);
  assert_eq!(workflow.state, WorkflowState::Completed);
  assert_eq!(outcome.stage_reports.len(), 2);
  assert!(outcome.stage_reports.iter().all(|r| r.status == StageStatus::Completed));
  // persisted terminal state
  assert_eq!(store.load("wf-ok")?.state, WorkflowState::Completed);
  // this workflow's checkpoints were cleared on completion
  assert!(!pipeline.checkpoints().has_checkpoint("wf-ok/bump"));
  Ok(())
}

#[test]
fn test_transient_failure_retried_within_stage() -> Result<()> {
  let dir = TempDir::new()?;
  let (pipeline, _store) = pipeline(&dir)?;

  // fails twice, succeeds on the third attempt (transient budget is 2 retries)
  let stages: Vec<Arc<dyn ReleaseStage>> =
    vec![Arc::new(FlakyStage::new("publish", true, codes::NETWORK_ERROR, 2))];
  let mut workflow = ReleaseWorkflow::new("wf-flaky", vec!["publish".into()]);
  let mut coordinator = RollbackCoordinator::new();

  let outcome = pipeline.run(&mut workflow, &stages, &ComponentHandles::default(), &mut coordinator)?;

  assert!(outcome.completed);
  assert_eq!(outcome.stage_reports[0].attempts, 3);
  Ok(())
}

#[test]
fn test_non_critical_exhaustion_is_skipped() -> Result<()> {
  let dir = TempDir::new()?;
  let (pipeline, _store) = pipeline(&dir)?;

  let stages: Vec<Arc<dyn ReleaseStage>> = vec![
    Arc::new(FlakyStage::new("docs", false, codes::NETWORK_ERROR, 99)),
    Arc::new(FlakyStage::reliable("tag")),
  ];
  let mut workflow = ReleaseWorkflow::new("wf-skip", vec!["docs".into(), "tag".into()]);
  let mut coordinator = RollbackCoordinator::new();

  let outcome = pipeline.run(&mut workflow, &stages, &ComponentHandles::default(), &mut coordinator)?;

  assert!(outcome.completed);
  assert_eq!(outcome.stage_reports[0].status, StageStatus::Skipped);
  assert_eq!(outcome.stage_reports[1].status, StageStatus::Completed);
  assert!(!workflow.context.warnings.is_empty());
  Ok(())
}

#[test]
fn test_critical_exhaustion_rolls_back_completed_work() -> Result<()> {
  let dir = TempDir::new()?;
  let (pipeline, store) = pipeline(&dir)?;

  let changelog = dir.path().join("CHANGELOG.md");
  std::fs::write(&changelog, "# Changelog\n\n## 1.1.0 (broken)\n")?;

  let stages: Vec<Arc<dyn ReleaseStage>> =
    vec![Arc::new(FlakyStage::new("publish", true, codes::NETWORK_ERROR, 99))];
  let mut workflow = ReleaseWorkflow::new("wf-rollback", vec!["publish".into()]);
  let mut coordinator = RollbackCoordinator::new();
  coordinator.save_state(ComponentState::Changelog(ChangelogSnapshot {
    path: changelog.clone(),
    content: "# Changelog\n".into(),
  }));

  let outcome = pipeline.run(&mut workflow, &stages, &ComponentHandles::default(), &mut coordinator)?;

  assert!(!outcome.completed);
  let halted = outcome.halted.expect("pipeline halted");
  assert_eq!(halted.action, RecoveryAction::Rollback);
  assert_eq!(workflow.state, WorkflowState::Failed);

  let rollback = outcome.rollback.expect("rollback executed");
  assert!(rollback.succeeded);
  assert!(rollback.rolled_back_components.contains(&Component::Changelog));
  assert_eq!(std::fs::read_to_string(&changelog)?, "# Changelog\n");

  // the terminal fault is recorded on the persisted workflow
  let persisted = store.load("wf-rollback")?;
  assert_eq!(persisted.state, WorkflowState::Failed);
  assert!(!persisted.context.errors.is_empty());
  Ok(())
}

#[test]
fn test_partial_failure_halts_for_resume_then_resumes() -> Result<()> {
  let dir = TempDir::new()?;
  let (pipeline, store) = pipeline(&dir)?;

  let stages: Vec<Arc<dyn ReleaseStage>> = vec![Arc::new(PartialStage)];
  let mut workflow = ReleaseWorkflow::new("wf-resume", vec!["publish".into()]);
  let mut coordinator = RollbackCoordinator::new();

  let outcome = pipeline.run(&mut workflow, &stages, &ComponentHandles::default(), &mut coordinator)?;

  assert!(!outcome.completed);
  assert_eq!(outcome.halted.unwrap().action, RecoveryAction::Resume);
  assert_eq!(store.load("wf-resume")?.state, WorkflowState::Failed);

  // resuming re-enters the failed stage, which picks up its checkpoint
  let resumed = pipeline.resume("wf-resume", &stages, &ComponentHandles::default(), &mut coordinator)?;
  assert!(resumed.completed);
  assert_eq!(store.load("wf-resume")?.state, WorkflowState::Completed);
  Ok(())
}

#[test]
fn test_missing_stage_implementation_is_an_error() -> Result<()> {
  let dir = TempDir::new()?;
  let (pipeline, _store) = pipeline(&dir)?;

  let stages: Vec<Arc<dyn ReleaseStage>> = vec![Arc::new(FlakyStage::reliable("bump"))];
  let mut workflow = ReleaseWorkflow::new("wf-missing", vec!["bump".into(), "mystery".into()]);
  let mut coordinator = RollbackCoordinator::new();

  let err = pipeline
    .run(&mut workflow, &stages, &ComponentHandles::default(), &mut coordinator)
    .unwrap_err();
  assert!(err.to_string().contains("mystery"));
  Ok(())
}
