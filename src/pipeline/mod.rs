//! Release pipeline execution
//!
//! Ties the recovery engine together: stages run strictly in sequence, each
//! stage's operation is wrapped by the retry executor, successful stages are
//! checkpointed, and when a stage exhausts its budget the recovery policy
//! decides what happens next: skip it, halt for resume, roll back completed
//! work, or stop for manual intervention. Workflow state is persisted after
//! every stage so a crashed release resumes exactly where it stopped.

use crate::core::error::{RelayError, RelayResult, ReleaseError};
use crate::recovery::checkpoint::CheckpointStore;
use crate::recovery::classify::{codes, RecoveryAction};
use crate::recovery::policy::{determine_recovery_action, RecoveryContext};
use crate::recovery::retry::{OperationError, RetryContext, RetryExecutor};
use crate::rollback::{ComponentHandles, RollbackCoordinator, RollbackOptions, RollbackOutcome};
use crate::workflow::state::{ReleaseWorkflow, WorkflowState};
use crate::workflow::store::WorkflowStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// One stage of a release pipeline
///
/// Stages must be safe to re-run: the retry executor re-invokes them on
/// transient failure, and a resumed workflow re-enters its failed stage. A
/// stage consults `StageContext::checkpoint` to skip work it already did.
pub trait ReleaseStage: Send + Sync {
  /// Stage name; also the workflow's stage-sequence entry
  fn name(&self) -> &str;

  /// Critical stages roll back on exhausted retries; others are skipped
  fn critical(&self) -> bool {
    false
  }

  /// Fault code applied to errors that carry none of their own
  fn fallback_code(&self) -> &str {
    codes::STAGE_FAILED
  }

  /// Execute the stage; the returned value becomes its checkpoint payload
  fn run(&self, cx: &StageContext) -> Result<serde_json::Value, OperationError>;
}

/// Per-stage execution context handed to [`ReleaseStage::run`]
pub struct StageContext {
  pub workflow_id: String,

  /// Namespaced checkpoint key for this stage (`<workflow-id>/<stage>`)
  pub stage_key: String,

  /// Most recent checkpoint for this stage, when resuming partial progress
  pub checkpoint: Option<serde_json::Value>,

  /// Store for recording intra-stage partial progress
  pub checkpoints: Arc<CheckpointStore>,
}

/// Disposition of one stage after the pipeline processed it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
  Completed,
  Skipped,
}

/// Summary of one processed stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
  pub stage: String,
  pub status: StageStatus,
  pub attempts: u32,
}

/// Why the pipeline stopped before completing every stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HaltReason {
  pub stage: String,
  pub action: RecoveryAction,
  pub error: ReleaseError,
}

/// Result of one pipeline run
#[derive(Debug)]
pub struct PipelineOutcome {
  /// Whether every stage completed (or was skipped) and the workflow is done
  pub completed: bool,
  pub stage_reports: Vec<StageReport>,
  pub halted: Option<HaltReason>,
  pub rollback: Option<RollbackOutcome>,
}

/// Drives a release workflow through its stages
pub struct ReleasePipeline {
  executor: RetryExecutor,
  checkpoints: Arc<CheckpointStore>,
  store: Arc<WorkflowStore>,
  rollback_options: RollbackOptions,
}

impl ReleasePipeline {
  pub fn new(store: Arc<WorkflowStore>) -> Self {
    Self {
      executor: RetryExecutor::default(),
      checkpoints: Arc::new(CheckpointStore::new()),
      store,
      rollback_options: RollbackOptions::default(),
    }
  }

  pub fn with_executor(mut self, executor: RetryExecutor) -> Self {
    self.executor = executor;
    self
  }

  pub fn with_checkpoints(mut self, checkpoints: Arc<CheckpointStore>) -> Self {
    self.checkpoints = checkpoints;
    self
  }

  /// Options applied when a failed stage triggers rollback
  pub fn with_rollback_options(mut self, options: RollbackOptions) -> Self {
    self.rollback_options = options;
    self
  }

  /// The checkpoint store shared with stages
  pub fn checkpoints(&self) -> &Arc<CheckpointStore> {
    &self.checkpoints
  }

  /// Run a pending workflow from its first stage
  pub fn run(
    &self,
    workflow: &mut ReleaseWorkflow,
    stages: &[Arc<dyn ReleaseStage>],
    handles: &ComponentHandles<'_>,
    coordinator: &mut RollbackCoordinator,
  ) -> RelayResult<PipelineOutcome> {
    workflow.begin()?;
    self.store.save(workflow)?;
    self.drive(workflow, stages, handles, coordinator)
  }

  /// Resume a failed workflow at its recorded stage position
  pub fn resume(
    &self,
    workflow_id: &str,
    stages: &[Arc<dyn ReleaseStage>],
    handles: &ComponentHandles<'_>,
    coordinator: &mut RollbackCoordinator,
  ) -> RelayResult<PipelineOutcome> {
    let mut workflow = self.store.load(workflow_id)?;
    workflow.resume()?;
    self.store.save(&workflow)?;

    // Rebuild coordinator state from the persisted copy, if one was saved.
    if let Some(saved) = workflow.context.rollback_state.clone() {
      coordinator.load_state(saved);
    }

    self.drive(&mut workflow, stages, handles, coordinator)
  }

  fn drive(
    &self,
    workflow: &mut ReleaseWorkflow,
    stages: &[Arc<dyn ReleaseStage>],
    handles: &ComponentHandles<'_>,
    coordinator: &mut RollbackCoordinator,
  ) -> RelayResult<PipelineOutcome> {
    let mut reports = Vec::new();
    let mut cumulative_attempts: HashMap<String, u32> = HashMap::new();

    while let Some(stage_name) = workflow.current_stage_name().map(str::to_string) {
      let stage = stages
        .iter()
        .find(|s| s.name() == stage_name)
        .ok_or_else(|| RelayError::message(format!("No implementation for stage '{}'", stage_name)))?;

      let stage_key = format!("{}/{}", workflow.id, stage_name);
      let context = Arc::new(StageContext {
        workflow_id: workflow.id.clone(),
        stage_key: stage_key.clone(),
        checkpoint: self.checkpoints.most_recent(&stage_key).map(|cp| cp.payload),
        checkpoints: Arc::clone(&self.checkpoints),
      });

      let stage_for_run = Arc::clone(stage);
      let context_for_run = Arc::clone(&context);
      let outcome = self.executor.execute(
        move || stage_for_run.run(&context_for_run),
        RetryContext::new(stage_name.as_str(), stage.fallback_code()),
      );

      let attempts_made = outcome.attempts.len() as u32;
      let total_attempts = cumulative_attempts
        .entry(stage_name.clone())
        .and_modify(|n| *n += attempts_made)
        .or_insert(attempts_made);

      if outcome.succeeded {
        let payload = outcome.result.unwrap_or(serde_json::Value::Null);
        self.checkpoints.create(&stage_key, payload);
        reports.push(StageReport {
          stage: stage_name,
          status: StageStatus::Completed,
          attempts: attempts_made,
        });
        workflow.advance();
        self.store.save(workflow)?;
        continue;
      }

      let terminal = outcome
        .terminal_error
        .clone()
        .unwrap_or_else(|| ReleaseError::new(stage.fallback_code(), "stage failed without an error").in_step(stage_name.as_str()));

      let action = determine_recovery_action(
        &terminal,
        &RecoveryContext {
          stage: stage_name.clone(),
          attempt_number: *total_attempts,
          has_checkpoint: self.checkpoints.has_checkpoint(&stage_key),
          critical_operation: stage.critical(),
        },
        self.executor.strategies(),
      );

      match action {
        // Budget remains per the policy table (a narrower per-call strategy
        // exhausted first). Run the same stage again; attempts accumulate,
        // so this converges on the table budget.
        RecoveryAction::Retry => continue,

        RecoveryAction::Skip => {
          workflow
            .context
            .warnings
            .push(format!("stage '{}' skipped after {} attempts: {}", stage_name, total_attempts, terminal));
          reports.push(StageReport {
            stage: stage_name,
            status: StageStatus::Skipped,
            attempts: attempts_made,
          });
          workflow.advance();
          self.store.save(workflow)?;
          continue;
        }

        RecoveryAction::Resume | RecoveryAction::Manual => {
          workflow.fail(terminal.clone())?;
          self.store.save(workflow)?;
          return Ok(PipelineOutcome {
            completed: false,
            stage_reports: reports,
            halted: Some(HaltReason {
              stage: stage_name,
              action,
              error: terminal,
            }),
            rollback: None,
          });
        }

        RecoveryAction::Rollback => {
          let rollback = coordinator.execute_rollback(handles, &self.rollback_options)?;
          workflow.fail(terminal.clone())?;
          self.store.save(workflow)?;
          return Ok(PipelineOutcome {
            completed: false,
            stage_reports: reports,
            halted: Some(HaltReason {
              stage: stage_name,
              action,
              error: terminal,
            }),
            rollback: Some(rollback),
          });
        }
      }
    }

    if workflow.state == WorkflowState::InProgress {
      workflow.complete()?;
      self.store.save(workflow)?;
      self.checkpoints.clear_prefix(&format!("{}/", workflow.id));
    }

    Ok(PipelineOutcome {
      completed: workflow.state == WorkflowState::Completed,
      stage_reports: reports,
      halted: None,
      rollback: None,
    })
  }
}
