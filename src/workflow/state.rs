//! Release workflow lifecycle
//!
//! The persisted record tying a release attempt to its stage sequence,
//! current position, and terminal outcome. Legal transitions:
//!
//! ```text
//! pending → in-progress → { completed | failed }
//! failed  → in-progress   (explicit resume only, by workflow id)
//! ```
//!
//! Completed and pending workflows cannot be resumed; a resumed workflow
//! re-enters at its recorded stage position, not from the beginning.

use crate::core::error::{RelayError, RelayResult, ReleaseError, WorkflowError};
use crate::rollback::{Component, ComponentState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle state of a release workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowState {
  Pending,
  InProgress,
  Completed,
  Failed,
}

impl WorkflowState {
  /// Whether the workflow has reached a terminal state
  pub fn is_terminal(&self) -> bool {
    matches!(self, WorkflowState::Completed | WorkflowState::Failed)
  }

  fn can_transition_to(&self, next: WorkflowState) -> bool {
    matches!(
      (self, next),
      (WorkflowState::Pending, WorkflowState::InProgress)
        | (WorkflowState::InProgress, WorkflowState::Completed)
        | (WorkflowState::InProgress, WorkflowState::Failed)
        | (WorkflowState::Failed, WorkflowState::InProgress)
    )
  }
}

impl fmt::Display for WorkflowState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      WorkflowState::Pending => write!(f, "pending"),
      WorkflowState::InProgress => write!(f, "in-progress"),
      WorkflowState::Completed => write!(f, "completed"),
      WorkflowState::Failed => write!(f, "failed"),
    }
  }
}

/// Accumulated context carried by a workflow across stages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowContext {
  /// The release plan driving this attempt, if any
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub plan: Option<serde_json::Value>,

  /// Faults accumulated across stages
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub errors: Vec<ReleaseError>,

  /// Warnings accumulated across stages (e.g. skipped non-critical stages)
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub warnings: Vec<String>,

  /// Durable copy of the rollback coordinator's saved state
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rollback_state: Option<BTreeMap<Component, ComponentState>>,
}

/// One release attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseWorkflow {
  pub id: String,
  pub state: WorkflowState,

  /// Stage names in execution order
  pub stages: Vec<String>,

  /// Index of the stage currently (or next) being executed
  pub current_stage: usize,

  pub started_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub completed_at: Option<DateTime<Utc>>,

  #[serde(default)]
  pub context: WorkflowContext,
}

impl ReleaseWorkflow {
  /// Create a pending workflow over the given stage sequence
  pub fn new(id: impl Into<String>, stages: Vec<String>) -> Self {
    let now = Utc::now();
    Self {
      id: id.into(),
      state: WorkflowState::Pending,
      stages,
      current_stage: 0,
      started_at: now,
      updated_at: now,
      completed_at: None,
      context: WorkflowContext::default(),
    }
  }

  /// Derive a workflow id from the stage sequence and creation time
  pub fn derive_id(stages: &[String], created_at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    for stage in stages {
      hasher.update(stage.as_bytes());
      hasher.update([0]);
    }
    hasher.update(created_at.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("wf-{}", &digest[..12])
  }

  /// Name of the stage at the current position, if any remain
  pub fn current_stage_name(&self) -> Option<&str> {
    self.stages.get(self.current_stage).map(String::as_str)
  }

  /// Advance past the current stage
  pub fn advance(&mut self) {
    self.current_stage += 1;
    self.updated_at = Utc::now();
  }

  /// Transition to a new lifecycle state, enforcing legality
  pub fn transition(&mut self, next: WorkflowState) -> RelayResult<()> {
    if !self.state.can_transition_to(next) {
      return Err(RelayError::Workflow(WorkflowError::InvalidTransition {
        id: self.id.clone(),
        from: self.state.to_string(),
        to: next.to_string(),
      }));
    }

    self.state = next;
    self.updated_at = Utc::now();
    if next.is_terminal() {
      self.completed_at = Some(self.updated_at);
    }
    Ok(())
  }

  /// pending → in-progress
  pub fn begin(&mut self) -> RelayResult<()> {
    self.transition(WorkflowState::InProgress)
  }

  /// in-progress → completed
  pub fn complete(&mut self) -> RelayResult<()> {
    self.transition(WorkflowState::Completed)
  }

  /// in-progress → failed, recording the terminal fault
  pub fn fail(&mut self, error: ReleaseError) -> RelayResult<()> {
    self.context.errors.push(error);
    self.transition(WorkflowState::Failed)
  }

  /// failed → in-progress, re-entering at the recorded stage position
  ///
  /// Any other starting state is an error: completed and pending workflows
  /// cannot be resumed.
  pub fn resume(&mut self) -> RelayResult<()> {
    if self.state != WorkflowState::Failed {
      return Err(RelayError::Workflow(WorkflowError::NotResumable {
        id: self.id.clone(),
        state: self.state.to_string(),
      }));
    }

    self.completed_at = None;
    self.transition(WorkflowState::InProgress)
  }
}
