//! Stage progress checkpoints
//!
//! Append-only store of per-stage snapshots. A stage records a checkpoint on
//! successful partial progress; after a crash or a partial failure the stage
//! resumes from the most recent snapshot instead of starting over. Checkpoints
//! are never mutated; a stage supersedes its own progress by writing a newer
//! one, and the whole store is cleared explicitly on release completion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Mutex;

/// Checkpoint identifier, derived from stage name and creation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointId(String);

impl CheckpointId {
  fn derive(stage: &str, created_at: DateTime<Utc>, seq: u64) -> Self {
    let mut hasher = Sha256::new();
    hasher.update(stage.as_bytes());
    hasher.update(created_at.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    hasher.update(seq.to_le_bytes());
    Self(format!("{:x}", hasher.finalize()))
  }

  /// Short form (first 12 characters)
  pub fn short(&self) -> &str {
    &self.0[..12.min(self.0.len())]
  }
}

impl fmt::Display for CheckpointId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.short())
  }
}

/// One stage progress snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
  pub id: CheckpointId,
  pub stage: String,
  /// Opaque stage-defined progress data
  pub payload: serde_json::Value,
  pub created_at: DateTime<Utc>,
  /// Creation order tiebreaker for identical timestamps
  seq: u64,
}

#[derive(Default)]
struct StoreInner {
  entries: Vec<Checkpoint>,
  next_seq: u64,
}

/// Thread-safe, append-only checkpoint store
///
/// Multiple releases may checkpoint concurrently; entries are keyed by stage
/// name, so independent workflows should namespace their stage names (the
/// pipeline uses `<workflow-id>/<stage>`).
#[derive(Default)]
pub struct CheckpointStore {
  inner: Mutex<StoreInner>,
}

impl CheckpointStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record a snapshot for a stage; always succeeds and returns the new entry
  pub fn create(&self, stage: &str, payload: serde_json::Value) -> Checkpoint {
    let mut inner = self.inner.lock().unwrap();
    let created_at = Utc::now();
    let seq = inner.next_seq;
    inner.next_seq += 1;

    let checkpoint = Checkpoint {
      id: CheckpointId::derive(stage, created_at, seq),
      stage: stage.to_string(),
      payload,
      created_at,
      seq,
    };
    inner.entries.push(checkpoint.clone());
    checkpoint
  }

  /// Most recently created snapshot for a stage, if any
  pub fn most_recent(&self, stage: &str) -> Option<Checkpoint> {
    let inner = self.inner.lock().unwrap();
    inner
      .entries
      .iter()
      .filter(|cp| cp.stage == stage)
      .max_by_key(|cp| (cp.created_at, cp.seq))
      .cloned()
  }

  /// Whether any snapshot exists for a stage
  pub fn has_checkpoint(&self, stage: &str) -> bool {
    self.inner.lock().unwrap().entries.iter().any(|cp| cp.stage == stage)
  }

  /// Number of retained snapshots across all stages
  pub fn len(&self) -> usize {
    self.inner.lock().unwrap().entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Drop all snapshots (e.g. on release completion)
  pub fn clear(&self) {
    self.inner.lock().unwrap().entries.clear();
  }

  /// Drop snapshots whose stage name starts with `prefix`
  ///
  /// The pipeline namespaces stage names as `<workflow-id>/<stage>`, so one
  /// workflow's completion clears its own checkpoints without touching
  /// concurrent releases.
  pub fn clear_prefix(&self, prefix: &str) {
    self.inner.lock().unwrap().entries.retain(|cp| !cp.stage.starts_with(prefix));
  }
}
