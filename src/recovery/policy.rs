//! Recovery action decision table
//!
//! Combines a fault's classification with execution context (attempt count,
//! checkpoint presence, stage criticality) into one recovery verb. Pure
//! decision logic; no I/O, no mutation; the caller acts on the returned verb.

use crate::core::error::ReleaseError;
use crate::recovery::classify::{classify, ErrorKind, RecoveryAction};
use crate::recovery::strategy::StrategyTable;

/// Execution context feeding the decision
#[derive(Debug, Clone)]
pub struct RecoveryContext {
  /// Stage the fault surfaced in
  pub stage: String,

  /// Attempts already made against this stage
  pub attempt_number: u32,

  /// Whether a checkpoint exists to resume from
  pub has_checkpoint: bool,

  /// Whether the stage's side effects warrant rollback over skipping
  pub critical_operation: bool,
}

/// Decide the recovery action for a fault in context
///
/// Decision order:
/// 1. permanent → manual (no automatic path exists)
/// 2. partial with a checkpoint → resume
/// 3. transient: retry while budget remains, then rollback if critical,
///    otherwise skip
/// 4. fallback → manual
pub fn determine_recovery_action(
  error: &ReleaseError,
  context: &RecoveryContext,
  strategies: &StrategyTable,
) -> RecoveryAction {
  let classification = classify(error);

  match classification.kind {
    ErrorKind::Permanent => RecoveryAction::Manual,
    ErrorKind::Partial if context.has_checkpoint => RecoveryAction::Resume,
    ErrorKind::Transient => {
      if context.attempt_number < strategies.transient.max_retries {
        RecoveryAction::Retry
      } else if context.critical_operation {
        RecoveryAction::Rollback
      } else {
        RecoveryAction::Skip
      }
    }
    _ => RecoveryAction::Manual,
  }
}
