//! Progress/warning observer injected into the recovery engine
//!
//! The engine never prints: retry attempts, rollback steps, and best-effort
//! persistence warnings are reported through this trait, and the CLI layer
//! decides how to render them (see `ui::ConsoleObserver`).

use crate::core::error::ReleaseError;
use crate::rollback::Component;
use std::time::Duration;

/// Receives progress events from the retry executor and rollback coordinator
pub trait RecoveryObserver: Send + Sync {
  /// An attempt is about to run, after sleeping `delay`
  fn attempt_started(&self, _step: &str, _attempt: u32, _delay: Duration) {}

  /// An attempt failed with the given (already normalized) fault
  fn attempt_failed(&self, _step: &str, _attempt: u32, _error: &ReleaseError) {}

  /// A component compensation finished
  fn component_rolled_back(&self, _component: Component, _succeeded: bool) {}

  /// A non-fatal problem occurred (e.g. best-effort persistence failed)
  fn warn(&self, _message: &str) {}
}

/// Observer that discards all events (the library default)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl RecoveryObserver for NullObserver {}
