//! Terminal rendering for the CLI layer
//!
//! The engine itself never prints; `ConsoleObserver` turns its events into
//! the emoji-prefixed lines the commands use, and `progress` wraps `linya`
//! bars for bulk file operations.

pub mod progress;

use crate::core::error::ReleaseError;
use crate::core::observer::RecoveryObserver;
use crate::rollback::Component;
use std::time::Duration;

pub use progress::FileProgress;

/// Observer that renders engine events to the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleObserver;

impl RecoveryObserver for ConsoleObserver {
  fn attempt_started(&self, step: &str, attempt: u32, delay: Duration) {
    if attempt > 1 {
      println!(
        "   🔁 Retrying {} (attempt {}, waited {:.1}s)",
        step,
        attempt,
        delay.as_secs_f64()
      );
    }
  }

  fn attempt_failed(&self, step: &str, attempt: u32, error: &ReleaseError) {
    eprintln!("   ⚠️  {} attempt {} failed: {}", step, attempt, error);
  }

  fn component_rolled_back(&self, component: Component, succeeded: bool) {
    if succeeded {
      println!("   ✅ Rolled back {}", component);
    } else {
      eprintln!("   ❌ Failed to roll back {}", component);
    }
  }

  fn warn(&self, message: &str) {
    eprintln!("   ⚠️  {}", message);
  }
}
