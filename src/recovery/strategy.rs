//! Per-kind retry strategies
//!
//! One [`RetryStrategy`] per fault kind, held in a [`StrategyTable`] that the
//! retry executor consults when the caller does not pass an explicit override.
//! Operators can replace individual entries at runtime (or via relay.toml).

use crate::recovery::classify::ErrorKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry configuration for one fault kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryStrategy {
  /// Additional attempts after the first (0 = exactly one attempt)
  pub max_retries: u32,

  /// Delay before the first retry
  pub initial_delay: Duration,

  /// Ceiling on the computed delay; must be >= `initial_delay`
  pub max_delay: Duration,

  /// Growth factor for exponential backoff; must be >= 1.0
  pub backoff_multiplier: f64,

  /// When false, every retry waits exactly `initial_delay`
  pub exponential_backoff: bool,

  /// Deadline raced against each individual attempt
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub attempt_timeout: Option<Duration>,
}

impl RetryStrategy {
  /// Compute the delay before `attempt` (0-based; attempt 0 never waits)
  ///
  /// Exponential shape: `initial_delay * multiplier^(attempt - 1)`, capped at
  /// `max_delay`.
  pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
    if attempt == 0 {
      return Duration::ZERO;
    }

    if !self.exponential_backoff {
      return self.initial_delay;
    }

    let factor = self.backoff_multiplier.powi(attempt as i32 - 1);
    let delay = self.initial_delay.mul_f64(factor);
    delay.min(self.max_delay)
  }

  /// Default strategy for transient faults: 3 retries, 1s → 10s, ×2
  pub fn transient_default() -> Self {
    Self {
      max_retries: 3,
      initial_delay: Duration::from_secs(1),
      max_delay: Duration::from_secs(10),
      backoff_multiplier: 2.0,
      exponential_backoff: true,
      attempt_timeout: Some(Duration::from_secs(30)),
    }
  }

  /// Default strategy for permanent faults: no retries
  pub fn permanent_default() -> Self {
    Self {
      max_retries: 0,
      initial_delay: Duration::ZERO,
      max_delay: Duration::ZERO,
      backoff_multiplier: 1.0,
      exponential_backoff: false,
      attempt_timeout: None,
    }
  }

  /// Default strategy for partial faults: 1 retry, 2s → 5s, ×1.5
  pub fn partial_default() -> Self {
    Self {
      max_retries: 1,
      initial_delay: Duration::from_secs(2),
      max_delay: Duration::from_secs(5),
      backoff_multiplier: 1.5,
      exponential_backoff: true,
      attempt_timeout: Some(Duration::from_secs(60)),
    }
  }
}

/// The per-kind strategy table consulted by the retry executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyTable {
  pub transient: RetryStrategy,
  pub permanent: RetryStrategy,
  pub partial: RetryStrategy,
}

impl StrategyTable {
  /// Get the strategy for a fault kind
  pub fn get(&self, kind: ErrorKind) -> &RetryStrategy {
    match kind {
      ErrorKind::Transient => &self.transient,
      ErrorKind::Permanent => &self.permanent,
      ErrorKind::Partial => &self.partial,
    }
  }

  /// Replace the strategy for a fault kind
  pub fn set(&mut self, kind: ErrorKind, strategy: RetryStrategy) {
    match kind {
      ErrorKind::Transient => self.transient = strategy,
      ErrorKind::Permanent => self.permanent = strategy,
      ErrorKind::Partial => self.partial = strategy,
    }
  }
}

impl Default for StrategyTable {
  fn default() -> Self {
    Self {
      transient: RetryStrategy::transient_default(),
      permanent: RetryStrategy::permanent_default(),
      partial: RetryStrategy::partial_default(),
    }
  }
}
