//! Retry execution with backoff, per-attempt timeouts, and re-classification
//!
//! [`RetryExecutor::execute`] runs an operation under a [`RetryStrategy`]:
//! it sleeps the computed backoff before each retry, races every attempt
//! against the strategy's timeout, normalizes whatever the operation failed
//! with into a [`ReleaseError`], and re-classifies after each failure so a
//! fault that turns permanent mid-sequence stops the loop early.
//!
//! Retries are plain re-invocations: the executor assumes the operation is
//! safe to re-run (idempotent or self-guarding) and does not deduplicate side
//! effects. A timed-out attempt is abandoned, not cancelled; the underlying
//! work may still complete in the background; its result is discarded.

use crate::core::error::ReleaseError;
use crate::core::observer::{NullObserver, RecoveryObserver};
use crate::recovery::classify::{classify, codes, ErrorKind, RecoveryAction};
use crate::recovery::strategy::{RetryStrategy, StrategyTable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// A fault raised by an operation before normalization
///
/// This is the single trust boundary for arbitrary error values: whatever an
/// operation fails with becomes a [`ReleaseError`] through
/// [`OperationError::normalize`], and nothing downstream ever inspects raw
/// error objects again.
#[derive(Debug)]
pub enum OperationError {
  /// Already shaped; passed through verbatim
  Release(ReleaseError),

  /// I/O fault; the error kind supplies the code when it maps to a known class
  Io(io::Error),

  /// Any other error value; the caller-supplied fallback code applies
  Other(Box<dyn std::error::Error + Send + Sync>),

  /// Bare message; the caller-supplied fallback code applies
  Message(String),
}

impl OperationError {
  /// Normalize into a [`ReleaseError`], tagging the fault with the step and
  /// falling back to the context code when the value carries none of its own
  pub fn normalize(self, context: &RetryContext) -> ReleaseError {
    match self {
      OperationError::Release(err) => err,
      OperationError::Io(err) => {
        let code = io_fault_code(err.kind()).unwrap_or(&context.code);
        ReleaseError::new(code, err.to_string()).in_step(context.step.as_str())
      }
      OperationError::Other(err) => ReleaseError::new(context.code.as_str(), err.to_string()).in_step(context.step.as_str()),
      OperationError::Message(message) => ReleaseError::new(context.code.as_str(), message).in_step(context.step.as_str()),
    }
  }
}

impl From<ReleaseError> for OperationError {
  fn from(err: ReleaseError) -> Self {
    OperationError::Release(err)
  }
}

impl From<io::Error> for OperationError {
  fn from(err: io::Error) -> Self {
    OperationError::Io(err)
  }
}

impl From<String> for OperationError {
  fn from(message: String) -> Self {
    OperationError::Message(message)
  }
}

impl From<&str> for OperationError {
  fn from(message: &str) -> Self {
    OperationError::Message(message.to_string())
  }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for OperationError {
  fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
    OperationError::Other(err)
  }
}

/// Map I/O error kinds onto the well-known fault codes
fn io_fault_code(kind: io::ErrorKind) -> Option<&'static str> {
  match kind {
    io::ErrorKind::TimedOut => Some(codes::TIMEOUT),
    io::ErrorKind::ConnectionRefused => Some(codes::CONNECTION_REFUSED),
    io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted | io::ErrorKind::BrokenPipe => {
      Some(codes::CONNECTION_RESET)
    }
    io::ErrorKind::NotConnected | io::ErrorKind::AddrNotAvailable => Some(codes::NETWORK_ERROR),
    _ => None,
  }
}

/// Caller context for one retry sequence
#[derive(Debug, Clone)]
pub struct RetryContext {
  /// Pipeline step being executed (used for strategy selection and tagging)
  pub step: String,

  /// Fallback fault code for errors that carry none of their own
  pub code: String,
}

impl RetryContext {
  pub fn new(step: impl Into<String>, code: impl Into<String>) -> Self {
    Self {
      step: step.into(),
      code: code.into(),
    }
  }
}

/// Record of one attempt; append-only, never mutated after creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryAttempt {
  /// 1-based attempt number
  pub attempt_number: u32,
  pub succeeded: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<ReleaseError>,
  /// Backoff slept before this attempt (zero for the first)
  pub delay: Duration,
  pub timestamp: DateTime<Utc>,
}

/// Aggregated result of one retry sequence
#[derive(Debug)]
pub struct RetryOutcome<T> {
  pub succeeded: bool,

  /// On success: `Retry` (the verb that produced the value). On exhaustion:
  /// the recommended action from the initial classification.
  pub action_taken: RecoveryAction,

  pub attempts: Vec<RetryAttempt>,

  /// The last normalized fault, when the sequence failed
  pub terminal_error: Option<ReleaseError>,

  pub total_duration: Duration,

  /// Retries consumed (0 when the first attempt succeeded)
  pub retries_used: u32,

  pub max_retries_allowed: u32,

  /// Sum of all backoff delays actually slept
  pub total_delay: Duration,

  pub result: Option<T>,
}

impl<T> RetryOutcome<T> {
  /// The fault kind of the terminal error, if the sequence failed
  pub fn terminal_kind(&self) -> Option<ErrorKind> {
    self.terminal_error.as_ref().map(|e| classify(e).kind)
  }
}

/// Runs operations under a retry strategy
pub struct RetryExecutor {
  strategies: StrategyTable,
  observer: Arc<dyn RecoveryObserver>,
}

impl Default for RetryExecutor {
  fn default() -> Self {
    Self::new(StrategyTable::default())
  }
}

impl RetryExecutor {
  pub fn new(strategies: StrategyTable) -> Self {
    Self {
      strategies,
      observer: Arc::new(NullObserver),
    }
  }

  /// Attach an observer for attempt-level progress events
  pub fn with_observer(mut self, observer: Arc<dyn RecoveryObserver>) -> Self {
    self.observer = observer;
    self
  }

  /// The strategy table in use
  pub fn strategies(&self) -> &StrategyTable {
    &self.strategies
  }

  /// Mutable access for runtime overrides
  pub fn strategies_mut(&mut self) -> &mut StrategyTable {
    &mut self.strategies
  }

  /// Execute under the table entry selected by classifying the context code
  pub fn execute<T, F>(&self, operation: F, context: RetryContext) -> RetryOutcome<T>
  where
    T: Send + 'static,
    F: Fn() -> Result<T, OperationError> + Send + Sync + 'static,
  {
    let kind = classify(&ReleaseError::new(context.code.as_str(), "").in_step(context.step.as_str())).kind;
    let strategy = self.strategies.get(kind).clone();
    self.execute_with_strategy(operation, context, &strategy)
  }

  /// Execute under an explicit strategy override
  pub fn execute_with_strategy<T, F>(
    &self,
    operation: F,
    context: RetryContext,
    strategy: &RetryStrategy,
  ) -> RetryOutcome<T>
  where
    T: Send + 'static,
    F: Fn() -> Result<T, OperationError> + Send + Sync + 'static,
  {
    let started = Instant::now();
    let operation = Arc::new(operation);
    let initial = classify(&ReleaseError::new(context.code.as_str(), "").in_step(context.step.as_str()));

    let mut attempts: Vec<RetryAttempt> = Vec::new();
    let mut last_error: Option<ReleaseError> = None;

    for attempt in 0..=strategy.max_retries {
      let delay = strategy.delay_for_attempt(attempt);
      if !delay.is_zero() {
        thread::sleep(delay);
      }

      self.observer.attempt_started(&context.step, attempt + 1, delay);

      match run_attempt(&operation, strategy.attempt_timeout) {
        Ok(value) => {
          attempts.push(RetryAttempt {
            attempt_number: attempt + 1,
            succeeded: true,
            error: None,
            delay,
            timestamp: Utc::now(),
          });

          let total_delay = total_delay(&attempts);
          return RetryOutcome {
            succeeded: true,
            action_taken: RecoveryAction::Retry,
            attempts,
            terminal_error: None,
            total_duration: started.elapsed(),
            retries_used: attempt,
            max_retries_allowed: strategy.max_retries,
            total_delay,
            result: Some(value),
          };
        }
        Err(err) => {
          let normalized = err.normalize(&context);
          self.observer.attempt_failed(&context.step, attempt + 1, &normalized);

          attempts.push(RetryAttempt {
            attempt_number: attempt + 1,
            succeeded: false,
            error: Some(normalized.clone()),
            delay,
            timestamp: Utc::now(),
          });

          // Re-classify after every failure: a fault that turns permanent
          // mid-sequence must stop the loop regardless of remaining budget.
          let reclassified = classify(&normalized);
          last_error = Some(normalized);

          if reclassified.kind == ErrorKind::Permanent {
            break;
          }
        }
      }
    }

    let total_delay = total_delay(&attempts);
    let retries_used = attempts.len().saturating_sub(1) as u32;
    RetryOutcome {
      succeeded: false,
      action_taken: initial.recommended_action,
      attempts,
      terminal_error: last_error,
      total_duration: started.elapsed(),
      retries_used,
      max_retries_allowed: strategy.max_retries,
      total_delay,
      result: None,
    }
  }
}

fn total_delay(attempts: &[RetryAttempt]) -> Duration {
  attempts.iter().map(|a| a.delay).sum()
}

/// Run one attempt, racing it against the timeout if one is set
///
/// The operation runs on a spawned thread; when the deadline fires first, the
/// receiver is dropped and the thread's eventual send goes nowhere.
fn run_attempt<T, F>(operation: &Arc<F>, timeout: Option<Duration>) -> Result<T, OperationError>
where
  T: Send + 'static,
  F: Fn() -> Result<T, OperationError> + Send + Sync + 'static,
{
  let Some(limit) = timeout else {
    return (**operation)();
  };

  let (tx, rx) = mpsc::channel();
  let op = Arc::clone(operation);
  thread::spawn(move || {
    let _ = tx.send((*op)());
  });

  match rx.recv_timeout(limit) {
    Ok(result) => result,
    Err(RecvTimeoutError::Timeout) => Err(OperationError::Release(ReleaseError::new(
      codes::TIMEOUT,
      format!("operation timed out after {:.1}s", limit.as_secs_f64()),
    ))),
    Err(RecvTimeoutError::Disconnected) => {
      Err(OperationError::Message("operation aborted without a result".to_string()))
    }
  }
}
