//! Release fault classification
//!
//! Maps a [`ReleaseError`] to one of three kinds (transient, partial,
//! permanent) with a confidence score and a recommended recovery action.
//! Classification is a pure function of the fault's code and message: the
//! same fault always classifies the same way, and callers re-classify after
//! every failed attempt because the *underlying* problem can surface under a
//! different code between attempts (a timeout on attempt 1, an auth failure
//! on attempt 2).

use crate::core::error::ReleaseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known fault codes
pub mod codes {
  pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
  pub const TIMEOUT: &str = "TIMEOUT";
  pub const RATE_LIMIT: &str = "RATE_LIMIT";
  pub const SERVICE_UNAVAILABLE: &str = "SERVICE_UNAVAILABLE";
  pub const CONNECTION_REFUSED: &str = "CONNECTION_REFUSED";
  pub const CONNECTION_RESET: &str = "CONNECTION_RESET";
  pub const DNS_NOT_FOUND: &str = "DNS_NOT_FOUND";

  pub const PARTIAL_SUCCESS: &str = "PARTIAL_SUCCESS";
  pub const PARTIAL_FAILURE: &str = "PARTIAL_FAILURE";
  pub const INCOMPLETE_OPERATION: &str = "INCOMPLETE_OPERATION";

  pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
  pub const AUTH_FAILED: &str = "AUTH_FAILED";
  pub const STAGE_FAILED: &str = "STAGE_FAILED";
  pub const ROLLBACK_FAILED: &str = "ROLLBACK_FAILED";
  pub const ROLLBACK_TIMEOUT: &str = "ROLLBACK_TIMEOUT";
}

/// Codes that indicate a fault expected to clear on retry
const TRANSIENT_CODES: &[&str] = &[
  codes::NETWORK_ERROR,
  codes::TIMEOUT,
  codes::RATE_LIMIT,
  codes::SERVICE_UNAVAILABLE,
  codes::CONNECTION_REFUSED,
  codes::CONNECTION_RESET,
  codes::DNS_NOT_FOUND,
];

/// Message fragments that indicate a transient fault
const TRANSIENT_KEYWORDS: &[&str] = &[
  "timeout",
  "network",
  "connection",
  "unavailable",
  "rate limit",
  "too many requests",
  "temporary",
  "retry",
];

/// Codes that indicate partial completion
const PARTIAL_CODES: &[&str] = &[
  codes::PARTIAL_SUCCESS,
  codes::PARTIAL_FAILURE,
  codes::INCOMPLETE_OPERATION,
];

/// Message fragments that indicate partial completion
const PARTIAL_KEYWORDS: &[&str] = &["partial", "incomplete", "some succeeded", "some failed"];

/// Fault kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
  /// Expected to succeed if retried unchanged
  Transient,
  /// Will not succeed on retry; needs human action
  Permanent,
  /// Some sub-operations succeeded before failure
  Partial,
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ErrorKind::Transient => write!(f, "transient"),
      ErrorKind::Permanent => write!(f, "permanent"),
      ErrorKind::Partial => write!(f, "partial"),
    }
  }
}

/// Recovery verb recommended by classification or decided by policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryAction {
  Retry,
  Skip,
  Rollback,
  Manual,
  Resume,
}

impl fmt::Display for RecoveryAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RecoveryAction::Retry => write!(f, "retry"),
      RecoveryAction::Skip => write!(f, "skip"),
      RecoveryAction::Rollback => write!(f, "rollback"),
      RecoveryAction::Manual => write!(f, "manual"),
      RecoveryAction::Resume => write!(f, "resume"),
    }
  }
}

/// Result of classifying a release fault
///
/// Derived, never persisted; recomputed from the fault each time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorClassification {
  pub kind: ErrorKind,
  pub recoverable: bool,
  pub recommended_action: RecoveryAction,
  pub confidence: f64,
  pub reasoning: String,
}

/// Classify a release fault
///
/// Rules evaluate in order, first match wins:
/// 1. transient code or keyword → transient (retry, 0.9)
/// 2. partial code or keyword → partial (resume, 0.8)
/// 3. everything else → permanent (manual, 0.95, not recoverable)
pub fn classify(error: &ReleaseError) -> ErrorClassification {
  let message = error.message.to_lowercase();

  if is_transient(&error.code, &message) {
    return ErrorClassification {
      kind: ErrorKind::Transient,
      recoverable: true,
      recommended_action: RecoveryAction::Retry,
      confidence: 0.9,
      reasoning: "Fault appears temporary and may succeed on retry".to_string(),
    };
  }

  if is_partial(&error.code, &message) {
    return ErrorClassification {
      kind: ErrorKind::Partial,
      recoverable: true,
      recommended_action: RecoveryAction::Resume,
      confidence: 0.8,
      reasoning: "Partial completion detected, can resume from checkpoint".to_string(),
    };
  }

  ErrorClassification {
    kind: ErrorKind::Permanent,
    recoverable: false,
    recommended_action: RecoveryAction::Manual,
    confidence: 0.95,
    reasoning: "Fault requires manual intervention to resolve".to_string(),
  }
}

fn is_transient(code: &str, message: &str) -> bool {
  TRANSIENT_CODES.contains(&code) || TRANSIENT_KEYWORDS.iter().any(|kw| message.contains(kw))
}

fn is_partial(code: &str, message: &str) -> bool {
  PARTIAL_CODES.contains(&code) || PARTIAL_KEYWORDS.iter().any(|kw| message.contains(kw))
}
