//! Error types for cargo-relay with contextual messages and exit codes
//!
//! Two error families live here:
//!
//! - [`RelayError`] is the crate-wide error for configuration, workflow state,
//!   and I/O failures. Every error can carry a help message guiding the user
//!   toward resolution.
//! - [`ReleaseError`] is the wire-level release fault consumed by the
//!   classifier and retry executor: a code, a message, a severity, and the
//!   pipeline step it surfaced in. Collaborator operations (registry, release
//!   host, VCS) fail with `ReleaseError` so every fault enters the engine
//!   through one normalization point.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for cargo-relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (git, network, I/O)
  System = 2,
  /// Workflow state error (illegal transition, missing workflow)
  Workflow = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for cargo-relay
#[derive(Debug)]
pub enum RelayError {
  /// Configuration errors
  Config(ConfigError),

  /// Workflow lifecycle errors
  Workflow(WorkflowError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl RelayError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    RelayError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    RelayError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      RelayError::Message { message, context, help } => RelayError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      other => RelayError::Message {
        message: other.to_string(),
        context: Some(ctx_str),
        help: other.help_message(),
      },
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      RelayError::Config(_) => ExitCode::User,
      RelayError::Workflow(_) => ExitCode::Workflow,
      RelayError::Io(_) => ExitCode::System,
      RelayError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      RelayError::Config(e) => e.help_message(),
      RelayError::Workflow(e) => e.help_message(),
      RelayError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for RelayError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RelayError::Config(e) => write!(f, "{}", e),
      RelayError::Workflow(e) => write!(f, "{}", e),
      RelayError::Io(e) => write!(f, "I/O error: {}", e),
      RelayError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for RelayError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      RelayError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for RelayError {
  fn from(err: io::Error) -> Self {
    RelayError::Io(err)
  }
}

impl From<String> for RelayError {
  fn from(msg: String) -> Self {
    RelayError::message(msg)
  }
}

impl From<&str> for RelayError {
  fn from(msg: &str) -> Self {
    RelayError::message(msg)
  }
}

impl From<toml_edit::TomlError> for RelayError {
  fn from(err: toml_edit::TomlError) -> Self {
    RelayError::message(format!("TOML parse error: {}", err))
  }
}

impl From<toml_edit::de::Error> for RelayError {
  fn from(err: toml_edit::de::Error) -> Self {
    RelayError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<toml_edit::ser::Error> for RelayError {
  fn from(err: toml_edit::ser::Error) -> Self {
    RelayError::message(format!("TOML serialization error: {}", err))
  }
}

impl From<serde_json::Error> for RelayError {
  fn from(err: serde_json::Error) -> Self {
    RelayError::message(format!("JSON error: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for RelayError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    RelayError::message(format!("UTF-8 conversion error: {}", err))
  }
}

impl From<anyhow::Error> for RelayError {
  fn from(err: anyhow::Error) -> Self {
    RelayError::message(err.to_string())
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// relay.toml not found
  NotFound { workspace_root: PathBuf },

  /// Missing required field
  MissingField { field: String },

  /// A field failed validation
  Invalid { field: String, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => {
        Some("Create a relay.toml at the workspace root to configure retry and rollback behavior.".to_string())
      }
      ConfigError::Invalid { field, .. } => Some(format!("Fix the '{}' entry in relay.toml and retry.", field)),
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { workspace_root } => {
        write!(
          f,
          "No cargo-relay configuration found.\nExpected file: {}/relay.toml",
          workspace_root.display()
        )
      }
      ConfigError::MissingField { field } => {
        write!(f, "Missing required field in config: {}", field)
      }
      ConfigError::Invalid { field, reason } => {
        write!(f, "Invalid config field '{}': {}", field, reason)
      }
    }
  }
}

/// Workflow lifecycle errors
#[derive(Debug)]
pub enum WorkflowError {
  /// Workflow state file not found
  NotFound { id: String },

  /// Transition not allowed by the lifecycle state machine
  InvalidTransition { id: String, from: String, to: String },

  /// Resume requested for a workflow that is not in the failed state
  NotResumable { id: String, state: String },
}

impl WorkflowError {
  fn help_message(&self) -> Option<String> {
    match self {
      WorkflowError::NotFound { .. } => {
        Some("List persisted workflows with `cargo relay status`.".to_string())
      }
      WorkflowError::NotResumable { state, .. } => Some(format!(
        "Only failed workflows can be resumed (this one is '{}').",
        state
      )),
      _ => None,
    }
  }
}

impl fmt::Display for WorkflowError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      WorkflowError::NotFound { id } => write!(f, "Workflow '{}' not found", id),
      WorkflowError::InvalidTransition { id, from, to } => {
        write!(f, "Workflow '{}': illegal transition {} → {}", id, from, to)
      }
      WorkflowError::NotResumable { id, state } => {
        write!(f, "Workflow '{}' cannot be resumed from state '{}'", id, state)
      }
    }
  }
}

/// Result type alias for cargo-relay
pub type RelayResult<T> = Result<T, RelayError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> RelayResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> RelayResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<RelayError>,
{
  fn context(self, ctx: impl Into<String>) -> RelayResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> RelayResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &RelayError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}

// ============================================================================
// Release faults (wire-level errors from collaborator operations)
// ============================================================================

/// Severity of a release fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Warning,
  Error,
  Critical,
}

/// A fault raised by a release operation
///
/// Every fault entering the recovery engine is a `ReleaseError`: arbitrary
/// error values are converted exactly once, at the retry boundary
/// (`OperationError::normalize`). The `code` drives classification; codes for
/// the well-known fault classes live in [`crate::recovery::codes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseError {
  /// Machine-readable fault code (e.g. `TIMEOUT`, `AUTH_FAILED`)
  pub code: String,

  /// Human-readable description
  pub message: String,

  /// Fault severity
  pub severity: Severity,

  /// Pipeline step the fault surfaced in, if known
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub step: Option<String>,
}

impl ReleaseError {
  /// Create a fault with `Error` severity
  pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      code: code.into(),
      message: message.into(),
      severity: Severity::Error,
      step: None,
    }
  }

  /// Attach the pipeline step the fault surfaced in
  pub fn in_step(mut self, step: impl Into<String>) -> Self {
    self.step = Some(step.into());
    self
  }

  /// Override the severity
  pub fn with_severity(mut self, severity: Severity) -> Self {
    self.severity = severity;
    self
  }
}

impl fmt::Display for ReleaseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.step {
      Some(step) => write!(f, "[{}] {} ({})", self.code, self.message, step),
      None => write!(f, "[{}] {}", self.code, self.message),
    }
  }
}

impl std::error::Error for ReleaseError {}
