//! Release failure recovery engine
//!
//! The building blocks for surviving a partially-failed release:
//!
//! - **classify**: map a release fault to transient / partial / permanent
//! - **strategy**: per-kind retry configuration with exponential backoff
//! - **retry**: run an operation under a strategy, with per-attempt timeouts
//!   and re-classification after every failure
//! - **checkpoint**: append-only per-stage progress snapshots for resume
//! - **policy**: the decision table turning a fault + context into one of
//!   retry / skip / rollback / manual / resume

pub mod checkpoint;
pub mod classify;
pub mod policy;
pub mod retry;
pub mod strategy;

pub use checkpoint::{Checkpoint, CheckpointId, CheckpointStore};
pub use classify::{classify, codes, ErrorClassification, ErrorKind, RecoveryAction};
pub use policy::{determine_recovery_action, RecoveryContext};
pub use retry::{OperationError, RetryAttempt, RetryContext, RetryExecutor, RetryOutcome};
pub use strategy::{RetryStrategy, StrategyTable};
