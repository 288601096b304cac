//! Resumable release orchestration for Cargo workspaces
//!
//! cargo-relay automates multi-crate releases and, critically, recovers
//! from partial failure mid-release. The crate is organized around the
//! failure-handling engine:
//!
//! - [`recovery`]: fault classification, retry with exponential backoff and
//!   per-attempt timeouts, stage checkpoints, and the recovery decision table
//! - [`rollback`]: pre-release state capture and ordered, best-effort
//!   compensation across release components, with an audit trail and
//!   post-rollback validation
//! - [`workflow`]: the persisted release lifecycle
//!   (`pending → in-progress → completed | failed`, resumable from `failed`)
//! - [`pipeline`]: the stage-sequencing loop wiring the above together
//! - [`hosts`]: capability interfaces for the collaborators a release touches
//!   (registry, release host, VCS, manifests), plus the local implementations
//! - [`core`]: errors, configuration, and the observer interface
//! - [`ui`]: terminal rendering for the `cargo relay` CLI
//!
//! Rollback is best-effort compensation over non-transactional external
//! systems, not a distributed transaction: the guarantees are a stable
//! compensation order and an audit trail of everything attempted.

pub mod core;
pub mod hosts;
pub mod pipeline;
pub mod recovery;
pub mod rollback;
pub mod ui;
pub mod workflow;
