//! CLI commands for cargo-relay
//!
//! All user-facing command implementations:
//!
//! - **status**: list persisted release workflows and their lifecycle state
//! - **show**: inspect one workflow (stages, faults, rollback snapshot)
//! - **rollback**: compensate a failed release from its persisted snapshot
//! - **clean**: delete terminal workflow state files

pub mod clean;
pub mod rollback;
pub mod show;
pub mod status;

pub use clean::run_clean;
pub use rollback::run_rollback;
pub use show::run_show;
pub use status::run_status;
