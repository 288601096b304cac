//! Core building blocks for cargo-relay
//!
//! - **config**: relay.toml parsing and validation (retry/rollback overrides,
//!   stage declarations)
//! - **error**: crate-wide error types with contextual help, plus the
//!   wire-level `ReleaseError` consumed by the recovery engine
//! - **observer**: the progress/warning interface injected into the engine

pub mod config;
pub mod error;
pub mod observer;
