//! Capability interfaces for release collaborators
//!
//! The rollback coordinator and pipeline consume these traits; the concrete
//! network clients (registry, release host) live outside this crate. The two
//! purely-local collaborators ship here: a system-git [`VcsClient`]
//! (`git.rs`) and a saved-snapshot [`ManifestUpdater`] (`manifest.rs`).

pub mod git;
pub mod manifest;

use crate::core::error::ReleaseError;
use semver::Version;
use serde::{Deserialize, Serialize};

pub use git::SystemGitClient;
pub use manifest::SnapshotManifestUpdater;

/// Result type for collaborator operations
///
/// Collaborators fail with [`ReleaseError`] so every fault enters the engine
/// already carrying a code the classifier understands.
pub type HostResult<T> = Result<T, ReleaseError>;

/// One failed sub-operation inside a VCS rollback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VcsOperationError {
  pub operation: String,
  pub error: String,
  pub code: String,
}

/// Report from a VCS rollback pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VcsRollbackReport {
  pub succeeded: bool,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub errors: Vec<VcsOperationError>,
}

impl VcsRollbackReport {
  pub fn ok() -> Self {
    Self {
      succeeded: true,
      errors: Vec::new(),
    }
  }
}

/// Version-control repository operations
pub trait VcsClient {
  /// Reset the repository to its pre-release state
  fn rollback(&self) -> HostResult<VcsRollbackReport>;

  /// Current HEAD commit hash (used by post-rollback validation)
  fn head_commit(&self) -> HostResult<String>;
}

/// Manifest (Cargo.toml) version updates
pub trait ManifestUpdater {
  /// Restore every manifest touched by the release to its original content
  fn rollback(&self) -> HostResult<()>;
}

/// Release-hosting API (GitHub-style releases and tags)
pub trait ReleaseHostClient {
  fn delete_release(&self, tag: &str) -> HostResult<()>;
  fn delete_tag(&self, tag: &str) -> HostResult<()>;
  fn release_exists(&self, tag: &str) -> HostResult<bool>;
}

/// Package registry publishing operations
pub trait RegistryClient {
  fn unpublish_package(&self, name: &str, version: &Version) -> HostResult<()>;
  fn package_version_exists(&self, name: &str, version: &Version) -> HostResult<bool>;
}
