//! Manifest restoration from a saved snapshot
//!
//! Restores every `Cargo.toml` a release touched to its pre-release content.
//! Restored content is parsed before writing so a corrupted snapshot cannot
//! overwrite a manifest with garbage.

use crate::core::error::ReleaseError;
use crate::hosts::{HostResult, ManifestUpdater};
use crate::rollback::state::ManifestSnapshot;

const MANIFEST_RESTORE_FAILED: &str = "MANIFEST_RESTORE_FAILED";

/// Manifest updater that writes saved original contents back to disk
pub struct SnapshotManifestUpdater {
  snapshot: ManifestSnapshot,
}

impl SnapshotManifestUpdater {
  pub fn new(snapshot: ManifestSnapshot) -> Self {
    Self { snapshot }
  }
}

impl ManifestUpdater for SnapshotManifestUpdater {
  fn rollback(&self) -> HostResult<()> {
    for (path, original) in &self.snapshot.files {
      original.parse::<toml_edit::DocumentMut>().map_err(|e| {
        ReleaseError::new(
          MANIFEST_RESTORE_FAILED,
          format!("saved content for {} is not valid TOML: {}", path.display(), e),
        )
      })?;

      std::fs::write(path, original).map_err(|e| {
        ReleaseError::new(
          MANIFEST_RESTORE_FAILED,
          format!("failed to restore {}: {}", path.display(), e),
        )
      })?;
    }

    Ok(())
  }
}
