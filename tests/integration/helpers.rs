//! Test helpers: mock collaborators and common fixtures

use cargo_relay::core::error::ReleaseError;
use cargo_relay::hosts::{
  HostResult, ManifestUpdater, RegistryClient, ReleaseHostClient, VcsClient, VcsOperationError, VcsRollbackReport,
};
use cargo_relay::recovery::strategy::{RetryStrategy, StrategyTable};
use cargo_relay::rollback::{PackageRecord, RegistrySnapshot, ReleaseHostSnapshot};
use semver::Version;
use std::sync::Mutex;
use std::time::Duration;

/// A strategy table with millisecond delays so tests run fast
pub fn fast_strategies() -> StrategyTable {
  StrategyTable {
    transient: RetryStrategy {
      max_retries: 2,
      initial_delay: Duration::from_millis(1),
      max_delay: Duration::from_millis(4),
      backoff_multiplier: 2.0,
      exponential_backoff: true,
      attempt_timeout: None,
    },
    permanent: RetryStrategy::permanent_default(),
    partial: RetryStrategy {
      max_retries: 1,
      initial_delay: Duration::from_millis(1),
      max_delay: Duration::from_millis(2),
      backoff_multiplier: 1.5,
      exponential_backoff: true,
      attempt_timeout: None,
    },
  }
}

/// Registry mock that records unpublish calls
#[derive(Default)]
pub struct MockRegistry {
  pub unpublish_calls: Mutex<Vec<String>>,
  pub fail_unpublish: bool,
}

impl RegistryClient for MockRegistry {
  fn unpublish_package(&self, name: &str, version: &Version) -> HostResult<()> {
    self.unpublish_calls.lock().unwrap().push(format!("{}@{}", name, version));
    if self.fail_unpublish {
      Err(ReleaseError::new("REGISTRY_ERROR", "unpublish rejected"))
    } else {
      Ok(())
    }
  }

  fn package_version_exists(&self, name: &str, version: &Version) -> HostResult<bool> {
    // A version still resolves if its unpublish never succeeded
    let key = format!("{}@{}", name, version);
    Ok(self.fail_unpublish || !self.unpublish_calls.lock().unwrap().contains(&key))
  }
}

/// Release-host mock that records deletions
#[derive(Default)]
pub struct MockReleaseHost {
  pub deleted_releases: Mutex<Vec<String>>,
  pub deleted_tags: Mutex<Vec<String>>,
  pub fail_delete_release: bool,
  pub fail_delete_tag: bool,
}

impl ReleaseHostClient for MockReleaseHost {
  fn delete_release(&self, tag: &str) -> HostResult<()> {
    if self.fail_delete_release {
      return Err(ReleaseError::new("RELEASE_HOST_ERROR", "delete release rejected"));
    }
    self.deleted_releases.lock().unwrap().push(tag.to_string());
    Ok(())
  }

  fn delete_tag(&self, tag: &str) -> HostResult<()> {
    if self.fail_delete_tag {
      return Err(ReleaseError::new("RELEASE_HOST_ERROR", "delete tag rejected"));
    }
    self.deleted_tags.lock().unwrap().push(tag.to_string());
    Ok(())
  }

  fn release_exists(&self, tag: &str) -> HostResult<bool> {
    Ok(!self.deleted_releases.lock().unwrap().contains(&tag.to_string()))
  }
}

/// VCS mock with a scripted head and rollback outcome
pub struct MockVcs {
  pub head: Mutex<String>,
  pub rollback_calls: Mutex<u32>,
  pub fail_rollback: bool,
  /// Head after a successful rollback
  pub restored_head: String,
}

impl MockVcs {
  pub fn restoring_to(commit: &str) -> Self {
    Self {
      head: Mutex::new("deadbeef".to_string()),
      rollback_calls: Mutex::new(0),
      fail_rollback: false,
      restored_head: commit.to_string(),
    }
  }

  pub fn failing() -> Self {
    Self {
      head: Mutex::new("deadbeef".to_string()),
      rollback_calls: Mutex::new(0),
      fail_rollback: true,
      restored_head: String::new(),
    }
  }
}

impl VcsClient for MockVcs {
  fn rollback(&self) -> HostResult<VcsRollbackReport> {
    *self.rollback_calls.lock().unwrap() += 1;
    if self.fail_rollback {
      return Ok(VcsRollbackReport {
        succeeded: false,
        errors: vec![VcsOperationError {
          operation: "reset".to_string(),
          error: "cannot reset: index locked".to_string(),
          code: "GIT_COMMAND_FAILED".to_string(),
        }],
      });
    }
    *self.head.lock().unwrap() = self.restored_head.clone();
    Ok(VcsRollbackReport::ok())
  }

  fn head_commit(&self) -> HostResult<String> {
    Ok(self.head.lock().unwrap().clone())
  }
}

/// Manifest updater mock with a scripted outcome
#[derive(Default)]
pub struct MockManifests {
  pub rollback_calls: Mutex<u32>,
  pub fail_rollback: bool,
}

impl ManifestUpdater for MockManifests {
  fn rollback(&self) -> HostResult<()> {
    *self.rollback_calls.lock().unwrap() += 1;
    if self.fail_rollback {
      Err(ReleaseError::new("MANIFEST_ERROR", "manifest write failed"))
    } else {
      Ok(())
    }
  }
}

/// Registry snapshot with one published package
pub fn published_registry_snapshot(name: &str, version: &str) -> RegistrySnapshot {
  RegistrySnapshot {
    packages: vec![PackageRecord {
      name: name.to_string(),
      version: Version::parse(version).unwrap(),
      published: true,
    }],
  }
}

/// Release-host snapshot with a created release and tag
pub fn created_release_snapshot(release_id: &str, tag: &str) -> ReleaseHostSnapshot {
  ReleaseHostSnapshot {
    release_id: Some(release_id.to_string()),
    tag_name: Some(tag.to_string()),
  }
}
