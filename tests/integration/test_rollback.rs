//! Integration tests for the rollback coordinator

use crate::helpers::{created_release_snapshot, published_registry_snapshot, MockManifests, MockRegistry, MockReleaseHost, MockVcs};
use anyhow::Result;
use cargo_relay::rollback::{
  ChangelogSnapshot, Component, ComponentHandles, ComponentState, RollbackCoordinator, RollbackOptions,
  VcsSnapshot,
};
use std::time::Duration;
use tempfile::TempDir;

fn all_handles<'a>(
  vcs: &'a MockVcs,
  manifests: &'a MockManifests,
  host: &'a MockReleaseHost,
  registry: &'a MockRegistry,
) -> ComponentHandles<'a> {
  ComponentHandles {
    vcs: Some(vcs),
    manifests: Some(manifests),
    release_host: Some(host),
    registry: Some(registry),
  }
}

#[test]
fn test_rollback_with_no_saved_state_is_noop_success() -> Result<()> {
  let vcs = MockVcs::restoring_to("abc123");
  let manifests = MockManifests::default();
  let host = MockReleaseHost::default();
  let registry = MockRegistry::default();

  let mut coordinator = RollbackCoordinator::new();
  let outcome = coordinator.execute_rollback(
    &all_handles(&vcs, &manifests, &host, &registry),
    &RollbackOptions::default(),
  )?;

  assert!(outcome.succeeded);
  // every component in the default order is listed as rolled back
  assert_eq!(
    outcome.rolled_back_components,
    vec![
      Component::Registry,
      Component::ReleaseHost,
      Component::Changelog,
      Component::Manifest,
      Component::Vcs,
    ]
  );
  assert!(outcome.failed_components.is_empty());
  assert!(outcome.errors.is_empty());
  // registry with no saved packages never calls unpublish
  assert!(registry.unpublish_calls.lock().unwrap().is_empty());
  Ok(())
}

#[test]
fn test_published_release_scenario_compensates_each_artifact_once() -> Result<()> {
  let vcs = MockVcs::restoring_to("abc123");
  let manifests = MockManifests::default();
  let host = MockReleaseHost::default();
  let registry = MockRegistry::default();

  let mut coordinator = RollbackCoordinator::new();
  coordinator.save_state(ComponentState::Registry(published_registry_snapshot("relay-core", "1.0.0")));
  coordinator.save_state(ComponentState::ReleaseHost(created_release_snapshot("r1", "v1.0.0")));

  let outcome = coordinator.execute_rollback(
    &all_handles(&vcs, &manifests, &host, &registry),
    &RollbackOptions::default(),
  )?;

  assert!(outcome.succeeded);
  assert_eq!(*registry.unpublish_calls.lock().unwrap(), vec!["relay-core@1.0.0".to_string()]);
  assert_eq!(*host.deleted_releases.lock().unwrap(), vec!["v1.0.0".to_string()]);
  assert_eq!(*host.deleted_tags.lock().unwrap(), vec!["v1.0.0".to_string()]);

  // audit granularity: one entry per sub-operation plus one component-level
  // outcome entry per component
  let ops: Vec<&str> = outcome
    .audit_trail
    .iter()
    .filter(|e| matches!(e.component, Component::Registry | Component::ReleaseHost))
    .map(|e| e.operation.as_str())
    .collect();
  assert_eq!(ops, vec!["unpublish", "rollback", "delete-release", "delete-tag", "rollback"]);
  assert!(outcome.audit_trail.iter().all(|e| e.succeeded));
  Ok(())
}

#[test]
fn test_unrecoverable_failure_halts_later_components() -> Result<()> {
  let vcs = MockVcs::restoring_to("abc123");
  let manifests = MockManifests::default();
  let host = MockReleaseHost::default();
  let registry = MockRegistry::default();

  let mut coordinator = RollbackCoordinator::new();
  coordinator.save_state(ComponentState::Registry(published_registry_snapshot("relay-core", "1.0.0")));
  // restoring into a directory that does not exist fails the changelog write
  coordinator.save_state(ComponentState::Changelog(ChangelogSnapshot {
    path: "/nonexistent-relay-test-dir/CHANGELOG.md".into(),
    content: "# Changelog\n".into(),
  }));

  let outcome = coordinator.execute_rollback(
    &all_handles(&vcs, &manifests, &host, &registry),
    &RollbackOptions::default(),
  )?;

  assert!(!outcome.succeeded);
  // registry and release-host ran before the changelog halted the pass
  assert_eq!(
    outcome.rolled_back_components,
    vec![Component::Registry, Component::ReleaseHost]
  );
  assert_eq!(outcome.failed_components, vec![Component::Changelog]);
  // manifest and vcs were never attempted
  assert_eq!(*manifests.rollback_calls.lock().unwrap(), 0);
  assert_eq!(*vcs.rollback_calls.lock().unwrap(), 0);
  assert!(outcome.errors.iter().any(|e| !e.recoverable));
  Ok(())
}

#[test]
fn test_force_continues_past_failing_component() -> Result<()> {
  let vcs = MockVcs::restoring_to("abc123");
  let manifests = MockManifests::default();
  let host = MockReleaseHost::default();
  let registry = MockRegistry::default();

  let mut coordinator = RollbackCoordinator::new();
  coordinator.save_state(ComponentState::Changelog(ChangelogSnapshot {
    path: "/nonexistent-relay-test-dir/CHANGELOG.md".into(),
    content: "# Changelog\n".into(),
  }));

  let options = RollbackOptions {
    force: true,
    ..RollbackOptions::default()
  };
  let outcome = coordinator.execute_rollback(&all_handles(&vcs, &manifests, &host, &registry), &options)?;

  assert!(!outcome.succeeded);
  assert_eq!(outcome.failed_components, vec![Component::Changelog]);
  // all remaining components were still attempted
  assert_eq!(*manifests.rollback_calls.lock().unwrap(), 1);
  assert_eq!(*vcs.rollback_calls.lock().unwrap(), 1);
  assert!(outcome.rolled_back_components.contains(&Component::Vcs));
  Ok(())
}

#[test]
fn test_recoverable_registry_failure_does_not_halt() -> Result<()> {
  let vcs = MockVcs::restoring_to("abc123");
  let manifests = MockManifests::default();
  let host = MockReleaseHost::default();
  let registry = MockRegistry {
    fail_unpublish: true,
    ..MockRegistry::default()
  };

  let mut coordinator = RollbackCoordinator::new();
  coordinator.save_state(ComponentState::Registry(published_registry_snapshot("relay-core", "1.0.0")));
  coordinator.save_state(ComponentState::ReleaseHost(created_release_snapshot("r1", "v1.0.0")));

  let outcome = coordinator.execute_rollback(
    &all_handles(&vcs, &manifests, &host, &registry),
    &RollbackOptions::default(),
  )?;

  // the failed unpublish is recorded but recoverable, so the pass continues
  // and the overall outcome still succeeds
  assert!(outcome.succeeded);
  assert!(outcome.errors.iter().all(|e| e.recoverable));
  assert!(outcome.rolled_back_components.contains(&Component::ReleaseHost));
  assert_eq!(*host.deleted_releases.lock().unwrap(), vec!["v1.0.0".to_string()]);
  Ok(())
}

#[test]
fn test_subset_processed_in_canonical_order() -> Result<()> {
  let vcs = MockVcs::restoring_to("abc123");
  let manifests = MockManifests::default();
  let host = MockReleaseHost::default();
  let registry = MockRegistry::default();

  let mut coordinator = RollbackCoordinator::new();
  let options = RollbackOptions {
    // listed out of order on purpose
    components: Some(vec![Component::Vcs, Component::Registry]),
    ..RollbackOptions::default()
  };
  let outcome = coordinator.execute_rollback(&all_handles(&vcs, &manifests, &host, &registry), &options)?;

  assert_eq!(outcome.rolled_back_components, vec![Component::Registry, Component::Vcs]);
  Ok(())
}

#[test]
fn test_vcs_report_errors_fail_the_component() -> Result<()> {
  let vcs = MockVcs::failing();
  let manifests = MockManifests::default();
  let host = MockReleaseHost::default();
  let registry = MockRegistry::default();

  let mut coordinator = RollbackCoordinator::new();
  coordinator.save_state(ComponentState::Vcs(VcsSnapshot {
    commit: "abc123".into(),
    branch: "main".into(),
    tags: vec![],
  }));

  let outcome = coordinator.execute_rollback(
    &all_handles(&vcs, &manifests, &host, &registry),
    &RollbackOptions::default(),
  )?;

  assert!(!outcome.succeeded);
  assert_eq!(outcome.failed_components, vec![Component::Vcs]);
  let vcs_error = outcome.errors.iter().find(|e| e.component == Component::Vcs).unwrap();
  assert_eq!(vcs_error.operation, "reset");
  assert!(!vcs_error.recoverable);
  Ok(())
}

#[test]
fn test_changelog_restore_writes_original_content() -> Result<()> {
  let dir = TempDir::new()?;
  let changelog = dir.path().join("CHANGELOG.md");
  std::fs::write(&changelog, "# Changelog\n\n## 1.1.0 (broken release)\n")?;

  let vcs = MockVcs::restoring_to("abc123");
  let manifests = MockManifests::default();
  let host = MockReleaseHost::default();
  let registry = MockRegistry::default();

  let mut coordinator = RollbackCoordinator::new();
  coordinator.save_state(ComponentState::Changelog(ChangelogSnapshot {
    path: changelog.clone(),
    content: "# Changelog\n".into(),
  }));

  let outcome = coordinator.execute_rollback(
    &all_handles(&vcs, &manifests, &host, &registry),
    &RollbackOptions::default(),
  )?;

  assert!(outcome.succeeded);
  assert_eq!(std::fs::read_to_string(&changelog)?, "# Changelog\n");
  Ok(())
}

#[test]
fn test_validation_compares_live_state_to_snapshot() -> Result<()> {
  let dir = TempDir::new()?;
  let changelog = dir.path().join("CHANGELOG.md");
  std::fs::write(&changelog, "# Changelog\n\n## 1.1.0\n")?;

  let vcs = MockVcs::restoring_to("abc123");
  let manifests = MockManifests::default();
  let host = MockReleaseHost::default();
  let registry = MockRegistry::default();

  let mut coordinator = RollbackCoordinator::new();
  coordinator.save_state(ComponentState::Vcs(VcsSnapshot {
    commit: "abc123".into(),
    branch: "main".into(),
    tags: vec![],
  }));
  coordinator.save_state(ComponentState::Changelog(ChangelogSnapshot {
    path: changelog,
    content: "# Changelog\n".into(),
  }));
  coordinator.save_state(ComponentState::Registry(published_registry_snapshot("relay-core", "1.0.0")));
  coordinator.save_state(ComponentState::ReleaseHost(created_release_snapshot("r1", "v1.0.0")));

  let options = RollbackOptions {
    validate: true,
    ..RollbackOptions::default()
  };
  let outcome = coordinator.execute_rollback(&all_handles(&vcs, &manifests, &host, &registry), &options)?;

  assert!(outcome.succeeded);
  let validation = outcome.validation.expect("validation requested");
  assert!(validation.valid, "checks: {:?}", validation.checks);
  assert_eq!(validation.checks.len(), outcome.rolled_back_components.len());
  Ok(())
}

#[test]
fn test_zero_timeout_stops_the_pass() -> Result<()> {
  let vcs = MockVcs::restoring_to("abc123");
  let manifests = MockManifests::default();
  let host = MockReleaseHost::default();
  let registry = MockRegistry::default();

  let mut coordinator = RollbackCoordinator::new();
  coordinator.save_state(ComponentState::Registry(published_registry_snapshot("relay-core", "1.0.0")));

  let options = RollbackOptions {
    timeout: Some(Duration::ZERO),
    force: true,
    ..RollbackOptions::default()
  };
  // deadline expiry stops the pass even under force
  std::thread::sleep(Duration::from_millis(2));
  let outcome = coordinator.execute_rollback(&all_handles(&vcs, &manifests, &host, &registry), &options)?;

  assert!(!outcome.succeeded);
  assert!(outcome.rolled_back_components.is_empty());
  assert!(registry.unpublish_calls.lock().unwrap().is_empty());
  Ok(())
}

#[test]
fn test_audit_trail_accumulates_and_clears() -> Result<()> {
  let vcs = MockVcs::restoring_to("abc123");
  let manifests = MockManifests::default();
  let host = MockReleaseHost::default();
  let registry = MockRegistry::default();

  let mut coordinator = RollbackCoordinator::new();
  coordinator.save_state(ComponentState::Registry(published_registry_snapshot("relay-core", "1.0.0")));
  coordinator.execute_rollback(
    &all_handles(&vcs, &manifests, &host, &registry),
    &RollbackOptions::default(),
  )?;

  assert!(!coordinator.audit_trail().is_empty());
  assert!(coordinator.state(Component::Registry).is_some());

  coordinator.clear();
  assert!(coordinator.audit_trail().is_empty());
  assert!(coordinator.state(Component::Registry).is_none());
  Ok(())
}
