//! Post-rollback validation
//!
//! One check per rolled-back component, comparing live system state against
//! the saved pre-release snapshot. Validation never mutates anything; a
//! failed check is evidence for the operator, not a trigger for another pass.

use crate::rollback::state::{Component, ComponentState};
use crate::rollback::ComponentHandles;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One validation check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationCheck {
  pub component: Component,
  pub check: String,
  pub passed: bool,
  pub details: String,
}

/// Aggregate validation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackValidation {
  pub valid: bool,
  pub checks: Vec<ValidationCheck>,
}

/// Validate every rolled-back component against its saved snapshot
pub fn validate_rollback(
  rolled_back: &[Component],
  state: &BTreeMap<Component, ComponentState>,
  handles: &ComponentHandles<'_>,
) -> RollbackValidation {
  let checks: Vec<ValidationCheck> = rolled_back
    .iter()
    .map(|component| match component {
      Component::Vcs => validate_vcs(state, handles),
      Component::Manifest => validate_manifest(state),
      Component::Changelog => validate_changelog(state),
      Component::ReleaseHost => validate_release_host(state, handles),
      Component::Registry => validate_registry(state, handles),
    })
    .collect();

  RollbackValidation {
    valid: checks.iter().all(|c| c.passed),
    checks,
  }
}

fn trivially_valid(component: Component, check: &str, details: &str) -> ValidationCheck {
  ValidationCheck {
    component,
    check: check.to_string(),
    passed: true,
    details: details.to_string(),
  }
}

fn validate_vcs(state: &BTreeMap<Component, ComponentState>, handles: &ComponentHandles<'_>) -> ValidationCheck {
  let (Some(ComponentState::Vcs(snapshot)), Some(vcs)) = (state.get(&Component::Vcs), handles.vcs) else {
    return trivially_valid(Component::Vcs, "commit-restored", "No VCS state to validate");
  };

  match vcs.head_commit() {
    Ok(head) if head == snapshot.commit => ValidationCheck {
      component: Component::Vcs,
      check: "commit-restored".to_string(),
      passed: true,
      details: format!("Restored to commit {}", snapshot.commit),
    },
    Ok(head) => ValidationCheck {
      component: Component::Vcs,
      check: "commit-restored".to_string(),
      passed: false,
      details: format!("Current commit {} doesn't match original {}", head, snapshot.commit),
    },
    Err(e) => ValidationCheck {
      component: Component::Vcs,
      check: "commit-restored".to_string(),
      passed: false,
      details: format!("Validation failed: {}", e),
    },
  }
}

fn validate_manifest(state: &BTreeMap<Component, ComponentState>) -> ValidationCheck {
  let Some(ComponentState::Manifest(snapshot)) = state.get(&Component::Manifest) else {
    return trivially_valid(Component::Manifest, "versions-restored", "No manifest state to validate");
  };

  let mut mismatched = Vec::new();
  for (path, original) in &snapshot.files {
    match std::fs::read_to_string(path) {
      Ok(current) if &current == original => {}
      Ok(_) => mismatched.push(format!("{} not restored", path.display())),
      Err(e) => mismatched.push(format!("{}: {}", path.display(), e)),
    }
  }

  ValidationCheck {
    component: Component::Manifest,
    check: "versions-restored".to_string(),
    passed: mismatched.is_empty(),
    details: if mismatched.is_empty() {
      "All manifests restored".to_string()
    } else {
      mismatched.join(", ")
    },
  }
}

fn validate_changelog(state: &BTreeMap<Component, ComponentState>) -> ValidationCheck {
  let Some(ComponentState::Changelog(snapshot)) = state.get(&Component::Changelog) else {
    return trivially_valid(Component::Changelog, "content-restored", "No changelog state to validate");
  };

  match std::fs::read_to_string(&snapshot.path) {
    Ok(current) if current == snapshot.content => ValidationCheck {
      component: Component::Changelog,
      check: "content-restored".to_string(),
      passed: true,
      details: "Changelog restored".to_string(),
    },
    Ok(_) => ValidationCheck {
      component: Component::Changelog,
      check: "content-restored".to_string(),
      passed: false,
      details: "Changelog content differs from original".to_string(),
    },
    Err(e) => ValidationCheck {
      component: Component::Changelog,
      check: "content-restored".to_string(),
      passed: false,
      details: format!("Validation failed: {}", e),
    },
  }
}

fn validate_release_host(
  state: &BTreeMap<Component, ComponentState>,
  handles: &ComponentHandles<'_>,
) -> ValidationCheck {
  let (Some(ComponentState::ReleaseHost(snapshot)), Some(host)) =
    (state.get(&Component::ReleaseHost), handles.release_host)
  else {
    return trivially_valid(Component::ReleaseHost, "release-deleted", "No release-host state to validate");
  };

  let Some(tag) = &snapshot.tag_name else {
    return trivially_valid(Component::ReleaseHost, "release-deleted", "No release was created");
  };

  match host.release_exists(tag) {
    Ok(false) => ValidationCheck {
      component: Component::ReleaseHost,
      check: "release-deleted".to_string(),
      passed: true,
      details: format!("Release {} deleted", tag),
    },
    Ok(true) => ValidationCheck {
      component: Component::ReleaseHost,
      check: "release-deleted".to_string(),
      passed: false,
      details: format!("Release {} still exists", tag),
    },
    Err(e) => ValidationCheck {
      component: Component::ReleaseHost,
      check: "release-deleted".to_string(),
      passed: false,
      details: format!("Validation failed: {}", e),
    },
  }
}

fn validate_registry(state: &BTreeMap<Component, ComponentState>, handles: &ComponentHandles<'_>) -> ValidationCheck {
  let (Some(ComponentState::Registry(snapshot)), Some(registry)) = (state.get(&Component::Registry), handles.registry)
  else {
    return trivially_valid(Component::Registry, "packages-unpublished", "No registry state to validate");
  };

  let mut still_published = Vec::new();
  for pkg in snapshot.packages.iter().filter(|p| p.published) {
    match registry.package_version_exists(&pkg.name, &pkg.version) {
      Ok(false) => {}
      Ok(true) => still_published.push(format!("{}@{} still published", pkg.name, pkg.version)),
      Err(e) => still_published.push(format!("{}@{}: {}", pkg.name, pkg.version, e)),
    }
  }

  ValidationCheck {
    component: Component::Registry,
    check: "packages-unpublished".to_string(),
    passed: still_published.is_empty(),
    details: if still_published.is_empty() {
      "All packages unpublished".to_string()
    } else {
      still_published.join(", ")
    },
  }
}
