//! Ordered multi-component rollback with audit trail
//!
//! The coordinator owns one pre-release snapshot per component and drives
//! best-effort compensation across them in the named [`order::ROLLBACK_ORDER`].
//! Every attempted compensation appends an audit entry, whether or not it
//! succeeded; the audit trail is the system of record for what was tried,
//! independent of the overall outcome. Rollback is advisory-ordered
//! compensation over non-transactional external services, not a transaction:
//! a recoverable compensation failure (registry, release host) is recorded
//! and the pass continues; an unrecoverable one (local files, VCS) stops the
//! pass unless forced.

pub mod order;
pub mod state;
pub mod validate;

use crate::core::error::RelayResult;
use crate::core::observer::{NullObserver, RecoveryObserver};
use crate::workflow::store::WorkflowStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use order::{compensation_recoverable, resolve_order, ROLLBACK_ORDER};
pub use state::{
  ChangelogSnapshot, Component, ComponentState, ManifestSnapshot, PackageRecord, RegistrySnapshot,
  ReleaseHostSnapshot, VcsSnapshot,
};
pub use validate::{validate_rollback, RollbackValidation, ValidationCheck};

use crate::hosts::{ManifestUpdater, RegistryClient, ReleaseHostClient, VcsClient};

const REGISTRY_UNPUBLISH_FAILED: &str = "REGISTRY_UNPUBLISH_FAILED";
const RELEASE_DELETE_FAILED: &str = "RELEASE_DELETE_FAILED";
const TAG_DELETE_FAILED: &str = "TAG_DELETE_FAILED";
const CHANGELOG_RESTORE_FAILED: &str = "CHANGELOG_RESTORE_FAILED";
const MANIFEST_RESTORE_FAILED: &str = "MANIFEST_RESTORE_FAILED";
const VCS_ROLLBACK_FAILED: &str = "VCS_ROLLBACK_FAILED";
const ROLLBACK_TIMEOUT: &str = "ROLLBACK_TIMEOUT";

/// Borrowed collaborator handles for one rollback pass
///
/// An absent handle means that component has nothing to compensate through;
/// its rollback is a no-op success. The changelog needs no handle: the
/// coordinator restores the file itself.
#[derive(Default, Clone, Copy)]
pub struct ComponentHandles<'a> {
  pub vcs: Option<&'a dyn VcsClient>,
  pub manifests: Option<&'a dyn ManifestUpdater>,
  pub release_host: Option<&'a dyn ReleaseHostClient>,
  pub registry: Option<&'a dyn RegistryClient>,
}

/// Options for one rollback pass
#[derive(Debug, Default, Clone)]
pub struct RollbackOptions {
  /// Restrict to a subset of components (still processed in rollback order)
  pub components: Option<Vec<Component>>,

  /// Continue past unrecoverable component failures
  pub force: bool,

  /// Run post-rollback validation over the rolled-back components
  pub validate: bool,

  /// Deadline for the whole pass, checked between components
  pub timeout: Option<Duration>,
}

/// One failed compensation operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackError {
  pub component: Component,
  pub operation: String,
  pub error: String,
  pub code: String,
  pub recoverable: bool,
}

/// One audit trail entry; append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
  pub component: Component,
  pub operation: String,
  pub timestamp: DateTime<Utc>,
  pub succeeded: bool,
  pub details: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

/// Result of one rollback pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackOutcome {
  pub succeeded: bool,
  pub rolled_back_components: Vec<Component>,
  pub failed_components: Vec<Component>,
  pub errors: Vec<RollbackError>,
  pub duration: Duration,
  pub audit_trail: Vec<AuditEntry>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub validation: Option<RollbackValidation>,
}

/// Coordinates state capture and ordered compensation across release components
pub struct RollbackCoordinator {
  state: BTreeMap<Component, ComponentState>,
  audit: Vec<AuditEntry>,
  observer: Arc<dyn RecoveryObserver>,
  persistence: Option<(Arc<WorkflowStore>, String)>,
}

impl Default for RollbackCoordinator {
  fn default() -> Self {
    Self::new()
  }
}

impl RollbackCoordinator {
  pub fn new() -> Self {
    Self {
      state: BTreeMap::new(),
      audit: Vec::new(),
      observer: Arc::new(NullObserver),
      persistence: None,
    }
  }

  /// Attach an observer for compensation progress events
  pub fn with_observer(mut self, observer: Arc<dyn RecoveryObserver>) -> Self {
    self.observer = observer;
    self
  }

  /// Persist a copy of saved state to durable workflow storage
  ///
  /// Persistence is best-effort: a write failure is reported through the
  /// observer and otherwise ignored; in-memory state stays authoritative
  /// for the current process.
  pub fn with_persistence(mut self, store: Arc<WorkflowStore>, workflow_id: impl Into<String>) -> Self {
    self.persistence = Some((store, workflow_id.into()));
    self
  }

  /// Save a component's pre-release snapshot, overwriting any previous one
  pub fn save_state(&mut self, state: ComponentState) {
    let component = state.component();
    self.state.insert(component, state);

    if let Some((store, workflow_id)) = &self.persistence {
      if let Err(e) = store.record_rollback_state(workflow_id, &self.state) {
        self.observer.warn(&format!("failed to persist rollback state: {}", e));
      }
    }
  }

  /// The saved snapshot for a component, if any
  pub fn state(&self, component: Component) -> Option<&ComponentState> {
    self.state.get(&component)
  }

  /// Copy of the full saved-state map
  pub fn snapshot(&self) -> BTreeMap<Component, ComponentState> {
    self.state.clone()
  }

  /// Replace the saved-state map (e.g. rebuilt from persisted workflow state)
  pub fn load_state(&mut self, state: BTreeMap<Component, ComponentState>) {
    self.state = state;
  }

  /// The audit trail accumulated so far
  pub fn audit_trail(&self) -> &[AuditEntry] {
    &self.audit
  }

  /// Drop all saved state and the audit trail
  pub fn clear(&mut self) {
    self.state.clear();
    self.audit.clear();
  }

  /// Run ordered compensation across the requested components
  pub fn execute_rollback(
    &mut self,
    handles: &ComponentHandles<'_>,
    options: &RollbackOptions,
  ) -> RelayResult<RollbackOutcome> {
    let started = Instant::now();
    let components = resolve_order(options.components.as_deref());

    let mut rolled_back = Vec::new();
    let mut failed = Vec::new();
    let mut errors: Vec<RollbackError> = Vec::new();

    for component in components {
      // Deadline expiry is unrecoverable and stops the pass even under force.
      if let Some(limit) = options.timeout {
        if started.elapsed() >= limit {
          errors.push(RollbackError {
            component,
            operation: "rollback".to_string(),
            error: format!("rollback deadline of {:.1}s exceeded", limit.as_secs_f64()),
            code: ROLLBACK_TIMEOUT.to_string(),
            recoverable: false,
          });
          self.add_audit(component, "rollback", false, String::new(), Some("deadline exceeded".to_string()));
          break;
        }
      }

      match self.rollback_component(component, handles, &mut errors) {
        Ok(()) => {
          rolled_back.push(component);
          self.add_audit(
            component,
            "rollback",
            true,
            format!("Successfully rolled back {}", component),
            None,
          );
          self.observer.component_rolled_back(component, true);
        }
        Err(message) => {
          failed.push(component);
          self.add_audit(component, "rollback", false, String::new(), Some(message));
          self.observer.component_rolled_back(component, false);

          if !options.force {
            break;
          }
        }
      }
    }

    let validation = if options.validate {
      Some(validate_rollback(&rolled_back, &self.state, handles))
    } else {
      None
    };

    let succeeded = failed.is_empty() && errors.iter().all(|e| e.recoverable);

    Ok(RollbackOutcome {
      succeeded,
      rolled_back_components: rolled_back,
      failed_components: failed,
      errors,
      duration: started.elapsed(),
      audit_trail: self.audit.clone(),
      validation,
    })
  }

  /// Compensate one component; `Err` carries the unrecoverable failure message
  fn rollback_component(
    &mut self,
    component: Component,
    handles: &ComponentHandles<'_>,
    errors: &mut Vec<RollbackError>,
  ) -> Result<(), String> {
    match component {
      Component::Registry => self.rollback_registry(handles.registry, errors),
      Component::ReleaseHost => self.rollback_release_host(handles.release_host, errors),
      Component::Changelog => self.rollback_changelog(errors),
      Component::Manifest => self.rollback_manifest(handles.manifests, errors),
      Component::Vcs => self.rollback_vcs(handles.vcs, errors),
    }
  }

  /// Unpublish every package recorded as published; failures are recoverable
  fn rollback_registry(
    &mut self,
    registry: Option<&dyn RegistryClient>,
    errors: &mut Vec<RollbackError>,
  ) -> Result<(), String> {
    let Some(ComponentState::Registry(snapshot)) = self.state.get(&Component::Registry).cloned() else {
      return Ok(());
    };
    let Some(registry) = registry else {
      return Ok(());
    };

    for pkg in snapshot.packages.iter().filter(|p| p.published) {
      match registry.unpublish_package(&pkg.name, &pkg.version) {
        Ok(()) => {
          self.add_audit(
            Component::Registry,
            "unpublish",
            true,
            format!("Unpublished {}@{}", pkg.name, pkg.version),
            None,
          );
        }
        Err(e) => {
          errors.push(RollbackError {
            component: Component::Registry,
            operation: "unpublish".to_string(),
            error: e.to_string(),
            code: REGISTRY_UNPUBLISH_FAILED.to_string(),
            recoverable: compensation_recoverable(Component::Registry),
          });
          self.add_audit(Component::Registry, "unpublish", false, String::new(), Some(e.to_string()));
        }
      }
    }

    Ok(())
  }

  /// Delete the created release, then the tag; failures are recoverable
  fn rollback_release_host(
    &mut self,
    host: Option<&dyn ReleaseHostClient>,
    errors: &mut Vec<RollbackError>,
  ) -> Result<(), String> {
    let Some(ComponentState::ReleaseHost(snapshot)) = self.state.get(&Component::ReleaseHost).cloned() else {
      return Ok(());
    };
    let Some(host) = host else {
      return Ok(());
    };

    if let (Some(_release_id), Some(tag)) = (&snapshot.release_id, &snapshot.tag_name) {
      match host.delete_release(tag) {
        Ok(()) => {
          self.add_audit(
            Component::ReleaseHost,
            "delete-release",
            true,
            format!("Deleted release {}", tag),
            None,
          );
        }
        Err(e) => {
          errors.push(RollbackError {
            component: Component::ReleaseHost,
            operation: "delete-release".to_string(),
            error: e.to_string(),
            code: RELEASE_DELETE_FAILED.to_string(),
            recoverable: compensation_recoverable(Component::ReleaseHost),
          });
          self.add_audit(
            Component::ReleaseHost,
            "delete-release",
            false,
            String::new(),
            Some(e.to_string()),
          );
        }
      }
    }

    if let Some(tag) = &snapshot.tag_name {
      match host.delete_tag(tag) {
        Ok(()) => {
          self.add_audit(
            Component::ReleaseHost,
            "delete-tag",
            true,
            format!("Deleted tag {}", tag),
            None,
          );
        }
        Err(e) => {
          errors.push(RollbackError {
            component: Component::ReleaseHost,
            operation: "delete-tag".to_string(),
            error: e.to_string(),
            code: TAG_DELETE_FAILED.to_string(),
            recoverable: compensation_recoverable(Component::ReleaseHost),
          });
          self.add_audit(
            Component::ReleaseHost,
            "delete-tag",
            false,
            String::new(),
            Some(e.to_string()),
          );
        }
      }
    }

    Ok(())
  }

  /// Restore the changelog file; a write failure halts the pass
  fn rollback_changelog(&mut self, errors: &mut Vec<RollbackError>) -> Result<(), String> {
    let Some(ComponentState::Changelog(snapshot)) = self.state.get(&Component::Changelog).cloned() else {
      return Ok(());
    };

    match std::fs::write(&snapshot.path, &snapshot.content) {
      Ok(()) => {
        self.add_audit(
          Component::Changelog,
          "restore",
          true,
          format!("Restored {}", snapshot.path.display()),
          None,
        );
        Ok(())
      }
      Err(e) => {
        errors.push(RollbackError {
          component: Component::Changelog,
          operation: "restore".to_string(),
          error: e.to_string(),
          code: CHANGELOG_RESTORE_FAILED.to_string(),
          recoverable: compensation_recoverable(Component::Changelog),
        });
        self.add_audit(Component::Changelog, "restore", false, String::new(), Some(e.to_string()));
        Err(e.to_string())
      }
    }
  }

  /// Delegate to the manifest updater's rollback; a failure halts the pass
  fn rollback_manifest(
    &mut self,
    manifests: Option<&dyn ManifestUpdater>,
    errors: &mut Vec<RollbackError>,
  ) -> Result<(), String> {
    let Some(manifests) = manifests else {
      return Ok(());
    };

    match manifests.rollback() {
      Ok(()) => {
        self.add_audit(
          Component::Manifest,
          "restore",
          true,
          "Restored manifest files".to_string(),
          None,
        );
        Ok(())
      }
      Err(e) => {
        errors.push(RollbackError {
          component: Component::Manifest,
          operation: "restore".to_string(),
          error: e.to_string(),
          code: MANIFEST_RESTORE_FAILED.to_string(),
          recoverable: compensation_recoverable(Component::Manifest),
        });
        self.add_audit(Component::Manifest, "restore", false, String::new(), Some(e.to_string()));
        Err(e.to_string())
      }
    }
  }

  /// Delegate to the VCS client's rollback; a failure halts the pass
  fn rollback_vcs(&mut self, vcs: Option<&dyn VcsClient>, errors: &mut Vec<RollbackError>) -> Result<(), String> {
    let Some(vcs) = vcs else {
      return Ok(());
    };

    match vcs.rollback() {
      Ok(report) if report.succeeded => {
        self.add_audit(Component::Vcs, "rollback", true, "Rolled back VCS state".to_string(), None);
        Ok(())
      }
      Ok(report) => {
        for op_error in &report.errors {
          errors.push(RollbackError {
            component: Component::Vcs,
            operation: op_error.operation.clone(),
            error: op_error.error.clone(),
            code: op_error.code.clone(),
            recoverable: compensation_recoverable(Component::Vcs),
          });
        }
        Err("VCS rollback failed".to_string())
      }
      Err(e) => {
        errors.push(RollbackError {
          component: Component::Vcs,
          operation: "rollback".to_string(),
          error: e.to_string(),
          code: VCS_ROLLBACK_FAILED.to_string(),
          recoverable: compensation_recoverable(Component::Vcs),
        });
        Err(e.to_string())
      }
    }
  }

  fn add_audit(
    &mut self,
    component: Component,
    operation: &str,
    succeeded: bool,
    details: String,
    error: Option<String>,
  ) {
    self.audit.push(AuditEntry {
      component,
      operation: operation.to_string(),
      timestamp: Utc::now(),
      succeeded,
      details,
      error,
    });
  }
}
