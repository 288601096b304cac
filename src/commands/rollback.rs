//! Rollback command: compensate a failed release from its persisted snapshot
//!
//! Local components (changelog, manifests, VCS) are compensated directly;
//! registry and release-host compensation requires their network clients and
//! is reported as a no-op here; orchestration layers embedding the engine
//! pass those handles themselves.

use anyhow::anyhow;
use cargo_relay::core::config::RelayConfig;
use cargo_relay::core::error::{RelayError, RelayResult};
use cargo_relay::hosts::{SnapshotManifestUpdater, SystemGitClient};
use cargo_relay::rollback::{
  Component, ComponentHandles, ComponentState, RollbackCoordinator, RollbackOptions, RollbackOutcome,
};
use cargo_relay::ui::ConsoleObserver;
use cargo_relay::workflow::WorkflowStore;
use std::env;
use std::sync::Arc;
use std::time::Duration;

/// Run the rollback command
pub fn run_rollback(
  id: &str,
  components: Vec<String>,
  force: bool,
  validate: bool,
  timeout_ms: Option<u64>,
  apply: bool,
  json: bool,
) -> RelayResult<()> {
  let workspace_root = env::current_dir()?;
  let store = Arc::new(WorkflowStore::open(&WorkflowStore::default_root(&workspace_root))?);
  let workflow = store.load(id)?;

  let snapshot = workflow.context.rollback_state.clone().ok_or_else(|| {
    RelayError::with_help(
      format!("Workflow '{}' has no rollback snapshot", id),
      "Only releases that saved pre-release state can be compensated.",
    )
  })?;

  // CLI flags override relay.toml defaults, which override built-ins.
  let mut options = match RelayConfig::load(&workspace_root) {
    Ok(config) => config.rollback.to_options(),
    Err(RelayError::Config(_)) => RollbackOptions::default(),
    Err(e) => return Err(e),
  };
  if !components.is_empty() {
    let parsed = components
      .iter()
      .map(|name| Component::parse(name).ok_or_else(|| anyhow!("unknown component '{}'", name)))
      .collect::<Result<Vec<_>, _>>()?;
    options.components = Some(parsed);
  }
  options.force = options.force || force;
  options.validate = options.validate || validate;
  if timeout_ms.is_some() {
    options.timeout = timeout_ms.map(Duration::from_millis);
  }

  let targets = cargo_relay::rollback::resolve_order(options.components.as_deref());

  if !apply {
    println!("🔍 Rollback plan for workflow {} (dry-run)", id);
    println!();
    for component in &targets {
      let saved = if snapshot.contains_key(component) { "snapshot saved" } else { "no state (no-op)" };
      println!("  - {} ({})", component, saved);
    }
    println!();
    println!("Use --apply to execute the rollback.");
    return Ok(());
  }

  // Build local collaborator handles from the saved snapshot.
  let git_client = match snapshot.get(&Component::Vcs) {
    Some(ComponentState::Vcs(vcs)) => Some(SystemGitClient::new(&workspace_root, vcs.clone())),
    _ => None,
  };
  let manifest_updater = match snapshot.get(&Component::Manifest) {
    Some(ComponentState::Manifest(m)) => Some(SnapshotManifestUpdater::new(m.clone())),
    _ => None,
  };

  let handles = ComponentHandles {
    vcs: git_client.as_ref().map(|g| g as _),
    manifests: manifest_updater.as_ref().map(|m| m as _),
    release_host: None,
    registry: None,
  };

  let mut coordinator = RollbackCoordinator::new()
    .with_observer(Arc::new(ConsoleObserver))
    .with_persistence(Arc::clone(&store), id);
  coordinator.load_state(snapshot);

  println!("🔄 Rolling back workflow {}...", id);
  println!("   Components: {}", join_components(&targets));
  println!();

  let outcome = coordinator.execute_rollback(&handles, &options)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    return Ok(());
  }

  print_outcome(&outcome);
  Ok(())
}

fn join_components(components: &[Component]) -> String {
  components.iter().map(Component::as_str).collect::<Vec<_>>().join(", ")
}

fn print_outcome(outcome: &RollbackOutcome) {
  println!();
  if outcome.succeeded {
    println!("✅ Rollback complete");
  } else {
    println!("⚠️  Rollback completed with errors");
  }
  println!("   Duration: {:.2}s", outcome.duration.as_secs_f64());
  println!("   Rolled back: {}", join_components(&outcome.rolled_back_components));
  if !outcome.failed_components.is_empty() {
    println!("   Failed: {}", join_components(&outcome.failed_components));
  }

  if !outcome.errors.is_empty() {
    println!();
    println!("   Errors:");
    for error in &outcome.errors {
      let tag = if error.recoverable { "recoverable" } else { "fatal" };
      println!("     ❌ [{}] {} {}: {}", tag, error.component, error.operation, error.error);
    }
  }

  println!();
  println!("   Audit trail:");
  for entry in &outcome.audit_trail {
    let icon = if entry.succeeded { "✅" } else { "❌" };
    let detail = if entry.details.is_empty() {
      entry.error.clone().unwrap_or_default()
    } else {
      entry.details.clone()
    };
    println!("     {} {} {}; {}", icon, entry.component, entry.operation, detail);
  }

  if let Some(validation) = &outcome.validation {
    println!();
    if validation.valid {
      println!("   ✅ Validation passed");
    } else {
      println!("   ⚠️  Validation found problems");
    }
    for check in &validation.checks {
      let icon = if check.passed { "✅" } else { "❌" };
      println!("     {} {} {}: {}", icon, check.component, check.check, check.details);
    }
  }
}
