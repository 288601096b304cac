#![allow(dead_code)]

use crate::core::error::{ConfigError, RelayError, RelayResult, ResultExt};
use crate::recovery::strategy::{RetryStrategy, StrategyTable};
use crate::rollback::{Component, RollbackOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for cargo-relay
/// Searched in order: relay.toml, .relay.toml, .config/relay.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
  pub workspace: WorkspaceConfig,
  #[serde(default)]
  pub retry: RetryConfig,
  #[serde(default)]
  pub rollback: RollbackConfig,
  #[serde(default)]
  pub stages: Vec<StageConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
  pub root: PathBuf,
}

/// Per-kind retry strategy overrides
///
/// Durations are milliseconds. Omitted sections keep the built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryConfig {
  #[serde(default)]
  pub transient: Option<StrategyConfig>,
  #[serde(default)]
  pub permanent: Option<StrategyConfig>,
  #[serde(default)]
  pub partial: Option<StrategyConfig>,
}

/// One retry strategy in relay.toml form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
  pub max_retries: u32,
  pub initial_delay_ms: u64,
  pub max_delay_ms: u64,
  pub backoff_multiplier: f64,
  pub exponential_backoff: bool,
  #[serde(default)]
  pub attempt_timeout_ms: Option<u64>,
}

impl StrategyConfig {
  fn validate(&self, kind: &str) -> RelayResult<()> {
    if self.max_delay_ms < self.initial_delay_ms {
      return Err(RelayError::Config(ConfigError::Invalid {
        field: format!("retry.{}.max_delay_ms", kind),
        reason: format!(
          "max_delay_ms ({}) must be >= initial_delay_ms ({})",
          self.max_delay_ms, self.initial_delay_ms
        ),
      }));
    }

    if self.backoff_multiplier < 1.0 {
      return Err(RelayError::Config(ConfigError::Invalid {
        field: format!("retry.{}.backoff_multiplier", kind),
        reason: format!("backoff_multiplier ({}) must be >= 1.0", self.backoff_multiplier),
      }));
    }

    Ok(())
  }

  fn to_strategy(&self) -> RetryStrategy {
    RetryStrategy {
      max_retries: self.max_retries,
      initial_delay: Duration::from_millis(self.initial_delay_ms),
      max_delay: Duration::from_millis(self.max_delay_ms),
      backoff_multiplier: self.backoff_multiplier,
      exponential_backoff: self.exponential_backoff,
      attempt_timeout: self.attempt_timeout_ms.map(Duration::from_millis),
    }
  }
}

/// Default rollback behavior
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollbackConfig {
  /// Continue past unrecoverable component failures
  #[serde(default)]
  pub force: bool,

  /// Run post-rollback validation
  #[serde(default)]
  pub validate: bool,

  /// Deadline for a rollback pass, in milliseconds
  #[serde(default)]
  pub timeout_ms: Option<u64>,

  /// Restrict rollback to these components
  #[serde(default)]
  pub components: Option<Vec<String>>,
}

impl RollbackConfig {
  /// Validate component names against the known set
  pub fn validate(&self) -> RelayResult<()> {
    if let Some(names) = &self.components {
      for name in names {
        if Component::parse(name).is_none() {
          return Err(RelayError::Config(ConfigError::Invalid {
            field: "rollback.components".to_string(),
            reason: format!(
              "unknown component '{}' (expected one of: registry, release-host, changelog, manifest, vcs)",
              name
            ),
          }));
        }
      }
    }
    Ok(())
  }

  /// Convert to coordinator options
  pub fn to_options(&self) -> RollbackOptions {
    RollbackOptions {
      components: self
        .components
        .as_ref()
        .map(|names| names.iter().filter_map(|n| Component::parse(n)).collect()),
      force: self.force,
      validate: self.validate,
      timeout: self.timeout_ms.map(Duration::from_millis),
    }
  }
}

/// One pipeline stage declaration
///
/// # Example
///
/// ```toml
/// [[stages]]
/// name = "publish"
/// critical = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
  pub name: String,

  /// Critical stages roll back on exhausted retries instead of being skipped
  #[serde(default)]
  pub critical: bool,
}

impl RelayConfig {
  /// Find config file in search order: relay.toml, .relay.toml, .config/relay.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("relay.toml"),
      path.join(".relay.toml"),
      path.join(".config").join("relay.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from relay.toml (searches multiple locations)
  pub fn load(path: &Path) -> RelayResult<Self> {
    let config_path = Self::find_config_path(path).ok_or_else(|| {
      RelayError::Config(ConfigError::NotFound {
        workspace_root: path.to_path_buf(),
      })
    })?;

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: RelayConfig = toml_edit::de::from_str(&content)
      .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    config
      .validate()
      .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;

    Ok(config)
  }

  /// Save config to relay.toml (default location)
  pub fn save(&self, path: &Path) -> RelayResult<()> {
    let config_path = path.join("relay.toml");
    let content = toml_edit::ser::to_string_pretty(self).context("Failed to serialize config to TOML")?;
    fs::write(&config_path, content).with_context(|| format!("Failed to write config to {}", config_path.display()))?;
    Ok(())
  }

  /// Check if config exists at the given path
  pub fn exists(path: &Path) -> bool {
    Self::find_config_path(path).is_some()
  }

  /// Create a new empty config
  pub fn new(workspace_root: PathBuf) -> Self {
    Self {
      workspace: WorkspaceConfig { root: workspace_root },
      retry: RetryConfig::default(),
      rollback: RollbackConfig::default(),
      stages: Vec::new(),
    }
  }

  /// Validate all sections
  pub fn validate(&self) -> RelayResult<()> {
    if let Some(s) = &self.retry.transient {
      s.validate("transient")?;
    }
    if let Some(s) = &self.retry.permanent {
      s.validate("permanent")?;
    }
    if let Some(s) = &self.retry.partial {
      s.validate("partial")?;
    }
    self.rollback.validate()?;

    let mut seen = std::collections::HashSet::new();
    for stage in &self.stages {
      if !seen.insert(stage.name.as_str()) {
        return Err(RelayError::Config(ConfigError::Invalid {
          field: "stages".to_string(),
          reason: format!("duplicate stage name '{}'", stage.name),
        }));
      }
    }

    Ok(())
  }

  /// Build the strategy table: defaults overlaid with configured overrides
  pub fn strategy_table(&self) -> StrategyTable {
    let mut table = StrategyTable::default();
    if let Some(s) = &self.retry.transient {
      table.transient = s.to_strategy();
    }
    if let Some(s) = &self.retry.permanent {
      table.permanent = s.to_strategy();
    }
    if let Some(s) = &self.retry.partial {
      table.partial = s.to_strategy();
    }
    table
  }
}
