//! Pre-release component state snapshots
//!
//! One snapshot per release component, captured *before* that component's
//! release operation runs. Each component has its own required-field struct,
//! selected by a closed enum, so which snapshot exists is statically checkable
//! and a snapshot can never be saved under the wrong component key.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// The release components the coordinator can compensate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Component {
  /// Crate registry publications
  Registry,
  /// Release-host releases and tags
  ReleaseHost,
  /// CHANGELOG.md content
  Changelog,
  /// Cargo.toml manifests
  Manifest,
  /// Git repository state
  Vcs,
}

impl Component {
  /// All components, in declaration order
  pub const ALL: [Component; 5] = [
    Component::Registry,
    Component::ReleaseHost,
    Component::Changelog,
    Component::Manifest,
    Component::Vcs,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Component::Registry => "registry",
      Component::ReleaseHost => "release-host",
      Component::Changelog => "changelog",
      Component::Manifest => "manifest",
      Component::Vcs => "vcs",
    }
  }

  /// Parse a component name as used on the CLI
  pub fn parse(name: &str) -> Option<Component> {
    Component::ALL.iter().copied().find(|c| c.as_str() == name)
  }
}

impl fmt::Display for Component {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Git repository state before the release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsSnapshot {
  /// Pre-release commit hash
  pub commit: String,
  /// Branch the release started from
  pub branch: String,
  /// Tags that existed before the release
  pub tags: Vec<String>,
}

/// Manifest contents before the version bump
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSnapshot {
  /// Path → original file content
  pub files: BTreeMap<PathBuf, String>,
}

/// Changelog content before the release entry was prepended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogSnapshot {
  pub path: PathBuf,
  pub content: String,
}

/// Release-host artifacts created by the release, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseHostSnapshot {
  /// Identifier of the created release (absent if not yet created)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub release_id: Option<String>,
  /// Tag the release was created under (absent if not yet created)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tag_name: Option<String>,
}

/// One package in the registry publication record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
  pub name: String,
  pub version: Version,
  /// Whether the publish actually went through
  pub published: bool,
}

/// Registry publication state for this release attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
  pub packages: Vec<PackageRecord>,
}

/// A component's pre-release snapshot, one closed tagged variant per component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "component", rename_all = "kebab-case")]
pub enum ComponentState {
  Vcs(VcsSnapshot),
  Manifest(ManifestSnapshot),
  Changelog(ChangelogSnapshot),
  ReleaseHost(ReleaseHostSnapshot),
  Registry(RegistrySnapshot),
}

impl ComponentState {
  /// The component this snapshot belongs to
  pub fn component(&self) -> Component {
    match self {
      ComponentState::Vcs(_) => Component::Vcs,
      ComponentState::Manifest(_) => Component::Manifest,
      ComponentState::Changelog(_) => Component::Changelog,
      ComponentState::ReleaseHost(_) => Component::ReleaseHost,
      ComponentState::Registry(_) => Component::Registry,
    }
  }
}
