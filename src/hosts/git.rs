//! System git backend for VCS rollback
//!
//! Uses git plumbing commands via subprocess with an isolated environment
//! (whitelisted PATH/HOME, safe config overrides). Rollback resets the
//! working tree to the pre-release commit, returns to the pre-release branch,
//! and deletes any tags the release created.

use crate::core::error::ReleaseError;
use crate::hosts::{HostResult, VcsClient, VcsOperationError, VcsRollbackReport};
use crate::rollback::state::VcsSnapshot;
use std::path::{Path, PathBuf};
use std::process::Command;

const GIT_COMMAND_FAILED: &str = "GIT_COMMAND_FAILED";

/// VCS client backed by system git
pub struct SystemGitClient {
  repo_path: PathBuf,
  snapshot: VcsSnapshot,
}

impl SystemGitClient {
  /// Create a client that rolls the repository back to `snapshot`
  pub fn new(repo_path: &Path, snapshot: VcsSnapshot) -> Self {
    Self {
      repo_path: repo_path.to_path_buf(),
      snapshot,
    }
  }

  /// Capture the current repository state as a pre-release snapshot
  pub fn capture(repo_path: &Path) -> HostResult<VcsSnapshot> {
    let commit = run_git(repo_path, &["rev-parse", "HEAD"])?;
    let branch = run_git(repo_path, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    let tags_raw = run_git(repo_path, &["tag", "--list"])?;
    let tags = tags_raw.lines().map(str::to_string).collect();

    Ok(VcsSnapshot { commit, branch, tags })
  }

  /// Safe git command with isolated environment
  fn git_cmd(&self) -> Command {
    git_cmd(&self.repo_path)
  }

  fn run(&self, args: &[&str]) -> Result<String, (String, String)> {
    let output = self
      .git_cmd()
      .args(args)
      .output()
      .map_err(|e| (format!("git {}", args.join(" ")), e.to_string()))?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
      return Err((format!("git {}", args.join(" ")), stderr));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }
}

impl VcsClient for SystemGitClient {
  fn rollback(&self) -> HostResult<VcsRollbackReport> {
    let mut errors = Vec::new();

    // Return to the pre-release branch first; a release may have left the
    // repository on a detached HEAD or a release branch.
    if self.snapshot.branch != "HEAD" {
      if let Err((operation, error)) = self.run(&["checkout", &self.snapshot.branch]) {
        errors.push(VcsOperationError {
          operation,
          error,
          code: GIT_COMMAND_FAILED.to_string(),
        });
      }
    }

    if let Err((operation, error)) = self.run(&["reset", "--hard", &self.snapshot.commit]) {
      errors.push(VcsOperationError {
        operation,
        error,
        code: GIT_COMMAND_FAILED.to_string(),
      });
    }

    // Delete tags created since the snapshot
    match self.run(&["tag", "--list"]) {
      Ok(current) => {
        for tag in current.lines() {
          if !self.snapshot.tags.iter().any(|t| t == tag) {
            if let Err((operation, error)) = self.run(&["tag", "-d", tag]) {
              errors.push(VcsOperationError {
                operation,
                error,
                code: GIT_COMMAND_FAILED.to_string(),
              });
            }
          }
        }
      }
      Err((operation, error)) => errors.push(VcsOperationError {
        operation,
        error,
        code: GIT_COMMAND_FAILED.to_string(),
      }),
    }

    Ok(VcsRollbackReport {
      succeeded: errors.is_empty(),
      errors,
    })
  }

  fn head_commit(&self) -> HostResult<String> {
    run_git(&self.repo_path, &["rev-parse", "HEAD"])
  }
}

fn git_cmd(repo_path: &Path) -> Command {
  let mut cmd = Command::new("git");
  cmd.arg("-C").arg(repo_path);

  // Isolated environment (don't trust global config)
  cmd.env_clear();
  if let Ok(path) = std::env::var("PATH") {
    cmd.env("PATH", path);
  }
  if let Ok(home) = std::env::var("HOME") {
    cmd.env("HOME", home);
  }
  cmd.arg("-c").arg("advice.detachedHead=false");

  cmd
}

fn run_git(repo_path: &Path, args: &[&str]) -> HostResult<String> {
  let output = git_cmd(repo_path)
    .args(args)
    .output()
    .map_err(|e| ReleaseError::new(GIT_COMMAND_FAILED, format!("failed to run git {}: {}", args.join(" "), e)))?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    return Err(ReleaseError::new(
      GIT_COMMAND_FAILED,
      format!("git {} failed: {}", args.join(" "), stderr.trim()),
    ));
  }

  Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
