//! Progress indicators for long-running operations
//!
//! Uses `linya` for allocation-free progress bars.

use linya::{Bar, Progress};

/// Progress bar wrapper for file operations (e.g. cleaning state files)
pub struct FileProgress {
  progress: Progress,
  bar: Bar,
}

impl FileProgress {
  /// Create a new progress bar over `total` files
  pub fn new(total: usize, label: impl Into<String>) -> Self {
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self { progress, bar }
  }

  /// Increment progress by 1
  pub fn inc(&mut self) {
    self.progress.inc_and_draw(&self.bar, 1);
  }
}
