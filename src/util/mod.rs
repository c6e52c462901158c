//! Shared utilities for `docket`.
//!
//! - Content hashing (SHA256)
//! - Record timestamp parsing
//! - Project data directory discovery helpers

mod hash;
pub mod time;

pub use hash::content_hash;

use std::path::{Path, PathBuf};

/// Name of the per-project data directory.
pub const DATA_DIR_NAME: &str = ".docket";

/// Walk up from `start` looking for a `.docket` directory.
#[must_use]
pub fn find_data_dir(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(DATA_DIR_NAME);
        if candidate.is_dir() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}
