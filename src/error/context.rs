//! Extension trait for attaching a file path to I/O results.

use super::{DocketError, Result};
use std::path::Path;

/// Context helpers for `std::result::Result`.
pub trait ResultExt<T> {
    /// Attach the file path an I/O operation was working on.
    ///
    /// # Errors
    ///
    /// Returns `DocketError::FileIo` carrying `path` when `self` is an error.
    fn with_path(self, path: &Path) -> Result<T>;
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, path: &Path) -> Result<T> {
        self.map_err(|source| DocketError::file_io(path, source))
    }
}
