//! Command implementations.

pub mod check;
pub mod merge_driver;
pub mod resolve;

use crate::config::{self, CliOverrides, MergeConfig};
use crate::error::Result;
use std::env;
use std::path::{Path, PathBuf};

/// Settings shared by every command, resolved once per invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub cwd: PathBuf,
    /// The project `.docket` directory, if one was found.
    pub data_dir: Option<PathBuf>,
    pub merge: MergeConfig,
}

impl Settings {
    /// Discover the data directory and load layered config.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory cannot be read or a config
    /// file is malformed.
    pub fn load(overrides: &CliOverrides, config_dir: Option<&Path>) -> Result<Self> {
        let cwd = env::current_dir()?;
        Self::load_from(&cwd, overrides, config_dir)
    }

    /// [`Settings::load`] rooted at an explicit directory.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is malformed.
    pub fn load_from(
        cwd: &Path,
        overrides: &CliOverrides,
        config_dir: Option<&Path>,
    ) -> Result<Self> {
        let data_dir = config::discover_data_dir(Some(cwd)).ok();
        let layer = config::load_config(data_dir.as_deref(), config_dir, overrides)?;
        let merge = MergeConfig::from_layer(&layer, data_dir.as_deref(), cwd);
        Ok(Self {
            cwd: cwd.to_path_buf(),
            data_dir,
            merge,
        })
    }

    /// The data directory, or `NotInitialized`.
    ///
    /// # Errors
    ///
    /// Returns `DocketError::NotInitialized` when no `.docket` directory
    /// exists.
    pub fn require_data_dir(&self) -> Result<&Path> {
        self.data_dir
            .as_deref()
            .ok_or(crate::error::DocketError::NotInitialized)
    }
}

/// Display a path relative to `base` when possible.
#[must_use]
pub fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}
