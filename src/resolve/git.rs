//! Access to git's index stages for a conflicted path.
//!
//! During a conflicted merge git keeps stage 1 (common ancestor), stage 2
//! (ours) and stage 3 (theirs) in the index. Reading them gives a true
//! three-way merge instead of reconstructing sides from conflict markers.

use crate::error::{DocketError, Result};
use std::path::Path;
use std::process::Command;
use tracing::debug;

pub const STAGE_BASE: u8 = 1;
pub const STAGE_OURS: u8 = 2;
pub const STAGE_THEIRS: u8 = 3;

/// Source of per-stage file contents.
pub trait StageSource {
    /// Read one stage of `path`.
    ///
    /// Returns `Ok(None)` when the stage does not exist for the path.
    ///
    /// # Errors
    ///
    /// Returns an error when the source itself cannot be queried.
    fn read_stage(&self, path: &Path, stage: u8) -> Result<Option<String>>;
}

/// Stage contents needed for a three-way merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTexts {
    pub base: Option<String>,
    pub ours: String,
    pub theirs: String,
}

/// Load stages 2 and 3 (required) and 1 (optional) for `path`.
///
/// # Errors
///
/// Propagates errors from the stage source.
pub fn load_stages(source: &dyn StageSource, path: &Path) -> Result<Option<StageTexts>> {
    let Some(ours) = source.read_stage(path, STAGE_OURS)? else {
        return Ok(None);
    };
    let Some(theirs) = source.read_stage(path, STAGE_THEIRS)? else {
        return Ok(None);
    };
    let base = source.read_stage(path, STAGE_BASE)?;
    Ok(Some(StageTexts { base, ours, theirs }))
}

/// Reads stages with `git show :N:./<name>` run from the file's directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitStages;

impl StageSource for GitStages {
    fn read_stage(&self, path: &Path, stage: u8) -> Result<Option<String>> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| DocketError::InvalidPath {
                path: path.to_path_buf(),
                reason: "path has no file name".to_string(),
            })?;
        let spec = format!(":{stage}:./{name}");

        let output = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(["show", spec.as_str()])
            .output()
            .map_err(|e| DocketError::Git {
                command: format!("git show {spec}"),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            debug!(
                path = %path.display(),
                stage,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Stage not available"
            );
            return Ok(None);
        }

        String::from_utf8(output.stdout)
            .map(Some)
            .map_err(|e| DocketError::Git {
                command: format!("git show {spec}"),
                message: format!("stage output is not UTF-8: {e}"),
            })
    }
}
