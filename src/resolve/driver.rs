//! Git merge driver entry point.
//!
//! Git invokes `docket merge-driver %O %A %B` with three temp files: the
//! ancestor, ours (which must receive the result) and theirs. Exit 0 tells
//! git the merge succeeded; non-zero makes git fall back to conflict
//! markers. Failures are appended to a log file so they can be diagnosed
//! after git has swallowed the driver's output.

use crate::error::{DocketError, Result, ResultExt};
use crate::jsonl::{decode_str, encode_entities, write_text_atomic};
use crate::merge::{MergeOptions, MergeStats, merge_three_way};
use crate::util::content_hash;
use crate::util::time::now_rfc3339;
use serde::Serialize;
use std::fmt::Display;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Marker text opening every failure log entry.
pub const FAILURE_MARKER: &str = "merge-driver failure";

/// The three files git hands the driver.
#[derive(Debug, Clone)]
pub struct MergeDriverRequest {
    /// Ancestor version (`%O`). May be missing or empty.
    pub base: PathBuf,
    /// Our version (`%A`); receives the merged result.
    pub ours: PathBuf,
    /// Their version (`%B`).
    pub theirs: PathBuf,
    /// Repository path being merged (`%P`), used in diagnostics.
    pub display_path: Option<String>,
    pub options: MergeOptions,
}

impl MergeDriverRequest {
    #[must_use]
    pub fn new(base: impl Into<PathBuf>, ours: impl Into<PathBuf>, theirs: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            ours: ours.into(),
            theirs: theirs.into(),
            display_path: None,
            options: MergeOptions::default(),
        }
    }

    /// Name used for this merge in logs.
    #[must_use]
    pub fn label(&self) -> String {
        self.display_path
            .clone()
            .unwrap_or_else(|| self.ours.display().to_string())
    }
}

/// Result of a successful driver run.
#[derive(Debug, Clone, Serialize)]
pub struct DriverOutcome {
    pub path: PathBuf,
    /// False when the merged output already matched ours byte for byte.
    pub written: bool,
    pub entity_count: usize,
    pub content_hash: String,
    pub stats: MergeStats,
}

/// Merge the three files and write the result over `ours`.
///
/// # Errors
///
/// Returns an error if ours or theirs cannot be read, or the result cannot
/// be written. The ours file is left untouched on error.
pub fn merge_driver(request: &MergeDriverRequest) -> Result<DriverOutcome> {
    let label = request.label();

    let base = match fs::read_to_string(&request.base) {
        Ok(text) => Some(decode_str(&text, "base").entities),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %request.base.display(), "Ancestor file missing; merging without base");
            None
        }
        Err(err) => return Err(DocketError::file_io(&request.base, err)),
    };
    let ours_text = fs::read_to_string(&request.ours).with_path(&request.ours)?;
    let theirs_text = fs::read_to_string(&request.theirs).with_path(&request.theirs)?;

    let ours = decode_str(&ours_text, "ours").entities;
    let theirs = decode_str(&theirs_text, "theirs").entities;

    let result = merge_three_way(base.as_deref(), &ours, &theirs, &request.options);
    let encoded = encode_entities(&result.entities)?;
    let hash = content_hash(encoded.as_bytes());

    let written = if hash == content_hash(ours_text.as_bytes()) {
        debug!(path = %label, "Merged output identical to ours; skipping write");
        false
    } else {
        write_text_atomic(&request.ours, &encoded)?;
        true
    };

    info!(
        path = %label,
        entities = result.entities.len(),
        conflicts = result.stats.conflicts.len(),
        written,
        "Merge driver succeeded"
    );

    Ok(DriverOutcome {
        path: request.ours.clone(),
        written,
        entity_count: result.entities.len(),
        content_hash: hash,
        stats: result.stats,
    })
}

/// Run the driver, appending a failure entry to `log_path` on error.
///
/// The log is never touched on success.
///
/// # Errors
///
/// Returns the driver's error after logging it.
pub fn run_merge_driver(request: &MergeDriverRequest, log_path: &Path) -> Result<DriverOutcome> {
    merge_driver(request).inspect_err(|err| {
        if let Err(log_err) = append_failure_log(log_path, &request.label(), err) {
            warn!(
                log = %log_path.display(),
                error = %log_err,
                "Could not write merge driver failure log"
            );
        }
    })
}

/// Append one failure entry to the log, creating it (and its directory) if
/// needed.
///
/// # Errors
///
/// Returns an error if the log cannot be opened or written.
pub fn append_failure_log(log_path: &Path, path: &str, error: &dyn Display) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_path(parent)?;
        }
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_path(log_path)?;
    let entry = format!(
        "[{}] {FAILURE_MARKER}\npath: {path}\nerror: {error}\n---\n",
        now_rfc3339()
    );
    file.write_all(entry.as_bytes()).with_path(log_path)?;
    Ok(())
}
