//! Merge orchestration: turning conflicted files into merged ones.
//!
//! Entry points:
//! - [`resolve_conflicts`]: clean up one file that git left with conflict
//!   markers, preferring git's index stages over the markers themselves
//! - [`resolve_all`]: do that for every conflicted JSONL file in the data dir
//! - [`driver::run_merge_driver`]: the git merge driver
//! - [`check_files`]: report conflict markers without changing anything
//!
//! Each call runs Load, Merge, Serialize and Write in order. Any failure
//! short-circuits before the destination is replaced.

pub mod driver;
pub mod git;

pub use driver::{
    DriverOutcome, FAILURE_MARKER, MergeDriverRequest, append_failure_log, merge_driver,
    run_merge_driver,
};
pub use git::{GitStages, StageSource, StageTexts, load_stages};

use crate::error::{DocketError, Result, ResultExt};
use crate::jsonl::{
    ConflictMarker, ConflictMarkerType, SkippedLine, decode_str, encode_entities,
    scan_conflict_markers, scan_conflict_markers_str, write_text_atomic,
};
use crate::merge::markers::parse_conflicted;
use crate::merge::{MergeOptions, MergeStats, merge_three_way};
use crate::model::Entity;
use crate::util::content_hash;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Options for [`resolve_conflicts`].
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Compute and report the merge without writing the file.
    pub dry_run: bool,
    /// Try git's index stages before falling back to conflict markers.
    pub use_git_stages: bool,
    pub merge: MergeOptions,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            use_git_stages: true,
            merge: MergeOptions::default(),
        }
    }
}

/// Where the three sides of a resolution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeSource {
    GitStages,
    ConflictMarkers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolveStatus {
    /// The file had no conflict markers and was left alone.
    NoConflicts,
    Resolved,
}

/// Report for one resolved (or skipped) file.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveOutcome {
    pub path: PathBuf,
    pub status: ResolveStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<MergeSource>,
    pub dry_run: bool,
    pub written: bool,
    /// Conflict regions found in the file.
    pub regions: usize,
    pub entity_count: usize,
    /// SHA256 of the merged output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_lines: Vec<SkippedLine>,
    pub stats: MergeStats,
}

impl ResolveOutcome {
    fn no_conflicts(path: &Path, dry_run: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            status: ResolveStatus::NoConflicts,
            source: None,
            dry_run,
            written: false,
            regions: 0,
            entity_count: 0,
            content_hash: None,
            skipped_lines: Vec::new(),
            stats: MergeStats::default(),
        }
    }
}

struct MergeInputs {
    source: MergeSource,
    base: Option<Vec<Entity>>,
    ours: Vec<Entity>,
    theirs: Vec<Entity>,
    skipped: Vec<SkippedLine>,
}

impl MergeInputs {
    fn from_stages(stages: StageTexts) -> Self {
        let mut skipped = Vec::new();
        let mut decode = |text: &str, label: &str| {
            let decoded = decode_str(text, label);
            skipped.extend(decoded.skipped.into_iter().map(|line| SkippedLine {
                reason: format!("{label}: {}", line.reason),
                ..line
            }));
            decoded.entities
        };
        let base = stages.base.as_deref().map(|text| decode(text, "stage 1"));
        let ours = decode(&stages.ours, "stage 2");
        let theirs = decode(&stages.theirs, "stage 3");
        Self {
            source: MergeSource::GitStages,
            base,
            ours,
            theirs,
            skipped,
        }
    }

    fn from_markers(text: &str) -> Self {
        let views = parse_conflicted(text);
        Self {
            source: MergeSource::ConflictMarkers,
            base: views.base,
            ours: views.ours,
            theirs: views.theirs,
            skipped: views.skipped,
        }
    }
}

/// Resolve a conflicted JSONL file in place using git's index stages.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the result cannot be
/// written.
pub fn resolve_conflicts(path: &Path, options: &ResolveOptions) -> Result<ResolveOutcome> {
    resolve_conflicts_with(path, options, &GitStages)
}

/// Resolve a conflicted JSONL file using the given stage source.
///
/// A file without conflict markers is reported as
/// [`ResolveStatus::NoConflicts`] and never rewritten. Otherwise stages 2
/// and 3 (and 1 when present) are merged when available, else the sides are
/// rebuilt from the markers. Unless `dry_run` is set the merged JSONL
/// atomically replaces the file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the result cannot be
/// written. Dry runs still surface read errors.
pub fn resolve_conflicts_with(
    path: &Path,
    options: &ResolveOptions,
    stages: &dyn StageSource,
) -> Result<ResolveOutcome> {
    let text = fs::read_to_string(path).with_path(path)?;
    let regions = scan_conflict_markers_str(&text)
        .iter()
        .filter(|m| m.marker_type == ConflictMarkerType::Start)
        .count();
    if regions == 0 {
        debug!(path = %path.display(), "No conflict markers");
        return Ok(ResolveOutcome::no_conflicts(path, options.dry_run));
    }

    let staged = if options.use_git_stages {
        load_stages(stages, path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "Git stages unavailable; using conflict markers");
            None
        })
    } else {
        None
    };
    let inputs = match staged {
        Some(stage_texts) => MergeInputs::from_stages(stage_texts),
        None => MergeInputs::from_markers(&text),
    };

    let result = merge_three_way(
        inputs.base.as_deref(),
        &inputs.ours,
        &inputs.theirs,
        &options.merge,
    );
    let encoded = encode_entities(&result.entities)?;

    let hash = if options.dry_run {
        content_hash(encoded.as_bytes())
    } else {
        write_text_atomic(path, &encoded)?
    };

    info!(
        path = %path.display(),
        source = ?inputs.source,
        regions,
        entities = result.entities.len(),
        conflicts = result.stats.conflicts.len(),
        dry_run = options.dry_run,
        "Resolved conflicts"
    );

    Ok(ResolveOutcome {
        path: path.to_path_buf(),
        status: ResolveStatus::Resolved,
        source: Some(inputs.source),
        dry_run: options.dry_run,
        written: !options.dry_run,
        regions,
        entity_count: result.entities.len(),
        content_hash: Some(hash),
        skipped_lines: inputs.skipped,
        stats: result.stats,
    })
}

/// JSONL files directly inside `data_dir`, sorted by name.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed.
pub fn jsonl_files(data_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(data_dir).with_path(data_dir)? {
        let path = entry.with_path(data_dir)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "jsonl") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Resolve every conflicted JSONL file in `data_dir`.
///
/// Files without markers are skipped and not reported.
///
/// # Errors
///
/// Stops at the first file that fails.
pub fn resolve_all(data_dir: &Path, options: &ResolveOptions) -> Result<Vec<ResolveOutcome>> {
    resolve_all_with(data_dir, options, &GitStages)
}

/// [`resolve_all`] with an explicit stage source.
///
/// # Errors
///
/// Stops at the first file that fails.
pub fn resolve_all_with(
    data_dir: &Path,
    options: &ResolveOptions,
    stages: &dyn StageSource,
) -> Result<Vec<ResolveOutcome>> {
    let mut outcomes = Vec::new();
    for path in jsonl_files(data_dir)? {
        let outcome = resolve_conflicts_with(&path, options, stages)?;
        if outcome.status == ResolveStatus::Resolved {
            outcomes.push(outcome);
        }
    }
    Ok(outcomes)
}

/// Conflict markers found in one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileMarkers {
    pub path: PathBuf,
    pub markers: Vec<ConflictMarker>,
}

/// Scan files for conflict markers. Files without markers are omitted.
///
/// # Errors
///
/// Returns an error if a file cannot be read.
pub fn check_files(paths: &[PathBuf]) -> Result<Vec<FileMarkers>> {
    let mut found = Vec::new();
    for path in paths {
        let markers = scan_conflict_markers(path)?;
        if !markers.is_empty() {
            found.push(FileMarkers {
                path: path.clone(),
                markers,
            });
        }
    }
    Ok(found)
}

/// Error for files that still hold conflict markers.
#[must_use]
pub fn markers_error(found: &[FileMarkers]) -> Option<DocketError> {
    let first = found.first()?;
    let count = found.iter().map(|f| f.markers.len()).sum();
    Some(DocketError::ConflictMarkers {
        path: first.path.clone(),
        count,
    })
}
