//! JSONL codec for `docket` record files.
//!
//! This module handles:
//! - Lenient decoding: one entity per line, blank lines ignored, malformed
//!   lines skipped with a warning
//! - Encoding: one compact JSON object per line with a trailing newline
//! - Atomic writes (temp file in the same directory, then rename)
//! - Conflict marker detection

use crate::error::{DocketError, Result, ResultExt};
use crate::model::Entity;
use crate::util::content_hash;
use serde::Serialize;
use std::fmt::Write as FmtWrite;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub(crate) const CONFLICT_START: &str = "<<<<<<<";
pub(crate) const CONFLICT_BASE: &str = "|||||||";
pub(crate) const CONFLICT_SEPARATOR: &str = "=======";
pub(crate) const CONFLICT_END: &str = ">>>>>>>";

/// A line that could not be decoded and was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    /// 1-based line number in the source text.
    pub line: usize,
    pub reason: String,
}

/// Entities decoded from JSONL text, plus the lines that were skipped.
#[derive(Debug, Clone, Default)]
pub struct DecodedJsonl {
    pub entities: Vec<Entity>,
    pub skipped: Vec<SkippedLine>,
}

/// Decode a single line. Returns `Ok(None)` for blank lines.
///
/// # Errors
///
/// Returns the serde error when the line is not a valid entity object.
pub fn decode_line(line: &str) -> std::result::Result<Option<Entity>, serde_json::Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some)
}

/// Decode JSONL text leniently.
///
/// `source` names the input in warnings (a path or a label such as
/// `ours-view`). A line that fails to parse is logged and skipped; one bad
/// line never aborts the rest of the file.
#[must_use]
pub fn decode_str(text: &str, source: &str) -> DecodedJsonl {
    let mut decoded = DecodedJsonl::default();

    for (idx, line) in text.lines().enumerate() {
        match decode_line(line) {
            Ok(Some(entity)) => decoded.entities.push(entity),
            Ok(None) => {}
            Err(err) => {
                warn!(
                    source,
                    line = idx + 1,
                    error = %err,
                    "Skipping malformed JSONL line"
                );
                decoded.skipped.push(SkippedLine {
                    line: idx + 1,
                    reason: err.to_string(),
                });
            }
        }
    }

    debug!(
        source,
        entities = decoded.entities.len(),
        skipped = decoded.skipped.len(),
        "Decoded JSONL"
    );
    decoded
}

/// Read and leniently decode a JSONL file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not UTF-8.
pub fn read_entities(path: &Path) -> Result<DecodedJsonl> {
    let text = fs::read_to_string(path).with_path(path)?;
    Ok(decode_str(&text, &path.display().to_string()))
}

/// Encode entities as JSONL text (one object per line, trailing newline).
///
/// # Errors
///
/// Returns an error if an entity cannot be serialized.
pub fn encode_entities(entities: &[Entity]) -> Result<String> {
    let mut out = String::new();
    for entity in entities {
        let json = serde_json::to_string(entity)?;
        let _ = writeln!(out, "{json}");
    }
    Ok(out)
}

/// Temp file used while atomically replacing `path`.
///
/// Lives in the same directory so the final rename never crosses a
/// filesystem boundary.
#[must_use]
pub fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "records.jsonl".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!("{name}.tmp"))
}

/// Atomically replace `path` with already-encoded JSONL text.
///
/// Writes to a temp file, fsyncs, copies the destination's permissions when
/// it already exists, then renames over it. On failure the destination is
/// left untouched and the temp file is removed.
///
/// # Errors
///
/// Returns `DocketError::FileIo` naming the path that failed.
pub fn write_text_atomic(path: &Path, text: &str) -> Result<String> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !parent.is_dir() {
        return Err(DocketError::InvalidPath {
            path: path.to_path_buf(),
            reason: format!("parent directory {} does not exist", parent.display()),
        });
    }

    let temp_path = temp_path_for(path);
    let write_result = write_temp(&temp_path, text);
    if let Err(err) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    if let Ok(meta) = fs::metadata(path) {
        let _ = fs::set_permissions(&temp_path, meta.permissions());
    }

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(DocketError::file_io(path, err));
    }

    debug!(path = %path.display(), bytes = text.len(), "Wrote JSONL atomically");
    Ok(content_hash(text.as_bytes()))
}

fn write_temp(temp_path: &Path, text: &str) -> Result<()> {
    let file = File::create(temp_path).with_path(temp_path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(text.as_bytes()).with_path(temp_path)?;
    writer.flush().with_path(temp_path)?;
    writer
        .into_inner()
        .map_err(|e| DocketError::file_io(temp_path, e.into_error()))?
        .sync_all()
        .with_path(temp_path)?;
    Ok(())
}

/// Conflict marker kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictMarkerType {
    Start,
    Base,
    Separator,
    End,
}

/// A detected merge conflict marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictMarker {
    /// 1-based line number.
    pub line: usize,
    pub marker_type: ConflictMarkerType,
    /// Label after the marker (branch name), if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// Classify a line as a conflict marker.
///
/// A marker is exactly seven marker characters at the start of the line,
/// followed by end of line or whitespace and an optional label.
#[must_use]
pub fn detect_conflict_marker(line: &str) -> Option<(ConflictMarkerType, Option<String>)> {
    let line = line.trim_end_matches(['\r', '\n']);
    for (prefix, kind) in [
        (CONFLICT_START, ConflictMarkerType::Start),
        (CONFLICT_BASE, ConflictMarkerType::Base),
        (CONFLICT_END, ConflictMarkerType::End),
    ] {
        if let Some(rest) = line.strip_prefix(prefix) {
            if rest.is_empty() {
                return Some((kind, None));
            }
            if rest.starts_with(char::is_whitespace) {
                let label = rest.trim();
                let branch = (!label.is_empty()).then(|| label.to_string());
                return Some((kind, branch));
            }
            return None;
        }
    }
    if line.trim_end() == CONFLICT_SEPARATOR {
        return Some((ConflictMarkerType::Separator, None));
    }
    None
}

/// Scan text for merge conflict markers.
#[must_use]
pub fn scan_conflict_markers_str(text: &str) -> Vec<ConflictMarker> {
    text.lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            detect_conflict_marker(line).map(|(marker_type, branch)| ConflictMarker {
                line: idx + 1,
                marker_type,
                branch,
            })
        })
        .collect()
}

/// True when the text holds at least one conflict start marker.
#[must_use]
pub fn has_conflict_markers(text: &str) -> bool {
    text.lines().any(|line| {
        matches!(
            detect_conflict_marker(line),
            Some((ConflictMarkerType::Start, _))
        )
    })
}

/// Scan a file for merge conflict markers.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn scan_conflict_markers(path: &Path) -> Result<Vec<ConflictMarker>> {
    let text = fs::read_to_string(path).with_path(path)?;
    Ok(scan_conflict_markers_str(&text))
}
