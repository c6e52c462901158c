//! Parse a JSONL file containing git conflict markers into per-side views.
//!
//! Lines outside conflict regions are shared and appear in every view. Lines
//! between `<<<<<<<` and `=======` belong to ours, lines between `=======`
//! and `>>>>>>>` to theirs. With `merge.conflictStyle=diff3` a region also
//! carries a `|||||||` base section; when every region has one, a base view
//! is produced as well.

use crate::jsonl::{ConflictMarkerType, SkippedLine, decode_line, detect_conflict_marker};
use crate::model::Entity;
use serde::Serialize;
use tracing::{debug, warn};

/// One conflict region as found in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictRegion {
    /// 1-based line of the opening marker.
    pub start_line: usize,
    /// 1-based line of the closing marker; `None` when unterminated.
    pub end_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ours_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theirs_label: Option<String>,
    pub ours: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<Vec<String>>,
    pub theirs: Vec<String>,
}

/// Per-side entity views reconstructed from a conflicted file.
#[derive(Debug, Clone, Default)]
pub struct MarkerViews {
    pub ours: Vec<Entity>,
    pub theirs: Vec<Entity>,
    /// Present only when every region carried a diff3 base section.
    pub base: Option<Vec<Entity>>,
    pub regions: Vec<ConflictRegion>,
    /// Lines that failed to parse as records, numbered as in the file.
    pub skipped: Vec<SkippedLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Shared,
    Ours,
    Base,
    Theirs,
}

/// Split conflicted text into ours/theirs (and maybe base) entity views.
///
/// Never fails: malformed record lines are skipped with a warning, stray
/// markers outside a region are ignored, and an unterminated region keeps
/// collecting lines for its current side until end of input.
#[must_use]
pub fn parse_conflicted(text: &str) -> MarkerViews {
    let mut views = MarkerViews::default();
    let mut base_view: Vec<Entity> = Vec::new();
    let mut section = Section::Shared;
    let mut region = ConflictRegion::default();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;

        if let Some((kind, label)) = detect_conflict_marker(line) {
            match (kind, section) {
                (ConflictMarkerType::Start, Section::Shared) => {
                    region = ConflictRegion {
                        start_line: line_no,
                        ours_label: label,
                        ..ConflictRegion::default()
                    };
                    section = Section::Ours;
                }
                (ConflictMarkerType::Start, _) => {
                    warn!(line = line_no, "Conflict start marker inside an open region");
                    views.regions.push(std::mem::take(&mut region));
                    region = ConflictRegion {
                        start_line: line_no,
                        ours_label: label,
                        ..ConflictRegion::default()
                    };
                    section = Section::Ours;
                }
                (ConflictMarkerType::Base, Section::Ours) => {
                    region.base = Some(Vec::new());
                    section = Section::Base;
                }
                (ConflictMarkerType::Separator, Section::Ours | Section::Base) => {
                    section = Section::Theirs;
                }
                (ConflictMarkerType::End, Section::Theirs) => {
                    region.end_line = Some(line_no);
                    region.theirs_label = label;
                    views.regions.push(std::mem::take(&mut region));
                    section = Section::Shared;
                }
                (ConflictMarkerType::End, Section::Ours | Section::Base) => {
                    warn!(line = line_no, "Conflict end marker without separator");
                    region.end_line = Some(line_no);
                    region.theirs_label = label;
                    views.regions.push(std::mem::take(&mut region));
                    section = Section::Shared;
                }
                (kind, _) => {
                    warn!(line = line_no, marker = ?kind, "Skipping stray conflict marker");
                }
            }
            continue;
        }

        match section {
            Section::Ours => region.ours.push(line.to_string()),
            Section::Base => {
                if let Some(base) = region.base.as_mut() {
                    base.push(line.to_string());
                }
            }
            Section::Theirs => region.theirs.push(line.to_string()),
            Section::Shared => {}
        }

        let entity = match decode_line(line) {
            Ok(Some(entity)) => entity,
            Ok(None) => continue,
            Err(err) => {
                warn!(line = line_no, error = %err, "Skipping malformed JSONL line");
                views.skipped.push(SkippedLine {
                    line: line_no,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        match section {
            Section::Shared => {
                views.ours.push(entity.clone());
                views.theirs.push(entity.clone());
                base_view.push(entity);
            }
            Section::Ours => views.ours.push(entity),
            Section::Base => base_view.push(entity),
            Section::Theirs => views.theirs.push(entity),
        }
    }

    if section != Section::Shared {
        warn!(
            start_line = region.start_line,
            "Unterminated conflict region at end of input"
        );
        views.regions.push(region);
    }

    let all_have_base =
        !views.regions.is_empty() && views.regions.iter().all(|r| r.base.is_some());
    views.base = all_have_base.then_some(base_view);

    debug!(
        regions = views.regions.len(),
        ours = views.ours.len(),
        theirs = views.theirs.len(),
        has_base = views.base.is_some(),
        skipped = views.skipped.len(),
        "Parsed conflict markers"
    );
    views
}
