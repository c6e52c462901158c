//! Three-way merge of entity collections.
//!
//! `merge_three_way` is pure: it takes the ancestor (optional), local and
//! incoming collections and returns the merged entities plus a report of
//! every decision it made. It never fails and never blocks on ambiguity.
//!
//! Pipeline:
//! 1. [`index`] keys each side by identity
//! 2. [`classify`] decides what happened to each key
//! 3. [`reconcile`] merges records changed on both sides (using [`text`])
//! 4. Output is sorted by `created_at`
//! 5. [`collision`] renames duplicate human-facing ids

pub mod classify;
pub mod collision;
pub mod index;
pub mod markers;
pub mod reconcile;
pub mod text;

use crate::model::{Entity, compare_timestamps};
use classify::{Classification, SeqPos};
use index::EntityIndex;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Text fields merged line by line unless configured otherwise.
pub const DEFAULT_TEXT_FIELDS: &[&str] = &["content", "description"];

/// One side of a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Ours,
    Theirs,
}

impl Side {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ours => "ours",
            Self::Theirs => "theirs",
        }
    }

    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Ours => Self::Theirs,
            Self::Theirs => Self::Ours,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of decision a conflict record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictAction {
    ConcurrentAddition,
    FieldResolution,
    DeleteModify,
    Rename,
    TextMerge,
}

impl ConflictAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConcurrentAddition => "concurrent-addition",
            Self::FieldResolution => "field-resolution",
            Self::DeleteModify => "delete-modify",
            Self::Rename => "rename",
            Self::TextMerge => "text-merge",
        }
    }
}

impl fmt::Display for ConflictAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decision the merge made automatically. Reporting only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub uuid: String,
    pub id: String,
    pub action: ConflictAction,
    pub description: String,
}

impl Conflict {
    #[must_use]
    pub fn new(entity: &Entity, action: ConflictAction, description: impl Into<String>) -> Self {
        Self {
            uuid: entity.uuid.clone(),
            id: entity.id.clone(),
            action,
            description: description.into(),
        }
    }
}

/// Counters and conflict log for one merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Entities present on only one side.
    pub added: usize,
    pub deleted: usize,
    /// Entities changed on one side (or identically on both).
    pub modified: usize,
    /// Entities merged field by field.
    pub reconciled: usize,
    pub renamed: usize,
    pub unchanged: usize,
    /// Conflicting text blocks resolved by the winner rule.
    pub text_conflicts: usize,
    pub conflicts: Vec<Conflict>,
}

impl MergeStats {
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Merge tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// Field names merged line by line rather than replaced whole.
    pub text_fields: Vec<String>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            text_fields: DEFAULT_TEXT_FIELDS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Merged entities in output order plus the merge report.
#[derive(Debug, Clone, Default)]
pub struct MergeResult {
    pub entities: Vec<Entity>,
    pub stats: MergeStats,
}

/// Merge three entity collections.
///
/// `base` is `None` when no common ancestor exists; every entity present on
/// both sides is then a concurrent addition.
#[must_use]
pub fn merge_three_way(
    base: Option<&[Entity]>,
    ours: &[Entity],
    theirs: &[Entity],
    options: &MergeOptions,
) -> MergeResult {
    let base_index = base.map(EntityIndex::build);
    let ours_index = EntityIndex::build(ours);
    let theirs_index = EntityIndex::build(theirs);

    let classified = classify::classify(base_index.as_ref(), &ours_index, &theirs_index);

    let mut stats = MergeStats::default();
    let mut merged: Vec<(SeqPos, Entity)> = Vec::with_capacity(classified.len());

    for item in classified {
        debug!(key = %item.key, kind = item.kind.label(), "Classified entity");
        match item.kind {
            Classification::Added { entity, .. } => {
                stats.added += 1;
                merged.push((item.position, entity.clone()));
            }
            Classification::Unchanged(entity) => {
                stats.unchanged += 1;
                merged.push((item.position, entity.clone()));
            }
            Classification::ModifiedOneSide { entity, .. } => {
                stats.modified += 1;
                merged.push((item.position, entity.clone()));
            }
            Classification::Converged { entity, had_base } => {
                if had_base {
                    stats.modified += 1;
                } else {
                    stats.added += 1;
                }
                merged.push((item.position, entity.clone()));
            }
            Classification::DeletedOneSide { .. } | Classification::DeletedBoth => {
                stats.deleted += 1;
            }
            Classification::DeleteModify { deleted_by, kept } => {
                stats.modified += 1;
                stats.conflicts.push(Conflict::new(
                    kept,
                    ConflictAction::DeleteModify,
                    format!(
                        "deleted in {deleted_by}, modified in {}; kept the modified record",
                        deleted_by.other()
                    ),
                ));
                merged.push((item.position, kept.clone()));
            }
            Classification::ConcurrentAddition { ours, theirs } => {
                let outcome = reconcile::reconcile(None, ours, theirs, &options.text_fields);
                record_reconciled(&mut stats, &outcome, ConflictAction::ConcurrentAddition);
                merged.push((item.position, outcome.entity));
            }
            Classification::ModifiedBothSides { base, ours, theirs } => {
                let outcome = reconcile::reconcile(Some(base), ours, theirs, &options.text_fields);
                record_reconciled(&mut stats, &outcome, ConflictAction::FieldResolution);
                merged.push((item.position, outcome.entity));
            }
        }
    }

    merged.sort_by(|(pos_a, a), (pos_b, b)| {
        compare_timestamps(a.created_at.as_ref(), b.created_at.as_ref())
            .then_with(|| pos_a.cmp(pos_b))
    });
    let mut entities: Vec<Entity> = merged.into_iter().map(|(_, entity)| entity).collect();

    let renames = collision::resolve_id_collisions(&mut entities);
    stats.renamed = renames.len();
    stats.conflicts.extend(renames);

    info!(
        entities = entities.len(),
        added = stats.added,
        deleted = stats.deleted,
        modified = stats.modified,
        reconciled = stats.reconciled,
        renamed = stats.renamed,
        text_conflicts = stats.text_conflicts,
        "Merge complete"
    );

    MergeResult { entities, stats }
}

fn record_reconciled(
    stats: &mut MergeStats,
    outcome: &reconcile::Reconciled,
    action: ConflictAction,
) {
    stats.reconciled += 1;
    stats.text_conflicts += outcome.text_conflicts;
    stats
        .conflicts
        .push(Conflict::new(&outcome.entity, action, outcome.describe()));
    if outcome.text_conflicts > 0 {
        stats.conflicts.push(Conflict::new(
            &outcome.entity,
            ConflictAction::TextMerge,
            format!(
                "{} overlapping text block(s) in {} resolved to {}",
                outcome.text_conflicts,
                outcome.merged_fields.join(", "),
                outcome.winner
            ),
        ));
    }
}
