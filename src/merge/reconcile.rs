//! Field-level reconciliation of a record changed on both sides.
//!
//! The side with the later `updated_at` wins (ours on a tie). Its record is
//! the starting point; then:
//! - `tags`, `relationships` and `feedback` become the union of both sides
//! - configured text fields are merged line by line
//! - fields only the loser added (absent from base) are carried over

use super::Side;
use super::text::merge_text;
use crate::model::{Entity, Extra, Feedback, Relationship, compare_timestamps};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::hash::Hash;

/// A reconciled record plus what the reconciler did to produce it.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub entity: Entity,
    pub winner: Side,
    /// Fields combined from both sides (sets and text).
    pub merged_fields: Vec<String>,
    /// Fields where the sides disagreed and the winner's value was taken.
    pub replaced_fields: Vec<String>,
    pub text_conflicts: usize,
}

impl Reconciled {
    /// Human-readable summary for the conflict report.
    #[must_use]
    pub fn describe(&self) -> String {
        let updated = self
            .entity
            .updated_at
            .as_ref()
            .map_or("none", |ts| ts.as_str());
        let mut out = format!("{} won (updated_at {updated})", self.winner);
        if !self.merged_fields.is_empty() {
            out.push_str("; merged ");
            out.push_str(&self.merged_fields.join(", "));
        }
        if !self.replaced_fields.is_empty() {
            out.push_str("; replaced ");
            out.push_str(&self.replaced_fields.join(", "));
        }
        out
    }
}

/// Pick the side whose scalar fields win: later `updated_at`, ours on a tie.
#[must_use]
pub fn pick_winner(ours: &Entity, theirs: &Entity) -> Side {
    match compare_timestamps(theirs.updated_at.as_ref(), ours.updated_at.as_ref()) {
        Ordering::Greater => Side::Theirs,
        Ordering::Less | Ordering::Equal => Side::Ours,
    }
}

/// Reconcile two versions of the same record.
///
/// `base` is the common ancestor, or `None` for a concurrent addition.
#[must_use]
pub fn reconcile(
    base: Option<&Entity>,
    ours: &Entity,
    theirs: &Entity,
    text_fields: &[String],
) -> Reconciled {
    let winner_side = pick_winner(ours, theirs);
    let (winner, loser) = match winner_side {
        Side::Ours => (ours, theirs),
        Side::Theirs => (theirs, ours),
    };

    let mut merged = winner.clone();
    let mut merged_fields = Vec::new();
    let mut replaced_fields = Vec::new();

    let is_text = |name: &str| text_fields.iter().any(|f| f == name);

    let base_has = |has: fn(&Entity) -> bool| base.map(has);
    let mut replaced = |name: &str, differs: bool| {
        if differs {
            replaced_fields.push(name.to_string());
        }
    };

    // Scalars: winner's value, or the loser's when only the loser added it.
    if !is_text("title") {
        replaced("title", winner.title != loser.title);
        merged.title = pick_added(
            winner.title.as_ref(),
            loser.title.as_ref(),
            base_has(|b| b.title.is_some()),
        );
    }
    replaced("status", winner.status != loser.status);
    merged.status = pick_added(
        winner.status.as_ref(),
        loser.status.as_ref(),
        base_has(|b| b.status.is_some()),
    );
    replaced("priority", winner.priority != loser.priority);
    merged.priority = pick_added(
        winner.priority.as_ref(),
        loser.priority.as_ref(),
        base_has(|b| b.priority.is_some()),
    );
    replaced("created_at", winner.created_at != loser.created_at);
    merged.created_at = pick_added(
        winner.created_at.as_ref(),
        loser.created_at.as_ref(),
        base_has(|b| b.created_at.is_some()),
    );
    if !is_text("content") {
        replaced("content", winner.content != loser.content);
        merged.content = pick_added(
            winner.content.as_ref(),
            loser.content.as_ref(),
            base_has(|b| b.content.is_some()),
        );
    }
    if !is_text("description") {
        replaced("description", winner.description != loser.description);
        merged.description = pick_added(
            winner.description.as_ref(),
            loser.description.as_ref(),
            base_has(|b| b.description.is_some()),
        );
    }
    replaced("id", winner.id != loser.id);

    merge_extra(
        &mut merged.extra,
        &loser.extra,
        base.map(|b| &b.extra),
        text_fields,
        &mut replaced_fields,
    );

    if union_into(&mut merged.tags, loser.tags.as_deref(), |tag| tag.clone()) {
        merged_fields.push("tags".to_string());
    }
    if union_into(
        &mut merged.relationships,
        loser.relationships.as_deref(),
        Relationship::key,
    ) {
        merged_fields.push("relationships".to_string());
    }
    if union_into(&mut merged.feedback, loser.feedback.as_deref(), |fb: &Feedback| {
        fb.id.clone()
    }) {
        merged_fields.push("feedback".to_string());
    }

    let mut text_conflicts = 0;
    for field in text_fields {
        let ours_text = ours.text_field(field);
        let theirs_text = theirs.text_field(field);
        let typed = matches!(field.as_str(), "content" | "description" | "title");

        let merged_text = match (ours_text, theirs_text) {
            (Some(o), Some(t)) if o == t => continue,
            (Some(o), Some(t)) => {
                let base_text = base.and_then(|b| b.text_field(field)).unwrap_or("");
                let result = merge_text(base_text, o, t, winner_side);
                text_conflicts += result.conflicts;
                result.text
            }
            // One side lacks a typed text field: take the other side's text.
            (Some(only), None) | (None, Some(only)) if typed => only.to_string(),
            _ => continue,
        };
        merged.set_text_field(field, Some(merged_text));
        merged_fields.push(field.clone());
    }

    Reconciled {
        entity: merged,
        winner: winner_side,
        merged_fields,
        replaced_fields,
        text_conflicts,
    }
}

/// Winner's value when present. Otherwise the loser's, unless the base held
/// the field (the winner removed it).
fn pick_added<T: Clone>(winner: Option<&T>, loser: Option<&T>, base_had: Option<bool>) -> Option<T> {
    match (winner, loser) {
        (Some(value), _) => Some(value.clone()),
        (None, Some(value)) if base_had != Some(true) => Some(value.clone()),
        _ => None,
    }
}

fn merge_extra(
    merged: &mut Extra,
    loser: &Extra,
    base: Option<&Extra>,
    text_fields: &[String],
    replaced_fields: &mut Vec<String>,
) {
    for (key, loser_value) in loser {
        if text_fields.iter().any(|f| f == key) {
            // Text merge handles string values; otherwise fall through to
            // the whole-value rule below.
            if merged.get(key).is_some_and(serde_json::Value::is_string)
                && loser_value.is_string()
            {
                continue;
            }
        }
        match merged.get(key) {
            Some(winner_value) => {
                if winner_value != loser_value {
                    replaced_fields.push(key.clone());
                }
            }
            None => {
                let base_had = base.is_some_and(|b| b.contains_key(key));
                if base_had {
                    replaced_fields.push(key.clone());
                } else {
                    merged.insert(key.clone(), loser_value.clone());
                }
            }
        }
    }
    for key in merged.keys() {
        if !loser.contains_key(key) && !replaced_fields.contains(key) {
            replaced_fields.push(key.clone());
        }
    }
}

/// Union the loser's items into the winner's set, keyed by `key_of`.
///
/// Winner's items come first; the loser's unseen items follow in order.
/// Returns true when both sides held the set (a merge took place).
fn union_into<T, K, F>(winner: &mut Option<Vec<T>>, loser: Option<&[T]>, key_of: F) -> bool
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let Some(loser) = loser else {
        if let Some(items) = winner.as_mut() {
            dedup_by_key(items, &key_of);
        }
        return false;
    };

    let items = winner.get_or_insert_with(Vec::new);
    dedup_by_key(items, &key_of);
    let mut seen: HashSet<K> = items.iter().map(&key_of).collect();
    for item in loser {
        if seen.insert(key_of(item)) {
            items.push(item.clone());
        }
    }
    true
}

fn dedup_by_key<T, K, F>(items: &mut Vec<T>, key_of: &F)
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::with_capacity(items.len());
    items.retain(|item| seen.insert(key_of(item)));
}
