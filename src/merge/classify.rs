//! Diff classification by presence pattern across base, ours and theirs.

use super::Side;
use super::index::EntityIndex;
use crate::model::Entity;

/// Stable ordering key carried through the merge.
///
/// Entities present in ours sort by their ours position; theirs-only
/// entities follow, by their theirs position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SeqPos {
    rank: u8,
    index: usize,
}

impl SeqPos {
    const fn ours(index: usize) -> Self {
        Self { rank: 0, index }
    }

    const fn theirs(index: usize) -> Self {
        Self { rank: 1, index }
    }

    const fn base(index: usize) -> Self {
        Self { rank: 2, index }
    }
}

/// What happened to one identity key.
#[derive(Debug, Clone, Copy)]
pub enum Classification<'a> {
    /// Present on one side only, with no base record.
    Added { side: Side, entity: &'a Entity },
    /// On both sides, not in base, and the copies differ.
    ConcurrentAddition { ours: &'a Entity, theirs: &'a Entity },
    /// Exactly one side changed the base record (or only one side holds it
    /// and the other never deleted it).
    ModifiedOneSide { side: Side, entity: &'a Entity },
    /// Both sides hold the same record, so there is nothing to reconcile.
    Converged { entity: &'a Entity, had_base: bool },
    /// Removed by one side, untouched by the other.
    DeletedOneSide { deleted_by: Side },
    /// Removed by one side, modified by the other. The modified record wins.
    DeleteModify { deleted_by: Side, kept: &'a Entity },
    DeletedBoth,
    /// Both sides changed the base record differently.
    ModifiedBothSides {
        base: &'a Entity,
        ours: &'a Entity,
        theirs: &'a Entity,
    },
    Unchanged(&'a Entity),
}

impl Classification<'_> {
    /// Short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Added {
                side: Side::Ours, ..
            } => "added-ours",
            Self::Added {
                side: Side::Theirs,
                ..
            } => "added-theirs",
            Self::ConcurrentAddition { .. } => "concurrent-addition",
            Self::ModifiedOneSide { .. } => "modified-one-side",
            Self::Converged { .. } => "converged",
            Self::DeletedOneSide { .. } => "deleted-one-side",
            Self::DeleteModify { .. } => "delete-modify",
            Self::DeletedBoth => "deleted-both",
            Self::ModifiedBothSides { .. } => "modified-both-sides",
            Self::Unchanged(_) => "unchanged",
        }
    }
}

/// A classified identity key.
#[derive(Debug, Clone)]
pub struct Classified<'a> {
    pub key: String,
    pub position: SeqPos,
    pub kind: Classification<'a>,
}

/// Classify every key that appears on any side.
///
/// Keys are visited in ours order, then theirs-only keys in theirs order,
/// then base-only keys.
#[must_use]
pub fn classify<'a>(
    base: Option<&EntityIndex<'a>>,
    ours: &EntityIndex<'a>,
    theirs: &EntityIndex<'a>,
) -> Vec<Classified<'a>> {
    let mut out = Vec::with_capacity(ours.len() + theirs.len());

    for key in ours.keys() {
        let position = SeqPos::ours(ours.position(key).unwrap_or_default());
        out.push(Classified {
            key: key.to_string(),
            position,
            kind: classify_key(base.and_then(|b| b.get(key)), ours.get(key), theirs.get(key)),
        });
    }

    for key in theirs.keys().filter(|key| !ours.contains(key)) {
        let position = SeqPos::theirs(theirs.position(key).unwrap_or_default());
        out.push(Classified {
            key: key.to_string(),
            position,
            kind: classify_key(base.and_then(|b| b.get(key)), None, theirs.get(key)),
        });
    }

    if let Some(base) = base {
        for key in base
            .keys()
            .filter(|key| !ours.contains(key) && !theirs.contains(key))
        {
            out.push(Classified {
                key: key.to_string(),
                position: SeqPos::base(base.position(key).unwrap_or_default()),
                kind: Classification::DeletedBoth,
            });
        }
    }

    out
}

/// Classify one key from its three (possibly missing) records.
#[must_use]
pub fn classify_key<'a>(
    base: Option<&'a Entity>,
    ours: Option<&'a Entity>,
    theirs: Option<&'a Entity>,
) -> Classification<'a> {
    match (base, ours, theirs) {
        (_, None, None) => Classification::DeletedBoth,
        (None, Some(entity), None) => Classification::Added {
            side: Side::Ours,
            entity,
        },
        (None, None, Some(entity)) => Classification::Added {
            side: Side::Theirs,
            entity,
        },
        (None, Some(ours), Some(theirs)) => {
            if ours == theirs {
                Classification::Converged {
                    entity: ours,
                    had_base: false,
                }
            } else {
                Classification::ConcurrentAddition { ours, theirs }
            }
        }
        (Some(base), Some(kept), None) => one_side_deleted(base, kept, Side::Theirs),
        (Some(base), None, Some(kept)) => one_side_deleted(base, kept, Side::Ours),
        (Some(base), Some(ours), Some(theirs)) => {
            match (ours == base, theirs == base) {
                (true, true) => Classification::Unchanged(ours),
                (false, true) => Classification::ModifiedOneSide {
                    side: Side::Ours,
                    entity: ours,
                },
                (true, false) => Classification::ModifiedOneSide {
                    side: Side::Theirs,
                    entity: theirs,
                },
                (false, false) if ours == theirs => Classification::Converged {
                    entity: ours,
                    had_base: true,
                },
                (false, false) => Classification::ModifiedBothSides { base, ours, theirs },
            }
        }
    }
}

fn one_side_deleted<'a>(base: &Entity, kept: &'a Entity, deleted_by: Side) -> Classification<'a> {
    if kept == base {
        Classification::DeletedOneSide { deleted_by }
    } else {
        Classification::DeleteModify { deleted_by, kept }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titled(uuid: &str, title: &str) -> Entity {
        let mut e = Entity::new(format!("ID-{uuid}"), uuid);
        e.title = Some(title.to_string());
        e
    }

    fn label(base: Option<&Entity>, ours: Option<&Entity>, theirs: Option<&Entity>) -> &'static str {
        classify_key(base, ours, theirs).label()
    }

    #[test]
    fn test_presence_patterns() {
        let base = titled("u", "base");
        let changed = titled("u", "changed");
        let other = titled("u", "other");

        assert_eq!(label(None, Some(&base), None), "added-ours");
        assert_eq!(label(None, None, Some(&base)), "added-theirs");
        assert_eq!(label(None, Some(&changed), Some(&other)), "concurrent-addition");
        assert_eq!(label(None, Some(&base), Some(&base)), "converged");
        assert_eq!(label(Some(&base), Some(&base), None), "deleted-one-side");
        assert_eq!(label(Some(&base), None, Some(&changed)), "delete-modify");
        assert_eq!(label(Some(&base), None, None), "deleted-both");
        assert_eq!(label(Some(&base), Some(&changed), Some(&base)), "modified-one-side");
        assert_eq!(label(Some(&base), Some(&base), Some(&changed)), "modified-one-side");
        assert_eq!(label(Some(&base), Some(&changed), Some(&changed)), "converged");
        assert_eq!(
            label(Some(&base), Some(&changed), Some(&other)),
            "modified-both-sides"
        );
        assert_eq!(label(Some(&base), Some(&base), Some(&base)), "unchanged");
    }

    #[test]
    fn test_modified_one_side_picks_changed_record() {
        let base = titled("u", "base");
        let changed = titled("u", "changed");
        match classify_key(Some(&base), Some(&base), Some(&changed)) {
            Classification::ModifiedOneSide { side, entity } => {
                assert_eq!(side, Side::Theirs);
                assert_eq!(entity.title.as_deref(), Some("changed"));
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn test_classify_visits_ours_then_theirs_then_base() {
        let base = vec![titled("gone", "x"), titled("shared", "x")];
        let ours = vec![titled("shared", "x"), titled("mine", "x")];
        let theirs = vec![titled("yours", "x"), titled("shared", "x")];

        let base_index = EntityIndex::build(&base);
        let ours_index = EntityIndex::build(&ours);
        let theirs_index = EntityIndex::build(&theirs);
        let result = classify(Some(&base_index), &ours_index, &theirs_index);

        let keys: Vec<_> = result.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, ["shared", "mine", "yours", "gone"]);
        assert!(result[0].position < result[2].position);
        assert_eq!(result[3].kind.label(), "deleted-both");
    }
}
