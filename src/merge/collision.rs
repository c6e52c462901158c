//! Human-facing id collision handling.
//!
//! Two branches can independently mint the same `id` for different records.
//! Walking the merged output in order, the first record keeps the id and
//! each later holder is renamed to the smallest free `<id>.N`.

use super::{Conflict, ConflictAction};
use crate::model::Entity;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Rename colliding ids in place. Returns one `rename` conflict per rename.
///
/// Only `id` changes; `uuid` and every other field are left alone. Records
/// with an empty id are never renamed.
pub fn resolve_id_collisions(entities: &mut [Entity]) -> Vec<Conflict> {
    let mut used: HashSet<String> = entities.iter().map(|e| e.id.clone()).collect();
    let mut holders: HashMap<String, String> = HashMap::with_capacity(entities.len());
    let mut conflicts = Vec::new();

    for entity in entities.iter_mut() {
        if entity.id.is_empty() {
            continue;
        }
        let key = entity.identity_key();
        let Some(holder) = holders.get(&entity.id) else {
            holders.insert(entity.id.clone(), key);
            continue;
        };
        if *holder == key {
            continue;
        }

        let new_id = next_free_id(&entity.id, &used);
        debug!(old = %entity.id, new = %new_id, uuid = %entity.uuid, "Renaming colliding id");
        let description = format!(
            "id {} already held by {holder}; renamed to {new_id}",
            entity.id
        );
        used.insert(new_id.clone());
        holders.insert(new_id.clone(), key);
        entity.id = new_id;
        conflicts.push(Conflict::new(entity, ConflictAction::Rename, description));
    }

    conflicts
}

fn next_free_id(id: &str, used: &HashSet<String>) -> String {
    (1..)
        .map(|n| format!("{id}.{n}"))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| format!("{id}.x"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(entities: &[Entity]) -> Vec<&str> {
        entities.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_first_holder_keeps_id() {
        let mut entities = vec![
            Entity::new("ISSUE-002", "u-ours"),
            Entity::new("ISSUE-002", "u-theirs"),
        ];
        let conflicts = resolve_id_collisions(&mut entities);
        assert_eq!(ids(&entities), ["ISSUE-002", "ISSUE-002.1"]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].uuid, "u-theirs");
        assert_eq!(conflicts[0].id, "ISSUE-002.1");
        assert_eq!(conflicts[0].action, ConflictAction::Rename);
    }

    #[test]
    fn test_suffix_skips_ids_in_use() {
        let mut entities = vec![
            Entity::new("ISSUE-002", "u-1"),
            Entity::new("ISSUE-002.1", "u-2"),
            Entity::new("ISSUE-002", "u-3"),
            Entity::new("ISSUE-002", "u-4"),
        ];
        resolve_id_collisions(&mut entities);
        assert_eq!(
            ids(&entities),
            ["ISSUE-002", "ISSUE-002.1", "ISSUE-002.2", "ISSUE-002.3"]
        );
    }

    #[test]
    fn test_no_collisions_no_changes() {
        let mut entities = vec![Entity::new("A", "u-1"), Entity::new("B", "u-2")];
        assert!(resolve_id_collisions(&mut entities).is_empty());
        assert_eq!(ids(&entities), ["A", "B"]);
    }

    #[test]
    fn test_empty_ids_left_alone() {
        let mut entities = vec![Entity::new("", "u-1"), Entity::new("", "u-2")];
        assert!(resolve_id_collisions(&mut entities).is_empty());
    }
}
