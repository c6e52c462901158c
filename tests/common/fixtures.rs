#![allow(dead_code)]

use docket::jsonl;
use docket::model::{Entity, Relationship, Timestamp};
use std::fs;
use std::path::{Path, PathBuf};

/// Fixed dates so merged output is deterministic.
pub const JAN_01: &str = "2025-01-01T00:00:00Z";
pub const JAN_02: &str = "2025-01-02T00:00:00Z";
pub const JAN_03: &str = "2025-01-03T00:00:00Z";
pub const JAN_04: &str = "2025-01-04T00:00:00Z";

pub fn entity(id: &str, uuid: &str) -> Entity {
    EntityBuilder::new(id, uuid).build()
}

pub struct EntityBuilder {
    entity: Entity,
}

impl EntityBuilder {
    pub fn new(id: &str, uuid: &str) -> Self {
        let mut entity = Entity::new(id, uuid);
        entity.title = Some(format!("Record {id}"));
        entity.created_at = Some(Timestamp::new(JAN_01));
        entity.updated_at = Some(Timestamp::new(JAN_01));
        Self { entity }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.entity.title = Some(title.to_string());
        self
    }

    pub fn content(mut self, content: &str) -> Self {
        self.entity.content = Some(content.to_string());
        self
    }

    pub fn created(mut self, at: &str) -> Self {
        self.entity.created_at = Some(Timestamp::new(at));
        self
    }

    pub fn updated(mut self, at: &str) -> Self {
        self.entity.updated_at = Some(Timestamp::new(at));
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.entity.tags = Some(tags.iter().map(ToString::to_string).collect());
        self
    }

    pub fn relates_to(mut self, to: &str) -> Self {
        let rel = Relationship {
            from: self.entity.uuid.clone(),
            from_type: "issue".to_string(),
            to: to.to_string(),
            to_type: "issue".to_string(),
            rel_type: "related".to_string(),
            extra: serde_json::Map::new(),
        };
        self.entity.relationships.get_or_insert_with(Vec::new).push(rel);
        self
    }

    pub fn extra(mut self, key: &str, value: serde_json::Value) -> Self {
        self.entity.extra.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> Entity {
        self.entity
    }
}

/// Serialize entities to JSONL text.
pub fn jsonl_text(entities: &[Entity]) -> String {
    jsonl::encode_entities(entities).expect("encode entities")
}

/// Write entities to `dir/name` and return the path.
pub fn write_jsonl(dir: &Path, name: &str, entities: &[Entity]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, jsonl_text(entities)).expect("write jsonl fixture");
    path
}

/// Build a conflicted file: shared records, then one marker region.
pub fn conflicted_text(
    shared: &[Entity],
    ours: &[Entity],
    base: Option<&[Entity]>,
    theirs: &[Entity],
) -> String {
    let mut text = jsonl_text(shared);
    text.push_str("<<<<<<< HEAD\n");
    text.push_str(&jsonl_text(ours));
    if let Some(base) = base {
        text.push_str("||||||| base\n");
        text.push_str(&jsonl_text(base));
    }
    text.push_str("=======\n");
    text.push_str(&jsonl_text(theirs));
    text.push_str(">>>>>>> feature\n");
    text
}

pub fn ids(entities: &[Entity]) -> Vec<&str> {
    entities.iter().map(|e| e.id.as_str()).collect()
}

pub fn uuids(entities: &[Entity]) -> Vec<&str> {
    entities.iter().map(|e| e.uuid.as_str()).collect()
}
