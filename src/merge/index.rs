//! Identity index over one side of a merge.

use crate::model::Entity;
use std::collections::HashMap;

/// An entity together with its position in the input sequence.
#[derive(Debug, Clone, Copy)]
pub struct Indexed<'a> {
    pub position: usize,
    pub entity: &'a Entity,
}

/// Identity key to entity map for one side, preserving first-seen order.
#[derive(Debug, Default)]
pub struct EntityIndex<'a> {
    by_key: HashMap<String, Indexed<'a>>,
    order: Vec<String>,
}

impl<'a> EntityIndex<'a> {
    /// Index a sequence of entities.
    ///
    /// When a key appears more than once the last record wins, but it keeps
    /// the position of the first occurrence.
    #[must_use]
    pub fn build(entities: &'a [Entity]) -> Self {
        let mut index = Self {
            by_key: HashMap::with_capacity(entities.len()),
            order: Vec::with_capacity(entities.len()),
        };
        for (position, entity) in entities.iter().enumerate() {
            let key = entity.identity_key();
            match index.by_key.get_mut(&key) {
                Some(existing) => existing.entity = entity,
                None => {
                    index.order.push(key.clone());
                    index.by_key.insert(key, Indexed { position, entity });
                }
            }
        }
        index
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a Entity> {
        self.by_key.get(key).map(|indexed| indexed.entity)
    }

    #[must_use]
    pub fn position(&self, key: &str) -> Option<usize> {
        self.by_key.get(key).map(|indexed| indexed.position)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Keys in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
