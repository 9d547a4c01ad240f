//! Dense index mapping external string identifiers to internal ids.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bidirectional mapping from external identifiers to dense `u32` indices.
/// Insertion order assigns indices, so two indices built from the same id
/// sequence are identical.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Index {
    ids: Vec<String>,
    positions: HashMap<String, u32>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `id` if absent and return its dense index.
    pub fn insert(&mut self, id: &str) -> u32 {
        if let Some(&pos) = self.positions.get(id) {
            return pos;
        }
        let pos = self.ids.len() as u32;
        self.ids.push(id.to_string());
        self.positions.insert(id.to_string(), pos);
        pos
    }

    pub fn get(&self, id: &str) -> Option<u32> {
        self.positions.get(id).copied()
    }

    pub fn id(&self, pos: u32) -> Option<&str> {
        self.ids.get(pos as usize).map(String::as_str)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut index = Index::new();
        assert_eq!(index.insert("alice"), 0);
        assert_eq!(index.insert("bob"), 1);
        assert_eq!(index.insert("alice"), 0);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn lookup_both_directions() {
        let mut index = Index::new();
        index.insert("alice");
        index.insert("bob");
        assert_eq!(index.get("bob"), Some(1));
        assert_eq!(index.id(1), Some("bob"));
        assert_eq!(index.get("carol"), None);
        assert_eq!(index.id(9), None);
    }
}
