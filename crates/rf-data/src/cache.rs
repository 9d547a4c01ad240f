//! Cache/metadata store: global counters and cached derived lists.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use rf_types::DataError;

/// Meta keys for global counters.
pub const NUM_USERS: &str = "num_users";
pub const NUM_ITEMS: &str = "num_items";
pub const NUM_FEEDBACK: &str = "num_feedback";

/// List prefixes for cached derived rankings.
pub const SIMILAR_ITEMS: &str = "similar_items";
pub const POPULAR_ITEMS: &str = "popular_items";
pub const LATEST_ITEMS: &str = "latest_items";

/// An item with an attached ranking score, stored in descending score order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item_id: String,
    pub score: f64,
}

impl ScoredItem {
    pub fn new(item_id: impl Into<String>, score: f64) -> Self {
        Self {
            item_id: item_id.into(),
            score,
        }
    }
}

/// Key-value cache consumed by the serving path and produced by the
/// coordinator's fit cycle.
pub trait CacheStore: Send + Sync {
    fn set_meta(&self, key: &str, value: String) -> Result<(), DataError>;
    fn get_meta(&self, key: &str) -> Result<Option<String>, DataError>;
    fn set_list(&self, prefix: &str, key: &str, items: Vec<ScoredItem>) -> Result<(), DataError>;
    fn get_list(&self, prefix: &str, key: &str) -> Result<Option<Vec<ScoredItem>>, DataError>;
}

/// In-memory cache store used by tests and single-process deployments.
#[derive(Default)]
pub struct MemoryCacheStore {
    meta: DashMap<String, String>,
    lists: DashMap<String, Vec<ScoredItem>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn list_key(prefix: &str, key: &str) -> String {
        format!("{prefix}/{key}")
    }
}

impl CacheStore for MemoryCacheStore {
    fn set_meta(&self, key: &str, value: String) -> Result<(), DataError> {
        self.meta.insert(key.to_string(), value);
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<String>, DataError> {
        Ok(self.meta.get(key).map(|v| v.clone()))
    }

    fn set_list(&self, prefix: &str, key: &str, items: Vec<ScoredItem>) -> Result<(), DataError> {
        self.lists.insert(Self::list_key(prefix, key), items);
        Ok(())
    }

    fn get_list(&self, prefix: &str, key: &str) -> Result<Option<Vec<ScoredItem>>, DataError> {
        Ok(self.lists.get(&Self::list_key(prefix, key)).map(|v| v.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_round_trip() {
        let cache = MemoryCacheStore::new();
        cache.set_meta(NUM_USERS, "42".to_string()).unwrap();
        assert_eq!(cache.get_meta(NUM_USERS).unwrap().as_deref(), Some("42"));
        assert_eq!(cache.get_meta(NUM_ITEMS).unwrap(), None);
    }

    #[test]
    fn lists_are_namespaced_by_prefix() {
        let cache = MemoryCacheStore::new();
        cache
            .set_list(SIMILAR_ITEMS, "i1", vec![ScoredItem::new("i2", 0.9)])
            .unwrap();
        cache
            .set_list(POPULAR_ITEMS, "i1", vec![ScoredItem::new("i3", 5.0)])
            .unwrap();

        let similar = cache.get_list(SIMILAR_ITEMS, "i1").unwrap().unwrap();
        assert_eq!(similar[0].item_id, "i2");
        let popular = cache.get_list(POPULAR_ITEMS, "i1").unwrap().unwrap();
        assert_eq!(popular[0].item_id, "i3");
    }
}
