//! Non-personalized artifacts derived from the dataset on every fit cycle:
//! per-item neighbor lists, global popularity, and latest items.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use rf_data::{cache, CacheStore, LoadedData, ScoredItem};
use rf_types::DataError;

/// Recompute the cached item lists from the loaded data.
pub fn collect(loaded: &LoadedData, top_n: usize, cache_store: &dyn CacheStore) -> Result<(), DataError> {
    collect_similar(loaded, top_n, cache_store)?;
    collect_popular(loaded, top_n, cache_store)?;
    collect_latest(loaded, top_n, cache_store)?;
    debug!(items = loaded.dataset.item_count(), top_n, "item lists refreshed");
    Ok(())
}

/// Cosine similarity over the sets of users that interacted with each item.
fn collect_similar(
    loaded: &LoadedData,
    top_n: usize,
    cache_store: &dyn CacheStore,
) -> Result<(), DataError> {
    let dataset = &loaded.dataset;
    let mut users_of: HashMap<u32, HashSet<u32>> = HashMap::new();
    for &(user, item) in dataset.pairs() {
        users_of.entry(item).or_default().insert(user);
    }

    for (&item, users) in &users_of {
        let mut neighbors = Vec::new();
        for (&other, other_users) in &users_of {
            if other == item {
                continue;
            }
            let overlap = users.intersection(other_users).count();
            if overlap == 0 {
                continue;
            }
            let score = overlap as f64 / ((users.len() * other_users.len()) as f64).sqrt();
            if let Some(other_id) = dataset.item_index().id(other) {
                neighbors.push(ScoredItem::new(other_id, score));
            }
        }
        neighbors.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        neighbors.truncate(top_n);
        if let Some(item_id) = dataset.item_index().id(item) {
            cache_store.set_list(cache::SIMILAR_ITEMS, item_id, neighbors)?;
        }
    }
    Ok(())
}

/// Items ranked by interaction count.
fn collect_popular(
    loaded: &LoadedData,
    top_n: usize,
    cache_store: &dyn CacheStore,
) -> Result<(), DataError> {
    let dataset = &loaded.dataset;
    let mut counts: HashMap<u32, usize> = HashMap::new();
    for &(_, item) in dataset.pairs() {
        *counts.entry(item).or_insert(0) += 1;
    }

    let mut ranked: Vec<ScoredItem> = counts
        .iter()
        .filter_map(|(&item, &count)| {
            dataset
                .item_index()
                .id(item)
                .map(|id| ScoredItem::new(id, count as f64))
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    ranked.truncate(top_n);

    cache_store.set_list(cache::POPULAR_ITEMS, "global", ranked)
}

/// Items ranked by timestamp, newest first, scored by epoch seconds.
fn collect_latest(
    loaded: &LoadedData,
    top_n: usize,
    cache_store: &dyn CacheStore,
) -> Result<(), DataError> {
    let mut ranked: Vec<ScoredItem> = loaded
        .items
        .iter()
        .map(|item| ScoredItem::new(&item.item_id, item.timestamp.timestamp() as f64))
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    ranked.truncate(top_n);

    cache_store.set_list(cache::LATEST_ITEMS, "global", ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rf_data::{Dataset, Item, MemoryCacheStore};

    fn loaded_data() -> LoadedData {
        let mut dataset = Dataset::new();
        // i0 and i1 share two users; i2 shares one user with each.
        dataset.add("u0", "i0");
        dataset.add("u0", "i1");
        dataset.add("u1", "i0");
        dataset.add("u1", "i1");
        dataset.add("u2", "i0");
        dataset.add("u2", "i2");
        dataset.add("u3", "i2");

        let now = Utc::now();
        let items = vec![
            Item::new("i0", now - Duration::days(3)),
            Item::new("i1", now - Duration::days(1)),
            Item::new("i2", now - Duration::days(2)),
        ];
        LoadedData {
            dataset,
            items,
            feedback: Vec::new(),
        }
    }

    #[test]
    fn similar_lists_rank_by_user_overlap() {
        let cache_store = MemoryCacheStore::new();
        collect(&loaded_data(), 10, &cache_store).unwrap();

        let neighbors = cache_store
            .get_list(cache::SIMILAR_ITEMS, "i0")
            .unwrap()
            .expect("list present");
        assert_eq!(neighbors[0].item_id, "i1");
        assert!(neighbors[0].score > neighbors[1].score);
        assert_eq!(neighbors[1].item_id, "i2");
    }

    #[test]
    fn popular_list_ranks_by_interaction_count() {
        let cache_store = MemoryCacheStore::new();
        collect(&loaded_data(), 10, &cache_store).unwrap();

        let popular = cache_store
            .get_list(cache::POPULAR_ITEMS, "global")
            .unwrap()
            .unwrap();
        let ids: Vec<&str> = popular.iter().map(|s| s.item_id.as_str()).collect();
        assert_eq!(ids, vec!["i0", "i1", "i2"]);
        assert_eq!(popular[0].score, 3.0);
    }

    #[test]
    fn latest_list_ranks_by_timestamp() {
        let cache_store = MemoryCacheStore::new();
        collect(&loaded_data(), 10, &cache_store).unwrap();

        let latest = cache_store
            .get_list(cache::LATEST_ITEMS, "global")
            .unwrap()
            .unwrap();
        let ids: Vec<&str> = latest.iter().map(|s| s.item_id.as_str()).collect();
        assert_eq!(ids, vec!["i1", "i2", "i0"]);
    }

    #[test]
    fn top_n_truncates_every_list() {
        let cache_store = MemoryCacheStore::new();
        collect(&loaded_data(), 1, &cache_store).unwrap();

        let popular = cache_store
            .get_list(cache::POPULAR_ITEMS, "global")
            .unwrap()
            .unwrap();
        assert_eq!(popular.len(), 1);
        let neighbors = cache_store
            .get_list(cache::SIMILAR_ITEMS, "i0")
            .unwrap()
            .unwrap();
        assert_eq!(neighbors.len(), 1);
    }
}
