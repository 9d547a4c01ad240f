//! Feedback/item store abstraction with allowlist and TTL filtering.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use rf_types::DataError;

use crate::dataset::Dataset;

/// A recommendable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: String,
    pub timestamp: DateTime<Utc>,
    pub labels: Vec<String>,
}

impl Item {
    pub fn new(item_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            item_id: item_id.into(),
            timestamp,
            labels: Vec::new(),
        }
    }
}

/// One user/item feedback event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub feedback_type: String,
    pub user_id: String,
    pub item_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Filter applied when loading training data: only feedback whose type is in
/// the positive allowlist counts, and stale items/feedback past their TTL
/// cutoffs are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackFilter {
    pub positive_types: Vec<String>,
    /// Items older than this many days are excluded. `None` = keep all.
    pub item_ttl_days: Option<i64>,
    /// Feedback older than this many days is excluded. `None` = keep all.
    pub feedback_ttl_days: Option<i64>,
}

impl FeedbackFilter {
    pub fn positive(types: Vec<String>) -> Self {
        Self {
            positive_types: types,
            ..Default::default()
        }
    }

    fn item_cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.item_ttl_days.map(|days| now - Duration::days(days))
    }

    fn feedback_cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.feedback_ttl_days.map(|days| now - Duration::days(days))
    }

    pub fn accepts_type(&self, feedback_type: &str) -> bool {
        self.positive_types.iter().any(|t| t == feedback_type)
    }
}

/// Everything one loop cycle needs: the dense dataset plus the raw items and
/// feedback it was built from (used for derived artifacts).
#[derive(Debug, Clone, Default)]
pub struct LoadedData {
    pub dataset: Dataset,
    pub items: Vec<Item>,
    pub feedback: Vec<Feedback>,
}

/// Durable feedback store consumed by the coordinator.
pub trait DataStore: Send + Sync {
    /// Load items and positive feedback passing `filter`, built into a
    /// dense dataset.
    fn load(&self, filter: &FeedbackFilter) -> Result<LoadedData, DataError>;
}

#[derive(Default)]
struct MemoryDataInner {
    items: Vec<Item>,
    feedback: Vec<Feedback>,
}

/// In-memory data store used by tests and single-process deployments.
#[derive(Default)]
pub struct MemoryDataStore {
    inner: RwLock<MemoryDataInner>,
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_item(&self, item: Item) {
        let mut inner = self.inner.write();
        if let Some(existing) = inner.items.iter_mut().find(|i| i.item_id == item.item_id) {
            *existing = item;
        } else {
            inner.items.push(item);
        }
    }

    pub fn insert_feedback(&self, feedback: Feedback) {
        self.inner.write().feedback.push(feedback);
    }

    pub fn item_count(&self) -> usize {
        self.inner.read().items.len()
    }

    pub fn feedback_count(&self) -> usize {
        self.inner.read().feedback.len()
    }
}

impl DataStore for MemoryDataStore {
    fn load(&self, filter: &FeedbackFilter) -> Result<LoadedData, DataError> {
        let now = Utc::now();
        let item_cutoff = filter.item_cutoff(now);
        let feedback_cutoff = filter.feedback_cutoff(now);
        let inner = self.inner.read();

        let items: Vec<Item> = inner
            .items
            .iter()
            .filter(|item| item_cutoff.map_or(true, |cutoff| item.timestamp >= cutoff))
            .cloned()
            .collect();

        let mut dataset = Dataset::new();
        let mut feedback = Vec::new();
        for event in &inner.feedback {
            if !filter.accepts_type(&event.feedback_type) {
                continue;
            }
            if feedback_cutoff.map_or(false, |cutoff| event.timestamp < cutoff) {
                continue;
            }
            if !items.iter().any(|item| item.item_id == event.item_id) {
                continue;
            }
            dataset.add(&event.user_id, &event.item_id);
            feedback.push(event.clone());
        }

        debug!(
            users = dataset.user_count(),
            items = items.len(),
            feedback = feedback.len(),
            "loaded dataset"
        );
        Ok(LoadedData {
            dataset,
            items,
            feedback,
        })
    }
}
