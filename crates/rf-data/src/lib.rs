//! # rf-data
//!
//! Feedback datasets and store abstractions for RankForge.
//!
//! Provides dense user/item indices, the interaction [`Dataset`] with
//! deterministic fold splitting, the [`DataStore`] trait with feedback-type
//! allowlist and TTL filtering, and the [`CacheStore`] trait for global
//! counters and cached derived lists.

pub mod cache;
pub mod dataset;
pub mod index;
pub mod store;

pub use cache::{CacheStore, MemoryCacheStore, ScoredItem};
pub use dataset::{Dataset, Fold, FoldSplitter, KFoldSplitter};
pub use index::Index;
pub use store::{DataStore, Feedback, FeedbackFilter, Item, LoadedData, MemoryDataStore};
