//! Coordinator configuration, loaded from a JSON file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rf_data::FeedbackFilter;
use rf_types::{DataError, RfResult};

/// Top-level configuration for the master process. Every section has
/// defaults, so a partial (or empty) JSON document is a valid config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub master: MasterConfig,
    pub database: DatabaseConfig,
    pub recommend: RecommendConfig,
}

/// Settings for the master node itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    pub host: String,
    pub port: u16,
    /// Seconds between node heartbeats before a node is considered stale.
    pub meta_timeout_secs: u64,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8086,
            meta_timeout_secs: 10,
        }
    }
}

/// Feedback filtering applied when loading the dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Feedback types counted as positive interactions. Empty means all.
    pub positive_feedback_types: Vec<String>,
    /// Items older than this are dropped, along with their feedback.
    pub item_ttl_days: Option<i64>,
    /// Feedback older than this is dropped.
    pub feedback_ttl_days: Option<i64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            positive_feedback_types: vec!["like".to_string(), "read".to_string()],
            item_ttl_days: None,
            feedback_ttl_days: None,
        }
    }
}

/// Settings for the background fit and search loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    pub fit_period_secs: u64,
    pub search_period_secs: u64,
    /// Trial budget for each hyperparameter search pass.
    pub search_trials: usize,
    pub cv_folds: usize,
    /// Worker threads for cross-validation; 0 means single-threaded.
    pub cv_jobs: usize,
    /// List length for ranking metrics and cached item lists.
    pub top_n: usize,
    /// Seed for the train/validation split used by the search loop.
    pub split_seed: u64,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            fit_period_secs: 60,
            search_period_secs: 60,
            search_trials: 10,
            cv_folds: 3,
            cv_jobs: 1,
            top_n: 10,
            split_seed: 0,
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> RfResult<Config> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(DataError::Io)?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// The feedback filter implied by the database section.
    pub fn feedback_filter(&self) -> FeedbackFilter {
        FeedbackFilter {
            positive_types: self.database.positive_feedback_types.clone(),
            item_ttl_days: self.database.item_ttl_days,
            feedback_ttl_days: self.database.feedback_ttl_days,
        }
    }

    pub fn meta_timeout(&self) -> Duration {
        Duration::from_secs(self.master.meta_timeout_secs)
    }

    pub fn fit_period(&self) -> Duration {
        Duration::from_secs(self.recommend.fit_period_secs)
    }

    pub fn search_period(&self) -> Duration {
        Duration::from_secs(self.recommend.search_period_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.master.port, 8086);
        assert_eq!(config.recommend.cv_folds, 3);
        assert_eq!(config.recommend.top_n, 10);
        assert!(config.database.item_ttl_days.is_none());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"recommend": {{"search_trials": 50}}, "master": {{"port": 9000}}}}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.recommend.search_trials, 50);
        assert_eq!(config.recommend.cv_folds, 3);
        assert_eq!(config.master.port, 9000);
        assert_eq!(config.master.host, "127.0.0.1");
    }

    #[test]
    fn filter_reflects_database_section() {
        let mut config = Config::default();
        config.database.feedback_ttl_days = Some(30);
        config.database.positive_feedback_types = vec!["star".to_string()];

        let filter = config.feedback_filter();
        assert_eq!(filter.positive_types, vec!["star".to_string()]);
        assert_eq!(filter.feedback_ttl_days, Some(30));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::load("/nonexistent/rankforge.json").is_err());
    }
}
