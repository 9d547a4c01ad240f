//! Durable snapshot of the serving model.
//!
//! Written after every successful fit cycle and read back on startup so a
//! restarted master serves the last trained model instead of an untrained
//! default.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use rf_search::ModelSnapshot;
use rf_types::{DataError, Score};

/// Everything needed to restore the serving state of a master process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSnapshot {
    pub model_name: String,
    pub model_version: u64,
    pub model_score: Score,
    pub model: ModelSnapshot,
}

impl LocalSnapshot {
    /// Read a snapshot if one exists. A corrupt file is treated as absent
    /// so a damaged snapshot never blocks startup.
    pub fn load(path: &Path) -> Result<Option<LocalSnapshot>, DataError> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring unreadable snapshot");
                Ok(None)
            }
        }
    }

    /// Write the snapshot atomically via a temp file and rename.
    pub fn store(&self, path: &Path) -> Result<(), DataError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_types::Params;

    fn sample() -> LocalSnapshot {
        LocalSnapshot {
            model_name: "popularity".to_string(),
            model_version: 7,
            model_score: Score::new(0.42, 0.2, 0.3),
            model: ModelSnapshot {
                name: "popularity".to_string(),
                params: Params::new().with("damping", 0.5),
                state: serde_json::json!({"item_scores": [1.0, 2.0]}),
            },
        }
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("snapshot.json");

        sample().store(&path).unwrap();
        let restored = LocalSnapshot::load(&path).unwrap().expect("snapshot present");

        assert_eq!(restored.model_name, "popularity");
        assert_eq!(restored.model_version, 7);
        assert_eq!(restored.model.params.get_float("damping", 0.0), 0.5);
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = LocalSnapshot::load(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn corrupt_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        fs::write(&path, "{not json").unwrap();

        assert!(LocalSnapshot::load(&path).unwrap().is_none());
    }

    #[test]
    fn store_replaces_the_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        sample().store(&path).unwrap();
        let mut updated = sample();
        updated.model_version = 8;
        updated.store(&path).unwrap();

        let restored = LocalSnapshot::load(&path).unwrap().unwrap();
        assert_eq!(restored.model_version, 8);
    }
}
