//! The master process: owns the serving model, the user index, and the
//! cluster view, and drives the fit and search loops.
//!
//! Three independent locks guard the mutable state (serving model, user
//! index, loop bookkeeping). Each is held only across in-memory reads and
//! swaps; loading, training, and searching all run without any lock held.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{info, warn};

use rf_data::{cache, CacheStore, DataStore, Dataset, Index, LoadedData};
use rf_search::{default_model, model_from_snapshot, FitOptions, ModelSearcher, RankingModel};
use rf_types::{MasterError, Node, Score};

use crate::artifacts;
use crate::cluster::NodeTable;
use crate::config::Config;
use crate::snapshot::LocalSnapshot;
use crate::supervisor::SupervisedTask;

/// The model currently served, with its identity and provenance. The four
/// fields always change together under one lock.
struct ServingState {
    model: Box<dyn RankingModel>,
    name: String,
    version: u64,
    score: Score,
}

struct UserIndexState {
    index: Index,
    version: u64,
}

/// Shape of the dataset seen by a loop on its previous cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DatasetStats {
    users: usize,
    items: usize,
    feedback: usize,
}

impl DatasetStats {
    fn of(dataset: &Dataset) -> Self {
        Self {
            users: dataset.user_count(),
            items: dataset.item_count(),
            feedback: dataset.len(),
        }
    }
}

#[derive(Default)]
struct LoopState {
    last: Option<DatasetStats>,
}

pub struct Master {
    config: Config,
    data_store: Arc<dyn DataStore>,
    cache_store: Arc<dyn CacheStore>,
    searcher: Arc<ModelSearcher>,
    nodes: Arc<NodeTable>,
    serving: Mutex<ServingState>,
    user_index: Mutex<UserIndexState>,
    fit_state: Mutex<LoopState>,
    search_state: Mutex<LoopState>,
    snapshot_path: PathBuf,
}

impl Master {
    pub fn new(
        config: Config,
        data_store: Arc<dyn DataStore>,
        cache_store: Arc<dyn CacheStore>,
        snapshot_path: PathBuf,
    ) -> Self {
        let searcher = Arc::new(ModelSearcher::new(
            config.recommend.search_trials,
            config.recommend.cv_folds,
            config.recommend.cv_jobs,
            config.recommend.top_n,
        ));
        let nodes = Arc::new(NodeTable::new(config.meta_timeout()));
        let model = default_model();
        let name = model.name().to_string();
        Self {
            config,
            data_store,
            cache_store,
            searcher,
            nodes,
            serving: Mutex::new(ServingState {
                model,
                name,
                version: 0,
                score: Score::default(),
            }),
            user_index: Mutex::new(UserIndexState {
                index: Index::new(),
                version: 0,
            }),
            fit_state: Mutex::new(LoopState::default()),
            search_state: Mutex::new(LoopState::default()),
            snapshot_path,
        }
    }

    /// Restore serving state from the local snapshot, if one exists.
    /// Returns whether a snapshot was applied.
    pub fn warm_start(&self) -> Result<bool, MasterError> {
        let Some(snapshot) = LocalSnapshot::load(&self.snapshot_path)? else {
            return Ok(false);
        };
        let model = model_from_snapshot(&snapshot.model)?;
        let mut serving = self.serving.lock();
        serving.model = model;
        serving.name = snapshot.model_name.clone();
        serving.version = snapshot.model_version;
        serving.score = snapshot.model_score;
        info!(
            name = %snapshot.model_name,
            version = snapshot.model_version,
            score = %snapshot.model_score,
            "serving state restored from snapshot"
        );
        Ok(true)
    }

    /// Start the background loops: fit, search, and the node sweep.
    pub fn start(self: &Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        match self.warm_start() {
            Ok(true) => {}
            Ok(false) => info!("no snapshot found, starting cold"),
            Err(err) => warn!(error = %err, "warm start failed, starting cold"),
        }

        let sweeper = Arc::clone(&self.nodes).spawn_sweeper(Duration::from_secs(1));

        let fit_master = Arc::clone(self);
        let fit = tokio::spawn(
            SupervisedTask::new("fit", self.config.fit_period()).run(move || fit_master.fit_cycle()),
        );

        let search_master = Arc::clone(self);
        let search = tokio::spawn(
            SupervisedTask::new("search", self.config.search_period())
                .run(move || search_master.search_cycle()),
        );

        vec![sweeper, fit, search]
    }

    /// One pass of the fit loop: refresh dataset counts, adopt a strictly
    /// better search candidate if its identity differs from the serving
    /// model, then retrain on the full dataset unless nothing changed.
    pub fn fit_cycle(&self) -> Result<(), MasterError> {
        let loaded = self.data_store.load(&self.config.feedback_filter())?;
        let stats = DatasetStats::of(&loaded.dataset);
        self.publish_stats(stats);

        if loaded.dataset.is_empty() {
            warn!("dataset is empty, skipping fit cycle");
            return Ok(());
        }

        let candidate = self.searcher.best_model()?;
        let mut adopted = false;
        {
            let mut serving = self.serving.lock();
            if let Some((name, model, score)) = candidate {
                let differs = name != serving.name || model.params() != serving.model.params();
                if differs && score.better_than(&serving.score) {
                    info!(%name, %score, previous = %serving.score, "adopting search candidate");
                    serving.model = model;
                    serving.name = name;
                    serving.score = score;
                    serving.version += 1;
                    adopted = true;
                }
            }
        }

        if !adopted && self.fit_state.lock().last == Some(stats) {
            return Ok(());
        }

        // Train a clone of the serving model; the lock is only re-taken
        // for the final swap.
        let mut model = {
            let serving = self.serving.lock();
            serving.model.try_clone()?
        };
        model.fit(&loaded.dataset, &FitOptions::default())?;
        let model_snapshot = model.to_snapshot()?;

        let (name, version, score) = {
            let mut serving = self.serving.lock();
            serving.model = model;
            serving.version += 1;
            (serving.name.clone(), serving.version, serving.score)
        };
        info!(%name, version, users = stats.users, items = stats.items, "model retrained");

        artifacts::collect(&loaded, self.config.recommend.top_n, self.cache_store.as_ref())?;

        LocalSnapshot {
            model_name: name,
            model_version: version,
            model_score: score,
            model: model_snapshot,
        }
        .store(&self.snapshot_path)?;

        self.refresh_user_index(&loaded);

        // Recorded only once the whole cycle succeeded, so a failed retrain
        // or persist is retried on the next cycle even if the data did not
        // change in between.
        self.fit_state.lock().last = Some(stats);
        Ok(())
    }

    /// One pass of the search loop: run a full hyperparameter search on a
    /// train/validation split, unless the dataset is empty or unchanged.
    pub fn search_cycle(&self) -> Result<(), MasterError> {
        let loaded = self.data_store.load(&self.config.feedback_filter())?;
        if loaded.dataset.is_empty() {
            warn!("dataset is empty, skipping search cycle");
            return Ok(());
        }

        let stats = DatasetStats::of(&loaded.dataset);
        if self.search_state.lock().last == Some(stats) {
            return Ok(());
        }

        let (train, val) = loaded.dataset.split(self.config.recommend.split_seed);
        self.searcher.fit(&train, &val)?;
        self.search_state.lock().last = Some(stats);
        Ok(())
    }

    fn publish_stats(&self, stats: DatasetStats) {
        let entries = [
            (cache::NUM_USERS, stats.users),
            (cache::NUM_ITEMS, stats.items),
            (cache::NUM_FEEDBACK, stats.feedback),
        ];
        for (key, value) in entries {
            if let Err(err) = self.cache_store.set_meta(key, value.to_string()) {
                warn!(key, error = %err, "failed to publish dataset stat");
            }
        }
    }

    /// Replace the user index and bump its version when the distinct-user
    /// set changed.
    fn refresh_user_index(&self, loaded: &LoadedData) {
        let mut state = self.user_index.lock();
        if state.index.ids() != loaded.dataset.user_index().ids() {
            state.index = loaded.dataset.user_index().clone();
            state.version += 1;
            info!(users = state.index.len(), version = state.version, "user index updated");
        }
    }

    /// Name, version, and score of the serving model.
    pub fn serving_info(&self) -> (String, u64, Score) {
        let serving = self.serving.lock();
        (serving.name.clone(), serving.version, serving.score)
    }

    pub fn user_index_version(&self) -> u64 {
        self.user_index.lock().version
    }

    pub fn searcher(&self) -> &ModelSearcher {
        &self.searcher
    }

    pub fn heartbeat(&self, node: Node) {
        self.nodes.heartbeat(node);
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.nodes.nodes()
    }
}
