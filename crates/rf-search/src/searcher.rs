//! Long-running holder of the best model candidate found so far.

use parking_lot::Mutex;
use tracing::{info, warn};

use rf_data::{Dataset, KFoldSplitter};
use rf_types::{Score, SearchError};

use crate::evaluator::{Evaluator, RankingEvaluator};
use crate::model::{default_model, FitOptions, Popularity, RankingModel};
use crate::sampler::TpeSampler;
use crate::selection::bayesian_search_cv;

struct BestCandidate {
    name: String,
    model: Box<dyn RankingModel>,
    score: Score,
}

/// Thread-safe searcher driven by the coordinator's search loop.
///
/// `fit` may run for minutes; the internal lock is held only for the final
/// swap, so `best_model` always returns promptly with a consistent snapshot
/// of the previous best.
pub struct ModelSearcher {
    trials: usize,
    folds: usize,
    jobs: usize,
    top_n: usize,
    best: Mutex<Option<BestCandidate>>,
}

impl ModelSearcher {
    pub fn new(trials: usize, folds: usize, jobs: usize, top_n: usize) -> Self {
        Self {
            trials,
            folds,
            jobs,
            top_n,
            best: Mutex::new(None),
        }
    }

    /// Install a candidate directly, replacing any stored best. Used to
    /// pre-seed the searcher from a persisted model before the first pass.
    pub fn install_best(&self, name: String, model: Box<dyn RankingModel>, score: Score) {
        let mut guard = self.best.lock();
        *guard = Some(BestCandidate { name, model, score });
    }

    /// A consistent (name, model clone, score) snapshot of the current best
    /// candidate, or `None` before the first completed search pass.
    pub fn best_model(&self) -> Result<Option<(String, Box<dyn RankingModel>, Score)>, SearchError> {
        let guard = self.best.lock();
        match guard.as_ref() {
            None => Ok(None),
            Some(best) => {
                let model = best.model.try_clone()?;
                Ok(Some((best.name.clone(), model, best.score)))
            }
        }
    }

    /// One full search pass: cross-validated hyperparameter search on the
    /// train partition, final scoring on the validation partition, then an
    /// atomic swap of the stored best.
    pub fn fit(&self, train: &Dataset, val: &Dataset) -> Result<(), SearchError> {
        let template = default_model();
        let grid = Popularity::search_grid();
        let evaluator = RankingEvaluator::standard(self.top_n);
        let mut sampler = TpeSampler::new(0);

        let result = bayesian_search_cv(
            template.as_ref(),
            train,
            &grid,
            &mut sampler,
            &KFoldSplitter::new(self.folds),
            self.trials,
            0,
            self.jobs,
            &[&evaluator],
        )?;
        if result.best_index.is_none() {
            warn!("search pass produced no trials");
            return Ok(());
        }

        let mut model = template.try_clone()?;
        model.set_params(template.params().merge(&result.best_params));
        model.fit(train, &FitOptions::default())?;
        let (scores, _) = evaluator.evaluate(model.as_ref(), val, train);
        let score = Score::new(scores[0], scores[1], scores[2]);

        info!(
            name = model.name(),
            params = %result.best_params,
            %score,
            "search pass complete"
        );

        // Swap only; the search above ran without the lock.
        let mut guard = self.best.lock();
        *guard = Some(BestCandidate {
            name: model.name().to_string(),
            model,
            score,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> Dataset {
        let mut data = Dataset::new();
        for user in 0..12 {
            for item in 0..4 {
                data.add(&format!("u{user}"), &format!("i{}", (user + item) % 6));
            }
        }
        data
    }

    #[test]
    fn best_is_none_before_first_pass() {
        let searcher = ModelSearcher::new(5, 3, 1, 10);
        assert!(searcher.best_model().unwrap().is_none());
    }

    #[test]
    fn fit_installs_a_candidate() {
        let searcher = ModelSearcher::new(5, 3, 1, 10);
        let (train, val) = sample_dataset().split(0);
        searcher.fit(&train, &val).unwrap();

        let (name, model, score) = searcher.best_model().unwrap().expect("candidate installed");
        assert_eq!(name, "popularity");
        assert!(model.params().get("damping").is_some());
        assert!(score.ndcg >= 0.0);
    }

    #[test]
    fn best_model_returns_independent_clones() {
        let searcher = ModelSearcher::new(3, 3, 1, 10);
        let (train, val) = sample_dataset().split(0);
        searcher.fit(&train, &val).unwrap();

        let (_, mut first, _) = searcher.best_model().unwrap().unwrap();
        first.set_params(rf_types::Params::new().with("damping", 0.0));
        let (_, second, _) = searcher.best_model().unwrap().unwrap();
        assert_ne!(
            second.params().get_float("damping", -1.0),
            0.0,
            "stored best must not be affected by mutating a returned clone"
        );
    }
}
