//! Fold-parallel cross-validation.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use rf_data::{Dataset, FoldSplitter};
use rf_types::SearchError;

use crate::evaluator::Evaluator;
use crate::model::{FitOptions, RankingModel};

/// Per-axis cross-validation scores, one element per fold. Score is
/// higher-better, cost lower-better (possibly the negated score).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossValidateResult {
    pub test_score: Vec<f64>,
    pub test_cost: Vec<f64>,
}

impl CrossValidateResult {
    pub fn mean_score(&self) -> f64 {
        mean(&self.test_score)
    }

    pub fn mean_cost(&self) -> f64 {
        mean(&self.test_cost)
    }

    /// Mean score and the maximum absolute deviation from it, a
    /// robustness signal rather than a variance estimate.
    pub fn mean_and_margin(&self) -> (f64, f64) {
        let mean = self.mean_score();
        let margin = self
            .test_score
            .iter()
            .map(|score| (score - mean).abs())
            .fold(0.0, f64::max);
        (mean, margin)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Evaluate `model` by k-fold cross-validation.
///
/// The splitter is deterministic for a fixed (dataset, seed). Each fold
/// trains a fresh independent clone of the template (a clone failure
/// aborts the whole call) and is scored by every evaluator against the
/// fold's test partition. Folds are evaluated on a bounded pool of `jobs`
/// workers sharing only the read-only dataset and template.
///
/// Returns one result per metric axis emitted by the evaluators.
pub fn cross_validate(
    model: &dyn RankingModel,
    data: &Dataset,
    splitter: &dyn FoldSplitter,
    seed: u64,
    jobs: usize,
    evaluators: &[&dyn Evaluator],
) -> Result<Vec<CrossValidateResult>, SearchError> {
    let folds = splitter.split(data, seed);
    let template_params = model.params();
    debug!(folds = folds.len(), jobs, "cross validation");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|e| rf_types::config_error!("worker pool: {e}"))?;

    let per_fold: Vec<(Vec<f64>, Vec<f64>)> = pool.install(|| {
        folds
            .par_iter()
            .map(|fold| {
                let mut clone = model.try_clone()?;
                clone.set_params(template_params.clone());
                clone.fit(&fold.train, &FitOptions::default())?;

                let mut scores = Vec::new();
                let mut costs = Vec::new();
                for evaluator in evaluators {
                    let (s, c) = evaluator.evaluate(clone.as_ref(), &fold.test, &fold.train);
                    scores.extend(s);
                    costs.extend(c);
                }
                Ok((scores, costs))
            })
            .collect::<Result<Vec<_>, SearchError>>()
    })?;

    // Transpose fold-major into axis-major results.
    let axes = per_fold.first().map_or(0, |(scores, _)| scores.len());
    let mut results = vec![CrossValidateResult::default(); axes];
    for (scores, costs) in &per_fold {
        for axis in 0..axes {
            results[axis].test_score.push(scores[axis]);
            results[axis].test_cost.push(costs[axis]);
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_data::KFoldSplitter;
    use rf_types::{ModelError, Params};

    /// Test double whose evaluation depends only on its hyperparameters.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct StubModel {
        pub params: Params,
        pub clone_fails: bool,
    }

    impl RankingModel for StubModel {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn params(&self) -> Params {
            self.params.clone()
        }

        fn set_params(&mut self, params: Params) {
            self.params = params;
        }

        fn fit(&mut self, _train: &Dataset, _options: &FitOptions) -> Result<(), ModelError> {
            Ok(())
        }

        fn predict(&self, _user: u32, _item: u32) -> f64 {
            0.0
        }

        fn try_clone(&self) -> Result<Box<dyn RankingModel>, ModelError> {
            if self.clone_fails {
                return Err(ModelError::CloneFailed {
                    message: "stub clone disabled".to_string(),
                });
            }
            Ok(Box::new(self.clone()))
        }

        fn to_snapshot(&self) -> Result<crate::model::ModelSnapshot, ModelError> {
            Err(ModelError::Unsupported {
                operation: "snapshot".to_string(),
            })
        }
    }

    /// Evaluator returning score = cost = lr + reg + alpha + init_mean.
    pub(crate) struct ParamSumEvaluator;

    impl Evaluator for ParamSumEvaluator {
        fn evaluate(
            &self,
            model: &dyn RankingModel,
            _test: &Dataset,
            _train: &Dataset,
        ) -> (Vec<f64>, Vec<f64>) {
            let params = model.params();
            let sum = params.get_float("lr", 0.0)
                + params.get_float("reg", 0.0)
                + params.get_float("alpha", 0.0)
                + params.get_float("init_mean", 0.0);
            (vec![sum], vec![sum])
        }
    }

    pub(crate) fn sample_dataset() -> Dataset {
        let mut data = Dataset::new();
        for user in 0..10 {
            for item in 0..5 {
                data.add(&format!("u{user}"), &format!("i{}", (user + item) % 8));
            }
        }
        data
    }

    #[test]
    fn stub_evaluator_mean_is_param_sum() {
        let model = StubModel {
            params: Params::new().with("lr", 3.0).with("reg", 5.0).with("alpha", 7.0),
            clone_fails: false,
        };
        let results = cross_validate(
            &model,
            &sample_dataset(),
            &KFoldSplitter::new(5),
            0,
            1,
            &[&ParamSumEvaluator],
        )
        .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].test_score.len(), 5);
        assert_eq!(results[0].test_cost.len(), 5);
        assert_eq!(results[0].mean_score(), 15.0);
    }

    #[test]
    fn result_shape_matches_axes_and_folds() {
        let model = StubModel::default();
        let results = cross_validate(
            &model,
            &sample_dataset(),
            &KFoldSplitter::new(4),
            7,
            2,
            &[&ParamSumEvaluator, &ParamSumEvaluator],
        )
        .unwrap();

        assert_eq!(results.len(), 2);
        for axis in &results {
            assert_eq!(axis.test_score.len(), 4);
            assert_eq!(axis.test_cost.len(), 4);
        }
    }

    #[test]
    fn clone_failure_aborts_the_call() {
        let model = StubModel {
            params: Params::new(),
            clone_fails: true,
        };
        let err = cross_validate(
            &model,
            &sample_dataset(),
            &KFoldSplitter::new(3),
            0,
            2,
            &[&ParamSumEvaluator],
        )
        .unwrap_err();
        match err {
            SearchError::Model(ModelError::CloneFailed { .. }) => {}
            other => panic!("expected clone failure, got {other:?}"),
        }
    }

    #[test]
    fn mean_and_margin() {
        let result = CrossValidateResult {
            test_score: vec![1.0, 2.0, 3.0, 4.0, 5.0],
            test_cost: vec![-1.0, -2.0, -3.0, -4.0, -5.0],
        };
        let (mean, margin) = result.mean_and_margin();
        assert_eq!(mean, 3.0);
        assert_eq!(margin, 2.0);
    }
}
