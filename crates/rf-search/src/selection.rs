//! Model selection: grid, random, and sequential (Bayesian) search.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use rf_data::{Dataset, FoldSplitter};
use rf_types::{Distribution, ParameterGrid, Params, SearchError};

use crate::cv::{cross_validate, CrossValidateResult};
use crate::evaluator::Evaluator;
use crate::model::RankingModel;
use crate::sampler::TrialSampler;

/// Outcome of one search: the running best plus the full ordered trial
/// history. `best_index` is the position of the best trial in the history,
/// or `None` when no history entry backs the reported best (zero trials);
/// callers must use the best fields directly rather than indexing.
#[derive(Debug, Clone, Default)]
pub struct ModelSelectionResult {
    pub best_score: f64,
    pub best_cost: f64,
    pub best_params: Params,
    pub best_index: Option<usize>,
    pub cv_results: Vec<CrossValidateResult>,
    pub all_params: Vec<Params>,
}

impl ModelSelectionResult {
    fn new() -> Self {
        Self {
            best_cost: f64::INFINITY,
            best_score: f64::NEG_INFINITY,
            ..Default::default()
        }
    }

    /// Append one trial and update the running best. Strict `<` on mean
    /// cost: an equal-cost later trial never displaces an earlier best.
    fn record(&mut self, params: Params, cv: CrossValidateResult) {
        let cost = cv.mean_cost();
        let score = cv.mean_score();
        self.cv_results.push(cv);
        self.all_params.push(params.clone());
        if cost < self.best_cost {
            self.best_cost = cost;
            self.best_score = score;
            self.best_params = params;
            self.best_index = Some(self.all_params.len() - 1);
        }
    }

    pub fn trials(&self) -> usize {
        self.all_params.len()
    }
}

fn trial_model(
    template: &dyn RankingModel,
    params: &Params,
) -> Result<Box<dyn RankingModel>, SearchError> {
    let mut model = template.try_clone()?;
    model.set_params(template.params().merge(params));
    Ok(model)
}

fn categorical_dims<'a>(
    grid: &'a ParameterGrid,
    strategy: &str,
) -> Result<Vec<(&'a str, &'a [rf_types::ParamValue])>, SearchError> {
    grid.dims()
        .iter()
        .map(|(name, dist)| match dist {
            Distribution::Categorical(values) => Ok((name.as_str(), values.as_slice())),
            _ => Err(rf_types::config_error!(
                "{strategy}: expect {name} to be categorical"
            )),
        })
        .collect()
}

/// Exhaustive search over the Cartesian product of categorical dimensions,
/// visited depth-first in parameter-declaration order. Returns one result
/// per metric axis.
pub fn grid_search_cv(
    template: &dyn RankingModel,
    data: &Dataset,
    grid: &ParameterGrid,
    splitter: &dyn FoldSplitter,
    seed: u64,
    jobs: usize,
    evaluators: &[&dyn Evaluator],
) -> Result<Vec<ModelSelectionResult>, SearchError> {
    let dims = categorical_dims(grid, "grid search")?;
    let count: usize = dims.iter().map(|(_, values)| values.len()).product();

    // Depth-first enumeration: the first declared dimension varies slowest.
    let mut combos: Vec<Params> = vec![Params::new()];
    for (name, values) in &dims {
        let mut next = Vec::with_capacity(combos.len() * values.len());
        for existing in &combos {
            for value in *values {
                next.push(existing.clone().with(*name, value.clone()));
            }
        }
        combos = next;
    }

    let mut results: Vec<ModelSelectionResult> = Vec::new();
    for (progress, params) in combos.into_iter().enumerate() {
        info!(trial = progress + 1, total = count, %params, "grid search");
        let model = trial_model(template, &params)?;
        let cv_results = cross_validate(model.as_ref(), data, splitter, seed, jobs, evaluators)?;
        if results.is_empty() {
            results = cv_results.iter().map(|_| ModelSelectionResult::new()).collect();
        }
        for (axis, cv) in cv_results.into_iter().enumerate() {
            results[axis].record(params.clone(), cv);
        }
    }
    Ok(results)
}

/// Random search: `trials` independent draws, one value per dimension,
/// uniformly from a seeded generator. Categorical-only, like grid search.
#[allow(clippy::too_many_arguments)]
pub fn random_search_cv(
    template: &dyn RankingModel,
    data: &Dataset,
    grid: &ParameterGrid,
    splitter: &dyn FoldSplitter,
    trials: usize,
    seed: u64,
    jobs: usize,
    evaluators: &[&dyn Evaluator],
) -> Result<Vec<ModelSelectionResult>, SearchError> {
    let dims = categorical_dims(grid, "random search")?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut results: Vec<ModelSelectionResult> = Vec::new();
    for trial in 0..trials {
        let mut params = Params::new();
        for (name, values) in &dims {
            let value = values[rng.gen_range(0..values.len())].clone();
            params.set(*name, value);
        }
        info!(trial = trial + 1, total = trials, %params, "random search");
        let model = trial_model(template, &params)?;
        let cv_results = cross_validate(model.as_ref(), data, splitter, seed, jobs, evaluators)?;
        if results.is_empty() {
            results = cv_results.iter().map(|_| ModelSelectionResult::new()).collect();
        }
        for (axis, cv) in cv_results.into_iter().enumerate() {
            results[axis].record(params.clone(), cv);
        }
    }
    Ok(results)
}

/// Sequential (Bayesian) search: point suggestion is delegated to the
/// sampler, which is fed each trial's realized cost. Supports all four
/// distribution kinds. Requires exactly one evaluator, since the sampler
/// needs a single scalar cost signal; the first metric axis governs.
#[allow(clippy::too_many_arguments)]
pub fn bayesian_search_cv(
    template: &dyn RankingModel,
    data: &Dataset,
    grid: &ParameterGrid,
    sampler: &mut dyn TrialSampler,
    splitter: &dyn FoldSplitter,
    trials: usize,
    seed: u64,
    jobs: usize,
    evaluators: &[&dyn Evaluator],
) -> Result<ModelSelectionResult, SearchError> {
    if evaluators.len() != 1 {
        return Err(rf_types::config_error!(
            "bayesian search requires exactly one evaluator, got {}",
            evaluators.len()
        ));
    }

    let mut result = ModelSelectionResult::new();
    for trial in 0..trials {
        sampler.start_trial();
        let mut params = Params::new();
        for (name, dist) in grid.dims() {
            match dist {
                Distribution::IntUniform { low, high } => {
                    params.set(name.clone(), sampler.suggest_int(name, *low, *high));
                }
                Distribution::Uniform { low, high } => {
                    params.set(name.clone(), sampler.suggest_uniform(name, *low, *high));
                }
                Distribution::LogUniform { low, high } => {
                    params.set(name.clone(), sampler.suggest_log_uniform(name, *low, *high));
                }
                Distribution::Categorical(values) => {
                    params.set(name.clone(), sampler.suggest_categorical(name, values));
                }
            }
        }
        info!(trial = trial + 1, total = trials, %params, "bayesian search");
        let model = trial_model(template, &params)?;
        let cv_results = cross_validate(model.as_ref(), data, splitter, seed, jobs, evaluators)?;
        let cv = cv_results.into_iter().next().unwrap_or_default();
        sampler.observe(cv.mean_cost());
        result.record(params, cv);
    }
    Ok(result)
}
