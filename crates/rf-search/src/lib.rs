//! # rf-search
//!
//! Cross-validated hyperparameter search for RankForge.
//!
//! Provides the [`RankingModel`] trait with explicit deep-clone capability,
//! ranking evaluators, the fold-parallel cross-validation engine, three
//! search strategies (grid, random, sequential/Bayesian over a pluggable
//! [`TrialSampler`]), and the thread-safe [`ModelSearcher`] driven by the
//! coordinator's search loop.

pub mod cv;
pub mod evaluator;
pub mod model;
pub mod sampler;
pub mod searcher;
pub mod selection;

pub use cv::{cross_validate, CrossValidateResult};
pub use evaluator::{Evaluator, RankMetric, RankingEvaluator};
pub use model::{
    default_model, model_from_snapshot, FitOptions, ModelSnapshot, Popularity, RankingModel,
};
pub use sampler::{RandomSampler, TpeSampler, TrialSampler};
pub use searcher::ModelSearcher;
pub use selection::{
    bayesian_search_cv, grid_search_cv, random_search_cv, ModelSelectionResult,
};
