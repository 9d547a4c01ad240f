//! The ranking-model capability set and the baseline implementation.

use serde::{Deserialize, Serialize};

use rf_data::Dataset;
use rf_types::{ModelError, Params};

/// Runtime options passed to a model fit.
#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    pub verbose: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self { verbose: false }
    }
}

/// A trainable ranking model. The training algorithm itself is opaque; the
/// coordinator only relies on this capability set.
///
/// `try_clone` must return a fully independent copy (same hyperparameters,
/// same fitted state). Fold-parallel cross-validation clones the template
/// once per fold and a failed clone aborts the whole call.
pub trait RankingModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn params(&self) -> Params;

    fn set_params(&mut self, params: Params);

    fn fit(&mut self, train: &Dataset, options: &FitOptions) -> Result<(), ModelError>;

    /// Preference score for a (user, item) pair over the dense indices of
    /// the dataset the model was fitted on. Higher is better.
    fn predict(&self, user: u32, item: u32) -> f64;

    fn try_clone(&self) -> Result<Box<dyn RankingModel>, ModelError>;

    /// Serialize the model for the durable local snapshot. Models that do
    /// not support persistence return [`ModelError::Unsupported`] instead of
    /// panicking.
    fn to_snapshot(&self) -> Result<ModelSnapshot, ModelError>;
}

/// Serialized form of a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub name: String,
    pub params: Params,
    pub state: serde_json::Value,
}

/// Rehydrate a model from its snapshot by registry name.
pub fn model_from_snapshot(snapshot: &ModelSnapshot) -> Result<Box<dyn RankingModel>, ModelError> {
    match snapshot.name.as_str() {
        Popularity::NAME => Ok(Box::new(Popularity::from_snapshot(snapshot)?)),
        name => Err(ModelError::UnknownModel {
            name: name.to_string(),
        }),
    }
}

/// The model the coordinator serves from cold start, before the searcher
/// has found anything better.
pub fn default_model() -> Box<dyn RankingModel> {
    Box::new(Popularity::new(Params::new()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PopularityState {
    item_scores: Vec<f64>,
}

/// Damped-popularity baseline: an item's score is its interaction count
/// raised to the `damping` hyperparameter. Non-personalized, but cheap to
/// retrain every cycle and a meaningful floor for the searcher to beat.
#[derive(Debug, Clone, Default)]
pub struct Popularity {
    params: Params,
    state: Option<PopularityState>,
}

impl Popularity {
    pub const NAME: &'static str = "popularity";

    pub fn new(params: Params) -> Self {
        Self {
            params,
            state: None,
        }
    }

    /// Search space explored by the model searcher.
    pub fn search_grid() -> rf_types::ParameterGrid {
        rf_types::ParameterGrid::new().uniform("damping", 0.05, 1.0)
    }

    fn damping(&self) -> f64 {
        self.params.get_float("damping", 0.5)
    }

    fn from_snapshot(snapshot: &ModelSnapshot) -> Result<Self, ModelError> {
        let state = serde_json::from_value(snapshot.state.clone()).map_err(|e| {
            ModelError::InvalidSnapshot {
                message: e.to_string(),
            }
        })?;
        Ok(Self {
            params: snapshot.params.clone(),
            state,
        })
    }
}

impl RankingModel for Popularity {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn params(&self) -> Params {
        self.params.clone()
    }

    fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    fn fit(&mut self, train: &Dataset, _options: &FitOptions) -> Result<(), ModelError> {
        let mut counts = vec![0u64; train.item_count()];
        for &(_, item) in train.pairs() {
            counts[item as usize] += 1;
        }
        let damping = self.damping();
        let item_scores = counts
            .into_iter()
            .map(|c| (c as f64).powf(damping))
            .collect();
        self.state = Some(PopularityState { item_scores });
        Ok(())
    }

    fn predict(&self, _user: u32, item: u32) -> f64 {
        self.state
            .as_ref()
            .and_then(|s| s.item_scores.get(item as usize))
            .copied()
            .unwrap_or(0.0)
    }

    fn try_clone(&self) -> Result<Box<dyn RankingModel>, ModelError> {
        Ok(Box::new(self.clone()))
    }

    fn to_snapshot(&self) -> Result<ModelSnapshot, ModelError> {
        let state = serde_json::to_value(&self.state).map_err(|e| ModelError::InvalidSnapshot {
            message: e.to_string(),
        })?;
        Ok(ModelSnapshot {
            name: Self::NAME.to_string(),
            params: self.params.clone(),
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_train() -> Dataset {
        let mut data = Dataset::new();
        for user in 0..4 {
            data.add(&format!("u{user}"), "hot");
        }
        data.add("u0", "cold");
        data
    }

    #[test]
    fn fit_ranks_by_popularity() {
        let mut model = Popularity::new(Params::new().with("damping", 1.0));
        model.fit(&sample_train(), &FitOptions::default()).unwrap();
        let hot = model.predict(0, 0);
        let cold = model.predict(0, 1);
        assert!(hot > cold);
        assert_eq!(model.predict(0, 99), 0.0);
    }

    #[test]
    fn clone_is_independent() {
        let mut model = Popularity::new(Params::new().with("damping", 1.0));
        model.fit(&sample_train(), &FitOptions::default()).unwrap();

        let mut copy = model.try_clone().unwrap();
        copy.set_params(Params::new().with("damping", 0.1));
        let mut retrain = Dataset::new();
        retrain.add("x", "only");
        copy.fit(&retrain, &FitOptions::default()).unwrap();

        // original keeps its params and fitted state
        assert_eq!(model.params().get_float("damping", 0.0), 1.0);
        assert!(model.predict(0, 0) > 1.0);
    }

    #[test]
    fn snapshot_round_trip() {
        let mut model = Popularity::new(Params::new().with("damping", 0.7));
        model.fit(&sample_train(), &FitOptions::default()).unwrap();

        let snapshot = model.to_snapshot().unwrap();
        let restored = model_from_snapshot(&snapshot).unwrap();
        assert_eq!(restored.name(), Popularity::NAME);
        assert_eq!(restored.params(), model.params());
        assert_eq!(restored.predict(0, 0), model.predict(0, 0));
    }

    #[test]
    fn unknown_snapshot_name_is_rejected() {
        let snapshot = ModelSnapshot {
            name: "matrix-factorization".to_string(),
            params: Params::new(),
            state: serde_json::Value::Null,
        };
        match model_from_snapshot(&snapshot) {
            Err(ModelError::UnknownModel { name }) => assert_eq!(name, "matrix-factorization"),
            Err(other) => panic!("expected UnknownModel, got {other:?}"),
            Ok(_) => panic!("expected UnknownModel, got a model"),
        }
    }
}
