//! Pluggable trial samplers for sequential (Bayesian) search.

use std::collections::{HashMap, VecDeque};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use rf_types::ParamValue;

/// Point-suggestion strategy driven by the sequential search loop. The loop
/// calls `start_trial`, then one `suggest_*` per dimension, then `observe`
/// with the realized cost so the sampler can bias later suggestions.
pub trait TrialSampler: Send {
    fn start_trial(&mut self);

    fn suggest_int(&mut self, name: &str, low: i64, high: i64) -> i64;

    fn suggest_uniform(&mut self, name: &str, low: f64, high: f64) -> f64;

    fn suggest_log_uniform(&mut self, name: &str, low: f64, high: f64) -> f64;

    fn suggest_categorical(&mut self, name: &str, choices: &[ParamValue]) -> ParamValue;

    /// Cost of the trial whose suggestions were just consumed (lower is
    /// better).
    fn observe(&mut self, cost: f64);
}

/// Uniform random sampler; ignores cost feedback.
pub struct RandomSampler {
    rng: ChaCha8Rng,
}

impl RandomSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl TrialSampler for RandomSampler {
    fn start_trial(&mut self) {}

    fn suggest_int(&mut self, _name: &str, low: i64, high: i64) -> i64 {
        self.rng.gen_range(low..=high)
    }

    fn suggest_uniform(&mut self, _name: &str, low: f64, high: f64) -> f64 {
        self.rng.gen_range(low..=high)
    }

    fn suggest_log_uniform(&mut self, _name: &str, low: f64, high: f64) -> f64 {
        let log_val = self.rng.gen_range(low.ln()..=high.ln());
        log_val.exp().clamp(low, high)
    }

    fn suggest_categorical(&mut self, _name: &str, choices: &[ParamValue]) -> ParamValue {
        choices[self.rng.gen_range(0..choices.len())].clone()
    }

    fn observe(&mut self, _cost: f64) {}
}

#[derive(Debug, Clone)]
enum DimSpec {
    Int { low: i64, high: i64 },
    Uniform { low: f64, high: f64 },
    LogUniform { low: f64, high: f64 },
    Categorical { choices: Vec<ParamValue> },
}

type TrialValues = HashMap<String, ParamValue>;

/// TPE-style sequential sampler.
///
/// The first `n_startup` trials sample uniformly. After that, observations
/// are split by cost into a good (best `gamma` fraction) and bad group;
/// suggestions are drawn by perturbing a good observation, and the
/// incumbent's immediate neighborhood (one dimension stepped at a time) is
/// enumerated systematically before falling back to perturbation, so the
/// search settles into the best local basin found so far.
pub struct TpeSampler {
    rng: ChaCha8Rng,
    n_startup: usize,
    gamma: f64,
    dims: Vec<(String, DimSpec)>,
    history: Vec<(TrialValues, f64)>,
    best: Option<(TrialValues, f64)>,
    neighborhood: VecDeque<TrialValues>,
    proposal: Option<TrialValues>,
    current: TrialValues,
}

impl TpeSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            n_startup: 10,
            gamma: 0.25,
            dims: Vec::new(),
            history: Vec::new(),
            best: None,
            neighborhood: VecDeque::new(),
            proposal: None,
            current: HashMap::new(),
        }
    }

    pub fn with_startup(mut self, n_startup: usize) -> Self {
        self.n_startup = n_startup;
        self
    }

    pub fn trials_observed(&self) -> usize {
        self.history.len()
    }

    fn record_dim(&mut self, name: &str, spec: DimSpec) {
        if !self.dims.iter().any(|(n, _)| n == name) {
            self.dims.push((name.to_string(), spec));
        }
    }

    fn in_startup(&self) -> bool {
        self.history.len() < self.n_startup
    }

    /// A good observation to perturb: the incumbent with high probability,
    /// otherwise a random member of the best `gamma` fraction.
    fn good_center(&mut self) -> Option<TrialValues> {
        if self.in_startup() || self.history.is_empty() {
            return None;
        }
        let mut ranked: Vec<usize> = (0..self.history.len()).collect();
        ranked.sort_by(|&a, &b| {
            self.history[a]
                .1
                .partial_cmp(&self.history[b].1)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let good_len = ((self.gamma * ranked.len() as f64).ceil() as usize).max(1);
        let pick = if self.rng.gen_bool(0.7) {
            ranked[0]
        } else {
            ranked[self.rng.gen_range(0..good_len)]
        };
        Some(self.history[pick].0.clone())
    }

    fn seen(&self, values: &TrialValues) -> bool {
        self.history.iter().any(|(v, _)| v == values)
    }

    /// Enumerate single-dimension steps away from the incumbent that have
    /// not been evaluated yet.
    fn rebuild_neighborhood(&mut self) {
        self.neighborhood.clear();
        let Some((best, _)) = &self.best else {
            return;
        };
        let mut candidates = Vec::new();
        for (name, spec) in &self.dims {
            let Some(value) = best.get(name) else {
                continue;
            };
            let steps: Vec<ParamValue> = match (spec, value) {
                (DimSpec::Int { low, high }, ParamValue::Int(v)) => [v - 1, v + 1]
                    .into_iter()
                    .filter(|s| s >= low && s <= high)
                    .map(ParamValue::Int)
                    .collect(),
                (DimSpec::Uniform { low, high }, ParamValue::Float(v)) => {
                    let step = 0.1 * (high - low);
                    [v - step, v + step]
                        .into_iter()
                        .map(|s| s.clamp(*low, *high))
                        .filter(|s| s != v)
                        .map(ParamValue::Float)
                        .collect()
                }
                (DimSpec::LogUniform { low, high }, ParamValue::Float(v)) => {
                    let step = 0.1 * (high.ln() - low.ln());
                    [v.ln() - step, v.ln() + step]
                        .into_iter()
                        .map(|s| s.exp().clamp(*low, *high))
                        .filter(|s| s != v)
                        .map(ParamValue::Float)
                        .collect()
                }
                (DimSpec::Categorical { choices }, current) => choices
                    .iter()
                    .filter(|c| *c != current)
                    .cloned()
                    .collect(),
                _ => Vec::new(),
            };
            for step in steps {
                let mut neighbor = best.clone();
                neighbor.insert(name.clone(), step);
                candidates.push(neighbor);
            }
        }
        for candidate in candidates {
            if !self.seen(&candidate) {
                self.neighborhood.push_back(candidate);
            }
        }
    }

    fn proposed(&self, name: &str) -> Option<&ParamValue> {
        self.proposal.as_ref().and_then(|p| p.get(name))
    }
}

impl TrialSampler for TpeSampler {
    fn start_trial(&mut self) {
        self.current.clear();
        self.proposal = if self.in_startup() {
            None
        } else {
            self.neighborhood.pop_front()
        };
    }

    fn suggest_int(&mut self, name: &str, low: i64, high: i64) -> i64 {
        self.record_dim(name, DimSpec::Int { low, high });
        let value = if let Some(ParamValue::Int(v)) = self.proposed(name) {
            (*v).clamp(low, high)
        } else if let Some(ParamValue::Int(center)) =
            self.good_center().and_then(|c| c.get(name).cloned())
        {
            (center + self.rng.gen_range(-1..=1)).clamp(low, high)
        } else {
            self.rng.gen_range(low..=high)
        };
        self.current.insert(name.to_string(), ParamValue::Int(value));
        value
    }

    fn suggest_uniform(&mut self, name: &str, low: f64, high: f64) -> f64 {
        self.record_dim(name, DimSpec::Uniform { low, high });
        let value = if let Some(ParamValue::Float(v)) = self.proposed(name) {
            v.clamp(low, high)
        } else if let Some(ParamValue::Float(center)) =
            self.good_center().and_then(|c| c.get(name).cloned())
        {
            let noise = self.rng.gen_range(-0.1..=0.1) * (high - low);
            (center + noise).clamp(low, high)
        } else {
            self.rng.gen_range(low..=high)
        };
        self.current
            .insert(name.to_string(), ParamValue::Float(value));
        value
    }

    fn suggest_log_uniform(&mut self, name: &str, low: f64, high: f64) -> f64 {
        self.record_dim(name, DimSpec::LogUniform { low, high });
        let value = if let Some(ParamValue::Float(v)) = self.proposed(name) {
            v.clamp(low, high)
        } else if let Some(ParamValue::Float(center)) =
            self.good_center().and_then(|c| c.get(name).cloned())
        {
            let noise = self.rng.gen_range(-0.1..=0.1) * (high.ln() - low.ln());
            (center.ln() + noise).exp().clamp(low, high)
        } else {
            self.rng.gen_range(low.ln()..=high.ln()).exp().clamp(low, high)
        };
        self.current
            .insert(name.to_string(), ParamValue::Float(value));
        value
    }

    fn suggest_categorical(&mut self, name: &str, choices: &[ParamValue]) -> ParamValue {
        self.record_dim(
            name,
            DimSpec::Categorical {
                choices: choices.to_vec(),
            },
        );
        let proposed = self.proposed(name).cloned();
        let value = match proposed {
            Some(v) if choices.contains(&v) => v,
            _ => match self.good_center().and_then(|c| c.get(name).cloned()) {
                Some(center) if choices.contains(&center) && self.rng.gen_bool(0.8) => center,
                _ => choices[self.rng.gen_range(0..choices.len())].clone(),
            },
        };
        self.current.insert(name.to_string(), value.clone());
        value
    }

    fn observe(&mut self, cost: f64) {
        let values = std::mem::take(&mut self.current);
        self.proposal = None;
        let improved = self.best.as_ref().map_or(true, |(_, best)| cost < *best);
        self.history.push((values.clone(), cost));
        if improved {
            self.best = Some((values, cost));
            self.rebuild_neighborhood();
        }
    }
}
