//! Hyperparameter values, parameter sets, and search-space definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// A set of named hyperparameters. `Clone` is a deep copy: mutating a copy
/// never affects the original.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Integer getter with a default. A stored `Float` is truncated.
    pub fn get_int(&self, name: &str, default: i64) -> i64 {
        match self.0.get(name) {
            Some(ParamValue::Int(v)) => *v,
            Some(ParamValue::Float(v)) => *v as i64,
            _ => default,
        }
    }

    /// Float getter with a default. A stored `Int` is widened.
    pub fn get_float(&self, name: &str, default: f64) -> f64 {
        match self.0.get(name) {
            Some(ParamValue::Float(v)) => *v,
            Some(ParamValue::Int(v)) => *v as f64,
            _ => default,
        }
    }

    pub fn get_str<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        match self.0.get(name) {
            Some(ParamValue::Str(v)) => v.as_str(),
            _ => default,
        }
    }

    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.0.get(name) {
            Some(ParamValue::Bool(v)) => *v,
            _ => default,
        }
    }

    /// Merge `other` into a copy of `self`; values in `other` win.
    pub fn merge(&self, other: &Params) -> Params {
        let mut merged = self.clone();
        for (name, value) in &other.0 {
            merged.0.insert(name.clone(), value.clone());
        }
        merged
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }
}

impl std::fmt::Display for Params {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        write!(f, "}}")
    }
}

/// Describes how one hyperparameter dimension is sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Distribution {
    /// Categorical choices.
    Categorical(Vec<ParamValue>),
    /// Continuous uniform range [low, high].
    Uniform { low: f64, high: f64 },
    /// Log-uniform range (sampled in log-space then exponentiated).
    LogUniform { low: f64, high: f64 },
    /// Integer range [low, high] inclusive.
    IntUniform { low: i64, high: i64 },
}

/// The full search space: an ordered list of parameter dimensions.
/// Declaration order is preserved and drives grid visitation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterGrid {
    dims: Vec<(String, Distribution)>,
}

impl ParameterGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn categorical(
        mut self,
        name: impl Into<String>,
        values: Vec<ParamValue>,
    ) -> Self {
        self.dims.push((name.into(), Distribution::Categorical(values)));
        self
    }

    pub fn uniform(mut self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.dims.push((name.into(), Distribution::Uniform { low, high }));
        self
    }

    pub fn log_uniform(mut self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.dims
            .push((name.into(), Distribution::LogUniform { low, high }));
        self
    }

    pub fn int_uniform(mut self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.dims
            .push((name.into(), Distribution::IntUniform { low, high }));
        self
    }

    pub fn dims(&self) -> &[(String, Distribution)] {
        &self.dims
    }

    pub fn len(&self) -> usize {
        self.dims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    /// Total number of grid points (`None` if any dimension is continuous
    /// and has no natural grid).
    pub fn grid_size(&self) -> Option<usize> {
        let mut total: usize = 1;
        for (_, dist) in &self.dims {
            let dim_size = match dist {
                Distribution::Categorical(values) => values.len(),
                Distribution::IntUniform { low, high } => (high - low + 1) as usize,
                _ => return None,
            };
            total = total.checked_mul(dim_size)?;
        }
        Some(total)
    }
}
