//! Hyperparameter grids
//!
//! A grid maps parameter names to an ordered set of candidate values; the
//! search engine enumerates the cartesian product in a fixed order so that
//! ties between combinations resolve deterministically.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Int(usize),
    Float(f64),
    Str(String),
}

impl ParamValue {
    pub fn str(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }

    pub fn as_usize(&self) -> Option<usize> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(v) => write!(f, "{}", v),
        }
    }
}

/// A chosen assignment of parameter names to values
pub type ParamSet = Vec<(String, ParamValue)>;

/// Ordered hyperparameter grid
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamGrid {
    entries: Vec<(String, Vec<ParamValue>)>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one parameter dimension (builder style)
    pub fn param(mut self, name: &str, values: Vec<ParamValue>) -> Self {
        self.entries.push((name.to_string(), values));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() || self.entries.iter().any(|(_, v)| v.is_empty())
    }

    /// Total number of combinations
    pub fn n_combinations(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        self.entries.iter().map(|(_, v)| v.len()).product()
    }

    /// Enumerate the cartesian product. Earlier parameters vary slowest, so
    /// the first combination takes the first listed value of every
    /// parameter.
    pub fn combinations(&self) -> Vec<ParamSet> {
        if self.is_empty() {
            return Vec::new();
        }

        let mut combos: Vec<ParamSet> = vec![Vec::new()];
        for (name, values) in &self.entries {
            let mut next = Vec::with_capacity(combos.len() * values.len());
            for combo in &combos {
                for value in values {
                    let mut extended = combo.clone();
                    extended.push((name.clone(), value.clone()));
                    next.push(extended);
                }
            }
            combos = next;
        }
        combos
    }
}

/// Render a parameter set for logs and tracking
pub fn format_params(params: &ParamSet) -> String {
    if params.is_empty() {
        return "defaults".to_string();
    }
    params
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(", ")
}
