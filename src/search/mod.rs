//! Hyperparameter search and candidate selection

mod catalog;
mod engine;
mod grid;

pub use catalog::{builtin_catalog, Candidate, ModelFamily};
pub use engine::{evaluate_catalog, CandidateOutcome, SearchOutcome};
pub use grid::{format_params, ParamGrid, ParamSet, ParamValue};
