//! Randomized hyperparameter search
//!
//! Provides:
//! - Parameter values and distributions, including the bounded integer
//!   vector sampler used for MLP layer widths
//! - Search space entries, from code or from JSON files
//! - `RandomizedSearchCV`: sample, cross-validate, keep the best, refit

pub mod params;
pub mod distributions;
mod config;
mod space;
mod space_config;
mod random_search;

pub use config::SearchConfig;
pub use distributions::{BoundedIntVector, LogUniform, ParamDistribution, ParamSampler, RandInt, Uniform};
pub use params::{format_assignment, ParamAssignment, ParamValue};
pub use random_search::{best_trial_index, randomized_search_cv, RandomizedSearchCV, SearchOutcome, SearchSummary, TrialResult};
pub use space::{validate_search_space, SampledConfiguration, SearchSpaceEntry};
pub use space_config::{default_search_space, DistributionSpec, EntrySpec, ParamSpec, SearchSpaceConfig};
