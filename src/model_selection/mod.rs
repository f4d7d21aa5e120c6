//! Model selection
//!
//! Provides the splitting and scoring machinery the search relies on:
//! - K-Fold, Stratified K-Fold and Repeated Stratified K-Fold splitters
//! - `cross_val_score` with optional fold-level parallelism

pub mod cross_validation;

pub use cross_validation::{cross_val_score, CVResults, CVSplit, CVStrategy, CrossValidator};
