//! Binary classifiers searchable by the randomized search engine
//!
//! Every estimator implements [`Classifier`]: sklearn-style
//! `get_params`/`set_params` so a sampled configuration can be applied to an
//! unfitted clone, plus `fit`/`predict`/`predict_proba`/`score`.
//!
//! Labels are `0.0` / `1.0`; `predict_proba` returns the probability of the
//! positive class.

pub mod logistic;
pub mod decision_tree;
pub mod knn;
pub mod naive_bayes;
pub mod neural_network;

pub use logistic::LogisticRegression;
pub use decision_tree::{Criterion, DecisionTreeClassifier};
pub use knn::{DistanceMetric, KNeighborsClassifier, WeightScheme};
pub use naive_bayes::GaussianNB;
pub use neural_network::{Activation, MLPClassifier};

use crate::error::{MetaModelError, Result};
use crate::metrics::accuracy_score;
use crate::search::params::{ParamAssignment, ParamValue};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Common interface of every searchable estimator
pub trait Classifier: Send + Sync + fmt::Debug {
    /// Short estimator name, e.g. `"LogisticRegression"`
    fn name(&self) -> &'static str;

    /// Current hyperparameters
    fn get_params(&self) -> ParamAssignment;

    /// Apply hyperparameters. Unknown names or ill-typed values fail with
    /// `InvalidParameter` and leave the estimator unchanged.
    fn set_params(&mut self, params: &ParamAssignment) -> Result<()>;

    /// Fit to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict hard labels
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Probability of the positive class
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Mean accuracy on the given data
    fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let y_pred = self.predict(x)?;
        Ok(accuracy_score(y, &y_pred))
    }

    /// Unfitted copy carrying the same hyperparameters
    fn clone_unfitted(&self) -> Box<dyn Classifier>;
}

impl Clone for Box<dyn Classifier> {
    fn clone(&self) -> Self {
        self.clone_unfitted()
    }
}

/// Built-in estimator kinds, addressable by name from config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    LogisticRegression,
    DecisionTree,
    KNeighbors,
    GaussianNb,
    Mlp,
}

impl EstimatorKind {
    /// Fresh estimator with default hyperparameters
    pub fn build(self) -> Box<dyn Classifier> {
        match self {
            EstimatorKind::LogisticRegression => Box::new(LogisticRegression::new()),
            EstimatorKind::DecisionTree => Box::new(DecisionTreeClassifier::new()),
            EstimatorKind::KNeighbors => Box::new(KNeighborsClassifier::new()),
            EstimatorKind::GaussianNb => Box::new(GaussianNB::new()),
            EstimatorKind::Mlp => Box::new(MLPClassifier::new()),
        }
    }
}

impl std::str::FromStr for EstimatorKind {
    type Err = MetaModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "logistic_regression" | "logistic" => Ok(EstimatorKind::LogisticRegression),
            "decision_tree" => Ok(EstimatorKind::DecisionTree),
            "k_neighbors" | "knn" => Ok(EstimatorKind::KNeighbors),
            "gaussian_nb" | "naive_bayes" => Ok(EstimatorKind::GaussianNb),
            "mlp" => Ok(EstimatorKind::Mlp),
            other => Err(MetaModelError::ConfigError(format!("unknown estimator '{}'", other))),
        }
    }
}

/// Check that `x` and `y` are aligned, non-empty and that `y` is binary
pub(crate) fn check_fit_input(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(MetaModelError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(MetaModelError::DataError("cannot fit on empty data".to_string()));
    }
    check_binary_labels(y)
}

/// Labels must be exactly 0.0 or 1.0
pub(crate) fn check_binary_labels(y: &Array1<f64>) -> Result<()> {
    match y.iter().find(|&&v| v != 0.0 && v != 1.0) {
        Some(bad) => Err(MetaModelError::DataError(format!(
            "labels must be 0 or 1, found {}",
            bad
        ))),
        None => Ok(()),
    }
}

/// Check the feature count seen at predict time
pub(crate) fn check_n_features(expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(MetaModelError::ShapeError {
            expected: format!("{} features", expected),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

/// Fail on any key of `params` not in `known`
pub(crate) fn reject_unknown(estimator: &str, params: &ParamAssignment, known: &[&str]) -> Result<()> {
    for (name, value) in params {
        if !known.contains(&name.as_str()) {
            return Err(MetaModelError::invalid_param(
                name,
                value,
                format!("not a hyperparameter of {}", estimator),
            ));
        }
    }
    Ok(())
}

/// Probability ≥ 0.5 → class 1
pub(crate) fn threshold(proba: Array1<f64>) -> Array1<f64> {
    proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 })
}

/// Positive-float check shared by several `set_params` implementations
pub(crate) fn positive(name: &str, value: &ParamValue) -> Result<f64> {
    let v = value.to_f64(name)?;
    if !(v > 0.0) || !v.is_finite() {
        return Err(MetaModelError::invalid_param(name, value, "must be a positive number"));
    }
    Ok(v)
}

/// Map `f` over `0..n`, in order.
///
/// Runs on the current rayon pool when called from one of its workers and
/// sequentially otherwise, so the `n_jobs` pool of `cross_val_score` bounds
/// every thread a fit or predict uses.
pub(crate) fn map_indices<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    if rayon::current_thread_index().is_some() {
        (0..n).into_par_iter().map(f).collect()
    } else {
        (0..n).map(f).collect()
    }
}

/// Gather the given rows of `x` into a new matrix
pub(crate) fn gather_rows(x: &Array2<f64>, indices: &[usize]) -> Array2<f64> {
    let n_cols = x.ncols();
    Array2::from_shape_fn((indices.len(), n_cols), |(r, c)| x[[indices[r], c]])
}

/// Gather the given entries of `y`
pub(crate) fn gather(y: &Array1<f64>, indices: &[usize]) -> Array1<f64> {
    indices.iter().map(|&i| y[i]).collect()
}
