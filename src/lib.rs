//! metamodel - randomized model selection for binary classifiers
//!
//! This crate provides:
//! - A randomized hyperparameter search that samples an estimator and its
//!   hyperparameters from a heterogeneous search space, cross-validates each
//!   sample, and refits the best one
//! - Cross-validation splitters and named scoring metrics
//! - A small family of binary classifiers behind one [`Classifier`] trait
//! - Train/validation metric aggregation
//!
//! # Modules
//!
//! - [`search`] - Randomized search, parameter distributions, search spaces
//! - [`model_selection`] - K-fold splitting and `cross_val_score`
//! - [`metrics`] - Accuracy, ROC AUC, F1, log loss and friends
//! - [`classifiers`] - Logistic regression, decision tree, KNN, naive Bayes, MLP
//! - [`evaluation`] - `train_and_validate_classifiers`
//! - [`data`] - Loading tabular files through polars
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use metamodel::prelude::*;
//! use ndarray::array;
//!
//! let x = array![[0.0, 1.0], [1.0, 0.5], [4.0, 4.5], [5.0, 4.0]];
//! let y = array![0.0, 0.0, 1.0, 1.0];
//!
//! let space = vec![
//!     SearchSpaceEntry::new("knn", Box::new(KNeighborsClassifier::new()))
//!         .with_param("n_neighbors", ParamDistribution::values([1i64, 2])),
//! ];
//! let config = SearchConfig::new()
//!     .with_n_iter(5)
//!     .with_cv(CVStrategy::StratifiedKFold { n_splits: 2, shuffle: true })
//!     .with_random_state(0);
//! let outcome = RandomizedSearchCV::new(config).fit(&x, &y, &space)?;
//! println!("best: {}", outcome.best_trial().configuration);
//! # Ok::<(), metamodel::error::MetaModelError>(())
//! ```

pub mod error;

pub mod classifiers;
pub mod metrics;
pub mod model_selection;
pub mod search;

pub mod evaluation;
pub mod data;
pub mod cli;

pub use classifiers::Classifier;
pub use error::{MetaModelError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifiers::{
        Classifier, DecisionTreeClassifier, EstimatorKind, GaussianNB, KNeighborsClassifier, LogisticRegression,
        MLPClassifier,
    };
    pub use crate::data::Dataset;
    pub use crate::error::{MetaModelError, Result};
    pub use crate::evaluation::{train_and_validate_classifiers, ClassifierEvaluation, MetricSet};
    pub use crate::metrics::ScoringMetric;
    pub use crate::model_selection::{cross_val_score, CVStrategy, CrossValidator};
    pub use crate::search::{
        randomized_search_cv, BoundedIntVector, LogUniform, ParamDistribution, ParamValue, RandInt,
        RandomizedSearchCV, SearchConfig, SearchOutcome, SearchSpaceEntry, Uniform,
    };
}
