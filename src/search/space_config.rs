//! Search spaces described in JSON
//!
//! ```json
//! {
//!   "entries": [
//!     {
//!       "id": "tree",
//!       "estimator": "decision_tree",
//!       "params": [
//!         { "name": "max_depth", "distribution": { "kind": "values", "values": [2, 4, null] } },
//!         { "name": "min_samples_leaf", "distribution": { "kind": "randint", "low": 1, "high": 10 } }
//!       ]
//!     }
//!   ]
//! }
//! ```

use super::distributions::{BoundedIntVector, LogUniform, ParamDistribution, RandInt, Uniform};
use super::params::ParamValue;
use super::space::{validate_search_space, SearchSpaceEntry};
use crate::classifiers::{
    DecisionTreeClassifier, EstimatorKind, GaussianNB, KNeighborsClassifier, LogisticRegression, MLPClassifier,
};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serializable form of a [`ParamDistribution`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistributionSpec {
    /// Finite set sampled uniformly
    Values { values: Vec<ParamValue> },
    Uniform { low: f64, high: f64 },
    LogUniform { low: f64, high: f64 },
    /// Integers in `[low, high)`
    Randint { low: i64, high: i64 },
    /// See [`BoundedIntVector`]
    IntVector { low: i64, high: i64, dimension: usize },
}

impl DistributionSpec {
    pub fn build(&self) -> ParamDistribution {
        match self {
            DistributionSpec::Values { values } => ParamDistribution::Enumerated(values.clone()),
            DistributionSpec::Uniform { low, high } => ParamDistribution::sampler(Uniform::new(*low, *high)),
            DistributionSpec::LogUniform { low, high } => ParamDistribution::sampler(LogUniform::new(*low, *high)),
            DistributionSpec::Randint { low, high } => ParamDistribution::sampler(RandInt::new(*low, *high)),
            DistributionSpec::IntVector { low, high, dimension } => {
                ParamDistribution::sampler(BoundedIntVector::new(*low, *high, *dimension))
            }
        }
    }
}

/// One named hyperparameter and its distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub distribution: DistributionSpec,
}

/// One search space entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySpec {
    pub id: String,
    pub estimator: EstimatorKind,
    /// Sampled in this order
    #[serde(default)]
    pub params: Vec<ParamSpec>,
}

/// A complete search space file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchSpaceConfig {
    pub entries: Vec<EntrySpec>,
}

impl SearchSpaceConfig {
    /// Parse from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Build and validate the search space
    pub fn build(&self) -> Result<Vec<SearchSpaceEntry>> {
        let space: Vec<SearchSpaceEntry> = self
            .entries
            .iter()
            .map(|spec| {
                spec.params.iter().fold(
                    SearchSpaceEntry::new(spec.id.clone(), spec.estimator.build()),
                    |entry, param| entry.with_param(param.name.clone(), param.distribution.build()),
                )
            })
            .collect();
        validate_search_space(&space)?;
        Ok(space)
    }
}

/// A broad space over every built-in classifier
pub fn default_search_space() -> Vec<SearchSpaceEntry> {
    vec![
        SearchSpaceEntry::new("logistic_regression", Box::new(LogisticRegression::new()))
            .with_param("alpha", ParamDistribution::sampler(LogUniform::new(1e-4, 1.0)))
            .with_param("learning_rate", ParamDistribution::values([0.01, 0.05, 0.1])),
        SearchSpaceEntry::new("decision_tree", Box::new(DecisionTreeClassifier::new()))
            .with_param(
                "max_depth",
                ParamDistribution::values([Some(2usize), Some(4), Some(8), None]),
            )
            .with_param("min_samples_leaf", ParamDistribution::sampler(RandInt::new(1, 10)))
            .with_param("criterion", ParamDistribution::values(["gini", "entropy"])),
        SearchSpaceEntry::new("k_neighbors", Box::new(KNeighborsClassifier::new()))
            .with_param("n_neighbors", ParamDistribution::sampler(RandInt::new(1, 30)))
            .with_param("weights", ParamDistribution::values(["uniform", "distance"]))
            .with_param("metric", ParamDistribution::values(["euclidean", "manhattan"])),
        SearchSpaceEntry::new("gaussian_nb", Box::new(GaussianNB::new()))
            .with_param("var_smoothing", ParamDistribution::sampler(LogUniform::new(1e-12, 1e-6))),
        SearchSpaceEntry::new("mlp", Box::new(MLPClassifier::new()))
            .with_param("hidden_layer_sizes", ParamDistribution::sampler(BoundedIntVector::new(10, 100, 2)))
            .with_param("activation", ParamDistribution::values(["relu", "tanh", "logistic"]))
            .with_param("alpha", ParamDistribution::sampler(LogUniform::new(1e-5, 1e-2))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetaModelError;

    const SPACE_JSON: &str = r#"{
        "entries": [
            {
                "id": "tree",
                "estimator": "decision_tree",
                "params": [
                    { "name": "max_depth", "distribution": { "kind": "values", "values": [2, 4, null] } },
                    { "name": "min_samples_leaf", "distribution": { "kind": "randint", "low": 1, "high": 10 } }
                ]
            },
            {
                "id": "mlp",
                "estimator": "mlp",
                "params": [
                    { "name": "hidden_layer_sizes", "distribution": { "kind": "int_vector", "low": 4, "high": 16, "dimension": 2 } },
                    { "name": "alpha", "distribution": { "kind": "log_uniform", "low": 0.0001, "high": 0.1 } }
                ]
            },
            { "id": "nb", "estimator": "gaussian_nb" }
        ]
    }"#;

    #[test]
    fn test_parse_and_build() {
        let config = SearchSpaceConfig::from_json_str(SPACE_JSON).unwrap();
        assert_eq!(config.entries.len(), 3);
        assert_eq!(
            config.entries[0].params[0].distribution,
            DistributionSpec::Values {
                values: vec![ParamValue::Int(2), ParamValue::Int(4), ParamValue::Null]
            }
        );

        let space = config.build().unwrap();
        assert_eq!(space.len(), 3);
        assert_eq!(space[1].id(), "mlp");
        let names: Vec<&str> = space[0].param_distributions().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["max_depth", "min_samples_leaf"]);
        assert!(space[2].param_distributions().is_empty());
    }

    #[test]
    fn test_invalid_bounds_fail_build() {
        let json = r#"{"entries": [{"id": "lr", "estimator": "logistic_regression",
            "params": [{"name": "alpha", "distribution": {"kind": "uniform", "low": 1.0, "high": 0.5}}]}]}"#;
        let config = SearchSpaceConfig::from_json_str(json).unwrap();
        assert!(matches!(config.build(), Err(MetaModelError::ConfigError(_))));
    }

    #[test]
    fn test_unknown_estimator_is_rejected() {
        let json = r#"{"entries": [{"id": "svm", "estimator": "svm"}]}"#;
        assert!(SearchSpaceConfig::from_json_str(json).is_err());
    }

    #[test]
    fn test_default_space_is_valid() {
        let space = default_search_space();
        assert_eq!(space.len(), 5);
        validate_search_space(&space).unwrap();
    }
}
