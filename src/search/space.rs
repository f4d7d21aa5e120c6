//! Search space entries and sampled configurations

use super::distributions::ParamDistribution;
use super::params::{format_assignment, ParamAssignment};
use crate::classifiers::Classifier;
use crate::error::{MetaModelError, Result};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// One candidate estimator plus the distributions of its hyperparameters
#[derive(Debug, Clone)]
pub struct SearchSpaceEntry {
    id: String,
    estimator: Box<dyn Classifier>,
    param_distributions: Vec<(String, ParamDistribution)>,
}

impl SearchSpaceEntry {
    /// Entry with no searched hyperparameters
    pub fn new(id: impl Into<String>, estimator: Box<dyn Classifier>) -> Self {
        Self {
            id: id.into(),
            estimator,
            param_distributions: Vec::new(),
        }
    }

    /// Add a hyperparameter; sampling follows declaration order
    pub fn with_param(mut self, name: impl Into<String>, distribution: ParamDistribution) -> Self {
        self.param_distributions.push((name.into(), distribution));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The template estimator; never fitted by the search
    pub fn estimator(&self) -> &dyn Classifier {
        self.estimator.as_ref()
    }

    pub fn param_distributions(&self) -> &[(String, ParamDistribution)] {
        &self.param_distributions
    }

    /// Check every distribution and reject repeated names
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (name, distribution) in &self.param_distributions {
            if !seen.insert(name.as_str()) {
                return Err(MetaModelError::ConfigError(format!(
                    "entry '{}' declares hyperparameter '{}' more than once",
                    self.id, name
                )));
            }
            distribution
                .validate(name)
                .map_err(|e| MetaModelError::ConfigError(format!("entry '{}': {}", self.id, e)))?;
        }
        Ok(())
    }

    /// Draw one value per hyperparameter, in declaration order
    pub fn sample_params(&self, rng: &mut dyn RngCore) -> ParamAssignment {
        self.param_distributions
            .iter()
            .map(|(name, distribution)| (name.clone(), distribution.sample(rng)))
            .collect()
    }

    /// Unfitted estimator carrying `params`
    pub fn instantiate(&self, params: &ParamAssignment) -> Result<Box<dyn Classifier>> {
        let mut estimator = self.estimator.clone_unfitted();
        estimator.set_params(params)?;
        Ok(estimator)
    }
}

/// The configuration drawn for one trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampledConfiguration {
    /// Index into the search space
    pub entry_index: usize,
    pub entry_id: String,
    pub params: ParamAssignment,
}

impl fmt::Display for SampledConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.entry_id, format_assignment(&self.params))
    }
}

/// Fail on an empty space or any invalid entry
pub fn validate_search_space(search_space: &[SearchSpaceEntry]) -> Result<()> {
    if search_space.is_empty() {
        return Err(MetaModelError::ConfigError("search space is empty".to_string()));
    }
    search_space.iter().try_for_each(SearchSpaceEntry::validate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifiers::{DecisionTreeClassifier, KNeighborsClassifier};
    use crate::search::distributions::RandInt;
    use crate::search::params::ParamValue;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn knn_entry() -> SearchSpaceEntry {
        SearchSpaceEntry::new("knn", Box::new(KNeighborsClassifier::new()))
            .with_param("n_neighbors", ParamDistribution::sampler(RandInt::new(1, 6)))
            .with_param("weights", ParamDistribution::values(["uniform", "distance"]))
    }

    #[test]
    fn test_sample_params_stays_in_support() {
        let entry = knn_entry();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        for _ in 0..200 {
            let params = entry.sample_params(&mut rng);
            assert_eq!(params.len(), 2);
            let k = params["n_neighbors"].as_int().unwrap();
            assert!((1..6).contains(&k));
            let w = params["weights"].as_str().unwrap();
            assert!(w == "uniform" || w == "distance");
        }
    }

    #[test]
    fn test_instantiate_applies_params() {
        let entry = knn_entry();
        let mut params = ParamAssignment::new();
        params.insert("n_neighbors".to_string(), ParamValue::Int(2));
        params.insert("weights".to_string(), "distance".into());
        let model = entry.instantiate(&params).unwrap();
        assert_eq!(model.get_params()["n_neighbors"], ParamValue::Int(2));
        // The template is untouched
        assert_eq!(entry.estimator().get_params()["n_neighbors"], ParamValue::Int(5));
    }

    #[test]
    fn test_duplicate_param_rejected() {
        let entry = SearchSpaceEntry::new("tree", Box::new(DecisionTreeClassifier::new()))
            .with_param("max_depth", ParamDistribution::values([1i64, 2]))
            .with_param("max_depth", ParamDistribution::values([3i64]));
        assert!(matches!(entry.validate(), Err(MetaModelError::ConfigError(_))));
    }

    #[test]
    fn test_empty_space_rejected() {
        assert!(matches!(validate_search_space(&[]), Err(MetaModelError::ConfigError(_))));
    }

    #[test]
    fn test_empty_value_set_rejected() {
        let entry = SearchSpaceEntry::new("tree", Box::new(DecisionTreeClassifier::new()))
            .with_param("criterion", ParamDistribution::Enumerated(vec![]));
        assert!(validate_search_space(&[entry]).is_err());
    }
}
