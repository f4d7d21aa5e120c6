//! Search configuration

use crate::error::{MetaModelError, Result};
use crate::metrics::ScoringMetric;
use crate::model_selection::CVStrategy;
use serde::{Deserialize, Serialize};

/// Configuration for a randomized search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of sampled configurations to evaluate
    pub n_iter: usize,

    /// Metric to maximize
    pub scoring: ScoringMetric,

    /// Splitting strategy; stratified 5-fold with shuffling when `None`
    pub cv: Option<CVStrategy>,

    /// Whether to fit the best configuration on the full data afterwards
    pub refit: bool,

    /// Log each trial at info level instead of debug
    pub verbose: bool,

    /// Maximum number of folds evaluated in parallel
    pub n_jobs: usize,

    /// Seed for sampling and fold shuffling; OS entropy when `None`
    pub random_state: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_iter: 100,
            scoring: ScoringMetric::RocAuc,
            cv: None,
            refit: true,
            verbose: false,
            n_jobs: 1,
            random_state: None,
        }
    }
}

impl SearchConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set number of iterations
    pub fn with_n_iter(mut self, n: usize) -> Self {
        self.n_iter = n;
        self
    }

    /// Builder method to set the scoring metric
    pub fn with_scoring(mut self, scoring: ScoringMetric) -> Self {
        self.scoring = scoring;
        self
    }

    /// Builder method to set the CV strategy
    pub fn with_cv(mut self, cv: CVStrategy) -> Self {
        self.cv = Some(cv);
        self
    }

    pub fn with_refit(mut self, refit: bool) -> Self {
        self.refit = refit;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Builder method to enable parallel fold evaluation
    pub fn with_n_jobs(mut self, n: usize) -> Self {
        self.n_jobs = n;
        self
    }

    /// Builder method to make the search reproducible
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Strategy actually used for splitting
    pub fn cv_strategy(&self) -> CVStrategy {
        self.cv.unwrap_or_default()
    }

    /// Reject settings that could never run
    pub fn validate(&self) -> Result<()> {
        if self.n_iter == 0 {
            return Err(MetaModelError::ConfigError("n_iter must be at least 1".to_string()));
        }
        if self.n_jobs == 0 {
            return Err(MetaModelError::ConfigError("n_jobs must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SearchConfig::default();
        assert_eq!(config.n_iter, 100);
        assert_eq!(config.scoring, ScoringMetric::RocAuc);
        assert!(config.cv.is_none());
        assert!(config.refit);
        assert!(!config.verbose);
        assert_eq!(
            config.cv_strategy(),
            CVStrategy::StratifiedKFold { n_splits: 5, shuffle: true }
        );
    }

    #[test]
    fn test_builder() {
        let config = SearchConfig::new()
            .with_n_iter(10)
            .with_scoring(ScoringMetric::Accuracy)
            .with_cv(CVStrategy::KFold { n_splits: 3, shuffle: false })
            .with_refit(false)
            .with_random_state(9);

        assert_eq!(config.n_iter, 10);
        assert_eq!(config.scoring, ScoringMetric::Accuracy);
        assert!(!config.refit);
        assert_eq!(config.random_state, Some(9));
    }

    #[test]
    fn test_validate() {
        assert!(SearchConfig::new().with_n_iter(0).validate().is_err());
        assert!(SearchConfig::new().with_n_jobs(0).validate().is_err());
        assert!(SearchConfig::new().validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config: SearchConfig = serde_json::from_str(r#"{"n_iter": 5, "scoring": "f1"}"#).unwrap();
        assert_eq!(config.n_iter, 5);
        assert_eq!(config.scoring, ScoringMetric::F1);
        assert!(config.refit);
    }
}
