//! Randomized hyperparameter search with refit

use super::config::SearchConfig;
use super::params::{format_assignment, ParamAssignment};
use super::space::{validate_search_space, SampledConfiguration, SearchSpaceEntry};
use crate::classifiers::{check_binary_labels, Classifier};
use crate::error::{MetaModelError, Result};
use crate::model_selection::{cross_val_score, CrossValidator};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Result of a single trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    /// Trial number, starting at 0
    pub trial: usize,
    /// Sampled estimator and hyperparameters
    pub configuration: SampledConfiguration,
    /// Held-out score of each fold, in fold order
    pub fold_scores: Vec<f64>,
    /// Cross-validation score
    pub mean_score: f64,
    pub std_score: f64,
    pub duration_secs: f64,
}

/// Everything a search produced
#[derive(Debug)]
pub struct SearchOutcome {
    trials: Vec<TrialResult>,
    best_index: usize,
    best_estimator: Option<Box<dyn Classifier>>,
    total_duration_secs: f64,
}

impl SearchOutcome {
    /// All trials in the order they ran
    pub fn trials(&self) -> &[TrialResult] {
        &self.trials
    }

    pub fn best_index(&self) -> usize {
        self.best_index
    }

    /// Get the best trial
    pub fn best_trial(&self) -> &TrialResult {
        &self.trials[self.best_index]
    }

    /// Get the best cross-validation score
    pub fn best_score(&self) -> f64 {
        self.best_trial().mean_score
    }

    /// Get the best hyperparameters
    pub fn best_params(&self) -> &ParamAssignment {
        &self.best_trial().configuration.params
    }

    /// Best configuration fitted on the full training set; `None` without refit
    pub fn best_estimator(&self) -> Option<&dyn Classifier> {
        self.best_estimator.as_deref()
    }

    pub fn into_best_estimator(self) -> Option<Box<dyn Classifier>> {
        self.best_estimator
    }

    pub fn total_duration_secs(&self) -> f64 {
        self.total_duration_secs
    }

    /// Serializable view of the outcome
    pub fn summary(&self) -> SearchSummary {
        SearchSummary {
            n_trials: self.trials.len(),
            best_index: self.best_index,
            best_score: self.best_score(),
            best_configuration: self.best_trial().configuration.clone(),
            refitted: self.best_estimator.is_some(),
            total_duration_secs: self.total_duration_secs,
            trials: self.trials.clone(),
        }
    }
}

/// JSON-friendly search report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSummary {
    pub n_trials: usize,
    pub best_index: usize,
    pub best_score: f64,
    pub best_configuration: SampledConfiguration,
    pub refitted: bool,
    pub total_duration_secs: f64,
    pub trials: Vec<TrialResult>,
}

/// Index of the highest mean score; the first occurrence wins ties and a
/// NaN score never beats a real one
pub fn best_trial_index(trials: &[TrialResult]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, trial) in trials.iter().enumerate() {
        let is_better = match best {
            None => true,
            Some(b) => {
                let best_score = trials[b].mean_score;
                trial.mean_score > best_score || (best_score.is_nan() && !trial.mean_score.is_nan())
            }
        };
        if is_better {
            best = Some(idx);
        }
    }
    best
}

/// The sampled values as the estimator reports them back, so `Int(1)` set
/// on a float hyperparameter is recorded as `Float(1.0)`
fn canonical_params(estimator: &dyn Classifier, sampled: ParamAssignment) -> ParamAssignment {
    let applied = estimator.get_params();
    sampled
        .into_iter()
        .map(|(name, value)| match applied.get(&name) {
            Some(canonical) => (name, canonical.clone()),
            None => (name, value),
        })
        .collect()
}

/// Randomized search over a heterogeneous space of classifiers
pub struct RandomizedSearchCV {
    config: SearchConfig,
}

impl RandomizedSearchCV {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run `n_iter` trials, then optionally refit the best configuration.
    ///
    /// Every input is validated before the first trial. A failure while
    /// evaluating any sampled configuration aborts the search with
    /// `EvaluationError`; completed trials are dropped with it.
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>, search_space: &[SearchSpaceEntry]) -> Result<SearchOutcome> {
        self.validate(x, y, search_space)?;

        let start = Instant::now();
        let strategy = self.config.cv_strategy();
        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let mut trials = Vec::with_capacity(self.config.n_iter);
        for trial in 0..self.config.n_iter {
            let trial_start = Instant::now();

            let entry_index = rng.gen_range(0..search_space.len());
            let entry = &search_space[entry_index];
            let params = entry.sample_params(&mut rng);
            // Fresh shuffle per trial, reproducible through the search seed
            let validator = CrossValidator::new(strategy).with_random_state(rng.gen());

            let (params, results) = entry
                .instantiate(&params)
                .and_then(|estimator| {
                    let params = canonical_params(estimator.as_ref(), params);
                    let results = cross_val_score(
                        estimator.as_ref(),
                        x,
                        y,
                        &validator,
                        self.config.scoring,
                        self.config.n_jobs,
                    )?;
                    Ok((params, results))
                })
                .map_err(|e| MetaModelError::EvaluationError {
                    trial,
                    estimator: entry.id().to_string(),
                    source: Box::new(e),
                })?;

            let result = TrialResult {
                trial,
                configuration: SampledConfiguration {
                    entry_index,
                    entry_id: entry.id().to_string(),
                    params,
                },
                fold_scores: results.scores,
                mean_score: results.mean_score,
                std_score: results.std_score,
                duration_secs: trial_start.elapsed().as_secs_f64(),
            };
            self.log_trial(&result);
            trials.push(result);
        }

        let best_index = best_trial_index(&trials)
            .ok_or_else(|| MetaModelError::ComputationError("search produced no trials".to_string()))?;
        let best = &trials[best_index];
        if self.config.verbose {
            info!(trial = best_index, estimator = %best.configuration.entry_id, score = best.mean_score, "Best configuration");
        } else {
            debug!(trial = best_index, estimator = %best.configuration.entry_id, score = best.mean_score, "Best configuration");
        }

        let best_estimator = if self.config.refit {
            Some(self.refit(x, y, search_space, best)?)
        } else {
            None
        };

        Ok(SearchOutcome {
            trials,
            best_index,
            best_estimator,
            total_duration_secs: start.elapsed().as_secs_f64(),
        })
    }

    fn validate(&self, x: &Array2<f64>, y: &Array1<f64>, search_space: &[SearchSpaceEntry]) -> Result<()> {
        self.config.validate()?;
        validate_search_space(search_space)?;
        if x.nrows() != y.len() {
            return Err(MetaModelError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        check_binary_labels(y)?;
        self.config.cv_strategy().validate(x.nrows())
    }

    fn refit(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        search_space: &[SearchSpaceEntry],
        best: &TrialResult,
    ) -> Result<Box<dyn Classifier>> {
        let entry = &search_space[best.configuration.entry_index];
        entry
            .instantiate(&best.configuration.params)
            .and_then(|mut estimator| {
                estimator.fit(x, y)?;
                Ok(estimator)
            })
            .map_err(|e| MetaModelError::EvaluationError {
                trial: best.trial,
                estimator: entry.id().to_string(),
                source: Box::new(e),
            })
    }

    fn log_trial(&self, result: &TrialResult) {
        let params = format_assignment(&result.configuration.params);
        if self.config.verbose {
            info!(
                trial = result.trial,
                estimator = %result.configuration.entry_id,
                params = %params,
                fold_scores = ?result.fold_scores,
                mean_score = result.mean_score,
                "Trial complete"
            );
        } else {
            debug!(
                trial = result.trial,
                estimator = %result.configuration.entry_id,
                params = %params,
                fold_scores = ?result.fold_scores,
                mean_score = result.mean_score,
                "Trial complete"
            );
        }
    }
}

/// Functional form of [`RandomizedSearchCV::fit`]
pub fn randomized_search_cv(
    x: &Array2<f64>,
    y: &Array1<f64>,
    search_space: &[SearchSpaceEntry],
    config: SearchConfig,
) -> Result<SearchOutcome> {
    RandomizedSearchCV::new(config).fit(x, y, search_space)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial(idx: usize, score: f64) -> TrialResult {
        TrialResult {
            trial: idx,
            configuration: SampledConfiguration {
                entry_index: 0,
                entry_id: "m".to_string(),
                params: ParamAssignment::new(),
            },
            fold_scores: vec![score],
            mean_score: score,
            std_score: 0.0,
            duration_secs: 0.0,
        }
    }

    #[test]
    fn test_best_index_first_max_wins() {
        let trials = vec![trial(0, 0.7), trial(1, 0.9), trial(2, 0.9), trial(3, 0.8)];
        assert_eq!(best_trial_index(&trials), Some(1));
    }

    #[test]
    fn test_best_index_skips_nan() {
        let trials = vec![trial(0, f64::NAN), trial(1, 0.5), trial(2, f64::NAN)];
        assert_eq!(best_trial_index(&trials), Some(1));
        assert_eq!(best_trial_index(&[]), None);
    }
}
