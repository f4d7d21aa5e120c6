//! Cross-validation splitters and fold scoring

use crate::classifiers::{gather, gather_rows, Classifier};
use crate::error::{MetaModelError, Result};
use crate::metrics::ScoringMetric;
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Cross-validation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CVStrategy {
    /// K-Fold cross-validation
    KFold { n_splits: usize, shuffle: bool },
    /// Stratified K-Fold (maintains class distribution)
    StratifiedKFold { n_splits: usize, shuffle: bool },
    /// Stratified K-Fold repeated with a different shuffle each time
    RepeatedStratifiedKFold { n_splits: usize, n_repeats: usize },
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::StratifiedKFold { n_splits: 5, shuffle: true }
    }
}

impl CVStrategy {
    /// Folds per repeat
    pub fn n_splits(&self) -> usize {
        match self {
            CVStrategy::KFold { n_splits, .. }
            | CVStrategy::StratifiedKFold { n_splits, .. }
            | CVStrategy::RepeatedStratifiedKFold { n_splits, .. } => *n_splits,
        }
    }

    /// Total number of train/test splits produced
    pub fn total_splits(&self) -> usize {
        match self {
            CVStrategy::RepeatedStratifiedKFold { n_splits, n_repeats } => n_splits * n_repeats,
            _ => self.n_splits(),
        }
    }

    /// Check the strategy against a sample count
    pub fn validate(&self, n_samples: usize) -> Result<()> {
        let n_splits = self.n_splits();
        if n_splits < 2 {
            return Err(MetaModelError::ConfigError("n_splits must be at least 2".to_string()));
        }
        if let CVStrategy::RepeatedStratifiedKFold { n_repeats: 0, .. } = self {
            return Err(MetaModelError::ConfigError("n_repeats must be at least 1".to_string()));
        }
        if n_samples < n_splits {
            return Err(MetaModelError::ConfigError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, n_splits
            )));
        }
        Ok(())
    }
}

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Cross-validation splitter
#[derive(Debug, Clone)]
pub struct CrossValidator {
    strategy: CVStrategy,
    random_state: Option<u64>,
}

impl CrossValidator {
    /// Create a new cross-validator
    pub fn new(strategy: CVStrategy) -> Self {
        Self {
            strategy,
            random_state: None,
        }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn strategy(&self) -> CVStrategy {
        self.strategy
    }

    fn rng(seed: Option<u64>) -> ChaCha8Rng {
        match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    /// Generate train/test splits
    pub fn split(&self, n_samples: usize, y: Option<&Array1<f64>>) -> Result<Vec<CVSplit>> {
        self.strategy.validate(n_samples)?;

        match self.strategy {
            CVStrategy::KFold { n_splits, shuffle } => {
                Ok(Self::k_fold_split(n_samples, n_splits, shuffle, self.random_state))
            }
            CVStrategy::StratifiedKFold { n_splits, shuffle } => {
                let y = Self::require_target(n_samples, y)?;
                Ok(Self::stratified_k_fold_split(y, n_splits, shuffle, self.random_state))
            }
            CVStrategy::RepeatedStratifiedKFold { n_splits, n_repeats } => {
                let y = Self::require_target(n_samples, y)?;
                let mut all_splits = Vec::with_capacity(n_splits * n_repeats);
                for repeat in 0..n_repeats {
                    let seed = self.random_state.map(|s| s.wrapping_add(repeat as u64));
                    let mut splits = Self::stratified_k_fold_split(y, n_splits, true, seed);
                    // Fold indices stay unique across repeats
                    for split in &mut splits {
                        split.fold_idx += repeat * n_splits;
                    }
                    all_splits.extend(splits);
                }
                Ok(all_splits)
            }
        }
    }

    fn require_target(n_samples: usize, y: Option<&Array1<f64>>) -> Result<&Array1<f64>> {
        let y = y.ok_or_else(|| {
            MetaModelError::ConfigError("stratified splitting requires the target array".to_string())
        })?;
        if y.len() != n_samples {
            return Err(MetaModelError::ShapeError {
                expected: format!("{} targets", n_samples),
                actual: format!("{} targets", y.len()),
            });
        }
        Ok(y)
    }

    fn k_fold_split(n_samples: usize, n_splits: usize, shuffle: bool, seed: Option<u64>) -> Vec<CVSplit> {
        let mut indices: Vec<usize> = (0..n_samples).collect();
        if shuffle {
            indices.shuffle(&mut Self::rng(seed));
        }

        let base = n_samples / n_splits;
        let remainder = n_samples % n_splits;

        let mut splits = Vec::with_capacity(n_splits);
        let mut current = 0;
        for fold_idx in 0..n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test_indices = indices[current..current + fold_size].to_vec();
            let train_indices = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });
            current += fold_size;
        }
        splits
    }

    fn stratified_k_fold_split(y: &Array1<f64>, n_splits: usize, shuffle: bool, seed: Option<u64>) -> Vec<CVSplit> {
        // Ordered by class so a fixed seed reproduces the same folds
        let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &val) in y.iter().enumerate() {
            class_indices.entry(val.round() as i64).or_default().push(idx);
        }

        if shuffle {
            let mut rng = Self::rng(seed);
            for indices in class_indices.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        // Deal each class round-robin, continuing where the previous class
        // stopped so fold sizes differ by at most one
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        let mut offset = 0;
        for indices in class_indices.values() {
            for (i, &idx) in indices.iter().enumerate() {
                folds[(offset + i) % n_splits].push(idx);
            }
            offset += indices.len();
        }

        (0..n_splits)
            .map(|fold_idx| {
                let mut test_indices = folds[fold_idx].clone();
                test_indices.sort_unstable();
                let mut train_indices: Vec<usize> = folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect();
                train_indices.sort_unstable();
                CVSplit {
                    train_indices,
                    test_indices,
                    fold_idx,
                }
            })
            .collect()
    }
}

/// Cross-validation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold, in fold order
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Standard deviation of scores
    pub std_score: f64,
    /// Number of folds
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;
        let std_score = variance.sqrt();

        Self {
            scores,
            mean_score,
            std_score,
            n_folds,
        }
    }
}

fn score_split(
    estimator: &dyn Classifier,
    x: &Array2<f64>,
    y: &Array1<f64>,
    split: &CVSplit,
    scoring: ScoringMetric,
) -> Result<f64> {
    let mut model = estimator.clone_unfitted();
    model.fit(&gather_rows(x, &split.train_indices), &gather(y, &split.train_indices))?;

    let score = scoring.score(
        model.as_ref(),
        &gather_rows(x, &split.test_indices),
        &gather(y, &split.test_indices),
    )?;
    debug!(fold = split.fold_idx, score, "fold scored");
    Ok(score)
}

/// Score `estimator` on every split of `validator`.
///
/// Each fold fits its own unfitted clone, so `estimator` itself is never
/// modified. With `n_jobs > 1` folds run on a dedicated rayon pool of that
/// many threads, which also caps the row and feature parallelism inside the
/// classifiers. With `n_jobs == 1` all work stays on the calling thread.
/// Scores are returned in fold order either way.
pub fn cross_val_score(
    estimator: &dyn Classifier,
    x: &Array2<f64>,
    y: &Array1<f64>,
    validator: &CrossValidator,
    scoring: ScoringMetric,
    n_jobs: usize,
) -> Result<CVResults> {
    if x.nrows() != y.len() {
        return Err(MetaModelError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if n_jobs == 0 {
        return Err(MetaModelError::ConfigError("n_jobs must be at least 1".to_string()));
    }

    let splits = validator.split(x.nrows(), Some(y))?;

    let scores = if n_jobs > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_jobs)
            .build()
            .map_err(|e| MetaModelError::ThreadPoolError(e.to_string()))?;
        pool.install(|| {
            splits
                .par_iter()
                .map(|split| score_split(estimator, x, y, split, scoring))
                .collect::<Result<Vec<f64>>>()
        })?
    } else {
        splits
            .iter()
            .map(|split| score_split(estimator, x, y, split, scoring))
            .collect::<Result<Vec<f64>>>()?
    };

    Ok(CVResults::from_scores(scores))
}
