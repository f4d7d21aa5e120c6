//! Binary classification metrics and named scorers
//!
//! Hard-label metrics treat `1.0` as the positive class and return `0.0` on
//! zero division. Probability metrics take the positive-class probability.

use crate::classifiers::Classifier;
use crate::error::{MetaModelError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Probabilities are clipped to `[EPS, 1 - EPS]` before taking logs
pub const LOG_LOSS_EPS: f64 = 1e-15;

/// Confusion counts `(tp, fp, tn, fn)`
pub fn confusion_counts(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (usize, usize, usize, usize) {
    let mut tp = 0;
    let mut fp = 0;
    let mut tn = 0;
    let mut fn_ = 0;

    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        match (*t > 0.5, *p > 0.5) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (false, false) => tn += 1,
            (true, false) => fn_ += 1,
        }
    }

    (tp, fp, tn, fn_)
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}

/// Fraction of exact label matches
pub fn accuracy_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (*t - *p).abs() < 0.5)
        .count();
    ratio(correct, y_true.len())
}

pub fn precision_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let (tp, fp, _, _) = confusion_counts(y_true, y_pred);
    ratio(tp, tp + fp)
}

pub fn recall_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let (tp, _, _, fn_) = confusion_counts(y_true, y_pred);
    ratio(tp, tp + fn_)
}

pub fn f1_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let p = precision_score(y_true, y_pred);
    let r = recall_score(y_true, y_pred);
    if p + r > 0.0 {
        2.0 * p * r / (p + r)
    } else {
        0.0
    }
}

/// Area under the ROC curve from the Mann-Whitney U statistic.
///
/// Tied scores receive their average rank, so hard 0/1 predictions are
/// accepted and give the balanced accuracy of the labelling.
pub fn roc_auc_score(y_true: &Array1<f64>, y_score: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_score)?;
    let n_pos = y_true.iter().filter(|&&t| t > 0.5).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(MetaModelError::ComputationError(
            "ROC AUC is undefined when only one class is present in y_true".to_string(),
        ));
    }
    if y_score.iter().any(|s| s.is_nan()) {
        return Err(MetaModelError::ComputationError("ROC AUC received NaN scores".to_string()));
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[a].total_cmp(&y_score[b]));

    // Average 1-based ranks over runs of equal scores
    let mut ranks = vec![0.0; order.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && y_score[order[end]] == y_score[order[start]] {
            end += 1;
        }
        let avg_rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg_rank;
        }
        start = end;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(&t, _)| t > 0.5)
        .map(|(_, &r)| r)
        .sum();
    let u = pos_rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Ok(u / (n_pos * n_neg) as f64)
}

/// Mean binary cross-entropy
pub fn log_loss(y_true: &Array1<f64>, y_prob: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_prob)?;
    if y_true.is_empty() {
        return Err(MetaModelError::DataError("log loss of an empty sample".to_string()));
    }
    let total: f64 = y_true
        .iter()
        .zip(y_prob.iter())
        // Both confident mistakes cost exactly -ln(eps)
        .map(|(&t, &p)| -(t * p.max(LOG_LOSS_EPS).ln() + (1.0 - t) * (1.0 - p).max(LOG_LOSS_EPS).ln()))
        .sum();
    Ok(total / y_true.len() as f64)
}

fn check_lengths(a: &Array1<f64>, b: &Array1<f64>) -> Result<()> {
    if a.len() != b.len() {
        return Err(MetaModelError::ShapeError {
            expected: format!("{} predictions", a.len()),
            actual: format!("{} predictions", b.len()),
        });
    }
    Ok(())
}

/// Named scorer; larger is always better
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMetric {
    Accuracy,
    #[default]
    RocAuc,
    Precision,
    Recall,
    F1,
    NegLogLoss,
}

impl ScoringMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringMetric::Accuracy => "accuracy",
            ScoringMetric::RocAuc => "roc_auc",
            ScoringMetric::Precision => "precision",
            ScoringMetric::Recall => "recall",
            ScoringMetric::F1 => "f1",
            ScoringMetric::NegLogLoss => "neg_log_loss",
        }
    }

    /// Whether the scorer consumes `predict_proba` instead of `predict`
    pub fn needs_proba(&self) -> bool {
        matches!(self, ScoringMetric::RocAuc | ScoringMetric::NegLogLoss)
    }

    /// Score a fitted estimator on held-out data
    pub fn score(&self, estimator: &dyn Classifier, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        if self.needs_proba() {
            let proba = estimator.predict_proba(x)?;
            return match self {
                ScoringMetric::RocAuc => roc_auc_score(y, &proba),
                _ => log_loss(y, &proba).map(|loss| -loss),
            };
        }

        let y_pred = estimator.predict(x)?;
        check_lengths(y, &y_pred)?;
        Ok(match self {
            ScoringMetric::Accuracy => accuracy_score(y, &y_pred),
            ScoringMetric::Precision => precision_score(y, &y_pred),
            ScoringMetric::Recall => recall_score(y, &y_pred),
            _ => f1_score(y, &y_pred),
        })
    }
}

impl fmt::Display for ScoringMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoringMetric {
    type Err = MetaModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "accuracy" => Ok(ScoringMetric::Accuracy),
            "roc_auc" | "auc" => Ok(ScoringMetric::RocAuc),
            "precision" => Ok(ScoringMetric::Precision),
            "recall" => Ok(ScoringMetric::Recall),
            "f1" => Ok(ScoringMetric::F1),
            "neg_log_loss" => Ok(ScoringMetric::NegLogLoss),
            other => Err(MetaModelError::ConfigError(format!("unknown scoring metric '{}'", other))),
        }
    }
}
