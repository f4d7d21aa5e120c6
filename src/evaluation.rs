//! Train/validation metric aggregation for a set of classifiers

use crate::classifiers::Classifier;
use crate::error::Result;
use crate::metrics::{f1_score, log_loss, recall_score, roc_auc_score};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Metrics of one classifier on one data set.
///
/// All values come from hard `predict` outputs, so `auroc` equals the
/// balanced accuracy and `log_loss` only sees clipped 0/1 probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    pub accuracy: f64,
    pub auroc: f64,
    pub recall: f64,
    pub f1: f64,
    pub log_loss: f64,
}

impl MetricSet {
    /// Compute every metric for a fitted classifier
    pub fn compute(classifier: &dyn Classifier, x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        let y_pred = classifier.predict(x)?;
        Ok(Self {
            accuracy: classifier.score(x, y)?,
            auroc: roc_auc_score(y, &y_pred)?,
            recall: recall_score(y, &y_pred),
            f1: f1_score(y, &y_pred),
            log_loss: log_loss(y, &y_pred)?,
        })
    }
}

/// Training and validation metrics of one named classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierEvaluation {
    pub name: String,
    pub training: MetricSet,
    pub validation: MetricSet,
    pub fit_secs: f64,
}

/// Fit every classifier on the training data in place and report its
/// metrics on both sets, in input order
pub fn train_and_validate_classifiers(
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    x_val: &Array2<f64>,
    y_val: &Array1<f64>,
    classifiers: &mut [(String, Box<dyn Classifier>)],
) -> Result<Vec<ClassifierEvaluation>> {
    classifiers
        .iter_mut()
        .map(|(name, classifier)| {
            let start = Instant::now();
            classifier.fit(x_train, y_train)?;
            let fit_secs = start.elapsed().as_secs_f64();

            let evaluation = ClassifierEvaluation {
                name: name.clone(),
                training: MetricSet::compute(classifier.as_ref(), x_train, y_train)?,
                validation: MetricSet::compute(classifier.as_ref(), x_val, y_val)?,
                fit_secs,
            };
            info!(
                classifier = %name,
                train_accuracy = evaluation.training.accuracy,
                val_accuracy = evaluation.validation.accuracy,
                val_auroc = evaluation.validation.auroc,
                "Classifier evaluated"
            );
            Ok(evaluation)
        })
        .collect()
}
