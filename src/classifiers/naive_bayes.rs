//! Gaussian Naive Bayes

use super::{check_fit_input, check_n_features, reject_unknown, threshold, Classifier};
use crate::error::{MetaModelError, Result};
use crate::search::params::{ParamAssignment, ParamValue};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Per-class Gaussian statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClassStats {
    log_prior: f64,
    means: Vec<f64>,
    variances: Vec<f64>,
}

impl ClassStats {
    fn joint_log_likelihood(&self, row: ArrayView1<f64>) -> f64 {
        self.log_prior
            + row
                .iter()
                .zip(self.means.iter())
                .zip(self.variances.iter())
                .map(|((&xi, &mean), &var)| -0.5 * ((xi - mean).powi(2) / var + var.ln() + (2.0 * PI).ln()))
                .sum::<f64>()
    }
}

/// Gaussian Naive Bayes classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNB {
    /// Fraction of the largest feature variance added to every variance
    pub var_smoothing: f64,
    /// Stats for class 0 and class 1; `None` for a class absent at fit time
    classes: Option<[Option<ClassStats>; 2]>,
    n_features: usize,
}

impl Default for GaussianNB {
    fn default() -> Self {
        Self::new()
    }
}

impl GaussianNB {
    pub fn new() -> Self {
        Self {
            var_smoothing: 1e-9,
            classes: None,
            n_features: 0,
        }
    }

    /// Set variance smoothing parameter
    pub fn with_var_smoothing(mut self, smoothing: f64) -> Self {
        self.var_smoothing = smoothing;
        self
    }

    fn class_stats(x: &Array2<f64>, y: &Array1<f64>, label: f64, epsilon: f64) -> Option<ClassStats> {
        let n_features = x.ncols();
        let mut means = vec![0.0; n_features];
        let mut m2 = vec![0.0; n_features];
        let mut count = 0usize;

        // Welford's single-pass mean/variance
        for (row, _) in x.rows().into_iter().zip(y.iter()).filter(|(_, &yi)| yi == label) {
            count += 1;
            for (j, &val) in row.iter().enumerate() {
                let delta = val - means[j];
                means[j] += delta / count as f64;
                m2[j] += delta * (val - means[j]);
            }
        }
        if count == 0 {
            return None;
        }

        Some(ClassStats {
            log_prior: (count as f64 / y.len() as f64).ln(),
            variances: m2.iter().map(|&v| v / count as f64 + epsilon).collect(),
            means,
        })
    }
}

impl Classifier for GaussianNB {
    fn name(&self) -> &'static str {
        "GaussianNB"
    }

    fn get_params(&self) -> ParamAssignment {
        let mut params = ParamAssignment::new();
        params.insert("var_smoothing".to_string(), ParamValue::Float(self.var_smoothing));
        params
    }

    fn set_params(&mut self, params: &ParamAssignment) -> Result<()> {
        reject_unknown(self.name(), params, &["var_smoothing"])?;
        if let Some(value) = params.get("var_smoothing") {
            let v = value.to_f64("var_smoothing")?;
            if v < 0.0 {
                return Err(MetaModelError::invalid_param("var_smoothing", value, "must be non-negative"));
            }
            self.var_smoothing = v;
        }
        Ok(())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;

        let max_var = x.var_axis(Axis(0), 0.0).iter().cloned().fold(0.0, f64::max);
        // Keep variances strictly positive even for constant features
        let epsilon = (self.var_smoothing * max_var).max(f64::MIN_POSITIVE);

        self.n_features = x.ncols();
        self.classes = Some([
            Self::class_stats(x, y, 0.0, epsilon),
            Self::class_stats(x, y, 1.0, epsilon),
        ]);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(threshold(self.predict_proba(x)?))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let [neg, pos] = self.classes.as_ref().ok_or(MetaModelError::ModelNotFitted)?;
        check_n_features(self.n_features, x)?;

        let proba = x
            .rows()
            .into_iter()
            .map(|row| match (neg, pos) {
                (Some(neg), Some(pos)) => {
                    let l0 = neg.joint_log_likelihood(row);
                    let l1 = pos.joint_log_likelihood(row);
                    // Two-class softmax, stable for large magnitudes
                    1.0 / (1.0 + (l0 - l1).exp())
                }
                (None, _) => 1.0,
                (_, None) => 0.0,
            })
            .collect();
        Ok(proba)
    }

    fn clone_unfitted(&self) -> Box<dyn Classifier> {
        Box::new(Self {
            var_smoothing: self.var_smoothing,
            ..Self::new()
        })
    }
}
