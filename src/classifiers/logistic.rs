//! L2-regularized logistic regression fitted by batch gradient descent

use super::{check_fit_input, check_n_features, positive, reject_unknown, threshold, Classifier};
use crate::error::{MetaModelError, Result};
use crate::search::params::{ParamAssignment, ParamValue};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

const PARAMS: &[&str] = &["alpha", "learning_rate", "max_iter", "tol", "fit_intercept"];

/// Logistic regression for binary classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: f64,
    /// Whether to fit intercept
    pub fit_intercept: bool,
    /// Regularization strength (L2)
    pub alpha: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            fit_intercept: true,
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
        }
    }

    /// Set regularization strength
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set learning rate
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &'static str {
        "LogisticRegression"
    }

    fn get_params(&self) -> ParamAssignment {
        let mut params = ParamAssignment::new();
        params.insert("alpha".to_string(), ParamValue::Float(self.alpha));
        params.insert("learning_rate".to_string(), ParamValue::Float(self.learning_rate));
        params.insert("max_iter".to_string(), ParamValue::from(self.max_iter));
        params.insert("tol".to_string(), ParamValue::Float(self.tol));
        params.insert("fit_intercept".to_string(), ParamValue::Bool(self.fit_intercept));
        params
    }

    fn set_params(&mut self, params: &ParamAssignment) -> Result<()> {
        reject_unknown(self.name(), params, PARAMS)?;
        let mut next = self.clone();
        for (name, value) in params {
            match name.as_str() {
                "alpha" => {
                    let alpha = value.to_f64(name)?;
                    if alpha < 0.0 {
                        return Err(MetaModelError::invalid_param(name, value, "must be non-negative"));
                    }
                    next.alpha = alpha;
                }
                "learning_rate" => next.learning_rate = positive(name, value)?,
                "max_iter" => next.max_iter = value.to_usize(name)?,
                "tol" => next.tol = positive(name, value)?,
                "fit_intercept" => next.fit_intercept = value.to_bool(name)?,
                _ => unreachable!("rejected above"),
            }
        }
        *self = next;
        Ok(())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let n_samples = x.nrows() as f64;

        let mut weights = Array1::zeros(x.ncols());
        let mut bias = 0.0;
        let lr = self.learning_rate;

        for _ in 0..self.max_iter {
            let linear = x.dot(&weights) + bias;
            let errors = &Self::sigmoid(&linear) - y;

            let dw = (x.t().dot(&errors) / n_samples) + (self.alpha * &weights);
            let db = if self.fit_intercept { errors.mean().unwrap_or(0.0) } else { 0.0 };

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - lr * dw;
            bias -= lr * db;
        }

        if weights.iter().any(|w| !w.is_finite()) || !bias.is_finite() {
            return Err(MetaModelError::ComputationError(
                "logistic regression diverged; lower the learning rate".to_string(),
            ));
        }

        self.coefficients = Some(weights);
        self.intercept = bias;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(threshold(self.predict_proba(x)?))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(MetaModelError::ModelNotFitted)?;
        check_n_features(coefficients.len(), x)?;
        Ok(Self::sigmoid(&(x.dot(coefficients) + self.intercept)))
    }

    fn clone_unfitted(&self) -> Box<dyn Classifier> {
        Box::new(Self {
            coefficients: None,
            intercept: 0.0,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_logistic_regression() {
        let x = array![
            [1.0, 1.0],
            [1.5, 1.5],
            [2.0, 2.0],
            [5.0, 5.0],
            [5.5, 5.5],
            [6.0, 6.0],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut model = LogisticRegression::new()
            .with_max_iter(1000)
            .with_learning_rate(0.5);
        model.fit(&x, &y).unwrap();

        let accuracy = model.score(&x, &y).unwrap();
        assert!(accuracy >= 0.8, "Accuracy should be >= 0.8, got {}", accuracy);
    }

    #[test]
    fn test_predict_proba() {
        let x = array![[0.0, 0.0], [10.0, 10.0]];
        let y = array![0.0, 1.0];

        let mut model = LogisticRegression::new().with_max_iter(500);
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba[0] < 0.5);
        assert!(proba[1] > 0.5);
    }

    #[test]
    fn test_set_params() {
        let mut model = LogisticRegression::new();
        let mut params = ParamAssignment::new();
        params.insert("alpha".to_string(), ParamValue::Float(0.5));
        params.insert("max_iter".to_string(), ParamValue::Int(50));
        model.set_params(&params).unwrap();
        assert_eq!(model.alpha, 0.5);
        assert_eq!(model.max_iter, 50);

        let mut bad = ParamAssignment::new();
        bad.insert("alpha".to_string(), ParamValue::Float(0.1));
        bad.insert("penalty".to_string(), "l1".into());
        assert!(model.set_params(&bad).is_err());
        // Failed update leaves the model untouched
        assert_eq!(model.alpha, 0.5);
    }

    #[test]
    fn test_not_fitted() {
        let model = LogisticRegression::new();
        assert!(matches!(model.predict(&array![[1.0]]), Err(MetaModelError::ModelNotFitted)));
    }
}
