//! Multi-layer perceptron classifier
//!
//! A feedforward network trained by mini-batch SGD with momentum on the
//! binary cross-entropy loss. Inputs are standardized with statistics taken
//! at fit time; the output layer is a single sigmoid unit.

use super::{check_fit_input, check_n_features, gather, gather_rows, positive, reject_unknown, threshold, Classifier};
use crate::error::{MetaModelError, Result};
use crate::search::params::{ParamAssignment, ParamValue};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

const PARAMS: &[&str] = &[
    "hidden_layer_sizes",
    "activation",
    "alpha",
    "learning_rate_init",
    "max_iter",
    "batch_size",
    "momentum",
    "random_state",
];

/// Hidden-layer activation function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Activation {
    /// Rectified Linear Unit
    #[default]
    Relu,
    /// Hyperbolic tangent
    Tanh,
    /// Sigmoid
    Logistic,
    /// Linear (identity)
    Identity,
}

impl Activation {
    fn as_str(self) -> &'static str {
        match self {
            Activation::Relu => "relu",
            Activation::Tanh => "tanh",
            Activation::Logistic => "logistic",
            Activation::Identity => "identity",
        }
    }

    fn activate(self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Relu => z.mapv(|v| v.max(0.0)),
            Activation::Tanh => z.mapv(f64::tanh),
            Activation::Logistic => z.mapv(sigmoid),
            Activation::Identity => z.clone(),
        }
    }

    /// Derivative expressed in terms of the pre-activation `z`
    fn derivative(self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Relu => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Tanh => z.mapv(|v| 1.0 - v.tanh().powi(2)),
            Activation::Logistic => z.mapv(|v| {
                let s = sigmoid(v);
                s * (1.0 - s)
            }),
            Activation::Identity => Array2::ones(z.raw_dim()),
        }
    }
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

/// Fitted network state
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Network {
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
    means: Array1<f64>,
    scales: Array1<f64>,
}

/// Multi-Layer Perceptron Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MLPClassifier {
    /// Width of each hidden layer
    pub hidden_layer_sizes: Vec<usize>,
    pub activation: Activation,
    /// L2 penalty
    pub alpha: f64,
    pub learning_rate_init: f64,
    /// Number of epochs
    pub max_iter: usize,
    pub batch_size: usize,
    pub momentum: f64,
    /// Seed for weight init and batch shuffling; entropy when `None`
    pub random_state: Option<u64>,
    network: Option<Network>,
}

impl Default for MLPClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl MLPClassifier {
    pub fn new() -> Self {
        Self {
            hidden_layer_sizes: vec![100],
            activation: Activation::Relu,
            alpha: 0.0001,
            learning_rate_init: 0.01,
            max_iter: 200,
            batch_size: 32,
            momentum: 0.9,
            random_state: None,
            network: None,
        }
    }

    pub fn with_hidden_layers(mut self, sizes: Vec<usize>) -> Self {
        self.hidden_layer_sizes = sizes;
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Seeds are kept in the non-negative `i64` range so they survive a
    /// `get_params`/`set_params` round trip; the top bit is dropped.
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed & i64::MAX as u64);
        self
    }

    fn initialize(&self, n_features: usize, rng: &mut Xoshiro256PlusPlus) -> (Vec<Array2<f64>>, Vec<Array1<f64>>) {
        let mut layer_sizes = vec![n_features];
        layer_sizes.extend(&self.hidden_layer_sizes);
        layer_sizes.push(1);

        layer_sizes
            .windows(2)
            .map(|pair| {
                let (n_in, n_out) = (pair[0], pair[1]);
                // Glorot uniform
                let bound = (6.0 / (n_in + n_out) as f64).sqrt();
                let w = Array2::from_shape_fn((n_in, n_out), |_| rng.gen_range(-bound..bound));
                (w, Array1::zeros(n_out))
            })
            .unzip()
    }

    /// Returns pre-activations per layer and activations (input first)
    fn forward(
        &self,
        weights: &[Array2<f64>],
        biases: &[Array1<f64>],
        x: &Array2<f64>,
    ) -> (Vec<Array2<f64>>, Vec<Array2<f64>>) {
        let mut activations = vec![x.clone()];
        let mut z_values = Vec::with_capacity(weights.len());
        let last = weights.len() - 1;

        for (i, (w, b)) in weights.iter().zip(biases.iter()).enumerate() {
            let z = activations[i].dot(w) + b;
            let a = if i < last { self.activation.activate(&z) } else { z.mapv(sigmoid) };
            z_values.push(z);
            activations.push(a);
        }
        (z_values, activations)
    }

    fn standardize(x: &Array2<f64>, means: &Array1<f64>, scales: &Array1<f64>) -> Array2<f64> {
        (x - means) / scales
    }
}

impl Classifier for MLPClassifier {
    fn name(&self) -> &'static str {
        "MLPClassifier"
    }

    fn get_params(&self) -> ParamAssignment {
        let mut params = ParamAssignment::new();
        params.insert(
            "hidden_layer_sizes".to_string(),
            ParamValue::IntVec(self.hidden_layer_sizes.iter().map(|&s| s as i64).collect()),
        );
        params.insert("activation".to_string(), ParamValue::from(self.activation.as_str()));
        params.insert("alpha".to_string(), ParamValue::Float(self.alpha));
        params.insert("learning_rate_init".to_string(), ParamValue::Float(self.learning_rate_init));
        params.insert("max_iter".to_string(), ParamValue::from(self.max_iter));
        params.insert("batch_size".to_string(), ParamValue::from(self.batch_size));
        params.insert("momentum".to_string(), ParamValue::Float(self.momentum));
        params.insert(
            "random_state".to_string(),
            ParamValue::from(self.random_state.map(|s| s as i64)),
        );
        params
    }

    fn set_params(&mut self, params: &ParamAssignment) -> Result<()> {
        reject_unknown(self.name(), params, PARAMS)?;
        let mut next = self.clone();
        for (name, value) in params {
            match name.as_str() {
                "hidden_layer_sizes" => {
                    let sizes = match value {
                        ParamValue::IntVec(v) => v.clone(),
                        ParamValue::Int(v) => vec![*v],
                        _ => return Err(MetaModelError::invalid_param(name, value, "expected a list of layer widths")),
                    };
                    if sizes.is_empty() || sizes.iter().any(|&s| s < 1) {
                        return Err(MetaModelError::invalid_param(name, value, "every layer width must be >= 1"));
                    }
                    next.hidden_layer_sizes = sizes.into_iter().map(|s| s as usize).collect();
                }
                "activation" => {
                    next.activation = match value.to_str(name)? {
                        "relu" => Activation::Relu,
                        "tanh" => Activation::Tanh,
                        "logistic" => Activation::Logistic,
                        "identity" => Activation::Identity,
                        _ => {
                            return Err(MetaModelError::invalid_param(
                                name,
                                value,
                                "expected 'relu', 'tanh', 'logistic' or 'identity'",
                            ))
                        }
                    }
                }
                "alpha" => {
                    let alpha = value.to_f64(name)?;
                    if alpha < 0.0 {
                        return Err(MetaModelError::invalid_param(name, value, "must be non-negative"));
                    }
                    next.alpha = alpha;
                }
                "learning_rate_init" => next.learning_rate_init = positive(name, value)?,
                "max_iter" => next.max_iter = value.to_usize(name)?,
                "batch_size" => {
                    let size = value.to_usize(name)?;
                    if size == 0 {
                        return Err(MetaModelError::invalid_param(name, value, "must be >= 1"));
                    }
                    next.batch_size = size;
                }
                "momentum" => {
                    let m = value.to_f64(name)?;
                    if !(0.0..1.0).contains(&m) {
                        return Err(MetaModelError::invalid_param(name, value, "must be in [0, 1)"));
                    }
                    next.momentum = m;
                }
                "random_state" => next.random_state = value.to_optional_usize(name)?.map(|s| s as u64),
                _ => unreachable!("rejected above"),
            }
        }
        *self = next;
        Ok(())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let n_samples = x.nrows();

        let means = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));
        let scales = x.std_axis(Axis(0), 0.0).mapv(|s| if s > 1e-12 { s } else { 1.0 });
        let x_scaled = Self::standardize(x, &means, &scales);

        let mut rng = match self.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };
        let (mut weights, mut biases) = self.initialize(x.ncols(), &mut rng);

        let mut velocities_w: Vec<Array2<f64>> = weights.iter().map(|w| Array2::zeros(w.raw_dim())).collect();
        let mut velocities_b: Vec<Array1<f64>> = biases.iter().map(|b| Array1::zeros(b.len())).collect();
        let lr = self.learning_rate_init;

        let mut indices: Vec<usize> = (0..n_samples).collect();
        for _epoch in 0..self.max_iter {
            indices.shuffle(&mut rng);

            for batch in indices.chunks(self.batch_size) {
                let x_batch = gather_rows(&x_scaled, batch);
                let y_batch = gather(y, batch).insert_axis(Axis(1));
                let n = batch.len() as f64;

                let (z_values, activations) = self.forward(&weights, &biases, &x_batch);

                // Sigmoid output with cross-entropy: delta = p - y
                let mut delta = (&activations[weights.len()] - &y_batch) / n;
                for i in (0..weights.len()).rev() {
                    let grad_w = activations[i].t().dot(&delta) + &(&weights[i] * (self.alpha / n));
                    let grad_b = delta.sum_axis(Axis(0));

                    if i > 0 {
                        delta = delta.dot(&weights[i].t()) * self.activation.derivative(&z_values[i - 1]);
                    }

                    velocities_w[i] = &velocities_w[i] * self.momentum - &grad_w * lr;
                    velocities_b[i] = &velocities_b[i] * self.momentum - &grad_b * lr;
                    weights[i] += &velocities_w[i];
                    biases[i] += &velocities_b[i];
                }
            }
        }

        if weights.iter().any(|w| w.iter().any(|v| !v.is_finite())) {
            return Err(MetaModelError::ComputationError(
                "MLP weights diverged; lower learning_rate_init".to_string(),
            ));
        }

        self.network = Some(Network { weights, biases, means, scales });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(threshold(self.predict_proba(x)?))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let net = self.network.as_ref().ok_or(MetaModelError::ModelNotFitted)?;
        check_n_features(net.means.len(), x)?;
        let x_scaled = Self::standardize(x, &net.means, &net.scales);
        let (_, activations) = self.forward(&net.weights, &net.biases, &x_scaled);
        Ok(activations[net.weights.len()].column(0).to_owned())
    }

    fn clone_unfitted(&self) -> Box<dyn Classifier> {
        Box::new(Self {
            network: None,
            ..self.clone()
        })
    }
}
