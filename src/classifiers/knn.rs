//! K-Nearest Neighbors classifier

use super::{check_fit_input, check_n_features, map_indices, reject_unknown, threshold, Classifier};
use crate::error::{MetaModelError, Result};
use crate::search::params::{ParamAssignment, ParamValue};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

const PARAMS: &[&str] = &["n_neighbors", "weights", "metric"];

/// Distance metric for KNN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean distance (L2)
    #[default]
    Euclidean,
    /// Manhattan distance (L1)
    Manhattan,
}

impl DistanceMetric {
    fn as_str(self) -> &'static str {
        match self {
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::Manhattan => "manhattan",
        }
    }

    fn distance(self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self {
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b.iter())
                .map(|(ai, bi)| (ai - bi) * (ai - bi))
                .sum::<f64>()
                .sqrt(),
            DistanceMetric::Manhattan => a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).abs()).sum(),
        }
    }
}

/// Weighting scheme for neighbors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeightScheme {
    /// All neighbors have equal weight
    #[default]
    Uniform,
    /// Inverse-distance weights
    Distance,
}

impl WeightScheme {
    fn as_str(self) -> &'static str {
        match self {
            WeightScheme::Uniform => "uniform",
            WeightScheme::Distance => "distance",
        }
    }
}

/// K-Nearest Neighbors Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNeighborsClassifier {
    /// Number of neighbors
    pub n_neighbors: usize,
    pub weights: WeightScheme,
    pub metric: DistanceMetric,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl Default for KNeighborsClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl KNeighborsClassifier {
    pub fn new() -> Self {
        Self {
            n_neighbors: 5,
            weights: WeightScheme::Uniform,
            metric: DistanceMetric::Euclidean,
            x_train: None,
            y_train: None,
        }
    }

    /// Create with specified k
    pub fn with_k(k: usize) -> Self {
        Self {
            n_neighbors: k,
            ..Self::new()
        }
    }

    pub fn with_weights(mut self, weights: WeightScheme) -> Self {
        self.weights = weights;
        self
    }
}

/// Max-heap entry keeping the k smallest distances
#[derive(PartialEq)]
struct DistLabel(f64, f64);

impl Eq for DistLabel {}

impl PartialOrd for DistLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DistLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

fn find_k_nearest(
    point: ArrayView1<f64>,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    k: usize,
    metric: DistanceMetric,
) -> Vec<(f64, f64)> {
    let mut heap = BinaryHeap::with_capacity(k + 1);

    for (i, row) in x_train.rows().into_iter().enumerate() {
        let dist = metric.distance(point, row);
        if heap.len() < k {
            heap.push(DistLabel(dist, y_train[i]));
        } else if let Some(top) = heap.peek() {
            if dist < top.0 {
                heap.pop();
                heap.push(DistLabel(dist, y_train[i]));
            }
        }
    }

    heap.into_iter().map(|dl| (dl.0, dl.1)).collect()
}

/// Weighted share of positive neighbors
fn positive_share(neighbors: &[(f64, f64)], weights: WeightScheme) -> f64 {
    // An exact match dominates under distance weighting
    if weights == WeightScheme::Distance {
        let exact: Vec<f64> = neighbors.iter().filter(|(d, _)| *d == 0.0).map(|(_, l)| *l).collect();
        if !exact.is_empty() {
            return exact.iter().sum::<f64>() / exact.len() as f64;
        }
    }

    let mut positive = 0.0;
    let mut total = 0.0;
    for &(dist, label) in neighbors {
        let weight = match weights {
            WeightScheme::Uniform => 1.0,
            WeightScheme::Distance => 1.0 / dist,
        };
        positive += weight * label;
        total += weight;
    }
    if total > 0.0 { positive / total } else { 0.0 }
}

impl Classifier for KNeighborsClassifier {
    fn name(&self) -> &'static str {
        "KNeighborsClassifier"
    }

    fn get_params(&self) -> ParamAssignment {
        let mut params = ParamAssignment::new();
        params.insert("n_neighbors".to_string(), ParamValue::from(self.n_neighbors));
        params.insert("weights".to_string(), ParamValue::from(self.weights.as_str()));
        params.insert("metric".to_string(), ParamValue::from(self.metric.as_str()));
        params
    }

    fn set_params(&mut self, params: &ParamAssignment) -> Result<()> {
        reject_unknown(self.name(), params, PARAMS)?;
        let mut next = self.clone();
        for (name, value) in params {
            match name.as_str() {
                "n_neighbors" => {
                    let k = value.to_usize(name)?;
                    if k == 0 {
                        return Err(MetaModelError::invalid_param(name, value, "must be >= 1"));
                    }
                    next.n_neighbors = k;
                }
                "weights" => {
                    next.weights = match value.to_str(name)? {
                        "uniform" => WeightScheme::Uniform,
                        "distance" => WeightScheme::Distance,
                        _ => return Err(MetaModelError::invalid_param(name, value, "expected 'uniform' or 'distance'")),
                    }
                }
                "metric" => {
                    next.metric = match value.to_str(name)? {
                        "euclidean" => DistanceMetric::Euclidean,
                        "manhattan" => DistanceMetric::Manhattan,
                        _ => return Err(MetaModelError::invalid_param(name, value, "expected 'euclidean' or 'manhattan'")),
                    }
                }
                _ => unreachable!("rejected above"),
            }
        }
        *self = next;
        Ok(())
    }

    /// Stores the training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(threshold(self.predict_proba(x)?))
    }

    /// Parallelized over query rows
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (x_train, y_train) = match (&self.x_train, &self.y_train) {
            (Some(x_train), Some(y_train)) => (x_train, y_train),
            _ => return Err(MetaModelError::ModelNotFitted),
        };
        check_n_features(x_train.ncols(), x)?;
        if self.n_neighbors > x_train.nrows() {
            return Err(MetaModelError::invalid_param(
                "n_neighbors",
                self.n_neighbors,
                format!("exceeds the {} fitted samples", x_train.nrows()),
            ));
        }

        let k = self.n_neighbors;
        let metric = self.metric;
        let weights = self.weights;
        let proba = map_indices(x.nrows(), |i| {
            positive_share(&find_k_nearest(x.row(i), x_train, y_train, k, metric), weights)
        });
        Ok(Array1::from_vec(proba))
    }

    fn clone_unfitted(&self) -> Box<dyn Classifier> {
        Box::new(Self {
            x_train: None,
            y_train: None,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((20, 2), vec![
            // Class 0 (low values)
            1.0, 1.0, 1.5, 1.5, 2.0, 2.0, 2.5, 2.5, 1.0, 2.0,
            1.5, 2.5, 2.0, 1.5, 2.5, 1.0, 1.2, 1.8, 1.8, 1.2,
            // Class 1 (high values)
            8.0, 8.0, 8.5, 8.5, 9.0, 9.0, 9.5, 9.5, 8.0, 9.0,
            8.5, 9.5, 9.0, 8.5, 9.5, 8.0, 8.2, 8.8, 8.8, 8.2,
        ]).unwrap();

        let y = Array1::from_vec(vec![
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0,
        ]);

        (x, y)
    }

    #[test]
    fn test_knn_classifier() {
        let (x, y) = create_classification_data();

        let mut knn = KNeighborsClassifier::with_k(3);
        knn.fit(&x, &y).unwrap();

        assert_eq!(knn.score(&x, &y).unwrap(), 1.0);
    }

    #[test]
    fn test_distance_metrics() {
        let a = ndarray::array![0.0, 0.0];
        let b = ndarray::array![3.0, 4.0];
        assert!((DistanceMetric::Euclidean.distance(a.view(), b.view()) - 5.0).abs() < 1e-12);
        assert!((DistanceMetric::Manhattan.distance(a.view(), b.view()) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_knn_exact_match() {
        let (x, y) = create_classification_data();
        let mut knn = KNeighborsClassifier::with_k(5).with_weights(WeightScheme::Distance);
        knn.fit(&x, &y).unwrap();

        let proba = knn.predict_proba(&x).unwrap();
        assert_eq!(proba, y);
    }

    #[test]
    fn test_too_many_neighbors() {
        let (x, y) = create_classification_data();
        let mut knn = KNeighborsClassifier::with_k(25);
        knn.fit(&x, &y).unwrap();
        assert!(matches!(knn.predict(&x), Err(MetaModelError::InvalidParameter { .. })));
    }
}
