//! CART decision tree classifier

use super::{check_fit_input, check_n_features, map_indices, reject_unknown, threshold, Classifier};
use crate::error::{MetaModelError, Result};
use crate::search::params::{ParamAssignment, ParamValue};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

const PARAMS: &[&str] = &["max_depth", "min_samples_split", "min_samples_leaf", "criterion"];

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf holding the fraction of positive samples that reached it
    Leaf { proba: f64, n_samples: usize },
    /// Internal node; samples with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Criterion {
    Gini,
    Entropy,
}

impl Criterion {
    fn as_str(self) -> &'static str {
        match self {
            Criterion::Gini => "gini",
            Criterion::Entropy => "entropy",
        }
    }

    /// Impurity of a node with `n_pos` positives out of `n`
    fn impurity(self, n: usize, n_pos: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        let p = n_pos as f64 / n as f64;
        let q = 1.0 - p;
        match self {
            Criterion::Gini => 1.0 - p * p - q * q,
            Criterion::Entropy => {
                let h = |v: f64| if v > 0.0 { -v * v.log2() } else { 0.0 };
                h(p) + h(q)
            }
        }
    }
}

/// Decision tree classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    root: Option<TreeNode>,
    /// Maximum depth, unlimited when `None`
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Impurity criterion
    pub criterion: Criterion,
    n_features: usize,
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTreeClassifier {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: Criterion::Gini,
            n_features: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Depth of the fitted tree (0 for a single leaf)
    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }

    fn build_tree(&self, x: &Array2<f64>, y: &Array1<f64>, indices: &[usize], depth: usize) -> TreeNode {
        let n_samples = indices.len();
        let n_pos = indices.iter().filter(|&&i| y[i] == 1.0).count();
        let leaf = TreeNode::Leaf {
            proba: n_pos as f64 / n_samples as f64,
            n_samples,
        };

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || n_pos == 0
            || n_pos == n_samples;
        if should_stop {
            return leaf;
        }

        let Some((feature_idx, threshold)) = self.find_best_split(x, y, indices, n_pos) else {
            return leaf;
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) =
            indices.iter().partition(|&&i| x[[i, feature_idx]] <= threshold);

        TreeNode::Split {
            feature_idx,
            threshold,
            left: Box::new(self.build_tree(x, y, &left_indices, depth + 1)),
            right: Box::new(self.build_tree(x, y, &right_indices, depth + 1)),
            n_samples,
        }
    }

    /// Best `(feature, threshold)` by impurity decrease; features scanned in parallel inside a pool
    fn find_best_split(&self, x: &Array2<f64>, y: &Array1<f64>, indices: &[usize], n_pos: usize) -> Option<(usize, f64)> {
        let n = indices.len();
        let parent = self.criterion.impurity(n, n_pos);
        let min_leaf = self.min_samples_leaf;

        map_indices(x.ncols(), |feature_idx| {
            let mut sorted: Vec<(f64, bool)> =
                indices.iter().map(|&i| (x[[i, feature_idx]], y[i] == 1.0)).collect();
            sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let mut best: Option<(f64, f64)> = None;
            let mut left_pos = 0usize;
            for k in 1..n {
                if sorted[k - 1].1 {
                    left_pos += 1;
                }
                if sorted[k - 1].0 == sorted[k].0 || k < min_leaf || n - k < min_leaf {
                    continue;
                }
                let weighted = (k as f64 * self.criterion.impurity(k, left_pos)
                    + (n - k) as f64 * self.criterion.impurity(n - k, n_pos - left_pos))
                    / n as f64;
                let gain = parent - weighted;
                if gain > best.map_or(0.0, |b| b.0) {
                    best = Some((gain, (sorted[k - 1].0 + sorted[k].0) / 2.0));
                }
            }
            best.map(|(gain, threshold)| (feature_idx, threshold, gain))
        })
        .into_iter()
        .flatten()
        // Lowest feature index wins ties so fits are deterministic
        .fold(None, |acc: Option<(usize, f64, f64)>, cand| match acc {
            Some(a) if a.2 > cand.2 || (a.2 == cand.2 && a.0 < cand.0) => Some(a),
            _ => Some(cand),
        })
        .map(|(f, t, _)| (f, t))
    }

    fn predict_sample(node: &TreeNode, x: &Array2<f64>, row: usize) -> f64 {
        match node {
            TreeNode::Leaf { proba, .. } => *proba,
            TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                if x[[row, *feature_idx]] <= *threshold {
                    Self::predict_sample(left, x, row)
                } else {
                    Self::predict_sample(right, x, row)
                }
            }
        }
    }
}

impl Classifier for DecisionTreeClassifier {
    fn name(&self) -> &'static str {
        "DecisionTreeClassifier"
    }

    fn get_params(&self) -> ParamAssignment {
        let mut params = ParamAssignment::new();
        params.insert("max_depth".to_string(), ParamValue::from(self.max_depth));
        params.insert("min_samples_split".to_string(), ParamValue::from(self.min_samples_split));
        params.insert("min_samples_leaf".to_string(), ParamValue::from(self.min_samples_leaf));
        params.insert("criterion".to_string(), ParamValue::from(self.criterion.as_str()));
        params
    }

    fn set_params(&mut self, params: &ParamAssignment) -> Result<()> {
        reject_unknown(self.name(), params, PARAMS)?;
        let mut next = self.clone();
        for (name, value) in params {
            match name.as_str() {
                "max_depth" => {
                    let depth = value.to_optional_usize(name)?;
                    if depth == Some(0) {
                        return Err(MetaModelError::invalid_param(name, value, "must be >= 1 or None"));
                    }
                    next.max_depth = depth;
                }
                "min_samples_split" => {
                    let v = value.to_usize(name)?;
                    if v < 2 {
                        return Err(MetaModelError::invalid_param(name, value, "must be >= 2"));
                    }
                    next.min_samples_split = v;
                }
                "min_samples_leaf" => {
                    let v = value.to_usize(name)?;
                    if v < 1 {
                        return Err(MetaModelError::invalid_param(name, value, "must be >= 1"));
                    }
                    next.min_samples_leaf = v;
                }
                "criterion" => {
                    next.criterion = match value.to_str(name)? {
                        "gini" => Criterion::Gini,
                        "entropy" => Criterion::Entropy,
                        _ => return Err(MetaModelError::invalid_param(name, value, "expected 'gini' or 'entropy'")),
                    }
                }
                _ => unreachable!("rejected above"),
            }
        }
        *self = next;
        Ok(())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        self.n_features = x.ncols();
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(threshold(self.predict_proba(x)?))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(MetaModelError::ModelNotFitted)?;
        check_n_features(self.n_features, x)?;
        Ok((0..x.nrows()).map(|row| Self::predict_sample(root, x, row)).collect())
    }

    fn clone_unfitted(&self) -> Box<dyn Classifier> {
        Box::new(Self {
            root: None,
            n_features: 0,
            ..self.clone()
        })
    }
}
