//! Decision tree implementation

use std::cmp::Ordering;

use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::models::{check_fit_input, check_predict_input, class_labels, Estimator};
use crate::error::{PipelineError, Result};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf { value: f64, n_samples: usize },
    /// Internal node with split
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
    /// Gini impurity (classification)
    Gini,
    /// Entropy (classification)
    Entropy,
    /// Mean squared error (regression)
    Mse,
}

impl Criterion {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "gini" => Ok(Criterion::Gini),
            "entropy" | "log_loss" => Ok(Criterion::Entropy),
            "squared_error" | "mse" => Ok(Criterion::Mse),
            other => Err(PipelineError::InvalidParameter {
                name: "criterion".to_string(),
                value: other.to_string(),
                reason: "expected gini, entropy or squared_error".to_string(),
            }),
        }
    }
}

/// Running statistics of the targets on one side of a split.
#[derive(Debug, Clone)]
struct SideStats {
    count: usize,
    sum: f64,
    sq_sum: f64,
    class_counts: Vec<usize>,
}

impl SideStats {
    fn new(n_classes: usize) -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sq_sum: 0.0,
            class_counts: vec![0; n_classes],
        }
    }

    fn add(&mut self, target: f64, label: Option<usize>) {
        self.count += 1;
        self.sum += target;
        self.sq_sum += target * target;
        if let Some(label) = label {
            self.class_counts[label] += 1;
        }
    }

    fn remove(&mut self, target: f64, label: Option<usize>) {
        self.count -= 1;
        self.sum -= target;
        self.sq_sum -= target * target;
        if let Some(label) = label {
            self.class_counts[label] -= 1;
        }
    }

    fn impurity(&self, criterion: Criterion) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        match criterion {
            Criterion::Gini => {
                1.0 - self
                    .class_counts
                    .iter()
                    .map(|&c| (c as f64 / n).powi(2))
                    .sum::<f64>()
            }
            Criterion::Entropy => -self
                .class_counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.ln()
                })
                .sum::<f64>(),
            Criterion::Mse => (self.sq_sum / n - (self.sum / n).powi(2)).max(0.0),
        }
    }
}

/// Read-only inputs shared by the recursive builder
struct FitData<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    /// Class index per sample, classification only
    labels: Option<Vec<usize>>,
    n_classes: usize,
}

impl FitData<'_> {
    fn label(&self, i: usize) -> Option<usize> {
        self.labels.as_ref().map(|l| l[i])
    }

    fn stats(&self, indices: &[usize]) -> SideStats {
        let mut stats = SideStats::new(self.n_classes);
        for &i in indices {
            stats.add(self.y[i], self.label(i));
        }
        stats
    }
}

/// CART decision tree for classification or regression.
///
/// When `max_features` is smaller than the number of features, each node
/// scans a fresh random subset drawn from a generator seeded with
/// `random_state`, so fits are reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: Option<usize>,
    pub criterion: Criterion,
    pub random_state: u64,
    n_features: usize,
    is_classification: bool,
    classes: Vec<f64>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: 42,
            n_features: 0,
            is_classification: true,
            classes: Vec::new(),
        }
    }

    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            criterion: Criterion::Mse,
            is_classification: false,
            ..Self::new_classifier()
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.root.is_some()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    fn build_tree(
        &self,
        data: &FitData<'_>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let stats = data.stats(indices);
        let parent_impurity = stats.impurity(self.criterion);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.is_some_and(|d| depth >= d)
            || parent_impurity <= f64::EPSILON;

        if should_stop {
            return self.leaf(&stats, n_samples);
        }

        let features = self.candidate_features(data.x.ncols(), rng);
        let Some((feature_idx, threshold)) =
            self.find_best_split(data, indices, &features, &stats, parent_impurity)
        else {
            return self.leaf(&stats, n_samples);
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| data.x[[i, feature_idx]] <= threshold);

        let left = Box::new(self.build_tree(data, &left_indices, depth + 1, rng));
        let right = Box::new(self.build_tree(data, &right_indices, depth + 1, rng));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
        }
    }

    fn candidate_features(&self, n_features: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
        match self.max_features {
            Some(k) if k < n_features => {
                let mut picked = index::sample(rng, n_features, k.max(1)).into_vec();
                picked.sort_unstable();
                picked
            }
            _ => (0..n_features).collect(),
        }
    }

    /// Best (feature, threshold) among `features`, scanning each feature in
    /// parallel with a sorted sweep. Earlier features win exact ties.
    fn find_best_split(
        &self,
        data: &FitData<'_>,
        indices: &[usize],
        features: &[usize],
        parent: &SideStats,
        parent_impurity: f64,
    ) -> Option<(usize, f64)> {
        let n = indices.len() as f64;

        let per_feature: Vec<Option<(usize, f64, f64)>> = features
            .par_iter()
            .map(|&feature_idx| {
                let mut order: Vec<usize> = indices.to_vec();
                order.sort_by(|&a, &b| {
                    data.x[[a, feature_idx]]
                        .partial_cmp(&data.x[[b, feature_idx]])
                        .unwrap_or(Ordering::Equal)
                });

                let mut left = SideStats::new(data.n_classes);
                let mut right = parent.clone();
                let mut best: Option<(f64, f64)> = None;

                for pos in 0..order.len() - 1 {
                    let i = order[pos];
                    left.add(data.y[i], data.label(i));
                    right.remove(data.y[i], data.label(i));

                    let current = data.x[[i, feature_idx]];
                    let next = data.x[[order[pos + 1], feature_idx]];
                    if next <= current {
                        continue;
                    }
                    if left.count < self.min_samples_leaf || right.count < self.min_samples_leaf {
                        continue;
                    }

                    let weighted = (left.count as f64 * left.impurity(self.criterion)
                        + right.count as f64 * right.impurity(self.criterion))
                        / n;
                    let gain = parent_impurity - weighted;
                    if gain > 0.0 && best.map_or(true, |(g, _)| gain > g) {
                        let mut threshold = (current + next) / 2.0;
                        if threshold >= next {
                            threshold = current;
                        }
                        best = Some((gain, threshold));
                    }
                }

                best.map(|(gain, threshold)| (feature_idx, threshold, gain))
            })
            .collect();

        per_feature
            .into_iter()
            .flatten()
            .fold(None, |acc: Option<(usize, f64, f64)>, cand| match acc {
                Some(a) if a.2 >= cand.2 => Some(a),
                _ => Some(cand),
            })
            .map(|(feature, threshold, _)| (feature, threshold))
    }

    fn leaf(&self, stats: &SideStats, n_samples: usize) -> TreeNode {
        let value = if self.is_classification {
            // majority class, lowest class on ties
            let mut best = 0usize;
            for (k, &count) in stats.class_counts.iter().enumerate() {
                if count > stats.class_counts[best] {
                    best = k;
                }
            }
            self.classes.get(best).copied().unwrap_or(0.0)
        } else if stats.count > 0 {
            stats.sum / stats.count as f64
        } else {
            0.0
        };
        TreeNode::Leaf { value, n_samples }
    }

    fn predict_row(node: &TreeNode, row: ArrayView1<f64>) -> f64 {
        let mut node = node;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}

impl Estimator for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;

        let labels = if self.is_classification {
            let (classes, labels) = class_labels(y);
            self.classes = classes;
            Some(labels)
        } else {
            self.classes.clear();
            None
        };
        let data = FitData {
            x,
            y,
            labels,
            n_classes: self.classes.len(),
        };

        self.n_features = x.ncols();
        let indices: Vec<usize> = (0..x.nrows()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        self.root = Some(self.build_tree(&data, &indices, 0, &mut rng));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        check_predict_input(x, self.n_features)?;
        Ok(x.rows()
            .into_iter()
            .map(|row| Self::predict_row(root, row))
            .collect())
    }
}
