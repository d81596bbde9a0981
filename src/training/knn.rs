//! K-Nearest Neighbors classifier

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::models::{check_fit_input, check_predict_input, class_labels, Estimator};
use crate::error::{PipelineError, Result};

/// Distance metric for KNN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean distance (L2)
    #[default]
    Euclidean,
    /// Manhattan distance (L1)
    Manhattan,
}

/// Weighting scheme for neighbors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeightScheme {
    /// All neighbors have equal weight
    #[default]
    Uniform,
    /// Closer neighbors have more weight (inverse distance)
    Distance,
}

/// KNN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnConfig {
    pub n_neighbors: usize,
    pub metric: DistanceMetric,
    pub weights: WeightScheme,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            metric: DistanceMetric::Euclidean,
            weights: WeightScheme::Uniform,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Neighbor(f64, usize);

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

/// K-Nearest Neighbors Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnClassifier {
    config: KnnConfig,
    x_train: Option<Array2<f64>>,
    /// Class index of every training row
    labels: Vec<usize>,
    classes: Vec<f64>,
}

impl Default for KnnClassifier {
    fn default() -> Self {
        Self::new(KnnConfig::default())
    }
}

impl KnnClassifier {
    pub fn new(config: KnnConfig) -> Self {
        Self {
            config,
            x_train: None,
            labels: Vec::new(),
            classes: Vec::new(),
        }
    }

    /// Create with default config and specified k
    pub fn with_k(k: usize) -> Self {
        Self::new(KnnConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &KnnConfig {
        &self.config
    }

    pub fn n_features(&self) -> usize {
        self.x_train.as_ref().map_or(0, |x| x.ncols())
    }

    fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self.config.metric {
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>()
                .sqrt(),
            DistanceMetric::Manhattan => a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum(),
        }
    }

    /// k nearest training rows, ties broken by lower row index
    fn find_k_nearest(&self, x_train: &Array2<f64>, sample: ArrayView1<f64>) -> Vec<Neighbor> {
        let k = self.config.n_neighbors.min(x_train.nrows());
        let mut heap: BinaryHeap<Neighbor> = BinaryHeap::with_capacity(k + 1);

        for (i, row) in x_train.rows().into_iter().enumerate() {
            let candidate = Neighbor(self.distance(sample, row), i);
            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(worst) = heap.peek() {
                if candidate < *worst {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }
        heap.into_vec()
    }

    fn vote(&self, neighbors: &[Neighbor]) -> f64 {
        let mut scores = vec![0.0f64; self.classes.len()];
        let exact: Vec<&Neighbor> = neighbors.iter().filter(|n| n.0 == 0.0).collect();

        match self.config.weights {
            WeightScheme::Distance if !exact.is_empty() => {
                // exact matches dominate inverse-distance weighting
                for n in exact {
                    scores[self.labels[n.1]] += 1.0;
                }
            }
            WeightScheme::Distance => {
                for n in neighbors {
                    scores[self.labels[n.1]] += 1.0 / n.0;
                }
            }
            WeightScheme::Uniform => {
                for n in neighbors {
                    scores[self.labels[n.1]] += 1.0;
                }
            }
        }

        let mut best = 0usize;
        for (k, &score) in scores.iter().enumerate() {
            if score > scores[best] {
                best = k;
            }
        }
        self.classes[best]
    }
}

impl Estimator for KnnClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        if self.config.n_neighbors == 0 {
            return Err(PipelineError::InvalidParameter {
                name: "n_neighbors".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let (classes, labels) = class_labels(y);
        self.x_train = Some(x.clone());
        self.labels = labels;
        self.classes = classes;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let x_train = self.x_train.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        check_predict_input(x, x_train.ncols())?;

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let neighbors = self.find_k_nearest(x_train, x.row(i));
                self.vote(&neighbors)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_knn_classifier() {
        let x = array![[0.0, 0.0], [0.1, 0.1], [0.2, 0.0], [5.0, 5.0], [5.1, 5.0], [5.0, 5.2]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut knn = KnnClassifier::with_k(3);
        knn.fit(&x, &y).unwrap();

        let pred = knn.predict(&array![[0.05, 0.05], [4.9, 5.1]]).unwrap();
        assert_eq!(pred, array![0.0, 1.0]);
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let x = array![[0.0], [1.0]];
        let y = array![1.0, 0.0];

        let mut knn = KnnClassifier::default();
        knn.fit(&x, &y).unwrap();
        // one vote each, tie goes to the lowest class
        assert_eq!(knn.predict(&array![[0.4]]).unwrap()[0], 0.0);
    }

    #[test]
    fn test_distance_weights_prefer_exact_match() {
        let x = array![[0.0], [1.0], [1.1]];
        let y = array![0.0, 1.0, 1.0];

        let mut knn = KnnClassifier::new(KnnConfig {
            n_neighbors: 3,
            metric: DistanceMetric::Manhattan,
            weights: WeightScheme::Distance,
        });
        knn.fit(&x, &y).unwrap();
        assert_eq!(knn.predict(&array![[0.0]]).unwrap()[0], 0.0);
    }

    #[test]
    fn test_unfitted() {
        let knn = KnnClassifier::default();
        assert!(matches!(
            knn.predict(&array![[0.0]]),
            Err(PipelineError::ModelNotFitted)
        ));
    }
}
