//! AdaBoost (Adaptive Boosting) implementation
//!
//! AdaBoost builds an ensemble of weak learners (decision stumps), weighting
//! misclassified samples more heavily in subsequent rounds.

use std::cmp::Ordering;

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use super::models::{check_fit_input, check_predict_input, class_labels, Estimator};
use crate::error::{PipelineError, Result};

/// A single decision stump: splits on one feature at one threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stump {
    feature_index: usize,
    threshold: f64,
    /// Class index when feature <= threshold
    left: usize,
    /// Class index when feature > threshold
    right: usize,
}

impl Stump {
    fn predict_row(&self, row: ArrayView1<f64>) -> usize {
        if row[self.feature_index] <= self.threshold {
            self.left
        } else {
            self.right
        }
    }
}

/// AdaBoost Classifier (SAMME variant, supports multi-class)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaBoostClassifier {
    pub n_estimators: usize,
    pub learning_rate: f64,
    stumps: Vec<Stump>,
    alphas: Vec<f64>,
    classes: Vec<f64>,
    n_features: usize,
}

impl Default for AdaBoostClassifier {
    fn default() -> Self {
        Self::new(50, 1.0)
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0usize;
    for (k, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = k;
        }
    }
    best
}

impl AdaBoostClassifier {
    pub fn new(n_estimators: usize, learning_rate: f64) -> Self {
        Self {
            n_estimators: n_estimators.max(1),
            learning_rate,
            stumps: Vec::new(),
            alphas: Vec::new(),
            classes: Vec::new(),
            n_features: 0,
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn n_stumps(&self) -> usize {
        self.stumps.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Stump with the lowest weighted error, found by sweeping each feature
    /// in sorted order. Each side predicts its heaviest class.
    fn fit_stump(
        x: &Array2<f64>,
        labels: &[usize],
        weights: &[f64],
        n_classes: usize,
        sorted: &[Vec<usize>],
    ) -> (Stump, f64) {
        let mut totals = vec![0.0; n_classes];
        for (&label, &w) in labels.iter().zip(weights) {
            totals[label] += w;
        }
        let total: f64 = totals.iter().sum();

        let majority = argmax(&totals);
        let mut best = Stump {
            feature_index: 0,
            threshold: f64::INFINITY,
            left: majority,
            right: majority,
        };
        let mut best_error = total - totals[majority];

        for (feature, order) in sorted.iter().enumerate() {
            let mut left = vec![0.0; n_classes];
            for pos in 0..order.len().saturating_sub(1) {
                let i = order[pos];
                left[labels[i]] += weights[i];

                let current = x[[i, feature]];
                let next = x[[order[pos + 1], feature]];
                if next <= current {
                    continue;
                }

                let right: Vec<f64> = totals.iter().zip(&left).map(|(t, l)| t - l).collect();
                let (l, r) = (argmax(&left), argmax(&right));
                let error = total - left[l] - right[r];
                if error < best_error - 1e-12 {
                    best_error = error;
                    best = Stump {
                        feature_index: feature,
                        threshold: (current + next) / 2.0,
                        left: l,
                        right: r,
                    };
                }
            }
        }

        (best, best_error / total.max(f64::MIN_POSITIVE))
    }
}

impl Estimator for AdaBoostClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        if self.learning_rate <= 0.0 {
            return Err(PipelineError::InvalidParameter {
                name: "learning_rate".to_string(),
                value: self.learning_rate.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let n_samples = x.nrows();
        let (classes, labels) = class_labels(y);
        let n_classes = classes.len();

        let sorted: Vec<Vec<usize>> = (0..x.ncols())
            .map(|f| {
                let mut order: Vec<usize> = (0..n_samples).collect();
                order.sort_by(|&a, &b| x[[a, f]].partial_cmp(&x[[b, f]]).unwrap_or(Ordering::Equal));
                order
            })
            .collect();

        let mut weights = vec![1.0 / n_samples as f64; n_samples];
        self.stumps.clear();
        self.alphas.clear();

        for _round in 0..self.n_estimators {
            let (stump, error) = Self::fit_stump(x, &labels, &weights, n_classes, &sorted);

            if error <= 0.0 || n_classes < 2 {
                // perfect fit, nothing left to boost
                self.stumps.push(stump);
                self.alphas.push(1.0);
                break;
            }
            if error >= 1.0 - 1.0 / n_classes as f64 {
                // no better than chance
                if self.stumps.is_empty() {
                    self.stumps.push(stump);
                    self.alphas.push(1.0);
                }
                break;
            }

            let alpha = self.learning_rate
                * (((1.0 - error) / error).ln() + ((n_classes - 1) as f64).ln());

            for (i, row) in x.rows().into_iter().enumerate() {
                if stump.predict_row(row) != labels[i] {
                    weights[i] *= alpha.exp();
                }
            }
            let w_sum: f64 = weights.iter().sum();
            if w_sum > 0.0 {
                weights.iter_mut().for_each(|w| *w /= w_sum);
            }

            self.stumps.push(stump);
            self.alphas.push(alpha);
        }

        self.classes = classes;
        self.n_features = x.ncols();
        Ok(())
    }

    /// Alpha-weighted vote; ties go to the lowest class.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.stumps.is_empty() {
            return Err(PipelineError::ModelNotFitted);
        }
        check_predict_input(x, self.n_features)?;

        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let mut scores = vec![0.0; self.classes.len()];
                for (stump, &alpha) in self.stumps.iter().zip(&self.alphas) {
                    scores[stump.predict_row(row)] += alpha;
                }
                self.classes[argmax(&scores)]
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_adaboost_single_split() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut model = AdaBoostClassifier::new(10, 1.0);
        model.fit(&x, &y).unwrap();

        // separable by one stump, boosting stops early
        assert_eq!(model.n_stumps(), 1);
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_adaboost_combines_stumps() {
        // positive only in the middle band, needs more than one stump
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0], [9.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0];

        let mut model = AdaBoostClassifier::new(30, 1.0);
        model.fit(&x, &y).unwrap();

        assert!(model.n_stumps() > 1);
        let accuracy = model
            .predict(&x)
            .unwrap()
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| p == t)
            .count();
        assert!(accuracy >= 8);
    }

    #[test]
    fn test_unfitted() {
        let model = AdaBoostClassifier::default();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(PipelineError::ModelNotFitted)
        ));
    }
}
