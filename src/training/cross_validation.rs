//! Cross-validation splitting

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::models::class_labels;
use crate::error::{PipelineError, Result};

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CvSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Stratified k-fold without shuffling.
///
/// Every class is spread over the folds in proportion to its size. Within a
/// class, samples keep their original order and fill fold 0 first, then
/// fold 1, and so on. The same labels always produce the same folds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StratifiedKFold {
    n_splits: usize,
}

impl Default for StratifiedKFold {
    fn default() -> Self {
        Self { n_splits: 3 }
    }
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CvSplit>> {
        let n_samples = y.len();
        if self.n_splits < 2 || self.n_splits > n_samples {
            return Err(PipelineError::InvalidParameter {
                name: "cv_folds".to_string(),
                value: self.n_splits.to_string(),
                reason: format!("must be between 2 and the sample count ({})", n_samples),
            });
        }

        let (classes, labels) = class_labels(y);
        let n_classes = classes.len();

        // Deal the class-sorted labels round robin to get per-fold class counts.
        let mut sorted = labels.clone();
        sorted.sort_unstable();
        let mut allocation = vec![vec![0usize; n_classes]; self.n_splits];
        for (i, &class) in sorted.iter().enumerate() {
            allocation[i % self.n_splits][class] += 1;
        }

        let mut fold_of = vec![0usize; n_samples];
        for class in 0..n_classes {
            let members = labels.iter().enumerate().filter(|(_, &l)| l == class).map(|(i, _)| i);
            let folds = (0..self.n_splits).flat_map(|f| std::iter::repeat(f).take(allocation[f][class]));
            for (idx, fold) in members.zip(folds) {
                fold_of[idx] = fold;
            }
        }

        Ok((0..self.n_splits)
            .map(|fold_idx| {
                let (test_indices, train_indices) =
                    (0..n_samples).partition(|&i| fold_of[i] == fold_idx);
                CvSplit {
                    train_indices,
                    test_indices,
                    fold_idx,
                }
            })
            .collect())
    }
}

/// Cross-validation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Standard deviation of scores
    pub std_score: f64,
}

impl CvResults {
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len().max(1) as f64;
        let mean_score = scores.iter().sum::<f64>() / n_folds;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds;

        Self {
            scores,
            mean_score,
            std_score: variance.sqrt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_stratified_k_fold_keeps_class_balance() {
        let y = Array1::from_vec(vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        let splits = StratifiedKFold::new(5).split(&y).unwrap();

        assert_eq!(splits.len(), 5);
        for split in &splits {
            assert_eq!(split.test_indices.len(), 2);
            let positives = split.test_indices.iter().filter(|&&i| y[i] == 1.0).count();
            assert_eq!(positives, 1);
        }

        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort_unstable();
        assert_eq!(all_test, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_folds_are_contiguous_within_class() {
        let y = array![1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let splits = StratifiedKFold::new(3).split(&y).unwrap();

        // first of each class lands in fold 0
        assert_eq!(splits[0].test_indices, vec![0, 1]);
        assert_eq!(splits[1].test_indices, vec![2, 3]);
        assert_eq!(splits[2].train_indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_too_many_folds_rejected() {
        assert!(StratifiedKFold::new(4).split(&array![0.0, 1.0, 1.0]).is_err());
        assert!(StratifiedKFold::new(1).split(&array![0.0, 1.0]).is_err());
    }

    #[test]
    fn test_cv_results_mean() {
        let results = CvResults::from_scores(vec![0.5, 1.0]);
        assert!((results.mean_score - 0.75).abs() < 1e-12);
        assert!((results.std_score - 0.25).abs() < 1e-12);
    }
}
