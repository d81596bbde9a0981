//! Estimator trait and the fitted-model wrapper shared by every family

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::adaboost::AdaBoostClassifier;
use super::catalog::ModelFamily;
use super::decision_tree::DecisionTree;
use super::gradient_boosting::GradientBoostingClassifier;
use super::knn::KnnClassifier;
use super::linear_models::LogisticRegression;
use super::random_forest::RandomForest;
use crate::error::{PipelineError, Result};

/// A classifier that learns from a feature matrix and a label vector
pub trait Estimator: Send + Sync {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

pub(crate) fn check_fit_input(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(PipelineError::Shape {
            expected: format!("{} labels", x.nrows()),
            actual: format!("{} labels", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(PipelineError::Data("cannot fit on zero rows".to_string()));
    }
    Ok(())
}

pub(crate) fn check_predict_input(x: &Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(PipelineError::Shape {
            expected: format!("{} features", n_features),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

/// Sorted distinct labels and the class index of every sample.
pub(crate) fn class_labels(y: &Array1<f64>) -> (Vec<f64>, Vec<usize>) {
    let mut index: BTreeMap<u64, usize> = BTreeMap::new();
    let mut classes: Vec<f64> = y.iter().copied().collect();
    classes.sort_by(|a, b| a.total_cmp(b));
    classes.dedup();
    for (k, c) in classes.iter().enumerate() {
        index.insert(c.to_bits(), k);
    }
    let labels = y
        .iter()
        .map(|v| index.get(&v.to_bits()).copied().unwrap_or(0))
        .collect();
    (classes, labels)
}

/// A fitted (or ready-to-fit) model of one of the catalog families
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    RandomForest(RandomForest),
    DecisionTree(DecisionTree),
    LogisticRegression(LogisticRegression),
    Knn(KnnClassifier),
    AdaBoost(AdaBoostClassifier),
    GradientBoosting(GradientBoostingClassifier),
}

impl TrainedModel {
    pub fn family(&self) -> ModelFamily {
        match self {
            TrainedModel::RandomForest(_) => ModelFamily::RandomForest,
            TrainedModel::DecisionTree(_) => ModelFamily::DecisionTree,
            TrainedModel::LogisticRegression(_) => ModelFamily::LogisticRegression,
            TrainedModel::Knn(_) => ModelFamily::KNeighbors,
            TrainedModel::AdaBoost(_) => ModelFamily::AdaBoost,
            TrainedModel::GradientBoosting(_) => ModelFamily::GradientBoosting,
        }
    }

    /// Width of the matrix the model was fitted on; 0 before fitting.
    pub fn n_features(&self) -> usize {
        match self {
            TrainedModel::RandomForest(m) => m.n_features(),
            TrainedModel::DecisionTree(m) => m.n_features(),
            TrainedModel::LogisticRegression(m) => m.n_features(),
            TrainedModel::Knn(m) => m.n_features(),
            TrainedModel::AdaBoost(m) => m.n_features(),
            TrainedModel::GradientBoosting(m) => m.n_features(),
        }
    }

    fn inner(&self) -> &dyn Estimator {
        match self {
            TrainedModel::RandomForest(m) => m,
            TrainedModel::DecisionTree(m) => m,
            TrainedModel::LogisticRegression(m) => m,
            TrainedModel::Knn(m) => m,
            TrainedModel::AdaBoost(m) => m,
            TrainedModel::GradientBoosting(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Estimator {
        match self {
            TrainedModel::RandomForest(m) => m,
            TrainedModel::DecisionTree(m) => m,
            TrainedModel::LogisticRegression(m) => m,
            TrainedModel::Knn(m) => m,
            TrainedModel::AdaBoost(m) => m,
            TrainedModel::GradientBoosting(m) => m,
        }
    }
}

impl Estimator for TrainedModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_class_labels_sorted() {
        let (classes, labels) = class_labels(&array![1.0, -1.0, 1.0, 0.0]);
        assert_eq!(classes, vec![-1.0, 0.0, 1.0]);
        assert_eq!(labels, vec![2, 0, 2, 1]);
    }

    #[test]
    fn test_fit_input_checks() {
        let x = Array2::<f64>::zeros((3, 2));
        assert!(matches!(
            check_fit_input(&x, &array![0.0, 1.0]),
            Err(PipelineError::Shape { .. })
        ));
        assert!(matches!(
            check_fit_input(&Array2::zeros((0, 2)), &Array1::zeros(0)),
            Err(PipelineError::Data(_))
        ));
        assert!(check_predict_input(&x, 3).is_err());
    }

    #[test]
    fn test_trained_model_dispatch() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut model = TrainedModel::DecisionTree(DecisionTree::new_classifier());
        model.fit(&x, &y).unwrap();
        assert_eq!(model.family(), ModelFamily::DecisionTree);
        assert_eq!(model.predict(&x).unwrap(), y);
    }
}
