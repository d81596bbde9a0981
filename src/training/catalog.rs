//! Model catalog: the candidate families and their hyperparameter grids

use std::fmt;

use serde::{Deserialize, Serialize};

use super::adaboost::AdaBoostClassifier;
use super::decision_tree::{Criterion, DecisionTree};
use super::gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
use super::knn::{DistanceMetric, KnnClassifier, KnnConfig, WeightScheme};
use super::linear_models::LogisticRegression;
use super::models::TrainedModel;
use super::params::{ParamGrid, ParamReader, ParamSet, ParamValue};
use super::random_forest::{MaxFeatures, RandomForest};
use crate::error::{PipelineError, Result};

/// Classifier family
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModelFamily {
    #[serde(rename = "Random Forest")]
    RandomForest,
    #[serde(rename = "Decision Tree")]
    DecisionTree,
    #[serde(rename = "Logistic Regression")]
    LogisticRegression,
    #[serde(rename = "KNN")]
    KNeighbors,
    #[serde(rename = "AdaBoost")]
    AdaBoost,
    #[serde(rename = "Gradient Boosting")]
    GradientBoosting,
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ModelFamily {
    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::RandomForest => "Random Forest",
            ModelFamily::DecisionTree => "Decision Tree",
            ModelFamily::LogisticRegression => "Logistic Regression",
            ModelFamily::KNeighbors => "KNN",
            ModelFamily::AdaBoost => "AdaBoost",
            ModelFamily::GradientBoosting => "Gradient Boosting",
        }
    }

    /// Options understood by `build` for this family
    pub fn options(&self) -> &'static [&'static str] {
        match self {
            ModelFamily::RandomForest => &[
                "n_estimators",
                "max_depth",
                "min_samples_split",
                "min_samples_leaf",
                "max_features",
                "criterion",
                "bootstrap",
            ],
            ModelFamily::DecisionTree => &[
                "criterion",
                "max_depth",
                "min_samples_split",
                "min_samples_leaf",
                "max_features",
            ],
            ModelFamily::LogisticRegression => &["C", "max_iter", "learning_rate", "tol"],
            ModelFamily::KNeighbors => &["n_neighbors", "weights", "metric"],
            ModelFamily::AdaBoost => &["n_estimators", "learning_rate"],
            ModelFamily::GradientBoosting => &[
                "n_estimators",
                "learning_rate",
                "subsample",
                "max_depth",
                "min_samples_leaf",
                "colsample_bytree",
            ],
        }
    }

    /// Unfitted estimator for one parameter set. Options missing from `params`
    /// take the family defaults; stochastic families are seeded with
    /// `random_state`.
    pub fn build(&self, params: &ParamSet, random_state: u64) -> Result<TrainedModel> {
        let p = ParamReader::new(params, self.options())?;
        let criteria = ["gini", "entropy", "log_loss"];

        let model = match self {
            ModelFamily::RandomForest => TrainedModel::RandomForest(
                RandomForest::new(p.usize_or("n_estimators", 100)?)
                    .with_max_depth(p.opt_usize("max_depth")?)
                    .with_min_samples_split(p.usize_or("min_samples_split", 2)?)
                    .with_min_samples_leaf(p.usize_or("min_samples_leaf", 1)?)
                    .with_max_features(max_features(p.get("max_features"), MaxFeatures::Sqrt)?)
                    .with_criterion(Criterion::from_name(p.str_or("criterion", "gini", &criteria)?)?)
                    .with_bootstrap(p.bool_or("bootstrap", true)?)
                    .with_random_state(random_state),
            ),
            ModelFamily::DecisionTree => TrainedModel::DecisionTree(
                DecisionTree::new_classifier()
                    .with_criterion(Criterion::from_name(p.str_or("criterion", "gini", &criteria)?)?)
                    .with_max_depth(p.opt_usize("max_depth")?)
                    .with_min_samples_split(p.usize_or("min_samples_split", 2)?)
                    .with_min_samples_leaf(p.usize_or("min_samples_leaf", 1)?)
                    .with_max_features(p.opt_usize("max_features")?)
                    .with_random_state(random_state),
            ),
            ModelFamily::LogisticRegression => TrainedModel::LogisticRegression(
                LogisticRegression::new()
                    .with_c(p.f64_or("C", 1.0)?)
                    .with_max_iter(p.usize_or("max_iter", 1000)?)
                    .with_learning_rate(p.f64_or("learning_rate", 0.1)?)
                    .with_tol(p.f64_or("tol", 1e-6)?),
            ),
            ModelFamily::KNeighbors => {
                let weights = match p.str_or("weights", "uniform", &["uniform", "distance"])? {
                    "distance" => WeightScheme::Distance,
                    _ => WeightScheme::Uniform,
                };
                let metric = match p.str_or("metric", "euclidean", &["euclidean", "manhattan"])? {
                    "manhattan" => DistanceMetric::Manhattan,
                    _ => DistanceMetric::Euclidean,
                };
                TrainedModel::Knn(KnnClassifier::new(KnnConfig {
                    n_neighbors: p.usize_or("n_neighbors", 5)?,
                    metric,
                    weights,
                }))
            }
            ModelFamily::AdaBoost => TrainedModel::AdaBoost(AdaBoostClassifier::new(
                p.usize_or("n_estimators", 50)?,
                p.f64_or("learning_rate", 1.0)?,
            )),
            ModelFamily::GradientBoosting => {
                let defaults = GradientBoostingConfig::default();
                TrainedModel::GradientBoosting(GradientBoostingClassifier::new(
                    GradientBoostingConfig {
                        n_estimators: p.usize_or("n_estimators", defaults.n_estimators)?,
                        learning_rate: p.f64_or("learning_rate", defaults.learning_rate)?,
                        max_depth: p.usize_or("max_depth", defaults.max_depth)?,
                        min_samples_leaf: p.usize_or("min_samples_leaf", defaults.min_samples_leaf)?,
                        subsample: p.f64_or("subsample", defaults.subsample)?,
                        colsample_bytree: p.f64_or("colsample_bytree", defaults.colsample_bytree)?,
                        random_state,
                    },
                ))
            }
        };
        Ok(model)
    }
}

fn max_features(value: Option<&ParamValue>, default: MaxFeatures) -> Result<MaxFeatures> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value {
        ParamValue::Str(s) => match s.as_str() {
            "sqrt" => Ok(MaxFeatures::Sqrt),
            "log2" => Ok(MaxFeatures::Log2),
            "all" | "none" => Ok(MaxFeatures::All),
            _ => Err(invalid_max_features(value)),
        },
        ParamValue::Int(n) if *n > 0 => Ok(MaxFeatures::Fixed(*n as usize)),
        ParamValue::Float(f) if *f > 0.0 && *f <= 1.0 => Ok(MaxFeatures::Fraction(*f)),
        _ => Err(invalid_max_features(value)),
    }
}

fn invalid_max_features(value: &ParamValue) -> PipelineError {
    PipelineError::InvalidParameter {
        name: "max_features".to_string(),
        value: value.to_string(),
        reason: "expected sqrt, log2, all, a positive count or a fraction".to_string(),
    }
}

/// One family and the grid searched for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCandidate {
    pub family: ModelFamily,
    #[serde(default)]
    pub grid: ParamGrid,
}

impl ModelCandidate {
    pub fn new(family: ModelFamily, grid: ParamGrid) -> Self {
        Self { family, grid }
    }
}

/// The six default families in tie-break order.
pub fn default_catalog() -> Vec<ModelCandidate> {
    vec![
        ModelCandidate::new(
            ModelFamily::RandomForest,
            ParamGrid::new().with("n_estimators", vec![8i64, 16, 32, 64]),
        ),
        ModelCandidate::new(
            ModelFamily::DecisionTree,
            ParamGrid::new().with("criterion", vec!["gini", "entropy"]),
        ),
        ModelCandidate::new(ModelFamily::LogisticRegression, ParamGrid::new()),
        ModelCandidate::new(ModelFamily::KNeighbors, ParamGrid::new()),
        ModelCandidate::new(
            ModelFamily::AdaBoost,
            ParamGrid::new()
                .with("learning_rate", vec![0.1, 0.01, 0.001])
                .with("n_estimators", vec![8i64, 16, 32, 64]),
        ),
        ModelCandidate::new(
            ModelFamily::GradientBoosting,
            ParamGrid::new()
                .with("learning_rate", vec![0.1, 0.01, 0.05])
                .with("subsample", vec![0.6, 0.75, 0.9])
                .with("n_estimators", vec![8i64, 16, 32, 64]),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_order() {
        let families: Vec<ModelFamily> = default_catalog().iter().map(|c| c.family).collect();
        assert_eq!(
            families,
            vec![
                ModelFamily::RandomForest,
                ModelFamily::DecisionTree,
                ModelFamily::LogisticRegression,
                ModelFamily::KNeighbors,
                ModelFamily::AdaBoost,
                ModelFamily::GradientBoosting,
            ]
        );
    }

    #[test]
    fn test_every_default_config_builds() {
        for candidate in default_catalog() {
            for params in candidate.grid.expand().unwrap() {
                let model = candidate.family.build(&params, 42).unwrap();
                assert_eq!(model.family(), candidate.family);
            }
        }
    }

    #[test]
    fn test_unknown_option_rejected() {
        let params: ParamSet = [("depth".to_string(), ParamValue::Int(3))].into_iter().collect();
        assert!(matches!(
            ModelFamily::DecisionTree.build(&params, 42),
            Err(PipelineError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_family_names_round_trip_through_yaml() {
        let yaml = serde_yaml::to_string(&ModelFamily::KNeighbors).unwrap();
        assert_eq!(yaml.trim(), "KNN");
        let back: ModelFamily = serde_yaml::from_str("Gradient Boosting").unwrap();
        assert_eq!(back, ModelFamily::GradientBoosting);
    }
}
