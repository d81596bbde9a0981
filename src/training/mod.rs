//! Model training module
//!
//! Classifier families searched by the trainer stage:
//! - Random Forest and Decision Tree
//! - Logistic Regression
//! - K-Nearest Neighbors
//! - AdaBoost (SAMME stumps)
//! - Gradient Boosting
//!
//! plus the grid/cross-validation machinery that picks the winner.

mod models;
pub mod adaboost;
pub mod catalog;
pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod knn;
pub mod linear_models;
pub mod params;
pub mod random_forest;
pub mod search;

pub use adaboost::AdaBoostClassifier;
pub use catalog::{default_catalog, ModelCandidate, ModelFamily};
pub use cross_validation::{CvResults, CvSplit, StratifiedKFold};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use knn::{DistanceMetric, KnnClassifier, KnnConfig, WeightScheme};
pub use linear_models::LogisticRegression;
pub use models::{Estimator, TrainedModel};
pub use params::{describe, ParamGrid, ParamSet, ParamValue};
pub use random_forest::{MaxFeatures, RandomForest};
pub use search::{select_best, FamilyScore, ModelSearchEngine, SearchOutcome, SearchResult};
