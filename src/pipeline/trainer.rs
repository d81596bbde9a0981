//! Model trainer stage
//!
//! Runs the catalog search over the transformed matrices, scores the winner
//! on both splits and persists it together with the fitted preprocessor.

use tracing::info;

use super::artifacts::{TrainerArtifact, TransformationArtifact};
use super::transformation::split_target;
use crate::artifact::ArtifactStore;
use crate::config::ModelTrainerConfig;
use crate::error::Result;
use crate::imputation::Preprocessor;
use crate::inference::ModelBundle;
use crate::metrics::score;
use crate::training::{Estimator, ModelSearchEngine};

pub struct ModelTrainer<'a> {
    config: &'a ModelTrainerConfig,
    store: &'a ArtifactStore,
}

impl<'a> ModelTrainer<'a> {
    pub fn new(config: &'a ModelTrainerConfig, store: &'a ArtifactStore) -> Self {
        Self { config, store }
    }

    pub fn initiate(&self, transformed: &TransformationArtifact) -> Result<TrainerArtifact> {
        info!(
            families = self.config.catalog.len(),
            cv_folds = self.config.cv_folds,
            "Starting model training"
        );

        let (x_train, y_train) =
            split_target(&self.store.load_array(&transformed.transformed_train_path)?)?;
        let (x_test, y_test) =
            split_target(&self.store.load_array(&transformed.transformed_test_path)?)?;

        let engine = ModelSearchEngine::new(self.config.catalog.clone())
            .with_cv_folds(self.config.cv_folds)
            .with_random_state(self.config.random_state);
        let outcome = engine.search(&x_train, &y_train, &x_test, &y_test)?;

        let train_metrics = score(&y_train, &outcome.best_model.predict(&x_train)?)?;
        let test_metrics = score(&y_test, &outcome.best_model.predict(&x_test)?)?;

        let preprocessor: Preprocessor = self.store.load_object(&transformed.transform_obj_path)?;
        let bundle = ModelBundle::new(preprocessor, outcome.best_model)?;
        self.store
            .save_object(&bundle, &self.config.trained_model_path)?;
        self.store
            .save_report(&outcome.result, &self.config.search_report_path)?;

        info!(
            family = %outcome.best_family,
            train_f1 = train_metrics.f1_score,
            test_f1 = test_metrics.f1_score,
            model = %self.config.trained_model_path.display(),
            "Model training completed"
        );
        Ok(TrainerArtifact {
            model_path: self.config.trained_model_path.clone(),
            search_report_path: self.config.search_report_path.clone(),
            best_family: outcome.best_family,
            train_metric_artifact: train_metrics,
            test_metric_artifact: test_metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{ModelCandidate, ModelFamily, ParamGrid, SearchResult};
    use polars::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn test_trainer_persists_bundle_and_report() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new();

        // one informative feature, one constant
        let n = 30;
        let a: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let b = vec![1.0f64; n];
        let y: Vec<i64> = (0..n).map(|i| if i < 15 { 0 } else { 1 }).collect();
        let frame = df! { "a" => a, "b" => b, "Result" => y.clone() }.unwrap();
        let (pre, x) = Preprocessor::fit_knn(&frame, "Result", 3).unwrap();
        let target = ndarray::Array1::from_iter(y.iter().map(|&v| v as f64));
        let matrix = crate::pipeline::attach_target(&x, &target).unwrap();

        let transformed = TransformationArtifact {
            transformed_train_path: dir.path().join("train.bin"),
            transformed_test_path: dir.path().join("test.bin"),
            transform_obj_path: dir.path().join("preprocessor.bin"),
        };
        store.save_array(&matrix, &transformed.transformed_train_path).unwrap();
        store.save_array(&matrix, &transformed.transformed_test_path).unwrap();
        store.save_object(&pre, &transformed.transform_obj_path).unwrap();

        let config = ModelTrainerConfig {
            trainer_dir: dir.path().join("mt"),
            trained_model_path: dir.path().join("mt/trained_model/model.bin"),
            search_report_path: dir.path().join("mt/search_report.yaml"),
            cv_folds: 3,
            random_state: 42,
            catalog: vec![
                ModelCandidate::new(ModelFamily::DecisionTree, ParamGrid::new()),
                ModelCandidate::new(ModelFamily::LogisticRegression, ParamGrid::new()),
            ],
        };
        let artifact = ModelTrainer::new(&config, &store).initiate(&transformed).unwrap();
        artifact.verify().unwrap();
        assert_eq!(artifact.best_family, ModelFamily::DecisionTree);
        assert_eq!(artifact.test_metric_artifact.f1_score, 1.0);

        let report: SearchResult = store.load_report(&artifact.search_report_path).unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(
            report.get(ModelFamily::DecisionTree).map(|s| s.test_f1),
            Some(artifact.test_metric_artifact.f1_score)
        );

        let bundle: ModelBundle = store.load_object(&artifact.model_path).unwrap();
        assert_eq!(bundle.preprocessor().n_features(), 2);
    }
}
