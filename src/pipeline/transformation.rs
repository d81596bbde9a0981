//! Data transformation stage
//!
//! Splits the target off, fits the KNN imputer on training features only and
//! writes `[features | target]` matrices plus the fitted preprocessor.

use ndarray::{concatenate, Array1, Array2, Axis};
use polars::prelude::*;
use tracing::info;

use super::artifacts::{TransformationArtifact, ValidationArtifact};
use crate::artifact::ArtifactStore;
use crate::config::DataTransformationConfig;
use crate::error::{PipelineError, Result};
use crate::imputation::Preprocessor;
use crate::utils::column_values;

/// Target values with `-1` mapped to `0`. Missing labels are rejected.
pub fn encode_target(df: &DataFrame, target_column: &str) -> Result<Array1<f64>> {
    if df.column(target_column).is_err() {
        return Err(PipelineError::Structural(format!(
            "target column '{}' is missing",
            target_column
        )));
    }
    let values = column_values(df, target_column)?;
    if values.iter().any(|v| v.is_nan()) {
        return Err(PipelineError::Data(format!(
            "target column '{}' has missing values",
            target_column
        )));
    }
    Ok(values
        .into_iter()
        .map(|v| if v == -1.0 { 0.0 } else { v })
        .collect())
}

/// Append the target as the last column.
pub fn attach_target(features: &Array2<f64>, target: &Array1<f64>) -> Result<Array2<f64>> {
    let target = target.view().insert_axis(Axis(1));
    Ok(concatenate(Axis(1), &[features.view(), target])?)
}

/// Split a `[features | target]` matrix back into its parts.
pub fn split_target(matrix: &Array2<f64>) -> Result<(Array2<f64>, Array1<f64>)> {
    let n_cols = matrix.ncols();
    if n_cols < 2 {
        return Err(PipelineError::Shape {
            expected: "at least one feature column plus the target".to_string(),
            actual: format!("{} columns", n_cols),
        });
    }
    let features = matrix.slice(ndarray::s![.., ..n_cols - 1]).to_owned();
    let target = matrix.column(n_cols - 1).to_owned();
    Ok((features, target))
}

pub struct DataTransformation<'a> {
    config: &'a DataTransformationConfig,
    store: &'a ArtifactStore,
}

impl<'a> DataTransformation<'a> {
    pub fn new(config: &'a DataTransformationConfig, store: &'a ArtifactStore) -> Self {
        Self { config, store }
    }

    pub fn initiate(&self, validated: &ValidationArtifact) -> Result<TransformationArtifact> {
        info!(
            target = %self.config.target_column,
            neighbors = self.config.imputer_neighbors,
            "Starting data transformation"
        );

        let train = self.store.load_table(&validated.valid_train_path)?;
        let test = self.store.load_table(&validated.valid_test_path)?;

        let target = &self.config.target_column;
        let y_train = encode_target(&train, target)?;
        let y_test = encode_target(&test, target)?;

        let (preprocessor, x_train) =
            Preprocessor::fit_knn(&train, target, self.config.imputer_neighbors)?;
        let x_test = preprocessor.transform_frame(&test)?;

        let train_matrix = attach_target(&x_train, &y_train)?;
        let test_matrix = attach_target(&x_test, &y_test)?;

        self.store
            .save_array(&train_matrix, &self.config.transformed_train_path)?;
        self.store
            .save_array(&test_matrix, &self.config.transformed_test_path)?;
        self.store
            .save_object(&preprocessor, &self.config.transform_obj_path)?;

        info!(
            features = preprocessor.n_features(),
            train_rows = train_matrix.nrows(),
            test_rows = test_matrix.nrows(),
            "Data transformation completed"
        );
        Ok(TransformationArtifact {
            transformed_train_path: self.config.transformed_train_path.clone(),
            transformed_test_path: self.config.transformed_test_path.clone(),
            transform_obj_path: self.config.transform_obj_path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::tempdir;

    #[test]
    fn test_encode_target_remaps_negative_class() {
        let df = df! { "Result" => [-1i64, 1, 1, -1] }.unwrap();
        assert_eq!(encode_target(&df, "Result").unwrap(), array![0.0, 1.0, 1.0, 0.0]);
        assert!(matches!(
            encode_target(&df, "label"),
            Err(PipelineError::Structural(_))
        ));
    }

    #[test]
    fn test_attach_and_split_target() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let y = array![0.0, 1.0];
        let m = attach_target(&x, &y).unwrap();
        assert_eq!(m, array![[1.0, 2.0, 0.0], [3.0, 4.0, 1.0]]);

        let (x2, y2) = split_target(&m).unwrap();
        assert_eq!(x2, x);
        assert_eq!(y2, y);
        assert!(split_target(&array![[1.0], [2.0]]).is_err());
    }

    #[test]
    fn test_stage_imputes_test_with_train_fit() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new();
        let train = df! {
            "a" => [Some(1.0f64), Some(2.0), Some(3.0), Some(4.0)],
            "b" => [Some(1.0f64), Some(1.0), Some(-1.0), Some(-1.0)],
            "Result" => [1i64, 1, -1, -1],
        }
        .unwrap();
        let test = df! {
            "a" => [None, Some(1.5f64)],
            "b" => [Some(1.0f64), Some(1.0)],
            "Result" => [-1i64, 1],
        }
        .unwrap();

        let validated = ValidationArtifact {
            status: true,
            valid_train_path: dir.path().join("train.csv"),
            valid_test_path: dir.path().join("test.csv"),
            drift_report_path: dir.path().join("report.yaml"),
            drift_detected: false,
        };
        store.save_table(&mut train.clone(), &validated.valid_train_path).unwrap();
        store.save_table(&mut test.clone(), &validated.valid_test_path).unwrap();

        let config = DataTransformationConfig {
            transformation_dir: dir.path().join("t"),
            transformed_train_path: dir.path().join("t/transformed/train.bin"),
            transformed_test_path: dir.path().join("t/transformed/test.bin"),
            transform_obj_path: dir.path().join("t/transformed_object/preprocessor.bin"),
            target_column: "Result".to_string(),
            imputer_neighbors: 2,
        };
        let artifact = DataTransformation::new(&config, &store)
            .initiate(&validated)
            .unwrap();
        artifact.verify().unwrap();

        let test_matrix = store.load_array(&artifact.transformed_test_path).unwrap();
        assert_eq!(test_matrix.dim(), (2, 3));
        // nearest donors on `b` are rows 0 and 1 of train
        assert!((test_matrix[[0, 0]] - 1.5).abs() < 1e-12);
        assert_eq!(test_matrix.column(2).to_vec(), vec![0.0, 1.0]);

        let pre: Preprocessor = store.load_object(&artifact.transform_obj_path).unwrap();
        assert_eq!(pre.feature_names(), &["a".to_string(), "b".to_string()]);
    }
}
