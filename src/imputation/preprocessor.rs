//! Fitted feature preprocessing bound to a column layout

use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::{KnnImputer, Transform};
use crate::error::{PipelineError, Result};
use crate::utils::columns_to_array2;

/// Serializable set of transforms the pipeline knows how to persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedTransform {
    KnnImputer(KnnImputer),
}

impl Transform for FittedTransform {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        match self {
            FittedTransform::KnnImputer(imputer) => imputer.fit(x),
        }
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        match self {
            FittedTransform::KnnImputer(imputer) => imputer.transform(x),
        }
    }
}

/// A fitted transform plus the ordered feature columns it was fitted on.
///
/// Frames handed to [`Preprocessor::transform_frame`] may carry extra
/// columns (the target, for instance); only the fitted feature columns are
/// read, in fitted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocessor {
    feature_names: Vec<String>,
    target_column: String,
    transform: FittedTransform,
}

impl Preprocessor {
    /// Fit a KNN imputer on every column of `df` except `target_column` and
    /// return it with the transformed training features.
    pub fn fit_knn(
        df: &DataFrame,
        target_column: &str,
        n_neighbors: usize,
    ) -> Result<(Self, Array2<f64>)> {
        let feature_names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .filter(|name| name != target_column)
            .collect();
        if feature_names.is_empty() {
            return Err(PipelineError::TransformFit(
                "no feature columns left after dropping the target".to_string(),
            ));
        }

        let x = columns_to_array2(df, &feature_names)?;
        let mut transform = FittedTransform::KnnImputer(KnnImputer::new(n_neighbors));
        let transformed = transform.fit_transform(&x)?;

        Ok((
            Self {
                feature_names,
                target_column: target_column.to_string(),
                transform,
            },
            transformed,
        ))
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Select the fitted feature columns from `df` and transform them.
    pub fn transform_frame(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let missing: Vec<&str> = self
            .feature_names
            .iter()
            .filter(|name| df.column(name.as_str()).is_err())
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::Structural(format!(
                "input is missing fitted feature columns {:?}",
                missing
            )));
        }
        let x = columns_to_array2(df, &self.feature_names)?;
        self.transform.transform(&x)
    }

    /// Transform an already assembled feature matrix.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.transform.transform(x)
    }
}
