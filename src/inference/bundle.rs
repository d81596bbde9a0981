//! Preprocessor and model persisted as one object

use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::imputation::Preprocessor;
use crate::training::{Estimator, ModelFamily, TrainedModel};

/// A fitted preprocessor and the model trained on its output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    preprocessor: Preprocessor,
    model: TrainedModel,
}

impl ModelBundle {
    /// Pair a preprocessor with a model. The model must have been fitted on
    /// exactly the preprocessor's feature columns.
    pub fn new(preprocessor: Preprocessor, model: TrainedModel) -> Result<Self> {
        if preprocessor.n_features() != model.n_features() {
            return Err(PipelineError::Shape {
                expected: format!("model over {} features", preprocessor.n_features()),
                actual: format!("model over {} features", model.n_features()),
            });
        }
        Ok(Self {
            preprocessor,
            model,
        })
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn family(&self) -> ModelFamily {
        self.model.family()
    }

    /// Transform the frame's feature columns, then predict.
    pub fn predict(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let x = self.preprocessor.transform_frame(df)?;
        self.model.predict(&x)
    }

    pub fn into_parts(self) -> (Preprocessor, TrainedModel) {
        (self.preprocessor, self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::DecisionTree;
    use ndarray::array;

    fn frame() -> DataFrame {
        df! {
            "a" => [Some(-1.0f64), Some(-2.0), None, Some(2.0), Some(1.0)],
            "b" => [0.0f64, 0.0, 1.0, 1.0, 1.0],
            "Result" => [0i64, 0, 1, 1, 1],
        }
        .unwrap()
    }

    #[test]
    fn test_bundle_predicts_from_frame() {
        let df = frame();
        let (pre, x) = Preprocessor::fit_knn(&df, "Result", 2).unwrap();
        let mut model = TrainedModel::DecisionTree(DecisionTree::new_classifier());
        model.fit(&x, &array![0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();

        let bundle = ModelBundle::new(pre, model).unwrap();
        let preds = bundle.predict(&df).unwrap();
        assert_eq!(preds, array![0.0, 0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_mismatched_pair_rejected() {
        let (pre, _) = Preprocessor::fit_knn(&frame(), "Result", 2).unwrap();
        let mut model = TrainedModel::DecisionTree(DecisionTree::new_classifier());
        model.fit(&array![[0.0], [1.0]], &array![0.0, 1.0]).unwrap();

        assert!(matches!(
            ModelBundle::new(pre, model),
            Err(PipelineError::Shape { .. })
        ));
    }
}
