//! Linear models

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::models::{check_fit_input, check_predict_input, class_labels, Estimator};
use crate::error::{PipelineError, Result};

/// Binary logistic regression fitted by full-batch gradient descent with an
/// L2 penalty of strength `1 / C`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: Option<f64>,
    /// Inverse regularization strength
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub learning_rate: f64,
    /// Negative and positive class labels
    classes: Vec<f64>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            c: 1.0,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
            classes: Vec::new(),
        }
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.as_ref().map_or(0, |c| c.len())
    }

    fn sigmoid(v: f64) -> f64 {
        if v >= 0.0 {
            1.0 / (1.0 + (-v).exp())
        } else {
            let e = v.exp();
            e / (1.0 + e)
        }
    }

    /// Probability of the positive (higher) class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (Some(coefficients), Some(intercept)) = (self.coefficients.as_ref(), self.intercept)
        else {
            return Err(PipelineError::ModelNotFitted);
        };
        check_predict_input(x, coefficients.len())?;
        Ok((x.dot(coefficients) + intercept).mapv(Self::sigmoid))
    }
}

impl Estimator for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        if self.c <= 0.0 {
            return Err(PipelineError::InvalidParameter {
                name: "C".to_string(),
                value: self.c.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let (classes, labels) = class_labels(y);
        if classes.len() > 2 {
            return Err(PipelineError::InvalidParameter {
                name: "classes".to_string(),
                value: classes.len().to_string(),
                reason: "logistic regression here is binary only".to_string(),
            });
        }

        let n_samples = x.nrows() as f64;
        let target: Array1<f64> = labels.iter().map(|&l| l as f64).collect();
        let penalty = 1.0 / (self.c * n_samples);

        let mut weights = Array1::zeros(x.ncols());
        let mut bias = 0.0;

        for _ in 0..self.max_iter {
            let predictions = (x.dot(&weights) + bias).mapv(Self::sigmoid);
            let errors = &predictions - &target;

            let dw = x.t().dot(&errors) / n_samples + penalty * &weights;
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - self.learning_rate * dw;
            bias -= self.learning_rate * db;
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);
        self.classes = classes;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        let negative = self.classes.first().copied().unwrap_or(0.0);
        let positive = self.classes.get(1).copied().unwrap_or(negative);
        Ok(proba.mapv(|p| if p > 0.5 { positive } else { negative }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_logistic_regression_separable() {
        let x = array![[-2.0, -1.0], [-1.5, -2.0], [-1.0, -1.0], [1.0, 1.5], [2.0, 1.0], [1.5, 2.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();

        assert_eq!(model.predict(&x).unwrap(), y);
        let proba = model.predict_proba(&array![[3.0, 3.0]]).unwrap();
        assert!(proba[0] > 0.9);
    }

    #[test]
    fn test_keeps_original_labels() {
        let x = array![[-1.0], [-2.0], [1.0], [2.0]];
        let y = array![-1.0, -1.0, 1.0, 1.0];

        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_stronger_penalty_shrinks_weights() {
        let x = array![[-1.0], [-0.5], [0.5], [1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut loose = LogisticRegression::new().with_c(100.0);
        let mut tight = LogisticRegression::new().with_c(0.01);
        loose.fit(&x, &y).unwrap();
        tight.fit(&x, &y).unwrap();

        let w_loose = loose.coefficients.as_ref().unwrap()[0].abs();
        let w_tight = tight.coefficients.as_ref().unwrap()[0].abs();
        assert!(w_tight < w_loose);
    }

    #[test]
    fn test_non_positive_c_rejected() {
        let mut model = LogisticRegression::new().with_c(0.0);
        let result = model.fit(&array![[0.0], [1.0]], &array![0.0, 1.0]);
        assert!(matches!(result, Err(PipelineError::InvalidParameter { .. })));
    }
}
