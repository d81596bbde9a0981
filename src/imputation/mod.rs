//! Missing-value imputation
//!
//! Missing values are represented as `NaN` in the feature matrix. The
//! [`Transform`] trait separates fitting (stateful, training split only)
//! from applying (pure, reused on test and inference data).

mod knn;
mod preprocessor;

pub use knn::KnnImputer;
pub use preprocessor::{FittedTransform, Preprocessor};

use crate::error::Result;
use ndarray::Array2;

/// Trait for fitted feature transforms
pub trait Transform: Send + Sync {
    /// Learn the transform's state from training features
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;

    /// Apply the fitted state without modifying it
    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Fit and transform in one step
    fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

/// Check if value is missing (NaN)
#[inline]
pub fn is_missing(v: f64) -> bool {
    v.is_nan()
}
