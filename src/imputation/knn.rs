//! KNN-based imputation

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::imputation::{is_missing, Transform};

/// Ordered (distance, row) pair for the neighbour heap
#[derive(Debug, Clone, Copy)]
struct DistanceIdx(f64, usize);

impl PartialEq for DistanceIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DistanceIdx {}

impl PartialOrd for DistanceIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DistanceIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        // max heap on (distance, row), so ties keep the lower row index
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

/// Fills each missing cell with the uniform mean of the `k` nearest fitted
/// rows that observe that feature.
///
/// Distances are NaN-aware euclidean: squared differences are summed over
/// coordinates present in both rows and scaled by
/// `n_features / n_present`. Rows sharing no observed coordinate with the
/// receiver are never donors. When a feature has no donor at all the fitted
/// column mean is used instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnImputer {
    n_neighbors: usize,
    fit_data: Option<Array2<f64>>,
    /// Means over observed values, fallback when no donor exists
    feature_means: Option<Array1<f64>>,
}

impl KnnImputer {
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1),
            fit_data: None,
            feature_means: None,
        }
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    pub fn is_fitted(&self) -> bool {
        self.fit_data.is_some()
    }

    pub fn n_features(&self) -> Option<usize> {
        self.fit_data.as_ref().map(|d| d.ncols())
    }

    fn nan_euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Option<f64> {
        let n_features = a.len();
        let mut present = 0usize;
        let mut accum = 0.0f64;

        for (&ai, &bi) in a.iter().zip(b.iter()) {
            if is_missing(ai) || is_missing(bi) {
                continue;
            }
            present += 1;
            let d = ai - bi;
            accum += d * d;
        }

        if present == 0 {
            return None;
        }
        Some((accum * n_features as f64 / present as f64).sqrt())
    }

    /// The `k` nearest donors for `feature`, given precomputed distances.
    fn donors(&self, data: &Array2<f64>, distances: &[Option<f64>], feature: usize) -> Vec<usize> {
        let k = self.n_neighbors;
        let mut heap: BinaryHeap<DistanceIdx> = BinaryHeap::with_capacity(k + 1);

        for (row, dist) in distances.iter().enumerate() {
            let Some(dist) = *dist else { continue };
            if is_missing(data[[row, feature]]) {
                continue;
            }
            let candidate = DistanceIdx(dist, row);
            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(worst) = heap.peek() {
                if candidate < *worst {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }

        heap.into_iter().map(|DistanceIdx(_, row)| row).collect()
    }
}

impl Default for KnnImputer {
    fn default() -> Self {
        Self::new(3)
    }
}

impl Transform for KnnImputer {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(PipelineError::TransformFit(format!(
                "cannot fit imputer on an empty matrix of shape {:?}",
                x.dim()
            )));
        }

        let mut means = Array1::zeros(x.ncols());
        for (j, column) in x.axis_iter(Axis(1)).enumerate() {
            let (sum, count) = column
                .iter()
                .filter(|v| !is_missing(**v))
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 {
                return Err(PipelineError::TransformFit(format!(
                    "feature {} has no observed values to impute from",
                    j
                )));
            }
            means[j] = sum / count as f64;
        }

        self.fit_data = Some(x.to_owned());
        self.feature_means = Some(means);
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (Some(data), Some(means)) = (self.fit_data.as_ref(), self.feature_means.as_ref())
        else {
            return Err(PipelineError::ModelNotFitted);
        };
        if x.ncols() != data.ncols() {
            return Err(PipelineError::Shape {
                expected: format!("{} features", data.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut result = x.clone();

        for (row_idx, row) in x.rows().into_iter().enumerate() {
            if !row.iter().any(|&v| is_missing(v)) {
                continue;
            }

            let distances: Vec<Option<f64>> = data
                .rows()
                .into_iter()
                .map(|fit_row| Self::nan_euclidean(row, fit_row))
                .collect();

            for (j, &value) in row.iter().enumerate() {
                if !is_missing(value) {
                    continue;
                }
                let donors = self.donors(data, &distances, j);
                result[[row_idx, j]] = if donors.is_empty() {
                    means[j]
                } else {
                    donors.iter().map(|&r| data[[r, j]]).sum::<f64>() / donors.len() as f64
                };
            }
        }

        Ok(result)
    }
}
