//! Two-sample Kolmogorov-Smirnov test

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::{DriftTest, TestResult};
use crate::error::{PipelineError, Result};

/// How the KS p-value is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KsMethod {
    /// Exact below `exact_limit` samples per side, asymptotic above
    #[default]
    Auto,
    Exact,
    Asymptotic,
}

/// Kolmogorov-Smirnov test for distribution comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KolmogorovSmirnovTest {
    method: KsMethod,
    /// Largest sample size for which `Auto` uses the exact distribution
    exact_limit: usize,
}

impl KolmogorovSmirnovTest {
    pub fn new(method: KsMethod) -> Self {
        Self {
            method,
            exact_limit: 10_000,
        }
    }

    pub fn with_exact_limit(mut self, limit: usize) -> Self {
        self.exact_limit = limit;
        self
    }

    /// Supremum distance between the two empirical CDFs.
    ///
    /// Both slices must be sorted ascending.
    pub fn statistic(x: &[f64], y: &[f64]) -> f64 {
        let (n1, n2) = (x.len() as f64, y.len() as f64);
        let (mut i, mut j) = (0usize, 0usize);
        let mut d: f64 = 0.0;

        while i < x.len() && j < y.len() {
            let v = x[i].min(y[j]);
            while i < x.len() && x[i] <= v {
                i += 1;
            }
            while j < y.len() && y[j] <= v {
                j += 1;
            }
            d = d.max((i as f64 / n1 - j as f64 / n2).abs());
        }
        d
    }

    fn use_exact(&self, m: usize, n: usize) -> bool {
        match self.method {
            KsMethod::Exact => true,
            KsMethod::Asymptotic => false,
            KsMethod::Auto => m.max(n) <= self.exact_limit,
        }
    }
}

impl Default for KolmogorovSmirnovTest {
    fn default() -> Self {
        Self::new(KsMethod::Auto)
    }
}

impl DriftTest for KolmogorovSmirnovTest {
    fn test(&self, reference: &[f64], current: &[f64]) -> Result<TestResult> {
        if reference.is_empty() || current.is_empty() {
            return Err(PipelineError::DriftComputation(
                "empty sample provided".to_string(),
            ));
        }
        if reference.iter().chain(current.iter()).any(|v| v.is_nan()) {
            return Err(PipelineError::DriftComputation(
                "samples must not contain NaN".to_string(),
            ));
        }

        let mut x = reference.to_vec();
        let mut y = current.to_vec();
        x.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        y.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let d = Self::statistic(&x, &y);
        let (m, n) = (x.len(), y.len());

        let p_value = if d <= 0.0 {
            1.0
        } else if self.use_exact(m, n) {
            1.0 - smirnov_cdf(d, m, n)
        } else {
            let en = (m as f64 * n as f64) / (m + n) as f64;
            kolmogorov_sf(en.sqrt() * d)
        };

        Ok(TestResult {
            statistic: d,
            p_value: p_value.clamp(0.0, 1.0),
        })
    }
}

/// Exact `P(D < d)` for the two-sided two-sample statistic.
///
/// Counts monotone lattice paths from `(0, 0)` to `(m, n)` that stay strictly
/// inside the band `|i/m - j/n| < d`, normalised incrementally by
/// `C(i + n, i)` so every intermediate value stays in `[0, 1]`.
fn smirnov_cdf(d: f64, m: usize, n: usize) -> f64 {
    let (m, n) = if m > n { (n, m) } else { (m, n) };
    let (md, nd) = (m as f64, n as f64);
    let q = (0.5 + (d * md * nd - 1e-7).floor()) / (md * nd);

    let mut u: Vec<f64> = (0..=n)
        .map(|j| if j as f64 / nd > q { 0.0 } else { 1.0 })
        .collect();

    for i in 1..=m {
        let w = i as f64 / (i + n) as f64;
        let fi = i as f64 / md;
        u[0] = if fi > q { 0.0 } else { w * u[0] };
        for j in 1..=n {
            u[j] = if (fi - j as f64 / nd).abs() > q {
                0.0
            } else {
                w * u[j] + u[j - 1]
            };
        }
    }
    u[n]
}

/// Survival function of the limiting Kolmogorov distribution.
pub fn kolmogorov_sf(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }
    if lambda < 1.18 {
        // the alternating series converges slowly here, use the theta form
        let pi2 = std::f64::consts::PI * std::f64::consts::PI;
        let factor = (2.0 * std::f64::consts::PI).sqrt() / lambda;
        let sum: f64 = (1..=8)
            .map(|k| {
                let odd = (2 * k - 1) as f64;
                (-(odd * odd) * pi2 / (8.0 * lambda * lambda)).exp()
            })
            .sum();
        return (1.0 - factor * sum).clamp(0.0, 1.0);
    }
    let mut total = 0.0;
    for k in 1..=100 {
        let kf = k as f64;
        let term = (-2.0 * kf * kf * lambda * lambda).exp();
        total += if k % 2 == 1 { term } else { -term };
        if term < 1e-16 {
            break;
        }
    }
    (2.0 * total).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_constant_samples() {
        let ks = KolmogorovSmirnovTest::default();
        let a = [1.0, 1.0, 1.0, 1.0, 1.0];
        let r = ks.test(&a, &a).unwrap();
        assert_eq!(r.statistic, 0.0);
        assert_eq!(r.p_value, 1.0);
    }

    #[test]
    fn test_disjoint_samples_exact() {
        let ks = KolmogorovSmirnovTest::default();
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [6.0, 7.0, 8.0, 9.0, 10.0];
        let r = ks.test(&a, &b).unwrap();

        assert_eq!(r.statistic, 1.0);
        // two extreme paths out of C(10, 5) = 252
        assert!((r.p_value - 2.0 / 252.0).abs() < 1e-12);
    }

    #[test]
    fn test_statistic_with_ties() {
        let x = [-1.0, -1.0, 1.0, 1.0];
        let y = [-1.0, 1.0, 1.0, 1.0];
        assert!((KolmogorovSmirnovTest::statistic(&x, &y) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_exact_unequal_sizes_in_range() {
        let ks = KolmogorovSmirnovTest::new(KsMethod::Exact);
        let a: Vec<f64> = (0..40).map(|i| (i % 7) as f64).collect();
        let b: Vec<f64> = (0..25).map(|i| (i % 5) as f64 + 0.5).collect();
        let r = ks.test(&a, &b).unwrap();
        assert!(r.p_value > 0.0 && r.p_value <= 1.0);
    }

    #[test]
    fn test_kolmogorov_sf_known_values() {
        assert_eq!(kolmogorov_sf(0.0), 1.0);
        // 5% critical value of the Kolmogorov distribution
        assert!((kolmogorov_sf(1.3581) - 0.05).abs() < 1e-3);
        assert!((kolmogorov_sf(1.6276) - 0.01).abs() < 1e-3);
        // both series agree near the switch point
        let below = kolmogorov_sf(1.1799);
        let above = kolmogorov_sf(1.1801);
        assert!((below - above).abs() < 1e-3);
    }

    #[test]
    fn test_asymptotic_method_flags_shift() {
        let ks = KolmogorovSmirnovTest::new(KsMethod::Asymptotic);
        let a: Vec<f64> = (0..500).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..500).map(|i| i as f64 + 250.0).collect();
        let r = ks.test(&a, &b).unwrap();
        assert!(r.p_value < 1e-6);
    }

    #[test]
    fn test_empty_sample_is_error() {
        let ks = KolmogorovSmirnovTest::default();
        assert!(matches!(
            ks.test(&[], &[1.0]),
            Err(PipelineError::DriftComputation(_))
        ));
    }
}
