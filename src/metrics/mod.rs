//! Classification quality metrics
//!
//! The positive class is label `1`. Targets are remapped from `{-1, 1}` to
//! `{0, 1}` before they ever reach this module.

mod classification;

pub use classification::{accuracy, score, ClassificationMetrics};
