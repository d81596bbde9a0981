//! Inference over persisted artifacts
//!
//! A fitted [`Preprocessor`](crate::imputation::Preprocessor) and a fitted
//! [`TrainedModel`](crate::training::TrainedModel) are only meaningful
//! together. [`ModelBundle`] keeps them as one persisted object and
//! [`InferenceContext`] is the loaded, shareable form a serving layer holds.

mod bundle;
mod engine;

pub use bundle::ModelBundle;
pub use engine::{InferenceContext, InferenceStats, PREDICTED_COLUMN};
