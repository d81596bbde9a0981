//! Typed persistence for pipeline artifacts
//!
//! Four payload kinds are supported:
//! - tabular splits, stored as CSV through polars
//! - numeric matrices, stored as bincode-encoded `Array2<f64>`
//! - opaque objects (fitted transforms, fitted models), bincode inside a
//!   checksummed envelope
//! - structured reports, stored as YAML
//!
//! Every write creates missing parent directories. Whether an existing file
//! may be replaced is governed by [`WriteMode`].

mod envelope;
mod store;

pub use envelope::SerializedObject;
pub use store::{ArtifactStore, WriteMode};
