//! Dataset schema declaration and validation
//!
//! A schema is a YAML document with two keys:
//!
//! ```yaml
//! columns:
//!   - having_IP_Address: int64
//!   - Result: int64
//! numerical_columns:
//!   - having_IP_Address
//!   - Result
//! ```
//!
//! The expected column count is the length of `columns`.

mod definition;
mod validator;

pub use definition::{ColumnSpec, Schema};
pub use validator::{SchemaCheck, SchemaValidator};
