//! Utility functions shared by the pipeline stages

pub mod frame;

pub use frame::{column_values, columns_to_array2, is_numeric_dtype};
