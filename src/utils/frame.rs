//! Conversions between polars frames and ndarray matrices

use ndarray::Array2;
use polars::prelude::*;

use crate::error::{PipelineError, Result};

/// Whether a column dtype counts as numeric for schema purposes.
///
/// Booleans are accepted, matching how tabular tooling usually treats them.
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Values of one column cast to `f64`, with nulls mapped to `NaN`.
pub fn column_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::Data(format!("column '{}' not found", name)))?;
    if !is_numeric_dtype(column.dtype()) {
        return Err(PipelineError::Data(format!(
            "column '{}' has non-numeric dtype {}",
            name,
            column.dtype()
        )));
    }
    let cast = column.cast(&DataType::Float64)?;
    Ok(cast
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

/// Extract named columns into a row-major matrix. Nulls become `NaN`.
pub fn columns_to_array2(df: &DataFrame, names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let col_data = names
        .iter()
        .map(|name| column_values(df, name))
        .collect::<Result<Vec<Vec<f64>>>>()?;

    Ok(Array2::from_shape_fn((n_rows, names.len()), |(r, c)| {
        col_data[c][r]
    }))
}
