//! Structural checks of a dataset against a [`Schema`]

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::Schema;
use crate::error::{PipelineError, Result};
use crate::utils::is_numeric_dtype;

/// Outcome of checking one dataset, with diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCheck {
    pub expected_columns: usize,
    pub actual_columns: usize,
    /// Declared columns (numeric or not) absent from the dataset
    pub missing_columns: Vec<String>,
    /// Declared numeric columns present with a non-numeric dtype
    pub non_numeric_columns: Vec<String>,
}

impl SchemaCheck {
    pub fn column_count_matches(&self) -> bool {
        self.expected_columns == self.actual_columns
    }

    pub fn is_valid(&self) -> bool {
        self.column_count_matches()
            && self.missing_columns.is_empty()
            && self.non_numeric_columns.is_empty()
    }

    /// Turn a failed check into a structural error naming `dataset`.
    pub fn into_result(self, dataset: &str) -> Result<()> {
        if self.is_valid() {
            return Ok(());
        }
        let mut problems = Vec::new();
        if !self.column_count_matches() {
            problems.push(format!(
                "expected {} columns, found {}",
                self.expected_columns, self.actual_columns
            ));
        }
        if !self.missing_columns.is_empty() {
            problems.push(format!("missing columns {:?}", self.missing_columns));
        }
        if !self.non_numeric_columns.is_empty() {
            problems.push(format!("non-numeric columns {:?}", self.non_numeric_columns));
        }
        Err(PipelineError::Structural(format!(
            "{} dataframe failed schema validation: {}",
            dataset,
            problems.join("; ")
        )))
    }
}

/// Checks column count, column presence and numeric dtypes.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: Schema,
}

impl SchemaValidator {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Run every check and collect diagnostics. Never fails.
    pub fn inspect(&self, df: &DataFrame) -> SchemaCheck {
        let mut check = SchemaCheck {
            expected_columns: self.schema.column_count(),
            actual_columns: df.width(),
            ..Default::default()
        };

        for name in self.schema.column_names() {
            if df.column(name).is_err() {
                check.missing_columns.push(name.to_string());
            }
        }

        for name in self.schema.numerical_columns() {
            match df.column(name) {
                Ok(column) => {
                    if !is_numeric_dtype(column.dtype()) {
                        check.non_numeric_columns.push(name.clone());
                    }
                }
                Err(_) => {
                    if !check.missing_columns.contains(name) {
                        check.missing_columns.push(name.clone());
                    }
                }
            }
        }

        info!(
            required = check.expected_columns,
            actual = check.actual_columns,
            "checked column count"
        );
        if !check.missing_columns.is_empty() || !check.non_numeric_columns.is_empty() {
            warn!(
                missing = ?check.missing_columns,
                non_numeric = ?check.non_numeric_columns,
                "numeric column validation failed"
            );
        }

        check
    }

    /// `true` when the dataset matches the schema.
    pub fn validate(&self, df: &DataFrame) -> bool {
        self.inspect(df).is_valid()
    }
}
