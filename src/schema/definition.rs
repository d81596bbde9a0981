//! Schema document parsing

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// One declared column and its dtype label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub dtype: String,
}

#[derive(Debug, Deserialize)]
struct RawSchema {
    columns: Vec<BTreeMap<String, String>>,
    #[serde(default)]
    numerical_columns: Vec<String>,
}

/// Immutable description of the expected dataset layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
    numerical_columns: Vec<String>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnSpec>, numerical_columns: Vec<String>) -> Self {
        Self {
            columns,
            numerical_columns,
        }
    }

    /// Read and parse a schema file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| PipelineError::persistence(path, e))?;
        Self::from_yaml_str(&text)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let raw: RawSchema = serde_yaml::from_str(text)?;

        let mut columns = Vec::with_capacity(raw.columns.len());
        for entry in raw.columns {
            if entry.len() != 1 {
                return Err(PipelineError::Config(format!(
                    "each schema column entry must map exactly one name to a dtype, got {} keys",
                    entry.len()
                )));
            }
            if let Some((name, dtype)) = entry.into_iter().next() {
                columns.push(ColumnSpec { name, dtype });
            }
        }

        Ok(Self {
            columns,
            numerical_columns: raw.numerical_columns,
        })
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn numerical_columns(&self) -> &[String] {
        &self.numerical_columns
    }
}
