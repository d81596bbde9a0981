//! Hyperparameter values and exhaustive grids

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// A single hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Some(*v as usize),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

/// One concrete configuration, option name to value
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Option name to candidate values, searched exhaustively.
///
/// Keys iterate in sorted order. Expansion varies the last key fastest, so
/// the enumeration order is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamGrid(BTreeMap<String, Vec<ParamValue>>);

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<V: Into<ParamValue>>(mut self, name: &str, values: Vec<V>) -> Self {
        self.0
            .insert(name.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    /// A grid with no options means "fit once with defaults".
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of configurations the grid expands to.
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).product()
    }

    /// Cartesian product of all options.
    pub fn expand(&self) -> Result<Vec<ParamSet>> {
        if let Some((name, _)) = self.0.iter().find(|(_, values)| values.is_empty()) {
            return Err(PipelineError::InvalidParameter {
                name: name.clone(),
                value: "[]".to_string(),
                reason: "grid options need at least one value".to_string(),
            });
        }

        let mut configs: Vec<ParamSet> = vec![ParamSet::new()];
        for (name, values) in &self.0 {
            configs = configs
                .into_iter()
                .flat_map(|base| {
                    values.iter().map(move |value| {
                        let mut next = base.clone();
                        next.insert(name.clone(), value.clone());
                        next
                    })
                })
                .collect();
        }
        Ok(configs)
    }
}

/// Render a configuration as `a=1, b=gini` for logs and reports.
pub fn describe(params: &ParamSet) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Typed lookups with defaults, rejecting values of the wrong kind.
pub(crate) struct ParamReader<'a> {
    params: &'a ParamSet,
}

impl<'a> ParamReader<'a> {
    pub(crate) fn new(params: &'a ParamSet, known: &[&str]) -> Result<Self> {
        if let Some(name) = params.keys().find(|k| !known.contains(&k.as_str())) {
            return Err(PipelineError::InvalidParameter {
                name: name.clone(),
                value: params[name].to_string(),
                reason: format!("unknown option, expected one of {:?}", known),
            });
        }
        Ok(Self { params })
    }

    fn invalid(name: &str, value: &ParamValue, reason: &str) -> PipelineError {
        PipelineError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn usize_or(&self, name: &str, default: usize) -> Result<usize> {
        match self.params.get(name) {
            None => Ok(default),
            Some(v) => v
                .as_usize()
                .ok_or_else(|| Self::invalid(name, v, "expected a non-negative integer")),
        }
    }

    pub(crate) fn opt_usize(&self, name: &str) -> Result<Option<usize>> {
        match self.params.get(name) {
            None => Ok(None),
            Some(ParamValue::Str(s)) if s == "none" => Ok(None),
            Some(v) => v
                .as_usize()
                .map(Some)
                .ok_or_else(|| Self::invalid(name, v, "expected a non-negative integer")),
        }
    }

    pub(crate) fn f64_or(&self, name: &str, default: f64) -> Result<f64> {
        match self.params.get(name) {
            None => Ok(default),
            Some(v) => v
                .as_f64()
                .ok_or_else(|| Self::invalid(name, v, "expected a number")),
        }
    }

    pub(crate) fn bool_or(&self, name: &str, default: bool) -> Result<bool> {
        match self.params.get(name) {
            None => Ok(default),
            Some(v) => v
                .as_bool()
                .ok_or_else(|| Self::invalid(name, v, "expected a boolean")),
        }
    }

    pub(crate) fn str_or(&self, name: &str, default: &'a str, allowed: &[&str]) -> Result<&'a str> {
        match self.params.get(name) {
            None => Ok(default),
            Some(v) => match v.as_str() {
                Some(s) if allowed.contains(&s) => Ok(s),
                _ => Err(Self::invalid(
                    name,
                    v,
                    &format!("expected one of {:?}", allowed),
                )),
            },
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&'a ParamValue> {
        self.params.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_last_key_fastest() {
        let grid = ParamGrid::new()
            .with("b", vec![1i64, 2])
            .with("a", vec!["x", "y"]);

        let configs = grid.expand().unwrap();
        assert_eq!(grid.len(), 4);
        let rendered: Vec<String> = configs.iter().map(describe).collect();
        assert_eq!(
            rendered,
            vec!["a=x, b=1", "a=x, b=2", "a=y, b=1", "a=y, b=2"]
        );
    }

    #[test]
    fn test_empty_grid_expands_to_defaults() {
        let configs = ParamGrid::new().expand().unwrap();
        assert_eq!(configs, vec![ParamSet::new()]);
    }

    #[test]
    fn test_option_without_values_rejected() {
        let grid = ParamGrid::new().with::<i64>("n_estimators", vec![]);
        assert!(grid.expand().is_err());
    }

    #[test]
    fn test_yaml_values_keep_their_kind() {
        let grid: ParamGrid =
            serde_yaml::from_str("learning_rate: [0.1, 0.01]\nn_estimators: [8, 16]\ncriterion: [gini]\n")
                .unwrap();
        let configs = grid.expand().unwrap();

        assert_eq!(configs[0]["learning_rate"], ParamValue::Float(0.1));
        assert_eq!(configs[0]["n_estimators"], ParamValue::Int(8));
        assert_eq!(configs[0]["criterion"], ParamValue::Str("gini".to_string()));
    }

    #[test]
    fn test_reader_rejects_unknown_option() {
        let mut params = ParamSet::new();
        params.insert("depth".to_string(), ParamValue::Int(3));
        assert!(ParamReader::new(&params, &["max_depth"]).is_err());
    }

    #[test]
    fn test_reader_typed_lookup() {
        let mut params = ParamSet::new();
        params.insert("max_depth".to_string(), ParamValue::Int(3));
        params.insert("learning_rate".to_string(), ParamValue::Int(1));

        let reader = ParamReader::new(&params, &["max_depth", "learning_rate"]).unwrap();
        assert_eq!(reader.opt_usize("max_depth").unwrap(), Some(3));
        assert_eq!(reader.f64_or("learning_rate", 0.1).unwrap(), 1.0);
        assert_eq!(reader.usize_or("missing", 7).unwrap(), 7);
    }
}
