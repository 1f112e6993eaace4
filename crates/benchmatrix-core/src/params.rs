//! Parameter values and binding lists.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MatrixError, MatrixResult};

/// A single generic value bound to a bench parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Bool(bool),
    Str(String),
}

impl ParamValue {
    /// Interpret a raw CLI value: integer, then boolean, then string.
    /// Surrounding double quotes force a string.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
            return ParamValue::Str(raw[1..raw.len() - 1].to_string());
        }
        if let Ok(i) = raw.parse::<i64>() {
            return ParamValue::Int(i);
        }
        match raw {
            "true" => ParamValue::Bool(true),
            "false" => ParamValue::Bool(false),
            _ => ParamValue::Str(raw.to_string()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

/// Parameter name to value, ordered by name.
pub type Bindings = BTreeMap<String, ParamValue>;

/// Parse `KEY=VALUE[,KEY=VALUE...]`.
///
/// An empty input yields empty bindings. Keys must be non-empty and unique.
pub fn parse_bindings(input: &str) -> MatrixResult<Bindings> {
    let mut bindings = Bindings::new();
    if input.trim().is_empty() {
        return Ok(bindings);
    }

    for item in input.split(',') {
        let Some((key, value)) = item.split_once('=') else {
            return Err(MatrixError::InvalidBinding {
                input: item.to_string(),
                reason: "expected KEY=VALUE".to_string(),
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(MatrixError::InvalidBinding {
                input: item.to_string(),
                reason: "empty parameter name".to_string(),
            });
        }
        if bindings
            .insert(key.to_string(), ParamValue::parse(value))
            .is_some()
        {
            return Err(MatrixError::InvalidBinding {
                input: input.to_string(),
                reason: format!("parameter '{key}' bound twice"),
            });
        }
    }

    Ok(bindings)
}

/// Render bindings as `K=V,K2=V2` in key order.
pub fn render_bindings(bindings: &Bindings) -> String {
    bindings
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}
