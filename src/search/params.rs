//! Concrete hyperparameter values and assignments

use crate::error::{MetaModelError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single sampled hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Absent value (e.g. unlimited `max_depth`)
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Small integer vector, e.g. MLP hidden layer widths
    IntVec(Vec<i64>),
}

impl ParamValue {
    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as integer vector
    pub fn as_int_vec(&self) -> Option<&[i64]> {
        match self {
            ParamValue::IntVec(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    /// Float value or an `InvalidParameter` error naming `name`
    pub fn to_f64(&self, name: &str) -> Result<f64> {
        self.as_float()
            .ok_or_else(|| MetaModelError::invalid_param(name, self, "expected a number"))
    }

    /// Non-negative integer value or an `InvalidParameter` error
    pub fn to_usize(&self, name: &str) -> Result<usize> {
        match self.as_int() {
            Some(v) if v >= 0 => Ok(v as usize),
            Some(_) => Err(MetaModelError::invalid_param(name, self, "must be non-negative")),
            None => Err(MetaModelError::invalid_param(name, self, "expected an integer")),
        }
    }

    /// Like [`ParamValue::to_usize`], but `Null` maps to `None`
    pub fn to_optional_usize(&self, name: &str) -> Result<Option<usize>> {
        if self.is_null() {
            Ok(None)
        } else {
            self.to_usize(name).map(Some)
        }
    }

    pub fn to_bool(&self, name: &str) -> Result<bool> {
        self.as_bool()
            .ok_or_else(|| MetaModelError::invalid_param(name, self, "expected a boolean"))
    }

    pub fn to_str<'a>(&'a self, name: &str) -> Result<&'a str> {
        self.as_str()
            .ok_or_else(|| MetaModelError::invalid_param(name, self, "expected a string"))
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => write!(f, "None"),
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(v) => write!(f, "'{}'", v),
            ParamValue::IntVec(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl From<Vec<i64>> for ParamValue {
    fn from(v: Vec<i64>) -> Self {
        ParamValue::IntVec(v)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ParamValue::Null, Into::into)
    }
}

/// Hyperparameter name to value, one concrete value per name
pub type ParamAssignment = BTreeMap<String, ParamValue>;

/// Render an assignment as `{a=1, b='x'}` for log lines
pub fn format_assignment(params: &ParamAssignment) -> String {
    let body: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("{{{}}}", body.join(", "))
}
