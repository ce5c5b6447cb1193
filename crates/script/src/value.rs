use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A variable's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Scalar(String),
    /// Associative array, in insertion order.
    Array(IndexMap<String, String>),
}

impl Value {
    pub fn scalar(value: impl Into<String>) -> Self {
        Self::Scalar(value.into())
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::Array(_) => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }
}

/// A user-defined procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Procedure {
    pub name: String,
    /// Parameter specs as written: a name, or a `{name default}` pair
    /// rendered as a two-element list. A trailing `args` collects the rest.
    pub params: Vec<String>,
    pub body: String,
}

/// Interpret a string as a boolean the way scripts write flags.
pub fn is_truthy(value: &str) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => false,
        other => other.parse::<f64>().map(|n| n != 0.0).unwrap_or(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        for yes in ["1", "true", "YES", "on", "2"] {
            assert!(is_truthy(yes), "{yes}");
        }
        for no in ["0", "false", "No", "off", "", "0.0"] {
            assert!(!is_truthy(no), "{no}");
        }
    }
}
