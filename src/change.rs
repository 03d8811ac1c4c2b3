//! Change/Error Propagation types
//!
//! Leaves report `(path, value)` pairs upward; containers re-qualify them and
//! the form root flattens them into whole-tree updates.

use bunsen_types::ErrorEntry;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A path-qualified value change
///
/// `value: None` means the field was cleared (the key is removed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub path: String,
    pub value: Option<Value>,
}

impl ChangeEvent {
    pub fn set(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn clear(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: None,
        }
    }

    /// Qualify a child-relative event with the container's id
    pub fn prefixed(self, prefix: &str) -> Self {
        let path = match (prefix.is_empty(), self.path.is_empty()) {
            (true, _) => self.path,
            (false, true) => prefix.to_string(),
            (false, false) => format!("{}.{}", prefix, self.path),
        };
        Self { path, ..self }
    }

    pub fn is_clearing(&self) -> bool {
        crate::value::is_clearing_value(self.value.as_ref())
    }
}

/// An asynchronous failure reported for one input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub path: String,
    pub errors: Vec<ErrorEntry>,
}

impl ErrorEvent {
    pub fn new(path: impl Into<String>, errors: Vec<ErrorEntry>) -> Self {
        Self {
            path: path.into(),
            errors,
        }
    }
}
