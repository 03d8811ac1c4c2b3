//! Option items offered by select-style inputs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A `{label, value}` pair shown by select and multi-select inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionItem {
    pub label: String,
    pub value: Value,
}

impl OptionItem {
    pub fn new(label: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}
