//! Button group input: one button per choice, reporting the selected index.

use bunsen_types::ModelKind;
use serde_json::Value;

use super::{Input, InputBase};

const DEFAULT_SIZE: &str = "medium";

#[derive(Debug, Clone)]
pub struct ButtonGroupInput {
    base: InputBase,
}

impl ButtonGroupInput {
    pub fn new(base: InputBase) -> Self {
        Self { base }
    }

    /// `renderer.size`, `medium` by default
    pub fn size(&self) -> &str {
        self.base.setting_str("size").unwrap_or(DEFAULT_SIZE)
    }

    fn is_boolean(&self) -> bool {
        self.base.model.kind == Some(ModelKind::Boolean)
    }

    /// Button captions in order
    pub fn choices(&self) -> Vec<String> {
        if self.is_boolean() {
            return vec!["On".to_string(), "Off".to_string()];
        }
        self.base
            .model
            .enum_values
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }
}

impl Input for ButtonGroupInput {
    fn base(&self) -> &InputBase {
        &self.base
    }

    fn component(&self) -> &'static str {
        "bunsen-input-button-group"
    }

    /// Selected index -> value: `true`/`false` for booleans, the enum entry otherwise
    fn parse_value(&self, raw: &Value) -> Option<Value> {
        let index = raw.as_u64()? as usize;
        if self.is_boolean() {
            return match index {
                0 => Some(Value::Bool(true)),
                1 => Some(Value::Bool(false)),
                _ => None,
            };
        }
        self.base.model.enum_values.as_ref()?.get(index).cloned()
    }

    /// Value -> selected index, `null` when nothing is selected
    fn render_value(&self, value: Option<&Value>) -> Value {
        let index = match value {
            Some(Value::Bool(true)) if self.is_boolean() => Some(0),
            Some(Value::Bool(false)) if self.is_boolean() => Some(1),
            Some(v) => self
                .base
                .model
                .enum_values
                .as_ref()
                .and_then(|values| values.iter().position(|e| e == v)),
            None => None,
        };
        index.map(Value::from).unwrap_or(Value::Null)
    }
}
