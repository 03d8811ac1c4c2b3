//! Text-like, boolean and static inputs.

use serde_json::Value;

use super::{Input, InputBase};
use crate::change::ChangeEvent;

/// Free text input; `input_type` is `text`, `password`, `textarea` or `url`
#[derive(Debug, Clone)]
pub struct TextInput {
    base: InputBase,
    input_type: String,
}

impl TextInput {
    pub fn new(base: InputBase) -> Self {
        let input_type = base.setting_str("type").unwrap_or("text").to_string();
        Self { base, input_type }
    }

    pub fn with_type(base: InputBase, input_type: &str) -> Self {
        Self {
            base,
            input_type: input_type.to_string(),
        }
    }

    pub fn input_type(&self) -> &str {
        &self.input_type
    }
}

impl Input for TextInput {
    fn base(&self) -> &InputBase {
        &self.base
    }

    fn component(&self) -> &'static str {
        match self.input_type.as_str() {
            "password" => "bunsen-input-password",
            "textarea" => "bunsen-input-textarea",
            "url" => "bunsen-input-url",
            _ => "bunsen-input-text",
        }
    }
}

/// Checkbox input
#[derive(Debug, Clone)]
pub struct BooleanInput {
    base: InputBase,
}

impl BooleanInput {
    pub fn new(base: InputBase) -> Self {
        Self { base }
    }
}

impl Input for BooleanInput {
    fn base(&self) -> &InputBase {
        &self.base
    }

    fn component(&self) -> &'static str {
        "bunsen-input-boolean"
    }

    fn parse_value(&self, raw: &Value) -> Option<Value> {
        match raw {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::String(s) if s == "true" => Some(Value::Bool(true)),
            Value::String(s) if s == "false" => Some(Value::Bool(false)),
            Value::Null => None,
            _ => Some(Value::Bool(false)),
        }
    }

    fn render_value(&self, value: Option<&Value>) -> Value {
        Value::Bool(value.and_then(Value::as_bool).unwrap_or(false))
    }
}

/// Read-only display of a value
#[derive(Debug, Clone)]
pub struct StaticInput {
    base: InputBase,
}

impl StaticInput {
    pub fn new(base: InputBase) -> Self {
        Self { base }
    }
}

impl Input for StaticInput {
    fn base(&self) -> &InputBase {
        &self.base
    }

    fn component(&self) -> &'static str {
        "bunsen-input-static"
    }

    /// Display text; absent values render as an empty string
    fn render_value(&self, value: Option<&Value>) -> Value {
        let text = match value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
            Some(other) => other.to_string(),
        };
        self.base.read_transformed(Value::String(text))
    }

    fn user_input(&mut self, _raw: &Value, _root: &Value) -> Vec<ChangeEvent> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bunsen_types::{Cell, Model, RendererConfig};
    use serde_json::json;

    fn base(cell: Cell) -> InputBase {
        InputBase::new("foo", Model::default(), cell)
    }

    #[test]
    fn test_text_input_type_from_renderer() {
        let mut renderer = RendererConfig::named("text");
        renderer.settings.insert("type".into(), json!("password"));
        let cell = Cell {
            renderer: Some(renderer),
            ..Cell::for_model("foo")
        };
        let input = TextInput::new(base(cell));
        assert_eq!(input.input_type(), "password");
        assert_eq!(input.component(), "bunsen-input-password");

        assert_eq!(TextInput::new(base(Cell::for_model("foo"))).input_type(), "text");
    }

    #[test]
    fn test_boolean_parse_and_render() {
        let input = BooleanInput::new(base(Cell::default()));
        assert_eq!(input.parse_value(&json!(true)), Some(json!(true)));
        assert_eq!(input.parse_value(&json!("false")), Some(json!(false)));
        assert_eq!(input.render_value(None), json!(false));
    }

    #[test]
    fn test_static_renders_text_and_ignores_input() {
        let mut input = StaticInput::new(base(Cell::default()));
        assert_eq!(input.render_value(Some(&json!(42))), json!("42"));
        assert_eq!(input.render_value(Some(&json!(["a", "b"]))), json!("a, b"));
        assert_eq!(input.render_value(None), json!(""));
        assert!(input.user_input(&json!("x"), &json!({})).is_empty());
    }
}
