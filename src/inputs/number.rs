//! Number input
//!
//! Accepts whatever the widget produces and keeps the leading numeric part,
//! the way a browser's float parsing does. Non-finite results are `null`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

use super::{Input, InputBase};

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").expect("number pattern is a valid regex")
});

/// Leading float of `text`, if any
pub fn parse_float(text: &str) -> Option<f64> {
    let matched = LEADING_NUMBER.find(text.trim_start())?;
    matched.as_str().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone)]
pub struct NumberInput {
    base: InputBase,
}

impl NumberInput {
    pub fn new(base: InputBase) -> Self {
        Self { base }
    }
}

impl Input for NumberInput {
    fn base(&self) -> &InputBase {
        &self.base
    }

    fn component(&self) -> &'static str {
        "bunsen-input-number"
    }

    /// A finite number, or `null` for anything unparseable
    fn parse_value(&self, raw: &Value) -> Option<Value> {
        let parsed = match raw {
            Value::Number(n) => n.as_f64().filter(|n| n.is_finite()),
            Value::String(s) => parse_float(s),
            _ => None,
        };
        Some(parsed.map(number_value).unwrap_or(Value::Null))
    }

    fn render_value(&self, value: Option<&Value>) -> Value {
        match value {
            None | Some(Value::Null) => Value::String(String::new()),
            Some(Value::Number(n)) => Value::String(n.to_string()),
            Some(other) => other.clone(),
        }
    }
}
