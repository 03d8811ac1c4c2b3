//! Value validation
//!
//! The form runs a [`Validator`] after every value change. Hosts usually plug
//! in their own; [`ModelValidator`] covers required fields, types and enums.

use bunsen_types::{Model, ModelKind, ValidationResult};
use serde_json::Value;

use crate::value::is_clearing_value;
use crate::view::validate::type_name;

/// Validates a form value against its model
pub trait Validator: Send + Sync {
    fn validate(&self, model: &Model, value: &Value) -> ValidationResult;
}

/// Required-field, type and enum checks straight from the model
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelValidator;

impl Validator for ModelValidator {
    fn validate(&self, model: &Model, value: &Value) -> ValidationResult {
        let mut result = ValidationResult::new();
        check_node(&mut result, model, value, "#");
        result
    }
}

fn kind_matches(kind: ModelKind, value: &Value) -> bool {
    let actual = type_name(value);
    match kind {
        ModelKind::Number => actual == "number" || actual == "integer",
        ModelKind::Integer => {
            actual == "integer" || value.as_f64().map(|n| n.fract() == 0.0).unwrap_or(false)
        }
        other => other.as_str() == actual,
    }
}

fn check_node(result: &mut ValidationResult, model: &Model, value: &Value, pointer: &str) {
    if value.is_null() {
        return;
    }

    if let Some(kind) = model.kind {
        if !kind_matches(kind, value) {
            result.error(
                pointer,
                format!("Expected type {} but found type {}", kind, type_name(value)),
            );
            return;
        }
    }

    if let Some(allowed) = &model.enum_values {
        if !allowed.contains(value) {
            result.error(pointer, format!("No enum match for: {}", value));
        }
    }

    match value {
        Value::Object(object) => {
            // dependencies whose key is set contribute properties and requirements
            let active: Vec<&Model> = model
                .dependencies
                .iter()
                .filter(|(key, _)| !is_clearing_value(object.get(key.as_str())))
                .map(|(_, dep)| dep)
                .collect();

            for name in model.required.iter().chain(active.iter().flat_map(|d| d.required.iter())) {
                if is_clearing_value(object.get(name)) {
                    result.required(format!("{}/{}", pointer, name));
                }
            }

            for (key, child) in object {
                let child_model = model
                    .properties
                    .get(key)
                    .or_else(|| active.iter().find_map(|d| d.properties.get(key)));
                if let Some(child_model) = child_model {
                    check_node(result, child_model, child, &format!("{}/{}", pointer, key));
                }
            }
        }
        Value::Array(items) => {
            if let Some(item_model) = model.items.as_deref() {
                for (index, item) in items.iter().enumerate() {
                    check_node(result, item_model, item, &format!("{}/{}", pointer, index));
                }
            }
        }
        _ => {}
    }
}
