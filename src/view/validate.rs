//! Structural validation of raw bunsen model and view documents
//!
//! Works on `serde_json::Value` rather than the typed documents so that a
//! broken document produces findings (`#/cells Field is required.`) instead of
//! a deserialization error.

use bunsen_types::{Cell, Model, ModelKind, ValidationResult, View, SUPPORTED_VIEW_VERSION};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::BunsenError;
use crate::path::{render_id, sub_model};
use crate::view::cells::CellResolver;

/// Heading shown when the view document is broken
pub const VIEW_ERROR_HEADING: &str = "There seems to be something wrong with your view schema";

/// Heading shown when the model document is broken
pub const MODEL_ERROR_HEADING: &str = "There seems to be something wrong with your schema";

const VIEW_TYPES: [&str; 2] = ["form", "detail"];

/// JSON type name as reported in findings
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn expect_type(result: &mut ValidationResult, path: &str, value: &Value, expected: &str) -> bool {
    let actual = type_name(value);
    let matches = actual == expected || (expected == "number" && actual == "integer");
    if !matches {
        result.error(
            path,
            format!("Expected type {} but found type {}", expected, actual),
        );
    }
    matches
}

fn expect_enum(result: &mut ValidationResult, path: &str, value: &Value, allowed: &[&str]) {
    let ok = value.as_str().map(|s| allowed.contains(&s)).unwrap_or(false);
    if !ok {
        result.error(path, format!("No enum match for: {}", value));
    }
}

fn check_optional(
    result: &mut ValidationResult,
    object: &Map<String, Value>,
    pointer: &str,
    key: &str,
    expected: &str,
) {
    if let Some(value) = object.get(key) {
        expect_type(result, &format!("{}/{}", pointer, key), value, expected);
    }
}

// ============================================================================
// VIEW
// ============================================================================

/// Validate a raw view document, optionally against the model it renders
pub fn validate_view(raw: &Value, model: Option<&Model>) -> ValidationResult {
    let mut result = ValidationResult::new();

    let Some(object) = raw.as_object() else {
        expect_type(&mut result, "#", raw, "object");
        return result;
    };

    match object.get("version") {
        None => result.required("#/version"),
        Some(version) => {
            if expect_type(&mut result, "#/version", version, "string") {
                expect_enum(&mut result, "#/version", version, &[SUPPORTED_VIEW_VERSION]);
            }
        }
    }

    if let Some(view_type) = object.get("type") {
        expect_type(&mut result, "#/type", view_type, "string");
        expect_enum(&mut result, "#/type", view_type, &VIEW_TYPES);
    }

    match object.get("cells") {
        None => result.required("#/cells"),
        Some(Value::Array(cells)) => {
            for (index, cell) in cells.iter().enumerate() {
                check_cell_shape(&mut result, &format!("#/cells/{}", index), cell);
            }
        }
        Some(other) => {
            expect_type(&mut result, "#/cells", other, "array");
        }
    }

    match object.get("cellDefinitions") {
        None => {}
        Some(Value::Object(definitions)) => {
            for (id, cell) in definitions {
                check_cell_shape(&mut result, &format!("#/cellDefinitions/{}", id), cell);
            }
        }
        Some(Value::Array(definitions)) => {
            for (index, cell) in definitions.iter().enumerate() {
                let pointer = format!("#/cellDefinitions/{}", index);
                if cell.get("id").is_none() {
                    result.required(format!("{}/id", pointer));
                }
                check_cell_shape(&mut result, &pointer, cell);
            }
        }
        Some(other) => {
            expect_type(&mut result, "#/cellDefinitions", other, "object");
        }
    }

    if !result.is_valid() {
        return result;
    }

    let view: View = match serde_json::from_value(raw.clone()) {
        Ok(view) => view,
        Err(e) => {
            result.error("#", e.to_string());
            return result;
        }
    };

    result.merge(check_references(&view, model));
    result
}

/// Validate a typed view (already deserialized) for extends and model references
pub fn check_references(view: &View, model: Option<&Model>) -> ValidationResult {
    let mut result = ValidationResult::new();
    let resolver = CellResolver::new(view);

    for (id, definition) in &view.cell_definitions {
        if let Err(e) = resolver.resolve(definition) {
            result.error(format!("#/cellDefinitions/{}", id), e.to_string());
        }
    }

    for (index, cell) in view.cells.iter().enumerate() {
        let pointer = format!("#/cells/{}", index);
        match resolver.resolve(cell) {
            Ok(resolved) => {
                if let Some(model) = model {
                    check_model_refs(&resolver, model, &resolved, "", &pointer, &mut result, 0);
                }
            }
            Err(e) => result.error(pointer, e.to_string()),
        }
    }

    debug!(
        "view reference check: {} errors, {} warnings",
        result.errors.len(),
        result.warnings.len()
    );
    result
}

fn check_cell_shape(result: &mut ValidationResult, pointer: &str, cell: &Value) {
    let Some(object) = cell.as_object() else {
        expect_type(result, pointer, cell, "object");
        return;
    };

    for key in ["id", "extends", "model", "label", "description", "dependsOn"] {
        check_optional(result, object, pointer, key, "string");
    }
    for key in ["collapsible", "disabled", "hideLabel", "mergeChildren"] {
        check_optional(result, object, pointer, key, "boolean");
    }
    check_optional(result, object, pointer, "classNames", "object");
    check_optional(result, object, pointer, "transforms", "object");

    if let Some(renderer) = object.get("renderer") {
        let renderer_pointer = format!("{}/renderer", pointer);
        if expect_type(result, &renderer_pointer, renderer, "object") {
            match renderer.get("name") {
                None => result.required(format!("{}/name", renderer_pointer)),
                Some(name) => {
                    expect_type(result, &format!("{}/name", renderer_pointer), name, "string");
                }
            }
        }
    }

    if let Some(item) = object.get("item") {
        let item_pointer = format!("{}/item", pointer);
        if expect_type(result, &item_pointer, item, "object") {
            check_children(result, &item_pointer, item);
        }
    }

    check_children(result, pointer, cell);
}

fn check_children(result: &mut ValidationResult, pointer: &str, cell: &Value) {
    match cell.get("children") {
        None => {}
        Some(Value::Array(children)) => {
            for (index, child) in children.iter().enumerate() {
                check_cell_shape(result, &format!("{}/children/{}", pointer, index), child);
            }
        }
        Some(other) => {
            expect_type(result, &format!("{}/children", pointer), other, "array");
        }
    }
}

const MAX_CHECK_DEPTH: usize = 32;

fn check_model_refs(
    resolver: &CellResolver<'_>,
    model: &Model,
    cell: &Cell,
    parent_path: &str,
    pointer: &str,
    result: &mut ValidationResult,
    depth: usize,
) {
    if depth > MAX_CHECK_DEPTH {
        return;
    }

    let path = render_id(parent_path, cell.model.as_deref());
    if cell.model.is_some() {
        let found = sub_model(model, &path, cell.depends_on.as_deref())
            .or_else(|| sub_model(model, &path, None));
        if found.is_none() {
            result.warning(
                format!("{}/model", pointer),
                format!("Unable to find model for '{}'", path),
            );
        }
    }

    for (index, child) in cell.children().iter().enumerate() {
        let child_pointer = format!("{}/children/{}", pointer, index);
        match resolver.resolve(child) {
            Ok(resolved) => check_model_refs(
                resolver,
                model,
                &resolved,
                &path,
                &child_pointer,
                result,
                depth + 1,
            ),
            Err(e) => result.error(child_pointer, e.to_string()),
        }
    }

    if let Some(item) = cell.item.as_deref() {
        match resolver.item_cell(item) {
            Ok(item_cell) => {
                let item_path = format!("{}.0", path);
                for (index, child) in item_cell.children().iter().enumerate() {
                    let child_pointer = format!("{}/item/children/{}", pointer, index);
                    match resolver.resolve(child) {
                        Ok(resolved) => check_model_refs(
                            resolver,
                            model,
                            &resolved,
                            &item_path,
                            &child_pointer,
                            result,
                            depth + 1,
                        ),
                        Err(e) => result.error(child_pointer, e.to_string()),
                    }
                }
            }
            Err(e) => result.error(format!("{}/item", pointer), e.to_string()),
        }
    }
}

// ============================================================================
// MODEL
// ============================================================================

/// Validate a raw bunsen model document
pub fn validate_model(raw: &Value) -> ValidationResult {
    let mut result = ValidationResult::new();

    match raw.as_object() {
        Some(object) if !object.contains_key("type") => result.required("#/type"),
        Some(_) => {}
        None => {
            expect_type(&mut result, "#", raw, "object");
            return result;
        }
    }

    check_model_node(&mut result, "#", raw);
    result
}

fn check_model_node(result: &mut ValidationResult, pointer: &str, node: &Value) {
    let Some(object) = node.as_object() else {
        expect_type(result, pointer, node, "object");
        return;
    };

    if let Some(kind) = object.get("type") {
        let type_pointer = format!("{}/type", pointer);
        if expect_type(result, &type_pointer, kind, "string") {
            expect_enum(result, &type_pointer, kind, &ModelKind::NAMES);
        }
    }

    for key in ["properties", "dependencies"] {
        match object.get(key) {
            None => {}
            Some(Value::Object(children)) => {
                for (name, child) in children {
                    check_model_node(result, &format!("{}/{}/{}", pointer, key, name), child);
                }
            }
            Some(other) => {
                expect_type(result, &format!("{}/{}", pointer, key), other, "object");
            }
        }
    }

    if let Some(items) = object.get("items") {
        check_model_node(result, &format!("{}/items", pointer), items);
    }

    if let Some(required) = object.get("required") {
        let required_pointer = format!("{}/required", pointer);
        if expect_type(result, &required_pointer, required, "array") {
            if let Some(entries) = required.as_array() {
                for (index, entry) in entries.iter().enumerate() {
                    expect_type(result, &format!("{}/{}", required_pointer, index), entry, "string");
                }
            }
        }
    }

    check_optional(result, object, pointer, "enum", "array");
    check_optional(result, object, pointer, "query", "object");
    check_optional(result, object, pointer, "modelType", "string");
    check_optional(result, object, pointer, "title", "string");
}

/// Parse a model that passed [`validate_model`]
pub fn parse_model(raw: &Value) -> Result<Model, BunsenError> {
    serde_json::from_value(raw.clone()).map_err(|e| BunsenError::InvalidModel(e.to_string()))
}

/// Parse a view that passed [`validate_view`]
pub fn parse_view(raw: &Value) -> Result<View, BunsenError> {
    serde_json::from_value(raw.clone()).map_err(|e| BunsenError::InvalidView(e.to_string()))
}
