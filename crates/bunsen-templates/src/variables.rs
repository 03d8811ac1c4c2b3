//! Template variable substitution
//!
//! Substitutes `${reference}` placeholders inside JSON-encoded templates with
//! values found in the form value.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::error::TemplateError;
use crate::reference::{find_value, format_path, Reference};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([^}]*)\}").expect("placeholder pattern is a valid regex")
});

/// A whole JSON string literal that is nothing but one placeholder
static WHOLE_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""\$\{([^}]*)\}""#).expect("whole literal pattern is a valid regex")
});

/// Escape text so it can sit inside a JSON string literal
fn escape_fragment(text: &str) -> String {
    let quoted = Value::String(text.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

/// Text rendering of a found value when embedded in a string literal
fn render_embedded(found: Option<&Value>) -> String {
    match found {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => escape_fragment(s),
        Some(other) => escape_fragment(&other.to_string()),
    }
}

/// Substitute every `${ref}` inside `template_json`
///
/// With `stringify` off the placeholders are assumed to sit inside JSON string
/// literals: values are inserted as escaped text (missing values as the empty
/// string) and the result must parse as JSON, otherwise
/// [`TemplateError::InvalidJson`] is returned.
///
/// With `stringify` on, a string literal consisting of exactly one placeholder
/// is replaced by the JSON rendering of the value (`null` when missing), which
/// preserves numbers, booleans and objects. The result is not re-validated.
pub fn parse_variables(
    root: &Value,
    template_json: &str,
    start_path: Option<&str>,
    stringify: bool,
) -> Result<String, TemplateError> {
    let mut text = template_json.to_string();

    if stringify {
        text = WHOLE_LITERAL
            .replace_all(&text, |caps: &Captures| {
                find_value(root, &caps[1], start_path)
                    .map(Value::to_string)
                    .unwrap_or_else(|| "null".to_string())
            })
            .into_owned();
    }

    let substituted = PLACEHOLDER
        .replace_all(&text, |caps: &Captures| {
            render_embedded(find_value(root, &caps[1], start_path))
        })
        .into_owned();

    if !stringify {
        if let Err(source) = serde_json::from_str::<Value>(&substituted) {
            return Err(TemplateError::InvalidJson {
                text: substituted,
                source,
            });
        }
    }

    Ok(substituted)
}

/// Resolve a query template into concrete fetch parameters
pub fn populate_query(
    root: &Value,
    query: &Map<String, Value>,
    start_path: Option<&str>,
) -> Result<Map<String, Value>, TemplateError> {
    let template = serde_json::to_string(query)?;
    let populated = parse_variables(root, &template, start_path, false)?;

    match serde_json::from_str::<Value>(&populated) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(TemplateError::NotAnObject),
        Err(source) => Err(TemplateError::InvalidJson {
            text: populated,
            source,
        }),
    }
}

/// Reference expressions used by a template, in order of appearance
pub fn query_references(template_json: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(template_json)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Absolute bunsen ids read by a query template evaluated from `start_path`
///
/// Unparseable references are skipped.
pub fn referenced_paths(query: &Map<String, Value>, start_path: Option<&str>) -> Vec<String> {
    let template = Value::Object(query.clone()).to_string();
    query_references(&template)
        .iter()
        .filter_map(|expr| Reference::parse(expr).ok())
        .filter_map(|reference| reference.absolute_segments(start_path))
        .map(|segments| format_path(&segments))
        .collect()
}

/// Whether every placeholder of `query` resolves to a usable value
///
/// A query without placeholders (or no query at all) is always valid.
pub fn has_valid_query_values(
    root: &Value,
    query: Option<&Map<String, Value>>,
    start_path: Option<&str>,
) -> bool {
    let Some(query) = query else {
        return true;
    };

    let template = Value::Object(query.clone()).to_string();
    query_references(&template).iter().all(|expr| {
        match find_value(root, expr, start_path) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    })
}
