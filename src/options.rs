//! List utilities for select-style inputs
//!
//! Options come either from a fixed `enum` or from a `QueryStore` queried with
//! the model's `query` template, populated against the current form value.

use async_trait::async_trait;
use bunsen_templates::populate_query;
use bunsen_types::{Cell, Model, OptionItem};
use regex::RegexBuilder;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::error::{BunsenError, Result};

/// Record attribute used as an option label when none is configured
pub const DEFAULT_LABEL_ATTRIBUTE: &str = "label";
/// Record attribute used as an option value when none is configured
pub const DEFAULT_VALUE_ATTRIBUTE: &str = "id";
/// Model type queried when the model only carries a `query`
pub const DEFAULT_MODEL_TYPE: &str = "resources";

/// Placeholder replaced by the user's filter text inside query strings
pub const FILTER_PLACEHOLDER: &str = "$filter";

/// Backend answering option queries
#[async_trait]
pub trait QueryStore: Send + Sync {
    /// Records of `model_type` matching `query`
    async fn query(&self, model_type: &str, query: &Map<String, Value>) -> Result<Vec<Value>>;
}

// ============================================================================
// STATIC OPTIONS
// ============================================================================

fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Enum values as options, keeping those containing `filter` (case-insensitive)
pub fn enum_options(values: &[Value], filter: &str) -> Vec<OptionItem> {
    let needle = filter.to_lowercase();
    values
        .iter()
        .filter(|value| needle.is_empty() || display_text(value).to_lowercase().contains(&needle))
        .map(|value| OptionItem::new(display_text(value), value.clone()))
        .collect()
}

/// Options whose label matches `filter`, read as a case-insensitive regex
///
/// Filters that are not valid patterns are matched literally.
pub fn filter_options(data: &[OptionItem], filter: &str) -> Vec<OptionItem> {
    if filter.is_empty() {
        return data.to_vec();
    }

    match RegexBuilder::new(filter).case_insensitive(true).build() {
        Ok(pattern) => data
            .iter()
            .filter(|item| pattern.is_match(&item.label))
            .cloned()
            .collect(),
        Err(_) => {
            let needle = filter.to_lowercase();
            data.iter()
                .filter(|item| item.label.to_lowercase().contains(&needle))
                .cloned()
                .collect()
        }
    }
}

/// Replace the first `$filter` in every string value of `query`
pub fn apply_filter_placeholder(query: &mut Map<String, Value>, filter: &str) {
    for value in query.values_mut() {
        if let Value::String(text) = value {
            if text.contains(FILTER_PLACEHOLDER) {
                *text = text.replacen(FILTER_PLACEHOLDER, filter, 1);
            }
        }
    }
}

/// Map a fetched record onto an option
///
/// The label falls back to the record's `title` when the label attribute is
/// missing or empty.
pub fn record_to_option(record: &Value, label_attribute: &str, value_attribute: &str) -> OptionItem {
    let label = record
        .get(label_attribute)
        .filter(|v| !v.is_null() && v.as_str() != Some(""))
        .or_else(|| record.get("title"))
        .map(display_text)
        .unwrap_or_default();
    let value = record.get(value_attribute).cloned().unwrap_or(Value::Null);
    OptionItem::new(label, value)
}

// ============================================================================
// OPTION SOURCE
// ============================================================================

/// Where a select input's options come from
///
/// Built from the model with the cell's `renderer.options` filling in keys
/// the model does not set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OptionSource {
    pub enum_values: Option<Vec<Value>>,
    pub model_type: Option<String>,
    pub query: Option<Map<String, Value>>,
    pub label_attribute: String,
    pub value_attribute: String,
    /// Options always offered ahead of fetched ones
    pub data: Vec<OptionItem>,
}

impl OptionSource {
    pub fn from_model(model: &Model, cell: &Cell) -> Self {
        let options = cell.renderer.as_ref().map(|r| &r.options);
        let option = |key: &str| options.and_then(|o| o.get(key));
        let option_str = |key: &str| option(key).and_then(Value::as_str).map(str::to_string);

        let data = option("data")
            .and_then(|d| serde_json::from_value::<Vec<OptionItem>>(d.clone()).ok())
            .unwrap_or_default();

        Self {
            enum_values: model
                .enum_values
                .clone()
                .or_else(|| option("enum").and_then(Value::as_array).cloned()),
            model_type: model.model_type.clone().or_else(|| option_str("modelType")),
            query: model
                .query
                .clone()
                .or_else(|| option("query").and_then(Value::as_object).cloned()),
            label_attribute: model
                .label_attribute
                .clone()
                .or_else(|| option_str("labelAttribute"))
                .unwrap_or_else(|| DEFAULT_LABEL_ATTRIBUTE.to_string()),
            value_attribute: model
                .value_attribute
                .clone()
                .or_else(|| option_str("valueAttribute"))
                .unwrap_or_else(|| DEFAULT_VALUE_ATTRIBUTE.to_string()),
            data,
        }
    }

    /// Whether options have to be fetched
    pub fn is_remote(&self) -> bool {
        self.model_type.is_some()
    }

    /// Options available without a fetch
    pub fn local_options(&self, filter: &str) -> Vec<OptionItem> {
        let mut items = filter_options(&self.data, filter);
        if let Some(values) = &self.enum_values {
            items.extend(enum_options(values, filter));
        }
        items
    }

    /// Concrete query for the current form value
    pub fn populated_query(
        &self,
        root: &Value,
        bunsen_id: &str,
        filter: &str,
    ) -> Result<Map<String, Value>> {
        let mut query = match &self.query {
            Some(template) => populate_query(root, template, Some(bunsen_id))?,
            None => Map::new(),
        };
        apply_filter_placeholder(&mut query, filter);
        Ok(query)
    }
}

/// One option fetch, tagged with the generation it was issued in
#[derive(Debug, Clone, PartialEq)]
pub struct OptionsRequest {
    pub bunsen_id: String,
    pub generation: u64,
    pub model_type: String,
    pub query: Map<String, Value>,
    pub label_attribute: String,
    pub value_attribute: String,
}

/// Run `request` against `store` and map the records onto options
pub async fn fetch_options(store: &dyn QueryStore, request: &OptionsRequest) -> Result<Vec<OptionItem>> {
    debug!(
        "fetching {} options for '{}' (generation {})",
        request.model_type, request.bunsen_id, request.generation
    );

    match store.query(&request.model_type, &request.query).await {
        Ok(records) => Ok(records
            .iter()
            .map(|r| record_to_option(r, &request.label_attribute, &request.value_attribute))
            .collect()),
        Err(e) => {
            error!("error fetching {}: {}", request.model_type, e);
            Err(match e {
                BunsenError::Query(_) => e,
                other => BunsenError::Query(other.to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bunsen_types::{ModelKind, RendererConfig};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_enum_options_filter_case_insensitively() {
        let values = vec![json!("Alpha"), json!("beta"), json!("ALPHABET")];
        let options = enum_options(&values, "alp");
        assert_eq!(
            options,
            vec![
                OptionItem::new("Alpha", json!("Alpha")),
                OptionItem::new("ALPHABET", json!("ALPHABET")),
            ]
        );
        assert_eq!(enum_options(&values, "").len(), 3);
    }

    #[test]
    fn test_filter_options_regex_and_literal_fallback() {
        let data = vec![
            OptionItem::new("Foo", json!(1)),
            OptionItem::new("Bar (x", json!(2)),
        ];
        assert_eq!(filter_options(&data, "^f").len(), 1);
        assert_eq!(filter_options(&data, "(x").len(), 1);
        assert_eq!(filter_options(&data, "").len(), 2);
    }

    #[test]
    fn test_apply_filter_placeholder_replaces_first_occurrence() {
        let mut query = json!({"q": "name:$filter,$filter", "n": 3})
            .as_object()
            .cloned()
            .unwrap();
        apply_filter_placeholder(&mut query, "ab");
        assert_eq!(query["q"], json!("name:ab,$filter"));
        assert_eq!(query["n"], json!(3));
    }

    #[test]
    fn test_record_to_option_label_fallback() {
        let record = json!({"id": "x1", "title": "Title", "label": ""});
        assert_eq!(
            record_to_option(&record, DEFAULT_LABEL_ATTRIBUTE, DEFAULT_VALUE_ATTRIBUTE),
            OptionItem::new("Title", json!("x1"))
        );

        let named = json!({"uuid": "u", "name": "Name"});
        assert_eq!(
            record_to_option(&named, "name", "uuid"),
            OptionItem::new("Name", json!("u"))
        );
    }

    #[test]
    fn test_option_source_merges_renderer_options_under_model() {
        let model = Model {
            model_type: Some("user".into()),
            label_attribute: Some("name".into()),
            ..Model::of_kind(ModelKind::String)
        };
        let mut renderer = RendererConfig::named("select");
        renderer
            .options
            .insert("labelAttribute".into(), json!("ignored"));
        renderer
            .options
            .insert("query".into(), json!({"q": "org:${./org}"}));
        let cell = Cell {
            renderer: Some(renderer),
            ..Cell::for_model("user")
        };

        let source = OptionSource::from_model(&model, &cell);
        assert_eq!(source.label_attribute, "name");
        assert_eq!(source.value_attribute, "id");
        assert!(source.is_remote());

        let query = source
            .populated_query(&json!({"org": "acme"}), "user", "")
            .unwrap();
        assert_eq!(query["q"], json!("org:acme"));
    }
}
