//! Bunsen model types
//!
//! A bunsen model is a recursive, JSON-Schema-like description of the value
//! tree a form edits. Only the keys the form engine reads are typed here.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ============================================================================
// MODEL KIND
// ============================================================================

/// The `type` keyword of a model node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl ModelKind {
    /// All type names accepted in a bunsen model
    pub const NAMES: [&'static str; 7] = [
        "object", "array", "string", "number", "integer", "boolean", "null",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Object => "object",
            ModelKind::Array => "array",
            ModelKind::String => "string",
            ModelKind::Number => "number",
            ModelKind::Integer => "integer",
            ModelKind::Boolean => "boolean",
            ModelKind::Null => "null",
        }
    }

    /// Parse a type name, returning `None` for anything unknown
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "object" => Some(ModelKind::Object),
            "array" => Some(ModelKind::Array),
            "string" => Some(ModelKind::String),
            "number" => Some(ModelKind::Number),
            "integer" => Some(ModelKind::Integer),
            "boolean" => Some(ModelKind::Boolean),
            "null" => Some(ModelKind::Null),
            _ => None,
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// MODEL
// ============================================================================

/// One node of a bunsen model
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ModelKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Child schemas of an `object` node
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Model>,
    /// Item schema of an `array` node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Model>>,
    /// Sub-schemas activated when the named property is present on the value
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, Model>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Query template used to fetch options for reference lookups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Map<String, Value>>,
    /// Name of the record type queried for options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Model {
    /// Create a model node of the given kind
    pub fn of_kind(kind: ModelKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    /// Builder-style property insertion, handy for fixtures
    pub fn with_property(mut self, name: impl Into<String>, model: Model) -> Self {
        self.properties.insert(name.into(), model);
        self
    }

    /// Builder-style array item schema
    pub fn with_items(mut self, items: Model) -> Self {
        self.items = Some(Box::new(items));
        self
    }

    pub fn is_object(&self) -> bool {
        self.kind == Some(ModelKind::Object)
    }

    pub fn is_array(&self) -> bool {
        self.kind == Some(ModelKind::Array)
    }

    /// Whether the named child property is listed in `required`
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Whether this node offers a fixed or fetched set of options
    pub fn has_options(&self) -> bool {
        self.enum_values.is_some() || self.model_type.is_some()
    }

    pub fn property(&self, name: &str) -> Option<&Model> {
        self.properties.get(name)
    }

    /// Walk a schema path such as `properties.foo.items.properties.bar`
    ///
    /// Tokens are `properties <name>`, `dependencies <name>` and `items`.
    /// Returns `None` as soon as a token does not match the model shape.
    pub fn at_schema_path(&self, schema_path: &str) -> Option<&Model> {
        if schema_path.is_empty() {
            return Some(self);
        }

        let mut current = self;
        let mut tokens = schema_path.split('.');

        while let Some(token) = tokens.next() {
            current = match token {
                "properties" => current.properties.get(tokens.next()?)?,
                "dependencies" => current.dependencies.get(tokens.next()?)?,
                "items" => current.items.as_deref()?,
                _ => return None,
            };
        }

        Some(current)
    }
}
