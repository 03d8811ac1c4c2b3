//! Renderer Selection
//!
//! Decides which input component renders a leaf cell. Decision order, first
//! match wins:
//!
//! 1. an explicit `renderer.name` on the cell, looked up in the registry and
//!    then among registered components
//! 2. read-only forms and `editable: false` models render statically
//! 3. models with `enum` or `modelType` render as a select
//! 4. the default renderer for the model `type`

use std::collections::{BTreeMap, BTreeSet};

use bunsen_types::{Cell, Model};
use tracing::debug;

use crate::error::{BunsenError, Result};

pub const STATIC_COMPONENT: &str = "bunsen-input-static";
pub const SELECT_COMPONENT: &str = "bunsen-input-select";

/// Built-in renderer names and the components implementing them
const BUILTIN_RENDERERS: &[(&str, &str)] = &[
    ("boolean", "bunsen-input-boolean"),
    ("button-group", "bunsen-input-button-group"),
    ("geolocation", "bunsen-input-geolocation"),
    ("hidden", "bunsen-input-hidden"),
    ("integer", "bunsen-input-number"),
    ("multi-select", "bunsen-input-multi-select"),
    ("number", "bunsen-input-number"),
    ("password", "bunsen-input-password"),
    ("property-chooser", "bunsen-input-property-chooser"),
    ("select", SELECT_COMPONENT),
    ("static", STATIC_COMPONENT),
    ("string", "bunsen-input-text"),
    ("text", "bunsen-input-text"),
    ("textarea", "bunsen-input-textarea"),
    ("url", "bunsen-input-url"),
];

/// Mapping of renderer names to component identifiers plus the set of
/// components that may be named directly
#[derive(Debug, Clone, PartialEq)]
pub struct RendererRegistry {
    renderers: BTreeMap<String, String>,
    components: BTreeSet<String>,
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl RendererRegistry {
    /// An empty registry; nothing resolves until renderers are added
    pub fn empty() -> Self {
        Self {
            renderers: BTreeMap::new(),
            components: BTreeSet::new(),
        }
    }

    /// The built-in renderer table; built-in components are registered too
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for (name, component) in BUILTIN_RENDERERS {
            registry.insert(*name, *component);
            registry.register_component(*component);
        }
        registry
    }

    pub fn insert(&mut self, name: impl Into<String>, component: impl Into<String>) {
        self.renderers.insert(name.into(), component.into());
    }

    pub fn register_component(&mut self, component: impl Into<String>) {
        self.components.insert(component.into());
    }

    /// Host overrides win over existing entries
    pub fn merge(&mut self, overrides: &BTreeMap<String, String>) {
        for (name, component) in overrides {
            self.insert(name.clone(), component.clone());
        }
    }

    pub fn has_component(&self, component: &str) -> bool {
        self.components.contains(component)
    }

    /// Component for a renderer name, falling back to a registered component
    /// of the same name
    pub fn component_for(&self, name: &str) -> Result<String> {
        if let Some(component) = self.renderers.get(name) {
            return Ok(component.clone());
        }
        if self.components.contains(name) {
            return Ok(name.to_string());
        }
        Err(BunsenError::UnknownRenderer {
            name: name.to_string(),
        })
    }
}

/// Component that renders `cell` for `model`
pub fn select_renderer(
    cell: &Cell,
    model: &Model,
    read_only: bool,
    registry: &RendererRegistry,
) -> Result<String> {
    if let Some(name) = cell.renderer_name() {
        debug!("cell requests renderer '{}'", name);
        return registry.component_for(name);
    }

    if read_only || model.editable == Some(false) {
        return Ok(STATIC_COMPONENT.to_string());
    }

    if model.has_options() {
        return Ok(SELECT_COMPONENT.to_string());
    }

    let type_name = model.kind.map(|k| k.as_str()).unwrap_or("string");
    registry.component_for(type_name)
}
