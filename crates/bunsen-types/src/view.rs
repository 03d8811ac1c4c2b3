//! Bunsen view types
//!
//! A view is `{version, type, cells, cellDefinitions}`. Cells may inherit from
//! named cell definitions via `extends`; resolving that inheritance is the job
//! of the cell resolver in the root crate, these are just the documents.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The only view version this engine renders
pub const SUPPORTED_VIEW_VERSION: &str = "2.0";

// ============================================================================
// VIEW
// ============================================================================

/// Whether a view renders an editable form or a read-only detail page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    #[default]
    Form,
    Detail,
}

/// A complete bunsen view document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub version: String,
    #[serde(rename = "type", default)]
    pub view_type: ViewType,
    pub cells: Vec<Cell>,
    /// Named cells other cells may extend. Accepts either a mapping of
    /// `id -> cell` or a list of cells that each carry an `id`.
    #[serde(
        default,
        deserialize_with = "deserialize_cell_definitions",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub cell_definitions: BTreeMap<String, Cell>,
}

impl View {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self {
            version: SUPPORTED_VIEW_VERSION.to_string(),
            view_type: ViewType::Form,
            cells,
            cell_definitions: BTreeMap::new(),
        }
    }

    /// Builder-style cell definition registration
    pub fn with_definition(mut self, id: impl Into<String>, cell: Cell) -> Self {
        self.cell_definitions.insert(id.into(), cell);
        self
    }

    pub fn cell_definition(&self, id: &str) -> Option<&Cell> {
        self.cell_definitions.get(id)
    }

    pub fn is_detail(&self) -> bool {
        self.view_type == ViewType::Detail
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CellDefinitionsRepr {
    Map(BTreeMap<String, Cell>),
    List(Vec<Cell>),
}

fn deserialize_cell_definitions<'de, D>(deserializer: D) -> Result<BTreeMap<String, Cell>, D::Error>
where
    D: Deserializer<'de>,
{
    match CellDefinitionsRepr::deserialize(deserializer)? {
        CellDefinitionsRepr::Map(map) => Ok(map),
        CellDefinitionsRepr::List(list) => {
            let mut map = BTreeMap::new();
            for (index, cell) in list.into_iter().enumerate() {
                let id = cell.id.clone().ok_or_else(|| {
                    de::Error::custom(format!("cellDefinitions[{}] is missing an id", index))
                })?;
                map.insert(id, cell);
            }
            Ok(map)
        }
    }
}

// ============================================================================
// CELLS
// ============================================================================

/// One renderable unit of a view
///
/// Every field is optional so that a cell can be overlaid on the definition it
/// extends: an explicit value on the extending cell wins over the inherited one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Id of the cell definition this cell inherits from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    /// Dotted value path, relative to the enclosing cell's model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer: Option<RendererConfig>,
    /// Template for the items of an array cell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Box<ArrayItemCell>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsible: Option<bool>,
    /// Value path whose truthiness gates the visibility of this cell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_names: Option<ClassNames>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transforms: Option<Transforms>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_label: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Cell>>,
    /// Append own children to inherited ones instead of replacing them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_children: Option<bool>,
}

impl Cell {
    /// A cell bound to a model path
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..Default::default()
        }
    }

    /// A cell that only extends a named definition
    pub fn extending(id: impl Into<String>) -> Self {
        Self {
            extends: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Cell>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn with_renderer(mut self, name: impl Into<String>) -> Self {
        self.renderer = Some(RendererConfig::named(name));
        self
    }

    pub fn children(&self) -> &[Cell] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn renderer_name(&self) -> Option<&str> {
        self.renderer.as_ref().map(|r| r.name.as_str())
    }

    pub fn is_collapsible(&self) -> bool {
        self.collapsible == Some(true)
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled == Some(true)
    }

    /// Whether `item.autoAdd` is switched on
    pub fn auto_add(&self) -> bool {
        self.item.as_ref().map(|i| i.auto_add()).unwrap_or(false)
    }
}

/// Array item template (`cell.item`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayItemCell {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer: Option<RendererConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_add: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sortable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compact: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Cell>>,
}

impl ArrayItemCell {
    pub fn auto_add(&self) -> bool {
        self.auto_add == Some(true)
    }

    /// Items render inline unless explicitly switched off
    pub fn is_inline(&self) -> bool {
        self.inline.unwrap_or(true)
    }

    pub fn is_sortable(&self) -> bool {
        self.sortable == Some(true)
    }

    pub fn is_compact(&self) -> bool {
        self.compact == Some(true)
    }

    /// The add button is redundant when a pending empty slot is always present
    pub fn show_add_button(&self) -> bool {
        self.is_inline() && !self.auto_add()
    }
}

/// Renderer override of a cell: a registry name plus free-form settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RendererConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
    /// Renderer-specific keys such as `valueRef`, `refs` or `choices`
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl RendererConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Look a setting up among the renderer keys, then among `options`
    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key).or_else(|| self.options.get(key))
    }

    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.setting(key).and_then(Value::as_str)
    }
}

/// Extra class names applied to parts of a rendered cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassNames {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Value transforms applied on the way in (`read`) and out (`write`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transforms {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub read: Vec<Transform>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub write: Vec<Transform>,
}

/// A string replacement transform
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub from: String,
    pub to: String,
    /// Treat `from` as a regular expression
    #[serde(default)]
    pub regex: bool,
    /// Replace every match instead of the first one
    #[serde(default)]
    pub global: bool,
}
