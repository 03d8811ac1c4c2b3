//! Property chooser
//!
//! Picks which `dependencies` branch of an object model is active by writing
//! a marker key into the object. Switching branches clears the old key first.

use bunsen_types::OptionItem;
use serde_json::Value;

use super::{Input, InputBase};
use crate::change::ChangeEvent;
use crate::value::get;

/// Marker written under the chosen key
pub const SELECTED_MARKER: &str = "selected";

#[derive(Debug, Clone)]
pub struct PropertyChooserInput {
    base: InputBase,
    choices: Vec<OptionItem>,
}

impl PropertyChooserInput {
    pub fn new(base: InputBase) -> Self {
        let choices = base
            .setting("choices")
            .and_then(|c| serde_json::from_value::<Vec<OptionItem>>(c.clone()).ok())
            .unwrap_or_default();
        Self { base, choices }
    }

    /// The dependency key currently present on this input's value
    pub fn use_key(&self, root: &Value) -> Option<String> {
        let object = get(root, &self.base.id)?.as_object()?;
        self.base
            .model
            .dependencies
            .keys()
            .find(|key| object.contains_key(key.as_str()))
            .cloned()
    }

    /// Changes switching the active branch from `current` to the selection
    pub fn choose(&self, current: Option<&str>, selected: &Value) -> Vec<ChangeEvent> {
        let new_key = match selected {
            Value::Array(items) => match items.first() {
                Some(first) => first.as_str().map(str::to_string),
                None => return Vec::new(),
            },
            Value::String(s) => Some(s.clone()),
            _ => None,
        };

        if new_key.is_some() && new_key.as_deref() == current {
            return Vec::new();
        }

        let mut changes = Vec::new();
        if let Some(old) = current {
            changes.push(ChangeEvent::set(
                format!("{}.{}", self.base.id, old),
                Value::String(String::new()),
            ));
        }
        if let Some(new) = new_key.filter(|k| !k.is_empty()) {
            changes.push(ChangeEvent::set(
                format!("{}.{}", self.base.id, new),
                Value::String(SELECTED_MARKER.to_string()),
            ));
        }
        changes
    }
}

impl Input for PropertyChooserInput {
    fn base(&self) -> &InputBase {
        &self.base
    }

    fn component(&self) -> &'static str {
        "bunsen-input-property-chooser"
    }

    fn options(&self) -> &[OptionItem] {
        &self.choices
    }

    /// Accepts `[<key>]`, `<key>` or `{"selected": [<key>]}`; the branch to
    /// clear is read from the form value
    fn user_input(&mut self, raw: &Value, root: &Value) -> Vec<ChangeEvent> {
        let selected = raw.get("selected").unwrap_or(raw);
        let current = self.use_key(root);
        self.choose(current.as_deref(), selected)
    }

    fn render_value(&self, value: Option<&Value>) -> Value {
        let object = value.and_then(Value::as_object);
        self.base
            .model
            .dependencies
            .keys()
            .find(|key| object.map(|o| o.contains_key(key.as_str())).unwrap_or(false))
            .map(|key| Value::String(key.clone()))
            .unwrap_or(Value::Null)
    }
}
