//! Input capability interface and its variants
//!
//! Every leaf input implements [`Input`]. The form talks to inputs only
//! through this trait: user edits go in through `user_input`, derived state is
//! refreshed through `form_value_changed`, and asynchronous option loading goes
//! through `options_request` / `apply_options`.

pub mod button_group;
pub mod geolocation;
pub mod hidden;
pub mod number;
pub mod property_chooser;
pub mod select;
pub mod text;
pub mod transform;

use async_trait::async_trait;
use bunsen_types::{Cell, Model, OptionItem};
use serde_json::Value;

use crate::change::{ChangeEvent, ErrorEvent};
use crate::error::Result;
use crate::options::OptionsRequest;
use crate::value::is_clearing_value;

pub use button_group::ButtonGroupInput;
pub use geolocation::GeolocationInput;
pub use hidden::HiddenInput;
pub use number::NumberInput;
pub use property_chooser::PropertyChooserInput;
pub use select::SelectInput;
pub use text::{BooleanInput, StaticInput, TextInput};
pub use transform::{apply_transform, apply_transforms};

/// Fetches JSON documents for inputs that talk to external services
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Value>;
}

// ============================================================================
// INPUT BASE
// ============================================================================

/// What every input knows about itself
#[derive(Debug, Clone, PartialEq)]
pub struct InputBase {
    pub id: String,
    pub model: Model,
    pub cell: Cell,
}

impl InputBase {
    pub fn new(id: impl Into<String>, model: Model, cell: Cell) -> Self {
        Self {
            id: id.into(),
            model,
            cell,
        }
    }

    /// String value after the cell's write transforms
    pub fn write_transformed(&self, value: Value) -> Value {
        match (value, self.cell.transforms.as_ref()) {
            (Value::String(text), Some(transforms)) if !transforms.write.is_empty() => {
                Value::String(apply_transforms(&text, &transforms.write))
            }
            (value, _) => value,
        }
    }

    /// String value after the cell's read transforms
    pub fn read_transformed(&self, value: Value) -> Value {
        match (value, self.cell.transforms.as_ref()) {
            (Value::String(text), Some(transforms)) if !transforms.read.is_empty() => {
                Value::String(apply_transforms(&text, &transforms.read))
            }
            (value, _) => value,
        }
    }

    /// A renderer setting (`renderer.<key>` or `renderer.options.<key>`)
    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.cell.renderer.as_ref().and_then(|r| r.setting(key))
    }

    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.setting(key).and_then(Value::as_str)
    }
}

// ============================================================================
// CAPABILITY INTERFACE
// ============================================================================

/// A leaf input
pub trait Input: Send {
    fn base(&self) -> &InputBase;

    /// Component identifier this input implements
    fn component(&self) -> &'static str;

    fn id(&self) -> &str {
        &self.base().id
    }

    /// Widget value -> form value; `None` clears the field
    fn parse_value(&self, raw: &Value) -> Option<Value> {
        if is_clearing_value(Some(raw)) {
            None
        } else {
            Some(self.base().write_transformed(raw.clone()))
        }
    }

    /// Form value -> widget value
    fn render_value(&self, value: Option<&Value>) -> Value {
        match value {
            Some(v) => self.base().read_transformed(v.clone()),
            None => Value::Null,
        }
    }

    /// Changes produced by a user edit; `root` is the form value before it
    fn user_input(&mut self, raw: &Value, _root: &Value) -> Vec<ChangeEvent> {
        vec![ChangeEvent {
            path: self.id().to_string(),
            value: self.parse_value(raw),
        }]
    }

    /// Absolute value paths this input's derived state reads
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Refresh derived state; returned changes are delivered deferred
    fn form_value_changed(&mut self, _root: &Value) -> Vec<ChangeEvent> {
        Vec::new()
    }

    /// A fetch this input wants issued, if any
    fn options_request(&mut self, _root: &Value) -> Option<OptionsRequest> {
        None
    }

    /// Deliver the outcome of a fetch issued in `generation`
    fn apply_options(
        &mut self,
        _generation: u64,
        _result: Result<Vec<OptionItem>>,
    ) -> Option<ErrorEvent> {
        None
    }

    /// Options currently offered
    fn options(&self) -> &[OptionItem] {
        &[]
    }

    /// URL to look up a location with, for location-aware inputs
    fn reverse_lookup_url(&self, _latitude: f64, _longitude: f64) -> Option<String> {
        None
    }

    /// Changes derived from a reverse lookup response
    fn location_changes(&mut self, _response: &Value, _latitude: f64, _longitude: f64) -> Vec<ChangeEvent> {
        Vec::new()
    }

    /// Stop reacting; late callbacks become no-ops
    fn destroy(&mut self) {}
}

/// Build the input implementing `component`
///
/// Components outside the built-in set (host supplied renderers) are driven
/// like a text input.
pub fn build_input(component: &str, id: &str, model: &Model, cell: &Cell) -> Box<dyn Input> {
    let base = InputBase::new(id, model.clone(), cell.clone());
    match component {
        "bunsen-input-boolean" => Box::new(BooleanInput::new(base)),
        "bunsen-input-button-group" => Box::new(ButtonGroupInput::new(base)),
        "bunsen-input-geolocation" => Box::new(GeolocationInput::new(base)),
        "bunsen-input-hidden" => Box::new(HiddenInput::new(base)),
        "bunsen-input-multi-select" => Box::new(SelectInput::new(base, true)),
        "bunsen-input-number" => Box::new(NumberInput::new(base)),
        "bunsen-input-property-chooser" => Box::new(PropertyChooserInput::new(base)),
        "bunsen-input-select" => Box::new(SelectInput::new(base, false)),
        "bunsen-input-static" => Box::new(StaticInput::new(base)),
        "bunsen-input-password" => Box::new(TextInput::with_type(base, "password")),
        "bunsen-input-textarea" => Box::new(TextInput::with_type(base, "textarea")),
        "bunsen-input-url" => Box::new(TextInput::with_type(base, "url")),
        _ => Box::new(TextInput::new(base)),
    }
}
