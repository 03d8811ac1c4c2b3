//! Select and multi-select inputs
//!
//! Remote options are fetched through an [`OptionsRequest`] tagged with a
//! generation number. The generation is bumped whenever the populated query
//! changes, stops resolving, or the filter changes, and results are only
//! applied when they carry the current generation.

use bunsen_templates::{has_valid_query_values, referenced_paths};
use bunsen_types::{ErrorEntry, OptionItem};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{Input, InputBase};
use crate::change::{ChangeEvent, ErrorEvent};
use crate::error::Result;
use crate::options::{OptionSource, OptionsRequest, DEFAULT_MODEL_TYPE};

#[derive(Debug, Clone)]
pub struct SelectInput {
    base: InputBase,
    multiple: bool,
    source: OptionSource,
    options: Vec<OptionItem>,
    filter: String,
    generation: u64,
    /// Populated query of the latest request (or of the pending one)
    current_query: Option<Map<String, Value>>,
    needs_fetch: bool,
    destroyed: bool,
}

impl SelectInput {
    pub fn new(base: InputBase, multiple: bool) -> Self {
        let source = OptionSource::from_model(&base.model, &base.cell);
        let options = source.local_options("");
        Self {
            base,
            multiple,
            source,
            options,
            filter: String::new(),
            generation: 0,
            current_query: None,
            needs_fetch: true,
            destroyed: false,
        }
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Disabled while the query still references empty values
    pub fn is_disabled(&self, root: &Value) -> bool {
        self.base.cell.is_disabled()
            || !has_valid_query_values(root, self.source.query.as_ref(), Some(&self.base.id))
    }

    /// Narrow the options to those matching `filter`
    pub fn set_filter(&mut self, filter: &str) {
        if self.destroyed || self.filter == filter {
            return;
        }
        self.filter = filter.to_string();
        if self.source.is_remote() {
            self.invalidate();
        } else {
            self.options = self.source.local_options(filter);
        }
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.needs_fetch = true;
    }

    /// Template variables for the option holding `value`
    pub fn template_variables(&self, value: Option<&Value>) -> Map<String, Value> {
        let value = value.cloned().unwrap_or_else(|| Value::String(String::new()));
        let found = self.options.iter().position(|o| o.value == value);

        let mut vars = Map::new();
        vars.insert("id".into(), Value::String(self.base.id.clone()));
        vars.insert(
            "index".into(),
            found.map(Value::from).unwrap_or_else(|| Value::from(-1)),
        );
        vars.insert(
            "label".into(),
            Value::String(found.map(|i| self.options[i].label.clone()).unwrap_or_default()),
        );
        vars.insert("value".into(), value);
        vars
    }
}

impl Input for SelectInput {
    fn base(&self) -> &InputBase {
        &self.base
    }

    fn component(&self) -> &'static str {
        if self.multiple {
            "bunsen-input-multi-select"
        } else {
            "bunsen-input-select"
        }
    }

    /// Single selects report the first selected entry, multi-selects the list
    fn parse_value(&self, raw: &Value) -> Option<Value> {
        match (raw, self.multiple) {
            (Value::Array(items), false) => items.first().cloned(),
            (Value::Array(items), true) if items.is_empty() => None,
            (Value::Array(_), true) => Some(raw.clone()),
            (Value::Null, _) => None,
            (other, true) => Some(Value::Array(vec![other.clone()])),
            (other, false) => Some(other.clone()),
        }
    }

    fn dependencies(&self) -> Vec<String> {
        self.source
            .query
            .as_ref()
            .map(|q| referenced_paths(q, Some(&self.base.id)))
            .unwrap_or_default()
    }

    fn form_value_changed(&mut self, root: &Value) -> Vec<ChangeEvent> {
        if self.destroyed || !self.source.is_remote() {
            return Vec::new();
        }

        if !has_valid_query_values(root, self.source.query.as_ref(), Some(&self.base.id)) {
            if self.current_query.take().is_some() {
                debug!("query for '{}' no longer resolves", self.base.id);
                self.invalidate();
                self.options = self.source.local_options(&self.filter);
            }
            return Vec::new();
        }

        match self.source.populated_query(root, &self.base.id, &self.filter) {
            Ok(query) if self.current_query.as_ref() != Some(&query) => {
                debug!("query for '{}' changed", self.base.id);
                self.current_query = Some(query);
                self.invalidate();
            }
            Ok(_) => {}
            Err(e) => debug!("no query possible yet for '{}': {}", self.base.id, e),
        }
        Vec::new()
    }

    fn options_request(&mut self, root: &Value) -> Option<OptionsRequest> {
        if self.destroyed || !self.needs_fetch || !self.source.is_remote() {
            return None;
        }
        if !has_valid_query_values(root, self.source.query.as_ref(), Some(&self.base.id)) {
            return None;
        }

        let query = match self.source.populated_query(root, &self.base.id, &self.filter) {
            Ok(query) => query,
            Err(e) => {
                debug!("no query possible yet for '{}': {}", self.base.id, e);
                return None;
            }
        };

        self.needs_fetch = false;
        self.current_query = Some(query.clone());
        Some(OptionsRequest {
            bunsen_id: self.base.id.clone(),
            generation: self.generation,
            model_type: self
                .source
                .model_type
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL_TYPE.to_string()),
            query,
            label_attribute: self.source.label_attribute.clone(),
            value_attribute: self.source.value_attribute.clone(),
        })
    }

    fn apply_options(&mut self, generation: u64, result: Result<Vec<OptionItem>>) -> Option<ErrorEvent> {
        if self.destroyed {
            debug!("'{}' destroyed, ignoring option response", self.base.id);
            return None;
        }
        if generation != self.generation {
            warn!(
                "discarding stale options for '{}' (generation {} != {})",
                self.base.id, generation, self.generation
            );
            return None;
        }

        match result {
            Ok(items) => {
                let mut options = self.source.local_options(&self.filter);
                options.extend(items);
                self.options = options;
                None
            }
            Err(e) => Some(ErrorEvent::new(
                self.base.id.clone(),
                vec![ErrorEntry::new(self.base.id.clone(), e.to_string())],
            )),
        }
    }

    fn options(&self) -> &[OptionItem] {
        &self.options
    }

    fn destroy(&mut self) {
        self.destroyed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BunsenError;
    use bunsen_types::{Cell, Model, ModelKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn remote_select() -> SelectInput {
        let model: Model = serde_json::from_value(json!({
            "type": "string",
            "modelType": "user",
            "query": {"q": "org:${./org}"}
        }))
        .unwrap();
        SelectInput::new(InputBase::new("owner", model, Cell::for_model("owner")), false)
    }

    #[test]
    fn test_enum_select_has_local_options() {
        let model = Model {
            enum_values: Some(vec![json!("a"), json!("b")]),
            ..Model::of_kind(ModelKind::String)
        };
        let mut select = SelectInput::new(InputBase::new("x", model, Cell::for_model("x")), false);
        assert_eq!(select.options().len(), 2);
        assert!(select.options_request(&json!({})).is_none());

        select.set_filter("b");
        assert_eq!(select.options(), &[OptionItem::new("b", json!("b"))]);
    }

    #[test]
    fn test_parse_value() {
        let single = remote_select();
        assert_eq!(single.parse_value(&json!(["a", "b"])), Some(json!("a")));
        assert_eq!(single.parse_value(&json!([])), None);

        let multi = SelectInput::new(single.base.clone(), true);
        assert_eq!(multi.parse_value(&json!(["a", "b"])), Some(json!(["a", "b"])));
        assert_eq!(multi.parse_value(&json!([])), None);
    }

    #[test]
    fn test_request_waits_for_query_values() {
        let mut select = remote_select();
        assert!(select.is_disabled(&json!({})));
        assert!(select.options_request(&json!({})).is_none());

        let value = json!({"org": "acme"});
        let request = select.options_request(&value).unwrap();
        assert_eq!(request.query["q"], json!("org:acme"));
        assert_eq!(request.model_type, "user");
        assert!(select.options_request(&value).is_none());
    }

    #[test]
    fn test_stale_results_are_discarded() {
        let mut select = remote_select();
        let first = select.options_request(&json!({"org": "a"})).unwrap();

        select.form_value_changed(&json!({"org": "b"}));
        let second = select.options_request(&json!({"org": "b"})).unwrap();
        assert!(second.generation > first.generation);

        let stale = select.apply_options(first.generation, Ok(vec![OptionItem::new("A", json!(1))]));
        assert!(stale.is_none());
        assert!(select.options().is_empty());

        select.apply_options(second.generation, Ok(vec![OptionItem::new("B", json!(2))]));
        assert_eq!(select.options(), &[OptionItem::new("B", json!(2))]);
    }

    #[test]
    fn test_response_dropped_once_query_stops_resolving() {
        let mut select = remote_select();
        let request = select.options_request(&json!({"org": "acme"})).unwrap();

        // org is cleared while the fetch is in flight
        select.form_value_changed(&json!({}));
        select.apply_options(request.generation, Ok(vec![OptionItem::new("Acme user", json!(1))]));
        assert!(select.options().is_empty());
        assert!(select.options_request(&json!({})).is_none());

        // the same org again needs a fresh fetch
        let again = select.options_request(&json!({"org": "acme"})).unwrap();
        assert!(again.generation > request.generation);
    }

    #[test]
    fn test_unchanged_query_does_not_refetch() {
        let mut select = remote_select();
        let value = json!({"org": "a", "other": 1});
        select.options_request(&value).unwrap();
        select.form_value_changed(&json!({"org": "a", "other": 2}));
        assert!(select.options_request(&value).is_none());
    }

    #[test]
    fn test_errors_and_destroy() {
        let mut select = remote_select();
        let request = select.options_request(&json!({"org": "a"})).unwrap();

        let event = select
            .apply_options(request.generation, Err(BunsenError::Query("boom".into())))
            .unwrap();
        assert_eq!(event.path, "owner");
        assert_eq!(event.errors[0].message, "query failed: boom");

        select.destroy();
        assert!(select
            .apply_options(request.generation, Err(BunsenError::Query("late".into())))
            .is_none());
        assert!(select.options_request(&json!({"org": "z"})).is_none());
    }

    #[test]
    fn test_dependencies_are_absolute_paths() {
        let select = remote_select();
        assert_eq!(select.dependencies(), vec!["org"]);
    }

    #[test]
    fn test_template_variables() {
        let model = Model {
            enum_values: Some(vec![json!("a"), json!("b")]),
            ..Model::of_kind(ModelKind::String)
        };
        let select = SelectInput::new(InputBase::new("x", model, Cell::for_model("x")), false);
        let vars = select.template_variables(Some(&json!("b")));
        assert_eq!(vars["index"], json!(1));
        assert_eq!(vars["label"], json!("b"));
        assert_eq!(select.template_variables(None)["index"], json!(-1));
    }
}
