//! Geolocation input
//!
//! Fills address fields from a coordinate pair. Each address field listed in
//! `renderer.refs` is written to the referenced form path; fields without a
//! ref are kept on the input itself.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{Input, InputBase};
use crate::change::ChangeEvent;
use crate::value::get;

pub const REVERSE_ENDPOINT: &str = "http://www.mapquestapi.com/geocoding/v1/reverse";

/// Fields of the location sub-form, in display order
pub const LOCATION_FIELDS: [&str; 7] = [
    "address",
    "city",
    "country",
    "latitude",
    "longitude",
    "postalCode",
    "state",
];

const AREA_TYPES: [&str; 3] = ["city", "state", "country"];

#[derive(Debug, Clone)]
pub struct GeolocationInput {
    base: InputBase,
    refs: BTreeMap<String, String>,
    internal_value: Map<String, Value>,
    destroyed: bool,
}

impl GeolocationInput {
    pub fn new(base: InputBase) -> Self {
        let refs = base
            .setting("refs")
            .and_then(Value::as_object)
            .map(|refs| {
                refs.iter()
                    .filter_map(|(k, v)| v.as_str().map(|r| (k.clone(), r.to_string())))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            base,
            refs,
            internal_value: Map::new(),
            destroyed: false,
        }
    }

    /// Form path a `${./field}` ref points at, relative to this input
    pub fn ref_bunsen_id(&self, reference: &str) -> String {
        let relative = reference
            .strip_prefix("${./")
            .and_then(|r| r.strip_suffix('}'))
            .map(|r| format!(".{}", r))
            .unwrap_or_else(|| reference.to_string());
        format!("{}{}", self.base.id, relative.replace('/', "."))
    }

    /// Values not routed to the form
    pub fn internal_value(&self) -> &Map<String, Value> {
        &self.internal_value
    }

    /// The location sub-form value: ref'd fields read from the form, the rest
    /// from the input's own state
    pub fn sub_form_value(&self, root: &Value) -> Map<String, Value> {
        let mut value = Map::new();
        for field in LOCATION_FIELDS {
            let found = match self.refs.get(field) {
                Some(reference) => get(root, &self.ref_bunsen_id(reference)).cloned(),
                None => self.internal_value.get(field).cloned(),
            };
            if let Some(found) = found {
                value.insert(field.to_string(), found);
            }
        }
        value
    }

    /// Changes for a user edit of the sub-form, given its previous value
    pub fn sub_form_change(&mut self, old: &Map<String, Value>, new: &Map<String, Value>) -> Vec<ChangeEvent> {
        let mut changes = Vec::new();
        for field in LOCATION_FIELDS {
            if old.get(field) == new.get(field) {
                continue;
            }
            if let Some(reference) = self.refs.get(field) {
                changes.push(ChangeEvent {
                    path: self.ref_bunsen_id(reference),
                    value: new.get(field).cloned(),
                });
            }
        }
        self.internal_value = new.clone();
        changes
    }

    fn update_property(&mut self, key: &str, value: Value, changes: &mut Vec<ChangeEvent>) {
        match self.refs.get(key) {
            Some(reference) => changes.push(ChangeEvent::set(self.ref_bunsen_id(reference), value)),
            None => {
                self.internal_value.insert(key.to_string(), value);
            }
        }
    }
}

impl Input for GeolocationInput {
    fn base(&self) -> &InputBase {
        &self.base
    }

    fn component(&self) -> &'static str {
        "bunsen-input-geolocation"
    }

    fn user_input(&mut self, raw: &Value, _root: &Value) -> Vec<ChangeEvent> {
        let Some(new) = raw.as_object() else {
            return Vec::new();
        };
        let old = self.internal_value.clone();
        self.sub_form_change(&old, new)
    }

    fn dependencies(&self) -> Vec<String> {
        vec![self.base.id.clone()]
    }

    fn reverse_lookup_url(&self, latitude: f64, longitude: f64) -> Option<String> {
        let mut url = format!("{}?location={},{}", REVERSE_ENDPOINT, latitude, longitude);
        if let Some(key) = self.base.setting_str("apiKey") {
            url.push_str(&format!("&key={}", key));
        }
        Some(url)
    }

    fn location_changes(&mut self, response: &Value, latitude: f64, longitude: f64) -> Vec<ChangeEvent> {
        if self.destroyed {
            return Vec::new();
        }

        let mut changes = Vec::new();
        self.update_property("latitude", Value::from(latitude), &mut changes);
        self.update_property("longitude", Value::from(longitude), &mut changes);

        let empty = Map::new();
        let location = response
            .pointer("/results/0/locations/0")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        for i in 1..7 {
            let Some(area_type) = location
                .get(&format!("adminArea{}Type", i))
                .and_then(Value::as_str)
            else {
                continue;
            };
            let area_type = area_type.to_lowercase();
            if !AREA_TYPES.contains(&area_type.as_str()) {
                continue;
            }
            match location.get(&format!("adminArea{}", i)) {
                Some(value) if !value.is_null() => {
                    self.update_property(&area_type, value.clone(), &mut changes)
                }
                _ => debug!("no value for adminArea{} ({})", i, area_type),
            }
        }

        for (key, field) in [("postalCode", "postalCode"), ("street", "address")] {
            match location.get(key) {
                Some(Value::String(s)) if s.is_empty() => {}
                Some(value) if !value.is_null() => self.update_property(field, value.clone(), &mut changes),
                _ => {}
            }
        }

        info!("reverse lookup for '{}' produced {} changes", self.base.id, changes.len());
        changes
    }

    fn destroy(&mut self) {
        self.destroyed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bunsen_types::{Cell, Model, ModelKind, RendererConfig};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn geolocation(refs: Value) -> GeolocationInput {
        let mut renderer = RendererConfig::named("geolocation");
        renderer.settings.insert("refs".into(), refs);
        renderer.settings.insert("apiKey".into(), json!("k3y"));
        let cell = Cell {
            renderer: Some(renderer),
            ..Cell::for_model("where")
        };
        GeolocationInput::new(InputBase::new("where", Model::of_kind(ModelKind::Object), cell))
    }

    fn response() -> Value {
        json!({"results": [{"locations": [{
            "adminArea1": "US", "adminArea1Type": "Country",
            "adminArea3": "TX", "adminArea3Type": "State",
            "adminArea5": "Austin", "adminArea5Type": "City",
            "postalCode": "78701",
            "street": "1 Congress Ave"
        }]}]})
    }

    #[test]
    fn test_ref_bunsen_id() {
        let input = geolocation(json!({}));
        assert_eq!(input.ref_bunsen_id("${./city}"), "where.city");
        assert_eq!(input.ref_bunsen_id("${./place/zip}"), "where.place.zip");
    }

    #[test]
    fn test_reverse_lookup_url() {
        let input = geolocation(json!({}));
        assert_eq!(
            input.reverse_lookup_url(30.5, -97.25).unwrap(),
            "http://www.mapquestapi.com/geocoding/v1/reverse?location=30.5,-97.25&key=k3y"
        );
    }

    #[test]
    fn test_location_changes_route_refs_and_keep_the_rest() {
        let mut input = geolocation(json!({
            "city": "${./city}",
            "address": "${./street}",
            "latitude": "${./lat}"
        }));

        let changes = input.location_changes(&response(), 30.5, -97.25);
        assert_eq!(
            changes,
            vec![
                ChangeEvent::set("where.lat", json!(30.5)),
                ChangeEvent::set("where.city", json!("Austin")),
                ChangeEvent::set("where.street", json!("1 Congress Ave")),
            ]
        );
        assert_eq!(input.internal_value()["country"], json!("US"));
        assert_eq!(input.internal_value()["state"], json!("TX"));
        assert_eq!(input.internal_value()["postalCode"], json!("78701"));
        assert_eq!(input.internal_value()["longitude"], json!(-97.25));
    }

    #[test]
    fn test_sub_form_value_and_change() {
        let mut input = geolocation(json!({"city": "${./city}"}));
        let root = json!({"where": {"city": "Austin"}});
        let current = input.sub_form_value(&root);
        assert_eq!(current["city"], json!("Austin"));

        let mut edited = current.clone();
        edited.insert("city".into(), json!("Dallas"));
        edited.insert("state".into(), json!("TX"));
        assert_eq!(
            input.sub_form_change(&current, &edited),
            vec![ChangeEvent::set("where.city", json!("Dallas"))]
        );
        assert_eq!(input.sub_form_value(&root)["state"], json!("TX"));
    }

    #[test]
    fn test_destroyed_ignores_late_response() {
        let mut input = geolocation(json!({"city": "${./city}"}));
        input.destroy();
        assert!(input.location_changes(&response(), 1.0, 2.0).is_empty());
    }
}
