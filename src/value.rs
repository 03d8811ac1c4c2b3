//! Dotted-path access to the value tree
//!
//! Paths are bunsen ids: `.`-separated segments where pure-digit segments
//! index arrays. Writers create missing intermediates, choosing an array when
//! the next segment is numeric and an object otherwise.

use bunsen_types::Model;
use serde_json::{Map, Value};

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|s| !s.is_empty())
}

fn as_index(segment: &str) -> Option<usize> {
    if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
        segment.parse().ok()
    } else {
        None
    }
}

/// Value at `path`, or `None` when any segment is missing
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments(path) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(as_index(segment)?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn empty_container_for(next: &str) -> Value {
    if as_index(next).is_some() {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

/// Write `new_value` at `path`, creating intermediates as needed
///
/// An empty path replaces the root. Arrays are padded with `null` when the
/// index lies beyond their end.
pub fn set(root: &mut Value, path: &str, new_value: Value) {
    let parts: Vec<&str> = segments(path).collect();
    if parts.is_empty() {
        *root = new_value;
        return;
    }

    let mut current = root;
    for (i, segment) in parts.iter().enumerate() {
        let last = i + 1 == parts.len();
        let next_container = || {
            parts
                .get(i + 1)
                .map(|next| empty_container_for(next))
                .unwrap_or(Value::Null)
        };

        let index = match current {
            Value::Array(_) => as_index(segment),
            _ => None,
        };

        if index.is_none() && !current.is_object() {
            *current = Value::Object(Map::new());
        }

        current = match (current, index) {
            (Value::Array(items), Some(index)) => {
                if items.len() <= index {
                    items.resize(index + 1, Value::Null);
                }
                let slot = &mut items[index];
                if last {
                    *slot = new_value;
                    return;
                }
                if !slot.is_object() && !slot.is_array() {
                    *slot = next_container();
                }
                slot
            }
            (Value::Object(map), _) => {
                if last {
                    map.insert(segment.to_string(), new_value);
                    return;
                }
                let slot = map.entry(segment.to_string()).or_insert(Value::Null);
                if !slot.is_object() && !slot.is_array() {
                    *slot = next_container();
                }
                slot
            }
            _ => return,
        };
    }
}

/// Remove the key (or array element) at `path`, returning what was there
pub fn unset(root: &mut Value, path: &str) -> Option<Value> {
    let (parent_path, leaf) = match path.rfind('.') {
        Some(pos) => (&path[..pos], &path[pos + 1..]),
        None => ("", path),
    };
    if leaf.is_empty() {
        return None;
    }

    match get_mut(root, parent_path)? {
        Value::Object(map) => map.remove(leaf),
        Value::Array(items) => {
            let index = as_index(leaf)?;
            if index < items.len() {
                Some(items.remove(index))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Mutable counterpart of [`get`]
pub fn get_mut<'a>(root: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut current = root;
    for segment in segments(path) {
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(as_index(segment)?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// `undefined`, `null` and the empty string all mean "clear this field"
pub fn is_clearing_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

/// A value with nothing in it: clearing values, `{}` and `[]`
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        other => is_clearing_value(Some(other)),
    }
}

/// Whether every leaf below `value` is empty
pub fn is_deep_empty(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.values().all(is_deep_empty),
        Value::Array(items) => items.iter().all(is_deep_empty),
        other => is_clearing_value(Some(other)),
    }
}

/// Fill absent properties from the model's `default` values
///
/// Existing values are never overwritten. Array items get their item defaults
/// applied one by one. An object is only materialised when at least one
/// default lands in it.
pub fn apply_defaults(model: &Model, value: Option<&Value>) -> Option<Value> {
    match value {
        None | Some(Value::Null) => {
            if let Some(default) = &model.default {
                return Some(default.clone());
            }
            if model.is_object() {
                let filled = fill_properties(model, Map::new());
                if !filled.is_empty() {
                    return Some(Value::Object(filled));
                }
            }
            value.cloned()
        }
        Some(Value::Object(map)) if model.is_object() => {
            Some(Value::Object(fill_properties(model, map.clone())))
        }
        Some(Value::Array(items)) => match model.items.as_deref() {
            Some(item_model) => Some(Value::Array(
                items
                    .iter()
                    .map(|item| apply_defaults(item_model, Some(item)).unwrap_or(Value::Null))
                    .collect(),
            )),
            None => Some(Value::Array(items.clone())),
        },
        Some(other) => Some(other.clone()),
    }
}

fn fill_properties(model: &Model, mut map: Map<String, Value>) -> Map<String, Value> {
    for (name, child) in &model.properties {
        if let Some(filled) = apply_defaults(child, map.get(name)) {
            if !filled.is_null() {
                map.insert(name.clone(), filled);
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use bunsen_types::ModelKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_get_walks_objects_and_arrays() {
        let value = json!({"foo": [{"bar": 1}, {"bar": 2}]});
        assert_eq!(get(&value, "foo.1.bar"), Some(&json!(2)));
        assert_eq!(get(&value, ""), Some(&value));
        assert_eq!(get(&value, "foo.2.bar"), None);
        assert_eq!(get(&value, "foo.x"), None);
    }

    #[test]
    fn test_set_creates_intermediates() {
        let mut value = json!({});
        set(&mut value, "foo.0.bar", json!("baz"));
        assert_eq!(value, json!({"foo": [{"bar": "baz"}]}));

        set(&mut value, "foo.2", json!("x"));
        assert_eq!(value, json!({"foo": [{"bar": "baz"}, null, "x"]}));

        set(&mut value, "name.first", json!("Ada"));
        assert_eq!(value["name"], json!({"first": "Ada"}));
    }

    #[test]
    fn test_set_on_scalar_root_replaces_it() {
        let mut value = json!(null);
        set(&mut value, "a", json!(1));
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_unset_removes_keys_and_elements() {
        let mut value = json!({"a": {"b": 1, "c": 2}, "list": [1, 2, 3]});
        assert_eq!(unset(&mut value, "a.b"), Some(json!(1)));
        assert_eq!(unset(&mut value, "list.1"), Some(json!(2)));
        assert_eq!(unset(&mut value, "missing.key"), None);
        assert_eq!(value, json!({"a": {"c": 2}, "list": [1, 3]}));
    }

    #[test]
    fn test_clearing_and_empty_values() {
        assert!(is_clearing_value(None));
        assert!(is_clearing_value(Some(&json!(""))));
        assert!(!is_clearing_value(Some(&json!(0))));
        assert!(!is_clearing_value(Some(&json!(false))));
        assert!(is_empty_value(&json!({})));
        assert!(!is_empty_value(&json!({"a": null})));
        assert!(is_deep_empty(&json!({"a": {"b": ""}, "c": []})));
    }

    #[test]
    fn test_apply_defaults_fills_absent_properties() {
        let model = Model::of_kind(ModelKind::Object)
            .with_property(
                "status",
                Model {
                    default: Some(json!("active")),
                    ..Model::of_kind(ModelKind::String)
                },
            )
            .with_property("name", Model::of_kind(ModelKind::String));

        assert_eq!(
            apply_defaults(&model, None),
            Some(json!({"status": "active"}))
        );
        assert_eq!(
            apply_defaults(&model, Some(&json!({"status": "off", "name": "x"}))),
            Some(json!({"status": "off", "name": "x"}))
        );
    }

    #[test]
    fn test_apply_defaults_without_defaults_keeps_absence() {
        let model =
            Model::of_kind(ModelKind::Object).with_property("name", Model::of_kind(ModelKind::String));
        assert_eq!(apply_defaults(&model, None), None);
    }
}
