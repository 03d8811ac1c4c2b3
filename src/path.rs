//! Path Resolver
//!
//! Converts bunsen ids (dotted value paths) into schema paths through
//! `properties`, `items` and `dependencies`, and provides the small id
//! helpers used when composing render paths.

use std::collections::HashMap;

use bunsen_types::Model;
use serde_json::Value;

use crate::value::is_clearing_value;

/// Pure non-negative integer segments address array items
pub fn is_index_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Split on `.`, rejecting empty, leading-dot and trailing-dot paths
fn strict_segments(path: &str) -> Option<Vec<&str>> {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    Some(parts)
}

// ============================================================================
// MODEL PATHS
// ============================================================================

/// Schema path of `value_path`, e.g. `foo.0.bar` -> `properties.foo.items.properties.bar`
///
/// With a `dependency_path` (such as `paymentInfo.useEft`) the path enters
/// `dependencies.<leaf>` of the object owning the dependency, right before the
/// first property read from that object. Returns `None` for empty segments or
/// when the dependency owner is not on the value path.
pub fn model_path(value_path: &str, dependency_path: Option<&str>) -> Option<String> {
    let parts = strict_segments(value_path)?;

    let dependency = match dependency_path {
        Some(dep) => {
            let dep_parts = strict_segments(dep)?;
            let (leaf, owner) = dep_parts.split_last()?;
            let owner_keys: Vec<&str> = owner
                .iter()
                .copied()
                .filter(|s| !is_index_segment(s))
                .collect();
            Some((leaf.to_string(), owner_keys))
        }
        None => None,
    };

    let mut tokens: Vec<&str> = Vec::with_capacity(parts.len() * 2 + 2);
    let mut consumed: Vec<&str> = Vec::new();
    let mut inserted = false;

    for segment in &parts {
        if is_index_segment(segment) {
            tokens.push("items");
            continue;
        }
        if let Some((leaf, owner)) = &dependency {
            if !inserted && consumed == *owner {
                tokens.push("dependencies");
                tokens.push(leaf);
                inserted = true;
            }
        }
        tokens.push("properties");
        tokens.push(segment);
        consumed.push(segment);
    }

    if dependency.is_some() && !inserted {
        return None;
    }

    Some(tokens.join("."))
}

/// Memo table for [`model_path`], keyed by `(value_path, dependency_path)`
#[derive(Debug, Default)]
pub struct ModelPathCache {
    entries: HashMap<(String, Option<String>), Option<String>>,
}

impl ModelPathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model_path(&mut self, value_path: &str, dependency_path: Option<&str>) -> Option<String> {
        let key = (value_path.to_string(), dependency_path.map(str::to_string));
        self.entries
            .entry(key)
            .or_insert_with(|| model_path(value_path, dependency_path))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries; called when the host swaps the model
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// The schema node a value path designates
pub fn sub_model<'a>(
    model: &'a Model,
    value_path: &str,
    dependency_path: Option<&str>,
) -> Option<&'a Model> {
    if value_path.is_empty() && dependency_path.is_none() {
        return Some(model);
    }
    model.at_schema_path(&model_path(value_path, dependency_path)?)
}

/// The schema node for `value_path`, activating `dependencies` whose key is
/// present (and not cleared) on the value object being walked
pub fn resolve_model_for_value<'a>(
    model: &'a Model,
    value_path: &str,
    root: &Value,
) -> Option<&'a Model> {
    if value_path.is_empty() {
        return Some(model);
    }

    let mut current = model;
    let mut value = Some(root);

    for segment in strict_segments(value_path)? {
        if is_index_segment(segment) {
            current = current.items.as_deref()?;
            value = value.and_then(|v| v.as_array()?.get(segment.parse::<usize>().ok()?));
            continue;
        }

        let owner = value.and_then(Value::as_object);
        let next = current.properties.get(segment).or_else(|| {
            current
                .dependencies
                .iter()
                .filter(|(key, _)| {
                    owner
                        .map(|obj| !is_clearing_value(obj.get(key.as_str())))
                        .unwrap_or(false)
                })
                .find_map(|(_, dep)| dep.properties.get(segment))
        })?;

        current = next;
        value = owner.and_then(|obj| obj.get(segment));
    }

    Some(current)
}

// ============================================================================
// RENDER IDS
// ============================================================================

/// Bunsen id of a cell rendered below `parent_id`
pub fn render_id(parent_id: &str, cell_model: Option<&str>) -> String {
    match cell_model {
        Some(model) if !model.is_empty() => {
            if parent_id.is_empty() {
                model.to_string()
            } else {
                format!("{}.{}", parent_id, model)
            }
        }
        _ => parent_id.to_string(),
    }
}

/// The id with array indices removed (`addresses.0.street` -> `addresses.street`)
pub fn non_index_id(id: &str) -> String {
    id.split('.')
        .filter(|s| !is_index_segment(s))
        .collect::<Vec<_>>()
        .join(".")
}

/// Whether the id designates an array item
pub fn is_array_item(id: &str) -> bool {
    id.rsplit('.').next().map(is_index_segment).unwrap_or(false)
}

/// Index of the array item the id designates
pub fn item_index(id: &str) -> Option<usize> {
    let last = id.rsplit('.').next()?;
    if is_index_segment(last) {
        last.parse().ok()
    } else {
        None
    }
}

/// Everything before the last segment, `""` for top level ids
pub fn parent_id(id: &str) -> &str {
    id.rfind('.').map(|pos| &id[..pos]).unwrap_or("")
}

/// Last segment of the id
pub fn leaf_key(id: &str) -> &str {
    id.rsplit('.').next().unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bunsen_types::ModelKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn payment_model() -> Model {
        serde_json::from_value(json!({
            "type": "object",
            "properties": {
                "paymentInfo": {
                    "type": "object",
                    "properties": {"useEft": {"type": "boolean"}},
                    "dependencies": {
                        "useEft": {
                            "type": "object",
                            "properties": {"routingNumber": {"type": "string"}}
                        }
                    }
                },
                "addresses": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {"street": {"type": "string", "title": "Street"}}
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_model_path_top_level_and_nested() {
        assert_eq!(model_path("fooBar", None).unwrap(), "properties.fooBar");
        assert_eq!(
            model_path("foo.bar.baz", None).unwrap(),
            "properties.foo.properties.bar.properties.baz"
        );
        assert_eq!(
            model_path("foo.bar.0.baz", None).unwrap(),
            "properties.foo.properties.bar.items.properties.baz"
        );
    }

    #[test]
    fn test_model_path_rejects_empty_segments() {
        assert_eq!(model_path("foo.bar.", None), None);
        assert_eq!(model_path(".foo.bar", None), None);
        assert_eq!(model_path("", None), None);
        assert_eq!(model_path("foo..bar", None), None);
    }

    #[test]
    fn test_model_path_with_dependency() {
        assert_eq!(
            model_path("routingNumber", Some("useEft")).unwrap(),
            "dependencies.useEft.properties.routingNumber"
        );
        assert_eq!(
            model_path("paymentInfo.routingNumber", Some("paymentInfo.useEft")).unwrap(),
            "properties.paymentInfo.dependencies.useEft.properties.routingNumber"
        );
        assert_eq!(
            model_path("foo.0.baz", Some("foo.0.bar")).unwrap(),
            "properties.foo.items.dependencies.bar.properties.baz"
        );
        assert_eq!(model_path("other.x", Some("paymentInfo.useEft")), None);
    }

    #[test]
    fn test_cache_memoizes() {
        let mut cache = ModelPathCache::new();
        assert_eq!(cache.model_path("a.0.b", None), model_path("a.0.b", None));
        assert_eq!(cache.model_path("a.0.b", None), model_path("a.0.b", None));
        assert_eq!(cache.model_path(".a", None), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_sub_model() {
        let model = payment_model();
        let street = sub_model(&model, "addresses.3.street", None).unwrap();
        assert_eq!(street.title.as_deref(), Some("Street"));

        let routing = sub_model(&model, "paymentInfo.routingNumber", Some("paymentInfo.useEft"));
        assert_eq!(routing.and_then(|m| m.kind), Some(ModelKind::String));
        assert!(sub_model(&model, "paymentInfo.routingNumber", None).is_none());
    }

    #[test]
    fn test_resolve_model_activates_present_dependencies() {
        let model = payment_model();
        let active = json!({"paymentInfo": {"useEft": true}});
        let inactive = json!({"paymentInfo": {}});

        assert!(resolve_model_for_value(&model, "paymentInfo.routingNumber", &active).is_some());
        assert!(resolve_model_for_value(&model, "paymentInfo.routingNumber", &inactive).is_none());
        assert!(resolve_model_for_value(&model, "addresses.0.street", &inactive).is_some());
    }

    #[test]
    fn test_id_helpers() {
        assert_eq!(render_id("", Some("foo")), "foo");
        assert_eq!(render_id("addresses.0", Some("street")), "addresses.0.street");
        assert_eq!(render_id("addresses", None), "addresses");
        assert_eq!(non_index_id("addresses.0.street"), "addresses.street");
        assert!(is_array_item("addresses.10"));
        assert!(!is_array_item("addresses"));
        assert_eq!(item_index("addresses.10"), Some(10));
        assert_eq!(parent_id("a.b.c"), "a.b");
        assert_eq!(parent_id("a"), "");
        assert_eq!(leaf_key("a.b.c"), "c");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_segment() -> impl Strategy<Value = String> {
            prop_oneof![
                "[a-hj-zA-Z_][a-zA-Z0-9_]{0,8}",
                (0usize..50).prop_map(|n| n.to_string()),
            ]
        }

        proptest! {
            #[test]
            fn property_paths_never_produce_items(parts in prop::collection::vec("[a-hj-zA-Z_][a-zA-Z0-9_]{0,8}", 1..6)) {
                let path = parts.join(".");
                let resolved = model_path(&path, None).unwrap();
                prop_assert!(!resolved.split('.').any(|t| t == "items"));
            }

            #[test]
            fn each_index_segment_contributes_one_items(parts in prop::collection::vec(arb_segment(), 1..8)) {
                let path = parts.join(".");
                let resolved = model_path(&path, None).unwrap();
                let tokens: Vec<&str> = resolved.split('.').collect();

                let indices = parts.iter().filter(|p| is_index_segment(p)).count();
                let items = tokens.iter().filter(|t| **t == "items").count();
                prop_assert_eq!(indices, items);

                for window in tokens.windows(2) {
                    if window[0] == "properties" {
                        prop_assert!(!is_index_segment(window[1]));
                    }
                }
            }

            #[test]
            fn dotted_edges_are_rejected(parts in prop::collection::vec(arb_segment(), 1..5)) {
                let path = parts.join(".");
                let leading = format!(".{}", path);
                let trailing = format!("{}.", path);
                prop_assert!(model_path(&leading, None).is_none());
                prop_assert!(model_path(&trailing, None).is_none());
            }
        }
    }
}
