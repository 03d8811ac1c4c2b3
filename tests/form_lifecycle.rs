//! End-to-end form flows
//!
//! Drives a `Form` the way a host would: user edits through inputs, array
//! actions through containers, and checks the resulting value and render tree.
//!
//! Run with: cargo test --test form_lifecycle

use std::sync::{Arc, Mutex};

use bunsen::{BunsenError, ChangeEvent, Form, FormListener, FormOptions, FormStatus, NodeKind};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn model() -> Value {
    json!({
        "type": "object",
        "required": ["name"],
        "properties": {
            "name": {"type": "string"},
            "tags": {"type": "array", "items": {"type": "string"}},
            "addresses": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "street": {"type": "string"},
                        "city": {"type": "string"}
                    }
                }
            }
        }
    })
}

fn auto_add_view() -> Value {
    json!({
        "version": "2.0",
        "type": "form",
        "cells": [{
            "children": [
                {"model": "name"},
                {"model": "tags", "item": {"autoAdd": true}},
                {"model": "addresses", "item": {"autoAdd": true}}
            ]
        }]
    })
}

#[derive(Clone, Default)]
struct Recorder {
    changes: Arc<Mutex<Vec<Value>>>,
    validations: Arc<Mutex<usize>>,
}

impl FormListener for Recorder {
    fn on_change(&mut self, value: &Value) {
        self.changes.lock().unwrap().push(value.clone());
    }

    fn on_validation(&mut self, _result: &bunsen::ValidationResult) {
        *self.validations.lock().unwrap() += 1;
    }
}

#[test]
fn test_auto_add_keeps_a_pending_slot() {
    let mut form = Form::new(&model(), Some(&auto_add_view()), None, FormOptions::default());
    assert_eq!(form.status(), FormStatus::Ready);

    // the pending slot is rendered but not part of the value
    let tags = form.container("tags").unwrap();
    assert_eq!(tags.len(), 1);
    assert!(tags.has_pending_slot());
    assert_eq!(form.value().get("tags"), None);

    form.user_input("tags.0", &json!("rust")).unwrap();
    assert_eq!(form.value()["tags"], json!(["rust"]));
    assert_eq!(form.container("tags").unwrap().len(), 2);
    assert!(form.input("tags.1").is_some());

    let tree = form.render_tree();
    match &tree[0].find("tags.1").unwrap().kind {
        NodeKind::Item { index, pending } => {
            assert_eq!(*index, 1);
            assert!(*pending);
        }
        other => panic!("expected an item node, got {:?}", other),
    }
}

#[test]
fn test_clearing_last_field_removes_item() {
    let mut form = Form::new(&model(), Some(&auto_add_view()), None, FormOptions::default());

    form.user_input("addresses.0.street", &json!("Main")).unwrap();
    assert_eq!(form.value()["addresses"], json!([{"street": "Main"}]));
    assert_eq!(form.container("addresses").unwrap().len(), 2);

    // the item has nothing else in it, so it goes away
    form.user_input("addresses.0.street", &json!("")).unwrap();
    assert_eq!(form.value()["addresses"], json!([{}]));
    assert_eq!(form.container("addresses").unwrap().len(), 1);
}

#[test]
fn test_clearing_one_field_keeps_the_rest_of_the_item() {
    let mut form = Form::new(&model(), Some(&auto_add_view()), None, FormOptions::default());

    form.user_input("addresses.0.street", &json!("Main")).unwrap();
    form.user_input("addresses.0.city", &json!("Springfield")).unwrap();
    form.user_input("addresses.0.street", &json!("")).unwrap();

    assert_eq!(form.value()["addresses"], json!([{"city": "Springfield"}]));
    assert_eq!(form.container("addresses").unwrap().len(), 2);
}

#[test]
fn test_pending_slot_cannot_be_removed() {
    let mut form = Form::new(&model(), Some(&auto_add_view()), None, FormOptions::default());
    form.user_input("tags.0", &json!("a")).unwrap();

    form.remove_item("tags", 1).unwrap();
    assert_eq!(form.value()["tags"], json!(["a"]));
    assert_eq!(form.container("tags").unwrap().len(), 2);
}

#[test]
fn test_move_item_keeps_identities() {
    let value = json!({"name": "Ada", "addresses": [{"city": "A"}, {"city": "B"}]});
    let mut form = Form::new(&model(), None, Some(value), FormOptions::default());

    let before = form.container("addresses").unwrap().item_ids().to_vec();
    form.move_item("addresses", 0, 1).unwrap();

    assert_eq!(form.value()["addresses"], json!([{"city": "B"}, {"city": "A"}]));
    let after = form.container("addresses").unwrap().item_ids().to_vec();
    assert_eq!(after, vec![before[1], before[0]]);
}

#[test]
fn test_listeners_see_every_change() {
    let mut form = Form::new(&model(), None, None, FormOptions::default());
    let recorder = Recorder::default();
    form.add_listener(Box::new(recorder.clone()));

    form.user_input("name", &json!("Ada")).unwrap();
    form.handle_change(ChangeEvent::set("tags", json!(["x"])));
    // no-op edits are not reported
    form.user_input("name", &json!("Ada")).unwrap();

    let changes = recorder.changes.lock().unwrap();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[1], json!({"name": "Ada", "tags": ["x"]}));
    assert_eq!(*recorder.validations.lock().unwrap(), 2);
}

#[test]
fn test_set_value_replaces_everything() {
    let mut form = Form::new(&model(), None, Some(json!({"name": "Ada"})), FormOptions::default());
    form.set_value(json!({"name": "Grace", "addresses": [{"city": "NYC"}]}));

    assert_eq!(form.value()["name"], json!("Grace"));
    assert!(form.input("addresses.0.city").is_some());
    assert!(form.validation().is_valid());
}

#[test]
fn test_unknown_targets_are_errors() {
    let mut form = Form::new(&model(), None, None, FormOptions::default());
    assert!(matches!(
        form.user_input("missing", &json!(1)),
        Err(BunsenError::UnknownInput { .. })
    ));
    assert!(matches!(
        form.add_item("name"),
        Err(BunsenError::UnknownArray { .. })
    ));
}

#[test]
fn test_read_only_renders_static_inputs() {
    let options = FormOptions {
        read_only: true,
        ..FormOptions::default()
    };
    let form = Form::new(&model(), None, None, options);
    let tree = form.render_tree();
    assert_eq!(
        tree[0].find_input("name").unwrap().component(),
        Some("bunsen-input-static")
    );
}

#[test]
fn test_destroyed_form_ignores_changes() {
    let mut form = Form::new(&model(), None, None, FormOptions::default());
    form.destroy();
    assert!(form.is_destroyed());

    form.handle_change(ChangeEvent::set("name", json!("late")));
    assert_eq!(form.value(), &json!({}));
}

fn payment_model() -> Value {
    json!({
        "type": "object",
        "properties": {
            "payment": {
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "dependencies": {
                    "useEft": {"type": "object", "properties": {"routing": {"type": "string"}}},
                    "useCard": {"type": "object", "properties": {"card": {"type": "string"}}}
                }
            }
        }
    })
}

fn payment_view() -> Value {
    json!({
        "version": "2.0",
        "type": "form",
        "cells": [{
            "model": "payment",
            "renderer": {
                "name": "property-chooser",
                "choices": [
                    {"label": "EFT", "value": "useEft"},
                    {"label": "Card", "value": "useCard"}
                ]
            }
        }]
    })
}

#[test]
fn test_property_chooser_switches_branch() {
    let value = json!({"payment": {"useEft": "selected"}});
    let mut form = Form::new(&payment_model(), Some(&payment_view()), Some(value), FormOptions::default());

    form.user_input("payment", &json!(["useCard"])).unwrap();
    assert_eq!(form.value(), &json!({"payment": {"useCard": "selected"}}));

    form.user_input("payment", &json!(["useEft"])).unwrap();
    assert_eq!(form.value(), &json!({"payment": {"useEft": "selected"}}));
}

#[test]
fn test_empty_string_clears_the_key() {
    let value = json!({"payment": {"name": "Ada", "useEft": "selected"}});
    let mut form = Form::new(&payment_model(), Some(&payment_view()), Some(value), FormOptions::default());

    form.handle_change(ChangeEvent::set("payment.name", json!("")));
    assert_eq!(form.value(), &json!({"payment": {"useEft": "selected"}}));
}
