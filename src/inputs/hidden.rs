//! Hidden input
//!
//! Keeps its field equal to another value of the form (`renderer.valueRef`)
//! or, without a reference, to the model default. Its changes are deferred so
//! that several upstream edits in one pass produce a single write.

use serde_json::Value;

use super::{Input, InputBase};
use crate::change::ChangeEvent;
use crate::value::get;

#[derive(Debug, Clone)]
pub struct HiddenInput {
    base: InputBase,
}

impl HiddenInput {
    pub fn new(base: InputBase) -> Self {
        Self { base }
    }

    /// Absolute path of the copied value
    pub fn value_ref(&self) -> Option<&str> {
        self.base.setting_str("valueRef")
    }

    fn target_value(&self, root: &Value) -> Option<Value> {
        match self.value_ref() {
            Some(path) => get(root, path).cloned(),
            None => self.base.model.default.clone(),
        }
    }
}

impl Input for HiddenInput {
    fn base(&self) -> &InputBase {
        &self.base
    }

    fn component(&self) -> &'static str {
        "bunsen-input-hidden"
    }

    fn user_input(&mut self, _raw: &Value, _root: &Value) -> Vec<ChangeEvent> {
        Vec::new()
    }

    fn dependencies(&self) -> Vec<String> {
        self.value_ref().map(|p| vec![p.to_string()]).unwrap_or_default()
    }

    fn form_value_changed(&mut self, root: &Value) -> Vec<ChangeEvent> {
        let target = self.target_value(root);
        let current = get(root, &self.base.id);

        if target.as_ref() == current {
            return Vec::new();
        }
        vec![ChangeEvent {
            path: self.base.id.clone(),
            value: target,
        }]
    }
}
