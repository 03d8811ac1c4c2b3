//! Change dispatcher
//!
//! Inputs declare the absolute value paths their derived state reads (query
//! references, `valueRef`s, geolocation `refs`). After each change the form
//! diffs the old and new trees and only notifies inputs whose declared paths
//! intersect a changed path.

use serde_json::Value;
use tracing::debug;

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// Roots of the subtrees that differ between `old` and `new`
pub fn changed_paths(old: &Value, new: &Value) -> Vec<String> {
    let mut changed = Vec::new();
    diff_into(old, new, "", &mut changed);
    changed
}

fn diff_into(old: &Value, new: &Value, path: &str, changed: &mut Vec<String>) {
    if old == new {
        return;
    }

    match (old, new) {
        (Value::Object(a), Value::Object(b)) => {
            for (key, old_child) in a {
                match b.get(key) {
                    Some(new_child) => diff_into(old_child, new_child, &child_path(path, key), changed),
                    None => changed.push(child_path(path, key)),
                }
            }
            for key in b.keys().filter(|k| !a.contains_key(*k)) {
                changed.push(child_path(path, key));
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            for index in 0..a.len().max(b.len()) {
                let key = index.to_string();
                match (a.get(index), b.get(index)) {
                    (Some(x), Some(y)) => diff_into(x, y, &child_path(path, &key), changed),
                    _ => changed.push(child_path(path, &key)),
                }
            }
        }
        _ => changed.push(path.to_string()),
    }
}

/// Whether `a` and `b` designate the same subtree or one contains the other
pub fn paths_intersect(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() || a == b {
        return true;
    }
    let (short, long) = if a.len() < b.len() { (a, b) } else { (b, a) };
    long.starts_with(short) && long.as_bytes().get(short.len()) == Some(&b'.')
}

/// Registry of the paths each input reads
#[derive(Debug, Default, Clone)]
pub struct ChangeDispatcher {
    subscriptions: Vec<(String, Vec<String>)>,
}

impl ChangeDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or replace) the paths read by the input at `input_id`
    pub fn subscribe(&mut self, input_id: impl Into<String>, paths: Vec<String>) {
        let input_id = input_id.into();
        self.subscriptions.retain(|(id, _)| *id != input_id);
        if !paths.is_empty() {
            self.subscriptions.push((input_id, paths));
        }
    }

    pub fn unsubscribe(&mut self, input_id: &str) {
        self.subscriptions.retain(|(id, _)| id != input_id);
    }

    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Inputs whose declared paths intersect one of `changed`
    pub fn affected(&self, changed: &[String]) -> Vec<String> {
        let affected: Vec<String> = self
            .subscriptions
            .iter()
            .filter(|(_, paths)| {
                paths
                    .iter()
                    .any(|p| changed.iter().any(|c| paths_intersect(p, c)))
            })
            .map(|(id, _)| id.clone())
            .collect();

        debug!(
            "dispatch: {} changed path(s) reach {} input(s)",
            changed.len(),
            affected.len()
        );
        affected
    }

    /// Convenience: diff then match
    pub fn affected_by(&self, old: &Value, new: &Value) -> Vec<String> {
        self.affected(&changed_paths(old, new))
    }
}
