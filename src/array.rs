//! Array Synchronization Engine
//!
//! Each rendered array owns an [`ArrayContainer`]: a local mirror ("shadow
//! list") of the array value whose items carry stable [`ItemId`]s. External
//! value changes are reconciled into the mirror in place so per-item state
//! bound to an id survives, and item-level user actions are turned into
//! path-qualified change events for the form root.
//!
//! ```text
//! IDLE ── sync(value) ──► SYNCING ── truncate ─► reconcile ─► append ─► auto-add fixup ──┐
//!   ▲                        │                                                           │
//!   │                        └─ resync requested mid-pass: queued (latest wins) ◄────────┤
//!   └──────────────────────────────────── queue empty ───────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::fmt;

use bunsen_types::{Model, ModelKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::change::ChangeEvent;
use crate::path::is_index_segment;
use crate::value::{get, is_empty_value, unset};

// ============================================================================
// TYPES
// ============================================================================

/// Stable identity of one shadow item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Idle,
    Syncing,
}

/// What a sync pass did to one item
#[derive(Debug, Clone, PartialEq)]
pub enum ItemEvent {
    Inserted { id: ItemId, index: usize },
    Updated { id: ItemId, index: usize },
    Removed { id: ItemId },
}

/// Handed to sync observers so they can ask for another pass
///
/// Requests made while a pass runs are replayed once it completes; only the
/// latest request survives.
#[derive(Debug, Default)]
pub struct Resync {
    queued: Option<(Option<Value>, bool)>,
}

impl Resync {
    pub fn request(&mut self, value: Option<Value>, auto_add: bool) {
        self.queued = Some((value, auto_add));
    }

    pub fn is_requested(&self) -> bool {
        self.queued.is_some()
    }
}

// ============================================================================
// CONTAINER
// ============================================================================

#[derive(Debug, Clone)]
pub struct ArrayContainer {
    path: String,
    object_items: bool,
    auto_add: bool,
    state: SyncState,
    next_id: u64,
    order: Vec<ItemId>,
    entries: HashMap<ItemId, Value>,
    destroyed: bool,
}

impl ArrayContainer {
    /// Container for the array at `path`; `item_model` decides the shape of
    /// new empty items (`{}` for objects, `""` otherwise)
    pub fn new(path: impl Into<String>, item_model: Option<&Model>) -> Self {
        let object_items = item_model
            .map(|m| m.kind == Some(ModelKind::Object))
            .unwrap_or(true);
        Self {
            path: path.into(),
            object_items,
            auto_add: false,
            state: SyncState::Idle,
            next_id: 0,
            order: Vec::new(),
            entries: HashMap::new(),
            destroyed: false,
        }
    }

    /// Container for an array model, reading the item model from `items`
    pub fn for_model(path: impl Into<String>, array_model: &Model) -> Self {
        Self::new(path, array_model.items.as_deref())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn auto_add(&self) -> bool {
        self.auto_add
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn item_ids(&self) -> &[ItemId] {
        &self.order
    }

    pub fn item(&self, id: ItemId) -> Option<&Value> {
        self.entries.get(&id)
    }

    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.order.iter().position(|i| *i == id)
    }

    /// Shadow list snapshot, pending slot included
    pub fn items(&self) -> Vec<Value> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).cloned())
            .collect()
    }

    /// Whether the trailing slot is the auto-add placeholder
    pub fn has_pending_slot(&self) -> bool {
        self.auto_add
            && self
                .order
                .last()
                .and_then(|id| self.entries.get(id))
                .map(is_empty_value)
                .unwrap_or(false)
    }

    fn empty_item(&self) -> Value {
        if self.object_items {
            Value::Object(Map::new())
        } else {
            Value::String(String::new())
        }
    }

    fn push(&mut self, item: Value) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, item);
        self.order.push(id);
        id
    }

    fn pop(&mut self) -> Option<ItemId> {
        let id = self.order.pop()?;
        self.entries.remove(&id);
        Some(id)
    }

    fn whole_array(&self) -> ChangeEvent {
        ChangeEvent::set(self.path.clone(), Value::Array(self.items()))
    }

    // ------------------------------------------------------------------------
    // External value changes
    // ------------------------------------------------------------------------

    /// Reconcile the shadow list with the array value `value`
    ///
    /// A missing array counts as empty.
    pub fn sync(&mut self, value: Option<&Value>, auto_add: bool) -> Vec<ItemEvent> {
        self.sync_with(value, auto_add, |_, _| {})
    }

    /// [`sync`](Self::sync), reporting every item event to `observer`
    ///
    /// The observer may request another pass through [`Resync`]; it runs after
    /// the current one finishes, never nested inside it.
    pub fn sync_with<F>(&mut self, value: Option<&Value>, auto_add: bool, mut observer: F) -> Vec<ItemEvent>
    where
        F: FnMut(&ItemEvent, &mut Resync),
    {
        if self.destroyed {
            return Vec::new();
        }

        let mut all_events = Vec::new();
        let mut next: Option<(Option<Value>, bool)> = Some((value.cloned(), auto_add));

        while let Some((value, auto_add)) = next.take() {
            self.state = SyncState::Syncing;
            let events = self.sync_pass(value.as_ref(), auto_add);

            let mut resync = Resync::default();
            for event in &events {
                observer(event, &mut resync);
            }
            all_events.extend(events);

            if let Some(queued) = resync.queued {
                debug!("replaying queued sync for '{}'", self.path);
                next = Some(queued);
            }
        }

        self.state = SyncState::Idle;
        all_events
    }

    fn sync_pass(&mut self, value: Option<&Value>, auto_add: bool) -> Vec<ItemEvent> {
        let mut events = Vec::new();

        // autoAdd transitions
        if auto_add && !self.auto_add {
            let item = self.empty_item();
            let id = self.push(item);
            events.push(ItemEvent::Inserted {
                id,
                index: self.order.len() - 1,
            });
        } else if !auto_add && self.auto_add {
            if let Some(id) = self.pop() {
                events.push(ItemEvent::Removed { id });
            }
        }
        self.auto_add = auto_add;

        let incoming: &[Value] = value.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);

        // set the pending slot aside unless the value has grown into it
        let pending = if self.has_pending_slot() && self.order.len() > incoming.len() {
            self.order.pop()
        } else {
            None
        };

        // truncate
        while self.order.len() > incoming.len() {
            if let Some(id) = self.pop() {
                events.push(ItemEvent::Removed { id });
            }
        }

        // reconcile in place
        for (index, id) in self.order.iter().enumerate() {
            let Some(item) = self.entries.get_mut(id) else {
                continue;
            };
            if *item != incoming[index] {
                reconcile(item, &incoming[index]);
                events.push(ItemEvent::Updated { id: *id, index });
            }
        }

        // append
        for extra in &incoming[self.order.len()..] {
            let id = self.push(extra.clone());
            events.push(ItemEvent::Inserted {
                id,
                index: self.order.len() - 1,
            });
        }

        // the last slot stays empty under autoAdd
        if auto_add {
            let trailing_filled = self
                .order
                .last()
                .and_then(|id| self.entries.get(id))
                .map(|item| !is_empty_value(item))
                .unwrap_or(true);
            match (trailing_filled, pending) {
                (true, Some(id)) => self.order.push(id),
                (true, None) => {
                    let item = self.empty_item();
                    let id = self.push(item);
                    events.push(ItemEvent::Inserted {
                        id,
                        index: self.order.len() - 1,
                    });
                }
                (false, Some(id)) => {
                    self.entries.remove(&id);
                    events.push(ItemEvent::Removed { id });
                }
                (false, None) => {}
            }
        }

        debug!(
            "synced '{}': {} items, {} item events",
            self.path,
            self.order.len(),
            events.len()
        );
        events
    }

    // ------------------------------------------------------------------------
    // User actions
    // ------------------------------------------------------------------------

    /// Append an empty item and announce it at `<path>.<index>`
    pub fn on_add_item(&mut self) -> Option<ChangeEvent> {
        if self.destroyed {
            return None;
        }
        let item = self.empty_item();
        let index = self.order.len();
        self.push(item.clone());
        Some(ChangeEvent::set(format!("{}.{}", self.path, index), item))
    }

    /// Remove the item at `index` and re-emit the whole array
    ///
    /// The pending autoAdd slot cannot be removed, and out-of-range indices
    /// are ignored.
    pub fn on_remove_item(&mut self, index: usize) -> Option<ChangeEvent> {
        if self.destroyed {
            return None;
        }
        let last = self.order.len().saturating_sub(1);
        if self.auto_add && index == last {
            debug!("ignoring removal of pending slot {} of '{}'", index, self.path);
            return None;
        }
        if index >= self.order.len() {
            warn!(
                "cannot remove item {} of '{}': only {} items",
                index,
                self.path,
                self.order.len()
            );
            return None;
        }

        let id = self.order.remove(index);
        self.entries.remove(&id);
        Some(self.whole_array())
    }

    /// Replace the shadow list with `items` and re-emit the whole array
    pub fn on_reorder_items(&mut self, items: Vec<Value>) -> Option<ChangeEvent> {
        if self.destroyed {
            return None;
        }
        self.order.clear();
        self.entries.clear();
        for item in items {
            self.push(item);
        }
        Some(self.whole_array())
    }

    /// Move one item, keeping every item's identity
    pub fn move_item(&mut self, from: usize, to: usize) -> Option<ChangeEvent> {
        if self.destroyed {
            return None;
        }
        if from >= self.order.len() || to >= self.order.len() {
            warn!("cannot move item {} -> {} of '{}'", from, to, self.path);
            return None;
        }
        let id = self.order.remove(from);
        self.order.insert(to, id);
        Some(self.whole_array())
    }

    /// Pass an item-level change upward
    ///
    /// Under autoAdd, clearing a field removes its key and every ancestor object
    /// left empty by that, down to the item. The emitted event clears the
    /// highest removed key; an item left with nothing in it is removed from the
    /// array instead. `root` is the current form value.
    pub fn on_change(&mut self, event: ChangeEvent, root: &Value) -> Option<ChangeEvent> {
        if self.destroyed {
            return None;
        }
        if !self.auto_add || !event.is_clearing() {
            return Some(event);
        }

        let event_path = event.path.clone();
        let Some(rest) = event_path
            .strip_prefix(self.path.as_str())
            .and_then(|r| r.strip_prefix('.'))
        else {
            return Some(event);
        };
        let mut bits: Vec<&str> = rest.split('.').collect();
        let index_segment = bits.remove(0);
        if !is_index_segment(index_segment) {
            return Some(event);
        }
        let Ok(index) = index_segment.parse::<usize>() else {
            return Some(event);
        };
        let item_path = format!("{}.{}", self.path, index);

        let Some(key) = bits.pop() else {
            return self.on_remove_item(index);
        };

        let mut item = get(root, &item_path)
            .cloned()
            .or_else(|| self.order.get(index).and_then(|id| self.entries.get(id)).cloned())
            .unwrap_or_else(|| self.empty_item());

        let mut cleared = bits.clone();
        cleared.push(key);
        unset(&mut item, &cleared.join("."));

        while !bits.is_empty() {
            let parent = bits.join(".");
            match get(&item, &parent) {
                Some(Value::Object(o)) if o.is_empty() => {
                    unset(&mut item, &parent);
                    cleared.pop();
                    bits.pop();
                }
                _ => break,
            }
        }

        if is_empty_value(&item) {
            return self.on_remove_item(index);
        }
        Some(ChangeEvent::clear(format!("{}.{}", item_path, cleared.join("."))))
    }

    /// Stop reacting: later calls are no-ops
    pub fn destroy(&mut self) {
        self.destroyed = true;
        self.state = SyncState::Idle;
    }
}

/// Bring `item` in line with `incoming` without replacing it
fn reconcile(item: &mut Value, incoming: &Value) {
    match (item, incoming) {
        (Value::Object(current), Value::Object(next)) => {
            current.retain(|k, _| next.contains_key(k));
            for (k, v) in next {
                if current.get(k) != Some(v) {
                    current.insert(k.clone(), v.clone());
                }
            }
        }
        (item, incoming) => *item = incoming.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn object_container(path: &str) -> ArrayContainer {
        ArrayContainer::new(path, Some(&Model::of_kind(ModelKind::Object)))
    }

    #[test]
    fn test_sync_appends_and_truncates() {
        let mut container = object_container("foo");
        container.sync(Some(&json!([{"a": 1}, {"a": 2}])), false);
        assert_eq!(container.items(), vec![json!({"a": 1}), json!({"a": 2})]);

        container.sync(Some(&json!([{"a": 1}])), false);
        assert_eq!(container.items(), vec![json!({"a": 1})]);

        container.sync(None, false);
        assert!(container.is_empty());
        assert_eq!(container.state(), SyncState::Idle);
    }

    #[test]
    fn test_reconcile_preserves_item_identity() {
        let mut container = object_container("foo");
        container.sync(Some(&json!([{"a": 1, "b": 2}])), false);
        let id = container.item_ids()[0];

        let events = container.sync(Some(&json!([{"a": 3}])), false);
        assert_eq!(events, vec![ItemEvent::Updated { id, index: 0 }]);
        assert_eq!(container.item_ids(), &[id]);
        assert_eq!(container.item(id), Some(&json!({"a": 3})));
    }

    #[test]
    fn test_unchanged_value_produces_no_events() {
        let mut container = object_container("foo");
        let value = json!([{"a": 1}]);
        container.sync(Some(&value), false);
        assert!(container.sync(Some(&value), false).is_empty());
    }

    #[test]
    fn test_pending_slot_keeps_its_id_across_syncs() {
        let mut container = object_container("foo");
        let value = json!([{"a": 1}]);
        container.sync(Some(&value), true);
        let ids = container.item_ids().to_vec();
        assert_eq!(ids.len(), 2);

        assert!(container.sync(Some(&value), true).is_empty());
        assert_eq!(container.item_ids(), ids.as_slice());

        // an external removal keeps the pending slot too
        container.sync(Some(&json!([{"a": 1}, {"a": 2}])), true);
        let pending = *container.item_ids().last().unwrap();
        container.sync(Some(&json!([{"a": 1}])), true);
        assert_eq!(container.item_ids(), &[ids[0], pending]);
        assert!(container.has_pending_slot());
    }

    #[test]
    fn test_filled_pending_slot_becomes_an_item() {
        let mut container = object_container("foo");
        container.sync(None, true);
        let slot = container.item_ids()[0];

        let events = container.sync(Some(&json!([{"a": 1}])), true);
        assert_eq!(container.item_ids()[0], slot);
        assert_eq!(container.item(slot), Some(&json!({"a": 1})));
        assert_eq!(events.len(), 2);
        assert!(container.has_pending_slot());
    }

    #[test]
    fn test_auto_add_keeps_last_slot_empty() {
        let mut container = object_container("foo");
        container.sync(Some(&json!([{"first": "x"}])), true);
        assert_eq!(container.items(), vec![json!({"first": "x"}), json!({})]);
        assert!(container.has_pending_slot());

        // the user fills the pending slot
        let change = container
            .on_change(ChangeEvent::set("foo.1.first", json!("y")), &json!({}))
            .unwrap();
        assert_eq!(change, ChangeEvent::set("foo.1.first", json!("y")));

        container.sync(Some(&json!([{"first": "x"}, {"first": "y"}])), true);
        assert_eq!(
            container.items(),
            vec![json!({"first": "x"}), json!({"first": "y"}), json!({})]
        );
    }

    #[test]
    fn test_auto_add_transitions() {
        let mut container = object_container("foo");
        container.sync(Some(&json!([])), true);
        assert_eq!(container.items(), vec![json!({})]);

        container.sync(Some(&json!([])), false);
        assert!(container.is_empty());

        let mut strings = ArrayContainer::new("tags", Some(&Model::of_kind(ModelKind::String)));
        strings.sync(None, true);
        assert_eq!(strings.items(), vec![json!("")]);
    }

    #[test]
    fn test_pending_slot_cannot_be_removed() {
        let mut container = object_container("foo");
        container.sync(None, true);
        assert_eq!(container.on_remove_item(0), None);
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_remove_emits_whole_array() {
        let mut container = object_container("foo");
        container.sync(Some(&json!([{"a": 1}, {"a": 2}])), false);
        assert_eq!(
            container.on_remove_item(0),
            Some(ChangeEvent::set("foo", json!([{"a": 2}])))
        );
        assert_eq!(container.on_remove_item(5), None);
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_add_item_announces_index() {
        let mut container = object_container("foo");
        container.sync(Some(&json!([{"a": 1}])), false);
        assert_eq!(
            container.on_add_item(),
            Some(ChangeEvent::set("foo.1", json!({})))
        );
        assert_eq!(container.len(), 2);
    }

    #[test]
    fn test_reorder_and_move() {
        let mut container = object_container("foo");
        container.sync(Some(&json!([{"a": 1}, {"a": 2}, {"a": 3}])), false);
        let ids = container.item_ids().to_vec();

        assert_eq!(
            container.move_item(0, 2),
            Some(ChangeEvent::set("foo", json!([{"a": 2}, {"a": 3}, {"a": 1}])))
        );
        assert_eq!(container.item_ids(), &[ids[1], ids[2], ids[0]]);

        assert_eq!(
            container.on_reorder_items(vec![json!({"a": 9})]),
            Some(ChangeEvent::set("foo", json!([{"a": 9}])))
        );
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_clearing_nested_leaf_collapses_to_array() {
        let root = json!({"foo": [{"bar": {"baz": 1}}]});
        let mut container = object_container("foo");
        container.sync(get(&root, "foo"), true);

        let change = container.on_change(ChangeEvent::clear("foo.0.bar.baz"), &root);
        assert_eq!(change, Some(ChangeEvent::set("foo", json!([{}]))));
    }

    #[test]
    fn test_clearing_nested_leaf_removes_empty_ancestors_only() {
        let root = json!({"foo": [{"bar": {"baz": 1}, "keep": true}]});
        let mut container = object_container("foo");
        container.sync(get(&root, "foo"), true);

        let change = container.on_change(ChangeEvent::set("foo.0.bar.baz", json!("")), &root);
        assert_eq!(change, Some(ChangeEvent::clear("foo.0.bar")));

        let root = json!({"foo": [{"bar": {"baz": 1, "qux": 2}}]});
        let change = container.on_change(ChangeEvent::clear("foo.0.bar.baz"), &root);
        assert_eq!(change, Some(ChangeEvent::clear("foo.0.bar.baz")));
    }

    #[test]
    fn test_clearing_without_auto_add_passes_through() {
        let root = json!({"foo": [{"bar": "x"}]});
        let mut container = object_container("foo");
        container.sync(get(&root, "foo"), false);
        assert_eq!(
            container.on_change(ChangeEvent::clear("foo.0.bar"), &root),
            Some(ChangeEvent::clear("foo.0.bar"))
        );
    }

    #[test]
    fn test_resync_requested_mid_pass_runs_after() {
        let mut container = object_container("foo");
        let mut requested = false;
        let events = container.sync_with(Some(&json!([{"a": 1}])), false, |event, resync| {
            if !requested {
                if let ItemEvent::Inserted { .. } = event {
                    requested = true;
                    resync.request(Some(json!([{"a": 1}, {"a": 2}])), false);
                    resync.request(Some(json!([{"a": 5}])), false);
                }
            }
        });

        // latest request wins
        assert_eq!(container.items(), vec![json!({"a": 5})]);
        assert_eq!(events.len(), 2);
        assert_eq!(container.state(), SyncState::Idle);
    }

    #[test]
    fn test_destroyed_container_is_inert() {
        let mut container = object_container("foo");
        container.sync(Some(&json!([{"a": 1}])), false);
        container.destroy();
        assert!(container.sync(Some(&json!([])), false).is_empty());
        assert_eq!(container.on_add_item(), None);
        assert_eq!(container.on_remove_item(0), None);
        assert_eq!(container.len(), 1);
    }
}
