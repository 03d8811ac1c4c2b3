//! Form root
//!
//! The form owns the value tree. Every edit reaches it as a [`ChangeEvent`],
//! is routed upward through the array containers enclosing its path, and is
//! then applied to the value. After each change the form
//!
//! 1. re-validates the value,
//! 2. rebuilds the render tree (creating and destroying inputs and array
//!    containers as cells appear and disappear),
//! 3. lets inputs whose declared paths changed refresh derived state, and
//! 4. notifies its listeners with the full value.
//!
//! Changes inputs produce while refreshing are deferred: they sit in a
//! [`ChangeCoalescer`] until the host calls [`Form::tick`] (or
//! [`Form::settle`]), so rapid upstream edits produce one write per path.

use std::collections::{BTreeMap, BTreeSet};

use bunsen_types::{Cell, ErrorEntry, ErrorSet, Model, ModelKind, OptionItem, ValidationResult, View};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::array::ArrayContainer;
use crate::change::{ChangeEvent, ErrorEvent};
use crate::coalesce::ChangeCoalescer;
use crate::config::FormOptions;
use crate::dispatch::{changed_paths, ChangeDispatcher};
use crate::error::{BunsenError, Result};
use crate::inputs::{build_input, Fetcher, Input};
use crate::options::{fetch_options, OptionsRequest, QueryStore};
use crate::path::{
    is_index_segment, leaf_key, non_index_id, parent_id, render_id, resolve_model_for_value, sub_model,
};
use crate::renderer::{select_renderer, RendererRegistry};
use crate::validator::{ModelValidator, Validator};
use crate::value::{apply_defaults, get, is_clearing_value, set, unset};
use crate::view::{
    add_label, generate_view, get_label, item_label, parse_model, parse_view, validate_model,
    validate_view, CellResolver, MODEL_ERROR_HEADING, VIEW_ERROR_HEADING,
};

const MAX_RENDER_DEPTH: usize = 64;
const MAX_DEFERRED_ROUNDS: usize = 16;

// ============================================================================
// PUBLIC TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStatus {
    Ready,
    /// The model failed structural validation; nothing is rendered
    ModelInvalid,
    /// The view failed structural validation; nothing is rendered
    ViewInvalid,
}

/// Host callbacks
pub trait FormListener: Send {
    /// The full value after a change
    fn on_change(&mut self, _value: &Value) {}

    fn on_validation(&mut self, _result: &ValidationResult) {}

    /// An asynchronous operation for `path` failed
    fn on_error(&mut self, _path: &str, _errors: &[ErrorEntry]) {}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Section {
        collapsible: bool,
    },
    Array {
        auto_add: bool,
        show_add_button: bool,
        add_label: String,
        sortable: bool,
    },
    Item {
        index: usize,
        /// The trailing autoAdd placeholder
        pending: bool,
    },
    Input {
        component: String,
        disabled: bool,
    },
    /// A subtree that could not be rendered
    Error {
        message: String,
    },
}

/// One node of the rendered tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub required: bool,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RenderNode>,
}

impl RenderNode {
    fn new(id: impl Into<String>, label: Option<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            label,
            required: false,
            kind,
            errors: Vec::new(),
            children: Vec::new(),
        }
    }

    fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(id, None, NodeKind::Error { message: message.into() })
    }

    /// Component of an input node
    pub fn component(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Input { component, .. } => Some(component),
            _ => None,
        }
    }

    /// Depth-first search for the input node rendered at `id`
    pub fn find_input(&self, id: &str) -> Option<&RenderNode> {
        if self.id == id && self.component().is_some() {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find_input(id))
    }

    /// Depth-first search for the first node rendered at `id`
    pub fn find(&self, id: &str) -> Option<&RenderNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// An input together with the component it was built for
struct Mounted {
    component: String,
    input: Box<dyn Input>,
}

/// Bookkeeping of one render pass
#[derive(Default)]
struct RenderPass {
    inputs: BTreeSet<String>,
    arrays: BTreeSet<String>,
    created: Vec<String>,
}

// ============================================================================
// FORM
// ============================================================================

pub struct Form {
    model: Model,
    view: View,
    options: FormOptions,
    registry: RendererRegistry,
    status: FormStatus,
    structural: ValidationResult,
    value: Value,
    validation: ValidationResult,
    errors: ErrorSet,
    async_errors: BTreeMap<String, Vec<ErrorEntry>>,
    dirty: BTreeSet<String>,
    tree: Vec<RenderNode>,
    inputs: BTreeMap<String, Mounted>,
    containers: BTreeMap<String, ArrayContainer>,
    dispatcher: ChangeDispatcher,
    coalescer: ChangeCoalescer,
    validator: Box<dyn Validator>,
    listeners: Vec<Box<dyn FormListener>>,
    destroyed: bool,
}

impl Form {
    /// Build a form from raw model and view documents
    ///
    /// Without a view a default one is generated from the model. Structural
    /// problems do not fail construction: the form reports them through
    /// [`status`](Self::status) and [`structural_result`](Self::structural_result).
    pub fn new(raw_model: &Value, raw_view: Option<&Value>, value: Option<Value>, options: FormOptions) -> Self {
        let mut form = Form {
            model: Model::default(),
            view: View::new(Vec::new()),
            registry: options.registry(),
            coalescer: ChangeCoalescer::new(options.deferred_flush),
            options,
            status: FormStatus::Ready,
            structural: ValidationResult::new(),
            value: Value::Object(Map::new()),
            validation: ValidationResult::new(),
            errors: ErrorSet::new(),
            async_errors: BTreeMap::new(),
            dirty: BTreeSet::new(),
            tree: Vec::new(),
            inputs: BTreeMap::new(),
            containers: BTreeMap::new(),
            dispatcher: ChangeDispatcher::new(),
            validator: Box::new(ModelValidator),
            listeners: Vec::new(),
            destroyed: false,
        };

        let model_result = validate_model(raw_model);
        if !model_result.is_valid() {
            warn!("{}: {} problem(s)", MODEL_ERROR_HEADING, model_result.errors.len());
            form.structural = model_result;
            form.status = FormStatus::ModelInvalid;
            return form;
        }
        form.model = match parse_model(raw_model) {
            Ok(model) => model,
            Err(e) => {
                form.structural.error("#", e.to_string());
                form.status = FormStatus::ModelInvalid;
                return form;
            }
        };

        form.view = match raw_view {
            Some(raw) => {
                let view_result = validate_view(raw, Some(&form.model));
                let valid = view_result.is_valid();
                form.structural.merge(view_result);
                if !valid {
                    warn!("{}: {} problem(s)", VIEW_ERROR_HEADING, form.structural.errors.len());
                    form.status = FormStatus::ViewInvalid;
                    return form;
                }
                match parse_view(raw) {
                    Ok(view) => view,
                    Err(e) => {
                        form.structural.error("#", e.to_string());
                        form.status = FormStatus::ViewInvalid;
                        return form;
                    }
                }
            }
            None => generate_view(&form.model),
        };

        form.value = apply_defaults(&form.model, value.as_ref()).unwrap_or_else(|| Value::Object(Map::new()));
        form.run_validation();
        form.rebuild();
        info!(
            "form ready: {} inputs, {} arrays",
            form.inputs.len(),
            form.containers.len()
        );
        form
    }

    /// Replace the value validator and re-validate
    pub fn with_validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.validator = validator;
        if self.status == FormStatus::Ready {
            self.run_validation();
        }
        self
    }

    pub fn add_listener(&mut self, listener: Box<dyn FormListener>) {
        self.listeners.push(listener);
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn status(&self) -> FormStatus {
        self.status
    }

    /// Findings of the model/view structural checks (warnings included)
    pub fn structural_result(&self) -> &ValidationResult {
        &self.structural
    }

    /// Heading and messages to show instead of the form when it cannot render
    pub fn error_summary(&self) -> Option<(&'static str, Vec<String>)> {
        let heading = match self.status {
            FormStatus::Ready => return None,
            FormStatus::ModelInvalid => MODEL_ERROR_HEADING,
            FormStatus::ViewInvalid => VIEW_ERROR_HEADING,
        };
        let messages = self.structural.errors.iter().map(ToString::to_string).collect();
        Some((heading, messages))
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn validation(&self) -> &ValidationResult {
        &self.validation
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn is_dirty(&self, path: &str) -> bool {
        self.dirty.contains(path)
    }

    pub fn set_show_all_errors(&mut self, show: bool) {
        self.options.show_all_errors = show;
    }

    pub fn input(&self, id: &str) -> Option<&dyn Input> {
        self.inputs.get(id).map(|m| m.input.as_ref())
    }

    pub fn input_ids(&self) -> Vec<String> {
        self.inputs.keys().cloned().collect()
    }

    pub fn container(&self, path: &str) -> Option<&ArrayContainer> {
        self.containers.get(path)
    }

    /// Whether deferred changes are waiting for a tick
    pub fn has_pending_changes(&self) -> bool {
        !self.coalescer.is_empty()
    }

    /// Messages shown at `path`: validation errors once the field is dirty
    /// (or `show_all_errors` is set) plus any asynchronous errors
    pub fn errors_for(&self, path: &str) -> Vec<String> {
        let mut messages = Vec::new();
        if self.options.show_all_errors || self.dirty.contains(path) {
            messages.extend(self.errors.messages(path).iter().cloned());
        }
        if let Some(entries) = self.async_errors.get(path) {
            messages.extend(entries.iter().map(|e| e.message.clone()));
        }
        messages
    }

    /// The rendered tree with the currently visible errors attached
    pub fn render_tree(&self) -> Vec<RenderNode> {
        if let Some((heading, messages)) = self.error_summary() {
            let mut node = RenderNode::error("", heading);
            node.errors = messages;
            return vec![node];
        }
        let mut tree = self.tree.clone();
        for node in &mut tree {
            self.decorate(node);
        }
        tree
    }

    fn decorate(&self, node: &mut RenderNode) {
        if matches!(node.kind, NodeKind::Input { .. }) {
            node.errors = self.errors_for(&node.id);
        }
        for child in &mut node.children {
            self.decorate(child);
        }
    }

    // ------------------------------------------------------------------------
    // Changes
    // ------------------------------------------------------------------------

    /// A path-qualified change from an input or the host
    pub fn handle_change(&mut self, event: ChangeEvent) {
        self.commit(vec![event], true);
    }

    /// Several changes applied as one update
    pub fn handle_changes(&mut self, events: Vec<ChangeEvent>) {
        self.commit(events, true);
    }

    /// A raw widget value entered into the input at `id`
    pub fn user_input(&mut self, id: &str, raw: &Value) -> Result<()> {
        let mounted = self
            .inputs
            .get_mut(id)
            .ok_or_else(|| BunsenError::UnknownInput { id: id.to_string() })?;
        let events = mounted.input.user_input(raw, &self.value);
        self.dirty.insert(id.to_string());
        self.commit(events, true);
        Ok(())
    }

    /// Replace the whole value, e.g. when the host loads a record
    pub fn set_value(&mut self, value: Value) {
        if self.destroyed || self.status != FormStatus::Ready {
            return;
        }
        let old = std::mem::replace(
            &mut self.value,
            apply_defaults(&self.model, Some(&value)).unwrap_or(value),
        );
        self.value_changed(old);
    }

    pub fn add_item(&mut self, array_path: &str) -> Result<()> {
        let event = self.container_mut(array_path)?.on_add_item();
        self.commit(event.into_iter().collect(), false);
        Ok(())
    }

    pub fn remove_item(&mut self, array_path: &str, index: usize) -> Result<()> {
        let event = self.container_mut(array_path)?.on_remove_item(index);
        self.commit(event.into_iter().collect(), true);
        Ok(())
    }

    pub fn reorder_items(&mut self, array_path: &str, items: Vec<Value>) -> Result<()> {
        let event = self.container_mut(array_path)?.on_reorder_items(items);
        self.commit(event.into_iter().collect(), true);
        Ok(())
    }

    pub fn move_item(&mut self, array_path: &str, from: usize, to: usize) -> Result<()> {
        let event = self.container_mut(array_path)?.move_item(from, to);
        self.commit(event.into_iter().collect(), true);
        Ok(())
    }

    fn container_mut(&mut self, path: &str) -> Result<&mut ArrayContainer> {
        self.containers
            .get_mut(path)
            .ok_or_else(|| BunsenError::UnknownArray { path: path.to_string() })
    }

    /// Deliver the deferred changes queued so far
    ///
    /// Returns whether applying them queued more.
    pub fn tick(&mut self) -> bool {
        let deferred = self.coalescer.flush();
        if deferred.is_empty() {
            return false;
        }
        debug!("delivering {} deferred change(s)", deferred.len());
        self.commit(deferred, false);
        !self.coalescer.is_empty()
    }

    /// Tick until no deferred changes remain
    pub fn settle(&mut self) {
        for _ in 0..MAX_DEFERRED_ROUNDS {
            if !self.tick() {
                return;
            }
        }
        warn!(
            "deferred changes still pending after {} rounds",
            MAX_DEFERRED_ROUNDS
        );
    }

    fn commit(&mut self, events: Vec<ChangeEvent>, mark_dirty: bool) {
        if self.destroyed || self.status != FormStatus::Ready || events.is_empty() {
            return;
        }

        let mut routed = Vec::with_capacity(events.len());
        for event in events {
            if mark_dirty {
                self.dirty.insert(event.path.clone());
            }
            routed.extend(self.route(event));
        }

        let old = self.value.clone();
        for event in routed {
            apply_change(&mut self.value, event);
        }
        self.value_changed(old);
    }

    /// Pass an event through the containers enclosing its path, innermost first
    fn route(&mut self, event: ChangeEvent) -> Option<ChangeEvent> {
        let mut owners: Vec<String> = self
            .containers
            .keys()
            .filter(|path| {
                event.path.len() > path.len()
                    && event.path.starts_with(path.as_str())
                    && event.path.as_bytes()[path.len()] == b'.'
            })
            .cloned()
            .collect();
        owners.sort_by_key(|p| std::cmp::Reverse(p.len()));

        let mut event = event;
        for path in owners {
            if let Some(container) = self.containers.get_mut(&path) {
                event = container.on_change(event, &self.value)?;
            }
        }
        Some(event)
    }

    fn value_changed(&mut self, old: Value) {
        let changed = changed_paths(&old, &self.value);
        if changed.is_empty() {
            return;
        }
        debug!("value changed at {:?}", changed);

        self.run_validation();
        self.rebuild();

        for id in self.dispatcher.affected(&changed) {
            if let Some(mounted) = self.inputs.get_mut(&id) {
                for event in mounted.input.form_value_changed(&self.value) {
                    self.coalescer.push(event);
                }
            }
        }

        for listener in self.listeners.iter_mut() {
            listener.on_change(&self.value);
        }
        for listener in self.listeners.iter_mut() {
            listener.on_validation(&self.validation);
        }
    }

    fn run_validation(&mut self) {
        self.validation = self.validator.validate(&self.model, &self.value);
        self.errors = ErrorSet::from_result(&self.validation);
    }

    // ------------------------------------------------------------------------
    // Asynchronous work
    // ------------------------------------------------------------------------

    /// Fetches inputs want issued for the current value
    pub fn option_requests(&mut self) -> Vec<OptionsRequest> {
        if self.destroyed {
            return Vec::new();
        }
        let value = &self.value;
        self.inputs
            .values_mut()
            .filter_map(|m| m.input.options_request(value))
            .collect()
    }

    /// Hand the outcome of `request` back to its input
    pub fn deliver_options(&mut self, request: &OptionsRequest, result: Result<Vec<OptionItem>>) {
        if self.destroyed {
            return;
        }
        let Some(mounted) = self.inputs.get_mut(&request.bunsen_id) else {
            debug!("input '{}' is gone, dropping options", request.bunsen_id);
            return;
        };
        let succeeded = result.is_ok();
        match mounted.input.apply_options(request.generation, result) {
            Some(event) => self.report_error(event),
            None if succeeded => {
                self.async_errors.remove(&request.bunsen_id);
            }
            None => {}
        }
    }

    /// Issue every pending option fetch against `store`
    pub async fn refresh_options(&mut self, store: &dyn QueryStore) {
        for request in self.option_requests() {
            let result = fetch_options(store, &request).await;
            self.deliver_options(&request, result);
        }
    }

    /// Reverse-geocode a position for the location input at `id`
    ///
    /// The coordinates are applied even when the lookup fails.
    pub async fn use_location(&mut self, id: &str, fetcher: &dyn Fetcher, latitude: f64, longitude: f64) -> Result<()> {
        let url = self
            .inputs
            .get(id)
            .ok_or_else(|| BunsenError::UnknownInput { id: id.to_string() })?
            .input
            .reverse_lookup_url(latitude, longitude);

        let response = match url {
            Some(url) => match fetcher.fetch(&url).await {
                Ok(response) => response,
                Err(e) => {
                    error!("Failed to perform reverse lookup for '{}': {}", id, e);
                    self.report_error(ErrorEvent::new(id, vec![ErrorEntry::new(id, e.to_string())]));
                    Value::Null
                }
            },
            None => Value::Null,
        };

        if self.destroyed {
            return Ok(());
        }
        let events = match self.inputs.get_mut(id) {
            Some(mounted) => mounted.input.location_changes(&response, latitude, longitude),
            None => return Ok(()),
        };
        self.commit(events, true);
        Ok(())
    }

    fn report_error(&mut self, event: ErrorEvent) {
        for listener in self.listeners.iter_mut() {
            listener.on_error(&event.path, &event.errors);
        }
        self.async_errors.insert(event.path, event.errors);
    }

    /// Tear the form down
    ///
    /// Inputs and containers are destroyed, so late async deliveries are
    /// ignored. Deferred changes are delivered or dropped according to
    /// `deferred_flush`.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        for mounted in self.inputs.values_mut() {
            mounted.input.destroy();
        }
        for container in self.containers.values_mut() {
            container.destroy();
        }

        let remaining = self.coalescer.teardown();
        if !remaining.is_empty() {
            debug!("flushing {} deferred change(s) on teardown", remaining.len());
            for event in remaining {
                apply_change(&mut self.value, event);
            }
            for listener in self.listeners.iter_mut() {
                listener.on_change(&self.value);
            }
        }

        self.dispatcher.clear();
        self.destroyed = true;
        info!("form destroyed");
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    /// Rebuild the render tree for the current value
    fn rebuild(&mut self) {
        if self.status != FormStatus::Ready {
            return;
        }

        let view = self.view.clone();
        let resolver = CellResolver::new(&view);
        let mut pass = RenderPass::default();

        let mut tree = Vec::new();
        for (index, cell) in view.cells.iter().enumerate() {
            match resolver.resolve(cell) {
                Ok(resolved) => {
                    if let Some(node) = self.build_cell(&resolver, &mut pass, &resolved, "", 0) {
                        tree.push(node);
                    }
                }
                Err(e) => tree.push(RenderNode::error(format!("#/cells/{}", index), e.to_string())),
            }
        }
        self.tree = tree;

        let stale_inputs: Vec<String> = self
            .inputs
            .keys()
            .filter(|id| !pass.inputs.contains(*id))
            .cloned()
            .collect();
        for id in stale_inputs {
            if let Some(mut mounted) = self.inputs.remove(&id) {
                debug!("unmounting input '{}'", id);
                mounted.input.destroy();
            }
            self.dispatcher.unsubscribe(&id);
        }

        self.containers.retain(|path, container| {
            let keep = pass.arrays.contains(path);
            if !keep {
                container.destroy();
            }
            keep
        });

        for id in pass.created {
            if let Some(mounted) = self.inputs.get_mut(&id) {
                for event in mounted.input.form_value_changed(&self.value) {
                    self.coalescer.push(event);
                }
            }
        }
    }

    fn model_at(&self, id: &str, depends_on: Option<&str>) -> Option<Model> {
        depends_on
            .and_then(|dep| sub_model(&self.model, id, Some(dep)))
            .or_else(|| resolve_model_for_value(&self.model, id, &self.value))
            .or_else(|| sub_model(&self.model, id, None))
            .cloned()
    }

    fn is_required(&self, id: &str) -> bool {
        let key = leaf_key(id);
        if id.is_empty() || is_index_segment(key) {
            return false;
        }
        match resolve_model_for_value(&self.model, parent_id(id), &self.value) {
            Some(parent) => {
                parent.is_required(key)
                    || parent
                        .dependencies
                        .values()
                        .any(|dep| dep.properties.contains_key(key) && dep.is_required(key))
            }
            None => false,
        }
    }

    fn build_children(
        &mut self,
        resolver: &CellResolver<'_>,
        pass: &mut RenderPass,
        cells: &[Cell],
        parent: &str,
        depth: usize,
    ) -> Vec<RenderNode> {
        let mut nodes = Vec::new();
        for cell in cells {
            match resolver.resolve(cell) {
                Ok(resolved) => {
                    if let Some(node) = self.build_cell(resolver, pass, &resolved, parent, depth + 1) {
                        nodes.push(node);
                    }
                }
                Err(e) => nodes.push(RenderNode::error(parent, e.to_string())),
            }
        }
        nodes
    }

    fn build_cell(
        &mut self,
        resolver: &CellResolver<'_>,
        pass: &mut RenderPass,
        cell: &Cell,
        parent: &str,
        depth: usize,
    ) -> Option<RenderNode> {
        let id = render_id(parent, cell.model.as_deref());
        if depth > MAX_RENDER_DEPTH {
            return Some(RenderNode::error(id, "view nests too deeply"));
        }

        if let Some(dep) = cell.depends_on.as_deref() {
            if !dependency_active(&id, dep, &self.value) {
                return None;
            }
        }

        let model = self.model_at(&id, cell.depends_on.as_deref());
        let label = if cell.hide_label == Some(true) {
            None
        } else {
            get_label(cell.label.as_deref(), model.as_ref(), &id)
        };
        let required = self.is_required(&id);

        if !cell.children().is_empty() {
            let mut node = RenderNode::new(
                &id,
                label,
                NodeKind::Section {
                    collapsible: cell.is_collapsible(),
                },
            );
            node.required = required;
            node.children = self.build_children(resolver, pass, cell.children(), &id, depth);
            return Some(node);
        }

        let Some(model) = model else {
            if cell.model.is_none() {
                return Some(RenderNode::new(&id, label, NodeKind::Section { collapsible: false }));
            }
            return Some(RenderNode::error(&id, format!("Unable to find model for '{}'", id)));
        };

        if cell.renderer.is_none() && model.is_array() {
            return Some(self.build_array(resolver, pass, cell, &model, id, label, required, depth));
        }

        if cell.renderer.is_none() && model.is_object() && !model.properties.is_empty() {
            let generated: Vec<Cell> = model.properties.keys().map(Cell::for_model).collect();
            let mut node = RenderNode::new(
                &id,
                label,
                NodeKind::Section {
                    collapsible: cell.is_collapsible(),
                },
            );
            node.required = required;
            node.children = self.build_children(resolver, pass, &generated, &id, depth);
            return Some(node);
        }

        let mut node = self.mount_input(pass, cell, &model, &id, label);
        node.required = required;
        Some(node)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_array(
        &mut self,
        resolver: &CellResolver<'_>,
        pass: &mut RenderPass,
        cell: &Cell,
        model: &Model,
        id: String,
        label: Option<String>,
        required: bool,
        depth: usize,
    ) -> RenderNode {
        let item_config = cell.item.as_deref();
        let auto_add = cell.auto_add();
        let array_label = label.clone().unwrap_or_default();

        let container = self
            .containers
            .entry(id.clone())
            .or_insert_with(|| ArrayContainer::for_model(id.clone(), model));
        container.sync(get(&self.value, &id), auto_add);
        let count = container.len();
        let pending = container.has_pending_slot();
        pass.arrays.insert(id.clone());

        let mut node = RenderNode::new(
            &id,
            label,
            NodeKind::Array {
                auto_add,
                show_add_button: item_config.map(|i| i.show_add_button()).unwrap_or(true),
                add_label: add_label(&array_label),
                sortable: item_config.map(|i| i.is_sortable()).unwrap_or(false),
            },
        );
        node.required = required;

        let item_cell = match item_config {
            Some(item) => match resolver.item_cell(item) {
                Ok(cell) => cell,
                Err(e) => {
                    node.children.push(RenderNode::error(format!("{}.item", id), e.to_string()));
                    return node;
                }
            },
            None => Cell::default(),
        };
        let item_model = model.items.as_deref().cloned().unwrap_or_default();

        for index in 0..count {
            let item_id = format!("{}.{}", id, index);
            let mut item_node = RenderNode::new(
                &item_id,
                Some(item_label(&array_label, index)),
                NodeKind::Item {
                    index,
                    pending: pending && index + 1 == count,
                },
            );

            item_node.children = if !item_cell.children().is_empty() {
                self.build_children(resolver, pass, item_cell.children(), &item_id, depth)
            } else if item_cell.renderer.is_none() && item_model.kind == Some(ModelKind::Object) {
                let generated: Vec<Cell> = item_model.properties.keys().map(Cell::for_model).collect();
                self.build_children(resolver, pass, &generated, &item_id, depth)
            } else {
                let leaf = Cell {
                    model: None,
                    children: None,
                    ..item_cell.clone()
                };
                vec![self.mount_input(pass, &leaf, &item_model, &item_id, None)]
            };
            node.children.push(item_node);
        }
        node
    }

    fn mount_input(
        &mut self,
        pass: &mut RenderPass,
        cell: &Cell,
        model: &Model,
        id: &str,
        label: Option<String>,
    ) -> RenderNode {
        let component = match select_renderer(cell, model, self.options.read_only, &self.registry) {
            Ok(component) => component,
            Err(e) => return RenderNode::error(id, e.to_string()),
        };

        let reusable = self
            .inputs
            .get(id)
            .map(|m| m.component == component && m.input.base().cell == *cell && m.input.base().model == *model)
            .unwrap_or(false);

        if !reusable {
            if let Some(mut old) = self.inputs.remove(id) {
                old.input.destroy();
            }
            let input = build_input(&component, id, model, cell);
            self.dispatcher.subscribe(id, input.dependencies());
            self.inputs.insert(
                id.to_string(),
                Mounted {
                    component: component.clone(),
                    input,
                },
            );
            pass.created.push(id.to_string());
        }
        pass.inputs.insert(id.to_string());

        RenderNode::new(
            id,
            label,
            NodeKind::Input {
                component,
                disabled: self.options.disabled || cell.is_disabled(),
            },
        )
    }
}

/// Write one change into the value; clearing values remove the key
fn apply_change(value: &mut Value, event: ChangeEvent) {
    if event.is_clearing() {
        unset(value, &event.path);
        return;
    }
    if let Some(new_value) = event.value {
        set(value, &event.path, new_value);
    }
}

/// Whether the dependency a `dependsOn` cell waits for is set
///
/// `depends_on` names the dependency key on its owning object without array
/// indices (`payment.useCard`); the owner is located along `id`.
fn dependency_active(id: &str, depends_on: &str, value: &Value) -> bool {
    let owner = parent_id(depends_on);
    let key = leaf_key(depends_on);

    let owner_path = if owner.is_empty() {
        Some(String::new())
    } else {
        let segments: Vec<&str> = id.split('.').collect();
        (1..=segments.len())
            .map(|n| segments[..n].join("."))
            .find(|prefix| non_index_id(prefix) == owner)
    };

    match owner_path {
        Some(path) => !is_clearing_value(get(value, &render_id(&path, Some(key)))),
        None => false,
    }
}
