//! Cell Resolver
//!
//! Expands `extends` references against `cellDefinitions`. Inheritance is an
//! overlay: keys set on the extending cell win, everything else comes from the
//! definition. `children` replace inherited children unless the extending
//! cell sets `mergeChildren`.

use bunsen_types::{ArrayItemCell, Cell, View};
use tracing::debug;

use crate::error::{BunsenError, Result};

/// Overlay `own` on top of `base`
fn overlay(base: Cell, own: &Cell) -> Cell {
    let children = match (&own.children, base.children) {
        (Some(own_children), Some(mut inherited)) if own.merge_children == Some(true) => {
            inherited.extend(own_children.iter().cloned());
            Some(inherited)
        }
        (Some(own_children), _) => Some(own_children.clone()),
        (None, inherited) => inherited,
    };

    Cell {
        id: own.id.clone().or(base.id),
        extends: None,
        model: own.model.clone().or(base.model),
        label: own.label.clone().or(base.label),
        description: own.description.clone().or(base.description),
        instructions: own.instructions.clone().or(base.instructions),
        renderer: own.renderer.clone().or(base.renderer),
        item: own.item.clone().or(base.item),
        collapsible: own.collapsible.or(base.collapsible),
        depends_on: own.depends_on.clone().or(base.depends_on),
        class_names: own.class_names.clone().or(base.class_names),
        transforms: own.transforms.clone().or(base.transforms),
        disabled: own.disabled.or(base.disabled),
        hide_label: own.hide_label.or(base.hide_label),
        children,
        merge_children: None,
    }
}

/// Resolves cells of one view
#[derive(Debug, Clone, Copy)]
pub struct CellResolver<'a> {
    view: &'a View,
}

impl<'a> CellResolver<'a> {
    pub fn new(view: &'a View) -> Self {
        Self { view }
    }

    /// Concrete configuration of `cell` with its `extends` chain applied
    pub fn resolve(&self, cell: &Cell) -> Result<Cell> {
        let mut chain = Vec::new();
        self.resolve_with_chain(cell, &mut chain)
    }

    /// Concrete configuration of the definition named `id`
    pub fn resolve_id(&self, id: &str) -> Result<Cell> {
        self.resolve(&Cell::extending(id))
    }

    fn resolve_with_chain(&self, cell: &Cell, chain: &mut Vec<String>) -> Result<Cell> {
        let Some(id) = cell.extends.as_deref() else {
            return Ok(cell.clone());
        };

        if chain.iter().any(|seen| seen == id) {
            let mut cycle = chain.clone();
            cycle.push(id.to_string());
            return Err(BunsenError::CyclicView {
                id: id.to_string(),
                chain: cycle,
            });
        }

        let definition =
            self.view
                .cell_definition(id)
                .ok_or_else(|| BunsenError::UnresolvedExtends { id: id.to_string() })?;

        chain.push(id.to_string());
        let inherited = self.resolve_with_chain(definition, chain)?;
        chain.pop();

        debug!("resolved cell extends '{}'", id);
        Ok(overlay(inherited, cell))
    }

    /// Definition used for items of an array cell (`item.extends`), if any
    pub fn current_cell(&self, cell: &Cell) -> Result<Option<Cell>> {
        match cell.item.as_deref().and_then(|item| item.extends.as_deref()) {
            Some(id) => self.resolve_id(id).map(Some),
            None => Ok(None),
        }
    }

    /// The cell rendered for each item of an array cell
    ///
    /// Starts from `item.extends` when present and layers the item's own
    /// label, renderer and children on top.
    pub fn item_cell(&self, item: &ArrayItemCell) -> Result<Cell> {
        let base = match item.extends.as_deref() {
            Some(id) => self.resolve_id(id)?,
            None => Cell::default(),
        };

        let own = Cell {
            label: item.label.clone(),
            renderer: item.renderer.clone(),
            children: item.children.clone(),
            ..Default::default()
        };
        Ok(overlay(base, &own))
    }

    /// Root cells of the view, each fully resolved
    pub fn root_cells(&self) -> Result<Vec<Cell>> {
        self.view.cells.iter().map(|cell| self.resolve(cell)).collect()
    }

    /// Check every reachable `extends` without building a render tree
    pub fn check_all(&self) -> Result<()> {
        for definition in self.view.cell_definitions.values() {
            self.check_tree(definition)?;
        }
        for cell in &self.view.cells {
            self.check_tree(cell)?;
        }
        Ok(())
    }

    fn check_tree(&self, cell: &Cell) -> Result<()> {
        let resolved = self.resolve(cell)?;
        for child in cell.children() {
            self.check_tree(child)?;
        }
        if let Some(item) = resolved.item.as_deref() {
            if let Some(id) = item.extends.as_deref() {
                self.resolve_id(id)?;
            }
            for child in item.children.as_deref().unwrap_or(&[]) {
                self.check_tree(child)?;
            }
        }
        Ok(())
    }
}
