//! Default views
//!
//! Used when the host supplies a model without a view, and to build facet
//! views (one collapsible section per facet).

use bunsen_types::{ArrayItemCell, Cell, Model, RendererConfig, View, ViewType};
use serde::{Deserialize, Serialize};

/// Id of the root cell definition in generated views
pub const MAIN_CELL: &str = "main";

/// Cells for every property of an object model, in property name order
fn property_cells(model: &Model) -> Vec<Cell> {
    model
        .properties
        .iter()
        .map(|(name, property)| cell_for(name, property))
        .collect()
}

fn cell_for(name: &str, model: &Model) -> Cell {
    if model.is_object() && !model.properties.is_empty() {
        return Cell::for_model(name).with_children(property_cells(model));
    }

    if model.is_array() {
        let item_children = model
            .items
            .as_deref()
            .filter(|items| items.is_object() && !items.properties.is_empty())
            .map(property_cells);

        return Cell {
            item: Some(Box::new(ArrayItemCell {
                children: item_children,
                ..Default::default()
            })),
            ..Cell::for_model(name)
        };
    }

    Cell::for_model(name)
}

/// A 2.0 form view rendering every property of `model`
pub fn generate_view(model: &Model) -> View {
    let main = Cell::default().with_children(property_cells(model));
    View::new(vec![Cell::extending(MAIN_CELL)]).with_definition(MAIN_CELL, main)
}

/// One facet of a facet view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facet {
    pub label: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer: Option<RendererConfig>,
}

/// A view with one collapsible cell per facet
pub fn generate_facet_view(facets: &[Facet], view_type: ViewType) -> View {
    let children = facets
        .iter()
        .map(|facet| {
            let inner = Cell {
                hide_label: Some(true),
                renderer: facet.renderer.clone(),
                ..Cell::for_model(facet.model.clone())
            };
            Cell {
                collapsible: Some(true),
                ..Cell::default()
                    .with_label(facet.label.clone())
                    .with_children(vec![inner])
            }
        })
        .collect();

    let mut view = View::new(vec![Cell::extending(MAIN_CELL)])
        .with_definition(MAIN_CELL, Cell::default().with_children(children));
    view.view_type = view_type;
    view
}
