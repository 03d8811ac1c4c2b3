//! View handling: structural validation, cell resolution, labels and
//! generated default views.

pub mod cells;
pub mod generate;
pub mod label;
pub mod validate;

pub use cells::CellResolver;
pub use generate::{generate_facet_view, generate_view, Facet, MAIN_CELL};
pub use label::{add_label, get_label, humanize, item_label, singularize};
pub use validate::{
    check_references, parse_model, parse_view, validate_model, validate_view,
    MODEL_ERROR_HEADING, VIEW_ERROR_HEADING,
};
