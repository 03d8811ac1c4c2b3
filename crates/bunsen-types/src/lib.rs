//! Bunsen Types - Level 1 Foundation Types
//!
//! Pure data structures shared by every crate in the workspace:
//! - `Model`: the JSON-Schema-like bunsen model
//! - `View`, `Cell`, `ArrayItemCell`: the declarative bunsen view
//! - `ValidationIssue`, `ValidationResult`, `ErrorSet`: validation output
//! - `OptionItem`: a `{label, value}` pair offered by select inputs
//!
//! ## Rules
//!
//! 1. **NO BUSINESS LOGIC** - only data structures, constructors and accessors
//! 2. **NO WORKSPACE DEPENDENCIES** - this crate sits at the bottom of the graph
//! 3. **SERIALIZABLE** - every type round-trips through serde using the
//!    camelCase keys of the bunsen JSON documents

pub mod model;
pub mod options;
pub mod validation;
pub mod view;

pub use model::{Model, ModelKind};
pub use options::OptionItem;
pub use validation::{pointer_to_bunsen_id, ErrorEntry, ErrorSet, ValidationIssue, ValidationResult};
pub use view::{
    ArrayItemCell, Cell, ClassNames, RendererConfig, Transform, Transforms, View, ViewType,
    SUPPORTED_VIEW_VERSION,
};
