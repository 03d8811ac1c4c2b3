//! Bunsen - schema-driven form engine core
//!
//! Renders a form from two JSON documents: a bunsen *model* describing the
//! shape of the value and a bunsen *view* describing layout and renderers.
//!
//! ## Layers
//!
//! - `bunsen-types`: serde data types for models, views and validation output
//! - `bunsen-templates`: `${...}` reference resolution for query templates
//! - this crate: everything that acts on them
//!
//! ## Modules
//!
//! - [`path`]: value path <-> schema path conversion
//! - [`view`]: view validation, `extends` resolution, labels, generated views
//! - [`renderer`]: which component renders a cell
//! - [`inputs`]: the input capability trait and its variants
//! - [`array`]: shadow-list synchronization for array containers
//! - [`form`]: the form root owning the value tree
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use bunsen::{Form, FormOptions};
//!
//! let model = json!({
//!     "type": "object",
//!     "properties": {"name": {"type": "string"}}
//! });
//! let mut form = Form::new(&model, None, None, FormOptions::default());
//! form.user_input("name", &json!("Ada")).unwrap();
//! assert_eq!(form.value(), &json!({"name": "Ada"}));
//! ```

pub mod array;
pub mod change;
pub mod coalesce;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod form;
pub mod inputs;
pub mod options;
pub mod path;
pub mod renderer;
pub mod validator;
pub mod value;
pub mod view;

pub use bunsen_templates::{find_value, parse_variables, populate_query, TemplateError};
pub use bunsen_types::{
    ArrayItemCell, Cell, ErrorEntry, ErrorSet, Model, ModelKind, OptionItem, RendererConfig,
    ValidationIssue, ValidationResult, View, ViewType,
};

pub use array::{ArrayContainer, ItemEvent, ItemId, SyncState};
pub use change::{ChangeEvent, ErrorEvent};
pub use coalesce::{ChangeCoalescer, FlushPolicy};
pub use config::FormOptions;
pub use dispatch::ChangeDispatcher;
pub use error::{BunsenError, Result};
pub use form::{Form, FormListener, FormStatus, NodeKind, RenderNode};
pub use inputs::{Fetcher, Input};
pub use options::QueryStore;
pub use path::{model_path, ModelPathCache};
pub use renderer::{select_renderer, RendererRegistry};
pub use validator::{ModelValidator, Validator};
pub use view::CellResolver;
