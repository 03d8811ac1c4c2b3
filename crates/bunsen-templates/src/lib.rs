//! Bunsen Templates - reference resolution for query templates
//!
//! Query-driven inputs carry templates such as
//! `{"q": "label:thing,parent:${../[1].id}"}` whose `${...}` placeholders
//! refer to other parts of the form value. This crate:
//! - parses reference expressions (`foo.bar`, `[1].fizz`, `./sibling`, `../../up`)
//! - resolves them against a value tree from an arbitrary start path
//! - substitutes placeholders inside JSON-encoded templates
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use bunsen_templates::find_value;
//!
//! let value = json!({"a": {"b": [{"c": 1}, {"c": 2}]}});
//! assert_eq!(find_value(&value, "a.b.[1].c", None), Some(&json!(2)));
//! assert_eq!(find_value(&value, "../[0].c", Some("a.b.[1]")), Some(&json!(1)));
//! ```

mod error;
mod reference;
mod variables;

pub use error::TemplateError;
pub use reference::{find_value, format_path, lookup, parse_path, Anchor, PathSegment, Reference};
pub use variables::{
    has_valid_query_values, parse_variables, populate_query, query_references,
    referenced_paths,
};
