use bunsen_templates::TemplateError;
use thiserror::Error;

/// Engine-level failures
///
/// Problems found in user supplied models and views are reported as
/// `ValidationResult` data by the form; these variants cover the operations
/// that cannot proceed at all.
#[derive(Debug, Error)]
pub enum BunsenError {
    #[error("cyclic view: cell '{id}' extends itself through {}", .chain.join(" -> "))]
    CyclicView { id: String, chain: Vec<String> },

    #[error("unresolved extends: no cell definition named '{id}'")]
    UnresolvedExtends { id: String },

    #[error("unknown renderer: '{name}' is neither a registered renderer nor a component")]
    UnknownRenderer { name: String },

    #[error("no input rendered at '{id}'")]
    UnknownInput { id: String },

    #[error("no array rendered at '{path}'")]
    UnknownArray { path: String },

    #[error("template resolution failed: {0}")]
    TemplateResolution(#[from] TemplateError),

    #[error("invalid view: {0}")]
    InvalidView(String),

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("config: {0}")]
    Config(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl BunsenError {
    /// Whether this error comes from a broken view or model document
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::CyclicView { .. }
                | Self::UnresolvedExtends { .. }
                | Self::InvalidView(_)
                | Self::InvalidModel(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BunsenError>;
