use thiserror::Error;

/// Failures while parsing references or substituting template variables
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("invalid reference expression '{expr}': {reason}")]
    InvalidReference { expr: String, reason: String },

    #[error("template did not resolve to valid JSON: {source}")]
    InvalidJson {
        text: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("query template must resolve to a JSON object")]
    NotAnObject,

    #[error("failed to serialize query template: {0}")]
    Serialize(#[from] serde_json::Error),
}
