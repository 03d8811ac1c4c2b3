//! Validation structures
//!
//! `ValidationResult` is what validators (structural view/model checks as well
//! as the external value validator) produce. `ErrorSet` is the path-keyed form
//! consumed by inputs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// VALIDATION RESULT
// ============================================================================

/// A single validation finding, addressed by a JSON pointer such as `#/cells/0`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
    /// Set when the finding is a missing required field
    #[serde(default)]
    pub is_required: bool,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            is_required: false,
        }
    }

    /// The canonical "Field is required." finding
    pub fn required(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: "Field is required.".to_string(),
            is_required: true,
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.path, self.message)
    }
}

/// Errors and warnings produced by one validation pass
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    #[serde(default)]
    pub errors: Vec<ValidationIssue>,
    #[serde(default)]
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue::new(path, message));
    }

    pub fn warning(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue::new(path, message));
    }

    pub fn required(&mut self, path: impl Into<String>) {
        self.errors.push(ValidationIssue::required(path));
    }

    /// Append another result's findings to this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

// ============================================================================
// ERROR SET
// ============================================================================

/// Convert a JSON pointer (`#/foo/0/bar`) into a bunsen id (`foo.0.bar`)
pub fn pointer_to_bunsen_id(pointer: &str) -> String {
    let trimmed = pointer.trim_start_matches('#').trim_start_matches('/');
    trimmed
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

/// Field validation messages keyed by bunsen id
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorSet(BTreeMap<String, Vec<String>>);

impl ErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-key a validation result's errors by bunsen id
    pub fn from_result(result: &ValidationResult) -> Self {
        let mut set = Self::new();
        for issue in &result.errors {
            set.insert(pointer_to_bunsen_id(&issue.path), issue.message.clone());
        }
        set
    }

    pub fn insert(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.entry(path.into()).or_default().push(message.into());
    }

    /// Messages for exactly this path; sibling and descendant paths are not included
    pub fn messages(&self, path: &str) -> &[String] {
        self.0.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Messages for this path joined with `separator`, `None` when there are none
    pub fn joined(&self, path: &str, separator: &str) -> Option<String> {
        let messages = self.messages(path);
        if messages.is_empty() {
            None
        } else {
            Some(messages.join(separator))
        }
    }

    /// Entries at or below `prefix`, re-keyed relative to it
    pub fn subtree(&self, prefix: &str) -> ErrorSet {
        if prefix.is_empty() {
            return self.clone();
        }

        let nested = format!("{}.", prefix);
        let entries = self
            .0
            .iter()
            .filter_map(|(path, messages)| {
                if path == prefix {
                    Some((String::new(), messages.clone()))
                } else {
                    path.strip_prefix(&nested)
                        .map(|rest| (rest.to_string(), messages.clone()))
                }
            })
            .collect();
        ErrorSet(entries)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }
}

/// An error reported out of band, e.g. by a failed option fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub path: String,
    pub message: String,
}

impl ErrorEntry {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}
