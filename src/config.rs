//! Form configuration
//!
//! Host-level settings for a form, loadable from YAML or JSON.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::coalesce::FlushPolicy;
use crate::renderer::RendererRegistry;

/// Environment variable naming a configuration file
pub const CONFIG_ENV_VAR: &str = "BUNSEN_FORM_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormOptions {
    /// Render every input with the static renderer
    pub read_only: bool,
    pub disabled: bool,
    /// Show validation errors for fields the user has not touched
    pub show_all_errors: bool,
    /// Renderer name -> component, merged over the built-in table
    pub renderers: BTreeMap<String, String>,
    /// Components cells may name directly
    pub registered_components: BTreeSet<String>,
    /// What deferred changes do when the form is torn down
    pub deferred_flush: FlushPolicy,
}

impl FormOptions {
    /// Load from a file; `.yaml`/`.yml` are read as YAML, anything else as JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let options: FormOptions = if is_yaml {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        };

        info!(
            "Loaded form options from {} ({} renderer overrides)",
            path.display(),
            options.renderers.len()
        );
        Ok(options)
    }

    /// Load from the file named by `BUNSEN_FORM_CONFIG`, defaults when unset
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    /// Built-in renderers with this configuration's overrides applied
    pub fn registry(&self) -> RendererRegistry {
        let mut registry = RendererRegistry::with_builtins();
        registry.merge(&self.renderers);
        for component in &self.registered_components {
            registry.register_component(component.clone());
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "readOnly: true\nrenderers:\n  name-renderer: my-name-input\ndeferredFlush: flush"
        )
        .unwrap();

        let options = FormOptions::load(file.path()).unwrap();
        assert!(options.read_only);
        assert!(!options.show_all_errors);
        assert_eq!(options.deferred_flush, FlushPolicy::Flush);
        assert_eq!(
            options.registry().component_for("name-renderer").unwrap(),
            "my-name-input"
        );
    }

    #[test]
    fn test_load_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"showAllErrors": true, "registeredComponents": ["x-widget"]}}"#).unwrap();

        let options = FormOptions::load(file.path()).unwrap();
        assert!(options.show_all_errors);
        assert_eq!(options.deferred_flush, FlushPolicy::Discard);
        assert_eq!(options.registry().component_for("x-widget").unwrap(), "x-widget");
    }

    #[test]
    fn test_load_reports_path() {
        let err = FormOptions::load(Path::new("/nonexistent/form.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/form.yaml"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = FormOptions::load(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse"));
    }
}
