//! Bunsen Command Line Interface
//!
//! Checks and renders bunsen forms outside a host application.
//!
//! # Usage
//!
//! ```bash
//! # Structural validation of a model and (optionally) a view
//! bunsen-cli validate --model model.json --view view.yaml
//!
//! # Print the render tree the engine would build
//! bunsen-cli render --model model.json --value value.json --read-only
//!
//! # Evaluate a reference expression against a value
//! bunsen-cli resolve --value value.json '../[0].c' --start 'a.b.[1]'
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use bunsen::view::{parse_model, validate_model, validate_view};
use bunsen::{find_value, Form, FormOptions, RenderNode};

#[derive(Parser)]
#[command(name = "bunsen-cli")]
#[command(version = "0.1.0")]
#[command(about = "Validate, render and inspect bunsen forms")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "text", value_enum)]
    format: OutputFormat,

    /// Form options file (YAML or JSON)
    #[arg(long, global = true, env = "BUNSEN_FORM_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Structural validation of a model and view
    Validate {
        #[arg(short, long)]
        model: PathBuf,

        #[arg(short, long)]
        view: Option<PathBuf>,
    },

    /// Print the render tree with renderer choices
    Render {
        #[arg(short, long)]
        model: PathBuf,

        #[arg(short, long)]
        view: Option<PathBuf>,

        /// Initial form value
        #[arg(long)]
        value: Option<PathBuf>,

        /// Render every input read-only
        #[arg(long)]
        read_only: bool,
    },

    /// Evaluate a reference expression
    Resolve {
        /// Reference such as `a.b.[1].c` or `../[0].c`
        reference: String,

        #[arg(long)]
        value: PathBuf,

        /// Path relative references start from
        #[arg(long)]
        start: Option<String>,
    },
}

// =============================================================================
// MAIN
// =============================================================================

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { model, view } => cmd_validate(&model, view.as_deref(), cli.format),
        Commands::Render {
            model,
            view,
            value,
            read_only,
        } => cmd_render(
            &model,
            view.as_deref(),
            value.as_deref(),
            read_only,
            cli.config.as_deref(),
            cli.format,
        ),
        Commands::Resolve {
            reference,
            value,
            start,
        } => cmd_resolve(&reference, &value, start.as_deref(), cli.format),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Read a JSON or YAML document, picking the parser from the extension
fn read_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display())),
        _ => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display())),
    }
}

fn cmd_validate(model_path: &Path, view_path: Option<&Path>, format: OutputFormat) -> Result<bool> {
    let raw_model = read_document(model_path)?;
    let mut result = validate_model(&raw_model);

    if let Some(view_path) = view_path {
        let raw_view = read_document(view_path)?;
        let model = if result.is_valid() {
            parse_model(&raw_model).ok()
        } else {
            None
        };
        result.merge(validate_view(&raw_view, model.as_ref()));
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            for issue in &result.errors {
                println!("error   {}", issue);
            }
            for issue in &result.warnings {
                println!("warning {}", issue);
            }
            if result.is_valid() {
                println!(
                    "OK ({} warning(s))",
                    result.warnings.len()
                );
            }
        }
    }
    Ok(result.is_valid())
}

fn cmd_render(
    model_path: &Path,
    view_path: Option<&Path>,
    value_path: Option<&Path>,
    read_only: bool,
    config: Option<&Path>,
    format: OutputFormat,
) -> Result<bool> {
    let mut options = match config {
        Some(path) => FormOptions::load(path)?,
        None => FormOptions::default(),
    };
    options.read_only |= read_only;

    let raw_model = read_document(model_path)?;
    let raw_view = view_path.map(read_document).transpose()?;
    let value = value_path.map(read_document).transpose()?;

    let mut form = Form::new(&raw_model, raw_view.as_ref(), value, options);
    form.settle();

    if let Some((heading, messages)) = form.error_summary() {
        eprintln!("{}", heading);
        for message in messages {
            eprintln!("  {}", message);
        }
        return Ok(false);
    }

    let tree = form.render_tree();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tree)?),
        OutputFormat::Text => {
            for node in &tree {
                print_node(node, 0);
            }
        }
    }
    Ok(true)
}

fn print_node(node: &RenderNode, depth: usize) {
    let indent = "  ".repeat(depth);
    let id = if node.id.is_empty() { "<root>" } else { node.id.as_str() };
    let label = node.label.as_deref().unwrap_or("");
    let kind = serde_json::to_value(&node.kind)
        .ok()
        .and_then(|v| v.get("kind").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_default();

    match node.component() {
        Some(component) => println!("{}{} [{}] {} -> {}", indent, id, kind, label, component),
        None => println!("{}{} [{}] {}", indent, id, kind, label),
    }
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

fn cmd_resolve(reference: &str, value_path: &Path, start: Option<&str>, format: OutputFormat) -> Result<bool> {
    let value = read_document(value_path)?;
    let found = find_value(&value, reference, start);

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({"reference": reference, "value": found}))?
        ),
        OutputFormat::Text => match found {
            Some(v) => println!("{}", v),
            None => println!("<not found>"),
        },
    }
    Ok(found.is_some())
}
