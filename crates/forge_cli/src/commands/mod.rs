//! CLI command definitions.
//!
//! Each subcommand is a thin layer over one of the forge libraries.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use forge_presets::parse_flag_override;
use forge_templates::{Context, Value};

use crate::config::ArgumentError;

pub mod batch;
pub mod check_templates;
pub mod generate;
pub mod presets;
pub mod render;

/// benchforge - benchmark presets and configuration artifacts
#[derive(Parser)]
#[command(name = "forge")]
#[command(version, about = "benchforge - benchmark presets and configuration artifacts")]
#[command(long_about = r#"
benchforge resolves named benchmark presets and renders the configuration
files a benchmark run needs: Kubernetes deployments, fio job files, Slurm
blueprints and nginx configs.

COMMANDS:
  presets          → List or resolve presets
  render           → Render a template file with a YAML context
  generate         → Render a bundled artifact from a preset
  batch            → Render many artifacts in parallel from a manifest
  check-templates  → Parse every template and report syntax errors

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Preset error
  4 - Template error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file (defaults to ./forge.toml when present)
    #[arg(long, global = true, env = "FORGE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List or resolve presets
    Presets(presets::PresetsArgs),

    /// Render a template with a YAML context
    Render(render::RenderArgs),

    /// Render a bundled artifact from a preset
    Generate(generate::GenerateArgs),

    /// Render the jobs of a batch manifest in parallel
    Batch(batch::BatchArgs),

    /// Parse every template and report syntax errors
    #[command(name = "check-templates")]
    CheckTemplates(check_templates::CheckTemplatesArgs),
}

/// Parse `--var KEY=VALUE` arguments into a context. Values are typed the
/// same way preset flag overrides are.
pub fn parse_vars(vars: &[String]) -> Result<Context> {
    let mut context = Context::new();
    for raw in vars {
        let (key, value) =
            parse_flag_override(raw).map_err(|e| ArgumentError(format!("--var {}: {}", raw, e)))?;
        context.insert(key, Value::from(value));
    }
    Ok(context)
}

/// Parse `--flag KEY=VALUE` arguments.
pub fn parse_flags(flags: &[String]) -> Result<Vec<(String, serde_yaml::Value)>> {
    flags
        .iter()
        .map(|raw| {
            parse_flag_override(raw)
                .map_err(|e| anyhow::Error::from(ArgumentError(format!("--flag {}: {}", raw, e))))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_vars_types_values() {
        let ctx = parse_vars(&["Replicas=3".into(), "Image=nginx:1.25".into(), "gpu=true".into()]).unwrap();
        assert_eq!(ctx.get("Replicas"), Some(&Value::Int(3)));
        assert_eq!(ctx.get("Image"), Some(&Value::from("nginx:1.25")));
        assert_eq!(ctx.get("gpu"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_parse_vars_rejects_missing_equals() {
        let err = parse_vars(&["Replicas".into()]).unwrap_err();
        assert!(err.downcast_ref::<ArgumentError>().is_some());
    }
}
