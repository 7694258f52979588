//! Presets command - List and resolve presets.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use tracing::info;

use forge_presets::{CloudProvider, PresetLoader, PresetRegistry, ResolvedPreset};

use super::parse_flags;
use crate::config::ForgeConfig;

#[derive(Args)]
pub struct PresetsArgs {
    #[command(subcommand)]
    command: PresetsCommand,
}

#[derive(Subcommand)]
enum PresetsCommand {
    /// List preset names, the benchmark each one runs and the file declaring it
    List {
        #[command(flatten)]
        source: PresetSource,
    },

    /// Resolve one preset and print it
    Resolve {
        /// Preset name
        name: String,

        #[command(flatten)]
        source: PresetSource,

        /// Select provider variants for this cloud
        #[arg(long)]
        cloud: Option<CloudProvider>,

        /// Override a flag after resolution (KEY=VALUE, repeatable)
        #[arg(long = "flag", value_name = "KEY=VALUE")]
        flags: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },
}

/// Where presets are read from.
#[derive(Args, Clone, Default)]
pub struct PresetSource {
    /// Single preset file
    #[arg(long, conflicts_with = "dir")]
    file: Option<PathBuf>,

    /// Directory of preset files (defaults to presets_dir from the config)
    #[arg(long)]
    dir: Option<PathBuf>,
}

impl PresetSource {
    #[cfg(test)]
    pub fn from_file(file: PathBuf) -> Self {
        Self {
            file: Some(file),
            dir: None,
        }
    }

    pub fn load(&self, config: &ForgeConfig) -> Result<PresetRegistry> {
        match &self.file {
            Some(file) => PresetLoader::load_file(file)
                .with_context(|| format!("Failed to load presets from {:?}", file)),
            None => {
                let dir = self.dir.as_deref().unwrap_or(&config.presets_dir);
                load_dir(dir)
            }
        }
    }
}

fn load_dir(dir: &Path) -> Result<PresetRegistry> {
    PresetLoader::new(dir)
        .load_all()
        .with_context(|| format!("Failed to load presets from {:?}", dir))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

pub async fn execute(args: PresetsArgs, config: &ForgeConfig) -> Result<()> {
    match args.command {
        PresetsCommand::List { source } => list(&source, config),
        PresetsCommand::Resolve {
            name,
            source,
            cloud,
            flags,
            format,
        } => {
            let registry = source.load(config)?;
            let cloud = config.cloud(cloud)?;
            let preset = resolve(&registry, &name, cloud, &flags)?;
            print!("{}", format_preset(&preset, format)?);
            Ok(())
        }
    }
}

fn list(source: &PresetSource, config: &ForgeConfig) -> Result<()> {
    let registry = source.load(config)?;
    if registry.is_empty() {
        println!("⚠️  No presets found");
        return Ok(());
    }

    for (name, resolved) in registry.resolve_all() {
        let origin = registry.origin(name).unwrap_or_default();
        match resolved {
            Ok(preset) => println!("{:<40} {:<24} {}", name, preset.benchmark, origin),
            Err(e) => println!("{:<40} ❌ {} ({})", name, e, origin),
        }
    }
    Ok(())
}

/// Resolve a preset, select a provider if given, then apply overrides.
pub fn resolve(
    registry: &PresetRegistry,
    name: &str,
    cloud: Option<CloudProvider>,
    flags: &[String],
) -> Result<ResolvedPreset> {
    let preset = match cloud {
        Some(provider) => registry.resolve_for(name, provider),
        None => registry.resolve(name),
    }
    .with_context(|| format!("Failed to resolve preset '{}'", name))?;

    let overrides = parse_flags(flags)?;
    if !overrides.is_empty() {
        info!("Applying {} flag override(s) to {}", overrides.len(), name);
    }
    Ok(preset.with_flag_overrides(overrides))
}

fn format_preset(preset: &ResolvedPreset, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(preset).context("Failed to serialize preset"),
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(preset).context("Failed to serialize preset")?;
            out.push('\n');
            Ok(out)
        }
    }
}
