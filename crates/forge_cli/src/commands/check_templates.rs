//! Check-templates command - Parse every template and report syntax errors.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use forge_artifacts::{ArtifactKind, ArtifactRenderer};
use forge_templates::TemplateSet;

use crate::config::ForgeConfig;

#[derive(Args)]
pub struct CheckTemplatesArgs {
    /// Templates directory (defaults to templates_dir from the config)
    #[arg(long)]
    templates_dir: Option<PathBuf>,
}

pub async fn execute(args: CheckTemplatesArgs, config: &ForgeConfig) -> Result<()> {
    let options = config.template_options();

    println!("🧪 Checking {} bundled template(s)...", ArtifactKind::all().len());
    ArtifactRenderer::with_options(options).context("Bundled templates failed to parse")?;
    println!("   ✅ Bundled templates parse");

    let Some(dir) = args.templates_dir.or_else(|| config.templates_dir.clone()) else {
        return Ok(());
    };
    if !dir.exists() {
        anyhow::bail!("Templates directory not found: {:?}", dir);
    }

    info!("Checking templates under {:?}", dir);
    println!("🧪 Checking templates in {}...", dir.display());
    let failures = TemplateSet::check_dir(&dir, options);
    let count = failures.len();
    for (path, error) in &failures {
        println!("   ❌ {}: {}", path.display(), error);
    }

    match failures.into_iter().next() {
        None => {
            println!("   ✅ All templates parse");
            Ok(())
        }
        Some((_, first)) => {
            Err(anyhow::Error::new(first).context(format!("{} template(s) failed to parse", count)))
        }
    }
}
