//! Generate command - Render a bundled artifact from a preset.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use forge_artifacts::{ArtifactEmitter, ArtifactKind, ArtifactRenderer};
use forge_presets::CloudProvider;

use super::presets::{resolve, PresetSource};
use super::render::build_context;
use crate::config::ForgeConfig;

#[derive(Args)]
pub struct GenerateArgs {
    /// Artifact kind (kubernetes-deployment, fio-job, slurm-blueprint, nginx-ssl, nginx-cached)
    kind: ArtifactKind,

    /// Preset whose sections and flags seed the context
    #[arg(short, long)]
    preset: Option<String>,

    #[command(flatten)]
    source: PresetSource,

    /// Select provider variants for this cloud
    #[arg(long)]
    cloud: Option<CloudProvider>,

    /// Override a preset flag (KEY=VALUE, repeatable)
    #[arg(long = "flag", value_name = "KEY=VALUE")]
    flags: Vec<String>,

    /// YAML file layered over the preset context
    #[arg(short, long)]
    context: Option<PathBuf>,

    /// Set a context variable (KEY=VALUE, repeatable)
    #[arg(long = "var", value_name = "KEY=VALUE")]
    vars: Vec<String>,

    /// Directory whose templates replace bundled ones of the same name
    #[arg(long)]
    templates_dir: Option<PathBuf>,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Write to a uniquely named file under output_dir and print its path
    #[arg(long, conflicts_with = "out")]
    temp: bool,

    /// Log the full rendered text at debug level
    #[arg(long)]
    log_contents: bool,
}

/// Renderer over the bundled templates, with overrides from `templates_dir`
/// or the config when either is set.
pub fn renderer(templates_dir: Option<&Path>, config: &ForgeConfig) -> Result<ArtifactRenderer> {
    let options = config.template_options();
    match templates_dir.or(config.templates_dir.as_deref()) {
        Some(dir) => ArtifactRenderer::with_overrides(dir, options)
            .with_context(|| format!("Failed to load templates from {:?}", dir)),
        None => ArtifactRenderer::with_options(options).context("Failed to load bundled templates"),
    }
}

pub async fn execute(args: GenerateArgs, config: &ForgeConfig) -> Result<()> {
    let renderer = renderer(args.templates_dir.as_deref(), config)?;
    let extra = build_context(args.context.as_deref(), &args.vars)?;

    let artifact = match &args.preset {
        Some(name) => {
            let registry = args.source.load(config)?;
            let cloud = config.cloud(args.cloud)?;
            let preset = resolve(&registry, name, cloud, &args.flags)?;
            renderer.render_preset(args.kind, &preset, extra)
        }
        None => renderer.render(args.kind, &extra),
    }
    .with_context(|| format!("Failed to generate {}", args.kind))?;

    let emitter = ArtifactEmitter::new().log_contents(args.log_contents);
    if args.temp {
        let path = emitter.emit_temp(&artifact, &config.output_dir)?;
        println!("{}", path.display());
    } else if let Some(out) = &args.out {
        emitter.emit(&artifact, config.output_path(out))?;
    } else {
        print!("{}", artifact.content);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const PRESETS: &str = r#"
memtier_k8s:
  name: memtier
  flags:
    Name: memtier
    Image: redislabs/memtier_benchmark
    Replicas: 1
    RolloutTimeout: 600
    PodTimeout: 120
    CpuRequest: "2"
    MemoryRequest: 4Gi
    EphemeralStorageRequest: 10Gi
"#;

    fn args(temp: &Path) -> GenerateArgs {
        let file = temp.join("presets.yaml");
        fs::write(&file, PRESETS).unwrap();
        GenerateArgs {
            kind: ArtifactKind::KubernetesDeployment,
            preset: Some("memtier_k8s".into()),
            source: PresetSource::from_file(file),
            cloud: None,
            flags: vec!["Replicas=3".into()],
            context: None,
            vars: vec![],
            templates_dir: None,
            out: Some(temp.join("out/deployment.yaml")),
            temp: false,
            log_contents: false,
        }
    }

    #[tokio::test]
    async fn test_generate_from_preset() {
        let temp = tempdir().unwrap();
        execute(args(temp.path()), &ForgeConfig::default()).await.unwrap();

        let written = fs::read_to_string(temp.path().join("out/deployment.yaml")).unwrap();
        assert!(written.contains("replicas: 3"));
        assert!(written.contains("cpu: 2"));
    }

    #[tokio::test]
    async fn test_generate_temp_file() {
        let temp = tempdir().unwrap();
        let mut args = args(temp.path());
        args.out = None;
        args.temp = true;
        let config = ForgeConfig {
            output_dir: temp.path().to_path_buf(),
            ..ForgeConfig::default()
        };
        execute(args, &config).await.unwrap();

        let emitted: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| name.starts_with("forge-deployment.yaml"))
            .collect();
        assert_eq!(emitted.len(), 1);
    }

    #[tokio::test]
    async fn test_generate_unknown_preset() {
        let temp = tempdir().unwrap();
        let mut args = args(temp.path());
        args.preset = Some("nope".into());
        let err = execute(args, &ForgeConfig::default()).await.unwrap_err();
        assert!(err.downcast_ref::<forge_presets::PresetError>().is_some());
    }
}
