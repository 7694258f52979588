//! Batch command - Render many artifacts in parallel.
//!
//! A manifest lists jobs:
//!
//! ```yaml
//! jobs:
//!   - kind: fio-job
//!     out: fio/ssd.job
//!     context: {ioengine: libaio, ...}
//!   - kind: kubernetes-deployment
//!     preset: memtier_k8s
//!     cloud: GCP
//!     flags: {Replicas: 4}
//!     out: k8s/memtier.yaml
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context as _, Result};
use clap::Args;
use serde::Deserialize;
use tracing::{info, warn};

use forge_artifacts::{ArtifactEmitter, ArtifactKind, ArtifactRenderer, RenderedArtifact};
use forge_presets::{CloudProvider, PresetRegistry};
use forge_templates::{Context, Value};

use super::generate::renderer;
use super::presets::PresetSource;
use crate::config::ForgeConfig;

#[derive(Args)]
pub struct BatchArgs {
    /// Batch manifest (YAML)
    manifest: PathBuf,

    #[command(flatten)]
    source: PresetSource,

    /// Provider for jobs that do not name one
    #[arg(long)]
    cloud: Option<CloudProvider>,

    /// Directory whose templates replace bundled ones of the same name
    #[arg(long)]
    templates_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchManifest {
    pub jobs: Vec<BatchJob>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchJob {
    pub kind: ArtifactKind,
    /// Output path, relative to output_dir.
    pub out: PathBuf,
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub cloud: Option<CloudProvider>,
    #[serde(default)]
    pub flags: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub context: serde_yaml::Value,
}

impl BatchManifest {
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read batch manifest {:?}", path))?;
        serde_yaml::from_str(&source).with_context(|| format!("Invalid batch manifest {:?}", path))
    }

    fn uses_presets(&self) -> bool {
        self.jobs.iter().any(|job| job.preset.is_some())
    }
}

/// Shared, read-only state handed to every job.
struct BatchRunner {
    renderer: ArtifactRenderer,
    registry: Option<PresetRegistry>,
    default_cloud: Option<CloudProvider>,
    output_dir: PathBuf,
    emitter: ArtifactEmitter,
}

impl BatchRunner {
    fn render(&self, job: &BatchJob) -> Result<RenderedArtifact> {
        let context = Context::from_value(Value::from(job.context.clone()))?;
        let artifact = match &job.preset {
            Some(name) => {
                let registry = self
                    .registry
                    .as_ref()
                    .ok_or_else(|| anyhow!("No presets loaded for preset '{}'", name))?;
                let preset = match job.cloud.or(self.default_cloud) {
                    Some(provider) => registry.resolve_for(name, provider),
                    None => registry.resolve(name),
                }?
                .with_flag_overrides(job.flags.clone());
                self.renderer.render_preset(job.kind, &preset, context)?
            }
            None => {
                if !job.flags.is_empty() {
                    warn!("Ignoring flags on {} job without a preset", job.kind);
                }
                self.renderer.render(job.kind, &context)?
            }
        };
        Ok(artifact)
    }

    fn run(&self, job: &BatchJob) -> Result<PathBuf> {
        let artifact = self.render(job)?;
        Ok(self.emitter.emit(&artifact, self.output_dir.join(&job.out))?)
    }
}

/// Run every job on the blocking pool. Results come back in manifest order.
async fn run_jobs(runner: Arc<BatchRunner>, jobs: Vec<BatchJob>) -> Vec<(BatchJob, Result<PathBuf>)> {
    let handles: Vec<_> = jobs
        .into_iter()
        .map(|job| {
            let runner = Arc::clone(&runner);
            let task_job = job.clone();
            let handle = tokio::task::spawn_blocking(move || runner.run(&task_job));
            (job, handle)
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (job, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(anyhow::Error::new(e).context("Batch job did not complete")),
        };
        results.push((job, result));
    }
    results
}

pub async fn execute(args: BatchArgs, config: &ForgeConfig) -> Result<()> {
    let manifest = BatchManifest::from_file(&args.manifest)?;
    info!("Running {} batch job(s) from {:?}", manifest.jobs.len(), args.manifest);

    let registry = if manifest.uses_presets() {
        Some(args.source.load(config)?)
    } else {
        None
    };
    let runner = Arc::new(BatchRunner {
        renderer: renderer(args.templates_dir.as_deref(), config)?,
        registry,
        default_cloud: config.cloud(args.cloud)?,
        output_dir: config.output_dir.clone(),
        emitter: ArtifactEmitter::new(),
    });

    let total = manifest.jobs.len();
    let results = run_jobs(runner, manifest.jobs).await;

    let mut first_failure = None;
    let mut failed = 0;
    for (job, result) in results {
        match result {
            Ok(path) => println!("✅ {} → {}", job.kind, path.display()),
            Err(e) => {
                println!("❌ {} → {}: {:#}", job.kind, job.out.display(), e);
                failed += 1;
                first_failure.get_or_insert(e);
            }
        }
    }

    println!();
    println!("Results: {} passed, {} failed", total - failed, failed);

    match first_failure {
        Some(e) => Err(e.context(format!("{} of {} batch job(s) failed", failed, total))),
        None => Ok(()),
    }
}
