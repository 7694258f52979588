//! The artifact kinds shipped with the binary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ArtifactError;

/// A configuration file the tool knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// Kubernetes `Deployment` manifest for a containerized benchmark.
    KubernetesDeployment,
    /// fio job file.
    FioJob,
    /// HPC toolkit blueprint for a Slurm cluster.
    SlurmBlueprint,
    /// Static nginx site with the legacy `ssl on;` directive.
    NginxSsl,
    /// Static nginx site with open-file caching.
    NginxCached,
}

impl ArtifactKind {
    pub fn all() -> &'static [ArtifactKind] {
        &[
            ArtifactKind::KubernetesDeployment,
            ArtifactKind::FioJob,
            ArtifactKind::SlurmBlueprint,
            ArtifactKind::NginxSsl,
            ArtifactKind::NginxCached,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::KubernetesDeployment => "kubernetes-deployment",
            ArtifactKind::FioJob => "fio-job",
            ArtifactKind::SlurmBlueprint => "slurm-blueprint",
            ArtifactKind::NginxSsl => "nginx-ssl",
            ArtifactKind::NginxCached => "nginx-cached",
        }
    }

    /// Name of the template within a template set.
    pub fn template_name(&self) -> &'static str {
        match self {
            ArtifactKind::KubernetesDeployment => "container/kubernetes_deployment.yaml.j2",
            ArtifactKind::FioJob => "fio.job.j2",
            ArtifactKind::SlurmBlueprint => "slurm/blueprint.yaml.j2",
            ArtifactKind::NginxSsl => "nginx/static_ssl.conf.j2",
            ArtifactKind::NginxCached => "nginx/static_cached.conf.j2",
        }
    }

    /// File name used when emitting into a directory.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            ArtifactKind::KubernetesDeployment => "deployment.yaml",
            ArtifactKind::FioJob => "fio.job",
            ArtifactKind::SlurmBlueprint => "blueprint.yaml",
            ArtifactKind::NginxSsl | ArtifactKind::NginxCached => "nginx.conf",
        }
    }

    /// Bundled template source.
    pub fn source(&self) -> &'static str {
        match self {
            ArtifactKind::KubernetesDeployment => {
                include_str!("../templates/container/kubernetes_deployment.yaml.j2")
            }
            ArtifactKind::FioJob => include_str!("../templates/fio.job.j2"),
            ArtifactKind::SlurmBlueprint => include_str!("../templates/slurm/blueprint.yaml.j2"),
            ArtifactKind::NginxSsl => include_str!("../templates/nginx/static_ssl.conf.j2"),
            ArtifactKind::NginxCached => include_str!("../templates/nginx/static_cached.conf.j2"),
        }
    }

    /// Static kinds render the same text for every context.
    pub fn is_static(&self) -> bool {
        matches!(self, ArtifactKind::NginxSsl | ArtifactKind::NginxCached)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = ArtifactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<_> = Self::all().iter().map(|k| k.as_str()).collect();
                ArtifactError::UnknownKind(s.to_string(), known.join(", "))
            })
    }
}
