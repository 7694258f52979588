//! Typed render contexts for the bundled artifacts.
//!
//! Field names serialize to the placeholder names the templates use, so a
//! context built from one of these structs is complete by construction.
//! Optional fields are left out of the context entirely when unset, which is
//! what the templates' `if` and `is defined` guards test for.

use serde::{Deserialize, Serialize};

use crate::kind::ArtifactKind;

/// A typed context bound to one artifact kind.
pub trait ArtifactSpec: Serialize {
    const KIND: ArtifactKind;
}

/// Parameters of a containerized benchmark deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Image")]
    pub image: String,
    #[serde(rename = "Replicas")]
    pub replicas: u32,
    /// Seconds Kubernetes waits for the rollout to progress.
    #[serde(rename = "RolloutTimeout")]
    pub rollout_timeout: u32,
    /// Seconds a pod tolerates an unready or unreachable node.
    #[serde(rename = "PodTimeout")]
    pub pod_timeout: u32,
    #[serde(rename = "Command", default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(rename = "CpuRequest")]
    pub cpu_request: String,
    #[serde(rename = "MemoryRequest")]
    pub memory_request: String,
    #[serde(rename = "EphemeralStorageRequest")]
    pub ephemeral_storage_request: String,
    #[serde(rename = "NvidiaGpuRequest", default, skip_serializing_if = "Option::is_none")]
    pub nvidia_gpu_request: Option<u32>,
    /// `key: value` lines placed under `nodeSelector`.
    #[serde(rename = "NodeSelectors", default, skip_serializing_if = "Vec::is_empty")]
    pub node_selectors: Vec<String>,
}

impl DeploymentSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            replicas: 1,
            rollout_timeout: 900,
            pod_timeout: 300,
            command: None,
            cpu_request: "1".to_string(),
            memory_request: "1Gi".to_string(),
            ephemeral_storage_request: "1Gi".to_string(),
            nvidia_gpu_request: None,
            node_selectors: Vec::new(),
        }
    }

    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = Some(command.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_gpus(mut self, count: u32) -> Self {
        self.nvidia_gpu_request = Some(count);
        self
    }

    pub fn with_node_selector(mut self, key: &str, value: &str) -> Self {
        self.node_selectors.push(format!("{}: {}", key, value));
        self
    }
}

impl ArtifactSpec for DeploymentSpec {
    const KIND: ArtifactKind = ArtifactKind::KubernetesDeployment;
}

/// One fio workload, e.g. random 4k reads at queue depth 64.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FioScenario {
    pub name: String,
    pub rwkind: String,
    pub blocksize: String,
    pub iodepth: u32,
    pub numjobs: u32,
    pub size: String,
    /// Read percentage for mixed workloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rwmixread: Option<u32>,
}

/// A disk the scenarios run against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskPair {
    /// Position of the disk in the job, starting at 0.
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_filename: Option<String>,
}

/// Parameters of an fio job file.
///
/// Every scenario produces one section per disk pair, scenario-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FioJobSpec {
    pub ioengine: String,
    pub direct: u32,
    pub runtime: u32,
    pub ramptime: u32,
    pub filename: String,
    pub scenarios: Vec<FioScenario>,
    pub disks_list: Vec<DiskPair>,
    /// Suffix section names with the disk index.
    #[serde(default)]
    pub separate_jobs: bool,
    /// Run a scenario on all disks at once instead of one after another.
    #[serde(default)]
    pub fio_run_parallel_jobs_on_disks: bool,
}

impl FioJobSpec {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            ioengine: "libaio".to_string(),
            direct: 1,
            runtime: 600,
            ramptime: 10,
            filename: filename.into(),
            scenarios: Vec::new(),
            disks_list: vec![DiskPair {
                index: 0,
                disk_filename: None,
            }],
            separate_jobs: false,
            fio_run_parallel_jobs_on_disks: false,
        }
    }

    /// Replace the disk list with one pair per file name.
    pub fn with_disks<I, S>(mut self, filenames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disks_list = filenames
            .into_iter()
            .enumerate()
            .map(|(index, name)| DiskPair {
                index: index as u32,
                disk_filename: Some(name.into()),
            })
            .collect();
        self
    }

    pub fn with_scenario(mut self, scenario: FioScenario) -> Self {
        self.scenarios.push(scenario);
        self
    }
}

impl ArtifactSpec for FioJobSpec {
    const KIND: ArtifactKind = ArtifactKind::FioJob;
}

/// Parameters of a Slurm cluster blueprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlurmBlueprintSpec {
    pub name: String,
    pub project: String,
    pub region: String,
    pub zone: String,
    pub num_workers: u32,
    #[serde(default)]
    pub max_dynamic_workers: u32,
    pub compute_machine_type: String,
    pub controller_machine_type: String,
    pub image_family: String,
    pub image_project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_disk_size_gb: Option<u32>,
    #[serde(default)]
    pub enable_placement: bool,
}

impl ArtifactSpec for SlurmBlueprintSpec {
    const KIND: ArtifactKind = ArtifactKind::SlurmBlueprint;
}
