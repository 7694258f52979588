//! Integration tests for the bundled artifacts.

use std::sync::Arc;
use std::thread;

use forge_artifacts::{
    ArtifactKind, ArtifactRenderer, DeploymentSpec, FioJobSpec, FioScenario, SlurmBlueprintSpec,
};
use forge_presets::PresetRegistry;
use forge_templates::Context;
use serde_yaml::Value;

fn scenario(name: &str, rwkind: &str, iodepth: u32, numjobs: u32) -> FioScenario {
    FioScenario {
        name: name.to_string(),
        rwkind: rwkind.to_string(),
        blocksize: "4k".to_string(),
        iodepth,
        numjobs,
        size: "100%".to_string(),
        rwmixread: None,
    }
}

fn two_by_three(parallel: bool) -> FioJobSpec {
    let mut spec = FioJobSpec::new("/dev/sdb")
        .with_scenario(scenario("rand_read", "randread", 64, 1))
        .with_scenario(scenario("seq_write", "write", 8, 4))
        .with_disks(["/dev/sdb", "/dev/sdc", "/dev/sdd"]);
    spec.separate_jobs = true;
    spec.fio_run_parallel_jobs_on_disks = parallel;
    spec
}

fn section_headers(content: &str) -> Vec<&str> {
    content
        .lines()
        .filter(|l| l.starts_with('[') && *l != "[global]")
        .collect()
}

#[test]
fn test_fio_single_section_exact_output() {
    let spec = FioJobSpec::new("/dev/sdb").with_scenario(scenario("rand_read", "randread", 64, 1));
    let out = ArtifactRenderer::new().unwrap().render_spec(&spec).unwrap();

    let expected = "\
[global]
ioengine=libaio
invalidate=1
direct=1
runtime=600
ramp_time=10
time_based
filename=/dev/sdb
do_verify=0
verify_fatal=0
group_reporting=1
percentile_list=1:5:10:20:25:30:40:50:60:70:75:80:90:95:99:99.5:99.9:99.95:99.99
randrepeat=0

[rand_read-io-depth-64-num-jobs-1]
stonewall
rw=randread
blocksize=4k
iodepth=64
size=100%
numjobs=1";
    assert_eq!(out.content, expected);
    assert_eq!(out.file_name, "fio.job");
}

#[test]
fn test_fio_sections_are_scenario_major() {
    let out = ArtifactRenderer::new()
        .unwrap()
        .render_spec(&two_by_three(true))
        .unwrap();

    assert_eq!(
        section_headers(&out.content),
        vec![
            "[rand_read-io-depth-64-num-jobs-1.0]",
            "[rand_read-io-depth-64-num-jobs-1.1]",
            "[rand_read-io-depth-64-num-jobs-1.2]",
            "[seq_write-io-depth-8-num-jobs-4.0]",
            "[seq_write-io-depth-8-num-jobs-4.1]",
            "[seq_write-io-depth-8-num-jobs-4.2]",
        ]
    );
    assert_eq!(out.content.matches("filename=/dev/sdc").count(), 2);
}

#[test]
fn test_fio_stonewall_placement() {
    let renderer = ArtifactRenderer::new().unwrap();

    let parallel = renderer.render_spec(&two_by_three(true)).unwrap();
    assert_eq!(parallel.content.matches("\nstonewall\n").count(), 2);

    let serial = renderer.render_spec(&two_by_three(false)).unwrap();
    assert_eq!(serial.content.matches("\nstonewall\n").count(), 6);
}

#[test]
fn test_fio_mixed_workload_line() {
    let mut mixed = scenario("mixed", "randrw", 16, 2);
    mixed.rwmixread = Some(70);
    let spec = FioJobSpec::new("/dev/sdb")
        .with_scenario(mixed)
        .with_scenario(scenario("rand_read", "randread", 64, 1));
    let out = ArtifactRenderer::new().unwrap().render_spec(&spec).unwrap();

    assert_eq!(out.content.matches("rwmixread=").count(), 1);
    assert!(out.content.contains("rw=randrw\nrwmixread=70\nblocksize=4k"));
}

fn requests(content: &str) -> Value {
    let doc: Value = serde_yaml::from_str(content).unwrap();
    doc["spec"]["template"]["spec"]["containers"][0]["resources"]["requests"].clone()
}

#[test]
fn test_deployment_without_gpu_omits_gpu_line() {
    let spec = DeploymentSpec::new("memtier", "redislabs/memtier_benchmark");
    let out = ArtifactRenderer::new().unwrap().render_spec(&spec).unwrap();

    assert!(!out.content.contains("nvidia.com/gpu"));
    assert!(!out.content.contains("command:"));
    assert!(!out.content.contains("nodeSelector"));
    let requests = requests(&out.content);
    assert_eq!(requests["memory"], Value::from("1Gi"));
    assert!(requests.get("nvidia.com/gpu").is_none());
}

#[test]
fn test_deployment_with_gpu_and_selectors() {
    let spec = DeploymentSpec::new("training", "nvcr.io/nvidia/pytorch:24.01")
        .with_gpus(2)
        .with_command(["python", "train.py"])
        .with_node_selector("cloud.google.com/gke-accelerator", "nvidia-l4");
    let out = ArtifactRenderer::new().unwrap().render_spec(&spec).unwrap();

    let doc: Value = serde_yaml::from_str(&out.content).unwrap();
    let pod = &doc["spec"]["template"]["spec"];
    assert_eq!(pod["containers"][0]["resources"]["requests"]["nvidia.com/gpu"], Value::from(2));
    assert_eq!(pod["containers"][0]["resources"]["limits"]["nvidia.com/gpu"], Value::from(2));
    assert_eq!(pod["containers"][0]["command"][1], Value::from("train.py"));
    assert_eq!(
        pod["nodeSelector"]["cloud.google.com/gke-accelerator"],
        Value::from("nvidia-l4")
    );
    assert_eq!(pod["tolerations"][0]["tolerationSeconds"], Value::from(300));
    assert_eq!(doc["spec"]["progressDeadlineSeconds"], Value::from(900));
}

#[test]
fn test_slurm_module_order() {
    let spec = SlurmBlueprintSpec {
        name: "hpc-bench".to_string(),
        project: "bench-project".to_string(),
        region: "us-central1".to_string(),
        zone: "us-central1-a".to_string(),
        num_workers: 4,
        max_dynamic_workers: 0,
        compute_machine_type: "c2-standard-60".to_string(),
        controller_machine_type: "n2-standard-4".to_string(),
        image_family: "slurm-gcp-6-5-hpc-rocky-linux-8".to_string(),
        image_project: "schedmd-slurm-public".to_string(),
        compute_disk_size_gb: None,
        enable_placement: true,
    };
    let out = ArtifactRenderer::new().unwrap().render_spec(&spec).unwrap();

    let doc: Value = serde_yaml::from_str(&out.content).unwrap();
    let ids: Vec<_> = doc["deployment_groups"][0]["modules"]
        .as_sequence()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        ids,
        vec!["network", "compute_nodeset", "compute_partition", "slurm_controller"]
    );
    let nodeset = &doc["deployment_groups"][0]["modules"][1]["settings"];
    assert_eq!(nodeset["node_count_static"], Value::from(4));
    assert_eq!(nodeset["enable_placement"], Value::from(true));
    assert!(nodeset.get("disk_size_gb").is_none());
}

#[test]
fn test_render_is_deterministic_across_threads() {
    let renderer = Arc::new(ArtifactRenderer::new().unwrap());
    let spec = Arc::new(two_by_three(false));
    let expected = renderer.render_spec(spec.as_ref()).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let renderer = Arc::clone(&renderer);
            let spec = Arc::clone(&spec);
            thread::spawn(move || renderer.render_spec(spec.as_ref()).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_render_from_preset_with_overrides() {
    let registry = PresetRegistry::from_yaml_str(
        r#"
memtier_k8s:
  name: memtier
  flags:
    Name: memtier
    Image: redislabs/memtier_benchmark
    Replicas: 2
    RolloutTimeout: 600
    PodTimeout: 120
    CpuRequest: "4"
    MemoryRequest: 8Gi
    EphemeralStorageRequest: 10Gi
"#,
    )
    .unwrap();
    let preset = registry.resolve("memtier_k8s").unwrap();
    let renderer = ArtifactRenderer::new().unwrap();

    let out = renderer
        .render_preset(ArtifactKind::KubernetesDeployment, &preset, Context::new())
        .unwrap();
    assert!(out.content.contains("replicas: 2"));
    assert!(out.content.contains("tolerationSeconds: 120"));

    let out = renderer
        .render_preset(
            ArtifactKind::KubernetesDeployment,
            &preset,
            Context::new().with("Replicas", 3),
        )
        .unwrap();
    assert!(out.content.contains("replicas: 3"));
}
