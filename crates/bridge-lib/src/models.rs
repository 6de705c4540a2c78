//! Core data model for the submission bridge
//!
//! Mirrors the subset of the orchestrator's pod specification the bridge
//! needs, plus the artifacts it produces: per-container commands, the
//! job-wide resource ceiling, and the caller-visible outcome.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inbound submission request wrapping one pod
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodSubmission {
    pub pod: Pod,
}

/// The orchestrator's unit of deployment, mapped one-to-one to a batch job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pod {
    pub uid: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
}

impl Pod {
    /// Init containers first, then regular containers, declared order
    /// within each group. Resource aggregation and script layout both
    /// depend on this iteration order.
    pub fn ordered_containers(&self) -> impl Iterator<Item = (&ContainerSpec, bool)> {
        self.spec
            .init_containers
            .iter()
            .map(|c| (c, true))
            .chain(self.spec.containers.iter().map(|c| (c, false)))
    }
}

/// Object metadata used for job naming and image resolution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PodSpec {
    #[serde(default)]
    pub init_containers: Vec<ContainerSpec>,
    #[serde(default)]
    pub containers: Vec<ContainerSpec>,
    #[serde(default)]
    pub volumes: Vec<Volume>,
}

/// One container of a pod, read-only input to the submission path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub resources: Resources,
    #[serde(default)]
    pub volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resources {
    #[serde(default)]
    pub limits: ResourceClaims,
}

/// Declared limits; zero means "undeclared" for aggregation purposes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceClaims {
    /// CPU limit in cores, fractional values allowed
    #[serde(default)]
    pub cpu: f64,
    /// Memory limit in bytes
    #[serde(default)]
    pub memory: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    #[serde(default)]
    pub host_path: Option<HostPathVolume>,
    #[serde(default)]
    pub empty_dir: Option<EmptyDirVolume>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostPathVolume {
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmptyDirVolume {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    #[serde(default)]
    pub read_only: bool,
}

/// Fully assembled invocation for one container, handed by value to
/// script generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerCommand {
    pub runtime: String,
    pub container_name: String,
    pub is_init: bool,
    /// Runtime prefix + env tokens + mount fragment + image or container name
    pub tokens: Vec<String>,
    /// Original entrypoint, kept for traceability
    pub command: Vec<String>,
    pub args: Vec<String>,
    pub image: String,
}

/// Job-wide resource ceiling derived from all containers of one pod
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Whole cores, fractional container limits rounded up
    pub cpu: i64,
    pub memory_bytes: i64,
    /// True when the CPU ceiling came from the default floor rather than
    /// an explicit declaration that exceeded it
    pub cpu_defaulted: bool,
    pub memory_defaulted: bool,
}

/// Caller-visible outcome of a successful submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub pod_uid: String,
    pub job_id: String,
}
