//! Collaborators of the submission orchestrator
//!
//! Everything that touches the filesystem or the scheduler binaries sits
//! behind the [`Backend`] trait so the orchestrator can be exercised
//! against in-memory fakes. The production implementation is
//! [`SlurmBackend`].

mod script;
mod slurm;
mod stage;

pub use script::render_script;
pub use slurm::{extract_job_id, SlurmBackend};

use crate::config::BridgeConfig;
use crate::jobs::JobTable;
use crate::models::{ContainerCommand, ContainerSpec, ObjectMeta, Pod, ResourceLimits};
use anyhow::Result;
use std::path::{Path, PathBuf};

pub use async_trait::async_trait;

/// Scheduler- and filesystem-facing collaborators of one submission
#[async_trait]
pub trait Backend: Send + Sync {
    /// Create the pod's working directory and render the container's
    /// mount fragment from the pod's declared volumes.
    async fn prepare_mounts(
        &self,
        config: &BridgeConfig,
        pod: &Pod,
        container: &ContainerSpec,
        work_dir: &Path,
    ) -> Result<String>;

    /// Render environment tokens for a container. Best effort, no I/O.
    fn prepare_envs(&self, config: &BridgeConfig, container: &ContainerSpec) -> Vec<String>;

    /// Resolve an image reference against the configured prefix.
    fn resolve_image(&self, config: &BridgeConfig, metadata: &ObjectMeta, image: &str) -> String;

    /// Render and write the batch script, returning its path.
    async fn generate_script(
        &self,
        config: &BridgeConfig,
        pod_uid: &str,
        work_dir: &Path,
        metadata: &ObjectMeta,
        commands: &[ContainerCommand],
        limits: &ResourceLimits,
    ) -> Result<PathBuf>;

    /// Hand the script to the scheduler's submit binary, returning its
    /// raw output.
    async fn submit_script(&self, config: &BridgeConfig, script: &Path) -> Result<String>;

    /// Extract the job id from raw submit output, associate it with the
    /// pod and persist it under the working directory. A failure leaves
    /// no tracking entry created by this call behind.
    async fn record_job(
        &self,
        output: &str,
        pod: &Pod,
        jobs: &JobTable,
        work_dir: &Path,
    ) -> Result<String>;

    /// Compensating cancellation plus purge after a post-submit failure:
    /// best-effort scancel of the job named by this submission's raw
    /// submit output, then removal of the working directory. Jobs tracked
    /// for the pod by earlier submissions are left alone. Errors are
    /// logged by the implementation, never propagated.
    async fn cleanup(&self, config: &BridgeConfig, submit_output: &str, pod_uid: &str, work_dir: &Path);

    /// Best-effort removal of the working directory for pre-submit
    /// failures.
    async fn purge_workdir(&self, work_dir: &Path);
}
