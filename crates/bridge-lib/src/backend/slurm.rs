//! Production backend: SLURM binaries and the pod working directory

use super::{render_script, stage, Backend};
use crate::config::BridgeConfig;
use crate::jobs::JobTable;
use crate::models::{ContainerCommand, ContainerSpec, ObjectMeta, Pod, ResourceLimits};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{error, info, warn};

/// File under the working directory holding the recorded job id, read by
/// the status/deletion path
const JOB_ID_FILE: &str = "JobID.jid";

/// Backend that shells out to sbatch/scancel and stages files on disk
#[derive(Debug, Default, Clone)]
pub struct SlurmBackend;

impl SlurmBackend {
    pub fn new() -> Self {
        Self
    }

    /// Check that the scheduler submit binary can be invoked at all.
    /// Used at startup to seed the scheduler health component.
    pub async fn probe_scheduler(&self, config: &BridgeConfig) -> Result<()> {
        Command::new(&config.sbatch_path)
            .arg("--version")
            .output()
            .await
            .map(|_| ())
            .with_context(|| format!("probing {}", config.sbatch_path))
    }
}

#[async_trait]
impl Backend for SlurmBackend {
    async fn prepare_mounts(
        &self,
        config: &BridgeConfig,
        pod: &Pod,
        container: &ContainerSpec,
        work_dir: &Path,
    ) -> Result<String> {
        stage::prepare_mounts(config, pod, container, work_dir).await
    }

    fn prepare_envs(&self, config: &BridgeConfig, container: &ContainerSpec) -> Vec<String> {
        stage::prepare_envs(config, container)
    }

    fn resolve_image(&self, config: &BridgeConfig, metadata: &ObjectMeta, image: &str) -> String {
        stage::resolve_image(config, metadata, image)
    }

    async fn generate_script(
        &self,
        config: &BridgeConfig,
        pod_uid: &str,
        work_dir: &Path,
        metadata: &ObjectMeta,
        commands: &[ContainerCommand],
        limits: &ResourceLimits,
    ) -> Result<PathBuf> {
        let script = render_script(config, pod_uid, work_dir, metadata, commands, limits);
        let path = work_dir.join("job.sh");
        tokio::fs::write(&path, script)
            .await
            .with_context(|| format!("writing batch script {}", path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o755);
            tokio::fs::set_permissions(&path, perms)
                .await
                .context("setting batch script permissions")?;
        }
        Ok(path)
    }

    async fn submit_script(&self, config: &BridgeConfig, script: &Path) -> Result<String> {
        let out = Command::new(&config.sbatch_path)
            .arg(script)
            .output()
            .await
            .with_context(|| format!("running {}", config.sbatch_path))?;
        if !out.status.success() {
            anyhow::bail!(
                "{} exited with {}: {}",
                config.sbatch_path,
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }

    async fn record_job(
        &self,
        output: &str,
        pod: &Pod,
        jobs: &JobTable,
        work_dir: &Path,
    ) -> Result<String> {
        let job_id = extract_job_id(output)?;
        if !jobs.insert_if_absent(&pod.uid, &job_id) {
            anyhow::bail!("pod {} already tracks a job", pod.uid);
        }
        if let Err(e) = tokio::fs::write(work_dir.join(JOB_ID_FILE), &job_id).await {
            // undo the entry this call created before surfacing the error
            jobs.remove(&pod.uid);
            return Err(e).context("persisting job id");
        }
        Ok(job_id)
    }

    async fn cleanup(
        &self,
        config: &BridgeConfig,
        submit_output: &str,
        pod_uid: &str,
        work_dir: &Path,
    ) {
        // the job named by this submission's output may already be live
        // in the scheduler; cancel it before removing anything on disk.
        // A job recorded for the pod by an earlier submission is not ours
        // to cancel.
        if let Ok(jid) = extract_job_id(submit_output) {
            match Command::new(&config.scancel_path).arg(&jid).output().await {
                Ok(out) if out.status.success() => {
                    info!(job_id = %jid, pod_uid, "cancelled job during cleanup");
                }
                Ok(out) => {
                    error!(
                        job_id = %jid,
                        pod_uid,
                        stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                        "scancel failed during cleanup"
                    );
                }
                Err(e) => {
                    error!(job_id = %jid, pod_uid, error = %e, "could not run scancel");
                }
            }
        }

        self.purge_workdir(work_dir).await;
    }

    async fn purge_workdir(&self, work_dir: &Path) {
        if let Err(e) = tokio::fs::remove_dir_all(work_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(work_dir = %work_dir.display(), error = %e, "could not remove working directory");
            }
        }
    }
}

/// Extract the job identifier from raw sbatch output.
///
/// Accepts the human form `Submitted batch job <id>` and the `--parsable`
/// form `<id>[;cluster]`.
pub fn extract_job_id(output: &str) -> Result<String> {
    for line in output.lines() {
        if let Some(rest) = line.trim().strip_prefix("Submitted batch job ") {
            let id = rest.split_whitespace().next().unwrap_or_default();
            if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
                return Ok(id.to_string());
            }
        }
    }
    let first = output.trim().split(';').next().unwrap_or_default();
    if !first.is_empty() && first.chars().all(|c| c.is_ascii_digit()) {
        return Ok(first.to_string());
    }
    anyhow::bail!("no job id found in scheduler output: {:?}", output.trim())
}
