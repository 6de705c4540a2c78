//! Per-container staging: mounts, environment, image resolution

use crate::config::BridgeConfig;
use crate::models::{ContainerSpec, ObjectMeta, Pod};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

/// Create the pod working directory and render one bind-mount fragment
/// for the container.
///
/// Host-path volumes bind their declared path; emptyDir volumes bind a
/// directory created under `<work_dir>/emptydirs/<volume>` so two pods
/// never share one. A mount that names an undeclared volume fails the
/// submission.
pub async fn prepare_mounts(
    _config: &BridgeConfig,
    pod: &Pod,
    container: &ContainerSpec,
    work_dir: &Path,
) -> Result<String> {
    tokio::fs::create_dir_all(work_dir)
        .await
        .with_context(|| format!("creating working directory {}", work_dir.display()))?;

    let mut binds = Vec::new();
    for vm in &container.volume_mounts {
        let volume = pod
            .spec
            .volumes
            .iter()
            .find(|v| v.name == vm.name)
            .with_context(|| {
                format!(
                    "container {} mounts volume {} which the pod does not declare",
                    container.name, vm.name
                )
            })?;

        let source = if let Some(host_path) = &volume.host_path {
            host_path.path.clone()
        } else if volume.empty_dir.is_some() {
            let dir = work_dir.join("emptydirs").join(&volume.name);
            tokio::fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("creating emptyDir for volume {}", volume.name))?;
            dir.to_string_lossy().into_owned()
        } else {
            anyhow::bail!(
                "volume {} has no supported source (hostPath or emptyDir)",
                volume.name
            );
        };

        let ro = if vm.read_only { ":ro" } else { "" };
        binds.push(format!("{}:{}{}", source, vm.mount_path, ro));
    }

    if binds.is_empty() {
        return Ok(String::new());
    }
    let fragment = format!("--bind {}", binds.join(","));
    debug!(container = %container.name, %fragment, "prepared mounts");
    Ok(fragment)
}

/// Render `--env KEY=VALUE` token pairs for a container's environment set
pub fn prepare_envs(_config: &BridgeConfig, container: &ContainerSpec) -> Vec<String> {
    let mut tokens = Vec::with_capacity(container.env.len() * 2);
    for var in &container.env {
        tokens.push("--env".to_string());
        tokens.push(format!("{}={}", var.name, var.value));
    }
    tokens
}

/// Apply the configured image prefix unless the reference already carries
/// a scheme or an absolute path.
pub fn resolve_image(config: &BridgeConfig, _metadata: &ObjectMeta, image: &str) -> String {
    if image.contains("://") || image.starts_with('/') {
        image.to_string()
    } else {
        format!("{}{}", config.image_prefix, image)
    }
}
