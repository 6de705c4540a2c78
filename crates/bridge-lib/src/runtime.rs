//! Container runtime command building
//!
//! The bridge supports two runtime variants: singularity (image-file
//! based, the resolved image path goes last on the command line) and
//! enroot (named-container based, a generated container name goes last
//! and read-only mount markers are stripped since enroot has no support
//! for them). The variant set is closed, so this is an enum dispatched
//! with exhaustive matches rather than a trait object.

use crate::config::BridgeConfig;
use crate::error::SubmitError;
use crate::models::{ContainerCommand, ContainerSpec, ObjectMeta};

/// Supported container runtime variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerRuntime {
    Singularity,
    Enroot,
}

impl ContainerRuntime {
    /// Resolve the configured runtime name.
    ///
    /// Called once per submission, before any container is processed, so
    /// an unknown name fails fast without partial work.
    pub fn from_name(name: &str) -> Result<Self, SubmitError> {
        match name {
            "singularity" => Ok(ContainerRuntime::Singularity),
            "enroot" => Ok(ContainerRuntime::Enroot),
            other => Err(SubmitError::UnsupportedRuntime(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ContainerRuntime::Singularity => "singularity",
            ContainerRuntime::Enroot => "enroot",
        }
    }

    /// Tokens that launch a container under this runtime, before
    /// environment, mount, and image fragments are appended.
    ///
    /// Only image/name/metadata fields are consulted here; resource
    /// limits are the aggregator's concern.
    pub fn command_prefix(
        &self,
        config: &BridgeConfig,
        _container: &ContainerSpec,
        _metadata: &ObjectMeta,
    ) -> Vec<String> {
        match self {
            ContainerRuntime::Singularity => {
                let mut tokens = vec![config.singularity_path.clone(), "exec".to_string()];
                tokens.extend(config.singularity_options.iter().cloned());
                tokens
            }
            ContainerRuntime::Enroot => {
                let mut tokens = vec![config.enroot_path.clone(), "start".to_string()];
                tokens.extend(config.enroot_options.iter().cloned());
                tokens
            }
        }
    }

    /// Variant-dependent command tail: the mount fragment followed by the
    /// image path (singularity) or a generated container name (enroot).
    pub fn command_trailer(
        &self,
        container: &ContainerSpec,
        pod_uid: &str,
        mounts: &str,
        image: &str,
    ) -> Vec<String> {
        let mut tokens = Vec::new();
        match self {
            ContainerRuntime::Singularity => {
                if !mounts.is_empty() {
                    tokens.push(mounts.to_string());
                }
                tokens.push(image.to_string());
            }
            ContainerRuntime::Enroot => {
                // enroot cannot mount read-only
                let scrubbed = mounts.replace(":ro", "");
                if !scrubbed.is_empty() {
                    tokens.push(scrubbed);
                }
                tokens.push(format!("{}{}", container.name, pod_uid));
            }
        }
        tokens
    }
}

/// Concatenate prefix, environment, and trailer fragments into the final
/// per-container command. Pure assembly, no I/O.
pub fn assemble_command(
    runtime: ContainerRuntime,
    prefix: Vec<String>,
    envs: Vec<String>,
    trailer: Vec<String>,
    container: &ContainerSpec,
    is_init: bool,
    image: &str,
) -> ContainerCommand {
    let mut tokens = prefix;
    tokens.extend(envs);
    tokens.extend(trailer);
    ContainerCommand {
        runtime: runtime.name().to_string(),
        container_name: container.name.clone(),
        is_init,
        tokens,
        command: container.command.clone(),
        args: container.args.clone(),
        image: image.to_string(),
    }
}
