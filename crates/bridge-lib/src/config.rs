//! Bridge configuration
//!
//! Loaded from the environment (prefix `SIDECAR`) and an optional config
//! file named by `SIDECAR_CONFIG`. Every field has a default so a bare
//! environment still yields a working configuration.

use anyhow::Result;
use serde::Deserialize;

/// Configuration for the sidecar and its scheduler collaborators
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Port the submission API listens on
    #[serde(default = "default_sidecar_port")]
    pub sidecar_port: u16,

    /// Root under which per-pod working directories are created
    #[serde(default = "default_data_root")]
    pub data_root: String,

    /// Path to the scheduler submit binary
    #[serde(default = "default_sbatch_path")]
    pub sbatch_path: String,

    /// Path to the scheduler cancel binary
    #[serde(default = "default_scancel_path")]
    pub scancel_path: String,

    /// Container runtime variant: "singularity" or "enroot"
    #[serde(default = "default_container_runtime")]
    pub container_runtime: String,

    /// Prefix applied to image references without an explicit scheme
    #[serde(default = "default_image_prefix")]
    pub image_prefix: String,

    /// Shell lines emitted verbatim at the top of every batch script,
    /// e.g. module loads
    #[serde(default)]
    pub command_prefix: String,

    #[serde(default = "default_singularity_path")]
    pub singularity_path: String,

    /// Extra flags passed to every singularity exec
    #[serde(default)]
    pub singularity_options: Vec<String>,

    #[serde(default = "default_enroot_path")]
    pub enroot_path: String,

    /// Extra flags passed to every enroot start
    #[serde(default = "default_enroot_options")]
    pub enroot_options: Vec<String>,
}

fn default_sidecar_port() -> u16 {
    8000
}

fn default_data_root() -> String {
    "/tmp/slurm-bridge".to_string()
}

fn default_sbatch_path() -> String {
    "sbatch".to_string()
}

fn default_scancel_path() -> String {
    "scancel".to_string()
}

fn default_container_runtime() -> String {
    "singularity".to_string()
}

fn default_image_prefix() -> String {
    "docker://".to_string()
}

fn default_singularity_path() -> String {
    "singularity".to_string()
}

fn default_enroot_path() -> String {
    "enroot".to_string()
}

fn default_enroot_options() -> Vec<String> {
    vec!["--rw".to_string()]
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sidecar_port: default_sidecar_port(),
            data_root: default_data_root(),
            sbatch_path: default_sbatch_path(),
            scancel_path: default_scancel_path(),
            container_runtime: default_container_runtime(),
            image_prefix: default_image_prefix(),
            command_prefix: String::new(),
            singularity_path: default_singularity_path(),
            singularity_options: Vec::new(),
            enroot_path: default_enroot_path(),
            enroot_options: default_enroot_options(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from the environment and an optional file
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Ok(path) = std::env::var("SIDECAR_CONFIG") {
            builder = builder.add_source(config::File::with_name(&path).required(false));
        }
        let cfg = builder
            .add_source(config::Environment::with_prefix("SIDECAR"))
            .build()?;

        Ok(cfg.try_deserialize().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.container_runtime, "singularity");
        assert_eq!(cfg.image_prefix, "docker://");
        assert_eq!(cfg.enroot_options, vec!["--rw".to_string()]);
        assert_eq!(cfg.sidecar_port, 8000);
    }
}
