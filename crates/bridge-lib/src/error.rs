//! Error taxonomy for the submission path
//!
//! Any collaborator failure aborts the whole submission; there is no
//! partial-pod submission. Cleanup failures are logged where they occur
//! and never escalate past the already-failed submission.

use thiserror::Error;

/// Pipeline stage at which a collaborator failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Mounts,
    Script,
    Submit,
    Record,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Mounts => "mounts",
            Stage::Script => "script",
            Stage::Submit => "submit",
            Stage::Record => "record",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the submission path
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Memory-size token did not match `<digits><unit?>` with unit K/M/G
    #[error("invalid memory format: {0}")]
    Format(String),

    /// Configured container runtime is not one of the supported variants
    #[error("unsupported container runtime: {0}")]
    UnsupportedRuntime(String),

    /// A collaborator call failed, wrapping the underlying cause
    #[error("{stage} stage failed: {source}")]
    Collaborator {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },
}

impl SubmitError {
    pub fn collaborator(stage: Stage, source: anyhow::Error) -> Self {
        SubmitError::Collaborator { stage, source }
    }

    /// The failing stage, when the error came from a collaborator
    pub fn stage(&self) -> Option<Stage> {
        match self {
            SubmitError::Collaborator { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
