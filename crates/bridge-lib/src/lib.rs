//! Bridge library: pod-to-batch-job submission
//!
//! This crate provides the core functionality for:
//! - Translating a pod specification into per-container runtime commands
//! - Aggregating container limits into one job-wide resource ceiling
//! - Generating and submitting batch scripts to the scheduler
//! - Tracking pod-to-job identity
//! - Health checks and observability

pub mod backend;
pub mod config;
pub mod error;
pub mod health;
pub mod jobs;
pub mod limits;
pub mod mem;
pub mod models;
pub mod observability;
pub mod runtime;
pub mod submit;

pub use backend::{Backend, SlurmBackend};
pub use config::BridgeConfig;
pub use error::{Stage, SubmitError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use jobs::JobTable;
pub use models::*;
pub use observability::BridgeMetrics;
pub use submit::Submitter;
