//! Prometheus metrics for the submission bridge

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;

/// Histogram buckets for end-to-end submission latency (in seconds);
/// submissions shell out to the scheduler, so these run long
const SUBMISSION_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<BridgeMetricsInner> = OnceLock::new();

struct BridgeMetricsInner {
    submissions_total: IntCounter,
    submission_failures_total: IntCounterVec,
    submission_latency_seconds: Histogram,
    jobs_tracked: IntGauge,
}

impl BridgeMetricsInner {
    fn new() -> Self {
        Self {
            submissions_total: register_int_counter!(
                "slurm_bridge_submissions_total",
                "Pods successfully submitted as batch jobs"
            )
            .expect("Failed to register submissions_total"),

            submission_failures_total: register_int_counter_vec!(
                "slurm_bridge_submission_failures_total",
                "Failed submissions by pipeline stage",
                &["stage"]
            )
            .expect("Failed to register submission_failures_total"),

            submission_latency_seconds: register_histogram!(
                "slurm_bridge_submission_latency_seconds",
                "End-to-end latency of successful submissions",
                SUBMISSION_BUCKETS.to_vec()
            )
            .expect("Failed to register submission_latency_seconds"),

            jobs_tracked: register_int_gauge!(
                "slurm_bridge_jobs_tracked",
                "Pod-to-job entries currently in the tracking store"
            )
            .expect("Failed to register jobs_tracked"),
        }
    }
}

/// Lightweight handle to the global metric set; clones share state
#[derive(Clone)]
pub struct BridgeMetrics {
    _private: (),
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(BridgeMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &BridgeMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Count one successful submission and its latency
    pub fn observe_submission(&self, duration_secs: f64) {
        self.inner().submissions_total.inc();
        self.inner()
            .submission_latency_seconds
            .observe(duration_secs);
    }

    /// Count one failed submission at the named stage
    pub fn inc_failure(&self, stage: &str) {
        self.inner()
            .submission_failures_total
            .with_label_values(&[stage])
            .inc();
    }

    pub fn set_jobs_tracked(&self, count: i64) {
        self.inner().jobs_tracked.set(count);
    }
}
