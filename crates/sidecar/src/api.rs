//! HTTP API: pod submission plus health checks and Prometheus metrics

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bridge_lib::{
    health::{ComponentStatus, HealthRegistry},
    models::PodSubmission,
    Submitter,
};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;
use tracing::{error, info};

/// Diagnostic returned on any internal failure; stage detail stays in the
/// sidecar logs
const INTERNAL_ERROR_BODY: &str =
    "Some errors occurred while creating the job. Check the sidecar logs";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub submitter: Submitter,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(submitter: Submitter, health_registry: HealthRegistry) -> Self {
        Self {
            submitter,
            health_registry,
        }
    }
}

/// Submission endpoint: one pod in, one {pod uid, job id} pair out
async fn create(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let request: PodSubmission = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "malformed submission payload");
            return (StatusCode::BAD_REQUEST, "invalid pod submission payload").into_response();
        }
    };

    match state.submitter.submit(request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            error!(error = %e, "submission failed");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response()
        }
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;
    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).unwrap();

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/create", post(create))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
