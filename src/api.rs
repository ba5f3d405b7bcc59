//! HTTP Control API
//!
//! Thin axum layer over a [`SimulationHandle`]:
//! - `GET  /health`        liveness
//! - `GET  /state`         latest snapshot
//! - `GET  /sensors`       static channel table
//! - `GET  /faults`        fault catalog
//! - `POST /fault/inject`  `{"fault": "<kind>"}`
//! - `POST /fault/clear`   deactivate and reset generators
//! - `GET  /metrics`       Prometheus text format

use crate::config::{SENSOR_CONFIGS, SensorConfig, ServerConfig};
use crate::error::SimError;
use crate::metrics;
use crate::runtime::SimulationHandle;
use crate::simulation::faults::{self, FaultInfo};
use crate::simulation::{FaultKind, FaultState, SystemState};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub handle: SimulationHandle,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectFaultRequest {
    pub fault: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    /// Fault that was active before the clear, if any.
    pub cleared: Option<FaultKind>,
}

/// Generic API envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }
    }
}

fn status_for(error: &SimError) -> StatusCode {
    match error {
        SimError::UnknownFaultKind(_) => StatusCode::BAD_REQUEST,
        SimError::FaultAlreadyActive(_) => StatusCode::CONFLICT,
        SimError::EngineStopped => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for SimError {
    fn into_response(self) -> Response {
        let body = Json(ApiResponse::<()>::error(&self.to_string()));
        (status_for(&self), body).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> &'static str {
    "OK"
}

async fn get_state(State(state): State<AppState>) -> Json<ApiResponse<SystemState>> {
    let snapshot = state.handle.latest();
    Json(ApiResponse::success(SystemState::clone(&snapshot)))
}

async fn list_sensors() -> Json<ApiResponse<Vec<SensorConfig>>> {
    Json(ApiResponse::success(SENSOR_CONFIGS.to_vec()))
}

async fn list_faults() -> Json<ApiResponse<Vec<FaultInfo>>> {
    Json(ApiResponse::success(faults::catalog()))
}

async fn inject_fault(
    State(state): State<AppState>,
    Json(request): Json<InjectFaultRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FaultState>>), SimError> {
    let kind: FaultKind = request.fault.parse().inspect_err(|e| {
        warn!(error = %e, "Rejected inject request");
    })?;
    let fault = state.handle.inject(kind).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(fault))))
}

async fn clear_fault(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ClearResponse>>, SimError> {
    let cleared = state.handle.clear().await?;
    Ok(Json(ApiResponse::success(ClearResponse { cleared })))
}

async fn metrics_handler() -> String {
    metrics::render()
}

pub fn router(handle: SimulationHandle) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/state", get(get_state))
        .route("/sensors", get(list_sensors))
        .route("/faults", get(list_faults))
        .route("/fault/inject", post(inject_fault))
        .route("/fault/clear", post(clear_fault))
        .route("/metrics", get(metrics_handler))
        .with_state(AppState { handle })
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve_on<F>(
    listener: TcpListener,
    handle: SimulationHandle,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "Control API listening");

    axum::serve(listener, router(handle))
        .with_graceful_shutdown(shutdown)
        .await
}

pub async fn serve<F>(
    config: &ServerConfig,
    handle: SimulationHandle,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(config.bind_addr()).await?;
    serve_on(listener, handle, shutdown).await
}
