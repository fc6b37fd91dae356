// =============================================================================
// HTTP Endpoints — Axum 0.7
// =============================================================================
//
//   GET /run            run one scan cycle, respond when it has finished
//   GET /api/v1/health  liveness + last completed cycle
//
// The trigger response only acknowledges completion; per-symbol errors are
// reported through the logs.
// =============================================================================

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use uuid::Uuid;

use crate::api::auth::TriggerAuth;
use crate::app_state::{AppState, CycleSummary};

/// Build the router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/run", get(run).post(run))
        .route("/api/v1/health", get(health))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Trigger
// =============================================================================

#[derive(Serialize)]
struct RunResponse {
    status: &'static str,
    cycle_id: Uuid,
    symbols: usize,
}

async fn run(_auth: TriggerAuth, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("scan triggered over HTTP");
    let report = state.run_cycle().await;
    Json(RunResponse {
        status: "completed",
        cycle_id: report.cycle_id,
        symbols: report.outcomes.len(),
    })
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    server_time: i64,
    last_cycle: Option<CycleSummary>,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.uptime_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
        last_cycle: state.last_cycle(),
    })
}
