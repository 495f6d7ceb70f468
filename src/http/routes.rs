//! HTTP route definitions

use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{Role, SessionSnapshot};
use crate::util::time::{unix_millis, uptime_secs};
use crate::ws::handler::ws_handler;
use crate::ws::protocol::Phase;

/// Build the host router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/state", get(state_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    session_id: Uuid,
    role: Role,
    uptime_secs: u64,
    server_time: u64,
    phase: Phase,
    connected: bool,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.handle.snapshot();

    Json(HealthResponse {
        status: "ok",
        session_id: snapshot.session_id,
        role: state.config.role,
        uptime_secs: uptime_secs(),
        server_time: unix_millis(),
        phase: snapshot.state.phase,
        connected: state.link.is_attached(),
    })
}

// ============================================================================
// Duel state
// ============================================================================

/// Host-side view of the duel, including the host's own pending selection
async fn state_handler(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.handle.snapshot())
}
