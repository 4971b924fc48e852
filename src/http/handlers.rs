use super::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn call_not_found(call_id: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Call {} not found", call_id),
        }),
    )
        .into_response()
}

/// GET /calls
pub async fn list_calls(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dispatcher.active_calls().await)
}

/// GET /calls/:call_id
pub async fn get_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    match state.dispatcher.call_status(&call_id).await {
        Some(status) => (StatusCode::OK, Json(status)).into_response(),
        None => call_not_found(&call_id),
    }
}

/// POST /calls/:call_id/hangup
pub async fn hangup_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    if state.dispatcher.hangup(&call_id).await {
        info!("Hangup requested for call {}", call_id);
        StatusCode::ACCEPTED.into_response()
    } else {
        call_not_found(&call_id)
    }
}

/// GET /stats
pub async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dispatcher.ledger().get_stats().await)
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
