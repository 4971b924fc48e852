use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Call introspection
        .route("/calls", get(handlers::list_calls))
        .route("/calls/:call_id", get(handlers::get_call))
        .route("/calls/:call_id/hangup", post(handlers::hangup_call))
        // Aggregate metrics over active calls
        .route("/stats", get(handlers::get_stats))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
