//! HTTP API for operators
//!
//! - GET /health - Health check
//! - GET /calls - List active calls
//! - GET /calls/:id - One active call
//! - POST /calls/:id/hangup - End a call
//! - GET /stats - Counters summed over active calls

mod handlers;
mod routes;
mod state;

pub use handlers::ErrorResponse;
pub use routes::create_router;
pub use state::AppState;
