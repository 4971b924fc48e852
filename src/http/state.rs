use crate::call::CallDispatcher;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active-call registry and the metrics ledger behind it
    pub dispatcher: Arc<CallDispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Arc<CallDispatcher>) -> Self {
        Self { dispatcher }
    }
}
