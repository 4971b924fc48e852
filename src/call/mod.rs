//! Per-call orchestration
//!
//! This module provides:
//! - `CallContext`: what the signaling layer hands over for each call
//! - `CallSession`: the state machine driving answer → greet → converse → terminate
//! - `CallDispatcher`: the active-call registry, hangup signalling and shutdown drain

mod dispatcher;
mod session;
mod signaling;
mod state;

pub use dispatcher::{CallDispatcher, CallStatus};
pub use session::{CallOutcome, CallServices, CallSession};
pub use signaling::{CallContext, DialogHandle, PlaybackOutcome};
pub use state::{CallDirection, CallState};
