//! Client for the remote conversation service
//!
//! - POST /api/converse - one caller utterance in, one reply out
//! - POST /api/session-end - release a call's session (best effort)

mod client;
pub mod messages;
mod session_key;

pub use client::ConversationClient;
pub use messages::{ConversationRequest, ConversationResponse, ReplyPayload};
pub use session_key::SessionKey;
