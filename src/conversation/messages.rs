use super::session_key::SessionKey;
use crate::call::CallDirection;
use serde::{Deserialize, Serialize};

/// Response `code` the service uses for a busy session
pub const SESSION_LOCKED_CODE: &str = "SESSION_LOCKED";

/// Body of `POST /api/converse`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    pub session_key: SessionKey,
    pub message: String,
    pub context: ConversationContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    pub direction: CallDirection,
    pub call_id: String,
    pub timestamp: String, // RFC3339 timestamp
}

/// Body returned by `POST /api/converse`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub success: bool,
    pub data: Option<ReplyPayload>,
    pub error: Option<String>,
    pub code: Option<String>,
}

impl ConversationResponse {
    pub fn is_locked(&self) -> bool {
        self.code
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(SESSION_LOCKED_CODE))
    }
}

/// The conversation service's reply for one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyPayload {
    pub reply: String,

    /// Service asks the call to end after this reply
    #[serde(default)]
    pub end_call: bool,

    /// Any other fields the service attaches
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of `POST /api/session-end`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEndRequest {
    pub session_key: SessionKey,
}
