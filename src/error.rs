//! Error types for the call orchestrator
//!
//! Each stage boundary has its own error enum. Provider and conversation
//! errors are absorbed by the call session (recorded, then the call
//! continues degraded); transport errors end the call.

use thiserror::Error;

/// Failure of a single speech provider attempt
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("{provider}: request failed: {message}")]
    Request { provider: String, message: String },

    #[error("{provider}: HTTP {status}: {message}")]
    Status {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider}: timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    #[error("{provider}: invalid response: {message}")]
    InvalidResponse { provider: String, message: String },

    #[error("{provider}: {message}")]
    Failed { provider: String, message: String },
}

impl ProviderError {
    pub fn failed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderError::Failed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Name of the provider that produced this error
    pub fn provider(&self) -> &str {
        match self {
            ProviderError::Request { provider, .. }
            | ProviderError::Status { provider, .. }
            | ProviderError::Timeout { provider, .. }
            | ProviderError::InvalidResponse { provider, .. }
            | ProviderError::Failed { provider, .. } => provider,
        }
    }
}

/// Failure result of a conversation round
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversationError {
    #[error("session locked after {attempts} attempts (HTTP {status})")]
    Locked { attempts: u32, status: u16 },

    #[error("conversation service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("conversation service rejected request: {message}")]
    Rejected { message: String },

    #[error("conversation request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("conversation transport error: {0}")]
    Transport(String),

    #[error("invalid conversation response: {0}")]
    InvalidResponse(String),

    #[error("conversation client misconfigured: {0}")]
    Config(String),
}

impl ConversationError {
    /// HTTP status observed on the final attempt, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ConversationError::Locked { status, .. } | ConversationError::Status { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Whether the call itself cannot continue.
    ///
    /// Only a request that can never be built is fatal; everything else ends
    /// the current turn only.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConversationError::Config(_))
    }
}

/// Failure reported by the signaling/media layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("answer failed: {0}")]
    Answer(String),

    #[error("playback failed: {0}")]
    Play(String),

    #[error("media stream failed: {0}")]
    Media(String),

    #[error("terminate failed: {0}")]
    Terminate(String),
}

/// Reason a call session could not continue
#[derive(Error, Debug)]
pub enum CallError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("conversation failed: {0}")]
    Conversation(ConversationError),

    #[error("invalid transition {from} -> {to}")]
    InvalidTransition {
        from: crate::call::CallState,
        to: crate::call::CallState,
    },

    #[error("no dialog established")]
    NoDialog,
}
