use super::state::CallDirection;
use crate::error::TransportError;
use crate::providers::{SpeechSegment, SynthesizedAudio};

/// Exclusive ownership of one established call leg
///
/// Not `Clone`: `CallContext::terminate` consumes it, so a leg is released
/// at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct DialogHandle {
    id: String,
}

impl DialogHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// How a prompt playback ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    /// Caller spoke over the prompt
    Interrupted,
}

/// One inbound call as delivered by the signaling layer
///
/// Speech boundary detection, codecs and SIP dialog handling stay on the
/// other side of this trait.
#[async_trait::async_trait]
pub trait CallContext: Send + Sync {
    fn call_id(&self) -> &str;

    fn from_uri(&self) -> &str;

    fn to_uri(&self) -> &str;

    fn direction(&self) -> CallDirection {
        CallDirection::Inbound
    }

    /// Accept the call. On error the signaling layer rejects it upstream.
    async fn answer(&self) -> Result<DialogHandle, TransportError>;

    async fn play(
        &self,
        dialog: &DialogHandle,
        audio: &SynthesizedAudio,
    ) -> Result<PlaybackOutcome, TransportError>;

    /// Wait for the next complete utterance. `None` means the remote leg hung up.
    async fn next_segment(
        &self,
        dialog: &DialogHandle,
    ) -> Result<Option<SpeechSegment>, TransportError>;

    async fn terminate(&self, dialog: DialogHandle) -> Result<(), TransportError>;
}
