pub mod call;
pub mod config;
pub mod conversation;
pub mod error;
pub mod http;
pub mod metrics;
pub mod providers;

pub use call::{
    CallContext, CallDirection, CallDispatcher, CallOutcome, CallServices, CallSession, CallState,
    CallStatus, DialogHandle, PlaybackOutcome,
};
pub use config::Config;
pub use conversation::{ConversationClient, ReplyPayload, SessionKey};
pub use error::{CallError, ConversationError, ProviderError, TransportError};
pub use http::{create_router, AppState};
pub use metrics::{AggregateStats, CallMetrics, CallSnapshot, EndReason, MetricEvent, MetricsLedger};
pub use providers::{
    ProviderChain, ProviderFactory, ProviderOptions, ProviderRegistry, SpeechSegment,
    SynthesizedAudio, Transcription,
};
