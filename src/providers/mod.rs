//! Speech providers and primary/fallback dispatch
//!
//! Providers implement the `Provider` capability trait for either
//! transcription (`SpeechSegment` → `Transcription`) or synthesis
//! (`str` → `SynthesizedAudio`). Variants are picked by configuration:
//! - `http`: OpenAI-compatible speech endpoints
//! - `nats`: transcription by NATS request/reply
//!
//! A `ProviderChain` per capability resolves its primary and fallback from
//! the `ProviderRegistry` once at startup.

mod chain;
pub mod http;
pub mod nats;
mod registry;
mod types;

pub use chain::{Dispatched, ProviderChain, SynthesisChain, TranscriptionChain};
pub use http::{HttpSynthesizer, HttpTranscriber};
pub use nats::NatsTranscriber;
pub use registry::{ProviderFactory, ProviderRegistry};
pub use types::{
    AudioFormat, Capability, Provider, ProviderOptions, SpeechSegment, SynthesizedAudio,
    Synthesizer, Transcriber, Transcription,
};
