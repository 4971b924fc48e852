use crate::error::ProviderError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a provider does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Transcribe,
    Synthesize,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Transcribe => write!(f, "transcribe"),
            Capability::Synthesize => write!(f, "synthesize"),
        }
    }
}

/// One utterance captured from the caller (16-bit PCM, interleaved)
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechSegment {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl SpeechSegment {
    pub fn mono(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            channels: 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let frames = self.samples.len() as u64 / self.channels as u64;
        frames * 1000 / self.sample_rate as u64
    }

    /// Little-endian PCM bytes
    pub fn pcm_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}

/// Transcription result, identical in shape for every provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,

    /// Confidence score (0.0 to 1.0), if the provider reports one
    pub confidence: Option<f32>,
}

/// Encoding of synthesized audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
    Opus,
    Pcm,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Opus => "opus",
            AudioFormat::Pcm => "pcm",
        }
    }
}

/// Synthesis result, identical in shape for every provider
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAudio {
    pub audio: Vec<u8>,
    pub format: AudioFormat,
}

/// Per-request options passed through to providers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderOptions {
    /// Call the request belongs to, for provider-side correlation
    pub call_id: Option<String>,
    pub language: Option<String>,
    pub voice: Option<String>,
}

/// A named speech provider for one capability
///
/// Implementations fail by returning an error, never by returning an
/// empty or malformed success.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    type Input: ?Sized + Sync;
    type Output: Send;

    /// Registry name, used in logs and errors
    fn name(&self) -> &str;

    async fn call(
        &self,
        input: &Self::Input,
        options: &ProviderOptions,
    ) -> Result<Self::Output, ProviderError>;
}

/// Speech-to-text provider
pub type Transcriber = dyn Provider<Input = SpeechSegment, Output = Transcription>;

/// Text-to-speech provider
pub type Synthesizer = dyn Provider<Input = str, Output = SynthesizedAudio>;
