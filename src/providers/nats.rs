use super::types::{Provider, ProviderOptions, SpeechSegment, Transcription};
use crate::error::ProviderError;
use anyhow::{Context, Result};
use async_nats::Client;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Speech segment request sent to the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct SegmentRequestMessage {
    pub session_id: String,
    pub request_id: String,
    pub pcm: String, // Base64-encoded PCM bytes
    pub sample_rate: u32,
    pub channels: u16,
    pub timestamp: String, // RFC3339 timestamp
}

/// Transcript reply from the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub session_id: String,
    pub text: String,
    #[serde(default)]
    pub partial: bool,
    pub timestamp: String,
    pub confidence: Option<f32>,
}

/// Speech-to-text over NATS request/reply
pub struct NatsTranscriber {
    name: String,
    client: Client,
    subject: String,
}

impl NatsTranscriber {
    /// Connect to NATS server
    pub async fn connect(name: impl Into<String>, url: &str, subject: impl Into<String>) -> Result<Self> {
        let name = name.into();
        info!("{}: connecting to NATS at {}", name, url);

        let client = async_nats::connect(url)
            .await
            .with_context(|| format!("Failed to connect to NATS at {}", url))?;

        info!("{}: connected to NATS successfully", name);

        Ok(Self {
            name,
            client,
            subject: subject.into(),
        })
    }

    fn request_error(&self, e: impl ToString) -> ProviderError {
        ProviderError::Request {
            provider: self.name.clone(),
            message: e.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Provider for NatsTranscriber {
    type Input = SpeechSegment;
    type Output = Transcription;

    fn name(&self) -> &str {
        &self.name
    }

    async fn call(
        &self,
        segment: &SpeechSegment,
        options: &ProviderOptions,
    ) -> Result<Transcription, ProviderError> {
        let message = SegmentRequestMessage {
            session_id: options.call_id.clone().unwrap_or_default(),
            request_id: uuid::Uuid::new_v4().to_string(),
            pcm: base64::engine::general_purpose::STANDARD.encode(segment.pcm_bytes()),
            sample_rate: segment.sample_rate,
            channels: segment.channels,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let payload = serde_json::to_vec(&message).map_err(|e| self.request_error(e))?;

        let reply = self
            .client
            .request(self.subject.clone(), payload.into())
            .await
            .map_err(|e| self.request_error(e))?;

        let transcript: TranscriptMessage =
            serde_json::from_slice(&reply.payload).map_err(|e| ProviderError::InvalidResponse {
                provider: self.name.clone(),
                message: e.to_string(),
            })?;

        debug!(
            "{} transcript for {} (request={}, confidence={:?}): {:?}",
            self.name, message.session_id, message.request_id, transcript.confidence, transcript.text
        );

        Ok(Transcription {
            text: transcript.text.trim().to_string(),
            confidence: transcript.confidence,
        })
    }
}
