//! OpenAI-compatible speech providers over HTTP
//!
//! Works against OpenAI, OpenRouter, or any local server exposing
//! `/audio/transcriptions` and `/audio/speech`.

use super::types::{
    AudioFormat, Provider, ProviderOptions, SpeechSegment, SynthesizedAudio, Transcription,
};
use crate::error::ProviderError;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

/// Default voice when neither the provider nor the call names one
const DEFAULT_VOICE: &str = "alloy";

fn build_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

/// Encode a segment as a 16-bit PCM WAV file
pub fn encode_wav(segment: &SpeechSegment) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: segment.channels,
        sample_rate: segment.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in &segment.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Speech-to-text over `POST {base_url}/audio/transcriptions`
pub struct HttpTranscriber {
    name: String,
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl HttpTranscriber {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    fn request_error(&self, e: impl ToString) -> ProviderError {
        ProviderError::Request {
            provider: self.name.clone(),
            message: e.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Provider for HttpTranscriber {
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
        let wav = encode_wav(segment).map_err(|e| self.request_error(e))?;

        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("segment.wav")
            .mime_str("audio/wav")
            .map_err(|e| self.request_error(e))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());
        if let Some(language) = &options.language {
            form = form.text("language", language.clone());
        }

        let mut request = self
            .client
            .post(build_url(&self.base_url, "audio/transcriptions"))
            .multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                provider: self.name.clone(),
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: TranscriptionResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    provider: self.name.clone(),
                    message: e.to_string(),
                })?;

        debug!(
            "{} transcribed {}ms of audio: {:?}",
            self.name,
            segment.duration_ms(),
            parsed.text
        );

        Ok(Transcription {
            text: parsed.text.trim().to_string(),
            confidence: None,
        })
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'static str,
}

/// Text-to-speech over `POST {base_url}/audio/speech`
pub struct HttpSynthesizer {
    name: String,
    base_url: String,
    api_key: Option<String>,
    model: String,
    voice: Option<String>,
    format: AudioFormat,
    client: reqwest::Client,
}

impl HttpSynthesizer {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        voice: Option<String>,
        format: AudioFormat,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            voice,
            format,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Provider for HttpSynthesizer {
    type Input = str;
    type Output = SynthesizedAudio;

    fn name(&self) -> &str {
        &self.name
    }

    async fn call(
        &self,
        text: &str,
        options: &ProviderOptions,
    ) -> Result<SynthesizedAudio, ProviderError> {
        // Call-level voice wins over the provider default
        let voice = options
            .voice
            .as_deref()
            .or(self.voice.as_deref())
            .unwrap_or(DEFAULT_VOICE);

        let body = SpeechRequest {
            model: &self.model,
            input: text,
            voice,
            response_format: self.format.as_str(),
        };

        let mut request = self
            .client
            .post(build_url(&self.base_url, "audio/speech"))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| ProviderError::Request {
            provider: self.name.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                provider: self.name.clone(),
                status: status.as_u16(),
                message: body,
            });
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Request {
                provider: self.name.clone(),
                message: e.to_string(),
            })?;

        if audio.is_empty() {
            return Err(ProviderError::InvalidResponse {
                provider: self.name.clone(),
                message: "empty audio body".to_string(),
            });
        }

        Ok(SynthesizedAudio {
            audio: audio.to_vec(),
            format: self.format,
        })
    }
}
