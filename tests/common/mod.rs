// Shared fakes for integration tests
//
// - ScriptedCall: a CallContext driven by a fixed list of media events
// - FakeTranscriber / FakeSynthesizer: providers with canned results
// - spawn_conversation_stub: in-process conversation service on 127.0.0.1:0

#![allow(dead_code)]

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use loqa_phone::call::{CallContext, CallServices, DialogHandle, PlaybackOutcome};
use loqa_phone::config::{CallConfig, ConversationConfig};
use loqa_phone::error::{ProviderError, TransportError};
use loqa_phone::metrics::MetricsLedger;
use loqa_phone::providers::{
    AudioFormat, Capability, Provider, ProviderChain, ProviderOptions, SpeechSegment,
    SynthesisChain, SynthesizedAudio, Synthesizer, Transcriber, Transcription, TranscriptionChain,
};
use loqa_phone::ConversationClient;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ============================================================================
// Signaling fake
// ============================================================================

/// One media-layer event handed to the session by `next_segment`
pub enum MediaStep {
    Speech(SpeechSegment),
    /// Remote leg hung up
    Hangup,
    /// Media stream broke
    Error(String),
    /// Never produce anything
    Silence,
}

pub fn speech() -> MediaStep {
    MediaStep::Speech(SpeechSegment::mono(vec![0i16; 1600], 16000))
}

pub struct ScriptedCall {
    call_id: String,
    answer_delay: Duration,
    answer_error: Option<String>,
    play_error: Option<String>,
    interrupt_playback: bool,
    steps: Mutex<VecDeque<MediaStep>>,
    pub played: Mutex<Vec<SynthesizedAudio>>,
    pub segment_requests: AtomicUsize,
    pub terminated: AtomicUsize,
}

impl ScriptedCall {
    pub fn new(call_id: &str, steps: Vec<MediaStep>) -> Self {
        Self {
            call_id: call_id.to_string(),
            answer_delay: Duration::ZERO,
            answer_error: None,
            play_error: None,
            interrupt_playback: false,
            steps: Mutex::new(steps.into()),
            played: Mutex::new(Vec::new()),
            segment_requests: AtomicUsize::new(0),
            terminated: AtomicUsize::new(0),
        }
    }

    pub fn with_answer_delay(mut self, delay: Duration) -> Self {
        self.answer_delay = delay;
        self
    }

    pub fn failing_answer(mut self, message: &str) -> Self {
        self.answer_error = Some(message.to_string());
        self
    }

    pub fn failing_play(mut self, message: &str) -> Self {
        self.play_error = Some(message.to_string());
        self
    }

    pub fn interrupting_playback(mut self) -> Self {
        self.interrupt_playback = true;
        self
    }

    /// Text of every prompt played, decoded from the fake synthesizer output
    pub fn played_texts(&self) -> Vec<String> {
        self.played
            .lock()
            .unwrap()
            .iter()
            .map(|a| String::from_utf8_lossy(&a.audio).to_string())
            .collect()
    }

    pub fn terminate_count(&self) -> usize {
        self.terminated.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CallContext for ScriptedCall {
    fn call_id(&self) -> &str {
        &self.call_id
    }

    fn from_uri(&self) -> &str {
        "sip:caller@example.com"
    }

    fn to_uri(&self) -> &str {
        "sip:agent@example.com"
    }

    async fn answer(&self) -> Result<DialogHandle, TransportError> {
        tokio::time::sleep(self.answer_delay).await;
        match &self.answer_error {
            Some(message) => Err(TransportError::Answer(message.clone())),
            None => Ok(DialogHandle::new(format!("dialog-{}", self.call_id))),
        }
    }

    async fn play(
        &self,
        dialog: &DialogHandle,
        audio: &SynthesizedAudio,
    ) -> Result<PlaybackOutcome, TransportError> {
        assert_eq!(dialog.id(), format!("dialog-{}", self.call_id));
        if let Some(message) = &self.play_error {
            return Err(TransportError::Play(message.clone()));
        }
        self.played.lock().unwrap().push(audio.clone());
        if self.interrupt_playback {
            Ok(PlaybackOutcome::Interrupted)
        } else {
            Ok(PlaybackOutcome::Completed)
        }
    }

    async fn next_segment(
        &self,
        dialog: &DialogHandle,
    ) -> Result<Option<SpeechSegment>, TransportError> {
        assert_eq!(dialog.id(), format!("dialog-{}", self.call_id));
        self.segment_requests.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(MediaStep::Speech(segment)) => Ok(Some(segment)),
            Some(MediaStep::Hangup) | None => Ok(None),
            Some(MediaStep::Error(message)) => Err(TransportError::Media(message)),
            Some(MediaStep::Silence) => std::future::pending().await,
        }
    }

    async fn terminate(&self, dialog: DialogHandle) -> Result<(), TransportError> {
        assert_eq!(dialog.id(), format!("dialog-{}", self.call_id));
        self.terminated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Provider fakes
// ============================================================================

pub struct FakeTranscriber {
    name: String,
    result: Result<String, String>,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl FakeTranscriber {
    pub fn ok(name: &str, text: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            result: Ok(text.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(name: &str, message: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            result: Err(message.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn slow(name: &str, text: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            result: Ok(text.to_string()),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Provider for FakeTranscriber {
    type Input = SpeechSegment;
    type Output = Transcription;

    fn name(&self) -> &str {
        &self.name
    }

    async fn call(
        &self,
        _segment: &SpeechSegment,
        _options: &ProviderOptions,
    ) -> Result<Transcription, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match &self.result {
            Ok(text) => Ok(Transcription {
                text: text.clone(),
                confidence: Some(0.9),
            }),
            Err(message) => Err(ProviderError::failed(&self.name, message.clone())),
        }
    }
}

/// Synthesizer whose "audio" is the UTF-8 text itself
pub struct FakeSynthesizer {
    name: String,
    error: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeSynthesizer {
    pub fn ok(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            error: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(name: &str, message: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            error: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Provider for FakeSynthesizer {
    type Input = str;
    type Output = SynthesizedAudio;

    fn name(&self) -> &str {
        &self.name
    }

    async fn call(
        &self,
        text: &str,
        _options: &ProviderOptions,
    ) -> Result<SynthesizedAudio, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.error {
            Some(message) => Err(ProviderError::failed(&self.name, message.clone())),
            None => Ok(SynthesizedAudio {
                audio: text.as_bytes().to_vec(),
                format: AudioFormat::Wav,
            }),
        }
    }
}

pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(2);

pub fn stt_chain(
    primary: &Arc<FakeTranscriber>,
    fallback: Option<&Arc<FakeTranscriber>>,
) -> TranscriptionChain {
    ProviderChain::new(
        Capability::Transcribe,
        primary.clone() as Arc<Transcriber>,
        fallback.map(|f| f.clone() as Arc<Transcriber>),
        PROVIDER_TIMEOUT,
    )
}

pub fn tts_chain(
    primary: &Arc<FakeSynthesizer>,
    fallback: Option<&Arc<FakeSynthesizer>>,
) -> SynthesisChain {
    ProviderChain::new(
        Capability::Synthesize,
        primary.clone() as Arc<Synthesizer>,
        fallback.map(|f| f.clone() as Arc<Synthesizer>),
        PROVIDER_TIMEOUT,
    )
}

// ============================================================================
// Conversation service stub
// ============================================================================

#[derive(Debug, Clone)]
pub enum StubMode {
    /// Reply "echo: <message>"
    Echo,
    /// Reply and ask the call to end
    EndCall(String),
    /// 423 on every attempt
    AlwaysLocked,
    /// 423 for the first N attempts, then echo
    LockedFor(usize),
    /// 409 with a SESSION_LOCKED code on every attempt
    LockedByCode,
    /// Plain error status
    Status(u16),
    /// 200 with success=false
    Rejected(String),
    /// Sleep, then echo
    Slow(Duration),
}

pub struct StubState {
    mode: StubMode,
    pub requests: Mutex<Vec<(Instant, Value)>>,
    pub session_ends: Mutex<Vec<Value>>,
}

impl StubState {
    pub fn attempts(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.requests.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.requests.lock().unwrap().iter().map(|(_, b)| b.clone()).collect()
    }
}

async fn converse(
    State(state): State<Arc<StubState>>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let attempt = {
        let mut requests = state.requests.lock().unwrap();
        requests.push((Instant::now(), body.clone()));
        requests.len()
    };
    let message = body["message"].as_str().unwrap_or_default().to_string();
    let echo = json!({ "success": true, "data": { "reply": format!("echo: {}", message), "intent": "chat" } });

    match &state.mode {
        StubMode::Echo => (StatusCode::OK, Json(echo)).into_response(),
        StubMode::EndCall(reply) => (
            StatusCode::OK,
            Json(json!({ "success": true, "data": { "reply": reply, "endCall": true } })),
        )
            .into_response(),
        StubMode::AlwaysLocked => locked(),
        StubMode::LockedFor(n) if attempt <= *n => locked(),
        StubMode::LockedFor(_) => (StatusCode::OK, Json(echo)).into_response(),
        StubMode::LockedByCode => (
            StatusCode::CONFLICT,
            Json(json!({ "success": false, "error": "busy", "code": "SESSION_LOCKED" })),
        )
            .into_response(),
        StubMode::Status(code) => (
            StatusCode::from_u16(*code).unwrap(),
            Json(json!({ "success": false, "error": "upstream exploded" })),
        )
            .into_response(),
        StubMode::Rejected(error) => (
            StatusCode::OK,
            Json(json!({ "success": false, "error": error })),
        )
            .into_response(),
        StubMode::Slow(delay) => {
            tokio::time::sleep(*delay).await;
            (StatusCode::OK, Json(echo)).into_response()
        }
    }
}

fn locked() -> axum::response::Response {
    (
        StatusCode::LOCKED,
        Json(json!({ "success": false, "error": "session busy" })),
    )
        .into_response()
}

async fn session_end(
    State(state): State<Arc<StubState>>,
    Json(body): Json<Value>,
) -> StatusCode {
    state.session_ends.lock().unwrap().push(body);
    StatusCode::OK
}

pub async fn spawn_conversation_stub(mode: StubMode) -> (String, Arc<StubState>) {
    let state = Arc::new(StubState {
        mode,
        requests: Mutex::new(Vec::new()),
        session_ends: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/api/converse", post(converse))
        .route("/api/session-end", post(session_end))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

// ============================================================================
// Wiring
// ============================================================================

pub const LOCK_RETRY_DELAY_MS: u64 = 25;

pub fn conversation_config(base_url: &str) -> ConversationConfig {
    ConversationConfig {
        lock_retry_delay_ms: LOCK_RETRY_DELAY_MS,
        request_timeout_secs: 5,
        ..ConversationConfig::new(base_url)
    }
}

pub fn call_config() -> CallConfig {
    CallConfig {
        greeting: "Hello caller".to_string(),
        fallback_utterance: "Sorry, say again?".to_string(),
        farewell: None,
        max_turns: 5,
        listen_timeout_secs: 0,
        provider_timeout_ms: PROVIDER_TIMEOUT.as_millis() as u64,
        voice: None,
        language: None,
    }
}

pub fn services(
    stt: TranscriptionChain,
    tts: SynthesisChain,
    base_url: &str,
    config: CallConfig,
) -> Arc<CallServices> {
    Arc::new(CallServices {
        config,
        stt,
        tts,
        conversation: ConversationClient::new(&conversation_config(base_url)).unwrap(),
        ledger: MetricsLedger::new(),
    })
}

/// Services with healthy providers: STT always hears `heard`
pub fn healthy_services(heard: &str, base_url: &str) -> Arc<CallServices> {
    services(
        stt_chain(&FakeTranscriber::ok("stt-primary", heard), None),
        tts_chain(&FakeSynthesizer::ok("tts-primary"), None),
        base_url,
        call_config(),
    )
}
