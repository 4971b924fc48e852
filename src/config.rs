use crate::providers::{AudioFormat, Capability};
use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Environment variables with this prefix override file settings,
/// e.g. `LOQA_PHONE__CONVERSATION__BASE_URL`.
const ENV_PREFIX: &str = "LOQA_PHONE";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub call: CallConfig,
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "loqa-phone".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8090,
        }
    }
}

/// Per-call behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    /// Opening line played after answer
    pub greeting: String,

    /// Played when a transcription or conversation round fails
    pub fallback_utterance: String,

    /// Played before hanging up at the turn cap
    pub farewell: Option<String>,

    /// Conversation rounds before the call is ended
    pub max_turns: u32,

    /// Silence (no speech segment) tolerated before ending the call
    pub listen_timeout_secs: u64,

    /// Timeout for each individual provider attempt
    pub provider_timeout_ms: u64,

    pub voice: Option<String>,
    pub language: Option<String>,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            greeting: "Hello, how can I help you?".to_string(),
            fallback_utterance: "Sorry, I didn't catch that. Could you say it again?".to_string(),
            farewell: None,
            max_turns: 20,
            listen_timeout_secs: 30,
            provider_timeout_ms: 15_000,
            voice: None,
            language: None,
        }
    }
}

/// Remote conversation service
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    pub base_url: String,

    #[serde(default = "default_session_key_prefix")]
    pub session_key_prefix: String,

    /// Total attempts when the session is locked
    #[serde(default = "default_lock_retry_count")]
    pub lock_retry_count: u32,

    #[serde(default = "default_lock_retry_delay_ms")]
    pub lock_retry_delay_ms: u64,

    /// Applies to each attempt independently
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_session_key_prefix() -> String {
    "voice-".to_string()
}

fn default_lock_retry_count() -> u32 {
    3
}

fn default_lock_retry_delay_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl ConversationConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            session_key_prefix: default_session_key_prefix(),
            lock_retry_count: default_lock_retry_count(),
            lock_retry_delay_ms: default_lock_retry_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// A named provider definition
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub capability: Capability,
    #[serde(flatten)]
    pub kind: ProviderKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI-compatible `/audio/transcriptions` or `/audio/speech`
    Http {
        base_url: String,
        api_key: Option<String>,
        model: String,
        voice: Option<String>,
        #[serde(default)]
        format: AudioFormat,
    },
    /// Transcription by NATS request/reply
    Nats { url: String, subject: String },
}

/// Primary/fallback pairing for one capability
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DispatchPolicy {
    pub primary: String,
    pub fallback: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    pub stt: DispatchPolicy,
    pub tts: DispatchPolicy,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        let config: Self = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;

        Ok(config)
    }

    /// Reject settings that deserialize but cannot run
    pub fn validate(&self) -> Result<()> {
        if self.call.max_turns == 0 {
            bail!("call.max_turns must be at least 1");
        }
        if self.conversation.lock_retry_count == 0 {
            bail!("conversation.lock_retry_count must be at least 1");
        }
        Ok(())
    }
}
