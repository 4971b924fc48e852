use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Remote party hung up
    Completed,
    /// Conversation turn cap reached
    MaxTurns,
    /// Conversation service asked to end the call
    AgentEnded,
    /// No speech within the listen timeout
    IdleTimeout,
    /// Dispatcher shutting down
    Shutdown,
    /// Fatal transport or state-machine error
    Error,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::Completed => write!(f, "completed"),
            EndReason::MaxTurns => write!(f, "max_turns"),
            EndReason::AgentEnded => write!(f, "agent_ended"),
            EndReason::IdleTimeout => write!(f, "idle_timeout"),
            EndReason::Shutdown => write!(f, "shutdown"),
            EndReason::Error => write!(f, "error"),
        }
    }
}

/// Stage an error record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Stt,
    Tts,
    Llm,
}

/// A single recorded stage failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    #[serde(rename = "type")]
    pub kind: ErrorKind,

    pub error: String,

    pub time: DateTime<Utc>,
}

/// Event applied to a call's metrics
#[derive(Debug, Clone, PartialEq)]
pub enum MetricEvent {
    /// Time from call start to answered dialog
    AnswerLatency(u64),
    SttSuccess,
    SttError(String),
    TtsSuccess,
    TtsError(String),
    LlmSuccess,
    LlmError(String),
    BargeIn,
    EndCall(EndReason),
}

/// Live metrics for one call, owned by the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallMetrics {
    pub call_id: String,

    pub start_time: DateTime<Utc>,

    pub end_time: Option<DateTime<Utc>>,

    pub answer_latency_ms: Option<u64>,

    pub stt_count: u64,
    pub stt_errors: u64,
    pub tts_count: u64,
    pub tts_errors: u64,
    pub llm_count: u64,
    pub llm_errors: u64,
    pub barge_in_count: u64,

    pub end_reason: Option<EndReason>,

    /// Stage failures in the order they were recorded
    pub errors: Vec<ErrorRecord>,
}

impl CallMetrics {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            start_time: Utc::now(),
            end_time: None,
            answer_latency_ms: None,
            stt_count: 0,
            stt_errors: 0,
            tts_count: 0,
            tts_errors: 0,
            llm_count: 0,
            llm_errors: 0,
            barge_in_count: 0,
            end_reason: None,
            errors: Vec::new(),
        }
    }

    pub fn apply(&mut self, event: MetricEvent) {
        match event {
            MetricEvent::AnswerLatency(ms) => self.answer_latency_ms = Some(ms),
            MetricEvent::SttSuccess => self.stt_count += 1,
            MetricEvent::SttError(error) => {
                self.stt_errors += 1;
                self.push_error(ErrorKind::Stt, error);
            }
            MetricEvent::TtsSuccess => self.tts_count += 1,
            MetricEvent::TtsError(error) => {
                self.tts_errors += 1;
                self.push_error(ErrorKind::Tts, error);
            }
            MetricEvent::LlmSuccess => self.llm_count += 1,
            MetricEvent::LlmError(error) => {
                self.llm_errors += 1;
                self.push_error(ErrorKind::Llm, error);
            }
            MetricEvent::BargeIn => self.barge_in_count += 1,
            MetricEvent::EndCall(reason) => {
                self.end_time = Some(Utc::now());
                self.end_reason = Some(reason);
            }
        }
    }

    fn push_error(&mut self, kind: ErrorKind, error: String) {
        self.errors.push(ErrorRecord {
            kind,
            error,
            time: Utc::now(),
        });
    }
}

/// Immutable record of a finished call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSnapshot {
    #[serde(flatten)]
    pub metrics: CallMetrics,

    /// End time (or finalize time if the call never recorded an end) minus start
    pub duration_ms: i64,
}

impl CallSnapshot {
    pub fn errors_of(&self, kind: ErrorKind) -> impl Iterator<Item = &ErrorRecord> {
        self.metrics.errors.iter().filter(move |e| e.kind == kind)
    }
}

/// Counters summed over all active calls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub active_calls: usize,
    pub stt_count: u64,
    pub stt_errors: u64,
    pub tts_count: u64,
    pub tts_errors: u64,
    pub llm_count: u64,
    pub llm_errors: u64,
    pub barge_in_count: u64,
}
