use super::signaling::{CallContext, DialogHandle, PlaybackOutcome};
use super::state::{CallDirection, CallState};
use crate::config::CallConfig;
use crate::conversation::{ConversationClient, ReplyPayload};
use crate::error::CallError;
use crate::metrics::{CallSnapshot, EndReason, MetricEvent, MetricsLedger};
use crate::providers::{ProviderOptions, SpeechSegment, SynthesisChain, TranscriptionChain};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Read-only collaborators shared by every call
pub struct CallServices {
    pub config: CallConfig,
    pub stt: TranscriptionChain,
    pub tts: SynthesisChain,
    pub conversation: ConversationClient,
    pub ledger: MetricsLedger,
}

/// How a call ended
#[derive(Debug, Clone)]
pub struct CallOutcome {
    pub call_id: String,
    pub state: CallState,
    pub end_reason: EndReason,
    /// `None` only if the ledger had already finalized this call
    pub snapshot: Option<CallSnapshot>,
}

enum Heard {
    Segment(SpeechSegment),
    HungUp,
    Idle,
}

/// State machine for one call
///
/// All stages run in order on one task. A hangup signal drops whatever stage
/// is in flight; cleanup (dialog release, metrics finalize) then runs once.
pub struct CallSession {
    call_id: String,

    direction: CallDirection,

    /// Signaling-layer view of this call
    context: Arc<dyn CallContext>,

    services: Arc<CallServices>,

    /// Current state, observable by the dispatcher
    state: watch::Sender<CallState>,

    /// Established leg; taken exactly once on termination
    dialog: Option<DialogHandle>,

    started: Instant,

    started_at: DateTime<Utc>,

    /// Conversation rounds attempted
    turns: u32,

    options: ProviderOptions,
}

impl CallSession {
    pub fn new(context: Arc<dyn CallContext>, services: Arc<CallServices>) -> Self {
        let call_id = context.call_id().to_string();
        let options = ProviderOptions {
            call_id: Some(call_id.clone()),
            language: services.config.language.clone(),
            voice: services.config.voice.clone(),
        };
        let (state, _) = watch::channel(CallState::Ringing);

        Self {
            call_id,
            direction: context.direction(),
            context,
            services,
            state,
            dialog: None,
            started: Instant::now(),
            started_at: Utc::now(),
            turns: 0,
            options,
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn state(&self) -> CallState {
        *self.state.borrow()
    }

    /// Follow state changes from another task
    pub fn watch_state(&self) -> watch::Receiver<CallState> {
        self.state.subscribe()
    }

    /// Run the call to completion.
    ///
    /// `hangup` carries the end reason once the call should stop from outside
    /// (remote hangup seen by signaling, dispatcher shutdown).
    pub async fn run(mut self, mut hangup: watch::Receiver<Option<EndReason>>) -> CallOutcome {
        info!(
            "Call {} ({:?}) from {} to {}",
            self.call_id,
            self.direction,
            self.context.from_uri(),
            self.context.to_uri()
        );

        self.services.ledger.init_call(&self.call_id).await;

        // Answer is never cancelled: a leg the signaling layer set up must
        // come back as a handle so `finish` can release it. A hangup that
        // arrived meanwhile is seen first by the biased select below.
        if let Err(e) = self.answer().await {
            return self.finish(Err(e)).await;
        }

        let interrupted = tokio::select! {
            biased;
            reason = wait_for_hangup(&mut hangup) => Err(reason),
            result = self.drive() => Ok(result),
        };

        let result = match interrupted {
            Ok(result) => result,
            Err(reason) => {
                info!("Call {} interrupted in {}: {}", self.call_id, self.state(), reason);
                Ok(reason)
            }
        };

        self.finish(result).await
    }

    async fn answer(&mut self) -> Result<(), CallError> {
        let dialog = self.context.answer().await?;
        self.dialog = Some(dialog);

        let latency_ms = self.started.elapsed().as_millis() as u64;
        self.record(MetricEvent::AnswerLatency(latency_ms)).await;
        self.transition(CallState::Answered)?;
        info!("Call {} answered in {}ms", self.call_id, latency_ms);

        Ok(())
    }

    async fn drive(&mut self) -> Result<EndReason, CallError> {
        self.transition(CallState::Greeting)?;
        let greeting = self.services.config.greeting.clone();
        self.speak(&greeting).await?;

        loop {
            self.transition(CallState::Listening)?;

            let segment = match self.listen().await? {
                Heard::Segment(segment) => segment,
                Heard::HungUp => return Ok(EndReason::Completed),
                Heard::Idle => return Ok(EndReason::IdleTimeout),
            };

            self.transition(CallState::Processing)?;

            let Some(text) = self.transcribe(&segment).await else {
                // Not a turn: apologise and listen again
                let fallback = self.services.config.fallback_utterance.clone();
                self.speak(&fallback).await?;
                continue;
            };

            if text.is_empty() {
                debug!("Call {} heard silence", self.call_id);
                continue;
            }

            self.turns += 1;
            let reply = self.converse(&text).await?;

            self.transition(CallState::Responding)?;
            match reply {
                Some(reply) => {
                    self.speak(&reply.reply).await?;
                    if reply.end_call {
                        return Ok(EndReason::AgentEnded);
                    }
                }
                None => {
                    let fallback = self.services.config.fallback_utterance.clone();
                    self.speak(&fallback).await?;
                }
            }

            if self.turns >= self.services.config.max_turns {
                info!("Call {} reached {} turns", self.call_id, self.turns);
                if let Some(farewell) = self.services.config.farewell.clone() {
                    self.speak(&farewell).await?;
                }
                return Ok(EndReason::MaxTurns);
            }
        }
    }

    async fn listen(&self) -> Result<Heard, CallError> {
        let dialog = self.dialog.as_ref().ok_or(CallError::NoDialog)?;
        let next = self.context.next_segment(dialog);

        let segment = match self.services.config.listen_timeout_secs {
            0 => next.await?,
            secs => match tokio::time::timeout(Duration::from_secs(secs), next).await {
                Ok(result) => result?,
                Err(_) => {
                    info!("Call {} silent for {}s", self.call_id, secs);
                    return Ok(Heard::Idle);
                }
            },
        };

        Ok(match segment {
            Some(segment) => Heard::Segment(segment),
            None => Heard::HungUp,
        })
    }

    /// Transcribe a segment; `None` if every provider failed
    async fn transcribe(&self, segment: &SpeechSegment) -> Option<String> {
        if segment.is_empty() {
            return Some(String::new());
        }

        match self.services.stt.dispatch(segment, &self.options).await {
            Ok(dispatched) => {
                if let Some(e) = dispatched.primary_failure {
                    self.record(MetricEvent::SttError(e.to_string())).await;
                }
                self.record(MetricEvent::SttSuccess).await;
                debug!(
                    "Call {} transcript via {}: {:?}",
                    self.call_id, dispatched.served_by, dispatched.output.text
                );
                Some(dispatched.output.text)
            }
            Err(e) => {
                warn!("Call {} transcription failed: {}", self.call_id, e);
                self.record(MetricEvent::SttError(e.to_string())).await;
                None
            }
        }
    }

    /// One conversation round; `Ok(None)` if the turn failed but the call can go on
    async fn converse(&self, text: &str) -> Result<Option<ReplyPayload>, CallError> {
        match self
            .services
            .conversation
            .send(&self.call_id, text, self.direction)
            .await
        {
            Ok(reply) => {
                self.record(MetricEvent::LlmSuccess).await;
                Ok(Some(reply))
            }
            Err(e) => {
                self.record(MetricEvent::LlmError(e.to_string())).await;
                if e.is_fatal() {
                    return Err(CallError::Conversation(e));
                }
                warn!("Call {} turn {} failed: {}", self.call_id, self.turns, e);
                Ok(None)
            }
        }
    }

    /// Synthesize and play `text`. Synthesis failure is recorded and skipped;
    /// only playback (transport) errors propagate.
    async fn speak(&self, text: &str) -> Result<(), CallError> {
        if text.trim().is_empty() {
            return Ok(());
        }

        let audio = match self.services.tts.dispatch(text, &self.options).await {
            Ok(dispatched) => {
                if let Some(e) = dispatched.primary_failure {
                    self.record(MetricEvent::TtsError(e.to_string())).await;
                }
                self.record(MetricEvent::TtsSuccess).await;
                dispatched.output
            }
            Err(e) => {
                warn!("Call {} synthesis failed, skipping prompt: {}", self.call_id, e);
                self.record(MetricEvent::TtsError(e.to_string())).await;
                return Ok(());
            }
        };

        let dialog = self.dialog.as_ref().ok_or(CallError::NoDialog)?;
        if self.context.play(dialog, &audio).await? == PlaybackOutcome::Interrupted {
            debug!("Call {} barge-in", self.call_id);
            self.record(MetricEvent::BargeIn).await;
        }

        Ok(())
    }

    fn transition(&self, next: CallState) -> Result<(), CallError> {
        let current = self.state();
        if !current.can_transition_to(next) {
            return Err(CallError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        debug!("Call {} {} -> {}", self.call_id, current, next);
        self.state.send_replace(next);
        Ok(())
    }

    async fn record(&self, event: MetricEvent) {
        self.services.ledger.record(&self.call_id, event).await;
    }

    /// Termination cleanup; runs exactly once per call
    async fn finish(mut self, result: Result<EndReason, CallError>) -> CallOutcome {
        let (state, end_reason) = match result {
            Ok(reason) => (CallState::Terminated, reason),
            Err(e) => {
                error!("Call {} failed in {}: {}", self.call_id, self.state(), e);
                (CallState::Failed, EndReason::Error)
            }
        };

        if !self.state().is_terminal() {
            self.state.send_replace(state);
        }
        self.record(MetricEvent::EndCall(end_reason)).await;

        if let Some(dialog) = self.dialog.take() {
            if let Err(e) = self.context.terminate(dialog).await {
                warn!("Call {} dialog release failed: {}", self.call_id, e);
            }
        }

        if self.turns > 0 {
            self.services.conversation.cleanup_session(&self.call_id).await;
        }

        let snapshot = self.services.ledger.finalize(&self.call_id).await;

        info!("Call {} {} ({})", self.call_id, state, end_reason);

        CallOutcome {
            call_id: self.call_id,
            state,
            end_reason,
            snapshot,
        }
    }
}

async fn wait_for_hangup(hangup: &mut watch::Receiver<Option<EndReason>>) -> EndReason {
    loop {
        if let Some(reason) = *hangup.borrow_and_update() {
            return reason;
        }
        if hangup.changed().await.is_err() {
            // Nobody can signal a hangup any more
            return std::future::pending().await;
        }
    }
}
