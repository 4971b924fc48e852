use super::messages::{
    ConversationContext, ConversationRequest, ConversationResponse, ReplyPayload,
    SessionEndRequest,
};
use super::session_key::SessionKey;
use crate::call::CallDirection;
use crate::config::ConversationConfig;
use crate::error::ConversationError;
use anyhow::{Context, Result};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info, warn};

const CONVERSE_PATH: &str = "api/converse";
const SESSION_END_PATH: &str = "api/session-end";

/// Result of a single HTTP attempt
enum Attempt {
    Reply(ReplyPayload),
    Locked(u16),
    Failed(ConversationError),
}

/// Client for the remote conversation service
///
/// Every call gets its own session key, so conversation history never
/// crosses calls. A locked session is retried with the same request body
/// up to `lock_retry_count` total attempts.
pub struct ConversationClient {
    base_url: String,
    session_key_prefix: String,
    lock_retry_count: u32,
    lock_retry_delay: Duration,
    request_timeout: Duration,
    client: reqwest::Client,
}

impl ConversationClient {
    pub fn new(config: &ConversationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build conversation HTTP client")?;

        info!(
            "Conversation service at {} (lock retries: {} x {}ms, timeout: {}s)",
            config.base_url,
            config.lock_retry_count,
            config.lock_retry_delay_ms,
            config.request_timeout_secs
        );

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session_key_prefix: config.session_key_prefix.clone(),
            lock_retry_count: config.lock_retry_count.max(1),
            lock_retry_delay: Duration::from_millis(config.lock_retry_delay_ms),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            client,
        })
    }

    /// Override the per-attempt timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn session_key(&self, call_id: &str) -> SessionKey {
        SessionKey::derive(&self.session_key_prefix, call_id)
    }

    /// Send one caller utterance and return the service's reply
    pub async fn send(
        &self,
        call_id: &str,
        text: &str,
        direction: CallDirection,
    ) -> Result<ReplyPayload, ConversationError> {
        let request = ConversationRequest {
            session_key: self.session_key(call_id),
            message: text.to_string(),
            context: ConversationContext {
                direction,
                call_id: call_id.to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            },
        };
        let url = format!("{}/{}", self.base_url, CONVERSE_PATH);

        let mut attempt = 0;
        loop {
            attempt += 1;

            match self.attempt(&url, &request).await {
                Attempt::Reply(reply) => {
                    debug!(
                        "Call {} conversation reply after {} attempt(s)",
                        call_id, attempt
                    );
                    return Ok(reply);
                }
                Attempt::Failed(e) => {
                    warn!("Call {} conversation attempt {} failed: {}", call_id, attempt, e);
                    return Err(e);
                }
                Attempt::Locked(status) if attempt >= self.lock_retry_count => {
                    warn!(
                        "Call {} session {} still locked after {} attempts",
                        call_id, request.session_key, attempt
                    );
                    return Err(ConversationError::Locked {
                        attempts: attempt,
                        status,
                    });
                }
                Attempt::Locked(_) => {
                    debug!(
                        "Call {} session {} locked (attempt {}/{}), retrying in {:?}",
                        call_id,
                        request.session_key,
                        attempt,
                        self.lock_retry_count,
                        self.lock_retry_delay
                    );
                    tokio::time::sleep(self.lock_retry_delay).await;
                }
            }
        }
    }

    async fn attempt(&self, url: &str, request: &ConversationRequest) -> Attempt {
        let response = match self
            .client
            .post(url)
            .json(request)
            .timeout(self.request_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Attempt::Failed(self.classify(e)),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Attempt::Failed(self.classify(e)),
        };
        let parsed = serde_json::from_str::<ConversationResponse>(&body).ok();

        if status == StatusCode::LOCKED || parsed.as_ref().is_some_and(|r| r.is_locked()) {
            return Attempt::Locked(status.as_u16());
        }

        if !status.is_success() {
            let message = parsed.and_then(|r| r.error).unwrap_or(body);
            return Attempt::Failed(ConversationError::Status {
                status: status.as_u16(),
                message,
            });
        }

        match parsed {
            None => Attempt::Failed(ConversationError::InvalidResponse(body)),
            Some(r) if !r.success => Attempt::Failed(ConversationError::Rejected {
                message: r.error.unwrap_or_else(|| "unknown error".to_string()),
            }),
            Some(r) => match r.data {
                Some(reply) => Attempt::Reply(reply),
                None => Attempt::Failed(ConversationError::InvalidResponse(
                    "missing data".to_string(),
                )),
            },
        }
    }

    fn classify(&self, e: reqwest::Error) -> ConversationError {
        if e.is_timeout() {
            ConversationError::Timeout {
                timeout_ms: self.request_timeout.as_millis() as u64,
            }
        } else if e.is_builder() {
            ConversationError::Config(e.to_string())
        } else {
            ConversationError::Transport(e.to_string())
        }
    }

    /// Ask the service to release a call's session. Failures are only logged.
    pub async fn cleanup_session(&self, call_id: &str) {
        let request = SessionEndRequest {
            session_key: self.session_key(call_id),
        };
        let url = format!("{}/{}", self.base_url, SESSION_END_PATH);

        let result = self
            .client
            .post(&url)
            .json(&request)
            .timeout(self.request_timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match result {
            Ok(_) => debug!("Call {} session {} released", call_id, request.session_key),
            Err(e) => warn!(
                "Call {} failed to release session {}: {}",
                call_id, request.session_key, e
            ),
        }
    }
}
