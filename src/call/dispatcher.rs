use super::session::{CallOutcome, CallServices, CallSession};
use super::signaling::CallContext;
use super::state::{CallDirection, CallState};
use crate::metrics::{EndReason, MetricsLedger};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Public view of an active call
#[derive(Debug, Clone, Serialize)]
pub struct CallStatus {
    pub call_id: String,
    pub from: String,
    pub to: String,
    pub direction: CallDirection,
    pub state: CallState,
    pub started_at: DateTime<Utc>,
}

struct ActiveCall {
    from: String,
    to: String,
    direction: CallDirection,
    started_at: DateTime<Utc>,
    state: watch::Receiver<CallState>,
    hangup: watch::Sender<Option<EndReason>>,
    /// Taken by `shutdown` to drain the call
    task: Option<JoinHandle<CallOutcome>>,
}

impl ActiveCall {
    fn status(&self, call_id: &str) -> CallStatus {
        CallStatus {
            call_id: call_id.to_string(),
            from: self.from.clone(),
            to: self.to.clone(),
            direction: self.direction,
            state: *self.state.borrow(),
            started_at: self.started_at,
        }
    }
}

/// Entry point for the signaling layer; one task per call
pub struct CallDispatcher {
    services: Arc<CallServices>,

    /// Active calls (call_id → call)
    calls: Arc<RwLock<HashMap<String, ActiveCall>>>,

    shutting_down: AtomicBool,
}

impl CallDispatcher {
    pub fn new(services: Arc<CallServices>) -> Self {
        Self {
            services,
            calls: Arc::new(RwLock::new(HashMap::new())),
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn ledger(&self) -> &MetricsLedger {
        &self.services.ledger
    }

    /// Start handling a new call
    pub async fn on_invite(&self, context: Arc<dyn CallContext>) -> Result<()> {
        let call_id = context.call_id().to_string();

        if self.shutting_down.load(Ordering::SeqCst) {
            warn!("Rejecting call {}: shutting down", call_id);
            bail!("Dispatcher is shutting down");
        }

        // Held across spawn + insert so the task cannot remove itself first
        let mut calls = self.calls.write().await;
        // `shutdown` flips the flag under this lock; re-check so a call can
        // never slip in after the drain collected its tasks
        if self.shutting_down.load(Ordering::SeqCst) {
            warn!("Rejecting call {}: shutting down", call_id);
            bail!("Dispatcher is shutting down");
        }
        if calls.contains_key(&call_id) {
            warn!("Rejecting duplicate call {}", call_id);
            bail!("Call {} is already active", call_id);
        }

        let session = CallSession::new(Arc::clone(&context), Arc::clone(&self.services));
        let state = session.watch_state();
        let started_at = session.started_at();
        let (hangup, hangup_rx) = watch::channel(None);

        let registry = Arc::clone(&self.calls);
        let task_call_id = call_id.clone();
        let task = tokio::spawn(async move {
            let outcome = session.run(hangup_rx).await;
            registry.write().await.remove(&task_call_id);
            outcome
        });

        calls.insert(
            call_id.clone(),
            ActiveCall {
                from: context.from_uri().to_string(),
                to: context.to_uri().to_string(),
                direction: context.direction(),
                started_at,
                state,
                hangup,
                task: Some(task),
            },
        );

        info!("Call {} dispatched ({} active)", call_id, calls.len());

        Ok(())
    }

    /// Signal that the remote party hung up. Returns false for unknown calls.
    pub async fn hangup(&self, call_id: &str) -> bool {
        self.signal(call_id, EndReason::Completed).await
    }

    async fn signal(&self, call_id: &str, reason: EndReason) -> bool {
        let calls = self.calls.read().await;
        match calls.get(call_id) {
            Some(call) => {
                call.hangup.send_replace(Some(reason));
                true
            }
            None => false,
        }
    }

    pub async fn active_calls(&self) -> Vec<CallStatus> {
        let calls = self.calls.read().await;
        let mut statuses: Vec<CallStatus> = calls
            .iter()
            .map(|(call_id, call)| call.status(call_id))
            .collect();
        statuses.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        statuses
    }

    pub async fn call_status(&self, call_id: &str) -> Option<CallStatus> {
        let calls = self.calls.read().await;
        calls.get(call_id).map(|call| call.status(call_id))
    }

    pub async fn active_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Stop accepting calls, end every active call and wait for them to finish
    pub async fn shutdown(&self) -> Vec<CallOutcome> {
        let tasks: Vec<(String, JoinHandle<CallOutcome>)> = {
            let mut calls = self.calls.write().await;
            self.shutting_down.store(true, Ordering::SeqCst);
            calls
                .iter_mut()
                .filter_map(|(call_id, call)| {
                    call.hangup.send_replace(Some(EndReason::Shutdown));
                    call.task.take().map(|task| (call_id.clone(), task))
                })
                .collect()
        };

        info!("Draining {} active call(s)", tasks.len());

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (call_id, result) in futures::future::join_all(
            tasks
                .into_iter()
                .map(|(call_id, task)| async move { (call_id, task.await) }),
        )
        .await
        {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!("Call {} task panicked: {}", call_id, e),
            }
        }

        outcomes
    }
}
