use super::record::{AggregateStats, CallMetrics, CallSnapshot, MetricEvent};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

/// Capacity of the finalized-snapshot broadcast channel
const SNAPSHOT_CHANNEL_CAPACITY: usize = 256;

/// Per-call metrics store shared by every call task
///
/// Cloning is cheap and every clone sees the same active set.
#[derive(Clone)]
pub struct MetricsLedger {
    /// Active (non-finalized) calls (call_id → metrics)
    active: Arc<RwLock<HashMap<String, CallMetrics>>>,

    /// Finalized snapshots for external exporters
    snapshots: broadcast::Sender<CallSnapshot>,
}

impl MetricsLedger {
    pub fn new() -> Self {
        let (snapshots, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        Self {
            active: Arc::new(RwLock::new(HashMap::new())),
            snapshots,
        }
    }

    /// Start tracking a call. A second init for the same id replaces the first.
    pub async fn init_call(&self, call_id: &str) {
        let mut active = self.active.write().await;
        if active
            .insert(call_id.to_string(), CallMetrics::new(call_id))
            .is_some()
        {
            warn!("Metrics for call {} re-initialized; prior record dropped", call_id);
        }
    }

    /// Apply one event to a call. Unknown call ids are ignored.
    pub async fn record(&self, call_id: &str, event: MetricEvent) {
        let mut active = self.active.write().await;
        match active.get_mut(call_id) {
            Some(metrics) => {
                debug!("Call {} metric: {:?}", call_id, event);
                metrics.apply(event);
            }
            None => {
                warn!("Dropping metric {:?} for unknown call {}", event, call_id);
            }
        }
    }

    /// Remove a call from the active set and return its final snapshot.
    ///
    /// Returns `None` if the call was never initialized or already finalized.
    pub async fn finalize(&self, call_id: &str) -> Option<CallSnapshot> {
        let metrics = {
            let mut active = self.active.write().await;
            active.remove(call_id)?
        };

        let end = metrics.end_time.unwrap_or_else(Utc::now);
        let duration_ms = end
            .signed_duration_since(metrics.start_time)
            .num_milliseconds();

        let snapshot = CallSnapshot {
            metrics,
            duration_ms,
        };

        info!(
            "Call {} finalized: {}ms, reason={}, stt={}/{} tts={}/{} llm={}/{} barge_in={}",
            snapshot.metrics.call_id,
            snapshot.duration_ms,
            snapshot
                .metrics
                .end_reason
                .map(|r| r.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            snapshot.metrics.stt_count,
            snapshot.metrics.stt_errors,
            snapshot.metrics.tts_count,
            snapshot.metrics.tts_errors,
            snapshot.metrics.llm_count,
            snapshot.metrics.llm_errors,
            snapshot.metrics.barge_in_count,
        );

        // No subscribers is fine
        let _ = self.snapshots.send(snapshot.clone());

        Some(snapshot)
    }

    /// Current metrics of an active call
    pub async fn get(&self, call_id: &str) -> Option<CallMetrics> {
        let active = self.active.read().await;
        active.get(call_id).cloned()
    }

    /// Counters summed over the calls active right now
    pub async fn get_stats(&self) -> AggregateStats {
        let active = self.active.read().await;

        active.values().fold(
            AggregateStats {
                active_calls: active.len(),
                ..AggregateStats::default()
            },
            |mut stats, m| {
                stats.stt_count += m.stt_count;
                stats.stt_errors += m.stt_errors;
                stats.tts_count += m.tts_count;
                stats.tts_errors += m.tts_errors;
                stats.llm_count += m.llm_count;
                stats.llm_errors += m.llm_errors;
                stats.barge_in_count += m.barge_in_count;
                stats
            },
        )
    }

    /// Receive every snapshot finalized after this call
    pub fn subscribe(&self) -> broadcast::Receiver<CallSnapshot> {
        self.snapshots.subscribe()
    }
}

impl Default for MetricsLedger {
    fn default() -> Self {
        Self::new()
    }
}
