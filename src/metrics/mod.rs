//! Per-call metrics
//!
//! The `MetricsLedger` owns every active call's `CallMetrics`. Call sessions
//! only touch metrics through `MetricsLedger::record`; finalizing a call moves
//! its record out of the active set and returns an immutable `CallSnapshot`.

mod ledger;
mod record;

pub use ledger::MetricsLedger;
pub use record::{
    AggregateStats, CallMetrics, CallSnapshot, EndReason, ErrorKind, ErrorRecord, MetricEvent,
};
