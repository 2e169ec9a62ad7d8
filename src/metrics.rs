//! Counters for channel traffic and task outcomes.
//!
//! With the `metrics` feature enabled these go through the `metrics` facade,
//! so any installed recorder picks them up. Without it every call is a no-op.

/// Payloads put on the channel by producers.
pub const ITEMS_PRODUCED: &str = "handoff_items_produced_total";
/// Payloads handed to consumers.
pub const ITEMS_CONSUMED: &str = "handoff_items_consumed_total";
/// Producer, consumer and operation faults that were contained.
pub const TASK_FAULTS: &str = "handoff_task_faults_total";
/// Completed engine runs.
pub const RUNS: &str = "handoff_runs_total";

#[inline]
pub(crate) fn record_produced() {
    #[cfg(feature = "metrics")]
    ::metrics::counter!(ITEMS_PRODUCED).increment(1);
}

#[inline]
pub(crate) fn record_consumed() {
    #[cfg(feature = "metrics")]
    ::metrics::counter!(ITEMS_CONSUMED).increment(1);
}

#[inline]
pub(crate) fn record_fault(kind: &'static str) {
    #[cfg(feature = "metrics")]
    ::metrics::counter!(TASK_FAULTS, "kind" => kind).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = kind;
}

#[inline]
pub(crate) fn record_run() {
    #[cfg(feature = "metrics")]
    ::metrics::counter!(RUNS).increment(1);
}
