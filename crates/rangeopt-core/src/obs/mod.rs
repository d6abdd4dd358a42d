//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! This module does not inspect range trees or cursors directly.
//! Range and scan code report through `sink::record` only.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventReport, EventState, RangeCounters, ScanCounters};
pub use sink::{
    MetricsEvent, MetricsSink, ProbeKind, metrics_report, metrics_reset_all, with_metrics_sink,
};
