//! Metrics sink boundary.
//!
//! Range and scan logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
//!
//! This module is the only allowed bridge between optimizer logic
//! and the thread-local metrics state.
use crate::obs::metrics;
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// ProbeKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProbeKind {
    First,
    Last,
    ReadMap,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    RangeBuilt { parts: u32, nodes: u64 },
    RangeFallback { limit: usize },
    QuickRangesBuilt { ranges: u64 },
    TreeCloned { nodes: u64 },
    CursorProbe { op: ProbeKind },
    GroupScanStart,
    GroupScanFinish { groups: u64, probes: u64 },
    GroupSkipped,
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink that writes into the thread-local metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::RangeBuilt { parts, nodes } => {
                metrics::with_state_mut(|m| {
                    m.ranges.trees_built = m.ranges.trees_built.saturating_add(1);
                    m.ranges.tree_nodes = m.ranges.tree_nodes.saturating_add(nodes);
                    m.ranges.tree_key_parts = m.ranges.tree_key_parts.saturating_add(u64::from(parts));
                });
            }

            MetricsEvent::RangeFallback { limit: _ } => {
                metrics::with_state_mut(|m| {
                    m.ranges.full_scan_fallbacks = m.ranges.full_scan_fallbacks.saturating_add(1);
                });
            }

            MetricsEvent::QuickRangesBuilt { ranges } => {
                metrics::with_state_mut(|m| {
                    m.ranges.quick_ranges_built = m.ranges.quick_ranges_built.saturating_add(ranges);
                });
            }

            MetricsEvent::TreeCloned { nodes } => {
                metrics::with_state_mut(|m| {
                    m.ranges.trees_cloned = m.ranges.trees_cloned.saturating_add(1);
                    m.ranges.cloned_nodes = m.ranges.cloned_nodes.saturating_add(nodes);
                });
            }

            MetricsEvent::CursorProbe { op } => {
                metrics::with_state_mut(|m| match op {
                    ProbeKind::First => {
                        m.scans.index_first_calls = m.scans.index_first_calls.saturating_add(1);
                    }
                    ProbeKind::Last => {
                        m.scans.index_last_calls = m.scans.index_last_calls.saturating_add(1);
                    }
                    ProbeKind::ReadMap => {
                        m.scans.index_read_calls = m.scans.index_read_calls.saturating_add(1);
                    }
                });
            }

            MetricsEvent::GroupScanStart => {
                metrics::with_state_mut(|m| {
                    m.scans.group_scans_started = m.scans.group_scans_started.saturating_add(1);
                });
            }

            MetricsEvent::GroupScanFinish { groups, probes } => {
                metrics::with_state_mut(|m| {
                    m.scans.group_scans_finished = m.scans.group_scans_finished.saturating_add(1);
                    m.scans.groups_returned = m.scans.groups_returned.saturating_add(groups);
                    m.scans.scan_probes = m.scans.scan_probes.saturating_add(probes);
                });
            }

            MetricsEvent::GroupSkipped => {
                metrics::with_state_mut(|m| {
                    m.scans.groups_skipped = m.scans.groups_skipped.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // - `ptr` was produced from a valid `&dyn MetricsSink` in `with_metrics_sink`.
        // - `with_metrics_sink` restores the previous pointer before returning,
        //   including unwind paths via `Guard::drop`.
        // - `record` is synchronous and never stores `ptr` beyond this call.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current metrics state for test and reporting plumbing.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - `sink_ptr` is installed only for this dynamic scope.
    // - `Guard` restores the previous slot on all exits, including panic.
    // - `record` only dereferences synchronously and never persists `sink_ptr`.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| {
        let mut slot = cell.borrow_mut();
        slot.replace(sink_ptr)
    });
    let _guard = Guard(prev);

    f()
}

/// Span
/// RAII guard that emits start/finish events for one group scan.
/// Ensures finish accounting happens even on unwind.

pub(crate) struct Span {
    groups: u64,
    probes: u64,
}

impl Span {
    /// Start a metrics span for one group scan.
    #[must_use]
    pub(crate) fn new() -> Self {
        record(MetricsEvent::GroupScanStart);

        Self {
            groups: 0,
            probes: 0,
        }
    }

    pub(crate) const fn add_group(&mut self) {
        self.groups = self.groups.saturating_add(1);
    }

    pub(crate) const fn add_probe(&mut self) {
        self.probes = self.probes.saturating_add(1);
    }

    pub(crate) const fn add_probes(&mut self, probes: u64) {
        self.probes = self.probes.saturating_add(probes);
    }

}

impl Drop for Span {
    fn drop(&mut self) {
        record(MetricsEvent::GroupScanFinish {
            groups: self.groups,
            probes: self.probes,
        });
    }
}

///
/// TESTS
///
