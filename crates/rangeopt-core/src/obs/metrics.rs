use serde::{Deserialize, Serialize};
use std::cell::RefCell;

///
/// EventState
/// Ephemeral, in-memory counters for range analysis and group scans.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventState {
    pub ranges: RangeCounters,
    pub scans: ScanCounters,
}

///
/// RangeCounters
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct RangeCounters {
    // Range construction
    pub trees_built: u64,
    pub tree_nodes: u64,
    pub trees_cloned: u64,
    pub cloned_nodes: u64,
    pub tree_key_parts: u64,

    // Planning outcomes
    pub quick_ranges_built: u64,
    pub full_scan_fallbacks: u64,
}

///
/// ScanCounters
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ScanCounters {
    // Group scan lifecycle
    pub group_scans_started: u64,
    pub group_scans_finished: u64,
    pub groups_returned: u64,
    pub groups_skipped: u64,

    // Cursor probes
    pub index_first_calls: u64,
    pub index_last_calls: u64,
    pub index_read_calls: u64,
    pub scan_probes: u64,
}

/// Point-in-time snapshot of the event state.
pub type EventReport = EventState;

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters (useful in tests).
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Snapshot the current event state.
#[must_use]
pub(crate) fn report() -> EventReport {
    with_state(Clone::clone)
}
