//! Module: scan::prefix
//! Responsibility: walk flattened ranges one distinct key prefix at a time.
//! Does not own: group aggregation (scan::group).

use crate::{
    key::{KeyDescriptor, KeyPartMap},
    obs::sink::{MetricsEvent, ProbeKind, record},
    range::{NEAR, QuickRanges, RangeMark},
    scan::{CursorError, ReadFlag, StorageCursor},
};
use std::cmp::Ordering;

///
/// PrefixRangeScan
///
/// Walks a list of seek ranges one distinct key prefix at a time.
/// Each call returns the first record of the next prefix that falls inside
/// some range, skipping over everything else in that prefix.
///

#[derive(Clone, Debug)]
pub struct PrefixRangeScan {
    ranges: QuickRanges,
    next_range: usize,
    active: Option<usize>,
    returned: bool,
    probes: u64,
}

impl PrefixRangeScan {
    #[must_use]
    pub const fn new(ranges: QuickRanges) -> Self {
        Self {
            ranges,
            next_range: 0,
            active: None,
            returned: false,
            probes: 0,
        }
    }

    #[must_use]
    pub const fn ranges(&self) -> &QuickRanges {
        &self.ranges
    }

    pub const fn reset(&mut self) {
        self.next_range = 0;
        self.active = None;
        self.returned = false;
    }

    /// Ranges longer than the group prefix get truncated on lookup; an open
    /// bound on a truncated range would skip the whole prefix.
    pub fn adjust_prefix_ranges(&mut self, group_prefix_len: usize) {
        if group_prefix_len >= self.ranges.max_used_key_length {
            return;
        }

        for range in &mut self.ranges.ranges {
            range.flag.remove(NEAR);
        }
    }

    /// Position `buf` on the first record of the next key prefix inside the
    /// ranges. `cur_prefix` is the prefix returned by the previous call and
    /// is ignored before the first success. A prefix is never returned twice,
    /// even when several ranges share it.
    pub fn get_next_prefix<C: StorageCursor + ?Sized>(
        &mut self,
        cursor: &mut C,
        key: &KeyDescriptor,
        prefix_length: usize,
        keypart_map: KeyPartMap,
        cur_prefix: &[u8],
        buf: &mut Vec<u8>,
    ) -> Result<(), CursorError> {
        loop {
            if let Some(active) = self.active {
                // same range, next prefix
                self.note_probe(ProbeKind::ReadMap);
                match cursor.index_read_map(buf, cur_prefix, keypart_map, ReadFlag::AfterKey) {
                    Ok(()) if self.within_end(key, active, prefix_length, buf) => {
                        self.returned = true;
                        return Ok(());
                    }
                    Ok(()) => {}
                    Err(err) if err.is_recoverable() => {}
                    Err(err) => return Err(err),
                }
                self.active = None;
            }

            let index = self.next_range;
            let Some(range) = self.ranges.get(index) else {
                return Err(CursorError::EndOfFile);
            };
            self.next_range += 1;

            let seek = if self.returned && self.ends_by(key, index, prefix_length, cur_prefix) {
                // every prefix of this range was already returned
                continue;
            } else if self.returned && self.starts_by(key, index, prefix_length, cur_prefix) {
                Seek::PastCurrent
            } else {
                Seek::RangeStart
            };

            let result = match seek {
                Seek::PastCurrent => {
                    self.note_probe(ProbeKind::ReadMap);
                    cursor.index_read_map(buf, cur_prefix, keypart_map, ReadFlag::AfterKey)
                }
                Seek::RangeStart if range.min_keypart_map.is_empty() => {
                    self.note_probe(ProbeKind::First);
                    cursor.index_first(buf)
                }
                Seek::RangeStart => {
                    let flag = if range.flag.contains(RangeMark::NearMin) {
                        ReadFlag::AfterKey
                    } else if range.flag.contains(RangeMark::EqRange) {
                        ReadFlag::KeyExact
                    } else {
                        ReadFlag::KeyOrNext
                    };
                    let length = range.min_key.len().min(prefix_length);
                    let start_map = range.min_keypart_map.intersect(keypart_map);

                    self.note_probe(ProbeKind::ReadMap);
                    cursor.index_read_map(buf, &self.ranges[index].min_key[..length], start_map, flag)
                }
            };

            // a unique point holds exactly one prefix
            let single = self.ranges[index].flag == RangeMark::UniqueRange | RangeMark::EqRange;
            self.active = (!single).then_some(index);

            match result {
                Ok(()) if self.within_end(key, index, prefix_length, buf) => {
                    self.returned = true;
                    return Ok(());
                }
                Ok(()) => {}
                Err(err) if err.is_recoverable() => {}
                Err(err) => return Err(err),
            }
            self.active = None;
        }
    }

    /// Probes issued since the last call.
    pub(crate) const fn take_probes(&mut self) -> u64 {
        let probes = self.probes;
        self.probes = 0;

        probes
    }

    fn note_probe(&mut self, op: ProbeKind) {
        record(MetricsEvent::CursorProbe { op });
        self.probes = self.probes.saturating_add(1);
    }

    // Truncated upper bound at or below `prefix`: nothing past it remains.
    fn ends_by(&self, key: &KeyDescriptor, index: usize, prefix_length: usize, prefix: &[u8]) -> bool {
        let range = &self.ranges[index];
        if range.max_keypart_map.is_empty() {
            return false;
        }

        let length = range.max_key.len().min(prefix_length);
        key.compare_prefix(&range.max_key, prefix, length) != Ordering::Greater
    }

    // Truncated lower bound at or below `prefix`: seeking the range start
    // would land on a prefix already returned.
    fn starts_by(&self, key: &KeyDescriptor, index: usize, prefix_length: usize, prefix: &[u8]) -> bool {
        let range = &self.ranges[index];
        if range.min_keypart_map.is_empty() {
            return true;
        }

        let length = range.min_key.len().min(prefix_length);
        key.compare_prefix(&range.min_key, prefix, length) != Ordering::Greater
    }

    fn within_end(&self, key: &KeyDescriptor, index: usize, prefix_length: usize, buf: &[u8]) -> bool {
        let range = &self.ranges[index];
        if range.max_keypart_map.is_empty() {
            return true;
        }

        let length = range.max_key.len().min(prefix_length);
        match key.compare_prefix(buf, &range.max_key, length) {
            Ordering::Less => true,
            Ordering::Equal => !range.flag.contains(RangeMark::NearMax),
            Ordering::Greater => false,
        }
    }
}

// Where the next range's first read starts.
enum Seek {
    RangeStart,
    PastCurrent,
}
