//! Module: range::quick
//! Responsibility: flatten a finished key tree into ordered, byte-ready
//! seek ranges.
//! Does not own: tree combination or cursor execution.
//! Boundary: `RangeSelection::from_result` is the planner-facing entry that
//! turns the node-cap failure into a full-scan decision.

use crate::{
    error::InternalError,
    key::{KeyDescriptor, KeyPartMap},
    obs::sink::{MetricsEvent, record},
    range::{KeyTree, NodeId, RangeArena, RangeError, RangeFlag, RangeMark},
};
use enumflags2::make_bitflags;
use derive_more::Deref;

///
/// QuickRange
///
/// One flattened interval over the leading key parts of an index.
/// Empty `min_key`/`max_key` bytes pair with `NO_MIN_RANGE`/`NO_MAX_RANGE`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QuickRange {
    pub(crate) min_key: Vec<u8>,
    pub(crate) min_keypart_map: KeyPartMap,
    pub(crate) max_key: Vec<u8>,
    pub(crate) max_keypart_map: KeyPartMap,
    pub(crate) flag: RangeFlag,
}

impl QuickRange {
    #[must_use]
    pub const fn new(
        min_key: Vec<u8>,
        min_keypart_map: KeyPartMap,
        max_key: Vec<u8>,
        max_keypart_map: KeyPartMap,
        flag: RangeFlag,
    ) -> Self {
        Self {
            min_key,
            min_keypart_map,
            max_key,
            max_keypart_map,
            flag,
        }
    }

    #[must_use]
    pub fn min_key(&self) -> &[u8] {
        &self.min_key
    }

    #[must_use]
    pub const fn min_keypart_map(&self) -> KeyPartMap {
        self.min_keypart_map
    }

    #[must_use]
    pub fn max_key(&self) -> &[u8] {
        &self.max_key
    }

    #[must_use]
    pub const fn max_keypart_map(&self) -> KeyPartMap {
        self.max_keypart_map
    }

    #[must_use]
    pub const fn flag(&self) -> RangeFlag {
        self.flag
    }
}

///
/// QuickRanges
///
/// Ordered, non-overlapping flattened ranges plus key usage statistics.
///

#[derive(Clone, Debug, Default, Deref, Eq, PartialEq)]
pub struct QuickRanges {
    #[deref]
    pub(crate) ranges: Vec<QuickRange>,
    pub(crate) max_used_key_length: usize,
    pub(crate) used_key_parts: usize,
}

impl QuickRanges {
    /// Longest packed bound among all ranges.
    #[must_use]
    pub const fn max_used_key_length(&self) -> usize {
        self.max_used_key_length
    }

    /// Number of leading key parts any range constrains.
    #[must_use]
    pub const fn used_key_parts(&self) -> usize {
        self.used_key_parts
    }

    pub(crate) fn push(&mut self, range: QuickRange, parts: usize) {
        self.max_used_key_length = self
            .max_used_key_length
            .max(range.min_key.len())
            .max(range.max_key.len());
        self.used_key_parts = self.used_key_parts.max(parts);
        self.ranges.push(range);
    }
}

///
/// RangeSelection
///
/// Planner decision for one index once range analysis is over.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RangeSelection {
    /// No row can satisfy the predicate.
    Empty,

    /// No usable range; scan the whole index.
    FullScan,

    Ranges(QuickRanges),
}

impl RangeSelection {
    /// Settle a range analysis result. The node cap is not an error here.
    pub fn from_result(
        arena: &RangeArena,
        key: &KeyDescriptor,
        result: Result<KeyTree, RangeError>,
    ) -> Result<Self, InternalError> {
        let root = match result {
            Ok(KeyTree::Root(root)) => root,
            Ok(KeyTree::Empty) => return Ok(Self::Empty),
            Ok(KeyTree::Full) => return Ok(Self::FullScan),
            Err(RangeError::TooManyNodes { limit }) => {
                record(MetricsEvent::RangeFallback { limit });
                return Ok(Self::FullScan);
            }
            Err(err) => return Err(err.into()),
        };

        // a tree that skips the leading part cannot seek
        if arena[root].range.part != 0 {
            return Ok(Self::FullScan);
        }

        let ranges = arena.quick_ranges(key, root)?;
        record(MetricsEvent::RangeBuilt {
            parts: u32::try_from(ranges.used_key_parts).unwrap_or(u32::MAX),
            nodes: u64::try_from(arena[root].elements).unwrap_or(u64::MAX),
        });
        record(MetricsEvent::QuickRangesBuilt {
            ranges: u64::try_from(ranges.len()).unwrap_or(u64::MAX),
        });

        Ok(Self::Ranges(ranges))
    }
}

impl RangeArena {
    /// Flatten the tree rooted at `root` into seek ranges, in key order.
    pub fn quick_ranges(
        &self,
        key: &KeyDescriptor,
        root: NodeId,
    ) -> Result<QuickRanges, RangeError> {
        let part = usize::from(self[root].range.part);
        if part != 0 {
            return Err(RangeError::LeadingPartMissing { part });
        }

        let mut ranges = QuickRanges::default();
        let mut min_key = Vec::with_capacity(key.key_length());
        let mut max_key = Vec::with_capacity(key.key_length());
        self.collect_quick(
            key,
            root,
            (&mut min_key, RangeFlag::empty()),
            (&mut max_key, RangeFlag::empty()),
            &mut ranges,
        );

        Ok(ranges)
    }

    // One tree level; the buffers already hold the equal prefix above it.
    fn collect_quick(
        &self,
        key: &KeyDescriptor,
        root: NodeId,
        (min_key, min_key_flag): (&mut Vec<u8>, RangeFlag),
        (max_key, max_key_flag): (&mut Vec<u8>, RangeFlag),
        out: &mut QuickRanges,
    ) {
        let (min_base, max_base) = (min_key.len(), max_key.len());

        for id in self.iter(root) {
            min_key.truncate(min_base);
            max_key.truncate(max_base);

            let node = &self[id];
            let range = &node.range;
            let part = usize::from(range.part);
            let length = range.field.store_length();

            let mut min_parts = part + range.store_min(length, min_key, min_key_flag);
            let mut max_parts = part + range.store_max(length, max_key, max_key_flag);

            let suffix = node
                .next_key_part
                .filter(|suffix| usize::from(self[*suffix].range.part) == part + 1);
            let mut flag = match suffix {
                Some(suffix) => {
                    // constant prefix: expand every suffix interval under it
                    if range.min_flag.is_empty()
                        && range.max_flag.is_empty()
                        && min_key[min_base..] == max_key[max_base..]
                    {
                        self.collect_quick(
                            key,
                            suffix,
                            (&mut *min_key, min_key_flag),
                            (&mut *max_key, max_key_flag),
                            out,
                        );
                        continue;
                    }

                    let (mut min_flag, mut max_flag) = (range.min_flag, range.max_flag);
                    if min_flag.is_empty() {
                        min_parts += self.store_min_key(suffix, min_key, &mut min_flag);
                    }
                    if max_flag.is_empty() {
                        max_parts += self.store_max_key(suffix, max_key, &mut max_flag);
                    }

                    min_flag | max_flag
                }
                None => range.min_flag | range.max_flag,
            };

            // a bound that stored nothing is unbounded
            if min_key.is_empty() {
                flag.insert(RangeMark::NoMinRange);
            } else {
                flag.remove(RangeMark::NoMinRange);
            }
            if max_key.is_empty() {
                flag.insert(RangeMark::NoMaxRange);
            } else {
                flag.remove(RangeMark::NoMaxRange);
            }

            if flag.is_empty() && min_key == max_key {
                flag = make_bitflags!(RangeMark::{EqRange});
                if key.is_unique() && min_parts == key.part_count() {
                    flag.insert(if key.has_null_part(min_key, min_key.len()) {
                        RangeMark::NullRange
                    } else {
                        RangeMark::UniqueRange
                    });
                }
            }

            out.push(
                QuickRange::new(
                    min_key.clone(),
                    KeyPartMap::prefix(min_parts),
                    max_key.clone(),
                    KeyPartMap::prefix(max_parts),
                    flag,
                ),
                part + 1,
            );
        }

        min_key.truncate(min_base);
        max_key.truncate(max_base);
    }
}
