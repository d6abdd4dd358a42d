//! Module: scan::group
//! Responsibility: the group MIN/MAX scan state machine and its probes.
//! Does not own: prefix range iteration (scan::prefix) or storage access.
//! Boundary: all storage reads go through `StorageCursor`.

use crate::{
    error::InternalError,
    key::{KeyDescriptor, KeyPartMap},
    obs::sink::{MetricsEvent, ProbeKind, Span, record},
    range::{KeyRange, NodeId, QuickRange, RangeArena, RangeMark, UNBOUNDED},
    scan::{CursorError, PrefixRangeScan, ReadFlag, StorageCursor},
};
use std::cmp::Ordering;

///
/// GroupMinMaxSpec
///
/// Shape of one loose index scan: which key parts form the group, which
/// constant infix follows them, and which part carries MIN/MAX.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GroupMinMaxSpec {
    pub index: u32,
    pub group_key_parts: usize,
    pub key_infix: Vec<u8>,
    pub key_infix_parts: usize,
    pub have_min: bool,
    pub have_max: bool,
    pub min_max_arg_part: Option<usize>,
    pub range_tree: Option<NodeId>,
}

impl GroupMinMaxSpec {
    #[must_use]
    pub fn new(index: u32, group_key_parts: usize) -> Self {
        Self {
            index,
            group_key_parts,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_min(mut self) -> Self {
        self.have_min = true;
        self
    }

    #[must_use]
    pub const fn with_max(mut self) -> Self {
        self.have_max = true;
        self
    }

    /// Constant images for the key parts directly after the group.
    #[must_use]
    pub fn with_infix(mut self, key_infix: Vec<u8>, key_infix_parts: usize) -> Self {
        self.key_infix = key_infix;
        self.key_infix_parts = key_infix_parts;
        self
    }

    #[must_use]
    pub const fn with_min_max_arg(mut self, part: usize) -> Self {
        self.min_max_arg_part = Some(part);
        self
    }

    #[must_use]
    pub const fn with_range_tree(mut self, root: NodeId) -> Self {
        self.range_tree = Some(root);
        self
    }
}

///
/// ScanState
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScanState {
    Init,
    AtGroupPrefix,
    AtMin,
    AtMax,
    AtEof,
}

///
/// GroupRow
///
/// One qualifying group: its prefix bytes and, when requested, the
/// MIN/MAX argument images (a NULL image when only NULL qualified).
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GroupRow {
    pub group_key: Vec<u8>,
    pub min: Option<Vec<u8>>,
    pub max: Option<Vec<u8>>,
}

// MIN and MAX argument images of one group.
type GroupBounds = (Option<Vec<u8>>, Option<Vec<u8>>);

///
/// GroupMinMaxScanner
///
/// Loose index scan: touches each distinct group prefix once and answers
/// MIN/MAX with one or two probes instead of reading the whole group.
///

pub struct GroupMinMaxScanner<C> {
    cursor: C,
    key: KeyDescriptor,
    index: u32,
    group_key_parts: usize,
    key_infix: Vec<u8>,
    have_min: bool,
    have_max: bool,
    min_max_arg_part: Option<usize>,
    prefix_select: Option<PrefixRangeScan>,
    min_max_ranges: Vec<QuickRange>,

    group_prefix_len: usize,
    real_prefix_len: usize,
    real_key_parts: usize,
    used_key_parts: usize,
    max_used_key_length: usize,

    group_prefix: Vec<u8>,
    last_prefix: Vec<u8>,
    record: Vec<u8>,
    tmp_record: Vec<u8>,
    seen_first_key: bool,
    at_last_prefix: bool,
    state: ScanState,
    span: Option<Span>,
}

impl<C: StorageCursor> GroupMinMaxScanner<C> {
    pub fn new(
        spec: GroupMinMaxSpec,
        arena: &RangeArena,
        key: &KeyDescriptor,
        cursor: C,
    ) -> Result<Self, InternalError> {
        let real_key_parts = spec.group_key_parts + spec.key_infix_parts;
        if real_key_parts > key.part_count() {
            return Err(InternalError::scan_unsupported(format!(
                "group and infix cover {real_key_parts} parts of a {}-part key",
                key.part_count()
            )));
        }

        let group_prefix_len = key.prefix_length(spec.group_key_parts);
        let real_prefix_len = key.prefix_length(real_key_parts);
        if spec.key_infix.len() != real_prefix_len - group_prefix_len {
            return Err(InternalError::scan_unsupported(format!(
                "key infix is {} bytes, infix parts take {}",
                spec.key_infix.len(),
                real_prefix_len - group_prefix_len
            )));
        }

        match spec.min_max_arg_part {
            Some(part) if part != real_key_parts || part >= key.part_count() => {
                return Err(InternalError::scan_unsupported(format!(
                    "MIN/MAX argument must be key part {real_key_parts}, got {part}"
                )));
            }
            None if spec.have_min || spec.have_max => {
                return Err(InternalError::scan_unsupported(
                    "MIN/MAX requested without an argument key part",
                ));
            }
            _ => {}
        }

        let mut prefix_select = None;
        let mut min_max_ranges = Vec::new();

        if let Some(root) = spec.range_tree {
            let root_part = usize::from(arena[root].range.part);

            if root_part == 0 && spec.group_key_parts > 0 {
                prefix_select = Some(PrefixRangeScan::new(arena.quick_ranges(key, root)?));
            } else if root_part < real_key_parts {
                return Err(InternalError::scan_unsupported(format!(
                    "range tree starts inside the group prefix at part {root_part}"
                )));
            }

            if let Some(arg_part) = spec.min_max_arg_part {
                min_max_ranges = collect_min_max_ranges(arena, root, arg_part);
            }
        }

        let mut scanner = Self {
            cursor,
            key: key.clone(),
            index: spec.index,
            group_key_parts: spec.group_key_parts,
            key_infix: spec.key_infix,
            have_min: spec.have_min,
            have_max: spec.have_max,
            min_max_arg_part: spec.min_max_arg_part,
            prefix_select,
            min_max_ranges,
            group_prefix_len,
            real_prefix_len,
            real_key_parts,
            used_key_parts: real_key_parts,
            max_used_key_length: real_prefix_len,
            group_prefix: Vec::with_capacity(key.key_length()),
            last_prefix: Vec::with_capacity(group_prefix_len),
            record: Vec::with_capacity(key.key_length()),
            tmp_record: Vec::with_capacity(key.key_length()),
            seen_first_key: false,
            at_last_prefix: false,
            state: ScanState::Init,
            span: None,
        };
        scanner.update_key_stat();
        if let Some(prefix_select) = &mut scanner.prefix_select {
            prefix_select.adjust_prefix_ranges(group_prefix_len);
        }

        Ok(scanner)
    }

    #[must_use]
    pub const fn state(&self) -> ScanState {
        self.state
    }

    #[must_use]
    pub const fn used_key_parts(&self) -> usize {
        self.used_key_parts
    }

    #[must_use]
    pub const fn max_used_key_length(&self) -> usize {
        self.max_used_key_length
    }

    #[must_use]
    pub fn min_max_ranges(&self) -> &[QuickRange] {
        &self.min_max_ranges
    }

    #[must_use]
    pub const fn prefix_select(&self) -> Option<&PrefixRangeScan> {
        self.prefix_select.as_ref()
    }

    #[must_use]
    pub const fn cursor(&self) -> &C {
        &self.cursor
    }

    pub fn into_cursor(self) -> C {
        self.cursor
    }

    /// Open the index and remember the last group prefix.
    pub fn reset(&mut self) -> Result<(), InternalError> {
        self.cursor.start_index_scan(self.index, true)?;
        if let Some(prefix_select) = &mut self.prefix_select {
            prefix_select.reset();
        }

        self.seen_first_key = false;
        self.at_last_prefix = false;
        self.group_prefix.clear();
        self.last_prefix.clear();
        self.span = Some(Span::new());

        self.note_probe(ProbeKind::Last);
        match self.cursor.index_last(&mut self.record) {
            Ok(()) => {
                self.last_prefix
                    .extend_from_slice(head(&self.record, self.group_prefix_len));
                self.state = ScanState::Init;
            }
            Err(err) if err.is_recoverable() => self.finish()?,
            Err(err) => return Err(err.into()),
        }

        Ok(())
    }

    /// Next qualifying group, or `None` once the index is exhausted.
    pub fn get_next(&mut self) -> Result<Option<GroupRow>, InternalError> {
        if self.state == ScanState::AtEof {
            return Ok(None);
        }
        if self.span.is_none() {
            return Err(InternalError::scan_invariant(
                "group scan read before reset",
            ));
        }

        loop {
            match self.next_prefix() {
                Ok(()) => {}
                Err(err) if err.is_recoverable() => {
                    if self.prefix_select.is_none() && self.seen_first_key && !self.at_last_prefix {
                        return Err(InternalError::scan_corruption(format!(
                            "index ended before the last group prefix ({err})"
                        )));
                    }
                    self.finish()?;
                    return Ok(None);
                }
                Err(err) => return Err(err.into()),
            }

            self.state = ScanState::AtGroupPrefix;
            self.at_last_prefix = self.key.compare_prefix(
                &self.group_prefix,
                &self.last_prefix,
                self.group_prefix_len,
            ) != Ordering::Less;

            if let Some((min, max)) = self.read_group()? {
                if let Some(span) = &mut self.span {
                    span.add_group();
                }

                return Ok(Some(GroupRow {
                    group_key: head(&self.group_prefix, self.group_prefix_len).to_vec(),
                    min,
                    max,
                }));
            }

            if self.at_last_prefix {
                self.finish()?;
                return Ok(None);
            }
            record(MetricsEvent::GroupSkipped);
        }
    }

    // MIN/MAX (or the infix check) for the current group; `None` when no row
    // of the group qualifies.
    fn read_group(&mut self) -> Result<Option<GroupBounds>, CursorError> {
        let mut min = None;
        let mut max = None;

        if self.have_min {
            match self.next_min() {
                Ok(()) => {
                    self.state = ScanState::AtMin;
                    min = self.min_max_image();
                }
                Err(err) if err.is_recoverable() => return Ok(None),
                Err(err) => return Err(err),
            }
        }
        if self.have_max {
            match self.next_max() {
                Ok(()) => {
                    self.state = ScanState::AtMax;
                    max = self.min_max_image();
                }
                Err(err) if err.is_recoverable() => return Ok(None),
                Err(err) => return Err(err),
            }
        }
        if !self.have_min && !self.have_max && !self.key_infix.is_empty() {
            self.group_prefix.truncate(self.real_prefix_len);
            match self.read_map(KeyPartMap::prefix(self.real_key_parts), ReadFlag::KeyExact) {
                Ok(()) => {}
                Err(err) if err.is_recoverable() => return Ok(None),
                Err(err) => return Err(err),
            }
        }

        Ok(Some((min, max)))
    }

    /// Move to the first record of the next group and load its prefix.
    pub fn next_prefix(&mut self) -> Result<(), CursorError> {
        if let Some(prefix_select) = &mut self.prefix_select {
            let result = prefix_select.get_next_prefix(
                &mut self.cursor,
                &self.key,
                self.group_prefix_len,
                KeyPartMap::prefix(self.group_key_parts),
                head(&self.group_prefix, self.group_prefix_len),
                &mut self.record,
            );
            let probes = prefix_select.take_probes();
            if let Some(span) = &mut self.span {
                span.add_probes(probes);
            }
            result?;
            self.seen_first_key = true;
        } else if self.seen_first_key {
            self.group_prefix.truncate(self.group_prefix_len);
            self.read_map(KeyPartMap::prefix(self.group_key_parts), ReadFlag::AfterKey)?;
        } else {
            self.note_probe(ProbeKind::First);
            self.cursor.index_first(&mut self.record)?;
            self.seen_first_key = true;
        }

        self.group_prefix.clear();
        self.group_prefix
            .extend_from_slice(head(&self.record, self.group_prefix_len));
        self.group_prefix.extend_from_slice(&self.key_infix);

        Ok(())
    }

    /// Position on the smallest qualifying MIN/MAX argument in the group.
    pub fn next_min(&mut self) -> Result<(), CursorError> {
        if !self.min_max_ranges.is_empty() {
            return self.next_min_in_range();
        }

        if !self.key_infix.is_empty() {
            self.group_prefix.truncate(self.real_prefix_len);
            self.read_map(KeyPartMap::prefix(self.real_key_parts), ReadFlag::KeyExact)?;
        }

        // NULL sorts first: step past the NULL run, falling back to it when
        // the whole group is NULL
        let Some(part) = self.min_max_arg_part else {
            return Ok(());
        };
        if !self.is_null_argument(part) {
            return Ok(());
        }

        self.tmp_record.clone_from(&self.record);
        self.note_probe(ProbeKind::ReadMap);
        let result = self.cursor.index_read_map(
            &mut self.record,
            &self.tmp_record,
            KeyPartMap::through(self.real_key_parts),
            ReadFlag::AfterKey,
        );
        match result {
            Ok(()) if self.in_group() => Ok(()),
            Ok(()) => {
                self.record.clone_from(&self.tmp_record);
                Ok(())
            }
            Err(err) if err.is_recoverable() => {
                self.record.clone_from(&self.tmp_record);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Position on the largest qualifying MIN/MAX argument in the group.
    pub fn next_max(&mut self) -> Result<(), CursorError> {
        if !self.min_max_ranges.is_empty() {
            return self.next_max_in_range();
        }

        self.group_prefix.truncate(self.real_prefix_len);
        self.read_map(KeyPartMap::prefix(self.real_key_parts), ReadFlag::PrefixLast)
    }

    /// Search the MIN/MAX ranges left to right for the first in-group key.
    /// A NULL hit is kept only as a fallback for a group with no other match.
    pub fn next_min_in_range(&mut self) -> Result<(), CursorError> {
        let mut found_null = false;
        let mut result = Err(CursorError::KeyNotFound);

        for idx in 0..self.min_max_ranges.len() {
            let range = self.min_max_ranges[idx].clone();

            // the last key read is already past this range
            if idx != 0
                && !range.flag.contains(RangeMark::NoMaxRange)
                && self.in_group()
                && self.compare_argument(&range.max_key) == Ordering::Greater
            {
                continue;
            }

            self.group_prefix.truncate(self.real_prefix_len);
            let (map, flag) = if range.flag.contains(RangeMark::NoMinRange) {
                (KeyPartMap::prefix(self.real_key_parts), ReadFlag::KeyExact)
            } else {
                self.group_prefix.extend_from_slice(&range.min_key);
                let flag = if range.flag.intersects(RangeMark::EqRange | RangeMark::NullRange) {
                    ReadFlag::KeyExact
                } else if range.flag.contains(RangeMark::NearMin) {
                    ReadFlag::AfterKey
                } else {
                    ReadFlag::KeyOrNext
                };

                (KeyPartMap::through(self.real_key_parts), flag)
            };

            result = self.read_map(map, flag);
            if let Err(err) = result {
                if err.is_recoverable()
                    && range.flag.intersects(RangeMark::EqRange | RangeMark::NullRange)
                {
                    continue;
                }
                // later ranges start even further right
                break;
            }

            if range.flag.contains(RangeMark::EqRange) {
                break;
            }
            if range.flag.contains(RangeMark::NullRange) {
                self.tmp_record.clone_from(&self.record);
                found_null = true;
                result = Err(CursorError::KeyNotFound);
                continue;
            }
            if !self.in_group() {
                result = Err(CursorError::KeyNotFound);
                continue;
            }
            if !range.flag.contains(RangeMark::NoMaxRange)
                && !self.within_max(&range.max_key, range.flag.contains(RangeMark::NearMax))
            {
                result = Err(CursorError::KeyNotFound);
                continue;
            }

            break;
        }

        match result {
            Err(err) if found_null && err.is_recoverable() => {
                self.record.clone_from(&self.tmp_record);
                Ok(())
            }
            other => other,
        }
    }

    /// Search the MIN/MAX ranges right to left for the last in-group key.
    pub fn next_max_in_range(&mut self) -> Result<(), CursorError> {
        let count = self.min_max_ranges.len();

        for idx in (0..count).rev() {
            let range = self.min_max_ranges[idx].clone();

            // the last key read is already before this range
            if idx + 1 != count
                && !range.flag.contains(RangeMark::NoMinRange)
                && self.in_group()
                && self.compare_argument(&range.min_key) == Ordering::Less
            {
                continue;
            }

            self.group_prefix.truncate(self.real_prefix_len);
            let (map, flag) = if range.flag.contains(RangeMark::NoMaxRange) {
                (KeyPartMap::prefix(self.real_key_parts), ReadFlag::PrefixLast)
            } else {
                self.group_prefix.extend_from_slice(&range.max_key);
                let flag = if range.flag.contains(RangeMark::EqRange) {
                    ReadFlag::KeyExact
                } else if range.flag.contains(RangeMark::NearMax) {
                    ReadFlag::BeforeKey
                } else {
                    ReadFlag::PrefixLastOrPrev
                };

                (KeyPartMap::through(self.real_key_parts), flag)
            };

            match self.read_map(map, flag) {
                Ok(()) => {}
                Err(err) if err.is_recoverable() && range.flag.contains(RangeMark::EqRange) => {
                    continue;
                }
                Err(err) => return Err(err),
            }

            if range.flag.contains(RangeMark::EqRange) {
                return Ok(());
            }
            if !self.in_group() {
                continue;
            }
            if !range.flag.contains(RangeMark::NoMinRange)
                && !self.within_min(&range.min_key, range.flag.contains(RangeMark::NearMin))
            {
                continue;
            }

            return Ok(());
        }

        Err(CursorError::KeyNotFound)
    }

    ///
    /// INTERNALS
    ///

    fn update_key_stat(&mut self) {
        let Some(part) = self.min_max_arg_part.and_then(|part| self.key.part(part)) else {
            return;
        };
        let arg_len = part.store_length();

        let bounded = if self.min_max_ranges.is_empty() {
            // MIN over a nullable argument seeks past the NULL run
            self.have_min && part.is_nullable()
        } else {
            let last_has_min = self
                .min_max_ranges
                .last()
                .is_some_and(|r| !r.flag.contains(RangeMark::NoMinRange));
            let first_has_max = self
                .min_max_ranges
                .first()
                .is_some_and(|r| !r.flag.contains(RangeMark::NoMaxRange));

            (self.have_min && last_has_min) || (self.have_max && first_has_max)
        };

        if bounded {
            self.max_used_key_length += arg_len;
            self.used_key_parts += 1;
        }
    }

    fn finish(&mut self) -> Result<(), InternalError> {
        self.state = ScanState::AtEof;
        self.span = None;
        self.cursor.end_index_scan()?;

        Ok(())
    }

    fn note_probe(&mut self, op: ProbeKind) {
        record(MetricsEvent::CursorProbe { op });
        if let Some(span) = &mut self.span {
            span.add_probe();
        }
    }

    // Read with the current group prefix buffer as the search key.
    fn read_map(&mut self, map: KeyPartMap, flag: ReadFlag) -> Result<(), CursorError> {
        self.note_probe(ProbeKind::ReadMap);
        self.cursor
            .index_read_map(&mut self.record, &self.group_prefix, map, flag)
    }

    fn in_group(&self) -> bool {
        self.key
            .compare_prefix(&self.record, &self.group_prefix, self.real_prefix_len)
            == Ordering::Equal
    }

    fn is_null_argument(&self, part: usize) -> bool {
        self.key
            .part(part)
            .is_some_and(|p| p.is_null_image(self.key.part_image(&self.record, part)))
    }

    fn min_max_image(&self) -> Option<Vec<u8>> {
        self.min_max_arg_part
            .map(|part| self.key.part_image(&self.record, part).to_vec())
    }

    // Current record's MIN/MAX argument against a bound image.
    fn compare_argument(&self, bound: &[u8]) -> Ordering {
        let Some(part) = self.min_max_arg_part else {
            return Ordering::Equal;
        };

        self.key.part(part).map_or(Ordering::Equal, |p| {
            p.compare(self.key.part_image(&self.record, part), bound)
        })
    }

    fn within_max(&self, max_key: &[u8], near: bool) -> bool {
        match self.compare_argument(max_key) {
            Ordering::Less => true,
            Ordering::Equal => !near,
            Ordering::Greater => false,
        }
    }

    fn within_min(&self, min_key: &[u8], near: bool) -> bool {
        match self.compare_argument(min_key) {
            Ordering::Greater => true,
            Ordering::Equal => !near,
            Ordering::Less => false,
        }
    }
}

// Intervals on the MIN/MAX argument, reached through the root's suffix chain.
fn collect_min_max_ranges(arena: &RangeArena, root: NodeId, arg_part: usize) -> Vec<QuickRange> {
    let mut tree = Some(root);
    while let Some(id) = tree {
        if usize::from(arena[id].range.part) == arg_part {
            break;
        }
        tree = arena[id].next_key_part;
    }

    tree.map(|tree| arena.ranges(tree).filter_map(min_max_range).collect())
        .unwrap_or_default()
}

fn min_max_range(range: &KeyRange) -> Option<QuickRange> {
    if range.is_full() {
        return None;
    }

    let mut flag = range.min_flag | range.max_flag;
    if !flag.intersects(UNBOUNDED) {
        if range.field.is_null_image(&range.min_value) && range.field.is_null_image(&range.max_value)
        {
            flag.insert(RangeMark::NullRange);
        } else if range.min_value == range.max_value {
            flag.insert(RangeMark::EqRange);
        }
    }

    let map = KeyPartMap::through(usize::from(range.part));

    Some(QuickRange::new(
        range.min_value.to_vec(),
        map,
        range.max_value.to_vec(),
        map,
        flag,
    ))
}

fn head(bytes: &[u8], len: usize) -> &[u8] {
    &bytes[..len.min(bytes.len())]
}
