//! Module: range::node
//! Responsibility: single-key-part intervals, flag-aware bound comparison,
//! and the interval-level builder operations.
//! Does not own: tree linkage (range::tree) or tree-level AND/OR (range::combine).

use crate::{
    key::{KeyImage, KeyPart},
    range::{NEAR, RangeFlag, RangeMark, UNBOUNDED},
};
use enumflags2::make_bitflags;
use std::cmp::Ordering;

///
/// NodeId
///
/// Index of one node inside its statement's `RangeArena`.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) const fn index(self) -> usize {
        self.0
    }
}

///
/// Color
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Color {
    Red,
    Black,
}

///
/// KeyRange
///
/// One interval over a single key part: `min..max` plus bound flags.
/// Values are already-encoded key images; an unbounded end carries an
/// empty image together with `NO_MIN_RANGE` / `NO_MAX_RANGE`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyRange {
    pub(crate) field: KeyPart,
    pub(crate) part: u8,
    pub(crate) min_value: KeyImage,
    pub(crate) max_value: KeyImage,
    pub(crate) min_flag: RangeFlag,
    pub(crate) max_flag: RangeFlag,
    pub(crate) maybe_flag: bool,
}

impl KeyRange {
    #[must_use]
    pub const fn new(
        field: KeyPart,
        part: u8,
        min_value: KeyImage,
        max_value: KeyImage,
        min_flag: RangeFlag,
        max_flag: RangeFlag,
        maybe_flag: bool,
    ) -> Self {
        Self {
            field,
            part,
            min_value,
            max_value,
            min_flag,
            max_flag,
            maybe_flag,
        }
    }

    #[must_use]
    pub const fn field(&self) -> KeyPart {
        self.field
    }

    #[must_use]
    pub const fn part(&self) -> u8 {
        self.part
    }

    #[must_use]
    pub const fn min_value(&self) -> &KeyImage {
        &self.min_value
    }

    #[must_use]
    pub const fn max_value(&self) -> &KeyImage {
        &self.max_value
    }

    #[must_use]
    pub const fn min_flag(&self) -> RangeFlag {
        self.min_flag
    }

    #[must_use]
    pub const fn max_flag(&self) -> RangeFlag {
        self.max_flag
    }

    #[must_use]
    pub const fn maybe_flag(&self) -> bool {
        self.maybe_flag
    }

    /// Both ends unbounded: the interval constrains nothing.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.min_flag.contains(RangeMark::NoMinRange)
            && self.max_flag.contains(RangeMark::NoMaxRange)
    }

    ///
    /// COMPARISON
    ///

    #[must_use]
    pub fn cmp_min_to_min(&self, other: &Self) -> i8 {
        sel_cmp(
            &self.field,
            &self.min_value,
            &other.min_value,
            self.min_flag,
            other.min_flag,
        )
    }

    #[must_use]
    pub fn cmp_min_to_max(&self, other: &Self) -> i8 {
        sel_cmp(
            &self.field,
            &self.min_value,
            &other.max_value,
            self.min_flag,
            other.max_flag,
        )
    }

    #[must_use]
    pub fn cmp_max_to_max(&self, other: &Self) -> i8 {
        sel_cmp(
            &self.field,
            &self.max_value,
            &other.max_value,
            self.max_flag,
            other.max_flag,
        )
    }

    #[must_use]
    pub fn cmp_max_to_min(&self, other: &Self) -> i8 {
        sel_cmp(
            &self.field,
            &self.max_value,
            &other.min_value,
            self.max_flag,
            other.min_flag,
        )
    }

    /// Same key part with identical bounds.
    #[must_use]
    pub fn is_same(&self, other: &Self) -> bool {
        self.part == other.part
            && self.cmp_min_to_min(other) == 0
            && self.cmp_max_to_max(other) == 0
    }

    ///
    /// BUILDER
    ///

    /// Intersection: the tighter min and the tighter max.
    #[must_use]
    pub fn clone_and(&self, other: &Self) -> Self {
        let (min_value, min_flag) = if self.cmp_min_to_min(other) >= 0 {
            (self.min_value.clone(), self.min_flag)
        } else {
            (other.min_value.clone(), other.min_flag)
        };
        let (max_value, max_flag) = if self.cmp_max_to_max(other) <= 0 {
            (self.max_value.clone(), self.max_flag)
        } else {
            (other.max_value.clone(), other.max_flag)
        };

        Self::new(
            self.field,
            self.part,
            min_value,
            max_value,
            min_flag,
            max_flag,
            self.maybe_flag && other.maybe_flag,
        )
    }

    /// `[self.min, other.min)`, closing the new max when `other.min` is open.
    #[must_use]
    pub fn clone_first(&self, other: &Self) -> Self {
        Self::new(
            self.field,
            self.part,
            self.min_value.clone(),
            other.min_value.clone(),
            self.min_flag,
            upper_flag_below(other.min_flag),
            self.maybe_flag || other.maybe_flag,
        )
    }

    /// `[self.min, other.max]` with `other`'s max flag.
    #[must_use]
    pub fn clone_last(&self, other: &Self) -> Self {
        Self::new(
            self.field,
            self.part,
            self.min_value.clone(),
            other.max_value.clone(),
            self.min_flag,
            other.max_flag,
            self.maybe_flag || other.maybe_flag,
        )
    }

    /// Widen min to `other.min` when that is looser.
    /// Returns true when the interval became universal.
    pub fn copy_min(&mut self, other: &Self) -> bool {
        if self.cmp_min_to_min(other) > 0 {
            self.min_value = other.min_value.clone();
            self.min_flag = other.min_flag;
        }
        self.maybe_flag |= other.maybe_flag;

        self.is_full()
    }

    /// Widen max to `other.max` when that is looser.
    /// Returns true when the interval became universal.
    pub fn copy_max(&mut self, other: &Self) -> bool {
        if self.cmp_max_to_max(other) <= 0 {
            self.max_value = other.max_value.clone();
            self.max_flag = other.max_flag;
        }
        self.maybe_flag |= other.maybe_flag;

        self.is_full()
    }

    pub fn copy_min_to_min(&mut self, other: &Self) {
        self.min_value = other.min_value.clone();
        self.min_flag = other.min_flag;
    }

    /// New max sits just below `other.min`.
    pub fn copy_min_to_max(&mut self, other: &Self) {
        self.max_value = other.min_value.clone();
        self.max_flag = upper_flag_below(other.min_flag);
    }

    /// New min sits just above `other.max`.
    pub fn copy_max_to_min(&mut self, other: &Self) {
        self.min_value = other.max_value.clone();
        self.min_flag = if other.max_flag.contains(RangeMark::NearMax) {
            RangeFlag::empty()
        } else {
            make_bitflags!(RangeMark::{NearMin})
        };
    }
}

// An upper bound ending right before a lower bound: open iff the lower is closed.
fn upper_flag_below(min_flag: RangeFlag) -> RangeFlag {
    if min_flag.contains(RangeMark::NearMin) {
        RangeFlag::empty()
    } else {
        make_bitflags!(RangeMark::{NearMax})
    }
}

/// Flag-aware bound comparison.
///
/// Returns -2/2 when the bounds are adjacent (equal value, exactly one side
/// open), -1/1 for other orderings, and 0 for identical bounds.
pub(crate) fn sel_cmp(
    field: &KeyPart,
    a: &[u8],
    b: &[u8],
    a_flag: RangeFlag,
    b_flag: RangeFlag,
) -> i8 {
    // unbounded ends
    if a_flag.intersects(UNBOUNDED) {
        if a_flag & UNBOUNDED == b_flag & UNBOUNDED {
            return 0;
        }
        return if a_flag.contains(RangeMark::NoMinRange) {
            -1
        } else {
            1
        };
    }
    if b_flag.intersects(UNBOUNDED) {
        return if b_flag.contains(RangeMark::NoMinRange) {
            1
        } else {
            -1
        };
    }

    match field.compare(a, b) {
        Ordering::Less => return -1,
        Ordering::Greater => return 1,
        Ordering::Equal => {}
    }

    // equal values: open bounds decide
    if a_flag.intersects(NEAR) {
        if a_flag & NEAR == b_flag & NEAR {
            return 0;
        }
        if !b_flag.intersects(NEAR) {
            return if a_flag.contains(RangeMark::NearMin) {
                2
            } else {
                -2
            };
        }
        return if a_flag.contains(RangeMark::NearMin) {
            1
        } else {
            -1
        };
    }
    if b_flag.intersects(NEAR) {
        return if b_flag.contains(RangeMark::NearMin) {
            -2
        } else {
            2
        };
    }

    0
}

///
/// KeyRangeNode
///
/// Arena-resident tree node wrapping one `KeyRange`.
/// `left`/`right` own subtrees, `parent` is a back-reference only, and
/// `next`/`prev` thread every node in ascending min order.
/// `elements`, `use_count`, and `maybe_flag` are meaningful on the root.
///

#[derive(Clone, Debug)]
pub struct KeyRangeNode {
    pub(crate) range: KeyRange,
    pub(crate) next_key_part: Option<NodeId>,
    pub(crate) color: Color,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
    pub(crate) prev: Option<NodeId>,
    pub(crate) elements: usize,
    pub(crate) use_count: usize,
    pub(crate) maybe_flag: bool,
}

impl KeyRangeNode {
    /// Unlinked single-node tree.
    pub(crate) const fn detached(range: KeyRange, next_key_part: Option<NodeId>) -> Self {
        let maybe_flag = range.maybe_flag;

        Self {
            range,
            next_key_part,
            color: Color::Black,
            left: None,
            right: None,
            parent: None,
            next: None,
            prev: None,
            elements: 1,
            use_count: 0,
            maybe_flag,
        }
    }

    #[must_use]
    pub const fn range(&self) -> &KeyRange {
        &self.range
    }

    #[must_use]
    pub const fn next_key_part(&self) -> Option<NodeId> {
        self.next_key_part
    }

    #[must_use]
    pub const fn color(&self) -> Color {
        self.color
    }

    #[must_use]
    pub const fn left(&self) -> Option<NodeId> {
        self.left
    }

    #[must_use]
    pub const fn right(&self) -> Option<NodeId> {
        self.right
    }

    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub const fn next(&self) -> Option<NodeId> {
        self.next
    }

    #[must_use]
    pub const fn prev(&self) -> Option<NodeId> {
        self.prev
    }

    #[must_use]
    pub const fn elements(&self) -> usize {
        self.elements
    }

    #[must_use]
    pub const fn use_count(&self) -> usize {
        self.use_count
    }
}
