//! Module: range::flag
//! Responsibility: bound markers shared by range nodes and flattened ranges.
//! Does not own: bound comparison (range::node).

use enumflags2::{BitFlags, bitflags, make_bitflags};

///
/// RangeMark
///
/// One bound marker. Open/closed/unbounded marks describe one bound;
/// EQ/NULL/UNIQUE describe a whole flattened range.
///

#[bitflags]
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RangeMark {
    NoMinRange = 1,
    NoMaxRange = 1 << 1,
    NearMin = 1 << 2,
    NearMax = 1 << 3,
    UniqueRange = 1 << 4,
    EqRange = 1 << 5,
    NullRange = 1 << 6,
}

/// Set of [`RangeMark`]s carried by one bound or one flattened range.
pub type RangeFlag = BitFlags<RangeMark>;

/// Both unbounded marks; a node carrying them on its bounds is universal.
pub const UNBOUNDED: RangeFlag = make_bitflags!(RangeMark::{NoMinRange | NoMaxRange});

/// Both open-bound marks.
pub const NEAR: RangeFlag = make_bitflags!(RangeMark::{NearMin | NearMax});
