//! Module: range
//! Responsibility: interval trees per key part, their AND/OR algebra, and
//! flattening into byte-ready seek ranges.
//! Does not own: predicate analysis or storage cursor access.
//! Boundary: the planner feeds `KeyPartPredicate` tuples in and takes
//! `QuickRanges` (or a full-scan fallback) out.

mod arena;
mod combine;
mod flag;
mod node;
mod predicate;
mod quick;
mod store;
mod tree;

#[cfg(test)]
pub(crate) mod invariants;
#[cfg(test)]
mod tests;

use thiserror::Error as ThisError;

pub use arena::{KeyTree, RangeArena};
pub use flag::{NEAR, RangeFlag, RangeMark, UNBOUNDED};
pub use node::{Color, KeyRange, KeyRangeNode, NodeId};
pub use predicate::KeyPartPredicate;
pub use quick::{QuickRange, QuickRanges, RangeSelection};

///
/// RangeError
///
/// Failure while building or flattening range trees.
/// `TooManyNodes` is the only expected runtime outcome; planners turn it
/// into a full-scan fallback.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, ThisError)]
pub enum RangeError {
    #[error("range analysis exceeded {limit} nodes")]
    TooManyNodes { limit: usize },

    #[error("key part {part} is outside the {parts}-part index key")]
    PartOutOfRange { part: usize, parts: usize },

    #[error("key part {part} image is {found} bytes, store length is {expected}")]
    ImageLength {
        part: usize,
        expected: usize,
        found: usize,
    },

    #[error("range tree starts at key part {part}; seek ranges need part 0")]
    LeadingPartMissing { part: usize },
}
