//! Core runtime for rangeopt: key layout, range trees and their AND/OR
//! algebra, seek-range flattening, and the loose index (group MIN/MAX) scan.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod config;
pub mod error;
pub mod key;
pub mod obs;
pub mod range;
pub mod scan;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, sinks, or cursor plumbing are re-exported here.
///

pub mod prelude {
    pub use crate::{
        config::RangeConfig,
        key::{KeyDescriptor, KeyImage, KeyPart, KeyPartMap, KeyValue},
        range::{KeyPartPredicate, KeyTree, QuickRange, QuickRanges, RangeArena, RangeSelection},
        scan::{GroupMinMaxScanner, GroupMinMaxSpec, GroupRow},
    };
}
