//! Module: scan
//! Responsibility: loose index scans that read one group prefix at a time
//! and answer MIN/MAX with a handful of cursor probes.
//! Does not own: range construction or storage layout.
//! Boundary: storage engines plug in through `StorageCursor`; fatal cursor
//! codes pass through unchanged.

mod cursor;
mod group;
mod prefix;


pub use cursor::{CursorError, ReadFlag, StorageCursor};
pub use group::{GroupMinMaxScanner, GroupMinMaxSpec, GroupRow, ScanState};
pub use prefix::PrefixRangeScan;
