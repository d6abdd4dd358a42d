//! Module: scan::cursor
//! Responsibility: the ordered storage cursor contract and its errors.

use crate::key::KeyPartMap;
use thiserror::Error as ThisError;

///
/// CursorError
///
/// Storage cursor outcome other than success.
/// `KeyNotFound` and `EndOfFile` steer the scan to the next candidate; any
/// other code is fatal and surfaces unchanged.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, ThisError)]
pub enum CursorError {
    #[error("key not found")]
    KeyNotFound,

    #[error("end of index")]
    EndOfFile,

    #[error("storage error {code}")]
    Storage { code: i32 },
}

impl CursorError {
    #[must_use]
    pub const fn is_recoverable(self) -> bool {
        matches!(self, Self::KeyNotFound | Self::EndOfFile)
    }
}

///
/// ReadFlag
///
/// Positioning mode of `index_read_map`. The search key covers the parts in
/// the key part map; "prefix" below means a record's leading bytes over
/// those parts.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadFlag {
    /// First record whose prefix equals the key.
    KeyExact,

    /// First record whose prefix is greater than the key.
    AfterKey,

    /// First record whose prefix is greater than or equal to the key.
    KeyOrNext,

    /// Last record whose prefix is less than the key.
    BeforeKey,

    /// Last record whose prefix equals the key.
    PrefixLast,

    /// Last record whose prefix is less than or equal to the key.
    PrefixLastOrPrev,
}

///
/// StorageCursor
///
/// Synchronous index cursor supplied by a storage engine.
/// Successful reads leave the record's packed index key in `buf`.
///

pub trait StorageCursor {
    fn start_index_scan(&mut self, index: u32, sorted: bool) -> Result<(), CursorError>;

    fn end_index_scan(&mut self) -> Result<(), CursorError>;

    fn index_first(&mut self, buf: &mut Vec<u8>) -> Result<(), CursorError>;

    fn index_last(&mut self, buf: &mut Vec<u8>) -> Result<(), CursorError>;

    fn index_read_map(
        &mut self,
        buf: &mut Vec<u8>,
        key: &[u8],
        keypart_map: KeyPartMap,
        flag: ReadFlag,
    ) -> Result<(), CursorError>;
}
