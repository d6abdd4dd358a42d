use crate::{
    key::{KeyDescriptor, KeyPartMap},
    scan::{CursorError, ReadFlag, StorageCursor},
};
use std::cmp::Ordering;

///
/// MemoryIndex
///
/// Sorted in-memory index keyed by packed rows. Counts every positioning
/// call and can fail a chosen call to exercise error paths. A failed read
/// leaves the caller's buffer untouched.
///

pub(crate) struct MemoryIndex {
    key: KeyDescriptor,
    rows: Vec<Vec<u8>>,
    pub(crate) first_calls: usize,
    pub(crate) last_calls: usize,
    pub(crate) read_calls: usize,
    pub(crate) scans_started: usize,
    pub(crate) scans_ended: usize,
    calls: usize,
    fail_at: Option<(usize, CursorError)>,
}

impl MemoryIndex {
    pub(crate) fn new(key: &KeyDescriptor, mut rows: Vec<Vec<u8>>) -> Self {
        let length = key.key_length();
        rows.sort_by(|a, b| key.compare_prefix(a, b, length));

        Self {
            key: key.clone(),
            rows,
            first_calls: 0,
            last_calls: 0,
            read_calls: 0,
            scans_started: 0,
            scans_ended: 0,
            calls: 0,
            fail_at: None,
        }
    }

    /// Fail the `call`-th positioning call (1-based, across first/last/read).
    pub(crate) const fn fail_call(mut self, call: usize, err: CursorError) -> Self {
        self.fail_at = Some((call, err));
        self
    }

    pub(crate) const fn probes(&self) -> usize {
        self.first_calls + self.last_calls + self.read_calls
    }

    fn tick(&mut self) -> Result<(), CursorError> {
        self.calls += 1;
        match self.fail_at {
            Some((call, err)) if call == self.calls => Err(err),
            _ => Ok(()),
        }
    }

    fn load(&self, buf: &mut Vec<u8>, index: Option<usize>, missing: CursorError) -> Result<(), CursorError> {
        let row = index.and_then(|i| self.rows.get(i)).ok_or(missing)?;
        buf.clone_from(row);

        Ok(())
    }
}

impl StorageCursor for MemoryIndex {
    fn start_index_scan(&mut self, _index: u32, _sorted: bool) -> Result<(), CursorError> {
        self.scans_started += 1;
        Ok(())
    }

    fn end_index_scan(&mut self) -> Result<(), CursorError> {
        self.scans_ended += 1;
        Ok(())
    }

    fn index_first(&mut self, buf: &mut Vec<u8>) -> Result<(), CursorError> {
        self.first_calls += 1;
        self.tick()?;

        self.load(buf, Some(0), CursorError::EndOfFile)
    }

    fn index_last(&mut self, buf: &mut Vec<u8>) -> Result<(), CursorError> {
        self.last_calls += 1;
        self.tick()?;

        self.load(buf, self.rows.len().checked_sub(1), CursorError::EndOfFile)
    }

    fn index_read_map(
        &mut self,
        buf: &mut Vec<u8>,
        key: &[u8],
        keypart_map: KeyPartMap,
        flag: ReadFlag,
    ) -> Result<(), CursorError> {
        self.read_calls += 1;
        self.tick()?;

        let length = self.key.length_for_map(keypart_map);
        let cmp = |row: &Vec<u8>| self.key.compare_prefix(row, key, length);
        let lower = self.rows.partition_point(|row| cmp(row) == Ordering::Less);
        let upper = self.rows.partition_point(|row| cmp(row) != Ordering::Greater);

        let index = match flag {
            ReadFlag::KeyExact => (lower < upper).then_some(lower),
            ReadFlag::KeyOrNext => Some(lower),
            ReadFlag::AfterKey => Some(upper),
            ReadFlag::BeforeKey => lower.checked_sub(1),
            ReadFlag::PrefixLast => (lower < upper).then(|| upper - 1),
            ReadFlag::PrefixLastOrPrev => upper.checked_sub(1),
        };

        self.load(buf, index, CursorError::KeyNotFound)
    }
}
