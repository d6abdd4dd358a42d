//! Shared fixtures for unit tests: key layouts, image builders, and an
//! in-memory sorted index behind `StorageCursor`.

mod memory;

pub(crate) use memory::MemoryIndex;

use crate::{
    config::RangeConfig,
    key::{KeyDescriptor, KeyImage, KeyPart, KeyValue},
    range::{KeyRange, KeyTree, NodeId, RangeArena, RangeFlag, RangeMark},
};
use enumflags2::make_bitflags;

pub(crate) fn int_key(parts: usize) -> KeyDescriptor {
    KeyDescriptor::try_new(vec![KeyPart::int64(); parts], false, &RangeConfig::default())
        .expect("fixture key should validate")
}

pub(crate) fn unique_int_key(parts: usize) -> KeyDescriptor {
    KeyDescriptor::try_new(vec![KeyPart::int64(); parts], true, &RangeConfig::default())
        .expect("fixture key should validate")
}

/// `(g int64, v int64 NULL)`
pub(crate) fn group_key_nullable() -> KeyDescriptor {
    KeyDescriptor::try_new(
        vec![KeyPart::int64(), KeyPart::int64().nullable()],
        false,
        &RangeConfig::default(),
    )
    .expect("fixture key should validate")
}

pub(crate) fn int(value: i64) -> KeyImage {
    KeyPart::int64().encode_i64(value).expect("int64 encodes")
}

pub(crate) fn nint(value: Option<i64>) -> KeyImage {
    let part = KeyPart::int64().nullable();

    match value {
        Some(v) => part.encode_i64(v),
        None => part.encode_null(),
    }
    .expect("nullable int64 encodes")
}

/// Decode an int64 image, nullable or not; `None` for a NULL image.
pub(crate) fn decode_int(image: &[u8]) -> Option<i64> {
    if image.len() == 9 && image[0] != 0 {
        return None;
    }
    let bytes: [u8; 8] = image[image.len() - 8..]
        .try_into()
        .expect("int64 image has eight data bytes");

    Some((u64::from_be_bytes(bytes) ^ (1 << 63)).cast_signed())
}

/// Pack one index row from per-part values.
pub(crate) fn row(key: &KeyDescriptor, values: &[Option<i64>]) -> Vec<u8> {
    let values: Vec<KeyValue<'_>> = values
        .iter()
        .map(|v| v.map_or(KeyValue::Null, KeyValue::Int))
        .collect();

    key.pack(&values).expect("fixture row packs")
}

/// Closed int64 interval on `part`.
pub(crate) fn closed(part: u8, min: i64, max: i64) -> KeyRange {
    KeyRange::new(
        KeyPart::int64(),
        part,
        int(min),
        int(max),
        RangeFlag::empty(),
        RangeFlag::empty(),
        false,
    )
}

pub(crate) fn bounded(part: u8, min: i64, max: i64, min_flag: RangeFlag, max_flag: RangeFlag) -> KeyRange {
    KeyRange::new(KeyPart::int64(), part, int(min), int(max), min_flag, max_flag, false)
}

pub(crate) fn below(part: u8, max: i64, max_flag: RangeFlag) -> KeyRange {
    KeyRange::new(
        KeyPart::int64(),
        part,
        KeyImage::empty(),
        int(max),
        make_bitflags!(RangeMark::{NoMinRange}),
        max_flag,
        false,
    )
}

pub(crate) fn above(part: u8, min: i64, min_flag: RangeFlag) -> KeyRange {
    KeyRange::new(
        KeyPart::int64(),
        part,
        int(min),
        KeyImage::empty(),
        min_flag,
        make_bitflags!(RangeMark::{NoMaxRange}),
        false,
    )
}

/// One-interval tree handle.
pub(crate) fn single(arena: &mut RangeArena, range: KeyRange) -> KeyTree {
    KeyTree::Root(arena.new_tree(range, None))
}

/// Tree built by OR-ing closed intervals on part 0.
pub(crate) fn union_of(arena: &mut RangeArena, intervals: &[(i64, i64)]) -> KeyTree {
    intervals.iter().fold(KeyTree::Empty, |acc, (min, max)| {
        let leaf = single(arena, closed(0, *min, *max));
        arena.key_or(acc, leaf).expect("union stays under the node cap")
    })
}

/// Bounds of every interval in list order; unbounded ends read as `None`.
pub(crate) fn bounds(arena: &RangeArena, root: NodeId) -> Vec<(Option<i64>, Option<i64>)> {
    arena
        .ranges(root)
        .map(|range| {
            let min = (!range.min_flag().contains(RangeMark::NoMinRange))
                .then(|| decode_int(range.min_value()))
                .flatten();
            let max = (!range.max_flag().contains(RangeMark::NoMaxRange))
                .then(|| decode_int(range.max_value()))
                .flatten();

            (min, max)
        })
        .collect()
}
