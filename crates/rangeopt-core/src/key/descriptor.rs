//! Module: key::descriptor
//! Responsibility: multi-part key layout, prefix lengths and packed compares.
//! Does not own: per-part encoding (key::part).

use crate::{
    config::{ConfigError, RangeConfig},
    key::{KeyEncodeError, KeyPart, KeyValue},
};
use std::cmp::Ordering;

///
/// KeyPartMap
///
/// Bitmap of the leading key parts present in a packed search key.
/// Bit `n` set means part `n` is included.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct KeyPartMap(u64);

impl KeyPartMap {
    pub const EMPTY: Self = Self(0);

    /// Map covering the first `parts` key parts.
    #[must_use]
    pub const fn prefix(parts: usize) -> Self {
        if parts >= 64 {
            Self(u64::MAX)
        } else {
            Self((1u64 << parts) - 1)
        }
    }

    /// Map covering key parts `0..=part`.
    #[must_use]
    pub const fn through(part: usize) -> Self {
        Self::prefix(part + 1)
    }

    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of contiguous leading parts covered.
    #[must_use]
    pub const fn part_count(self) -> usize {
        self.0.trailing_ones() as usize
    }

    #[must_use]
    pub const fn intersect(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }
}

///
/// KeyDescriptor
///
/// Ordered key parts of one index plus its uniqueness. Every packed key is
/// the concatenation of per-part images, each exactly `store_length` bytes.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyDescriptor {
    parts: Vec<KeyPart>,
    unique: bool,
}

impl KeyDescriptor {
    pub fn try_new(
        parts: Vec<KeyPart>,
        unique: bool,
        config: &RangeConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        if parts.is_empty() {
            return Err(ConfigError::EmptyKey);
        }
        if parts.len() > config.max_key_parts {
            return Err(ConfigError::TooManyParts {
                parts: parts.len(),
                max: config.max_key_parts,
            });
        }
        if let Some(part) = parts.iter().position(|p| p.data_length() == 0) {
            return Err(ConfigError::ZeroWidthPart { part });
        }

        let length = parts.iter().map(KeyPart::store_length).sum();
        if length > config.max_key_length {
            return Err(ConfigError::KeyTooLong {
                length,
                max: config.max_key_length,
            });
        }

        Ok(Self { parts, unique })
    }

    #[must_use]
    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    #[must_use]
    pub fn part(&self, part: usize) -> Option<KeyPart> {
        self.parts.get(part).copied()
    }

    #[must_use]
    pub const fn part_count(&self) -> usize {
        self.parts.len()
    }

    #[must_use]
    pub const fn is_unique(&self) -> bool {
        self.unique
    }

    /// Byte length of the first `parts` key parts.
    #[must_use]
    pub fn prefix_length(&self, parts: usize) -> usize {
        self.parts
            .iter()
            .take(parts)
            .map(KeyPart::store_length)
            .sum()
    }

    /// Byte offset of `part` inside a packed key.
    #[must_use]
    pub fn part_offset(&self, part: usize) -> usize {
        self.prefix_length(part)
    }

    #[must_use]
    pub fn key_length(&self) -> usize {
        self.prefix_length(self.parts.len())
    }

    #[must_use]
    pub fn length_for_map(&self, map: KeyPartMap) -> usize {
        self.prefix_length(map.part_count())
    }

    /// Slice one part's image out of a packed key.
    #[must_use]
    pub fn part_image<'a>(&self, key: &'a [u8], part: usize) -> &'a [u8] {
        let start = self.part_offset(part);
        let end = start + self.parts.get(part).map_or(0, KeyPart::store_length);

        clamp(key, start, end)
    }

    /// Compare the leading `length` bytes of two packed keys part by part.
    #[must_use]
    pub fn compare_prefix(&self, a: &[u8], b: &[u8], length: usize) -> Ordering {
        let mut offset = 0;

        for part in &self.parts {
            if offset >= length {
                break;
            }

            let end = offset + part.store_length();
            let ord = part.compare(clamp(a, offset, end), clamp(b, offset, end));
            if ord != Ordering::Equal {
                return ord;
            }

            offset = end;
        }

        Ordering::Equal
    }

    /// Whether any part image within the leading `length` bytes is NULL.
    #[must_use]
    pub fn has_null_part(&self, key: &[u8], length: usize) -> bool {
        let mut offset = 0;

        for part in &self.parts {
            if offset >= length {
                break;
            }
            if part.is_null_image(clamp(key, offset, offset + part.store_length())) {
                return true;
            }
            offset += part.store_length();
        }

        false
    }

    /// Pack leading key-part values into one key.
    pub fn pack(&self, values: &[KeyValue<'_>]) -> Result<Vec<u8>, KeyEncodeError> {
        let mut out = Vec::with_capacity(self.prefix_length(values.len()));

        for (part, value) in self.parts.iter().zip(values) {
            out.extend_from_slice(&part.encode(*value)?);
        }

        Ok(out)
    }
}

fn clamp(bytes: &[u8], start: usize, end: usize) -> &[u8] {
    let end = end.min(bytes.len());

    &bytes[start.min(end)..end]
}
