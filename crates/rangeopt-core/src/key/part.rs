//! Module: key::part
//! Responsibility: one key part's image layout, value encoding and order.

use crate::key::KeyImage;
use std::cmp::Ordering;
use thiserror::Error as ThisError;

/// Marker byte written in front of a nullable part that holds NULL.
const NULL_MARKER: u8 = 1;

///
/// KeyPartKind
///
/// Physical layout of one key part's data segment.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum KeyPartKind {
    /// Fixed-width data, compared byte-wise (big-endian, sign-biased ints).
    Fixed { len: u16 },

    /// Length-prefixed data, zero-padded to `max_len`.
    Variable { max_len: u16 },
}

///
/// KeyValue
///
/// Native value handed to the part encoder.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyValue<'a> {
    Null,
    Int(i64),
    Uint(u64),
    Bytes(&'a [u8]),
}

///
/// KeyEncodeError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum KeyEncodeError {
    #[error("NULL is not valid for a non-nullable key part")]
    NotNullable,

    #[error("value kind does not fit a {layout} key part")]
    KindMismatch { layout: &'static str },

    #[error("integer {value} does not fit in {width} bytes")]
    OutOfRange { value: i128, width: usize },

    #[error("fixed key part expects {expected} bytes, got {found}")]
    WidthMismatch { expected: usize, found: usize },

    #[error("variable key part holds at most {max} bytes, got {found}")]
    TooLong { max: usize, found: usize },
}

///
/// KeyPart
///
/// One column's slice of a composite index key.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct KeyPart {
    kind: KeyPartKind,
    nullable: bool,
}

impl KeyPart {
    #[must_use]
    pub const fn fixed(len: u16) -> Self {
        Self {
            kind: KeyPartKind::Fixed { len },
            nullable: false,
        }
    }

    #[must_use]
    pub const fn variable(max_len: u16) -> Self {
        Self {
            kind: KeyPartKind::Variable { max_len },
            nullable: false,
        }
    }

    /// Signed or unsigned 64-bit integer part.
    #[must_use]
    pub const fn int64() -> Self {
        Self::fixed(8)
    }

    /// Signed or unsigned 32-bit integer part.
    #[must_use]
    pub const fn int32() -> Self {
        Self::fixed(4)
    }

    #[must_use]
    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }

    #[must_use]
    pub const fn kind(&self) -> KeyPartKind {
        self.kind
    }

    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[must_use]
    pub const fn null_bytes(&self) -> usize {
        if self.nullable { 1 } else { 0 }
    }

    /// Width of the little-endian length prefix: 1 byte up to 255, else 2.
    #[must_use]
    pub const fn length_bytes(&self) -> usize {
        match self.kind {
            KeyPartKind::Fixed { .. } => 0,
            KeyPartKind::Variable { max_len } if max_len > 255 => 2,
            KeyPartKind::Variable { .. } => 1,
        }
    }

    #[must_use]
    pub const fn data_length(&self) -> usize {
        match self.kind {
            KeyPartKind::Fixed { len } => len as usize,
            KeyPartKind::Variable { max_len } => max_len as usize,
        }
    }

    /// Bytes this part occupies inside a packed key.
    #[must_use]
    pub const fn store_length(&self) -> usize {
        self.null_bytes() + self.length_bytes() + self.data_length()
    }

    /// Whether `image` carries the NULL marker for this part.
    #[must_use]
    pub fn is_null_image(&self, image: &[u8]) -> bool {
        self.nullable && image.first().is_some_and(|marker| *marker != 0)
    }

    /// NULL image for a nullable part; empty for a non-nullable one.
    #[must_use]
    pub fn null_image(&self) -> KeyImage {
        if !self.nullable {
            return KeyImage::empty();
        }

        let mut bytes = vec![0; self.store_length()];
        bytes[0] = NULL_MARKER;

        KeyImage::from(bytes)
    }

    /// Encode one native value into this part's key image.
    pub fn encode(&self, value: KeyValue<'_>) -> Result<KeyImage, KeyEncodeError> {
        let mut out = Vec::with_capacity(self.store_length());

        if self.nullable {
            out.push(0);
        }

        match (self.kind, value) {
            (_, KeyValue::Null) if !self.nullable => return Err(KeyEncodeError::NotNullable),
            (_, KeyValue::Null) => return Ok(self.null_image()),
            (KeyPartKind::Fixed { len }, KeyValue::Int(v)) => {
                out.extend_from_slice(&ordered_int_bytes(usize::from(len), v)?);
            }
            (KeyPartKind::Fixed { len }, KeyValue::Uint(v)) => {
                out.extend_from_slice(&unsigned_bytes(usize::from(len), v)?);
            }
            (KeyPartKind::Fixed { len }, KeyValue::Bytes(bytes)) => {
                let expected = usize::from(len);
                if bytes.len() != expected {
                    return Err(KeyEncodeError::WidthMismatch {
                        expected,
                        found: bytes.len(),
                    });
                }
                out.extend_from_slice(bytes);
            }
            (KeyPartKind::Variable { max_len }, KeyValue::Bytes(bytes)) => {
                let max = usize::from(max_len);
                let len = u16::try_from(bytes.len())
                    .ok()
                    .filter(|len| *len <= max_len)
                    .ok_or(KeyEncodeError::TooLong {
                        max,
                        found: bytes.len(),
                    })?;

                let prefix = len.to_le_bytes();
                out.extend_from_slice(&prefix[..self.length_bytes()]);
                out.extend_from_slice(bytes);
                out.resize(self.store_length(), 0);
            }
            (KeyPartKind::Variable { .. }, _) => {
                return Err(KeyEncodeError::KindMismatch {
                    layout: "variable",
                });
            }
        }

        Ok(KeyImage::from(out))
    }

    pub fn encode_i64(&self, value: i64) -> Result<KeyImage, KeyEncodeError> {
        self.encode(KeyValue::Int(value))
    }

    pub fn encode_i32(&self, value: i32) -> Result<KeyImage, KeyEncodeError> {
        self.encode(KeyValue::Int(i64::from(value)))
    }

    pub fn encode_u64(&self, value: u64) -> Result<KeyImage, KeyEncodeError> {
        self.encode(KeyValue::Uint(value))
    }

    pub fn encode_bytes(&self, bytes: &[u8]) -> Result<KeyImage, KeyEncodeError> {
        self.encode(KeyValue::Bytes(bytes))
    }

    pub fn encode_null(&self) -> Result<KeyImage, KeyEncodeError> {
        self.encode(KeyValue::Null)
    }

    /// Compare two images of this part with storage-comparator semantics:
    /// NULL sorts before every value, variable data ignores its padding.
    #[must_use]
    pub fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        let (a, b) = if self.nullable {
            match (self.is_null_image(a), self.is_null_image(b)) {
                (true, true) => return Ordering::Equal,
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                (false, false) => (tail(a, 1), tail(b, 1)),
            }
        } else {
            (a, b)
        };

        match self.kind {
            KeyPartKind::Fixed { .. } => a.cmp(b),
            KeyPartKind::Variable { .. } => self.variable_data(a).cmp(self.variable_data(b)),
        }
    }

    // Data bytes of a variable segment (NULL byte already stripped).
    fn variable_data<'a>(&self, segment: &'a [u8]) -> &'a [u8] {
        let length_bytes = self.length_bytes();
        let declared = match segment {
            [lo, hi, ..] if length_bytes == 2 => usize::from(u16::from_le_bytes([*lo, *hi])),
            [lo, ..] => usize::from(*lo),
            [] => 0,
        };
        let data = tail(segment, length_bytes);

        &data[..declared.min(data.len()).min(self.data_length())]
    }
}

fn tail(bytes: &[u8], skip: usize) -> &[u8] {
    &bytes[skip.min(bytes.len())..]
}

// Big-endian with the sign bit flipped, so byte order equals numeric order.
fn ordered_int_bytes(width: usize, value: i64) -> Result<Vec<u8>, KeyEncodeError> {
    let out_of_range = || KeyEncodeError::OutOfRange {
        value: i128::from(value),
        width,
    };

    let bytes = match width {
        1 => {
            let v = i8::try_from(value).map_err(|_| out_of_range())?;
            (v.cast_unsigned() ^ (1u8 << 7)).to_be_bytes().to_vec()
        }
        2 => {
            let v = i16::try_from(value).map_err(|_| out_of_range())?;
            (v.cast_unsigned() ^ (1u16 << 15)).to_be_bytes().to_vec()
        }
        4 => {
            let v = i32::try_from(value).map_err(|_| out_of_range())?;
            (v.cast_unsigned() ^ (1u32 << 31)).to_be_bytes().to_vec()
        }
        8 => (value.cast_unsigned() ^ (1u64 << 63)).to_be_bytes().to_vec(),
        _ => return Err(KeyEncodeError::KindMismatch { layout: "integer" }),
    };

    Ok(bytes)
}

fn unsigned_bytes(width: usize, value: u64) -> Result<Vec<u8>, KeyEncodeError> {
    let out_of_range = || KeyEncodeError::OutOfRange {
        value: i128::from(value),
        width,
    };

    let bytes = match width {
        1 => u8::try_from(value).map_err(|_| out_of_range())?.to_be_bytes().to_vec(),
        2 => u16::try_from(value)
            .map_err(|_| out_of_range())?
            .to_be_bytes()
            .to_vec(),
        4 => u32::try_from(value)
            .map_err(|_| out_of_range())?
            .to_be_bytes()
            .to_vec(),
        8 => value.to_be_bytes().to_vec(),
        _ => return Err(KeyEncodeError::KindMismatch { layout: "integer" }),
    };

    Ok(bytes)
}
