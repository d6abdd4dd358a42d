//! Module: key::image
//! Responsibility: shared immutable key bytes.

use derive_more::Deref;
use std::rc::Rc;

///
/// KeyImage
///
/// Immutable encoded bytes for one key part, laid out at the part's full
/// store length (NULL marker, length prefix, zero-padded data).
/// Unbounded range ends carry an empty image.
///

#[derive(Clone, Debug, Default, Deref, Eq, Hash, PartialEq)]
pub struct KeyImage(Rc<[u8]>);

impl KeyImage {
    #[must_use]
    pub fn new(bytes: impl Into<Rc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for KeyImage {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for KeyImage {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}
