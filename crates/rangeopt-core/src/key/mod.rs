//! Module: key
//! Responsibility: index key layout, key-part image encoding, and part-aware comparison.
//! Does not own: range bounds, flattening, or cursor positioning.
//! Boundary: range and scan code pack and compare index keys through this module.

mod descriptor;
mod image;
mod part;


pub use descriptor::{KeyDescriptor, KeyPartMap};
pub use image::KeyImage;
pub use part::{KeyEncodeError, KeyPart, KeyPartKind, KeyValue};
