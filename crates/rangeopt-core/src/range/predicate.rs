//! Module: range::predicate
//! Responsibility: turn one comparison on one key part into a leaf tree.
//! Does not own: combining leaves (range::combine).

use crate::{
    key::{KeyDescriptor, KeyImage, KeyPart},
    range::{KeyRange, KeyTree, RangeArena, RangeError, RangeFlag, RangeMark},
};
use enumflags2::make_bitflags;
use std::cmp::Ordering;

///
/// KeyPartPredicate
///
/// One analyzer tuple `(part, min, max, min_flag, max_flag, maybe_null)`
/// restricting a single key part. Constructors take encoded images; an
/// unbounded side carries an empty image.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyPartPredicate {
    part: usize,
    min_value: KeyImage,
    max_value: KeyImage,
    min_flag: RangeFlag,
    max_flag: RangeFlag,
    maybe_null: bool,
    impossible: bool,
}

impl KeyPartPredicate {
    #[must_use]
    pub const fn new(
        part: usize,
        min_value: KeyImage,
        max_value: KeyImage,
        min_flag: RangeFlag,
        max_flag: RangeFlag,
        maybe_null: bool,
    ) -> Self {
        Self {
            part,
            min_value,
            max_value,
            min_flag,
            max_flag,
            maybe_null,
            impossible: false,
        }
    }

    /// `part = value`
    #[must_use]
    pub fn eq(part: usize, field: &KeyPart, value: KeyImage) -> Self {
        Self::new(
            part,
            value.clone(),
            value,
            RangeFlag::empty(),
            RangeFlag::empty(),
            field.is_nullable(),
        )
    }

    /// `part < value`; NULLs are excluded on a nullable part.
    #[must_use]
    pub fn lt(part: usize, field: &KeyPart, value: KeyImage) -> Self {
        let (min_value, min_flag) = lower_without_nulls(field);

        Self::new(
            part,
            min_value,
            value,
            min_flag,
            make_bitflags!(RangeMark::{NearMax}),
            field.is_nullable(),
        )
    }

    /// `part <= value`; NULLs are excluded on a nullable part.
    #[must_use]
    pub fn le(part: usize, field: &KeyPart, value: KeyImage) -> Self {
        let (min_value, min_flag) = lower_without_nulls(field);

        Self::new(
            part,
            min_value,
            value,
            min_flag,
            RangeFlag::empty(),
            field.is_nullable(),
        )
    }

    /// `part > value`
    #[must_use]
    pub fn gt(part: usize, field: &KeyPart, value: KeyImage) -> Self {
        Self::new(
            part,
            value,
            KeyImage::empty(),
            make_bitflags!(RangeMark::{NearMin}),
            make_bitflags!(RangeMark::{NoMaxRange}),
            field.is_nullable(),
        )
    }

    /// `part >= value`
    #[must_use]
    pub fn ge(part: usize, field: &KeyPart, value: KeyImage) -> Self {
        Self::new(
            part,
            value,
            KeyImage::empty(),
            RangeFlag::empty(),
            make_bitflags!(RangeMark::{NoMaxRange}),
            field.is_nullable(),
        )
    }

    /// `part BETWEEN min AND max`, both ends closed.
    #[must_use]
    pub fn between(part: usize, field: &KeyPart, min: KeyImage, max: KeyImage) -> Self {
        Self::new(
            part,
            min,
            max,
            RangeFlag::empty(),
            RangeFlag::empty(),
            field.is_nullable(),
        )
    }

    /// `part IS NULL`; never true on a non-nullable part.
    #[must_use]
    pub fn is_null(part: usize, field: &KeyPart) -> Self {
        let image = field.null_image();
        let mut predicate = Self::new(
            part,
            image.clone(),
            image,
            RangeFlag::empty(),
            RangeFlag::empty(),
            true,
        );
        predicate.impossible = !field.is_nullable();

        predicate
    }

    /// `part IS NOT NULL`; unconstrained on a non-nullable part.
    #[must_use]
    pub fn is_not_null(part: usize, field: &KeyPart) -> Self {
        let (min_value, min_flag) = lower_without_nulls(field);

        Self::new(
            part,
            min_value,
            KeyImage::empty(),
            min_flag,
            make_bitflags!(RangeMark::{NoMaxRange}),
            field.is_nullable(),
        )
    }

    #[must_use]
    pub const fn part(&self) -> usize {
        self.part
    }
}

// Lower bound of a NULL-rejecting comparison: just above NULL when nullable.
fn lower_without_nulls(field: &KeyPart) -> (KeyImage, RangeFlag) {
    if field.is_nullable() {
        (field.null_image(), make_bitflags!(RangeMark::{NearMin}))
    } else {
        (KeyImage::empty(), make_bitflags!(RangeMark::{NoMinRange}))
    }
}

impl RangeArena {
    /// Translate one predicate into a single-interval key tree.
    /// Unbounded tuples become `Full`, inverted or impossible ones `Empty`.
    pub fn leaf(
        &mut self,
        key: &KeyDescriptor,
        predicate: KeyPartPredicate,
    ) -> Result<KeyTree, RangeError> {
        let part = predicate.part;
        let (field, part_index) = key
            .part(part)
            .zip(u8::try_from(part).ok())
            .ok_or(RangeError::PartOutOfRange {
                part,
                parts: key.part_count(),
            })?;

        if predicate.impossible {
            return Ok(KeyTree::Empty);
        }
        if !predicate.min_flag.contains(RangeMark::NoMinRange) {
            check_image(&field, part, &predicate.min_value)?;
        }
        if !predicate.max_flag.contains(RangeMark::NoMaxRange) {
            check_image(&field, part, &predicate.max_value)?;
        }

        let range = KeyRange::new(
            field,
            part_index,
            predicate.min_value,
            predicate.max_value,
            predicate.min_flag,
            predicate.max_flag,
            predicate.maybe_null,
        );
        if range.is_full() {
            return Ok(KeyTree::Full);
        }
        if is_inverted(&range) {
            return Ok(KeyTree::Empty);
        }

        Ok(KeyTree::Root(self.new_tree(range, None)))
    }
}

fn check_image(field: &KeyPart, part: usize, image: &[u8]) -> Result<(), RangeError> {
    if image.len() == field.store_length() {
        Ok(())
    } else {
        Err(RangeError::ImageLength {
            part,
            expected: field.store_length(),
            found: image.len(),
        })
    }
}

// min above max, or an open bound on a single point
fn is_inverted(range: &KeyRange) -> bool {
    if range.min_flag.intersects(RangeMark::NoMinRange)
        || range.max_flag.intersects(RangeMark::NoMaxRange)
    {
        return false;
    }

    match range.field.compare(&range.min_value, &range.max_value) {
        Ordering::Greater => true,
        Ordering::Equal => range.min_flag.intersects(RangeMark::NearMin)
            || range.max_flag.intersects(RangeMark::NearMax),
        Ordering::Less => false,
    }
}
