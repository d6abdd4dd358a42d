//! Module: range::store
//! Responsibility: materialize tree bounds into packed seek-key bytes.
//! Does not own: range ordering or flattening policy (range::quick).

use crate::range::{KeyRange, NodeId, RangeArena, RangeFlag, RangeMark};

impl KeyRange {
    /// Append this range's min image unless the bound is unconstrained under
    /// `context`; returns the number of key parts written (0 or 1).
    pub fn store_min(&self, length: usize, out: &mut Vec<u8>, context: RangeFlag) -> usize {
        if self.min_flag.contains(RangeMark::NoMinRange)
            || context.intersects(RangeMark::NoMinRange | RangeMark::NearMin)
        {
            return 0;
        }
        self.store_image(self.min_value.as_bytes(), length, out);

        1
    }

    /// Append this range's max image unless the bound is unconstrained under
    /// `context`; returns the number of key parts written (0 or 1).
    pub fn store_max(&self, length: usize, out: &mut Vec<u8>, context: RangeFlag) -> usize {
        if self.max_flag.contains(RangeMark::NoMaxRange)
            || context.intersects(RangeMark::NoMaxRange | RangeMark::NearMax)
        {
            return 0;
        }
        self.store_image(self.max_value.as_bytes(), length, out);

        1
    }

    // NULL images are normalized to the marker byte plus zero fill.
    fn store_image(&self, image: &[u8], length: usize, out: &mut Vec<u8>) {
        let start = out.len();

        if self.field.is_null_image(image) {
            out.push(1);
        } else {
            out.extend_from_slice(&image[..image.len().min(length)]);
        }
        out.resize(start + length, 0);
    }
}

impl RangeArena {
    /// Pack the lowest bound of `root` and of every exactly-bound suffix
    /// part after it. `flag` accumulates the min flags seen on the path.
    pub fn store_min_key(&self, root: NodeId, out: &mut Vec<u8>, flag: &mut RangeFlag) -> usize {
        let node = &self[self.first(root)];
        let range = &node.range;

        let mut stored = range.store_min(range.field.store_length(), out, *flag);
        *flag |= range.min_flag;

        if let Some(suffix) = node.next_key_part
            && usize::from(self[suffix].range.part) == usize::from(range.part) + 1
            && !flag.intersects(RangeMark::NoMinRange | RangeMark::NearMin)
        {
            stored += self.store_min_key(suffix, out, flag);
        }

        stored
    }

    /// Pack the highest bound of `root` and of every exactly-bound suffix
    /// part after it. `flag` accumulates the max flags seen on the path.
    pub fn store_max_key(&self, root: NodeId, out: &mut Vec<u8>, flag: &mut RangeFlag) -> usize {
        let node = &self[self.last(root)];
        let range = &node.range;

        let mut stored = range.store_max(range.field.store_length(), out, *flag);
        *flag |= range.max_flag;

        if let Some(suffix) = node.next_key_part
            && usize::from(self[suffix].range.part) == usize::from(range.part) + 1
            && !flag.intersects(RangeMark::NoMaxRange | RangeMark::NearMax)
        {
            stored += self.store_max_key(suffix, out, flag);
        }

        stored
    }
}
