//! Structural checks for range trees, shared by unit and property tests.

use crate::range::{Color, KeyRange, NodeId, RangeArena, RangeMark};
use std::cmp::Ordering;

/// Red-black shape, parent links, element count, and list/descent agreement.
pub(crate) fn check_tree(arena: &RangeArena, root: NodeId) -> Result<(), String> {
    if arena[root].color != Color::Black {
        return Err("root is red".to_string());
    }
    if arena[root].parent.is_some() {
        return Err("root has a parent".to_string());
    }

    let mut descent = Vec::new();
    black_height(arena, root, &mut descent)?;

    let listed: Vec<NodeId> = arena.iter(root).collect();
    if listed != descent {
        return Err(format!(
            "list order {listed:?} differs from descent order {descent:?}"
        ));
    }
    if arena[root].elements != listed.len() {
        return Err(format!(
            "root counts {} elements, tree holds {}",
            arena[root].elements,
            listed.len()
        ));
    }

    for pair in listed.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if arena[a].next != Some(b) || arena[b].prev != Some(a) {
            return Err(format!("broken list link between {a:?} and {b:?}"));
        }
        if arena[a].range.cmp_min_to_min(&arena[b].range) > 0 {
            return Err(format!("list not ascending at {a:?}"));
        }
    }
    if let Some(first) = listed.first()
        && arena[*first].prev.is_some()
    {
        return Err("first node has a predecessor".to_string());
    }

    Ok(())
}

/// Consecutive intervals neither overlap nor share a point.
pub(crate) fn check_disjoint(arena: &RangeArena, root: NodeId) -> Result<(), String> {
    let listed: Vec<NodeId> = arena.iter(root).collect();

    for pair in listed.windows(2) {
        if arena[pair[0]].range.cmp_max_to_min(&arena[pair[1]].range) >= 0 {
            return Err(format!("{:?} overlaps {:?}", pair[0], pair[1]));
        }
    }

    Ok(())
}

fn black_height(arena: &RangeArena, id: NodeId, order: &mut Vec<NodeId>) -> Result<usize, String> {
    let node = &arena[id];

    for child in [node.left, node.right].into_iter().flatten() {
        if arena[child].parent != Some(id) {
            return Err(format!("{child:?} does not point back at {id:?}"));
        }
        if node.color == Color::Red && arena[child].color == Color::Red {
            return Err(format!("red {id:?} has red child {child:?}"));
        }
    }

    let left = match node.left {
        Some(left) => black_height(arena, left, order)?,
        None => 1,
    };
    order.push(id);
    let right = match node.right {
        Some(right) => black_height(arena, right, order)?,
        None => 1,
    };

    if left != right {
        return Err(format!("black height differs under {id:?}: {left} vs {right}"));
    }

    Ok(left + usize::from(node.color == Color::Black))
}

/// Whether `image` satisfies both bounds of `range`.
pub(crate) fn range_contains(range: &KeyRange, image: &[u8]) -> bool {
    let above_min = range.min_flag.contains(RangeMark::NoMinRange)
        || match range.field.compare(image, &range.min_value) {
            Ordering::Greater => true,
            Ordering::Equal => !range.min_flag.contains(RangeMark::NearMin),
            Ordering::Less => false,
        };
    let below_max = range.max_flag.contains(RangeMark::NoMaxRange)
        || match range.field.compare(image, &range.max_value) {
            Ordering::Less => true,
            Ordering::Equal => !range.max_flag.contains(RangeMark::NearMax),
            Ordering::Greater => false,
        };

    above_min && below_max
}

/// Whether any interval of the tree contains `image`.
pub(crate) fn tree_contains(arena: &RangeArena, root: NodeId, image: &[u8]) -> bool {
    arena.ranges(root).any(|range| range_contains(range, image))
}
