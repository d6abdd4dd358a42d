use crate::{
    config::RangeConfig,
    key::KeyPart,
    range::{
        KeyPartPredicate, KeyTree, NodeId, RangeArena, RangeFlag, RangeMark,
        invariants::{check_disjoint, check_tree},
    },
    test_support::{above, below, bounded, bounds, closed, int, int_key, single, union_of},
};
use enumflags2::make_bitflags;

fn root_of(tree: &KeyTree) -> NodeId {
    tree.root().expect("expected a tree")
}

// `a BETWEEN lo AND hi AND b = value` on a two-part key.
fn prefix_with_suffix(arena: &mut RangeArena, (lo, hi): (i64, i64), value: i64) -> KeyTree {
    let key = int_key(2);
    let field = KeyPart::int64();
    let a = arena
        .leaf(&key, KeyPartPredicate::between(0, &field, int(lo), int(hi)))
        .expect("valid predicate");
    let b = arena
        .leaf(&key, KeyPartPredicate::eq(1, &field, int(value)))
        .expect("valid predicate");

    arena.key_and(a, b).expect("under the cap")
}

#[test]
fn or_merges_overlapping_intervals() {
    let mut arena = RangeArena::new(RangeConfig::default());
    let tree = union_of(&mut arena, &[(5, 15), (10, 20)]);

    assert_eq!(bounds(&arena, root_of(&tree)), vec![(Some(5), Some(20))]);
}

#[test]
fn or_keeps_disjoint_intervals_in_order() {
    let mut arena = RangeArena::new(RangeConfig::default());
    let tree = union_of(&mut arena, &[(20, 25), (5, 10), (40, 41)]);
    let root = root_of(&tree);

    assert_eq!(
        bounds(&arena, root),
        vec![(Some(5), Some(10)), (Some(20), Some(25)), (Some(40), Some(41))]
    );
    check_tree(&arena, root).expect("valid tree");
    check_disjoint(&arena, root).expect("disjoint");
}

#[test]
fn or_swallows_a_run_of_covered_intervals() {
    let mut arena = RangeArena::new(RangeConfig::default());
    let tree = union_of(&mut arena, &[(1, 2), (4, 5), (7, 8), (12, 13), (0, 10)]);
    let root = root_of(&tree);

    assert_eq!(
        bounds(&arena, root),
        vec![(Some(0), Some(10)), (Some(12), Some(13))]
    );
    assert_eq!(arena.node(root).elements(), 2);
    check_tree(&arena, root).expect("valid tree");
}

#[test]
fn or_of_complementary_halves_is_full() {
    let mut arena = RangeArena::new(RangeConfig::default());
    let lower = single(&mut arena, below(0, 5, make_bitflags!(RangeMark::{NearMax})));
    let upper = single(&mut arena, above(0, 5, RangeFlag::empty()));

    assert_eq!(arena.key_or(lower, upper), Ok(KeyTree::Full));
}

#[test]
fn or_joins_adjacent_open_and_closed_bounds() {
    let mut arena = RangeArena::new(RangeConfig::default());
    let left = single(
        &mut arena,
        bounded(0, 1, 5, RangeFlag::empty(), make_bitflags!(RangeMark::{NearMax})),
    );
    let right = single(&mut arena, closed(0, 5, 9));

    let tree = arena.key_or(left, right).expect("under the cap");

    assert_eq!(bounds(&arena, root_of(&tree)), vec![(Some(1), Some(9))]);
}

#[test]
fn or_leaves_a_gap_at_an_excluded_point() {
    let mut arena = RangeArena::new(RangeConfig::default());
    let lower = single(&mut arena, below(0, 3, make_bitflags!(RangeMark::{NearMax})));
    let upper = single(&mut arena, above(0, 3, make_bitflags!(RangeMark::{NearMin})));

    let tree = arena.key_or(lower, upper).expect("under the cap");

    assert_eq!(
        bounds(&arena, root_of(&tree)),
        vec![(None, Some(3)), (Some(3), None)]
    );
}

#[test]
fn or_across_key_parts_is_full() {
    let mut arena = RangeArena::new(RangeConfig::default());
    let a = single(&mut arena, closed(0, 1, 2));
    let b = single(&mut arena, closed(1, 1, 2));

    assert_eq!(arena.key_or(a, b), Ok(KeyTree::Full));
}

#[test]
fn empty_and_full_identities() {
    let mut arena = RangeArena::new(RangeConfig::default());

    let t = single(&mut arena, closed(0, 1, 2));
    let root = root_of(&t);
    assert_eq!(arena.key_or(KeyTree::Empty, t), Ok(KeyTree::Root(root)));

    let t = KeyTree::Root(root);
    assert_eq!(arena.key_and(KeyTree::Full, t), Ok(KeyTree::Root(root)));

    let t = KeyTree::Root(root);
    assert_eq!(arena.key_or(t, KeyTree::Full), Ok(KeyTree::Full));
    assert_eq!(arena.node(root).use_count(), 0);

    let t = single(&mut arena, closed(0, 1, 2));
    let root = root_of(&t);
    assert_eq!(arena.key_and(t, KeyTree::Empty), Ok(KeyTree::Empty));
    assert_eq!(arena.node(root).use_count(), 0);
}

#[test]
fn and_intersects_interval_lists() {
    let mut arena = RangeArena::new(RangeConfig::default());
    let a = union_of(&mut arena, &[(1, 10), (20, 30)]);
    let b = union_of(&mut arena, &[(5, 25)]);

    let tree = arena.key_and(a, b).expect("under the cap");
    let root = root_of(&tree);

    assert_eq!(
        bounds(&arena, root),
        vec![(Some(5), Some(10)), (Some(20), Some(25))]
    );
    check_tree(&arena, root).expect("valid tree");
}

#[test]
fn and_of_disjoint_intervals_is_empty() {
    let mut arena = RangeArena::new(RangeConfig::default());
    let a = union_of(&mut arena, &[(1, 4)]);
    let b = union_of(&mut arena, &[(5, 9)]);

    assert_eq!(arena.key_and(a, b), Ok(KeyTree::Empty));
}

#[test]
fn and_across_parts_hangs_the_later_tree_under_each_interval() {
    let mut arena = RangeArena::new(RangeConfig::default());
    let a = union_of(&mut arena, &[(1, 1), (3, 3)]);
    let b = single(&mut arena, closed(1, 5, 9));
    let b_root = root_of(&b);

    let tree = arena.key_and(a, b).expect("under the cap");
    let root = root_of(&tree);

    let suffixes: Vec<_> = arena
        .iter(root)
        .map(|id| arena.node(id).next_key_part())
        .collect();
    assert_eq!(suffixes, vec![Some(b_root), Some(b_root)]);
    assert_eq!(arena.node(b_root).use_count(), 2);
    assert_eq!(bounds(&arena, b_root), vec![(Some(5), Some(9))]);
}

#[test]
fn and_drops_intervals_whose_suffix_becomes_empty() {
    let mut arena = RangeArena::new(RangeConfig::default());
    let t1 = prefix_with_suffix(&mut arena, (1, 1), 1);
    let t2 = prefix_with_suffix(&mut arena, (3, 3), 8);
    let tree = arena.key_or(t1, t2).expect("under the cap");
    let filter = single(&mut arena, closed(1, 5, 9));

    let tree = arena.key_and(tree, filter).expect("under the cap");
    let root = root_of(&tree);

    assert_eq!(bounds(&arena, root), vec![(Some(3), Some(3))]);
    let suffix = arena.node(root).next_key_part().expect("suffix kept");
    assert_eq!(bounds(&arena, suffix), vec![(Some(8), Some(8))]);
    check_tree(&arena, root).expect("valid tree");
}

#[test]
fn or_splits_overlap_with_different_suffixes() {
    let mut arena = RangeArena::new(RangeConfig::default());
    let t1 = prefix_with_suffix(&mut arena, (1, 10), 1);
    let t2 = prefix_with_suffix(&mut arena, (5, 20), 2);

    let tree = arena.key_or(t1, t2).expect("under the cap");
    let root = root_of(&tree);
    check_tree(&arena, root).expect("valid tree");
    check_disjoint(&arena, root).expect("disjoint");

    assert_eq!(
        bounds(&arena, root),
        vec![(Some(1), Some(5)), (Some(5), Some(10)), (Some(10), Some(20))]
    );
    let flags: Vec<_> = arena
        .ranges(root)
        .map(|r| (r.min_flag(), r.max_flag()))
        .collect();
    assert_eq!(
        flags,
        vec![
            (RangeFlag::empty(), make_bitflags!(RangeMark::{NearMax})),
            (RangeFlag::empty(), RangeFlag::empty()),
            (make_bitflags!(RangeMark::{NearMin}), RangeFlag::empty()),
        ]
    );

    let suffixes: Vec<_> = arena
        .iter(root)
        .map(|id| bounds(&arena, arena.node(id).next_key_part().expect("suffix")))
        .collect();
    assert_eq!(
        suffixes,
        vec![
            vec![(Some(1), Some(1))],
            vec![(Some(1), Some(1)), (Some(2), Some(2))],
            vec![(Some(2), Some(2))],
        ]
    );
}

#[test]
fn or_with_identical_suffix_merges_across_parts() {
    let mut arena = RangeArena::new(RangeConfig::default());
    let t1 = prefix_with_suffix(&mut arena, (1, 10), 4);
    let t2 = prefix_with_suffix(&mut arena, (5, 20), 4);

    let tree = arena.key_or(t1, t2).expect("under the cap");
    let root = root_of(&tree);

    assert_eq!(bounds(&arena, root), vec![(Some(1), Some(20))]);
    let suffix = arena.node(root).next_key_part().expect("suffix");
    assert_eq!(bounds(&arena, suffix), vec![(Some(4), Some(4))]);
}
