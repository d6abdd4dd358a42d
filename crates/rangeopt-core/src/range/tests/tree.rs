use crate::{
    config::RangeConfig,
    obs::{MetricsEvent, MetricsSink, with_metrics_sink},
    range::{
        NodeId, RangeArena, RangeError,
        invariants::{check_disjoint, check_tree},
    },
    test_support::{bounds, closed, decode_int, single},
};
use std::cell::RefCell;

#[derive(Default)]
struct CaptureSink {
    events: RefCell<Vec<MetricsEvent>>,
}

impl MetricsSink for CaptureSink {
    fn record(&self, event: MetricsEvent) {
        self.events.borrow_mut().push(event);
    }
}

// Disjoint closed intervals [10k, 10k+5] inserted in scrambled order.
fn scrambled(arena: &mut RangeArena, count: i64) -> NodeId {
    let mut root = None;
    for i in 0..count {
        let k = (i * 37) % count;
        root = Some(arena.insert_range(root, closed(0, k * 10, k * 10 + 5), None));
    }

    root.expect("at least one interval")
}

#[test]
fn insert_keeps_red_black_shape_and_ordered_list() {
    let mut arena = RangeArena::new(RangeConfig::default());
    let root = scrambled(&mut arena, 50);

    check_tree(&arena, root).expect("tree should be valid");
    check_disjoint(&arena, root).expect("intervals should be disjoint");

    let mins: Vec<i64> = bounds(&arena, root)
        .into_iter()
        .map(|(min, _)| min.expect("bounded"))
        .collect();
    let expected: Vec<i64> = (0..50).map(|k| k * 10).collect();
    assert_eq!(mins, expected);
    assert_eq!(arena.node(root).elements(), 50);
}

#[test]
fn find_range_returns_exact_or_preceding_node() {
    let mut arena = RangeArena::new(RangeConfig::default());
    let root = scrambled(&mut arena, 10);

    let exact = arena
        .find_range(root, &closed(0, 30, 30))
        .expect("min 30 exists");
    assert_eq!(bounds_of(&arena, exact), (30, 35));

    let before = arena
        .find_range(root, &closed(0, 47, 47))
        .expect("min 40 precedes 47");
    assert_eq!(bounds_of(&arena, before), (40, 45));

    assert!(arena.find_range(root, &closed(0, -1, -1)).is_none());
}

#[test]
fn first_and_last_follow_the_list_ends() {
    let mut arena = RangeArena::new(RangeConfig::default());
    let root = scrambled(&mut arena, 12);

    assert_eq!(bounds_of(&arena, arena.first(root)), (0, 5));
    assert_eq!(bounds_of(&arena, arena.last(root)), (110, 115));
    assert!(arena.node(arena.first(root)).prev().is_none());
    assert!(arena.node(arena.last(root)).next().is_none());
}

#[test]
fn tree_delete_rebalances_until_empty() {
    let mut arena = RangeArena::new(RangeConfig::default());
    let mut root = Some(scrambled(&mut arena, 40));

    // drop every other interval first, then the rest
    for pass in 0..2 {
        let victims: Vec<_> = arena
            .iter(root.expect("tree not yet empty"))
            .enumerate()
            .filter(|(i, _)| pass == 1 || i % 2 == 0)
            .map(|(_, id)| id)
            .collect();

        for id in victims {
            root = arena.tree_delete(root.expect("tree not yet empty"), id);
            if let Some(root) = root {
                check_tree(&arena, root).expect("tree should stay valid");
            }
        }
        if pass == 0 {
            let root = root.expect("half the tree remains");
            assert_eq!(arena.node(root).elements(), 20);
            assert!(bounds(&arena, root)
                .iter()
                .all(|(min, _)| min.expect("bounded") % 20 == 10));
        }
    }

    assert!(root.is_none());
}

#[test]
fn tree_delete_releases_the_suffix_handle() {
    let mut arena = RangeArena::new(RangeConfig::default());
    let suffix = arena.new_tree(closed(1, 1, 2), None);
    let root = arena.new_tree(closed(0, 0, 0), Some(suffix));
    let root = arena.insert_range(Some(root), closed(0, 5, 5), None);

    let doomed = arena.first(root);
    assert_eq!(arena.node(doomed).next_key_part(), Some(suffix));

    let root = arena.tree_delete(root, doomed).expect("one interval remains");

    assert_eq!(arena.node(suffix).use_count(), 0);
    assert_eq!(bounds(&arena, root), vec![(Some(5), Some(5))]);
    assert_eq!(arena.node(root).use_count(), 1);
}

#[test]
fn clone_tree_copies_nodes_and_shares_suffixes() {
    let mut arena = RangeArena::new(RangeConfig::default());
    let suffix = arena.new_tree(closed(1, 1, 2), None);
    let mut root = arena.new_tree(closed(0, 0, 0), Some(suffix));
    for k in 1..6 {
        root = arena.insert_range(Some(root), closed(0, k * 10, k * 10), None);
    }
    let sink = CaptureSink::default();

    let copy = with_metrics_sink(&sink, || arena.clone_tree(root)).expect("under the cap");

    check_tree(&arena, copy).expect("copy should be valid");
    assert_eq!(bounds(&arena, copy), bounds(&arena, root));
    assert!(arena.iter(copy).all(|id| !arena.iter(root).any(|orig| orig == id)));
    assert!(arena.eq_tree(Some(copy), Some(root)));
    assert_eq!(arena.node(copy).use_count(), 1);
    assert_eq!(arena.node(suffix).use_count(), 2);
    assert_eq!(arena.alloced_sel_args(), 6);
    assert_eq!(
        sink.events.borrow().as_slice(),
        &[MetricsEvent::TreeCloned { nodes: 6 }]
    );
}

#[test]
fn clone_tree_stops_at_the_node_cap() {
    let mut arena = RangeArena::new(RangeConfig::default().with_max_sel_args(3));
    let root = scrambled(&mut arena, 5);

    assert_eq!(
        arena.clone_tree(root),
        Err(RangeError::TooManyNodes { limit: 3 })
    );
}

#[test]
fn shared_input_is_never_mutated() {
    let mut arena = RangeArena::new(RangeConfig::default());
    let tree = single(&mut arena, closed(0, 1, 5));
    let shared = arena.share(&tree);
    let other = single(&mut arena, closed(0, 10, 12));

    let widened = arena.key_or(shared, other).expect("under the cap");

    let original = tree.root().expect("still a tree");
    assert_eq!(bounds(&arena, original), vec![(Some(1), Some(5))]);
    assert_eq!(arena.node(original).use_count(), 1);
    let widened = widened.root().expect("union is a tree");
    assert_eq!(
        bounds(&arena, widened),
        vec![(Some(1), Some(5)), (Some(10), Some(12))]
    );
    arena.release(tree);
    assert_eq!(arena.node(original).use_count(), 0);
}

fn bounds_of(arena: &RangeArena, id: NodeId) -> (i64, i64) {
    let range = arena.node(id).range();
    (
        decode_int(range.min_value()).expect("bounded"),
        decode_int(range.max_value()).expect("bounded"),
    )
}
