use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;

/// Walks the whole tree and panics on any broken invariant: parent links,
/// cached heights, AVL balance, strict composite order, size and the AVL
/// height bound.
pub(crate) fn validate_tree<V: Record>(t: &AvlTree<V>) {
    fn walk<V>(t: &AvlTree<V>, link: Link, parent: Link, order: &mut Vec<Link>) -> u32 {
        if link.is_null() {
            return 0;
        }
        assert_eq!(t.nodes.parent(link), parent, "parent link must point at the actual parent");

        let lh = walk(t, t.nodes.left(link), link, order);
        order.push(link);
        let rh = walk(t, t.nodes.right(link), link, order);

        assert!(lh.abs_diff(rh) <= 1, "unbalanced node (left={lh}, right={rh})");
        assert_eq!(
            t.nodes.height(link),
            1 + lh.max(rh),
            "stored node height must match children"
        );
        1 + lh.max(rh)
    }

    if !t.root.is_null() {
        assert!(t.nodes.parent(t.root).is_null(), "root must not have a parent");
    }

    let mut order = Vec::with_capacity(t.len());
    let height = walk(t, t.root, Link::NULL, &mut order);
    assert_eq!(height, t.height());

    for pair in order.windows(2) {
        let a = t.nodes.entry(pair[0]);
        let b = t.nodes.entry(pair[1]);
        assert_eq!(
            cmp_composite(a.key, a.payload.id(), b.key, b.payload.id()),
            Ordering::Less,
            "in-order traversal must be strictly increasing"
        );
    }

    assert_eq!(order.len(), t.len(), "reachable node count must match len");
    assert_eq!(t.nodes.live_count(), t.len(), "no leaked slots");

    let bound = 1.45 * ((t.len() + 2) as f64).log2();
    assert!(
        (height as f64) <= bound,
        "height {height} exceeds AVL bound for {} nodes",
        t.len()
    );
}

#[derive(Clone, Debug, PartialEq)]
struct Item {
    id: u8,
    value: u32,
}

impl Record for Item {
    type Id = u8;

    fn id(&self) -> &u8 {
        &self.id
    }
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 5)]
    Insert(
        #[proptest(strategy = "0i16..48")] i16,
        #[proptest(strategy = "0u8..3")] u8,
        u32,
    ),
    #[proptest(weight = 2)]
    Remove(#[proptest(strategy = "0i16..48")] i16),
    #[proptest(weight = 2)]
    RemoveEntry(
        #[proptest(strategy = "0i16..48")] i16,
        #[proptest(strategy = "0u8..3")] u8,
    ),
    Search(#[proptest(strategy = "0i16..48")] i16),
}

type Model = BTreeMap<(i16, u8), u32>;

fn model_matches(m: &Model, key: i16) -> Vec<(u8, u32)> {
    m.range((key, u8::MIN)..=(key, u8::MAX))
        .map(|(&(_, id), &value)| (id, value))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_with_model(ops in prop::collection::vec(any::<Op>(), 0..=400)) {
        let mut t: AvlTree<Item> = AvlTree::new();
        let mut m: Model = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, id, value) => {
                    let old_t = t.insert(f64::from(key), Item { id, value }).unwrap();
                    let old_m = m.insert((key, id), value);
                    prop_assert_eq!(old_t.map(|item| item.value), old_m);
                }
                Op::Remove(key) => {
                    let got = t.remove(f64::from(key));
                    match model_matches(&m, key).as_slice() {
                        [] => prop_assert_eq!(got, Ok(None)),
                        [(id, value)] => {
                            m.remove(&(key, *id));
                            prop_assert_eq!(
                                got,
                                Ok(Some((f64::from(key), Item { id: *id, value: *value })))
                            );
                        }
                        _ => prop_assert_eq!(got, Err(TreeError::AmbiguousKey(f64::from(key)))),
                    }
                }
                Op::RemoveEntry(key, id) => {
                    let got = t.remove_entry(f64::from(key), &id).unwrap();
                    let expected = m.remove(&(key, id)).map(|value| Item { id, value });
                    prop_assert_eq!(got, expected);
                }
                Op::Search(key) => {
                    let found = t.search(f64::from(key)).map(|n| (n.record_id(), n.payload().value));
                    match found {
                        Some((&id, value)) => prop_assert_eq!(m.get(&(key, id)), Some(&value)),
                        None => prop_assert!(model_matches(&m, key).is_empty()),
                    }
                }
            }

            prop_assert_eq!(t.len(), m.len());
            validate_tree(&t);
        }
    }

    #[test]
    fn prop_level_order_covers_every_entry(keys in prop::collection::btree_set(-500i32..500, 0..200)) {
        let mut t: AvlTree<String> = AvlTree::new();
        for &k in &keys {
            t.insert(f64::from(k), k.to_string()).unwrap();
        }

        let levels = t.levels();
        prop_assert_eq!(levels.len() as u32, t.height());
        for (depth, level) in levels.iter().enumerate() {
            prop_assert!(!level.is_empty());
            for node in level {
                prop_assert_eq!(node.level(), depth);
                prop_assert_eq!(t.level_of(node.id()), Ok(depth));
                prop_assert!((-1..=1).contains(&node.balance_factor()));
            }
            // Left-to-right siblings are in key order.
            for pair in level.windows(2) {
                prop_assert!(pair[0].key() < pair[1].key());
            }
        }

        let mut seen: Vec<f64> = levels.into_iter().flatten().map(|n| n.key()).collect();
        seen.sort_by(f64::total_cmp);
        let expected: Vec<f64> = keys.iter().map(|&k| f64::from(k)).collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn prop_remove_then_reinsert_restores_contents(
        keys in prop::collection::btree_set(0i32..1000, 1..120),
        pick in any::<prop::sample::Index>(),
    ) {
        let keys: Vec<i32> = keys.into_iter().collect();
        let mut t: AvlTree<String> = AvlTree::new();
        for &k in &keys {
            t.insert(f64::from(k), k.to_string()).unwrap();
        }

        let k = keys[pick.index(keys.len())];
        let removed = t.remove(f64::from(k)).unwrap();
        prop_assert_eq!(removed, Some((f64::from(k), k.to_string())));
        validate_tree(&t);
        t.insert(f64::from(k), k.to_string()).unwrap();
        validate_tree(&t);

        prop_assert_eq!(t.len(), keys.len());
        for &k in &keys {
            let found = t.search(f64::from(k)).map(|n| n.payload().clone());
            prop_assert_eq!(found, Some(k.to_string()));
        }
    }

    #[test]
    fn prop_family_relations_agree(keys in prop::collection::btree_set(0i32..10_000, 0..150)) {
        let mut t: AvlTree<String> = AvlTree::new();
        for &k in &keys {
            t.insert(f64::from(k), k.to_string()).unwrap();
        }

        for node in t.levels().into_iter().flatten() {
            let parent = node.parent();
            prop_assert_eq!(node.grandparent(), parent.and_then(|p| p.parent()));
            if let (Some(p), Some(g)) = (parent, node.grandparent()) {
                let uncle = node.uncle();
                prop_assert!(uncle.is_some(), "AVL grandparents always have two children");
                prop_assert!(uncle != Some(p));
                prop_assert_eq!(uncle.and_then(|u| u.parent()), Some(g));
            } else {
                prop_assert!(node.uncle().is_none());
            }
            for child in [node.left(), node.right()].into_iter().flatten() {
                prop_assert_eq!(child.parent(), Some(node));
            }
        }
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys: Vec<f64> = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];

    for_each_permutation(&keys, |perm| {
        let mut t: AvlTree<String> = AvlTree::new();
        for k in perm {
            assert_eq!(t.insert(k, k.to_string()).unwrap(), None);
            validate_tree(&t);
        }
        assert_eq!(t.len(), keys.len());
        assert!(t.height() <= 4);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys: Vec<f64> = vec![4.0, 2.0, 6.0, 1.0, 3.0, 5.0, 7.0];

    // Insert in a fixed order, then remove in all permutations.
    let mut base: AvlTree<String> = AvlTree::new();
    for &k in &keys {
        base.insert(k, k.to_string()).unwrap();
    }

    for_each_permutation(&keys, |perm| {
        let mut t = base.clone();
        for k in perm {
            assert_eq!(t.remove(k).unwrap(), Some((k, k.to_string())));
            assert!(t.search(k).is_none());
            validate_tree(&t);
        }
        assert!(t.is_empty());
        assert!(t.root.is_null());
    });
}

#[test]
fn exhaustive_duplicate_keys_small_set() {
    let entries: Vec<(f64, &str)> = vec![(1.0, "a"), (1.0, "b"), (1.0, "c"), (2.0, "a"), (2.0, "b")];

    for_each_permutation(&entries, |perm| {
        let mut t: AvlTree<&str> = AvlTree::new();
        for (k, id) in perm.iter().copied() {
            assert_eq!(t.insert(k, id).unwrap(), None);
            validate_tree(&t);
        }
        for (k, id) in perm {
            assert_eq!(t.remove_entry(k, id).unwrap(), Some(id));
            validate_tree(&t);
        }
        assert!(t.is_empty());
    });
}
