use super::*;

use proptest::prelude::*;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Recheck every structural invariant from scratch: strict in-order key
/// ordering, the cached size/height equations, and pool accounting. `maps`
/// must be every tree living on the shared pool, so that reachable and free
/// slots partition the whole slot range.
fn validate<K: Ord + Debug, V>(maps: &[&BstMap<K, V>]) {
    let first = maps.first().expect("validate needs at least one map");
    for m in maps {
        assert!(
            Rc::ptr_eq(&first.pool, &m.pool),
            "validated maps must share one pool"
        );
    }

    let pool = first.pool.borrow();
    let mut seen = vec![false; pool.slots.len()];

    for m in maps.iter() {
        let mut stack: Vec<Idx> = Vec::new();
        let mut cur = m.root;
        let mut visited = 0usize;
        let mut prev: Option<&K> = None;
        while cur.is_some() || !stack.is_empty() {
            while cur.is_some() {
                stack.push(cur);
                cur = pool.node(cur).left;
            }
            let idx = stack.pop().expect("stack non-empty");
            let node = pool.node(idx);

            assert!(
                !seen[idx.index()],
                "slot {} reachable from two places",
                idx.0
            );
            seen[idx.index()] = true;
            visited += 1;

            if let Some(p) = prev {
                assert!(
                    p < &node.key,
                    "in-order keys must be strictly increasing at {:?}",
                    node.key
                );
            }
            prev = Some(&node.key);

            assert_eq!(
                node.size,
                pool.size_of(node.left) + pool.size_of(node.right) + 1,
                "stored size must match children"
            );
            assert_eq!(
                node.height,
                pool.height_of(node.left).max(pool.height_of(node.right)) + 1,
                "stored height must match children"
            );

            cur = node.right;
        }
        assert_eq!(m.len(), visited, "len must match reachable node count");
    }

    let mut free = 0usize;
    let mut cur = pool.free_head;
    while cur.is_some() {
        assert!(!seen[cur.index()], "slot {} both free and reachable", cur.0);
        seen[cur.index()] = true;
        free += 1;
        assert!(free <= pool.slots.len(), "free list cycle");
        cur = match pool.slots[cur.index()] {
            Slot::Free { next } => next,
            Slot::Occupied(_) => panic!("occupied slot {} on the free list", cur.0),
        };
    }

    assert!(
        seen.iter().all(|&s| s),
        "every slot must be reachable from a tree or the free list"
    );
}

#[derive(Clone, Debug)]
enum Op {
    Insert(i32, u64),
    Upsert(i32, u64),
    Remove(i32),
    Get(i32),
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> + Clone {
    // A narrow key range keeps hits, misses, and re-inserts all likely.
    let key = 0i32..64;
    prop_oneof![
        40 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        20 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Upsert(k, v)),
        20 => key.clone().prop_map(Op::Remove),
        19 => key.clone().prop_map(Op::Get),
        1 => Just(Op::Clear),
    ]
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op_strategy(), 0..=1500)
}

fn apply(
    t: &mut BstMap<i32, u64>,
    m: &mut BTreeMap<i32, u64>,
    op: Op,
) -> Result<(), TestCaseError> {
    match op {
        Op::Insert(k, v) => {
            prop_assert_eq!(t.insert(k, v), m.insert(k, v));
        }
        Op::Upsert(k, v) => {
            *t.upsert(k) = v;
            m.insert(k, v);
        }
        Op::Remove(k) => {
            prop_assert_eq!(t.remove(&k).ok(), m.remove(&k));
        }
        Op::Get(k) => {
            prop_assert_eq!(t.get(&k).map(|v| *v), m.get(&k).copied());
        }
        Op::Clear => {
            t.clear();
            m.clear();
        }
    }
    prop_assert_eq!(t.len(), m.len());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_btreemap(ops in ops_strategy()) {
        let mut t: BstMap<i32, u64> = BstMap::new();
        let mut m: BTreeMap<i32, u64> = BTreeMap::new();

        for op in ops {
            apply(&mut t, &mut m, op)?;
        }

        validate(&[&t]);
        let got: Vec<(i32, u64)> = t.iter().collect();
        let expected: Vec<(i32, u64)> = m.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_shared_pool_isolation(
        ops in prop::collection::vec((any::<bool>(), op_strategy()), 0..=600),
    ) {
        let pool: SharedPool<i32, u64> = SharedPool::new();
        let mut ta = BstMap::new_in(&pool);
        let mut tb = BstMap::new_in(&pool);
        let mut ma: BTreeMap<i32, u64> = BTreeMap::new();
        let mut mb: BTreeMap<i32, u64> = BTreeMap::new();

        for (pick_a, op) in ops {
            if pick_a {
                apply(&mut ta, &mut ma, op)?;
            } else {
                apply(&mut tb, &mut mb, op)?;
            }
        }

        validate(&[&ta, &tb]);
        let got_a: Vec<(i32, u64)> = ta.iter().collect();
        let expected_a: Vec<(i32, u64)> = ma.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(got_a, expected_a);
        let got_b: Vec<(i32, u64)> = tb.iter().collect();
        let expected_b: Vec<(i32, u64)> = mb.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(got_b, expected_b);
    }

    #[test]
    fn prop_upsert_then_remove_restores(
        keys in prop::collection::vec(0i32..64, 1..=64),
        probe in 0i32..64,
    ) {
        let mut t: BstMap<i32, u64> = BstMap::new();
        for (i, k) in keys.iter().enumerate() {
            *t.upsert(*k) = i as u64;
        }
        let had = t.contains_key(&probe);
        let before = t.len();

        *t.upsert(probe) = 999;
        if !had {
            prop_assert_eq!(t.len(), before + 1);
            t.remove(&probe).unwrap();
            prop_assert_eq!(t.len(), before);
            prop_assert_eq!(t.search(&probe).err(), Some(Error::KeyNotFound));
        }
        validate(&[&t]);
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
    let keys: Vec<u32> = vec![5, 3, 8, 1, 4, 7, 9];

    for_each_permutation(&keys, |perm| {
        let mut t: BstMap<u32, u64> = BstMap::new();
        for (i, k) in perm.into_iter().enumerate() {
            *t.upsert(k) = i as u64;
        }
        validate(&[&t]);
        let got: Vec<u32> = t.iter().map(|(k, _)| k).collect();
        assert_eq!(got, vec![1, 3, 4, 5, 7, 8, 9]);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys: Vec<u32> = vec![5, 3, 8, 1, 4, 7, 9];

    // Build once in a fixed order, then remove in every permutation.
    let mut base: BstMap<u32, u64> = BstMap::new();
    for (i, k) in keys.iter().enumerate() {
        *base.upsert(*k) = i as u64;
    }

    for_each_permutation(&keys, |perm| {
        let mut t = base.clone();
        for k in perm {
            t.remove(&k).unwrap();
            validate(&[&base, &t]);
        }
        assert_eq!(t.len(), 0);
        assert!(t.root.is_none());
    });
}
