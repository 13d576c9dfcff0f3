use super::*;

use crate::arena::{Node, NodeArena, NodeId};
use crate::handles::{handle_length, jump_length, signature};
use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::{BTreeSet, HashSet};

/// The extreme leaf below `id`, found by walking child links.
fn walk_to_leaf(arena: &NodeArena, mut id: NodeId, side: bool) -> NodeId {
    while !arena.is_leaf(id) {
        id = arena.child(id, side);
    }
    id
}

/// Checks every structural invariant of the trie.
fn validate_trie(t: &TrieEngine) {
    let arena = &t.arena;

    if t.root.is_null() {
        assert_eq!(t.count, 0);
        assert_eq!(arena.live(), 0, "empty trie must not hold nodes");
        assert_eq!(t.handles.len(), 0);
        assert!(t.chain.head.is_null() && t.chain.tail.is_null());
        return;
    }

    assert!(arena.parent(t.root).is_null(), "root must not have a parent");
    assert_eq!(arena.live(), 2 * t.count - 1, "compacted binary trie node count");
    assert_eq!(
        t.handles.len(),
        t.count - 1,
        "every internal node is indexed exactly once"
    );

    let mut leaves: Vec<NodeId> = Vec::new();
    let mut referenced: HashSet<NodeId> = HashSet::new();
    let mut handles: HashSet<BitVec> = HashSet::new();
    let mut stack = vec![t.root];
    while let Some(id) = stack.pop() {
        let n = match arena.node(id) {
            Node::Leaf(_) => {
                leaves.push(id);
                continue;
            }
            Node::Internal(n) => n,
            Node::Vacant { .. } => panic!("vacant {id:?} reachable from root"),
        };

        let lo = &arena.leaf(walk_to_leaf(arena, id, false)).key;
        let hi = &arena.leaf(walk_to_leaf(arena, id, true)).key;
        assert_eq!(lo.path_lcp(hi), n.extent, "extent must be the subtree's common path prefix");

        for bit in [false, true] {
            let c = n.children[bit as usize];
            assert!(!c.is_null(), "internal nodes have two children");
            assert_eq!(arena.parent(c), id, "child parent link");
            assert!(arena.extent(c) > n.extent, "child extent must grow");
            assert_eq!(
                arena.reference_key(c).to_path().get(n.extent),
                bit,
                "child on wrong side"
            );

            // The jump lands on the first spine node reaching the jump length.
            let reach = jump_length(n.handle_len);
            let mut expected = c;
            while !arena.is_leaf(expected) && arena.extent(expected) < reach {
                expected = arena.child(expected, bit);
            }
            assert_eq!(n.jumps[bit as usize], expected, "jump pointer of {id:?} on side {bit}");
            assert_eq!(arena.extreme_leaf(id, bit), walk_to_leaf(arena, id, bit));
        }

        let parent_extent = (!n.parent.is_null()).then(|| arena.internal(n.parent).extent);
        assert_eq!(n.handle_len, handle_length(parent_extent, n.extent), "handle length");
        let reference = arena.reference_key(id).to_path();
        assert_eq!(
            n.signature,
            signature(&reference, n.handle_len, t.config.seed),
            "stored signature"
        );
        assert!(
            t.handles.candidates(n.signature).contains(&id),
            "node missing from handle index"
        );
        assert!(
            handles.insert(reference.prefix(n.handle_len)),
            "handles must be unique"
        );

        assert_eq!(arena.leaf(n.reference).referrer, id, "reference back link");
        let mut up = n.reference;
        while up != id {
            up = arena.parent(up);
            assert!(!up.is_null(), "reference leaf outside the subtree");
        }
        assert!(referenced.insert(n.reference), "leaf referenced twice");

        stack.push(n.children[1]);
        stack.push(n.children[0]);
    }

    assert_eq!(leaves.len(), t.count, "reachable leaf count must match len");
    for &l in &leaves {
        let referrer = arena.leaf(l).referrer;
        if referrer.is_null() {
            assert!(!referenced.contains(&l));
        } else {
            assert_eq!(arena.internal(referrer).reference, l);
        }
    }

    let mut chain = Vec::with_capacity(t.count);
    let mut prev = NodeId::NULL;
    let mut cur = t.chain.head;
    while !cur.is_null() {
        assert_eq!(arena.leaf(cur).prev, prev, "chain back link");
        chain.push(cur);
        prev = cur;
        cur = arena.leaf(cur).next;
    }
    assert_eq!(t.chain.tail, prev);
    assert_eq!(chain, leaves, "leaf chain must follow in-order traversal");

    for w in leaves.windows(2) {
        let (a, b) = (&arena.leaf(w[0]).key, &arena.leaf(w[1]).key);
        assert!(a < b, "keys must ascend strictly");
    }
}

fn bits(s: &str) -> BitVec {
    BitVec::from_binary_str(s).unwrap()
}

fn word_strategy() -> impl Strategy<Value = Vec<u8>> {
    // Few distinct bytes, so keys share long prefixes and extend each other.
    prop::collection::vec(prop::sample::select(vec![0u8, 1, b'a', 0xff]), 0..=6)
}

fn short_key_strategy() -> impl Strategy<Value = BitVec> {
    // Up to 10 bits, so keys often prefix one another.
    prop::collection::vec(any::<bool>(), 0..=10).prop_map(|v| v.into_iter().collect())
}

fn query_strategy() -> impl Strategy<Value = BitVec> {
    // Shorter than, equal to and longer than the stored keys.
    prop::collection::vec(any::<bool>(), 0..=13).prop_map(|v| v.into_iter().collect())
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 5)]
    Add(#[proptest(strategy = "word_strategy()")] Vec<u8>),
    #[proptest(weight = 3)]
    Remove(#[proptest(strategy = "word_strategy()")] Vec<u8>),
    #[proptest(weight = 2)]
    Contains(#[proptest(strategy = "word_strategy()")] Vec<u8>),
    #[proptest(weight = 2)]
    Successor(#[proptest(strategy = "word_strategy()")] Vec<u8>),
    #[proptest(weight = 2)]
    Predecessor(#[proptest(strategy = "word_strategy()")] Vec<u8>),
    #[proptest(weight = 1)]
    ShrinkToFit,
}

#[derive(Clone, Debug, Arbitrary)]
enum BitOp {
    #[proptest(weight = 4)]
    Add(#[proptest(strategy = "short_key_strategy()")] BitVec),
    #[proptest(weight = 3)]
    Remove(#[proptest(strategy = "short_key_strategy()")] BitVec),
    #[proptest(weight = 3)]
    Seek(#[proptest(strategy = "query_strategy()")] BitVec),
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_bytes(ops in prop::collection::vec(any::<Op>(), 0..=500)) {
        let mut t: ZFastTrie<[u8], PrefixFreeBytes> = ZFastTrie::new();
        let mut m: BTreeSet<Vec<u8>> = BTreeSet::new();

        for op in ops {
            match op {
                Op::Add(key) => {
                    let added = t.add(&key);
                    prop_assert_eq!(added, m.insert(key));
                }
                Op::Remove(key) => {
                    prop_assert_eq!(t.remove(&key), m.remove(&key));
                }
                Op::Contains(key) => {
                    prop_assert_eq!(t.contains(&key), m.contains(&key));
                }
                Op::Successor(key) => {
                    prop_assert_eq!(t.successor(&key), m.range(key.clone()..).next().cloned());
                    let strict = m
                        .range((std::ops::Bound::Excluded(key.clone()), std::ops::Bound::Unbounded))
                        .next()
                        .cloned();
                    prop_assert_eq!(t.strict_successor(&key), strict);
                }
                Op::Predecessor(key) => {
                    prop_assert_eq!(t.predecessor(&key), m.range(..key.clone()).next_back().cloned());
                    prop_assert_eq!(t.weak_predecessor(&key), m.range(..=key).next_back().cloned());
                }
                Op::ShrinkToFit => t.shrink_to_fit(),
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_trie(t.engine());
        let got: Vec<Vec<u8>> = t.iter().collect();
        let expected: Vec<Vec<u8>> = m.iter().cloned().collect();
        prop_assert_eq!(got, expected);
        let back: Vec<Vec<u8>> = t.iter().rev().collect();
        let expected_back: Vec<Vec<u8>> = m.iter().rev().cloned().collect();
        prop_assert_eq!(back, expected_back);
    }

    #[test]
    fn prop_seek_bit_keys(ops in prop::collection::vec(any::<BitOp>(), 0..=400)) {
        let mut t = TrieEngine::new();
        let mut m: BTreeSet<BitVec> = BTreeSet::new();

        for op in ops {
            match op {
                BitOp::Add(key) => {
                    let added = t.add(key.clone());
                    prop_assert_eq!(added, m.insert(key));
                }
                BitOp::Remove(key) => {
                    prop_assert_eq!(t.remove(&key), m.remove(&key));
                }
                BitOp::Seek(query) => {
                    prop_assert_eq!(t.contains(&query), m.contains(&query));
                    prop_assert_eq!(t.successor(&query), m.range(query.clone()..).next());
                    prop_assert_eq!(t.predecessor(&query), m.range(..query.clone()).next_back());

                    let mut c = t.cursor_from(&query);
                    let after: Vec<&BitVec> = m.range(query.clone()..).take(3).collect();
                    let got: Vec<&BitVec> = c.by_ref().take(after.len()).collect();
                    prop_assert_eq!(&got, &after);
                    for k in after.iter().rev() {
                        prop_assert_eq!(c.prev(), Some(*k));
                    }
                    prop_assert_eq!(c.peek_prev(), m.range(..query).next_back());
                }
            }
        }

        validate_trie(&t);
        prop_assert!(t.iter().eq(m.iter()));
    }

    #[test]
    fn prop_snapshot_roundtrip(keys in prop::collection::btree_set(word_strategy(), 0..=64)) {
        let t: ZFastTrie<[u8], PrefixFreeBytes> = keys.iter().map(|k| k.as_slice()).collect();
        let loaded = ZFastTrie::<[u8], PrefixFreeBytes>::from_bytes(&t.to_bytes().unwrap()).unwrap();
        validate_trie(loaded.engine());
        prop_assert_eq!(loaded.len(), keys.len());
        let got: Vec<Vec<u8>> = loaded.iter().collect();
        let expected: Vec<Vec<u8>> = keys.into_iter().collect();
        prop_assert_eq!(got, expected);
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

/// Keys with splits at several depths and skip intervals of several lengths.
fn small_keys() -> Vec<BitVec> {
    ["0000", "0001", "001", "01", "1100000", "1101", "111"]
        .iter()
        .map(|s| bits(s))
        .collect()
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys = small_keys();
    let mut sorted = keys.clone();
    sorted.sort();

    for_each_permutation(&keys, |perm| {
        let mut t = TrieEngine::new();
        for k in perm {
            assert!(t.add(k));
            validate_trie(&t);
        }
        assert!(t.iter().eq(sorted.iter()));
        for k in &sorted {
            assert!(t.contains(k));
        }
    });
}

/// Keys that prefix one another, down to the empty key.
fn nested_keys() -> Vec<BitVec> {
    ["", "0", "00", "001", "01", "1", "1101"]
        .iter()
        .map(|s| bits(s))
        .collect()
}

#[test]
fn exhaustive_orders_nested_keys() {
    let keys = nested_keys();
    let mut sorted = keys.clone();
    sorted.sort();

    for_each_permutation(&keys, |perm| {
        let mut t = TrieEngine::new();
        for k in &perm {
            assert!(t.add(k.clone()));
            validate_trie(&t);
        }
        assert!(t.iter().eq(sorted.iter()));

        // Remove in the reverse of the insertion order.
        let mut live: BTreeSet<BitVec> = keys.iter().cloned().collect();
        for k in perm.iter().rev() {
            assert!(t.remove(k));
            live.remove(k);
            validate_trie(&t);
            assert!(t.iter().eq(live.iter()));
            for other in &live {
                assert!(t.contains(other));
            }
        }
        assert!(t.is_empty());
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys = small_keys();
    let base: TrieEngine = keys.iter().cloned().collect();

    // Insert in a fixed order, then remove in all permutations.
    for_each_permutation(&keys, |perm| {
        let mut t = base.clone();
        let mut live: BTreeSet<BitVec> = keys.iter().cloned().collect();

        for k in perm {
            assert!(t.remove(&k));
            live.remove(&k);
            assert_eq!(t.len(), live.len());
            validate_trie(&t);
            assert!(t.iter().eq(live.iter()));
        }
        assert!(t.is_empty());
        assert!(t.root.is_null());
    });
}

#[test]
fn long_keys_cross_word_boundaries() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(7);
    let mut t = TrieEngine::new();
    let mut m: BTreeSet<BitVec> = BTreeSet::new();

    // 300-bit keys sharing 0..=260-bit prefixes with a common stem.
    let stem: BitVec = (0..260).map(|i| i % 3 == 0).collect();
    for _ in 0..400 {
        let shared = rng.gen_range(0..=stem.len());
        let mut k = stem.prefix(shared);
        while k.len() < 300 {
            k.push(rng.gen());
        }
        assert_eq!(t.add(k.clone()), m.insert(k));
    }
    validate_trie(&t);
    assert!(t.iter().eq(m.iter()));

    let victims: Vec<BitVec> = m.iter().step_by(2).cloned().collect();
    for k in &victims {
        assert!(t.remove(k));
        m.remove(k);
    }
    validate_trie(&t);
    assert!(t.iter().eq(m.iter()));
}
