//! The z-fast trie engine over bit-vector keys.
//!
//! A compacted binary trie whose internal nodes are also reachable through a
//! hash of their handle (see [`crate::handles`]). Locating the node where a
//! query leaves the trie is a fat binary search over prefix lengths of the
//! query: O(log w) handle lookups for a key of `w` bits, independent of how
//! many keys are stored. Leaves are additionally threaded into a sorted
//! doubly linked list for iteration.
//!
//! The trie branches on key paths rather than raw keys (see [`crate::bits`]),
//! so any set of distinct bit vectors can be stored, including keys that are
//! prefixes of one another. Extreme leaves of a subtree are reached through
//! per-node jump pointers in O(log w) steps.

use std::fmt;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::arena::{Internal, Node, NodeArena, NodeId};
use crate::bits::BitVec;
use crate::chain::LeafChain;
use crate::config::TrieConfig;
use crate::handles::{handle_length, jump_length, signature, two_fattest, HandleIndex, PrefixHashes};
use crate::iter::{Cursor, Iter};

/// Where a query leaves the trie.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Exit {
    /// The node whose skip interval contains `lcp`.
    pub node: NodeId,
    /// Longest common path prefix of the query with the stored keys.
    pub lcp: usize,
}

/// Position of a query in key order.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Seek {
    /// Least leaf whose key is >= the query, or NULL.
    pub next: NodeId,
    /// Whether `next` holds the query itself.
    pub exact: bool,
}

/// An ordered set of bit vectors.
///
/// Membership, insertion, removal and seeking cost O(log w) expected handle
/// lookups for a `w`-bit key, plus one word-wise comparison per confirmed
/// lookup. Iteration walks a linked list of leaves and is O(1) per step.
///
/// Any distinct bit vectors may be stored together; a key and its extensions
/// (`0`, `01`, `011`) are separate members ordered shortest first.
#[derive(Clone)]
pub struct TrieEngine {
    pub(crate) arena: NodeArena,
    pub(crate) handles: HandleIndex,
    pub(crate) chain: LeafChain,
    pub(crate) root: NodeId,
    pub(crate) count: usize,
    pub(crate) config: TrieConfig,
}

impl TrieEngine {
    pub fn new() -> Self {
        Self::with_config(TrieConfig::default())
    }

    pub fn with_config(config: TrieConfig) -> Self {
        debug!(seed = config.seed, capacity = config.capacity, "new z-fast trie");
        // n leaves need n - 1 internal nodes.
        Self {
            arena: NodeArena::with_capacity(config.capacity.saturating_mul(2)),
            handles: HandleIndex::with_capacity(config.capacity),
            chain: LeafChain::default(),
            root: NodeId::NULL,
            count: 0,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &TrieConfig {
        &self.config
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.handles.clear();
        self.chain = LeafChain::default();
        self.root = NodeId::NULL;
        self.count = 0;
    }

    /// Reserves room for `additional` more keys.
    pub fn reserve(&mut self, additional: usize) {
        self.arena.reserve(additional.saturating_mul(2));
        self.handles.reserve(additional);
    }

    pub fn shrink_to_fit(&mut self) {
        self.arena.shrink_to_fit();
        self.handles.shrink_to_fit();
    }

    /// Approximate heap bytes held by the trie.
    pub fn memory_usage(&self) -> usize {
        self.arena.memory_usage() + self.handles.memory_usage()
    }

    // =========================================================================
    // Exit-node search
    // =========================================================================

    /// Finds the internal node whose handle is `path[0..len)` and whose whole
    /// extent is a prefix of `key`'s path.
    ///
    /// Signature hits are only candidates: each one is checked against the
    /// node's reference leaf. A node that owns the handle but diverges from
    /// `key` inside its extent is reported as a miss; the search then settles
    /// on its parent.
    fn lookup_handle(&self, key: &BitVec, hashes: &PrefixHashes<'_>, len: usize) -> Option<NodeId> {
        for &id in self.handles.candidates(hashes.signature(len)) {
            let node = self.arena.internal(id);
            if node.handle_len != len {
                trace!(?id, len, handle_len = node.handle_len, "handle length mismatch");
                continue;
            }
            let lcp = key.path_lcp(self.arena.reference_key(id));
            if lcp >= node.extent {
                return Some(id);
            }
            if lcp >= len {
                // Handles are unique, so no other candidate can own this one.
                return None;
            }
            trace!(?id, len, lcp, "false handle match");
        }
        None
    }

    /// Locates the exit node of `key`, whose path is `path` and whose prefix
    /// signatures are `hashes`. `None` only when the trie is empty.
    pub(crate) fn exit_node(
        &self,
        key: &BitVec,
        path: &BitVec,
        hashes: &PrefixHashes<'_>,
    ) -> Option<Exit> {
        if self.root.is_null() {
            return None;
        }

        let node = if self.arena.is_leaf(self.root) {
            self.root
        } else {
            // Fat binary search over (a, b]: the deepest node whose extent is a
            // prefix of the path has its handle length in the interval, or is `top`.
            let mut a: i64 = -1;
            let mut b = path.len() as i64;
            let mut top = NodeId::NULL;
            while a < b {
                let f = two_fattest(a, b);
                match self.lookup_handle(key, hashes, f as usize) {
                    Some(id) => {
                        a = self.arena.internal(id).extent as i64;
                        top = id;
                    }
                    None => b = f - 1,
                }
            }

            if top.is_null() {
                self.root
            } else {
                // Paths are prefix-free, so a matched extent is always shorter
                // than the path and the search goes on into a child.
                let extent = self.arena.internal(top).extent;
                debug_assert!(extent < path.len());
                self.arena.child(top, path.get(extent))
            }
        };

        let lcp = key
            .path_lcp(self.arena.reference_key(node))
            .min(self.arena.extent(node));
        Some(Exit { node, lcp })
    }

    fn find_leaf(&self, key: &BitVec) -> Option<NodeId> {
        let path = key.to_path();
        let hashes = PrefixHashes::new(&path, self.config.seed);
        let exit = self.exit_node(key, &path, &hashes)?;
        (exit.lcp == path.len() && self.arena.is_leaf(exit.node)).then_some(exit.node)
    }

    pub(crate) fn seek(&self, key: &BitVec) -> Seek {
        let path = key.to_path();
        let hashes = PrefixHashes::new(&path, self.config.seed);
        let Some(Exit { node, lcp }) = self.exit_node(key, &path, &hashes) else {
            return Seek {
                next: NodeId::NULL,
                exact: false,
            };
        };

        if lcp == path.len() {
            debug_assert!(self.arena.is_leaf(node));
            return Seek { next: node, exact: true };
        }

        // The path leaves the exit subtree at `lcp`, so every key below sits
        // on the same side of `key`.
        debug_assert!(lcp < self.arena.extent(node));
        let next = if path.get(lcp) {
            LeafChain::next(&self.arena, self.arena.extreme_leaf(node, true))
        } else {
            self.arena.extreme_leaf(node, false)
        };
        Seek { next, exact: false }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn contains(&self, key: &BitVec) -> bool {
        self.find_leaf(key).is_some()
    }

    #[inline]
    fn key_at(&self, leaf: NodeId) -> Option<&BitVec> {
        (!leaf.is_null()).then(|| &self.arena.leaf(leaf).key)
    }

    pub fn first(&self) -> Option<&BitVec> {
        self.key_at(self.chain.head)
    }

    pub fn last(&self) -> Option<&BitVec> {
        self.key_at(self.chain.tail)
    }

    /// Least stored key `>= key`.
    pub fn successor(&self, key: &BitVec) -> Option<&BitVec> {
        self.key_at(self.seek(key).next)
    }

    /// Least stored key `> key`.
    pub fn strict_successor(&self, key: &BitVec) -> Option<&BitVec> {
        let seek = self.seek(key);
        if seek.exact {
            self.key_at(LeafChain::next(&self.arena, seek.next))
        } else {
            self.key_at(seek.next)
        }
    }

    /// Greatest stored key `< key`.
    pub fn predecessor(&self, key: &BitVec) -> Option<&BitVec> {
        let seek = self.seek(key);
        self.key_at(self.chain.prev_of(&self.arena, seek.next))
    }

    /// Greatest stored key `<= key`.
    pub fn weak_predecessor(&self, key: &BitVec) -> Option<&BitVec> {
        let seek = self.seek(key);
        if seek.exact {
            self.key_at(seek.next)
        } else {
            self.key_at(self.chain.prev_of(&self.arena, seek.next))
        }
    }

    /// All keys in ascending order.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(&self.arena, self.chain, self.count)
    }

    /// A cursor placed before the first key.
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::new(&self.arena, self.chain, self.chain.head)
    }

    /// A cursor placed before the least key `>= key`.
    pub fn cursor_from(&self, key: &BitVec) -> Cursor<'_> {
        Cursor::new(&self.arena, self.chain, self.seek(key).next)
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Inserts `key`. Returns `false`, leaving the trie untouched, if it was
    /// already present.
    pub fn add(&mut self, key: BitVec) -> bool {
        if self.root.is_null() {
            let leaf = self.arena.alloc_leaf(key);
            self.chain.init(&mut self.arena, leaf);
            self.root = leaf;
            self.count = 1;
            return true;
        }

        let seed = self.config.seed;
        let path = key.to_path();
        let hashes = PrefixHashes::new(&path, seed);
        let Exit { node: exit, lcp: d } = self
            .exit_node(&key, &path, &hashes)
            .expect("non-empty trie has an exit node");
        if d == path.len() {
            return false;
        }
        let exit_extent = self.arena.extent(exit);
        let exit_is_leaf = self.arena.is_leaf(exit);
        debug_assert!(d < exit_extent);

        let parent = self.arena.parent(exit);
        let parent_extent = (!parent.is_null()).then(|| self.arena.internal(parent).extent);
        let handle_len = handle_length(parent_extent, d);
        let node_signature = hashes.signature(handle_len);
        let bit = path.get(d);

        let leaf = self.arena.alloc_leaf(key);
        let children = if bit { [exit, leaf] } else { [leaf, exit] };
        let node = self.arena.alloc(Node::Internal(Internal {
            extent: d,
            handle_len,
            signature: node_signature,
            parent,
            children,
            jumps: children,
            reference: leaf,
        }));
        {
            let l = self.arena.leaf_mut(leaf);
            l.parent = node;
            l.referrer = node;
        }
        if parent.is_null() {
            self.root = node;
        } else {
            self.arena.replace_child(parent, exit, node);
        }
        self.arena.set_parent(exit, node);

        // The exit node's skip interval shrank to (d, exit_extent].
        if !exit_is_leaf {
            let new_len = handle_length(Some(d), exit_extent);
            let (old_len, old_signature) = {
                let n = self.arena.internal(exit);
                (n.handle_len, n.signature)
            };
            if new_len != old_len {
                debug_assert_eq!(old_len, handle_len);
                let new_signature =
                    signature(&self.arena.reference_key(exit).to_path(), new_len, seed);
                self.handles.remove(old_signature, exit);
                let n = self.arena.internal_mut(exit);
                n.handle_len = new_len;
                n.signature = new_signature;
                self.handles.insert(new_signature, exit);
                self.arena.reset_jumps(exit);
                trace!(?exit, from = old_len, to = new_len, "re-keyed exit node handle");
            }
        }
        self.arena.reset_jumps(node);
        if !parent.is_null() {
            self.repoint_jumps_after_split(&hashes, parent, exit, node, leaf, bit);
        }
        self.handles.insert(node_signature, node);

        if bit {
            let anchor = self.arena.extreme_leaf(exit, true);
            self.chain.insert_after(&mut self.arena, anchor, leaf);
        } else {
            let anchor = self.arena.extreme_leaf(exit, false);
            self.chain.insert_before(&mut self.arena, anchor, leaf);
        }

        self.count += 1;
        debug_assert_eq!(self.handles.len() + 1, self.count);
        debug_assert_eq!(self.arena.live(), 2 * self.count - 1);
        trace!(?node, extent = d, handle_len, "split");
        true
    }

    /// Removes `key`. Returns `false` if it was not present.
    pub fn remove(&mut self, key: &BitVec) -> bool {
        let path = key.to_path();
        let hashes = PrefixHashes::new(&path, self.config.seed);
        let leaf = match self.exit_node(key, &path, &hashes) {
            Some(exit) if exit.lcp == path.len() && self.arena.is_leaf(exit.node) => exit.node,
            _ => return false,
        };

        self.chain.unlink(&mut self.arena, leaf);
        self.count -= 1;

        let parent = self.arena.parent(leaf);
        if parent.is_null() {
            debug_assert_eq!(self.root, leaf);
            self.root = NodeId::NULL;
            self.arena.free(leaf);
            return true;
        }

        let sibling = self.arena.sibling(parent, leaf);
        let collapsed = self.arena.internal(parent).clone();
        let referrer = self.arena.leaf(leaf).referrer;

        // The sibling takes the parent's place; its extent is unchanged.
        self.arena.set_parent(sibling, collapsed.parent);
        if collapsed.parent.is_null() {
            self.root = sibling;
        } else {
            self.arena.replace_child(collapsed.parent, parent, sibling);
        }

        if self.adopt_handle(sibling, parent, &collapsed) {
            self.arena.reset_jumps(sibling);
        } else {
            self.handles.remove(collapsed.signature, parent);
        }

        // The parent's reference leaf survives; hand it to whoever referenced
        // the removed leaf.
        if referrer != parent {
            let orphan = collapsed.reference;
            debug_assert_ne!(orphan, leaf);
            self.arena.leaf_mut(orphan).referrer = referrer;
            if !referrer.is_null() {
                self.arena.internal_mut(referrer).reference = orphan;
            }
        }

        if !collapsed.parent.is_null() {
            self.repoint_jumps_after_splice(key, &hashes, collapsed.parent, parent, leaf, sibling);
        }

        self.arena.free(parent);
        self.arena.free(leaf);
        debug_assert_eq!(self.handles.len() + 1, self.count);
        debug_assert_eq!(self.arena.live(), 2 * self.count - 1);
        true
    }

    /// After `collapsed` (formerly at `parent`) is spliced out, the sibling's
    /// skip interval widens to cover the parent's. If the two-fattest number of
    /// the merged interval is the parent's handle length, the sibling takes
    /// over the parent's index entry. Returns whether it did.
    fn adopt_handle(&mut self, sibling: NodeId, parent: NodeId, collapsed: &Internal) -> bool {
        let (extent, old_len, old_signature) = match self.arena.node(sibling) {
            Node::Internal(s) => (s.extent, s.handle_len, s.signature),
            _ => return false,
        };
        let grand_extent =
            (!collapsed.parent.is_null()).then(|| self.arena.internal(collapsed.parent).extent);
        if handle_length(grand_extent, extent) == old_len {
            return false;
        }
        debug_assert_eq!(handle_length(grand_extent, extent), collapsed.handle_len);

        self.handles.remove(old_signature, sibling);
        let replaced = self.handles.replace(collapsed.signature, parent, sibling);
        debug_assert!(replaced, "collapsed parent was not indexed");
        let s = self.arena.internal_mut(sibling);
        s.handle_len = collapsed.handle_len;
        s.signature = collapsed.signature;
        trace!(?sibling, from = old_len, to = collapsed.handle_len, "sibling inherited parent handle");
        true
    }

    // =========================================================================
    // Jump pointer upkeep
    // =========================================================================

    /// Ancestors of `bottom` (inclusive) whose jump pointers may cross the
    /// edge below it: `bottom`, the root, and every node whose jump length
    /// exceeds `bottom`'s extent `e`. A handle `h <= e` with
    /// `h + lowbit(h) > e` is `e` with its bits below some set bit cleared,
    /// so each such node is one handle lookup along `key`'s path.
    fn jump_ancestors(
        &self,
        key: &BitVec,
        hashes: &PrefixHashes<'_>,
        bottom: NodeId,
    ) -> SmallVec<[NodeId; 16]> {
        let e = self.arena.internal(bottom).extent;
        let mut out = SmallVec::new();
        out.push(bottom);
        if self.root != bottom {
            out.push(self.root);
        }
        let mut rest = e;
        while rest != 0 {
            let k = rest.trailing_zeros();
            rest &= rest - 1;
            if let Some(id) = self.lookup_handle(key, hashes, (e >> k) << k) {
                if id != bottom && self.arena.internal(id).extent <= e {
                    out.push(id);
                }
            }
        }
        out
    }

    /// `node` was spliced in between `parent` and `exit`, with the new `leaf`
    /// on side `bit`. Ancestor jumps that went past `parent` into `exit` now
    /// land on `node` if it reaches far enough, or on `leaf` if the spine
    /// they follow now ends there.
    fn repoint_jumps_after_split(
        &mut self,
        hashes: &PrefixHashes<'_>,
        parent: NodeId,
        exit: NodeId,
        node: NodeId,
        leaf: NodeId,
        bit: bool,
    ) {
        let side = self.arena.child(parent, true) == node;
        let d = self.arena.internal(node).extent;
        let ancestors = self.jump_ancestors(&self.arena.leaf(leaf).key, hashes, parent);
        for y in ancestors {
            let n = self.arena.internal(y);
            if !self.arena.in_subtree(n.jumps[side as usize], exit) {
                continue;
            }
            let target = if d >= jump_length(n.handle_len) {
                node
            } else if side == bit {
                leaf
            } else {
                continue;
            };
            self.arena.internal_mut(y).jumps[side as usize] = target;
            trace!(?y, ?target, "repointed jump after split");
        }
    }

    /// `parent` and `leaf` are about to be freed and `sibling` hangs from
    /// `grand` in their place. Jumps that landed on `parent` move to
    /// `sibling`; jumps that landed on `leaf` continue down `sibling`'s spine.
    fn repoint_jumps_after_splice(
        &mut self,
        key: &BitVec,
        hashes: &PrefixHashes<'_>,
        grand: NodeId,
        parent: NodeId,
        leaf: NodeId,
        sibling: NodeId,
    ) {
        let side = self.arena.child(grand, true) == sibling;
        let mut stranded: SmallVec<[(usize, NodeId); 16]> = SmallVec::new();
        for y in self.jump_ancestors(key, hashes, grand) {
            let n = self.arena.internal_mut(y);
            let reach = jump_length(n.handle_len);
            let jump = &mut n.jumps[side as usize];
            if *jump == parent {
                *jump = sibling;
            } else if *jump == leaf {
                stranded.push((reach, y));
            }
        }

        // Shorter reaches land higher up the same spine; resume from there.
        stranded.sort_unstable_by_key(|&(reach, _)| reach);
        let mut at = sibling;
        for (reach, y) in stranded {
            at = self.arena.descend(at, side, reach);
            self.arena.internal_mut(y).jumps[side as usize] = at;
            trace!(?y, target = ?at, "repointed jump after splice");
        }
    }
}

impl Default for TrieEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TrieEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Extend<BitVec> for TrieEngine {
    fn extend<I: IntoIterator<Item = BitVec>>(&mut self, iter: I) {
        for key in iter {
            self.add(key);
        }
    }
}

impl FromIterator<BitVec> for TrieEngine {
    fn from_iter<I: IntoIterator<Item = BitVec>>(iter: I) -> Self {
        let mut trie = TrieEngine::new();
        trie.extend(iter);
        trie
    }
}
