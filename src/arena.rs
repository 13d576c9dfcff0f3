//! Node storage.
//!
//! All nodes live in one `Vec` and refer to each other by [`NodeId`]. Parent,
//! sibling and leaf-chain links are plain indices; the arena is the only owner.

use std::fmt;

use crate::bits::BitVec;
use crate::handles::jump_length;

/// Index of a node in the arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(u32);

impl NodeId {
    pub(crate) const NULL: NodeId = NodeId(u32::MAX);

    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        assert!(index < u32::MAX as usize, "node arena overflow: {index}");
        Self(index as u32)
    }

    #[inline]
    pub(crate) fn is_null(self) -> bool {
        self == Self::NULL
    }

    #[inline]
    fn index(self) -> usize {
        debug_assert!(!self.is_null());
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("NodeId(NULL)")
        } else {
            write!(f, "NodeId({})", self.0)
        }
    }
}

/// A branch point of the compacted trie.
#[derive(Clone, Debug)]
pub(crate) struct Internal {
    /// Length of the longest common path prefix of every leaf below.
    pub extent: usize,
    /// Two-fattest number of `(parent extent, extent]`.
    pub handle_len: usize,
    /// Signature of the handle, as stored in the handle index.
    pub signature: u64,
    pub parent: NodeId,
    /// Children by the bit at position `extent`: `[0]` is the 0-side.
    pub children: [NodeId; 2],
    /// Per side, the first node down that side's spine that is a leaf or
    /// whose extent reaches [`jump_length`] of this node's handle.
    pub jumps: [NodeId; 2],
    /// Some leaf below this node, owned exclusively by it.
    pub reference: NodeId,
}

#[derive(Clone, Debug)]
pub(crate) struct Leaf {
    pub key: BitVec,
    pub parent: NodeId,
    pub prev: NodeId,
    pub next: NodeId,
    /// The internal node whose reference leaf this is, if any.
    pub referrer: NodeId,
}

#[derive(Clone, Debug)]
pub(crate) enum Node {
    Internal(Internal),
    Leaf(Leaf),
    Vacant { next_free: NodeId },
}

#[derive(Clone, Default)]
pub(crate) struct NodeArena {
    slots: Vec<Node>,
    free_head: Option<NodeId>,
    live: usize,
}

impl NodeArena {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_head: None,
            live: 0,
        }
    }

    /// Number of live nodes.
    #[inline]
    pub(crate) fn live(&self) -> usize {
        self.live
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        debug_assert!(!matches!(node, Node::Vacant { .. }));
        self.live += 1;
        match self.free_head {
            Some(id) => {
                let slot = &mut self.slots[id.index()];
                let Node::Vacant { next_free } = *slot else {
                    unreachable!("free list points at live {id:?}");
                };
                self.free_head = (!next_free.is_null()).then_some(next_free);
                *slot = node;
                id
            }
            None => {
                let id = NodeId::new(self.slots.len());
                self.slots.push(node);
                id
            }
        }
    }

    pub(crate) fn alloc_leaf(&mut self, key: BitVec) -> NodeId {
        self.alloc(Node::Leaf(Leaf {
            key,
            parent: NodeId::NULL,
            prev: NodeId::NULL,
            next: NodeId::NULL,
            referrer: NodeId::NULL,
        }))
    }

    /// Releases `id` and returns what it held.
    pub(crate) fn free(&mut self, id: NodeId) -> Node {
        let next_free = self.free_head.unwrap_or(NodeId::NULL);
        let node = std::mem::replace(&mut self.slots[id.index()], Node::Vacant { next_free });
        debug_assert!(!matches!(node, Node::Vacant { .. }), "double free of {id:?}");
        self.free_head = Some(id);
        self.live -= 1;
        node
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        self.slots.reserve(additional);
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free_head = None;
        self.live = 0;
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        // Trailing vacant slots cannot be dropped without rewriting the free
        // list, so only spare capacity is released.
        self.slots.shrink_to_fit();
    }

    pub(crate) fn memory_usage(&self) -> usize {
        let keys: usize = self
            .slots
            .iter()
            .map(|n| match n {
                Node::Leaf(l) => l.key.heap_size(),
                _ => 0,
            })
            .sum();
        self.slots.capacity() * std::mem::size_of::<Node>() + keys
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.slots[id.index()]
    }

    #[inline]
    pub(crate) fn is_leaf(&self, id: NodeId) -> bool {
        matches!(self.node(id), Node::Leaf(_))
    }

    #[inline]
    pub(crate) fn internal(&self, id: NodeId) -> &Internal {
        match self.node(id) {
            Node::Internal(n) => n,
            other => unreachable!("{id:?} is not internal: {other:?}"),
        }
    }

    #[inline]
    pub(crate) fn internal_mut(&mut self, id: NodeId) -> &mut Internal {
        match &mut self.slots[id.index()] {
            Node::Internal(n) => n,
            other => unreachable!("{id:?} is not internal: {other:?}"),
        }
    }

    #[inline]
    pub(crate) fn leaf(&self, id: NodeId) -> &Leaf {
        match self.node(id) {
            Node::Leaf(l) => l,
            other => unreachable!("{id:?} is not a leaf: {other:?}"),
        }
    }

    #[inline]
    pub(crate) fn leaf_mut(&mut self, id: NodeId) -> &mut Leaf {
        match &mut self.slots[id.index()] {
            Node::Leaf(l) => l,
            other => unreachable!("{id:?} is not a leaf: {other:?}"),
        }
    }

    #[inline]
    pub(crate) fn parent(&self, id: NodeId) -> NodeId {
        match self.node(id) {
            Node::Internal(n) => n.parent,
            Node::Leaf(l) => l.parent,
            Node::Vacant { .. } => unreachable!("parent of vacant {id:?}"),
        }
    }

    #[inline]
    pub(crate) fn set_parent(&mut self, id: NodeId, parent: NodeId) {
        match &mut self.slots[id.index()] {
            Node::Internal(n) => n.parent = parent,
            Node::Leaf(l) => l.parent = parent,
            Node::Vacant { .. } => unreachable!("set_parent on vacant {id:?}"),
        }
    }

    #[inline]
    pub(crate) fn child(&self, id: NodeId, bit: bool) -> NodeId {
        self.internal(id).children[bit as usize]
    }

    /// Extent length: the common path prefix for internal nodes, the whole
    /// path for leaves.
    #[inline]
    pub(crate) fn extent(&self, id: NodeId) -> usize {
        match self.node(id) {
            Node::Internal(n) => n.extent,
            Node::Leaf(l) => l.key.path_len(),
            Node::Vacant { .. } => unreachable!("extent of vacant {id:?}"),
        }
    }

    /// A key stored below `id` (its own key for a leaf).
    #[inline]
    pub(crate) fn reference_key(&self, id: NodeId) -> &BitVec {
        match self.node(id) {
            Node::Internal(n) => &self.leaf(n.reference).key,
            Node::Leaf(l) => &l.key,
            Node::Vacant { .. } => unreachable!("reference of vacant {id:?}"),
        }
    }

    /// Points whichever child slot of `parent` holds `old` at `new`.
    pub(crate) fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        let node = self.internal_mut(parent);
        let slot = node
            .children
            .iter_mut()
            .find(|c| **c == old)
            .unwrap_or_else(|| unreachable!("{old:?} is not a child of {parent:?}"));
        *slot = new;
    }

    /// The child of `parent` that is not `child`.
    #[inline]
    pub(crate) fn sibling(&self, parent: NodeId, child: NodeId) -> NodeId {
        let [a, b] = self.internal(parent).children;
        debug_assert!(a == child || b == child);
        if a == child {
            b
        } else {
            a
        }
    }

    /// Whether `id` is `top` or lies below it.
    pub(crate) fn in_subtree(&self, id: NodeId, top: NodeId) -> bool {
        if id == top {
            return true;
        }
        let extent = match self.node(top) {
            Node::Internal(n) => n.extent,
            _ => return false,
        };
        self.extent(id) > extent && self.reference_key(id).path_lcp(self.reference_key(top)) >= extent
    }

    // =========================================================================
    // Jump pointers
    // =========================================================================

    /// The smallest (`side == false`) or largest leaf below `id`.
    pub(crate) fn extreme_leaf(&self, mut id: NodeId, side: bool) -> NodeId {
        while let Node::Internal(n) = self.node(id) {
            id = n.jumps[side as usize];
        }
        id
    }

    /// Walks the `side` spine from `id` (inclusive) to the first node that is
    /// a leaf or has extent `>= reach`.
    ///
    /// Jumps never overshoot: a node on the way with extent below `reach` has
    /// a handle strictly inside `(h, reach)` for the handle `h` that `reach`
    /// derives from, so its own jump length is at most `reach`.
    pub(crate) fn descend(&self, mut id: NodeId, side: bool, reach: usize) -> NodeId {
        while let Node::Internal(n) = self.node(id) {
            if n.extent >= reach {
                break;
            }
            id = n.jumps[side as usize];
        }
        id
    }

    /// Recomputes both jump pointers of `id` from its children's.
    pub(crate) fn reset_jumps(&mut self, id: NodeId) {
        let (children, reach) = {
            let n = self.internal(id);
            (n.children, jump_length(n.handle_len))
        };
        let jumps = [
            self.descend(children[0], false, reach),
            self.descend(children[1], true, reach),
        ];
        self.internal_mut(id).jumps = jumps;
    }
}
