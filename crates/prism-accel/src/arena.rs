//! Index-addressed bump arena for build-time tree nodes.
//!
//! Nodes are appended to a single vector and referenced by [`NodeId`]
//! instead of pointers. Allocation is O(1) amortized, there is no
//! per-node free, and the whole arena is released or reset at once.
//! Parallel builders fill private arenas and merge them with
//! [`NodeArena::absorb`].

use std::ops::Index;

/// Index of a node inside a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Position of the node in its arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The same node after its arena was appended behind `offset` others.
    #[inline]
    #[must_use]
    pub fn shifted(self, offset: u32) -> Self {
        Self(self.0 + offset)
    }
}

/// Nodes that refer to other nodes of the same arena.
pub trait Relocate {
    /// Shift every contained [`NodeId`] by `offset`.
    fn relocate(&mut self, offset: u32);
}

/// Append-only node storage.
#[derive(Debug, Clone)]
pub struct NodeArena<T> {
    nodes: Vec<T>,
}

impl<T> NodeArena<T> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Create an empty arena with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Store a node and return its id.
    ///
    /// # Panics
    ///
    /// Panics if the arena already holds `u32::MAX` nodes; there is no
    /// way to continue a build past that point.
    #[inline]
    pub fn alloc(&mut self, node: T) -> NodeId {
        let index = self.nodes.len();
        assert!(index < u32::MAX as usize, "node arena exhausted");
        self.nodes.push(node);
        NodeId(index as u32)
    }

    /// Look up a node.
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id.index())
    }

    /// Number of nodes allocated so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if nothing has been allocated.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node at once, keeping the allocation for reuse.
    pub fn reset(&mut self) {
        self.nodes.clear();
    }

    /// Iterate over nodes in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &T)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i as u32), node))
    }
}

impl<T: Relocate> NodeArena<T> {
    /// Move all nodes of `other` behind this arena's nodes.
    ///
    /// Returns the offset that ids from `other` must be
    /// [shifted](NodeId::shifted) by to stay valid.
    pub fn absorb(&mut self, other: NodeArena<T>) -> u32 {
        let offset = self.nodes.len() as u32;
        assert!(
            self.nodes.len() + other.nodes.len() < u32::MAX as usize,
            "node arena exhausted"
        );
        self.nodes.extend(other.nodes.into_iter().map(|mut node| {
            node.relocate(offset);
            node
        }));
        offset
    }
}

impl<T> Default for NodeArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<NodeId> for NodeArena<T> {
    type Output = T;

    #[inline]
    fn index(&self, id: NodeId) -> &T {
        &self.nodes[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Link {
        End,
        Next(NodeId),
    }

    impl Relocate for Link {
        fn relocate(&mut self, offset: u32) {
            if let Link::Next(id) = self {
                *id = id.shifted(offset);
            }
        }
    }

    #[test]
    fn test_alloc_and_index() {
        let mut arena = NodeArena::new();
        let a = arena.alloc(Link::End);
        let b = arena.alloc(Link::Next(a));
        assert_eq!(arena.len(), 2);
        assert_eq!(arena[b], Link::Next(a));
        assert_eq!(arena.get(a), Some(&Link::End));
    }

    #[test]
    fn test_absorb_relocates_links() {
        let mut parent = NodeArena::new();
        parent.alloc(Link::End);
        parent.alloc(Link::End);

        let mut child = NodeArena::new();
        let tail = child.alloc(Link::End);
        let head = child.alloc(Link::Next(tail));

        let offset = parent.absorb(child);
        assert_eq!(offset, 2);
        let head = head.shifted(offset);
        assert_eq!(parent[head], Link::Next(tail.shifted(offset)));
        assert_eq!(parent.len(), 4);
    }

    #[test]
    fn test_reset_keeps_capacity() {
        let mut arena = NodeArena::with_capacity(16);
        for _ in 0..10 {
            arena.alloc(Link::End);
        }
        arena.reset();
        assert!(arena.is_empty());
        assert!(arena.nodes.capacity() >= 16);
        assert_eq!(arena.alloc(Link::End).index(), 0);
    }
}
