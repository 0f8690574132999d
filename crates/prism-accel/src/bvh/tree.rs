//! Pointer-free build tree shared by every construction strategy.

use prism_math::{Axis, Bounds3};

use crate::arena::{NodeArena, NodeId, Relocate};

/// Node of the transient build tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum BuildNode {
    Leaf {
        bounds: Bounds3,
        /// Start of the leaf's run in the ordered primitive list.
        first_prim: usize,
        prim_count: usize,
    },
    Interior {
        bounds: Bounds3,
        /// Axis the children were partitioned along.
        axis: Axis,
        children: [NodeId; 2],
    },
}

impl BuildNode {
    pub fn bounds(&self) -> Bounds3 {
        match self {
            BuildNode::Leaf { bounds, .. } | BuildNode::Interior { bounds, .. } => *bounds,
        }
    }
}

impl Relocate for BuildNode {
    fn relocate(&mut self, offset: u32) {
        if let BuildNode::Interior { children, .. } = self {
            for child in children {
                *child = child.shifted(offset);
            }
        }
    }
}

/// A finished build tree and its root.
#[derive(Debug)]
pub(crate) struct BuildTree {
    pub arena: NodeArena<BuildNode>,
    pub root: NodeId,
}

impl BuildTree {
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    pub fn root_bounds(&self) -> Bounds3 {
        self.arena[self.root].bounds()
    }

    /// Append this tree's nodes to `arena` and return the relocated root.
    pub fn absorb_into(self, arena: &mut NodeArena<BuildNode>) -> NodeId {
        let offset = arena.absorb(self.arena);
        self.root.shifted(offset)
    }
}

pub(crate) fn make_leaf(
    arena: &mut NodeArena<BuildNode>,
    bounds: Bounds3,
    first_prim: usize,
    prim_count: usize,
) -> NodeId {
    arena.alloc(BuildNode::Leaf {
        bounds,
        first_prim,
        prim_count,
    })
}

/// Interior node whose bounds are the union of its children's.
pub(crate) fn make_interior(
    arena: &mut NodeArena<BuildNode>,
    axis: Axis,
    left: NodeId,
    right: NodeId,
) -> NodeId {
    let bounds = arena[left].bounds().union(&arena[right].bounds());
    arena.alloc(BuildNode::Interior {
        bounds,
        axis,
        children: [left, right],
    })
}
