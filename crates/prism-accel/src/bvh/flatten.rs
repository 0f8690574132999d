//! Depth-first linear node layout.

use std::ops::Range;

use prism_math::{Axis, Bounds3};

use crate::arena::{NodeArena, NodeId};

use super::tree::{BuildNode, BuildTree};

/// One node of the flattened hierarchy.
///
/// Nodes are stored in depth-first pre-order: an interior node's first
/// child immediately follows it and the second child's position is stored
/// explicitly. A leaf refers to a contiguous run of the ordered
/// primitive list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearNode {
    /// Bounds of everything below this node.
    pub bounds: Bounds3,
    /// First primitive for leaves, second child for interior nodes.
    offset: u32,
    /// Zero marks an interior node.
    primitive_count: u32,
    axis: u8,
}

impl LinearNode {
    fn leaf(bounds: Bounds3, first_prim: usize, prim_count: usize) -> Self {
        debug_assert!(prim_count > 0);
        Self {
            bounds,
            offset: first_prim as u32,
            primitive_count: prim_count as u32,
            axis: 0,
        }
    }

    fn interior(bounds: Bounds3, axis: Axis) -> Self {
        Self {
            bounds,
            offset: 0,
            primitive_count: 0,
            axis: axis.index() as u8,
        }
    }

    /// True for leaves.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.primitive_count > 0
    }

    /// Range of the ordered primitive list covered by a leaf. Empty for
    /// interior nodes.
    #[inline]
    pub fn primitives(&self) -> Range<usize> {
        let start = self.offset as usize;
        start..start + self.primitive_count as usize
    }

    /// Number of primitives in a leaf; zero for interior nodes.
    #[inline]
    pub fn primitive_count(&self) -> usize {
        self.primitive_count as usize
    }

    /// Index of an interior node's second child.
    #[inline]
    pub fn second_child(&self) -> Option<usize> {
        (!self.is_leaf()).then_some(self.offset as usize)
    }

    /// Axis an interior node was split along.
    #[inline]
    pub fn axis(&self) -> Axis {
        Axis::from_index(self.axis as usize)
    }
}

/// Lay `tree` out in depth-first order.
pub(crate) fn flatten(tree: &BuildTree) -> Vec<LinearNode> {
    let mut nodes = Vec::with_capacity(tree.node_count());
    flatten_node(&tree.arena, tree.root, &mut nodes);
    debug_assert_eq!(nodes.len(), tree.node_count());
    nodes
}

fn flatten_node(arena: &NodeArena<BuildNode>, id: NodeId, nodes: &mut Vec<LinearNode>) -> usize {
    let index = nodes.len();

    match arena[id] {
        BuildNode::Leaf {
            bounds,
            first_prim,
            prim_count,
        } => nodes.push(LinearNode::leaf(bounds, first_prim, prim_count)),
        BuildNode::Interior {
            bounds,
            axis,
            children,
        } => {
            // Reserve the slot; the second child's position is known only
            // once the first subtree is written
            nodes.push(LinearNode::interior(bounds, axis));
            flatten_node(arena, children[0], nodes);
            let second = flatten_node(arena, children[1], nodes);
            nodes[index].offset = second as u32;
        }
    }

    index
}
