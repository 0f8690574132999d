//! Summary statistics of a flattened hierarchy.

use serde::{Deserialize, Serialize};

use super::flatten::LinearNode;

/// Shape summary of a built hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BvhStats {
    /// Nodes with two children.
    pub interior_nodes: usize,
    /// Nodes referring to primitives.
    pub leaf_nodes: usize,
    /// Primitives referenced by leaves.
    pub primitives: usize,
    /// Largest leaf.
    pub max_leaf_primitives: usize,
    /// Nodes on the longest root-to-leaf path; zero when empty.
    pub depth: usize,
    /// Memory held by the linear node array.
    pub node_bytes: usize,
}

impl BvhStats {
    /// Walk `nodes` and summarize them.
    pub fn from_nodes(nodes: &[LinearNode]) -> Self {
        let mut stats = Self {
            node_bytes: std::mem::size_of_val(nodes),
            ..Self::default()
        };
        if nodes.is_empty() {
            return stats;
        }

        let mut stack = vec![(0usize, 1usize)];
        while let Some((index, depth)) = stack.pop() {
            let node = &nodes[index];
            stats.depth = stats.depth.max(depth);
            match node.second_child() {
                None => {
                    stats.leaf_nodes += 1;
                    stats.primitives += node.primitive_count();
                    stats.max_leaf_primitives = stats.max_leaf_primitives.max(node.primitive_count());
                }
                Some(second) => {
                    stats.interior_nodes += 1;
                    stack.push((second, depth + 1));
                    stack.push((index + 1, depth + 1));
                }
            }
        }
        stats
    }

    /// Total node count.
    pub fn nodes(&self) -> usize {
        self.interior_nodes + self.leaf_nodes
    }

    /// Average primitives per leaf.
    pub fn mean_leaf_primitives(&self) -> f64 {
        if self.leaf_nodes == 0 {
            0.0
        } else {
            self.primitives as f64 / self.leaf_nodes as f64
        }
    }
}
