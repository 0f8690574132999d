//! Top-down builder for the Middle, EqualCounts and SAH strategies.

use crate::arena::{NodeArena, NodeId};

use super::info::{centroid_bounds, range_bounds, PrimitiveInfo};
use super::sah::{best_split, bucket_index, median_split, partition, SMALL_RANGE};
use super::settings::SplitMethod;
use super::tree::{make_interior, make_leaf, BuildNode, BuildTree};
use prism_math::{Axis, Bounds3};

/// Ranges larger than this build their two halves on separate threads.
const PARALLEL_BUILD_THRESHOLD: usize = 128 * 1024;

/// Past this depth every split falls back to the centroid median, which
/// halves the range and so bounds the final depth.
pub(crate) const MAX_SPLIT_DEPTH: usize = 32;

/// Builds a [`BuildTree`] by recursive partitioning of primitive records.
///
/// The records are reordered in place; leaf `first_prim` offsets index the
/// reordered slice.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RecursiveBuilder {
    method: SplitMethod,
    max_prims_in_node: usize,
}

impl RecursiveBuilder {
    pub fn new(method: SplitMethod, max_prims_in_node: usize) -> Self {
        Self {
            method,
            max_prims_in_node,
        }
    }

    /// Build over a non-empty slice of records.
    pub fn build(&self, infos: &mut [PrimitiveInfo]) -> BuildTree {
        self.build_subtree(infos, 0, 0)
    }

    fn build_subtree(&self, infos: &mut [PrimitiveInfo], offset: usize, depth: usize) -> BuildTree {
        let mut arena = NodeArena::with_capacity(2 * infos.len());
        let root = self.build_range(&mut arena, infos, offset, depth);
        BuildTree { arena, root }
    }

    fn build_range(
        &self,
        arena: &mut NodeArena<BuildNode>,
        infos: &mut [PrimitiveInfo],
        offset: usize,
        depth: usize,
    ) -> NodeId {
        let n = infos.len();
        let bounds = range_bounds(infos);
        if n == 1 {
            return make_leaf(arena, bounds, offset, n);
        }

        // Coincident centroids cannot be separated along any axis
        let centroid_bounds = centroid_bounds(infos);
        let axis = centroid_bounds.maximum_extent();
        let a = axis.index();
        if centroid_bounds.max[a] == centroid_bounds.min[a] {
            return make_leaf(arena, bounds, offset, n);
        }

        let Some(mid) = self.split(infos, &bounds, &centroid_bounds, axis, depth) else {
            return make_leaf(arena, bounds, offset, n);
        };

        let (left, right) = infos.split_at_mut(mid);
        let (left, right) = if n > PARALLEL_BUILD_THRESHOLD {
            let (left, right) = rayon::join(
                || self.build_subtree(left, offset, depth + 1),
                || self.build_subtree(right, offset + mid, depth + 1),
            );
            (left.absorb_into(arena), right.absorb_into(arena))
        } else {
            let left = self.build_range(arena, left, offset, depth + 1);
            let right = self.build_range(arena, right, offset + mid, depth + 1);
            (left, right)
        };
        make_interior(arena, axis, left, right)
    }

    /// Partition `infos` and return the split point, or `None` to make a leaf.
    fn split(
        &self,
        infos: &mut [PrimitiveInfo],
        bounds: &Bounds3,
        centroid_bounds: &Bounds3,
        axis: Axis,
        depth: usize,
    ) -> Option<usize> {
        let method = if depth >= MAX_SPLIT_DEPTH {
            SplitMethod::EqualCounts
        } else {
            self.method
        };
        let a = axis.index();

        match method {
            SplitMethod::Middle => Some(
                midpoint_split(infos, centroid_bounds, axis)
                    .unwrap_or_else(|| median_split(infos, |info| info.centroid[a])),
            ),
            SplitMethod::EqualCounts => Some(median_split(infos, |info| info.centroid[a])),
            SplitMethod::Sah | SplitMethod::Hlbvh => {
                self.sah_split(infos, bounds, centroid_bounds, axis)
            }
        }
    }

    fn sah_split(
        &self,
        infos: &mut [PrimitiveInfo],
        bounds: &Bounds3,
        centroid_bounds: &Bounds3,
        axis: Axis,
    ) -> Option<usize> {
        let n = infos.len();
        let a = axis.index();
        if n <= SMALL_RANGE {
            return Some(median_split(infos, |info| info.centroid[a]));
        }

        let items = infos.iter().map(|info| (info.centroid, info.bounds, 1));
        let candidate = best_split(items, centroid_bounds, axis, bounds);
        let must_split = n > self.max_prims_in_node;

        match candidate {
            Some(split) if must_split || split.cost < n as f64 => Some(partition(infos, |info| {
                bucket_index(centroid_bounds, axis, &info.centroid) <= split.bucket
            })),
            // A leaf is cheaper than the best split
            Some(_) => None,
            None if must_split => Some(median_split(infos, |info| info.centroid[a])),
            None => None,
        }
    }
}

/// Partition at the midpoint of the centroid extent. Returns `None` when
/// every centroid lands on one side.
pub(crate) fn midpoint_split(
    infos: &mut [PrimitiveInfo],
    centroid_bounds: &Bounds3,
    axis: Axis,
) -> Option<usize> {
    let a = axis.index();
    let pmid = 0.5 * (centroid_bounds.min[a] + centroid_bounds.max[a]);
    let mid = partition(infos, |info| info.centroid[a] < pmid);
    (mid != 0 && mid != infos.len()).then_some(mid)
}
