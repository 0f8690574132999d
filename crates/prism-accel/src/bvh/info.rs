//! Per-primitive bounds and centroids consumed by the builders.

use prism_math::{Bounds3, Point3};
use rayon::prelude::*;

use crate::primitive::SharedPrimitive;

/// Build-time record for one input primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PrimitiveInfo {
    /// Position in the caller's primitive list.
    pub index: usize,
    pub bounds: Bounds3,
    pub centroid: Point3,
}

impl PrimitiveInfo {
    pub fn new(index: usize, bounds: Bounds3) -> Self {
        Self {
            index,
            bounds,
            centroid: bounds.centroid(),
        }
    }

    /// One record per primitive, in input order.
    pub fn collect(primitives: &[SharedPrimitive]) -> Vec<Self> {
        primitives
            .par_iter()
            .enumerate()
            .map(|(index, primitive)| Self::new(index, primitive.world_bound()))
            .collect()
    }
}

/// Union of the primitive bounds in `infos`.
pub(crate) fn range_bounds(infos: &[PrimitiveInfo]) -> Bounds3 {
    infos
        .iter()
        .fold(Bounds3::empty(), |acc, info| acc.union(&info.bounds))
}

/// Bounds of the primitive centroids in `infos`.
pub(crate) fn centroid_bounds(infos: &[PrimitiveInfo]) -> Bounds3 {
    infos
        .iter()
        .fold(Bounds3::empty(), |acc, info| acc.union_point(&info.centroid))
}
