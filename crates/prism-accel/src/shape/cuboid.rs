//! Axis-aligned solid box.

use prism_math::{Bounds3, Dir3, Point2, Vec3};

use super::Shape;
use crate::{Ray, RayHit};

/// An axis-aligned box. Rays starting inside hit the exit face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cuboid {
    /// Extent of the box.
    pub bounds: Bounds3,
}

impl Cuboid {
    /// Create a box from its extent.
    pub fn new(bounds: Bounds3) -> Self {
        Self { bounds }
    }

    fn nearest_t(&self, ray: &Ray) -> Option<f64> {
        let (t_enter, t_exit) = ray.intersect_aabb(&self.bounds)?;
        let t = if t_enter > 0.0 { t_enter } else { t_exit };
        (t > 0.0 && t < ray.t_max).then_some(t)
    }
}

impl Shape for Cuboid {
    fn world_bound(&self) -> Bounds3 {
        self.bounds
    }

    fn intersect(&self, ray: &Ray) -> Option<RayHit> {
        let t = self.nearest_t(ray)?;
        let point = ray.at(t);

        // The face hit is the one the point lies closest to
        let mut best_axis = 0;
        let mut best_side = 0;
        let mut best_dist = f64::INFINITY;
        for axis in 0..3 {
            for side in 0..2 {
                let dist = (point[axis] - self.bounds[side][axis]).abs();
                if dist < best_dist {
                    best_dist = dist;
                    best_axis = axis;
                    best_side = side;
                }
            }
        }
        let mut n = Vec3::zeros();
        n[best_axis] = if best_side == 0 { -1.0 } else { 1.0 };

        // Face-local coordinates over the two remaining axes
        let offset = self.bounds.offset(&point);
        let (ua, va) = ((best_axis + 1) % 3, (best_axis + 2) % 3);
        let uv = Point2::new(offset[ua], offset[va]);

        Some(RayHit::new(t, point, Dir3::new_unchecked(n), uv))
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        self.nearest_t(ray).is_some()
    }

    fn area(&self) -> f64 {
        self.bounds.surface_area()
    }
}
