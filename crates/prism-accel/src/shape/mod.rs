//! Geometric shapes that primitives wrap.
//!
//! A shape knows its world-space bounds and how to intersect a ray.
//! Everything else (materials, lights) lives on the primitive.

mod cuboid;
mod sphere;
mod triangle;

pub use cuboid::Cuboid;
pub use sphere::Sphere;
pub use triangle::Triangle;

use std::fmt;

use prism_math::Bounds3;

use crate::{Ray, RayHit};

/// Ray-intersectable geometry in world space.
pub trait Shape: Send + Sync + fmt::Debug {
    /// World-space bounding box.
    fn world_bound(&self) -> Bounds3;

    /// Closest intersection with `0 < t < ray.t_max`, if any.
    fn intersect(&self, ray: &Ray) -> Option<RayHit>;

    /// Whether any intersection with `0 < t < ray.t_max` exists.
    fn intersect_p(&self, ray: &Ray) -> bool {
        self.intersect(ray).is_some()
    }

    /// Surface area.
    fn area(&self) -> f64;
}
