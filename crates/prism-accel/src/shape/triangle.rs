//! Ray-triangle intersection (Möller–Trumbore).

use prism_math::{Bounds3, Dir3, Point2, Point3};

use super::Shape;
use crate::{Ray, RayHit};

/// A single triangle. The normal follows the winding `v0 → v1 → v2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// Vertices in world space.
    pub vertices: [Point3; 3],
}

impl Triangle {
    /// Create a triangle from three vertices.
    pub fn new(v0: Point3, v1: Point3, v2: Point3) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Returns `(t, u, v)` with barycentric `u`, `v` for hits in range.
    fn hit_params(&self, ray: &Ray) -> Option<(f64, f64, f64)> {
        let [v0, v1, v2] = self.vertices;
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let d = ray.direction();

        let p = d.cross(&e2);
        let det = e1.dot(&p);
        if det.abs() < 1e-14 {
            // Ray parallel to the plane, or degenerate triangle
            return None;
        }
        let inv_det = 1.0 / det;

        let s = ray.origin() - v0;
        let u = s.dot(&p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&e1);
        let v = d.dot(&q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = e2.dot(&q) * inv_det;
        (t > 0.0 && t < ray.t_max).then_some((t, u, v))
    }
}

impl Shape for Triangle {
    fn world_bound(&self) -> Bounds3 {
        Bounds3::from_points(&self.vertices)
    }

    fn intersect(&self, ray: &Ray) -> Option<RayHit> {
        let (t, u, v) = self.hit_params(ray)?;
        let [v0, v1, v2] = self.vertices;
        let normal = Dir3::new_normalize((v1 - v0).cross(&(v2 - v0)));
        Some(RayHit::new(t, ray.at(t), normal, Point2::new(u, v)))
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        self.hit_params(ray).is_some()
    }

    fn area(&self) -> f64 {
        let [v0, v1, v2] = self.vertices;
        0.5 * (v1 - v0).cross(&(v2 - v0)).norm()
    }
}
