//! Ray-sphere intersection (quadratic equation).

use std::f64::consts::PI;

use prism_math::{Bounds3, Dir3, Point2, Point3, Vec3};

use super::Shape;
use crate::{Ray, RayHit};

/// A full sphere given by center and radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// Center in world space.
    pub center: Point3,
    /// Radius (positive).
    pub radius: f64,
}

impl Sphere {
    /// Create a sphere.
    pub fn new(center: Point3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Both roots of `|o + t*d - c|^2 = r^2`, ascending, or `None` if the
    /// ray misses the sphere entirely.
    fn roots(&self, ray: &Ray) -> Option<(f64, f64)> {
        let oc = ray.origin() - self.center;
        let d = ray.direction();

        let a = d.dot(&d);
        let b = 2.0 * oc.dot(&d);
        let c = oc.dot(&oc) - self.radius * self.radius;

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 || a == 0.0 {
            return None;
        }

        // Numerically stable form: avoid cancellation between -b and sqrt
        let sqrt_disc = discriminant.sqrt();
        let q = if b < 0.0 {
            -0.5 * (b - sqrt_disc)
        } else {
            -0.5 * (b + sqrt_disc)
        };
        let (t0, t1) = if q == 0.0 {
            (0.0, 0.0)
        } else {
            (q / a, c / q)
        };
        Some(if t0 <= t1 { (t0, t1) } else { (t1, t0) })
    }

    /// Nearest root inside `(0, t_max)`.
    fn nearest_t(&self, ray: &Ray) -> Option<f64> {
        let (t0, t1) = self.roots(ray)?;
        if t0 >= ray.t_max || t1 <= 0.0 {
            return None;
        }
        if t0 > 0.0 {
            Some(t0)
        } else if t1 < ray.t_max {
            Some(t1)
        } else {
            None
        }
    }

    /// Longitude/latitude of a surface point: u in [0, 2π), v in [-π/2, π/2].
    fn uv(&self, point: &Point3) -> Point2 {
        let to_point = (point - self.center) / self.radius;
        let v = to_point.z.clamp(-1.0, 1.0).asin();
        if to_point.x.abs() < 1e-12 && to_point.y.abs() < 1e-12 {
            // At a pole longitude is undefined
            return Point2::new(0.0, v);
        }
        let u = to_point.y.atan2(to_point.x);
        let u = if u < 0.0 { u + 2.0 * PI } else { u };
        Point2::new(u, v)
    }
}

impl Shape for Sphere {
    fn world_bound(&self) -> Bounds3 {
        let r = Vec3::repeat(self.radius);
        Bounds3::new(self.center - r, self.center + r)
    }

    fn intersect(&self, ray: &Ray) -> Option<RayHit> {
        let t = self.nearest_t(ray)?;
        let point = ray.at(t);
        let normal = Dir3::new_normalize(point - self.center);
        Some(RayHit::new(t, point, normal, self.uv(&point)))
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        self.nearest_t(ray).is_some()
    }

    fn area(&self) -> f64 {
        4.0 * PI * self.radius * self.radius
    }
}
