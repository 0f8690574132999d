//! Ray representation, ray/box tests and the hit record.

use prism_math::{gamma, Bounds3, Dir3, Point2, Point3, Vec3};

/// Opaque handle to a material owned by the shading system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

/// Opaque handle to an area light owned by the lighting system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightId(pub u32);

/// A ray `origin + t * direction` for `t` in `[0, t_max)`.
///
/// The direction is not normalized, so `t` keeps its meaning when a ray
/// is carried into another coordinate system. `t_max` shrinks as closer
/// hits are found.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    origin: Point3,
    direction: Vec3,
    /// Upper bound of the ray parameter.
    pub t_max: f64,
    /// Precomputed reciprocal of direction components for box tests.
    inv_direction: Vec3,
    /// Sign of direction components (0 if positive, 1 if negative).
    sign: [usize; 3],
}

impl Ray {
    /// Create an unbounded ray from origin and direction.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        let inv = Vec3::new(1.0 / direction.x, 1.0 / direction.y, 1.0 / direction.z);
        let sign = [
            usize::from(inv.x < 0.0),
            usize::from(inv.y < 0.0),
            usize::from(inv.z < 0.0),
        ];
        Self {
            origin,
            direction,
            t_max: f64::INFINITY,
            inv_direction: inv,
            sign,
        }
    }

    /// Bound the ray parameter to `[0, t_max)`.
    #[must_use]
    pub fn with_t_max(mut self, t_max: f64) -> Self {
        self.t_max = t_max;
        self
    }

    /// Origin point of the ray.
    #[inline]
    pub fn origin(&self) -> Point3 {
        self.origin
    }

    /// Direction of the ray (not necessarily unit length).
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Per-axis direction sign, 1 where the component is negative.
    #[inline]
    pub fn sign(&self) -> [usize; 3] {
        self.sign
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + t * self.direction
    }

    /// Conservative overlap test between the ray segment `[0, t_max)` and
    /// a box, used during BVH traversal.
    ///
    /// The sign bits select the near and far slab planes without
    /// branching on direction. Far distances are inflated by
    /// `1 + 2·gamma(3)` so rounding never rejects a box the ray actually
    /// touches. A slab that evaluates to NaN (origin on the plane of an
    /// axis the ray is parallel to) leaves the interval unchanged.
    #[inline]
    pub fn intersect_bounds(&self, bounds: &Bounds3) -> bool {
        let inflate = 1.0 + 2.0 * gamma(3);
        let mut t0 = 0.0;
        let mut t1 = self.t_max;
        for axis in 0..3 {
            let near = (bounds[self.sign[axis]][axis] - self.origin[axis]) * self.inv_direction[axis];
            let far = (bounds[1 - self.sign[axis]][axis] - self.origin[axis])
                * self.inv_direction[axis]
                * inflate;
            if near > t0 {
                t0 = near;
            }
            if far < t1 {
                t1 = far;
            }
            if t0 > t1 {
                return false;
            }
        }
        true
    }

    /// Ray-box intersection using the slab method.
    ///
    /// Returns `Some((t_min, t_max))` with the entry and exit parameters
    /// clipped to `t >= 0`, or `None` if the ray misses the box.
    /// Ignores `self.t_max`.
    #[inline]
    pub fn intersect_aabb(&self, aabb: &Bounds3) -> Option<(f64, f64)> {
        let tx1 = (aabb[self.sign[0]].x - self.origin.x) * self.inv_direction.x;
        let tx2 = (aabb[1 - self.sign[0]].x - self.origin.x) * self.inv_direction.x;

        let mut t_min = tx1;
        let mut t_max = tx2;

        let ty1 = (aabb[self.sign[1]].y - self.origin.y) * self.inv_direction.y;
        let ty2 = (aabb[1 - self.sign[1]].y - self.origin.y) * self.inv_direction.y;

        t_min = t_min.max(ty1);
        t_max = t_max.min(ty2);

        let tz1 = (aabb[self.sign[2]].z - self.origin.z) * self.inv_direction.z;
        let tz2 = (aabb[1 - self.sign[2]].z - self.origin.z) * self.inv_direction.z;

        t_min = t_min.max(tz1);
        t_max = t_max.min(tz2);

        if t_max >= t_min && t_max >= 0.0 {
            Some((t_min.max(0.0), t_max))
        } else {
            None
        }
    }
}

/// Result of a ray-primitive intersection.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// Parameter along the ray where intersection occurs.
    pub t: f64,
    /// 3D intersection point.
    pub point: Point3,
    /// Geometric surface normal (pointing outward).
    pub normal: Dir3,
    /// Surface parameter coordinates (u, v) at intersection.
    pub uv: Point2,
    /// Material of the primitive that was hit, if any.
    pub material: Option<MaterialId>,
    /// Area light attached to the primitive that was hit, if any.
    pub area_light: Option<LightId>,
}

impl RayHit {
    /// Create a hit with no material or light attached.
    pub fn new(t: f64, point: Point3, normal: Dir3, uv: Point2) -> Self {
        Self {
            t,
            point,
            normal,
            uv,
            material: None,
            area_light: None,
        }
    }
}
