//! Scene and ray generators shared by the unit tests.

use std::sync::Arc;

use prism_math::{Bounds3, Point3, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::primitive::{GeometricPrimitive, SharedPrimitive};
use crate::shape::{Cuboid, Sphere, Triangle};
use crate::{Ray, RayHit};

/// Unit cube centered on `center`.
pub(crate) fn unit_box(center: Point3) -> SharedPrimitive {
    let half = Vec3::repeat(0.5);
    Arc::new(GeometricPrimitive::new(Arc::new(Cuboid::new(Bounds3::new(
        center - half,
        center + half,
    )))))
}

/// Unit cubes centered at `(x, 0, 0)` for each `x`.
pub(crate) fn boxes_along_x(xs: &[f64]) -> Vec<SharedPrimitive> {
    xs.iter()
        .map(|&x| unit_box(Point3::new(x, 0.0, 0.0)))
        .collect()
}

/// `n` spheres scattered through `[-10, 10]³`.
pub(crate) fn random_spheres(n: usize, seed: u64) -> Vec<SharedPrimitive> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let center = Point3::new(
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
            );
            let radius = rng.gen_range(0.05..0.5);
            Arc::new(GeometricPrimitive::new(Arc::new(Sphere::new(center, radius))))
                as SharedPrimitive
        })
        .collect()
}

/// `n` unbounded rays from `[-15, 15]³` in arbitrary directions.
pub(crate) fn random_rays(n: usize, seed: u64) -> Vec<Ray> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let origin = Point3::new(
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
            );
            let direction = Vec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            Ray::new(origin, direction)
        })
        .collect()
}

/// Spacing of the [`grid_boxes`] lattice.
const GRID_SPACING: f64 = 3.0;

/// Unit cubes on a 10x10x10 lattice with [`GRID_SPACING`] between centers.
pub(crate) fn grid_boxes() -> Vec<SharedPrimitive> {
    let mut prims = Vec::with_capacity(1000);
    for i in -5..5 {
        for j in -5..5 {
            for k in -5..5 {
                prims.push(unit_box(Point3::new(
                    GRID_SPACING * i as f64,
                    GRID_SPACING * j as f64,
                    GRID_SPACING * k as f64,
                )));
            }
        }
    }
    prims
}

/// `n` triangles lying in planes perpendicular to a coordinate axis, at
/// integer offsets in `[-10, 10]`. Their bounds are flat on that axis.
pub(crate) fn axis_aligned_triangles(n: usize, seed: u64) -> Vec<SharedPrimitive> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let axis = rng.gen_range(0..3usize);
            let mut v0 = Point3::new(
                rng.gen_range(-12.0..12.0),
                rng.gen_range(-12.0..12.0),
                rng.gen_range(-12.0..12.0),
            );
            v0[axis] = rng.gen_range(-10i32..=10) as f64;
            let mut edge = || {
                let mut e = Vec3::new(
                    rng.gen_range(-2.0..2.0),
                    rng.gen_range(-2.0..2.0),
                    rng.gen_range(-2.0..2.0),
                );
                e[axis] = 0.0;
                e
            };
            let (e1, e2) = (edge(), edge());
            Arc::new(GeometricPrimitive::new(Arc::new(Triangle::new(
                v0,
                v0 + e1,
                v0 + e2,
            )))) as SharedPrimitive
        })
        .collect()
}

/// `n` rays along a positive or negative coordinate axis.
///
/// Origin coordinates are often snapped onto integer planes or onto
/// [`grid_boxes`] faces, so the zero direction components meet slabs
/// whose distance evaluates to `0 * inf`.
pub(crate) fn axis_parallel_rays(n: usize, seed: u64) -> Vec<Ray> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let mut origin = Point3::origin();
            for axis in 0..3usize {
                origin[axis] = match rng.gen_range(0..3) {
                    0 => rng.gen_range(-16.0..16.0),
                    1 => rng.gen_range(-10i32..=10) as f64,
                    _ => GRID_SPACING * rng.gen_range(-5i32..5) as f64 + 0.5,
                };
            }
            let mut direction = Vec3::zeros();
            direction[rng.gen_range(0..3usize)] = 1.0;
            if rng.gen_bool(0.5) {
                // Negation also flips the zero components to -0.0
                direction = -direction;
            }
            Ray::new(origin, direction)
        })
        .collect()
}

/// Closest hit by testing every primitive.
pub(crate) fn brute_force_intersect(prims: &[SharedPrimitive], ray: &mut Ray) -> Option<RayHit> {
    let mut closest = None;
    for prim in prims {
        if let Some(hit) = prim.intersect(ray) {
            closest = Some(hit);
        }
    }
    closest
}

/// Any hit by testing every primitive.
pub(crate) fn brute_force_intersect_p(prims: &[SharedPrimitive], ray: &Ray) -> bool {
    prims.iter().any(|p| p.intersect_p(ray))
}
