#![warn(missing_docs)]

//! Bounding volume hierarchy ray intersection accelerator.
//!
//! Builds a binary BVH over shared, bounded primitives and answers
//! closest-hit and any-hit queries in sub-linear time.
//!
//! # Architecture
//!
//! - [`Ray`] - Ray with a mutable upper parameter bound
//! - [`RayHit`] - Intersection record with shading handles
//! - [`shape`] - Sphere, box and triangle geometry
//! - [`primitive`] - The [`Primitive`] contract, geometric and instanced primitives
//! - [`bvh`] - Construction (SAH, HLBVH, Middle, EqualCounts) and traversal
//! - [`arena`] - Index-based node storage used while building
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use prism_accel::{BvhAccel, GeometricPrimitive, Ray, SharedPrimitive, Sphere, SplitMethod};
//! use prism_math::{Point3, Vec3};
//!
//! let spheres: Vec<SharedPrimitive> = (0..8)
//!     .map(|i| {
//!         let sphere = Sphere::new(Point3::new(i as f64 * 3.0, 0.0, 0.0), 1.0);
//!         Arc::new(GeometricPrimitive::new(Arc::new(sphere))) as SharedPrimitive
//!     })
//!     .collect();
//! let bvh = BvhAccel::new(spheres, 4, SplitMethod::Sah);
//!
//! let mut ray = Ray::new(Point3::new(-5.0, 0.0, 0.0), Vec3::x());
//! let hit = bvh.intersect(&mut ray).unwrap();
//! assert!((hit.t - 4.0).abs() < 1e-12);
//! ```

pub mod arena;
pub mod bvh;
mod error;
pub mod primitive;
mod ray;
pub mod shape;

#[cfg(test)]
mod test_scenes;

pub use bvh::{BvhAccel, BvhSettings, BvhStats, LinearNode, SplitMethod};
pub use error::{AccelError, Result};
pub use primitive::{GeometricPrimitive, Primitive, SharedPrimitive, TransformedPrimitive};
pub use ray::{LightId, MaterialId, Ray, RayHit};
pub use shape::{Cuboid, Shape, Sphere, Triangle};
