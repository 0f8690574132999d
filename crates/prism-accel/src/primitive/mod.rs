//! The primitive contract consumed by the accelerator.
//!
//! A primitive couples geometry with the shading handles the renderer
//! needs. The accelerator only ever calls [`Primitive::world_bound`],
//! [`Primitive::intersect`] and [`Primitive::intersect_p`].

mod geometric;
mod transformed;

pub use geometric::GeometricPrimitive;
pub use transformed::TransformedPrimitive;

use std::fmt;
use std::sync::Arc;

use prism_math::Bounds3;

use crate::{LightId, MaterialId, Ray, RayHit};

/// Shared handle to a primitive.
///
/// Primitives are referenced both by the accelerator and by callers
/// (for example light lists); a primitive lives as long as its longest
/// holder.
pub type SharedPrimitive = Arc<dyn Primitive>;

/// Bounded, ray-intersectable scene element.
pub trait Primitive: Send + Sync + fmt::Debug {
    /// World-space bounding box.
    fn world_bound(&self) -> Bounds3;

    /// Closest hit within `(0, ray.t_max)`. On a hit, `ray.t_max` is
    /// shrunk to the hit distance.
    fn intersect(&self, ray: &mut Ray) -> Option<RayHit>;

    /// Whether anything is hit within `(0, ray.t_max)`.
    fn intersect_p(&self, ray: &Ray) -> bool;

    /// Material handle, if this primitive carries one.
    fn material(&self) -> Option<MaterialId>;

    /// Area light handle, if this primitive is emissive.
    fn area_light(&self) -> Option<LightId>;
}
