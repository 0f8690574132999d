//! Instanced primitive placed by an affine transform.

use prism_math::{Bounds3, Dir3, Transform};

use super::{Primitive, SharedPrimitive};
use crate::error::{AccelError, Result};
use crate::{LightId, MaterialId, Ray, RayHit};

/// A shared primitive (often a whole BVH) placed in the world by a
/// primitive-to-world transform.
#[derive(Debug, Clone)]
pub struct TransformedPrimitive {
    primitive: SharedPrimitive,
    primitive_to_world: Transform,
    world_to_primitive: Transform,
}

impl TransformedPrimitive {
    /// Place `primitive` in the world with `primitive_to_world`.
    pub fn new(primitive: SharedPrimitive, primitive_to_world: Transform) -> Result<Self> {
        let world_to_primitive = primitive_to_world
            .inverse()
            .ok_or(AccelError::SingularTransform)?;
        Ok(Self {
            primitive,
            primitive_to_world,
            world_to_primitive,
        })
    }

    /// Ray carried into primitive space. `t` is preserved because the
    /// direction is transformed without renormalizing.
    fn to_primitive_space(&self, ray: &Ray) -> Ray {
        Ray::new(
            self.world_to_primitive.apply_point(&ray.origin()),
            self.world_to_primitive.apply_vec(&ray.direction()),
        )
        .with_t_max(ray.t_max)
    }
}

impl Primitive for TransformedPrimitive {
    fn world_bound(&self) -> Bounds3 {
        self.primitive_to_world
            .apply_bounds(&self.primitive.world_bound())
    }

    fn intersect(&self, ray: &mut Ray) -> Option<RayHit> {
        let mut local = self.to_primitive_space(ray);
        let mut hit = self.primitive.intersect(&mut local)?;
        ray.t_max = local.t_max;

        if !self.primitive_to_world.is_identity() {
            hit.point = self.primitive_to_world.apply_point(&hit.point);
            hit.normal = Dir3::new_normalize(
                self.primitive_to_world
                    .apply_normal(&hit.normal.into_inner()),
            );
        }
        Some(hit)
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        self.primitive.intersect_p(&self.to_primitive_space(ray))
    }

    fn material(&self) -> Option<MaterialId> {
        self.primitive.material()
    }

    fn area_light(&self) -> Option<LightId> {
        self.primitive.area_light()
    }
}
