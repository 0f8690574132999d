//! Shape plus shading handles.

use std::sync::Arc;

use prism_math::Bounds3;

use super::Primitive;
use crate::shape::Shape;
use crate::{LightId, MaterialId, Ray, RayHit};

/// A shape with an optional material and area light.
#[derive(Debug, Clone)]
pub struct GeometricPrimitive {
    shape: Arc<dyn Shape>,
    material: Option<MaterialId>,
    area_light: Option<LightId>,
}

impl GeometricPrimitive {
    /// Wrap a shape with no material or light.
    pub fn new(shape: Arc<dyn Shape>) -> Self {
        Self {
            shape,
            material: None,
            area_light: None,
        }
    }

    /// Attach a material.
    #[must_use]
    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    /// Attach an area light.
    #[must_use]
    pub fn with_area_light(mut self, light: LightId) -> Self {
        self.area_light = Some(light);
        self
    }

    /// The wrapped shape.
    pub fn shape(&self) -> &Arc<dyn Shape> {
        &self.shape
    }
}

impl Primitive for GeometricPrimitive {
    fn world_bound(&self) -> Bounds3 {
        self.shape.world_bound()
    }

    fn intersect(&self, ray: &mut Ray) -> Option<RayHit> {
        let mut hit = self.shape.intersect(ray)?;
        ray.t_max = hit.t;
        hit.material = self.material;
        hit.area_light = self.area_light;
        Some(hit)
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        self.shape.intersect_p(ray)
    }

    fn material(&self) -> Option<MaterialId> {
        self.material
    }

    fn area_light(&self) -> Option<LightId> {
        self.area_light
    }
}
