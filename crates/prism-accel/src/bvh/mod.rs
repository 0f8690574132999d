//! Bounding volume hierarchy over shared primitives.
//!
//! Construction runs in four phases:
//!
//! 1. a [`PrimitiveInfo`](info::PrimitiveInfo) record (bounds and
//!    centroid) is computed per primitive,
//! 2. a pointer-free build tree is produced by the selected
//!    [`SplitMethod`], reordering the records so that every leaf covers a
//!    contiguous run,
//! 3. the primitive list is permuted into that order,
//! 4. the tree is flattened into a depth-first array of [`LinearNode`]s
//!    and the build tree is dropped.
//!
//! Queries walk the linear array with a fixed-size stack, visiting the
//! child nearer along the split axis first.

mod flatten;
mod hlbvh;
mod info;
mod recursive;
mod sah;
mod settings;
mod stats;
mod traverse;
mod tree;

pub use flatten::LinearNode;
pub use settings::{BvhSettings, SplitMethod, DEFAULT_MAX_PRIMS_IN_NODE, MAX_PRIMS_IN_NODE_LIMIT};
pub use stats::BvhStats;

use std::sync::Arc;
use std::time::Instant;

use log::{error, info};
use prism_math::Bounds3;

use crate::primitive::{Primitive, SharedPrimitive};
use crate::{LightId, MaterialId, Ray, RayHit};

use hlbvh::HlbvhBuilder;
use info::PrimitiveInfo;
use recursive::RecursiveBuilder;
use settings::clamp_max_prims;

/// Ray intersection accelerator.
///
/// Owns the primitives in leaf order together with the flattened nodes.
/// Immutable after construction and safe to query from many threads.
#[derive(Debug)]
pub struct BvhAccel {
    max_prims_in_node: usize,
    split_method: SplitMethod,
    primitives: Vec<SharedPrimitive>,
    nodes: Vec<LinearNode>,
    stats: BvhStats,
}

impl BvhAccel {
    /// Build a hierarchy over `primitives`.
    ///
    /// `max_prims_in_node` is clamped to `[1, 255]`. An empty input yields
    /// an empty accelerator that reports no hits.
    pub fn new(
        primitives: Vec<SharedPrimitive>,
        max_prims_in_node: usize,
        split_method: SplitMethod,
    ) -> Self {
        let start = Instant::now();
        let max_prims_in_node = clamp_max_prims(max_prims_in_node);

        if primitives.is_empty() {
            info!("bvh: no primitives, built empty {split_method} hierarchy");
            return Self {
                max_prims_in_node,
                split_method,
                primitives,
                nodes: Vec::new(),
                stats: BvhStats::default(),
            };
        }

        let mut infos = PrimitiveInfo::collect(&primitives);
        let tree = match split_method {
            SplitMethod::Hlbvh => HlbvhBuilder::new(max_prims_in_node).build(&mut infos),
            method => RecursiveBuilder::new(method, max_prims_in_node).build(&mut infos),
        };

        let ordered: Vec<SharedPrimitive> = infos
            .iter()
            .map(|info| Arc::clone(&primitives[info.index]))
            .collect();
        let nodes = flatten::flatten(&tree);
        let stats = BvhStats::from_nodes(&nodes);

        info!(
            "bvh: {split_method} build over {} primitives in {:?}: {} nodes ({} leaves, max {} per leaf), depth {}, {} KiB",
            stats.primitives,
            start.elapsed(),
            stats.nodes(),
            stats.leaf_nodes,
            stats.max_leaf_primitives,
            stats.depth,
            stats.node_bytes / 1024,
        );

        Self {
            max_prims_in_node,
            split_method,
            primitives: ordered,
            nodes,
            stats,
        }
    }

    /// Build from a settings record.
    pub fn with_settings(primitives: Vec<SharedPrimitive>, settings: &BvhSettings) -> Self {
        Self::new(primitives, settings.max_prims_in_node, settings.split_method)
    }

    /// Bounds of the whole hierarchy; empty when there are no primitives.
    pub fn world_bound(&self) -> Bounds3 {
        self.nodes
            .first()
            .map_or_else(Bounds3::empty, |root| root.bounds)
    }

    /// Closest hit within `(0, ray.t_max)`. On a hit `ray.t_max` becomes
    /// the hit distance.
    pub fn intersect(&self, ray: &mut Ray) -> Option<RayHit> {
        traverse::intersect(&self.nodes, &self.primitives, ray)
    }

    /// Whether anything is hit within `(0, ray.t_max)`. Stops at the first
    /// hit found.
    pub fn intersect_p(&self, ray: &Ray) -> bool {
        traverse::intersect_p(&self.nodes, &self.primitives, ray)
    }

    /// Primitives in leaf order.
    pub fn primitives(&self) -> &[SharedPrimitive] {
        &self.primitives
    }

    /// Flattened nodes in depth-first order; the root is first.
    pub fn nodes(&self) -> &[LinearNode] {
        &self.nodes
    }

    /// Shape summary of the hierarchy.
    pub fn stats(&self) -> &BvhStats {
        &self.stats
    }

    /// Strategy the hierarchy was built with.
    pub fn split_method(&self) -> SplitMethod {
        self.split_method
    }

    /// Leaf capacity after clamping.
    pub fn max_prims_in_node(&self) -> usize {
        self.max_prims_in_node
    }

    /// True when built over no primitives.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Primitive for BvhAccel {
    fn world_bound(&self) -> Bounds3 {
        BvhAccel::world_bound(self)
    }

    fn intersect(&self, ray: &mut Ray) -> Option<RayHit> {
        BvhAccel::intersect(self, ray)
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        BvhAccel::intersect_p(self, ray)
    }

    /// Aggregates carry no material; hits report the leaf primitive's.
    fn material(&self) -> Option<MaterialId> {
        error!("material() called on a BVH aggregate; query the hit record instead");
        None
    }

    fn area_light(&self) -> Option<LightId> {
        error!("area_light() called on a BVH aggregate; query the hit record instead");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::{GeometricPrimitive, TransformedPrimitive};
    use crate::shape::{Cuboid, Sphere};
    use crate::test_scenes::{
        axis_aligned_triangles, axis_parallel_rays, boxes_along_x, brute_force_intersect,
        brute_force_intersect_p, grid_boxes, random_rays, random_spheres, unit_box,
    };
    use approx::assert_relative_eq;
    use prism_math::{Axis, Point3, Transform, Vec3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const ALL_METHODS: [SplitMethod; 4] = [
        SplitMethod::Sah,
        SplitMethod::Hlbvh,
        SplitMethod::Middle,
        SplitMethod::EqualCounts,
    ];

    fn sphere(x: f64, y: f64, z: f64, r: f64) -> SharedPrimitive {
        Arc::new(GeometricPrimitive::new(Arc::new(Sphere::new(
            Point3::new(x, y, z),
            r,
        ))))
    }

    #[test]
    fn test_empty_accelerator() {
        for method in ALL_METHODS {
            let bvh = BvhAccel::new(Vec::new(), 4, method);
            assert!(bvh.is_empty());
            assert!(bvh.world_bound().is_empty());
            let mut ray = Ray::new(Point3::origin(), Vec3::x());
            assert!(bvh.intersect(&mut ray).is_none());
            assert!(!bvh.intersect_p(&ray));
            assert_eq!(ray.t_max, f64::INFINITY);
            assert_eq!(bvh.stats().depth, 0);
        }
    }

    #[test]
    fn test_single_sphere() {
        for method in ALL_METHODS {
            let bvh = BvhAccel::new(vec![sphere(0.0, 0.0, 0.0, 1.0)], 4, method);
            assert_eq!(bvh.nodes().len(), 1);
            assert!(bvh.nodes()[0].is_leaf());
            assert_eq!(bvh.nodes()[0].primitives(), 0..1);

            let mut ray = Ray::new(Point3::new(0.0, 0.0, -5.0), Vec3::z());
            let hit = bvh.intersect(&mut ray).unwrap();
            assert_relative_eq!(hit.t, 4.0, epsilon = 1e-12);
            assert_relative_eq!(ray.t_max, 4.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_two_spheres_closest_wins() {
        for method in ALL_METHODS {
            let prims = vec![sphere(0.0, 0.0, 10.0, 1.0), sphere(0.0, 0.0, 5.0, 1.0)];
            let bvh = BvhAccel::new(prims, 1, method);
            let mut ray = Ray::new(Point3::origin(), Vec3::z());
            let hit = bvh.intersect(&mut ray).unwrap();
            assert_relative_eq!(hit.t, 4.0, epsilon = 1e-12);
            assert_relative_eq!(hit.point, Point3::new(0.0, 0.0, 4.0), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_three_boxes_sah_root() {
        let bvh = BvhAccel::new(boxes_along_x(&[0.0, 1.0, 2.0]), 1, SplitMethod::Sah);
        let root = bvh.nodes()[0];
        assert!(!root.is_leaf());
        assert_eq!(root.axis(), Axis::X);
        assert_eq!(root.bounds.min, Point3::new(-0.5, -0.5, -0.5));
        assert_eq!(root.bounds.max, Point3::new(2.5, 0.5, 0.5));
        assert_eq!(bvh.stats().leaf_nodes, 3);
    }

    #[test]
    fn test_shadow_ray_blocked() {
        for method in ALL_METHODS {
            let bvh = BvhAccel::new(vec![unit_box(Point3::new(0.0, 0.0, 2.5))], 4, method);
            let shadow = Ray::new(Point3::origin(), Vec3::new(0.0, 0.0, 5.0)).with_t_max(1.0);
            assert!(bvh.intersect_p(&shadow));
            // Blocker beyond the segment end
            let short = Ray::new(Point3::origin(), Vec3::new(0.0, 0.0, 5.0)).with_t_max(0.3);
            assert!(!bvh.intersect_p(&short));
        }
    }

    #[test]
    fn test_coincident_centroids_single_leaf() {
        for method in [SplitMethod::Sah, SplitMethod::Middle, SplitMethod::EqualCounts] {
            let bvh = BvhAccel::new(boxes_along_x(&[0.0; 10]), 4, method);
            assert_eq!(bvh.nodes().len(), 1);
            assert_eq!(bvh.nodes()[0].primitive_count(), 10);
        }
        let hlbvh = BvhAccel::new(boxes_along_x(&[0.0; 10]), 4, SplitMethod::Hlbvh);
        assert_eq!(hlbvh.stats().primitives, 10);
        let mut ray = Ray::new(Point3::new(0.0, 0.0, -5.0), Vec3::z());
        assert_relative_eq!(hlbvh.intersect(&mut ray).unwrap().t, 4.5, epsilon = 1e-12);
    }

    /// Check closest-hit and any-hit answers against a linear scan.
    fn assert_matches_brute_force(bvh: &BvhAccel, prims: &[SharedPrimitive], rays: &[Ray]) {
        let method = bvh.split_method();
        for ray in rays {
            let mut fast = *ray;
            let mut slow = *ray;
            let expected = brute_force_intersect(prims, &mut slow);
            let got = bvh.intersect(&mut fast);
            match (got, expected) {
                (Some(got), Some(expected)) => {
                    assert_relative_eq!(got.t, expected.t, epsilon = 1e-9);
                    assert_relative_eq!(fast.t_max, slow.t_max, epsilon = 1e-9);
                }
                (None, None) => assert_eq!(fast.t_max, ray.t_max),
                (got, expected) => panic!(
                    "{method}: bvh {:?} vs brute force {:?} for {ray:?}",
                    got.map(|h| h.t),
                    expected.map(|h| h.t)
                ),
            }
            assert_eq!(
                bvh.intersect_p(ray),
                brute_force_intersect_p(prims, ray),
                "{method}: {ray:?}"
            );
        }
    }

    #[test]
    fn test_matches_brute_force() {
        let prims = random_spheres(3_000, 42);
        let rays = random_rays(500, 43);
        for method in ALL_METHODS {
            let bvh = BvhAccel::new(prims.clone(), 4, method);
            assert_matches_brute_force(&bvh, &prims, &rays);
        }
    }

    #[test]
    fn test_flat_bounds_and_axis_parallel_rays_match_brute_force() {
        let mut prims = axis_aligned_triangles(1_000, 7);
        prims.extend(grid_boxes());
        let mut rays = axis_parallel_rays(1_000, 8);
        rays.extend(random_rays(500, 9));
        for method in ALL_METHODS {
            let bvh = BvhAccel::new(prims.clone(), 4, method);
            assert_eq!(bvh.stats().primitives, prims.len());
            assert_matches_brute_force(&bvh, &prims, &rays);
        }
    }

    #[test]
    fn test_bounded_rays_match_brute_force() {
        let prims = random_spheres(800, 1);
        let rays: Vec<Ray> = random_rays(300, 2)
            .into_iter()
            .map(|r| r.with_t_max(8.0))
            .collect();
        for method in ALL_METHODS {
            let bvh = BvhAccel::new(prims.clone(), 2, method);
            for ray in &rays {
                let mut fast = *ray;
                let mut slow = *ray;
                assert_eq!(
                    bvh.intersect(&mut fast).is_some(),
                    brute_force_intersect(&prims, &mut slow).is_some()
                );
                assert_eq!(bvh.intersect_p(ray), brute_force_intersect_p(&prims, ray));
            }
        }
    }

    #[test]
    fn test_ten_thousand_spheres_sah_and_hlbvh() {
        let mut rng = StdRng::seed_from_u64(10_000);
        let prims: Vec<SharedPrimitive> = (0..10_000)
            .map(|_| {
                sphere(
                    rng.gen_range(-100.0..100.0),
                    rng.gen_range(-100.0..100.0),
                    rng.gen_range(-100.0..100.0),
                    1.0,
                )
            })
            .collect();
        let sah = BvhAccel::new(prims.clone(), 4, SplitMethod::Sah);
        let hlbvh = BvhAccel::new(prims.clone(), 4, SplitMethod::Hlbvh);
        assert_eq!(sah.stats().primitives, 10_000);
        assert_eq!(hlbvh.stats().primitives, 10_000);
        assert_ne!(sah.nodes(), hlbvh.nodes());

        let rays: Vec<Ray> = (0..300)
            .map(|_| {
                let origin = Point3::new(
                    rng.gen_range(-150.0..150.0),
                    rng.gen_range(-150.0..150.0),
                    -150.0,
                );
                let target = Point3::new(
                    rng.gen_range(-100.0..100.0),
                    rng.gen_range(-100.0..100.0),
                    rng.gen_range(-100.0..100.0),
                );
                Ray::new(origin, target - origin)
            })
            .collect();
        for ray in &rays {
            let expected = brute_force_intersect(&prims, &mut { *ray }).map(|h| h.t);
            assert_eq!(sah.intersect(&mut { *ray }).map(|h| h.t), expected);
            assert_eq!(hlbvh.intersect(&mut { *ray }).map(|h| h.t), expected);
            let occluded = brute_force_intersect_p(&prims, ray);
            assert_eq!(sah.intersect_p(ray), occluded);
            assert_eq!(hlbvh.intersect_p(ray), occluded);
        }
    }

    #[test]
    fn test_structure_invariants() {
        for method in ALL_METHODS {
            let prims = random_spheres(1_500, 17);
            let bvh = BvhAccel::new(prims.clone(), 4, method);
            let nodes = bvh.nodes();

            // Every primitive appears exactly once in leaf order
            let mut covered = vec![0u32; bvh.primitives().len()];
            for node in nodes.iter().filter(|n| n.is_leaf()) {
                for i in node.primitives() {
                    covered[i] += 1;
                    assert!(node.bounds.contains(&bvh.primitives()[i].world_bound()));
                }
            }
            assert!(covered.iter().all(|&c| c == 1), "{method}");

            // Interior bounds enclose both children
            for (i, node) in nodes.iter().enumerate() {
                if let Some(second) = node.second_child() {
                    assert!(node.bounds.contains(&nodes[i + 1].bounds));
                    assert!(node.bounds.contains(&nodes[second].bounds));
                }
            }

            // The ordered list is a permutation of the input
            let mut ptrs: Vec<*const ()> = bvh
                .primitives()
                .iter()
                .map(|p| Arc::as_ptr(p) as *const ())
                .collect();
            let mut input: Vec<*const ()> =
                prims.iter().map(|p| Arc::as_ptr(p) as *const ()).collect();
            ptrs.sort_unstable();
            input.sort_unstable();
            assert_eq!(ptrs, input);

            let expected = prims
                .iter()
                .fold(Bounds3::empty(), |acc, p| acc.union(&p.world_bound()));
            assert_eq!(bvh.world_bound(), expected);
            assert!(bvh.stats().depth < traverse::TRAVERSAL_STACK_SIZE);
        }
    }

    #[test]
    fn test_leaf_capacity() {
        for max_prims in [1, 3, 8] {
            for method in [SplitMethod::Sah, SplitMethod::Hlbvh] {
                let bvh = BvhAccel::new(random_spheres(700, 8), max_prims, method);
                assert!(
                    bvh.stats().max_leaf_primitives <= max_prims,
                    "{method} with {max_prims}"
                );
            }
        }
    }

    #[test]
    fn test_max_prims_is_clamped() {
        let bvh = BvhAccel::new(random_spheres(10, 4), 0, SplitMethod::Sah);
        assert_eq!(bvh.max_prims_in_node(), 1);
        assert_eq!(bvh.stats().max_leaf_primitives, 1);
        let bvh = BvhAccel::new(random_spheres(10, 4), 10_000, SplitMethod::Sah);
        assert_eq!(bvh.max_prims_in_node(), MAX_PRIMS_IN_NODE_LIMIT);
    }

    #[test]
    fn test_deterministic_builds() {
        let prims = random_spheres(2_000, 77);
        for method in ALL_METHODS {
            let a = BvhAccel::new(prims.clone(), 4, method);
            let b = BvhAccel::new(prims.clone(), 4, method);
            assert_eq!(a.nodes(), b.nodes(), "{method}");
        }
    }

    #[test]
    fn test_with_settings() {
        let settings = BvhSettings::from_params(2, "middle");
        let bvh = BvhAccel::with_settings(random_spheres(50, 6), &settings);
        assert_eq!(bvh.split_method(), SplitMethod::Middle);
        assert_eq!(bvh.max_prims_in_node(), 2);
    }

    #[test]
    fn test_instanced_hierarchy() {
        let inner: SharedPrimitive = Arc::new(BvhAccel::new(
            vec![
                Arc::new(GeometricPrimitive::new(Arc::new(Cuboid::new(Bounds3::new(
                    Point3::origin(),
                    Point3::new(1.0, 1.0, 1.0),
                ))))) as SharedPrimitive,
                sphere(5.0, 0.5, 0.5, 0.5),
            ],
            1,
            SplitMethod::Sah,
        ));
        let placed: SharedPrimitive = Arc::new(
            TransformedPrimitive::new(Arc::clone(&inner), Transform::translation(0.0, 0.0, 10.0))
                .unwrap(),
        );
        let scene = BvhAccel::new(vec![inner, placed], 1, SplitMethod::Sah);

        let mut ray = Ray::new(Point3::new(0.5, 0.5, 20.0), -Vec3::z());
        let hit = scene.intersect(&mut ray).unwrap();
        // The translated copy spans z in [10, 11]
        assert_relative_eq!(hit.t, 9.0, epsilon = 1e-12);
        assert_relative_eq!(hit.normal.into_inner(), Vec3::z(), epsilon = 1e-12);
        assert!(scene.intersect_p(&Ray::new(Point3::new(5.0, 0.5, -3.0), Vec3::z())));
    }

    #[test]
    fn test_material_survives_traversal() {
        let lit: SharedPrimitive = Arc::new(
            GeometricPrimitive::new(Arc::new(Sphere::new(Point3::origin(), 1.0)))
                .with_material(MaterialId(7))
                .with_area_light(LightId(3)),
        );
        let bvh = BvhAccel::new(vec![lit], 4, SplitMethod::Sah);
        let hit = bvh
            .intersect(&mut Ray::new(Point3::new(0.0, 0.0, -4.0), Vec3::z()))
            .unwrap();
        assert_eq!(hit.material, Some(MaterialId(7)));
        assert_eq!(hit.area_light, Some(LightId(3)));
        assert_eq!(Primitive::material(&bvh), None);
    }

    #[test]
    fn test_shared_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BvhAccel>();

        use rayon::prelude::*;
        let bvh = BvhAccel::new(random_spheres(500, 12), 4, SplitMethod::Hlbvh);
        let rays = random_rays(256, 13);
        let parallel: Vec<Option<f64>> = rays
            .par_iter()
            .map(|r| bvh.intersect(&mut { *r }).map(|h| h.t))
            .collect();
        let serial: Vec<Option<f64>> = rays
            .iter()
            .map(|r| bvh.intersect(&mut { *r }).map(|h| h.t))
            .collect();
        assert_eq!(parallel, serial);
    }
}
