//! Stack-based front-to-back traversal of the linear node array.

use std::ops::{ControlFlow, Range};

use crate::primitive::SharedPrimitive;
use crate::{Ray, RayHit};

use super::flatten::LinearNode;

/// Capacity of the pending-node stack. Builders keep tree depth below it.
pub(crate) const TRAVERSAL_STACK_SIZE: usize = 64;

/// Visit every leaf whose bounds the ray reaches, near child first.
///
/// `visit_leaf` receives the ray (whose `t_max` it may shrink) and the
/// leaf's primitive range; returning `Break` ends the walk.
fn traverse<F>(nodes: &[LinearNode], ray: &mut Ray, mut visit_leaf: F)
where
    F: FnMut(&mut Ray, Range<usize>) -> ControlFlow<()>,
{
    if nodes.is_empty() {
        return;
    }

    let sign = ray.sign();
    let mut stack = [0usize; TRAVERSAL_STACK_SIZE];
    let mut top = 0;
    let mut current = 0;

    loop {
        let node = &nodes[current];
        if ray.intersect_bounds(&node.bounds) {
            match node.second_child() {
                None => {
                    if visit_leaf(ray, node.primitives()).is_break() {
                        return;
                    }
                }
                Some(second) => {
                    // The first child holds the lower half along the split
                    // axis; a ray heading down that axis meets the second first
                    let first = current + 1;
                    let (near, far) = if sign[node.axis().index()] == 1 {
                        (second, first)
                    } else {
                        (first, second)
                    };
                    stack[top] = far;
                    top += 1;
                    current = near;
                    continue;
                }
            }
        }

        if top == 0 {
            return;
        }
        top -= 1;
        current = stack[top];
    }
}

/// Closest hit over the hierarchy. Shrinks `ray.t_max` to the hit.
pub(crate) fn intersect(
    nodes: &[LinearNode],
    primitives: &[SharedPrimitive],
    ray: &mut Ray,
) -> Option<RayHit> {
    let mut closest = None;
    traverse(nodes, ray, |ray, range| {
        for primitive in &primitives[range] {
            // Each hit shrinks t_max, so a later hit is always nearer
            if let Some(hit) = primitive.intersect(ray) {
                closest = Some(hit);
            }
        }
        ControlFlow::Continue(())
    });
    closest
}

/// Whether any primitive is hit within `(0, ray.t_max)`.
pub(crate) fn intersect_p(nodes: &[LinearNode], primitives: &[SharedPrimitive], ray: &Ray) -> bool {
    let mut probe = *ray;
    let mut occluded = false;
    traverse(nodes, &mut probe, |ray, range| {
        if primitives[range].iter().any(|p| p.intersect_p(ray)) {
            occluded = true;
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    occluded
}
