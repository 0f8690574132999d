//! Linear BVH construction over Morton-sorted primitives.
//!
//! Primitive centroids are quantized to a 1024³ grid inside the centroid
//! bounds and interleaved into 30-bit Morton codes. After an LSD radix
//! sort, runs of primitives that share the top 12 code bits form
//! *treelets*. Each treelet is split bit by bit in parallel, and the
//! treelet roots are then joined by a small SAH tree weighted by the
//! number of primitives under each treelet.

use std::ops::Range;
use std::time::Instant;

use log::debug;
use prism_math::{Axis, Bounds3, Point3};
use rayon::prelude::*;

use crate::arena::{NodeArena, NodeId};

use super::info::{centroid_bounds, range_bounds, PrimitiveInfo};
use super::sah::{best_split, bucket_index, median_split, partition};
use super::tree::{make_interior, make_leaf, BuildNode, BuildTree};

const MORTON_BITS: u32 = 10;
const MORTON_SCALE: u32 = 1 << MORTON_BITS;

/// Code bits that select a treelet: the top 12 of 30.
const TREELET_MASK: u32 = 0b0011_1111_1111_1100_0000_0000_0000_0000;

/// Highest code bit examined inside a treelet.
const FIRST_BIT_INDEX: i32 = 29 - 12;

const RADIX_BITS: u32 = 6;
const RADIX_BUCKETS: usize = 1 << RADIX_BITS;
const RADIX_PASSES: u32 = 30 / RADIX_BITS;
const RADIX_MASK: u32 = (1 << RADIX_BITS) - 1;

/// Histogram chunk size for the parallel radix pass.
const HISTOGRAM_CHUNK: usize = 16 * 1024;

/// Depth after which the upper tree splits at the median.
const UPPER_MAX_SPLIT_DEPTH: usize = 16;

/// A primitive record tagged with its Morton code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MortonPrimitive {
    /// Position in the record list the code was computed from.
    pub index: usize,
    pub code: u32,
}

/// Spread the low 10 bits of `x` so two zero bits separate each.
#[inline]
fn left_shift3(mut x: u32) -> u32 {
    debug_assert!(x < MORTON_SCALE);
    x = (x | (x << 16)) & 0x0300_00FF;
    x = (x | (x << 8)) & 0x0300_F00F;
    x = (x | (x << 4)) & 0x030C_30C3;
    x = (x | (x << 2)) & 0x0924_9249;
    x
}

/// Interleave three 10-bit coordinates as `…z₁y₁x₁z₀y₀x₀`.
#[inline]
pub(crate) fn encode_morton3(x: u32, y: u32, z: u32) -> u32 {
    (left_shift3(z) << 2) | (left_shift3(y) << 1) | left_shift3(x)
}

/// Map a normalized coordinate onto the 10-bit grid.
#[inline]
fn quantize(v: f64) -> u32 {
    // `as` saturates, and NaN maps to 0
    ((v * MORTON_SCALE as f64) as u32).min(MORTON_SCALE - 1)
}

/// Stable LSD radix sort by `code`.
pub(crate) fn radix_sort(values: &mut Vec<MortonPrimitive>) {
    let mut scratch = vec![MortonPrimitive::default(); values.len()];

    for pass in 0..RADIX_PASSES {
        let shift = pass * RADIX_BITS;
        let digit = |m: &MortonPrimitive| ((m.code >> shift) & RADIX_MASK) as usize;

        let counts = values
            .par_chunks(HISTOGRAM_CHUNK)
            .map(|chunk| {
                let mut counts = [0usize; RADIX_BUCKETS];
                for m in chunk {
                    counts[digit(m)] += 1;
                }
                counts
            })
            .reduce(
                || [0usize; RADIX_BUCKETS],
                |mut a, b| {
                    a.iter_mut().zip(b).for_each(|(a, b)| *a += b);
                    a
                },
            );

        // Exclusive prefix sum gives each digit's first output slot
        let mut starts = [0usize; RADIX_BUCKETS];
        for b in 1..RADIX_BUCKETS {
            starts[b] = starts[b - 1] + counts[b - 1];
        }

        for m in values.iter() {
            let slot = &mut starts[digit(m)];
            scratch[*slot] = *m;
            *slot += 1;
        }
        std::mem::swap(values, &mut scratch);
    }
}

/// Contiguous runs of codes that agree on the treelet bits.
fn treelet_ranges(codes: &[u32]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for end in 1..=codes.len() {
        if end == codes.len() || codes[start] & TREELET_MASK != codes[end] & TREELET_MASK {
            ranges.push(start..end);
            start = end;
        }
    }
    ranges
}

/// Summary of a finished treelet for the upper tree.
#[derive(Debug, Clone, Copy)]
struct TreeletRoot {
    node: NodeId,
    bounds: Bounds3,
    centroid: Point3,
    prim_count: usize,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct HlbvhBuilder {
    max_prims_in_node: usize,
}

impl HlbvhBuilder {
    pub fn new(max_prims_in_node: usize) -> Self {
        Self { max_prims_in_node }
    }

    /// Build over a non-empty record list. The records are replaced by
    /// their Morton-ordered permutation.
    pub fn build(&self, infos: &mut Vec<PrimitiveInfo>) -> BuildTree {
        let start = Instant::now();

        let bounds = centroid_bounds(infos);
        let mut morton: Vec<MortonPrimitive> = infos
            .par_iter()
            .enumerate()
            .map(|(index, info)| {
                let o = bounds.offset(&info.centroid);
                MortonPrimitive {
                    index,
                    code: encode_morton3(quantize(o.x), quantize(o.y), quantize(o.z)),
                }
            })
            .collect();
        radix_sort(&mut morton);
        debug!("hlbvh: morton sort of {} primitives took {:?}", morton.len(), start.elapsed());

        *infos = morton.iter().map(|m| infos[m.index]).collect();
        let codes: Vec<u32> = morton.iter().map(|m| m.code).collect();

        let treelets = treelet_ranges(&codes);
        let subtrees: Vec<BuildTree> = treelets
            .par_iter()
            .map(|range| {
                let mut arena = NodeArena::with_capacity(2 * range.len());
                let root = self.emit_lbvh(
                    &mut arena,
                    &infos[range.clone()],
                    &codes[range.clone()],
                    range.start,
                    FIRST_BIT_INDEX,
                );
                BuildTree { arena, root }
            })
            .collect();
        debug!(
            "hlbvh: {} treelets built after {:?}",
            treelets.len(),
            start.elapsed()
        );

        let total: usize = subtrees.iter().map(BuildTree::node_count).sum();
        let mut arena = NodeArena::with_capacity(total + 2 * treelets.len());
        let mut roots: Vec<TreeletRoot> = subtrees
            .into_iter()
            .zip(&treelets)
            .map(|(tree, range)| {
                let bounds = tree.root_bounds();
                TreeletRoot {
                    node: tree.absorb_into(&mut arena),
                    bounds,
                    centroid: bounds.centroid(),
                    prim_count: range.len(),
                }
            })
            .collect();

        let root = build_upper_sah(&mut arena, &mut roots, 0);
        debug!(
            "hlbvh: {} nodes total after {:?}",
            arena.len(),
            start.elapsed()
        );
        BuildTree { arena, root }
    }

    /// Split a treelet on successive Morton bits, highest first.
    ///
    /// Primitives that share a full 30-bit code cannot be separated, so
    /// once every bit is consumed the remainder becomes one leaf whatever
    /// `max_prims_in_node` says. On scenes whose extent dwarfs local
    /// clusters, many centroids fall into the same of the 1024 cells per
    /// axis and those leaves can hold a large share of the input. Prefer
    /// [`SplitMethod::Sah`](super::SplitMethod::Sah) for such scenes.
    fn emit_lbvh(
        &self,
        arena: &mut NodeArena<BuildNode>,
        infos: &[PrimitiveInfo],
        codes: &[u32],
        offset: usize,
        bit: i32,
    ) -> NodeId {
        let n = infos.len();
        if bit < 0 || n <= self.max_prims_in_node {
            return make_leaf(arena, range_bounds(infos), offset, n);
        }

        // Sorted codes agree on every higher bit, so the range is split on
        // this one exactly when its endpoints differ
        let mask = 1u32 << bit;
        if codes[0] & mask == codes[n - 1] & mask {
            return self.emit_lbvh(arena, infos, codes, offset, bit - 1);
        }
        let split = codes.partition_point(|code| code & mask == 0);

        let left = self.emit_lbvh(arena, &infos[..split], &codes[..split], offset, bit - 1);
        let right = self.emit_lbvh(
            arena,
            &infos[split..],
            &codes[split..],
            offset + split,
            bit - 1,
        );
        // Bit k of an interleaved code belongs to axis k mod 3
        make_interior(arena, Axis::from_index(bit as usize % 3), left, right)
    }
}

/// Join treelet roots with an SAH tree weighted by primitive count.
fn build_upper_sah(
    arena: &mut NodeArena<BuildNode>,
    roots: &mut [TreeletRoot],
    depth: usize,
) -> NodeId {
    if let [only] = roots {
        return only.node;
    }

    let bounds = roots
        .iter()
        .fold(Bounds3::empty(), |acc, r| acc.union(&r.bounds));
    let centroid_bounds = roots
        .iter()
        .fold(Bounds3::empty(), |acc, r| acc.union_point(&r.centroid));
    let axis = centroid_bounds.maximum_extent();
    let a = axis.index();

    let degenerate = centroid_bounds.max[a] == centroid_bounds.min[a];
    let candidate = if degenerate || depth >= UPPER_MAX_SPLIT_DEPTH {
        None
    } else {
        best_split(
            roots.iter().map(|r| (r.centroid, r.bounds, r.prim_count)),
            &centroid_bounds,
            axis,
            &bounds,
        )
    };
    let mid = match candidate {
        Some(split) => partition(roots, |r| {
            bucket_index(&centroid_bounds, axis, &r.centroid) <= split.bucket
        }),
        None => median_split(roots, |r| r.centroid[a]),
    };

    let (left, right) = roots.split_at_mut(mid);
    let left = build_upper_sah(arena, left, depth + 1);
    let right = build_upper_sah(arena, right, depth + 1);
    make_interior(arena, axis, left, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_scenes::{boxes_along_x, random_spheres};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_morton_interleave() {
        assert_eq!(encode_morton3(0, 0, 0), 0);
        assert_eq!(encode_morton3(1, 0, 0), 0b001);
        assert_eq!(encode_morton3(0, 1, 0), 0b010);
        assert_eq!(encode_morton3(0, 0, 1), 0b100);
        assert_eq!(encode_morton3(0b11, 0, 0), 0b001_001);
        let top = encode_morton3(1023, 1023, 1023);
        assert_eq!(top, (1 << 30) - 1);
    }

    #[test]
    fn test_quantize_clamps() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(0.5), 512);
        assert_eq!(quantize(1.0), 1023);
        assert_eq!(quantize(-0.25), 0);
        assert_eq!(quantize(f64::NAN), 0);
    }

    #[test]
    fn test_radix_sort_is_stable_and_ordered() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut values: Vec<MortonPrimitive> = (0..50_000)
            .map(|index| MortonPrimitive {
                index,
                code: rng.gen_range(0u32..1 << 12) << 18,
            })
            .collect();
        radix_sort(&mut values);
        for pair in values.windows(2) {
            assert!(pair[0].code <= pair[1].code);
            if pair[0].code == pair[1].code {
                assert!(pair[0].index < pair[1].index);
            }
        }
        assert_eq!(values.len(), 50_000);
    }

    #[test]
    fn test_treelet_ranges() {
        let a = 1 << 20;
        let b = 2 << 20;
        let codes = [a, a | 5, a | 9, b, b | 1];
        assert_eq!(treelet_ranges(&codes), vec![0..3, 3..5]);
        assert!(treelet_ranges(&[]).is_empty());
    }

    #[test]
    fn test_build_covers_every_primitive() {
        let prims = random_spheres(2_000, 3);
        let mut infos = PrimitiveInfo::collect(&prims);
        let tree = HlbvhBuilder::new(4).build(&mut infos);

        let mut seen: Vec<usize> = infos.iter().map(|i| i.index).collect();
        seen.sort_unstable();
        assert!(seen.iter().copied().eq(0..2_000));

        let mut covered = vec![false; 2_000];
        for (_, node) in tree.arena.iter() {
            match *node {
                BuildNode::Leaf {
                    bounds,
                    first_prim,
                    prim_count,
                } => {
                    assert!(prim_count >= 1);
                    for (slot, info) in infos[first_prim..first_prim + prim_count].iter().enumerate() {
                        assert!(bounds.contains(&info.bounds));
                        assert!(!covered[first_prim + slot]);
                        covered[first_prim + slot] = true;
                    }
                }
                BuildNode::Interior {
                    bounds, children, ..
                } => {
                    for child in children {
                        assert!(bounds.contains(&tree.arena[child].bounds()));
                    }
                }
            }
        }
        assert!(covered.into_iter().all(|c| c));
    }

    #[test]
    fn test_coincident_primitives_share_a_leaf() {
        let prims = boxes_along_x(&[1.0; 12]);
        let mut infos = PrimitiveInfo::collect(&prims);
        let tree = HlbvhBuilder::new(4).build(&mut infos);
        // Identical codes exhaust every bit and end in one oversized leaf
        assert_eq!(tree.node_count(), 1);
        assert!(matches!(
            tree.arena[tree.root],
            BuildNode::Leaf { prim_count: 12, .. }
        ));
    }

    #[test]
    fn test_two_primitives_split() {
        let prims = boxes_along_x(&[0.0, 10.0]);
        let mut infos = PrimitiveInfo::collect(&prims);
        let tree = HlbvhBuilder::new(1).build(&mut infos);
        match tree.arena[tree.root] {
            BuildNode::Interior { axis, .. } => assert_eq!(axis, Axis::X),
            BuildNode::Leaf { .. } => panic!("expected a split"),
        }
        assert_eq!(tree.node_count(), 3);
    }
}
