//! Bucketed surface area heuristic and in-place partition helpers.

use prism_math::{Axis, Bounds3, Point3};

/// Number of SAH buckets along the split axis.
pub(crate) const SAH_BUCKETS: usize = 12;

/// Cost of one traversal step relative to one primitive test.
pub(crate) const TRAVERSAL_COST: f64 = 0.125;

/// Ranges this small skip the SAH and split at the median.
pub(crate) const SMALL_RANGE: usize = 4;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    count: usize,
    bounds: Bounds3,
}

impl Default for Bucket {
    fn default() -> Self {
        Self {
            count: 0,
            bounds: Bounds3::empty(),
        }
    }
}

/// Cheapest bucket boundary: primitives in buckets `0..=bucket` go left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SahSplit {
    pub bucket: usize,
    pub cost: f64,
}

/// Bucket a centroid falls into along `axis`.
#[inline]
pub(crate) fn bucket_index(centroid_bounds: &Bounds3, axis: Axis, centroid: &Point3) -> usize {
    let b = (SAH_BUCKETS as f64 * centroid_bounds.offset(centroid)[axis.index()]) as usize;
    b.min(SAH_BUCKETS - 1)
}

/// Evaluate every bucket boundary and return the cheapest one.
///
/// `items` yields `(centroid, bounds, weight)`; the weight stands in for the
/// primitive count of the item. Boundaries that leave one side empty are not
/// candidates. Returns `None` when no boundary separates the items or the
/// enclosing `bounds` has no area to normalize by.
pub(crate) fn best_split<I>(
    items: I,
    centroid_bounds: &Bounds3,
    axis: Axis,
    bounds: &Bounds3,
) -> Option<SahSplit>
where
    I: IntoIterator<Item = (Point3, Bounds3, usize)>,
{
    let total_area = bounds.surface_area();
    if !(total_area > 0.0) {
        return None;
    }

    let mut buckets = [Bucket::default(); SAH_BUCKETS];
    for (centroid, item_bounds, weight) in items {
        let bucket = &mut buckets[bucket_index(centroid_bounds, axis, &centroid)];
        bucket.count += weight;
        bucket.bounds = bucket.bounds.union(&item_bounds);
    }

    // Sweep left to right for the "below" side of every boundary
    let mut below = [Bucket::default(); SAH_BUCKETS - 1];
    let mut acc = Bucket::default();
    for (i, bucket) in buckets[..SAH_BUCKETS - 1].iter().enumerate() {
        acc.count += bucket.count;
        acc.bounds = acc.bounds.union(&bucket.bounds);
        below[i] = acc;
    }

    // Sweep right to left for the "above" side and pick the minimum
    let mut best: Option<SahSplit> = None;
    let mut above = Bucket::default();
    for i in (0..SAH_BUCKETS - 1).rev() {
        above.count += buckets[i + 1].count;
        above.bounds = above.bounds.union(&buckets[i + 1].bounds);
        let lower = below[i];
        if lower.count == 0 || above.count == 0 {
            continue;
        }
        let cost = TRAVERSAL_COST
            + (lower.count as f64 * lower.bounds.surface_area()
                + above.count as f64 * above.bounds.surface_area())
                / total_area;
        // Ties resolve to the lowest boundary
        if best.map_or(true, |b| cost <= b.cost) {
            best = Some(SahSplit { bucket: i, cost });
        }
    }
    best
}

/// Reorder `items` so every element matching `pred` comes first.
/// Returns the number of matching elements.
pub(crate) fn partition<T>(items: &mut [T], mut pred: impl FnMut(&T) -> bool) -> usize {
    let mut left = 0;
    let mut right = items.len();

    while left < right {
        if pred(&items[left]) {
            left += 1;
        } else {
            right -= 1;
            items.swap(left, right);
        }
    }

    left
}

/// Place the median element by `key` at `len / 2`, smaller keys before it.
///
/// `items` must hold at least two elements.
pub(crate) fn median_split<T>(items: &mut [T], key: impl Fn(&T) -> f64) -> usize {
    let mid = items.len() / 2;
    items.select_nth_unstable_by(mid, |a, b| key(a).total_cmp(&key(b)));
    mid
}
