//! Axis-aligned bounding boxes and coordinate axes.

use std::ops::Index;

use crate::{Point3, Vec3};

/// One of the three coordinate axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// The x axis.
    X,
    /// The y axis.
    Y,
    /// The z axis.
    Z,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index of this axis (0, 1 or 2).
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Axis for a component index. Indices wrap modulo 3.
    #[inline]
    pub fn from_index(index: usize) -> Self {
        match index % 3 {
            0 => Axis::X,
            1 => Axis::Y,
            _ => Axis::Z,
        }
    }
}

/// Axis-aligned bounding box in 3D.
///
/// An empty box has `min = +inf` and `max = -inf`, so that it is the
/// identity for [`Bounds3::union`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Bounds3 {
    /// Create a box from min and max corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create a degenerate box around a single point.
    pub fn from_point(p: Point3) -> Self {
        Self { min: p, max: p }
    }

    /// Create the smallest box containing all points.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Self {
        points
            .into_iter()
            .fold(Self::empty(), |b, p| b.union_point(p))
    }

    /// Create an empty (inverted) box suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// True if the box contains no points.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this box to include a point.
    pub fn include_point(&mut self, p: &Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Box containing `self` and a point.
    #[must_use]
    pub fn union_point(mut self, p: &Point3) -> Self {
        self.include_point(p);
        self
    }

    /// Box containing both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Bounds3) -> Self {
        Self {
            min: Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    /// Vector from the min corner to the max corner.
    pub fn diagonal(&self) -> Vec3 {
        self.max - self.min
    }

    /// Midpoint of the box.
    pub fn centroid(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Total surface area, zero for an empty box.
    pub fn surface_area(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.diagonal();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Axis along which the box is widest. Ties favor the lower axis.
    pub fn maximum_extent(&self) -> Axis {
        let d = self.diagonal();
        if d.x >= d.y && d.x >= d.z {
            Axis::X
        } else if d.y >= d.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// Position of `p` relative to the box: 0 at `min`, 1 at `max` per axis.
    ///
    /// Axes along which the box is flat report 0.
    pub fn offset(&self, p: &Point3) -> Vec3 {
        let mut o = p - self.min;
        for axis in 0..3 {
            if self.max[axis] > self.min[axis] {
                o[axis] /= self.max[axis] - self.min[axis];
            } else {
                o[axis] = 0.0;
            }
        }
        o
    }

    /// One of the eight corners; bit `i` of `index` picks max along axis `i`.
    pub fn corner(&self, index: usize) -> Point3 {
        Point3::new(
            self[index & 1].x,
            self[(index >> 1) & 1].y,
            self[(index >> 2) & 1].z,
        )
    }

    /// True if `p` lies inside or on the boundary.
    pub fn inside(&self, p: &Point3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// True if `other` lies entirely within this box. An empty box is
    /// contained by everything.
    pub fn contains(&self, other: &Bounds3) -> bool {
        other.is_empty() || (self.inside(&other.min) && self.inside(&other.max))
    }
}

impl Default for Bounds3 {
    fn default() -> Self {
        Self::empty()
    }
}

/// `bounds[0]` is the min corner, `bounds[1]` the max corner.
impl Index<usize> for Bounds3 {
    type Output = Point3;

    #[inline]
    fn index(&self, i: usize) -> &Point3 {
        if i == 0 {
            &self.min
        } else {
            &self.max
        }
    }
}
