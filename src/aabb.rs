//! Axis-aligned bounding boxes in patient space (millimeters).

use nalgebra::{Matrix4, Point3, Vector3};

/// Axis-aligned box spanned by a `min` and a `max` corner.
///
/// A box is null when any `min` component exceeds the matching `max`
/// component. Measurements of a null box are zero and only [`add_point`] and
/// [`add_box`] can turn it into a valid one.
///
/// [`add_point`]: AxisAlignedBox::add_point
/// [`add_box`]: AxisAlignedBox::add_box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisAlignedBox {
    min: Vector3<f64>,
    max: Vector3<f64>,
}

impl Default for AxisAlignedBox {
    fn default() -> Self {
        Self::null()
    }
}

impl AxisAlignedBox {
    /// The canonical empty box: `min = (1, 1, 1)`, `max = (-1, -1, -1)`.
    pub fn null() -> Self {
        Self {
            min: Vector3::new(1.0, 1.0, 1.0),
            max: Vector3::new(-1.0, -1.0, -1.0),
        }
    }

    /// Smallest box holding both points, grown by `displace` on every side.
    pub fn from_points(a: Vector3<f64>, b: Vector3<f64>, displace: f64) -> Self {
        let grow = Vector3::repeat(displace);
        Self {
            min: a.inf(&b) - grow,
            max: a.sup(&b) + grow,
        }
    }

    pub fn set_null(&mut self) {
        *self = Self::null();
    }

    pub fn is_null(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    pub fn is_point(&self) -> bool {
        self.min == self.max
    }

    pub fn min_corner(&self) -> Vector3<f64> {
        self.min
    }

    pub fn max_corner(&self) -> Vector3<f64> {
        self.max
    }

    pub fn set_min_corner(&mut self, x: f64, y: f64, z: f64) {
        self.min = Vector3::new(x, y, z);
    }

    pub fn set_max_corner(&mut self, x: f64, y: f64, z: f64) {
        self.max = Vector3::new(x, y, z);
    }

    /// Grow the box to hold `p`. A null box collapses onto the point.
    pub fn add_point(&mut self, p: Vector3<f64>) {
        if self.is_null() {
            self.min = p;
            self.max = p;
            return;
        }
        self.min = self.min.inf(&p);
        self.max = self.max.sup(&p);
    }

    /// Union with `other`. Null operands are ignored.
    pub fn add_box(&mut self, other: &AxisAlignedBox) {
        if other.is_null() {
            return;
        }
        if self.is_null() {
            *self = *other;
            return;
        }
        self.add_point(other.min);
        self.add_point(other.max);
    }

    pub fn enlarge(&mut self, displace: f64) {
        if self.is_null() {
            return;
        }
        let grow = Vector3::repeat(displace);
        self.min -= grow;
        self.max += grow;
    }

    fn enlarge_axis(&mut self, axis: usize, displace: f64) {
        if self.is_null() {
            return;
        }
        self.min[axis] -= displace;
        self.max[axis] += displace;
    }

    pub fn enlarge_x(&mut self, displace: f64) {
        self.enlarge_axis(0, displace);
    }

    pub fn enlarge_y(&mut self, displace: f64) {
        self.enlarge_axis(1, displace);
    }

    pub fn enlarge_z(&mut self, displace: f64) {
        self.enlarge_axis(2, displace);
    }

    /// Overlap test on the x/y footprint of both boxes.
    pub fn intersects(&self, other: &AxisAlignedBox) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        !(self.max.x < other.min.x
            || self.max.y < other.min.y
            || self.min.x > other.max.x
            || self.min.y > other.max.y)
    }

    /// Overlap of both boxes, or a null box when they do not intersect.
    pub fn intersection(&self, other: &AxisAlignedBox) -> AxisAlignedBox {
        if !self.intersects(other) {
            return Self::null();
        }
        let lo = self.clip(other.min, [true; 3]);
        let hi = self.clip(other.max, [true; 3]);
        Self::from_points(lo, hi, 0.0)
    }

    /// Clamp the selected components of `v` into the box.
    pub fn clip(&self, v: Vector3<f64>, axes: [bool; 3]) -> Vector3<f64> {
        if self.is_null() {
            return v;
        }
        let mut out = v;
        for (i, clip) in axes.into_iter().enumerate() {
            if clip {
                out[i] = v[i].clamp(self.min[i], self.max[i]);
            }
        }
        out
    }

    /// Inclusive containment test.
    pub fn is_inside(&self, v: Vector3<f64>) -> bool {
        (0..3).all(|i| v[i] >= self.min[i] && v[i] <= self.max[i])
    }

    fn extent(&self, axis: usize) -> f64 {
        if self.is_null() {
            0.0
        } else {
            self.max[axis] - self.min[axis]
        }
    }

    pub fn width(&self) -> f64 {
        self.extent(0)
    }

    pub fn height(&self) -> f64 {
        self.extent(1)
    }

    pub fn depth(&self) -> f64 {
        self.extent(2)
    }

    pub fn center(&self) -> Vector3<f64> {
        (self.min + self.max) / 2.0
    }

    pub fn longest_side_length(&self) -> f64 {
        self.width().max(self.height()).max(self.depth())
    }

    pub fn volume(&self) -> f64 {
        self.width() * self.height() * self.depth()
    }

    /// Box holding the eight corners of this box mapped through `mat`.
    pub fn transformed(&self, mat: &Matrix4<f64>) -> AxisAlignedBox {
        let mut out = Self::null();
        if self.is_null() {
            return out;
        }
        let (lo, hi) = (self.min, self.max);
        for corner in 0..8 {
            let p = Point3::new(
                if corner & 1 == 0 { lo.x } else { hi.x },
                if corner & 2 == 0 { lo.y } else { hi.y },
                if corner & 4 == 0 { lo.z } else { hi.z },
            );
            out.add_point(mat.transform_point(&p).coords);
        }
        out
    }
}
