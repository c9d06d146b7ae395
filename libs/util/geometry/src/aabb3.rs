// This file is part of Nitrogen.
//
// Nitrogen is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Nitrogen is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with Nitrogen.  If not, see <http://www.gnu.org/licenses/>.
use nalgebra::Point3;

/// Axis-aligned bounding box in meters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb3 {
    lo: Point3<f64>,
    hi: Point3<f64>,
}

impl Aabb3 {
    pub fn from_bounds(lo: Point3<f64>, hi: Point3<f64>) -> Self {
        debug_assert!(lo.x <= hi.x && lo.y <= hi.y && lo.z <= hi.z);
        Self { lo, hi }
    }

    /// The empty box: any `union` with a real box yields that box back.
    pub fn empty() -> Self {
        Self {
            lo: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            hi: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points<'a>(points: impl Iterator<Item = &'a Point3<f64>>) -> Self {
        let mut out = Self::empty();
        for p in points {
            out.expand_to_contain(p);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.lo.x > self.hi.x || self.lo.y > self.hi.y || self.lo.z > self.hi.z
    }

    pub fn lo(&self) -> &Point3<f64> {
        &self.lo
    }

    pub fn hi(&self) -> &Point3<f64> {
        &self.hi
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.lo, &self.hi)
    }

    pub fn span(&self, axis: usize) -> f64 {
        self.hi[axis] - self.lo[axis]
    }

    pub fn extent(&self) -> [f64; 3] {
        [self.span(0), self.span(1), self.span(2)]
    }

    /// Index of the axis with the largest extent.
    pub fn max_axis(&self) -> usize {
        let e = self.extent();
        if e[0] >= e[1] && e[0] >= e[2] {
            0
        } else if e[1] >= e[2] {
            1
        } else {
            2
        }
    }

    /// Index of the axis with the smallest extent.
    pub fn min_axis(&self) -> usize {
        let e = self.extent();
        if e[0] <= e[1] && e[0] <= e[2] {
            0
        } else if e[1] <= e[2] {
            1
        } else {
            2
        }
    }

    pub fn volume(&self) -> f64 {
        let e = self.extent();
        e[0] * e[1] * e[2]
    }

    pub fn contains(&self, p: &Point3<f64>) -> bool {
        p.x >= self.lo.x
            && p.y >= self.lo.y
            && p.z >= self.lo.z
            && p.x <= self.hi.x
            && p.y <= self.hi.y
            && p.z <= self.hi.z
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.lo.x <= other.hi.x
            && self.hi.x >= other.lo.x
            && self.lo.y <= other.hi.y
            && self.hi.y >= other.lo.y
            && self.lo.z <= other.hi.z
            && self.hi.z >= other.lo.z
    }

    pub fn expand_to_contain(&mut self, p: &Point3<f64>) {
        self.lo.x = self.lo.x.min(p.x);
        self.lo.y = self.lo.y.min(p.y);
        self.lo.z = self.lo.z.min(p.z);
        self.hi.x = self.hi.x.max(p.x);
        self.hi.y = self.hi.y.max(p.y);
        self.hi.z = self.hi.z.max(p.z);
    }

    pub fn union(&self, other: &Self) -> Self {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        Self {
            lo: Point3::new(
                self.lo.x.min(other.lo.x),
                self.lo.y.min(other.lo.y),
                self.lo.z.min(other.lo.z),
            ),
            hi: Point3::new(
                self.hi.x.max(other.hi.x),
                self.hi.y.max(other.hi.y),
                self.hi.z.max(other.hi.z),
            ),
        }
    }

    /// Grow outward by `amount` on every axis.
    pub fn expanded_by(&self, amount: f64) -> Self {
        let d = Point3::new(amount, amount, amount);
        Self::from_bounds(
            Point3::new(self.lo.x - d.x, self.lo.y - d.y, self.lo.z - d.z),
            Point3::new(self.hi.x + d.x, self.hi.y + d.y, self.hi.z + d.z),
        )
    }

    /// Grow outward by `amount` on a single axis only, used when a tile's
    /// thinnest dimension needs more slack before clipping children into it.
    pub fn expanded_on_axis(&self, axis: usize, amount: f64) -> Self {
        let mut lo = self.lo;
        let mut hi = self.hi;
        lo[axis] -= amount;
        hi[axis] += amount;
        Self::from_bounds(lo, hi)
    }

    /// Uniformly scale the box about its center by `factor` (used for the
    /// `CHILD_BOUNDS_SEARCH_RATIO` dependency search margin).
    pub fn scaled_about_center(&self, factor: f64) -> Self {
        let c = self.center();
        let half = self.extent().map(|e| e * 0.5 * factor);
        Self::from_bounds(
            Point3::new(c.x - half[0], c.y - half[1], c.z - half[2]),
            Point3::new(c.x + half[0], c.y + half[1], c.z + half[2]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_of_empty_is_identity() {
        let a = Aabb3::from_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let u = a.union(&Aabb3::empty());
        assert_eq!(u, a);
    }

    #[test]
    fn max_and_min_axis() {
        let b = Aabb3::from_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 1.0, 5.0));
        assert_eq!(b.max_axis(), 0);
        assert_eq!(b.min_axis(), 1);
    }

    #[test]
    fn scaled_about_center_grows_symmetrically() {
        let b = Aabb3::from_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 2.0));
        let s = b.scaled_about_center(1.1);
        assert!((s.span(0) - 2.2).abs() < 1e-12);
        assert_eq!(s.center(), b.center());
    }
}
