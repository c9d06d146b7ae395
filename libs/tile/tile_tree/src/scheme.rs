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
use geometry::Aabb3;

/// Spatial subdivision strategy used to turn one tile's bounds into its
/// children's bounds.
#[derive(Clone, Copy, Debug)]
pub enum TilingScheme {
    Binary,
    QuadFixedAxis(usize),
    QuadAuto,
    QuadWithFallback(usize),
    Oct,
}

impl TilingScheme {
    /// Children bounds for `bounds` under this scheme. Empty when the box
    /// is too thin on every splittable axis to subdivide further.
    pub fn subdivide(&self, bounds: &Aabb3, min_extent: f64) -> Vec<Aabb3> {
        match self {
            TilingScheme::Binary => binary_split(bounds, bounds.max_axis(), min_extent),
            TilingScheme::QuadFixedAxis(axis) => quad_split(bounds, *axis, min_extent),
            TilingScheme::QuadAuto => quad_split(bounds, bounds.min_axis(), min_extent),
            TilingScheme::QuadWithFallback(axis) => {
                let quad = quad_split(bounds, *axis, min_extent);
                if quad.is_empty() {
                    binary_split(bounds, bounds.max_axis(), min_extent)
                } else {
                    quad
                }
            }
            TilingScheme::Oct => {
                let oct = oct_split(bounds, min_extent);
                if oct.is_empty() {
                    TilingScheme::QuadAuto.subdivide(bounds, min_extent)
                } else {
                    oct
                }
            }
        }
    }
}

fn can_split_axis(bounds: &Aabb3, axis: usize, min_extent: f64) -> bool {
    bounds.span(axis) >= 2.0 * min_extent
}

fn binary_split(bounds: &Aabb3, axis: usize, min_extent: f64) -> Vec<Aabb3> {
    if !can_split_axis(bounds, axis, min_extent) {
        return Vec::new();
    }
    split_box_along(bounds, &[axis])
}

fn quad_split(bounds: &Aabb3, axis: usize, min_extent: f64) -> Vec<Aabb3> {
    let others: Vec<usize> = (0..3).filter(|a| *a != axis).collect();
    if others.iter().any(|a| !can_split_axis(bounds, *a, min_extent)) {
        return Vec::new();
    }
    split_box_along(bounds, &others)
}

fn oct_split(bounds: &Aabb3, min_extent: f64) -> Vec<Aabb3> {
    if (0..3).any(|a| !can_split_axis(bounds, a, min_extent)) {
        return Vec::new();
    }
    split_box_along(bounds, &[0, 1, 2])
}

/// Split `bounds` in half along every axis in `axes`, enumerating all
/// 2^len(axes) children.
fn split_box_along(bounds: &Aabb3, axes: &[usize]) -> Vec<Aabb3> {
    let lo = *bounds.lo();
    let hi = *bounds.hi();
    let mid = bounds.center();

    let mut children = vec![(lo, hi)];
    for &axis in axes {
        let mut next = Vec::with_capacity(children.len() * 2);
        for (clo, chi) in children {
            let mut first_hi = chi;
            first_hi[axis] = mid[axis];
            let mut second_lo = clo;
            second_lo[axis] = mid[axis];
            next.push((clo, first_hi));
            next.push((second_lo, chi));
        }
        children = next;
    }
    children.into_iter().map(|(lo, hi)| Aabb3::from_bounds(lo, hi)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn binary_splits_max_axis_in_two() {
        let bounds = Aabb3::from_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 1.0, 1.0));
        let kids = TilingScheme::Binary.subdivide(&bounds, 0.1);
        assert_eq!(kids.len(), 2);
    }

    #[test]
    fn quad_auto_on_cube_splits_perpendicular_to_first_axis() {
        // A perfectly cubic box: auto picks the min axis, which ties at
        // axis 0 first under `min_axis`'s left-to-right tie-break, so X
        // stays whole and the split divides Y and Z.
        let bounds = Aabb3::from_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 2.0));
        let kids = TilingScheme::QuadAuto.subdivide(&bounds, 0.1);
        assert_eq!(kids.len(), 4);
        for k in &kids {
            assert!((k.span(0) - 2.0).abs() < 1e-9);
            assert!((k.span(1) - 1.0).abs() < 1e-9);
            assert!((k.span(2) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn oct_falls_back_to_quad_when_one_axis_is_thin() {
        let bounds = Aabb3::from_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 10.0, 0.05));
        let kids = TilingScheme::Oct.subdivide(&bounds, 0.1);
        assert_eq!(kids.len(), 4);
    }

    #[test]
    fn quad_with_fallback_falls_back_to_binary() {
        let bounds = Aabb3::from_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 1.0, 10.0));
        let kids = TilingScheme::QuadWithFallback(1).subdivide(&bounds, 1.0);
        assert_eq!(kids.len(), 2);
    }
}
