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
use crate::cahv::CahvModel;
use geometry::{Aabb3, Plane};
use nalgebra::Point3;

/// Closed-form convex hull of a linear camera's viewing frustum: six
/// inward-facing planes (near, far, and the four side planes through the
/// image corners). Used to frustum-cull observations against tile bounds
/// before the more expensive mesh-clip re-cull.
#[derive(Clone, Debug)]
pub struct FrustumHull {
    planes: [Plane; 6],
}

impl FrustumHull {
    pub fn from_cahv(cam: &CahvModel, near: f64, far: f64) -> Self {
        let corner_ray = |row: f64, col: f64| -> nalgebra::Vector3<f64> {
            // Invert the CAHV linear solve at range = 1 along A to get a
            // direction through this pixel.
            let m = nalgebra::Matrix3::from_rows(&[
                cam.a.transpose(),
                cam.h.transpose(),
                cam.v.transpose(),
            ]);
            m.try_inverse()
                .map(|inv| inv * nalgebra::Vector3::new(1.0, col, row))
                .unwrap_or(cam.a)
                .normalize()
        };
        let tl = corner_ray(0.0, 0.0);
        let tr = corner_ray(0.0, cam.width as f64);
        let bl = corner_ray(cam.height as f64, 0.0);
        let br = corner_ray(cam.height as f64, cam.width as f64);

        let side = |a: nalgebra::Vector3<f64>, b: nalgebra::Vector3<f64>| {
            let n = a.cross(&b).normalize();
            Plane::from_point_and_normal(&cam.c, &n)
        };

        let planes = [
            Plane::from_point_and_normal(&(cam.c + cam.a * near), &cam.a),
            Plane::from_point_and_normal(&(cam.c + cam.a * far), &(-cam.a)),
            side(tl, tr),
            side(tr, br),
            side(br, bl),
            side(bl, tl),
        ];
        Self { planes }
    }

    pub fn planes(&self) -> &[Plane; 6] {
        &self.planes
    }

    /// A point is inside the hull iff it is in front of every plane.
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        self.planes.iter().all(|p| p.point_is_in_front(point))
    }

    /// Conservative separating-planes test: the hull misses `bounds` only
    /// if some plane has the whole box strictly behind it. This can return
    /// `true` (overlap) for some non-overlapping cases, which is the safe
    /// direction for a culling test (never discards a tile that actually
    /// needs splitting).
    pub fn intersects_bounds(&self, bounds: &Aabb3) -> bool {
        for plane in &self.planes {
            let mut any_in_front = false;
            for corner in bounds_corners(bounds) {
                if plane.point_is_in_front(&corner) {
                    any_in_front = true;
                    break;
                }
            }
            if !any_in_front {
                return false;
            }
        }
        true
    }
}

fn bounds_corners(bounds: &Aabb3) -> [Point3<f64>; 8] {
    let lo = bounds.lo();
    let hi = bounds.hi();
    [
        Point3::new(lo.x, lo.y, lo.z),
        Point3::new(hi.x, lo.y, lo.z),
        Point3::new(lo.x, hi.y, lo.z),
        Point3::new(hi.x, hi.y, lo.z),
        Point3::new(lo.x, lo.y, hi.z),
        Point3::new(hi.x, lo.y, hi.z),
        Point3::new(lo.x, hi.y, hi.z),
        Point3::new(hi.x, hi.y, hi.z),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn looking_down_z() -> CahvModel {
        CahvModel::new(
            Point3::origin(),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(500.0, 0.0, 500.0),
            Vector3::new(0.0, 500.0, 500.0),
            1000,
            1000,
        )
    }

    #[test]
    fn hull_contains_point_on_axis() {
        let hull = FrustumHull::from_cahv(&looking_down_z(), 1.0, 100.0);
        assert!(hull.contains(&Point3::new(0.0, 0.0, 10.0)));
    }

    #[test]
    fn hull_excludes_point_behind_near_plane() {
        let hull = FrustumHull::from_cahv(&looking_down_z(), 5.0, 100.0);
        assert!(!hull.contains(&Point3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn hull_intersects_bounds_straddling_axis() {
        let hull = FrustumHull::from_cahv(&looking_down_z(), 1.0, 100.0);
        let bounds = Aabb3::from_bounds(Point3::new(-1.0, -1.0, 9.0), Point3::new(1.0, 1.0, 11.0));
        assert!(hull.intersects_bounds(&bounds));
    }
}
