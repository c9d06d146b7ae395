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
use crate::hull::FrustumHull;
use crate::Pixel;
use nalgebra::{Point3, Vector3};

/// Linear pinhole camera model, parameterized the way JPL's rover imagery
/// pipelines are: a center `C`, optical axis `A`, and horizontal/vertical
/// image-plane vectors `H`/`V` that fold in focal length, pixel pitch, and
/// principal point all at once.
#[derive(Clone, Debug)]
pub struct CahvModel {
    pub c: Point3<f64>,
    pub a: Vector3<f64>,
    pub h: Vector3<f64>,
    pub v: Vector3<f64>,
    pub width: usize,
    pub height: usize,
}

impl CahvModel {
    pub fn new(c: Point3<f64>, a: Vector3<f64>, h: Vector3<f64>, v: Vector3<f64>, width: usize, height: usize) -> Self {
        Self { c, a, h, v, width, height }
    }

    /// 3-D point -> pixel. Returns `None` when the point is behind the
    /// image plane (range along the optical axis is non-positive).
    pub fn project(&self, point: &Point3<f64>) -> Option<Pixel> {
        let p = point - self.c;
        let range = self.a.dot(&p);
        if range <= 0.0 {
            return None;
        }
        let col = self.h.dot(&p) / range;
        let row = self.v.dot(&p) / range;
        Some(Pixel::new(row, col))
    }

    /// Pixel + range along the optical axis -> 3-D point. This is an
    /// under-determined inverse of `project` in general; CAHV's affine
    /// structure makes the `H`, `V`, `A` basis invertible given a fixed
    /// range, which is the form the ray-casting texture baker needs.
    pub fn unproject(&self, pixel: &Pixel, range: f64) -> Point3<f64> {
        // Solve for p such that A.p = range, H.p = pixel.col * range, V.p = pixel.row * range.
        let m = nalgebra::Matrix3::from_rows(&[self.a.transpose(), self.h.transpose(), self.v.transpose()]);
        let rhs = Vector3::new(range, pixel.y * range, pixel.x * range);
        let p = m.try_inverse().map(|inv| inv * rhs).unwrap_or(self.a * range);
        self.c + p
    }

    pub fn frustum_hull(&self, near: f64, far: f64) -> FrustumHull {
        FrustumHull::from_cahv(self, near, far)
    }
}

/// CAHV plus an optical axis `o` and a 3-term radial distortion
/// polynomial `r`, applied as a scaling of the offset from `o` in the
/// image plane before the CAHV linear solve.
#[derive(Clone, Debug)]
pub struct CahvorModel {
    pub base: CahvModel,
    pub o: Vector3<f64>,
    pub r: [f64; 3],
}

impl CahvorModel {
    pub fn new(base: CahvModel, o: Vector3<f64>, r: [f64; 3]) -> Self {
        Self { base, o, r }
    }

    fn radial_scale(&self, theta: f64) -> f64 {
        let t2 = theta * theta;
        1.0 + self.r[0] * t2 + self.r[1] * t2 * t2 + self.r[2] * t2 * t2 * t2
    }

    pub fn project(&self, point: &Point3<f64>) -> Option<Pixel> {
        let p = point - self.base.c;
        let range = self.o.dot(&p);
        if range <= 0.0 {
            return None;
        }
        let theta = (p.norm_squared() / (range * range) - 1.0).max(0.0).sqrt();
        let scale = self.radial_scale(theta);
        let linear = self.base.project(point)?;
        Some(Pixel::new(linear.x * scale, linear.y * scale))
    }

    pub fn unproject(&self, pixel: &Pixel, range: f64) -> Point3<f64> {
        // Distortion is approximately its own inverse near the center;
        // divide out the estimated scale from the linear model rather
        // than iterating a full Newton solve.
        let linear = self.base.unproject(pixel, range);
        let theta = {
            let p = &linear - self.base.c;
            let r = self.o.dot(&p);
            (p.norm_squared() / (r * r) - 1.0).max(0.0).sqrt()
        };
        let scale = self.radial_scale(theta).max(1e-6);
        let undistorted = Pixel::new(pixel.x / scale, pixel.y / scale);
        self.base.unproject(&undistorted, range)
    }
}

/// CAHVOR plus an entrance-pupil offset `e` and linearity term, modeling
/// cameras (e.g. fisheye) where the effective projection center moves
/// with field angle. Implemented as a further radial warp of CAHVOR
/// rather than a full moving-pupil ray trace.
#[derive(Clone, Debug)]
pub struct CahvoreModel {
    pub base: CahvorModel,
    pub e: Vector3<f64>,
    pub linearity: f64,
}

impl CahvoreModel {
    pub fn new(base: CahvorModel, e: Vector3<f64>, linearity: f64) -> Self {
        Self { base, e, linearity }
    }

    pub fn project(&self, point: &Point3<f64>) -> Option<Pixel> {
        let linear = self.base.project(point)?;
        let p = point - self.base.base.c;
        let pupil_shift = self.e.dot(&p).abs() * (1.0 - self.linearity) * 1e-6;
        Some(Pixel::new(linear.x + pupil_shift, linear.y + pupil_shift))
    }

    pub fn unproject(&self, pixel: &Pixel, range: f64) -> Point3<f64> {
        self.base.unproject(pixel, range)
    }
}

/// Parallel (orthographic) GIS projection: pixel address is a simple
/// affine transform of easting/northing, independent of range. Used for
/// orbital DEM/ortho-image sources.
#[derive(Clone, Debug)]
pub struct OrthoGisModel {
    pub origin_easting: f64,
    pub origin_northing: f64,
    pub meters_per_pixel: f64,
    pub width: usize,
    pub height: usize,
}

impl OrthoGisModel {
    pub fn project(&self, point: &Point3<f64>) -> Option<Pixel> {
        let col = (point.x - self.origin_easting) / self.meters_per_pixel;
        let row = (self.origin_northing - point.y) / self.meters_per_pixel;
        if col < 0.0 || row < 0.0 || col >= self.width as f64 || row >= self.height as f64 {
            return None;
        }
        Some(Pixel::new(row, col))
    }

    pub fn unproject(&self, pixel: &Pixel, range: f64) -> Point3<f64> {
        let easting = self.origin_easting + pixel.y * self.meters_per_pixel;
        let northing = self.origin_northing - pixel.x * self.meters_per_pixel;
        Point3::new(easting, northing, range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_cahv() -> CahvModel {
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
    fn cahv_projects_center_ray_to_principal_point() {
        let cam = simple_cahv();
        let px = cam.project(&Point3::new(0.0, 0.0, 10.0)).unwrap();
        assert!((px.x - 500.0).abs() < 1e-9);
        assert!((px.y - 500.0).abs() < 1e-9);
    }

    #[test]
    fn cahv_behind_camera_returns_none() {
        let cam = simple_cahv();
        assert!(cam.project(&Point3::new(0.0, 0.0, -10.0)).is_none());
    }

    #[test]
    fn cahv_project_unproject_roundtrip_at_fixed_range() {
        let cam = simple_cahv();
        let point = Point3::new(2.0, -1.0, 20.0);
        let px = cam.project(&point).unwrap();
        let back = cam.unproject(&px, 20.0);
        assert!((back - point).norm() < 1e-6);
    }

    #[test]
    fn cahvor_with_zero_distortion_matches_cahv() {
        let base = simple_cahv();
        let cahvor = CahvorModel::new(base.clone(), Vector3::new(0.0, 0.0, 1.0), [0.0, 0.0, 0.0]);
        let point = Point3::new(1.0, 1.0, 15.0);
        let a = base.project(&point).unwrap();
        let b = cahvor.project(&point).unwrap();
        assert!((a.x - b.x).abs() < 1e-9);
        assert!((a.y - b.y).abs() < 1e-9);
    }

    #[test]
    fn ortho_gis_round_trips_easting_northing() {
        let model = OrthoGisModel {
            origin_easting: 1000.0,
            origin_northing: 2000.0,
            meters_per_pixel: 0.5,
            width: 4096,
            height: 4096,
        };
        let point = Point3::new(1010.0, 1990.0, 50.0);
        let px = model.project(&point).unwrap();
        let back = model.unproject(&px, 50.0);
        assert!((back.x - point.x).abs() < 1e-9);
        assert!((back.y - point.y).abs() < 1e-9);
    }
}
