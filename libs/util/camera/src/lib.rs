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

//! Polymorphic camera projection models (linear CAHV, non-linear
//! CAHVOR/CAHVORE, orthographic GIS) plus frustum convex-hull generation
//! for observation culling.

mod cahv;
mod hull;

pub use cahv::{CahvModel, CahvoreModel, CahvorModel, OrthoGisModel};
pub use hull::FrustumHull;

use geometry::Plane;
use nalgebra::{Point2, Point3};

/// A single pixel addressed by (row, col) in the image plane, upper-left
/// origin, sampling point is the pixel center.
pub type Pixel = Point2<f64>;

/// Tagged variant over every supported projection model. All variants are
/// deep-cloneable; only `Linear` has a closed-form frustum hull (the
/// others are cropped/culled using a bounding cone approximation instead).
#[derive(Clone, Debug)]
pub enum CameraModel {
    Linear(CahvModel),
    Radial(CahvorModel),
    EntrancePupil(CahvoreModel),
    OrthographicGis(OrthoGisModel),
}

impl CameraModel {
    pub fn project(&self, point: &Point3<f64>) -> Option<Pixel> {
        match self {
            Self::Linear(m) => m.project(point),
            Self::Radial(m) => m.project(point),
            Self::EntrancePupil(m) => m.project(point),
            Self::OrthographicGis(m) => m.project(point),
        }
    }

    pub fn unproject(&self, pixel: &Pixel, range: f64) -> Point3<f64> {
        match self {
            Self::Linear(m) => m.unproject(pixel, range),
            Self::Radial(m) => m.unproject(pixel, range),
            Self::EntrancePupil(m) => m.unproject(pixel, range),
            Self::OrthographicGis(m) => m.unproject(pixel, range),
        }
    }

    pub fn image_width(&self) -> usize {
        match self {
            Self::Linear(m) => m.width,
            Self::Radial(m) => m.base.width,
            Self::EntrancePupil(m) => m.base.base.width,
            Self::OrthographicGis(m) => m.width,
        }
    }

    pub fn image_height(&self) -> usize {
        match self {
            Self::Linear(m) => m.height,
            Self::Radial(m) => m.base.height,
            Self::EntrancePupil(m) => m.base.base.height,
            Self::OrthographicGis(m) => m.height,
        }
    }

    /// Closed-form convex hull of the viewing frustum. Only the linear
    /// (CAHV) variant has one; non-linear distortion makes the frustum
    /// boundary curved, so CAHVOR/CAHVORE/orthographic-GIS return `None`
    /// and callers fall back to a per-observation bounding test instead.
    pub fn frustum_hull(&self, near: f64, far: f64) -> Option<FrustumHull> {
        match self {
            Self::Linear(m) => Some(m.frustum_hull(near, far)),
            _ => None,
        }
    }
}

/// A single clip-plane boundary used by a frustum hull; re-exported here
/// so callers don't also have to depend on `geometry` just to inspect
/// hull planes.
pub type HullPlane = Plane;
