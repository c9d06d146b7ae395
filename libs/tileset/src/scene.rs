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

//! The scene manifest: tileset references, camera-model-bearing image
//! descriptors, the inter-frame transform graph, and site-drive records.
//! Written alongside `tileset.json` as `scene.json`.

use camera::{CahvModel, CahvoreModel, CahvorModel, CameraModel, OrthoGisModel};
use serde::{Deserialize, Serialize};

/// Tagged serialization of a [`CameraModel`]; one variant per concrete
/// projection, carrying exactly the parameters that model needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CameraModelDescriptor {
    Cahv { c: [f64; 3], a: [f64; 3], h: [f64; 3], v: [f64; 3] },
    Cahvor { c: [f64; 3], a: [f64; 3], h: [f64; 3], v: [f64; 3], o: [f64; 3], r: [f64; 3] },
    Cahvore {
        c: [f64; 3],
        a: [f64; 3],
        h: [f64; 3],
        v: [f64; 3],
        o: [f64; 3],
        r: [f64; 3],
        e: [f64; 3],
        linearity: f64,
    },
    OrthoGis { origin_easting: f64, origin_northing: f64, meters_per_pixel: f64 },
}

fn point_arr(p: &nalgebra::Point3<f64>) -> [f64; 3] {
    [p.x, p.y, p.z]
}

fn vec_arr(v: &nalgebra::Vector3<f64>) -> [f64; 3] {
    [v.x, v.y, v.z]
}

impl From<&CahvModel> for CameraModelDescriptor {
    fn from(m: &CahvModel) -> Self {
        Self::Cahv { c: point_arr(&m.c), a: vec_arr(&m.a), h: vec_arr(&m.h), v: vec_arr(&m.v) }
    }
}

impl From<&CahvorModel> for CameraModelDescriptor {
    fn from(m: &CahvorModel) -> Self {
        Self::Cahvor {
            c: point_arr(&m.base.c),
            a: vec_arr(&m.base.a),
            h: vec_arr(&m.base.h),
            v: vec_arr(&m.base.v),
            o: vec_arr(&m.o),
            r: m.r,
        }
    }
}

impl From<&CahvoreModel> for CameraModelDescriptor {
    fn from(m: &CahvoreModel) -> Self {
        Self::Cahvore {
            c: point_arr(&m.base.base.c),
            a: vec_arr(&m.base.base.a),
            h: vec_arr(&m.base.base.h),
            v: vec_arr(&m.base.base.v),
            o: vec_arr(&m.base.o),
            r: m.base.r,
            e: vec_arr(&m.e),
            linearity: m.linearity,
        }
    }
}

impl From<&OrthoGisModel> for CameraModelDescriptor {
    fn from(m: &OrthoGisModel) -> Self {
        Self::OrthoGis {
            origin_easting: m.origin_easting,
            origin_northing: m.origin_northing,
            meters_per_pixel: m.meters_per_pixel,
        }
    }
}

impl From<&CameraModel> for CameraModelDescriptor {
    fn from(m: &CameraModel) -> Self {
        match m {
            CameraModel::Linear(c) => c.into(),
            CameraModel::Radial(c) => c.into(),
            CameraModel::EntrancePupil(c) => c.into(),
            CameraModel::OrthographicGis(c) => c.into(),
        }
    }
}

/// A single source image and the camera model that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub id: String,
    pub camera: CameraModelDescriptor,
    pub width: usize,
    pub height: usize,
}

impl ImageDescriptor {
    pub fn new(id: impl Into<String>, camera: &CameraModel) -> Self {
        Self {
            id: id.into(),
            camera: camera.into(),
            width: camera.image_width(),
            height: camera.image_height(),
        }
    }
}

/// One node in the inter-frame transform graph: `translation`/`rotation`
/// (quaternion xyzw) relative to `parent_id`, `None` for the root frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameGraphNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub translation: [f64; 3],
    pub rotation: [f64; 4],
    pub scale: f64,
}

impl FrameGraphNode {
    pub fn root(id: impl Into<String>) -> Self {
        Self { id: id.into(), parent_id: None, translation: [0.0, 0.0, 0.0], rotation: [0.0, 0.0, 0.0, 1.0], scale: 1.0 }
    }
}

/// A rover site-drive: the surface frame a contiguous set of observations
/// shares, plus its geodetic placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteDriveRecord {
    pub site: i32,
    pub drive: i32,
    pub northing: f64,
    pub easting: f64,
    pub elevation: f64,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneManifest {
    pub tilesets: Vec<String>,
    pub images: Vec<ImageDescriptor>,
    pub frames: Vec<FrameGraphNode>,
    pub site_drives: Vec<SiteDriveRecord>,
}

impl SceneManifest {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};

    #[test]
    fn linear_camera_model_round_trips_through_json() {
        let cahv = CahvModel::new(
            Point3::new(1.0, 2.0, 3.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(500.0, 0.0, 320.0),
            Vector3::new(0.0, 500.0, 240.0),
            640,
            480,
        );
        let model = CameraModel::Linear(cahv);
        let image = ImageDescriptor::new("obs_001", &model);
        let json = serde_json::to_string(&image).unwrap();
        assert!(json.contains("\"type\":\"Cahv\""));
        let back: ImageDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back.width, 640);
        assert_eq!(back.height, 480);
    }

    #[test]
    fn root_frame_has_no_parent_and_identity_rotation() {
        let root = FrameGraphNode::root("root");
        assert!(root.parent_id.is_none());
        assert_eq!(root.rotation, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn scene_manifest_serializes_site_drive_fields() {
        let mut scene = SceneManifest::new();
        scene.site_drives.push(SiteDriveRecord {
            site: 4,
            drive: 12,
            northing: 100.0,
            easting: -50.0,
            elevation: 12.5,
            lat: 18.4,
            lon: 77.5,
        });
        let json = serde_json::to_value(&scene).unwrap();
        assert_eq!(json["site_drives"][0]["drive"], 12);
    }
}
