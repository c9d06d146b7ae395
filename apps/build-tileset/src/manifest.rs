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

//! The project manifest: a serialized description of the already-chunked
//! leaf tiles (mesh, baked texture, bounds) a prior ingestion step
//! produced, plus the camera/frame-graph/site-drive records carried
//! through to the scene manifest. Loading raw imagery and meshes from
//! mission-specific formats is a separate concern; this is the one
//! boundary this binary actually reads across.

use anyhow::{ensure, Context, Result};
use mesh::{Mesh, Vertex};
use nalgebra::{Point2, Point3, Vector3};
use raster::Image;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexDto {
    pub position: [f64; 3],
    #[serde(default)]
    pub normal: Option<[f64; 3]>,
    #[serde(default)]
    pub uv: Option<[f64; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshDto {
    pub vertices: Vec<VertexDto>,
    pub triangles: Vec<[u32; 3]>,
}

impl MeshDto {
    pub fn to_mesh(&self) -> Mesh {
        let vertices = self
            .vertices
            .iter()
            .map(|v| {
                let mut vertex = Vertex::at(Point3::new(v.position[0], v.position[1], v.position[2]));
                if let Some(n) = v.normal {
                    vertex = vertex.with_normal(Vector3::new(n[0], n[1], n[2]));
                }
                if let Some(uv) = v.uv {
                    vertex = vertex.with_uv(Point2::new(uv[0], uv[1]));
                }
                vertex
            })
            .collect();
        Mesh::new(vertices, self.triangles.clone())
    }

    pub fn from_mesh(mesh: &Mesh) -> Self {
        let vertices = mesh
            .vertices
            .iter()
            .map(|v| VertexDto {
                position: [v.position.x, v.position.y, v.position.z],
                normal: v.normal.map(|n| [n.x, n.y, n.z]),
                uv: v.uv.map(|uv| [uv.x, uv.y]),
            })
            .collect();
        Self { vertices, triangles: mesh.triangles.clone() }
    }
}

/// Band-major raster: `data[band * height * width + row * width + col]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDto {
    pub bands: usize,
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl ImageDto {
    pub fn to_image(&self) -> Result<Image<f32>> {
        ensure!(
            self.data.len() == self.bands * self.width * self.height,
            "image data length {} does not match bands*width*height {}",
            self.data.len(),
            self.bands * self.width * self.height
        );
        let mut image = Image::<f32>::create(self.bands, self.width, self.height)?;
        for b in 0..self.bands {
            for r in 0..self.height {
                for c in 0..self.width {
                    let value = self.data[b * self.width * self.height + r * self.width + c];
                    image.set(b, r, c, value)?;
                }
            }
        }
        Ok(image)
    }

    pub fn from_image(image: &Image<f32>) -> Result<Self> {
        let (bands, width, height) = (image.band_count(), image.width(), image.height());
        let mut data = vec![0.0_f32; bands * width * height];
        for b in 0..bands {
            for r in 0..height {
                for c in 0..width {
                    data[b * width * height + r * width + c] = image.get(b, r, c)?;
                }
            }
        }
        Ok(Self { bands, width, height, data })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeafSpec {
    pub id: String,
    pub bounds_lo: [f64; 3],
    pub bounds_hi: [f64; 3],
    pub mesh: MeshDto,
    #[serde(default)]
    pub image: Option<ImageDto>,
}

/// Everything a build run needs besides the library crates themselves:
/// the chunked leaf content an ingestion step produced, and the scene
/// metadata (source images, frame graph, site drives) carried through
/// verbatim into `scene.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectManifest {
    pub leaves: Vec<LeafSpec>,
    #[serde(default)]
    pub images: Vec<tileset::ImageDescriptor>,
    #[serde(default)]
    pub frames: Vec<tileset::FrameGraphNode>,
    #[serde(default)]
    pub site_drives: Vec<tileset::SiteDriveRecord>,
}

impl ProjectManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening project manifest {}", path.display()))?;
        let manifest: Self = serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("parsing project manifest {}", path.display()))?;
        ensure!(!manifest.leaves.is_empty(), "project manifest has no leaf tiles");
        Ok(manifest)
    }
}
