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
use crate::error::{BakerError, Result};
use mesh::Mesh;
use nalgebra::Point2;

/// Border (in texels) left between packed patches, so bicubic resampling
/// at a patch edge never bleeds into its neighbor.
pub const TEXTURE_PATCH_BORDER_SIZE: usize = 2;

struct Patch {
    tri_index: usize,
    min: Point2<f64>,
    max: Point2<f64>,
}

impl Patch {
    fn width(&self) -> f64 {
        self.max.x - self.min.x
    }
    fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
    fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

struct Shelf {
    y: usize,
    height: usize,
    cursor_x: usize,
}

/// Collects per-face minimal-bounding-rectangle patches in source UV
/// space, sorts by area, and packs them into a square atlas with shelf
/// packing, rewriting the mesh's UVs into the new atlas.
pub struct TexturedMeshClipper {
    pub max_tile_resolution: usize,
    pub patch_border: usize,
}

impl Default for TexturedMeshClipper {
    fn default() -> Self {
        Self { max_tile_resolution: 4096, patch_border: TEXTURE_PATCH_BORDER_SIZE }
    }
}

impl TexturedMeshClipper {
    /// Repacks `mesh`'s UVs into a fresh square atlas. Returns the atlas
    /// side length in texels that the rewritten UVs assume.
    pub fn repack(&self, mesh: &mut Mesh) -> Result<usize> {
        if mesh.triangles.is_empty() {
            return Ok(self.patch_border.max(1));
        }

        let mut patches: Vec<Patch> = Vec::with_capacity(mesh.triangles.len());
        for (i, tri) in mesh.triangles.iter().enumerate() {
            let uvs: Option<Vec<Point2<f64>>> =
                tri.iter().map(|&idx| mesh.vertices[idx as usize].uv).collect();
            let Some(uvs) = uvs else { continue };
            let min = Point2::new(
                uvs.iter().map(|p| p.x).fold(f64::INFINITY, f64::min),
                uvs.iter().map(|p| p.y).fold(f64::INFINITY, f64::min),
            );
            let max = Point2::new(
                uvs.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max),
                uvs.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max),
            );
            patches.push(Patch { tri_index: i, min, max });
        }
        if patches.is_empty() {
            return Ok(self.patch_border.max(1));
        }

        // Patches are measured in normalized UV units; place them on an
        // initial working resolution equal to max_tile_resolution and scale
        // down afterward if they all fit inside a smaller square.
        let working = self.max_tile_resolution;
        patches.sort_by(|a, b| b.area().partial_cmp(&a.area()).unwrap_or(std::cmp::Ordering::Equal));

        let border = self.patch_border;
        let mut shelves: Vec<Shelf> = Vec::new();
        let mut placements: Vec<(usize, usize, usize)> = Vec::with_capacity(patches.len());
        let mut used_height = 0usize;

        for patch in &patches {
            let w = ((patch.width() * working as f64).ceil() as usize + border).max(1);
            let h = ((patch.height() * working as f64).ceil() as usize + border).max(1);
            if w > working {
                return Err(BakerError::AtlasTooLarge { side: w, max: working });
            }

            let mut placed = None;
            for shelf in &mut shelves {
                if shelf.cursor_x + w <= working && h <= shelf.height {
                    placed = Some((shelf.cursor_x, shelf.y));
                    shelf.cursor_x += w;
                    break;
                }
            }
            let (x, y) = match placed {
                Some(p) => p,
                None => {
                    let y = used_height;
                    if y + h > working {
                        return Err(BakerError::AtlasTooLarge { side: y + h, max: working });
                    }
                    shelves.push(Shelf { y, height: h, cursor_x: w });
                    used_height += h;
                    (0, y)
                }
            };
            placements.push((patch.tri_index, x, y));
        }

        let atlas_side = used_height.max(1).min(working);
        for (i, (tri_index, x, y)) in placements.into_iter().enumerate() {
            let patch = &patches[i];
            let tri = mesh.triangles[tri_index];
            for &vidx in &tri {
                let v = &mut mesh.vertices[vidx as usize];
                if let Some(uv) = v.uv {
                    let local_u = (uv.x - patch.min.x) / patch.width().max(1e-9);
                    let local_v = (uv.y - patch.min.y) / patch.height().max(1e-9);
                    let px = x as f64 + local_u * (patch.width() * working as f64);
                    let py = y as f64 + local_v * (patch.height() * working as f64);
                    v.uv = Some(Point2::new(
                        px / atlas_side as f64,
                        py / atlas_side as f64,
                    ));
                }
            }
        }

        Ok(atlas_side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh::Vertex;
    use nalgebra::Point3;

    fn two_disjoint_triangles() -> Mesh {
        Mesh::new(
            vec![
                Vertex::at(Point3::new(0.0, 0.0, 0.0)).with_uv(Point2::new(0.0, 0.0)),
                Vertex::at(Point3::new(1.0, 0.0, 0.0)).with_uv(Point2::new(0.1, 0.0)),
                Vertex::at(Point3::new(0.0, 1.0, 0.0)).with_uv(Point2::new(0.0, 0.1)),
                Vertex::at(Point3::new(2.0, 2.0, 0.0)).with_uv(Point2::new(0.5, 0.5)),
                Vertex::at(Point3::new(3.0, 2.0, 0.0)).with_uv(Point2::new(0.6, 0.5)),
                Vertex::at(Point3::new(2.0, 3.0, 0.0)).with_uv(Point2::new(0.5, 0.6)),
            ],
            vec![[0, 1, 2], [3, 4, 5]],
        )
    }

    #[test]
    fn repack_keeps_uvs_within_unit_square() {
        let mut mesh = two_disjoint_triangles();
        let clipper = TexturedMeshClipper { max_tile_resolution: 256, patch_border: 2 };
        clipper.repack(&mut mesh).unwrap();
        for v in &mesh.vertices {
            let uv = v.uv.unwrap();
            assert!(uv.x >= 0.0 && uv.x <= 1.0 + 1e-6);
            assert!(uv.y >= 0.0 && uv.y <= 1.0 + 1e-6);
        }
    }

    #[test]
    fn single_triangle_atlases_in_any_mode() {
        let mut mesh = Mesh::new(
            vec![
                Vertex::at(Point3::new(0.0, 0.0, 0.0)).with_uv(Point2::new(0.0, 0.0)),
                Vertex::at(Point3::new(1.0, 0.0, 0.0)).with_uv(Point2::new(1.0, 0.0)),
                Vertex::at(Point3::new(0.0, 1.0, 0.0)).with_uv(Point2::new(0.0, 1.0)),
            ],
            vec![[0, 1, 2]],
        );
        let clipper = TexturedMeshClipper::default();
        assert!(clipper.repack(&mut mesh).is_ok());
    }
}
