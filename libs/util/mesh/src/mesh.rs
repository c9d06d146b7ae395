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
use nalgebra::{Point2, Point3, Vector3};

/// A mesh vertex. Color is stored linear RGBA; UV origin is lower-left to
/// match the raster convention used by the texture baker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub position: Point3<f64>,
    pub normal: Option<Vector3<f64>>,
    pub color: Option<[f32; 4]>,
    pub uv: Option<Point2<f64>>,
}

impl Vertex {
    pub fn at(position: Point3<f64>) -> Self {
        Self { position, normal: None, color: None, uv: None }
    }

    pub fn with_normal(mut self, normal: Vector3<f64>) -> Self {
        self.normal = Some(normal);
        self
    }

    pub fn with_uv(mut self, uv: Point2<f64>) -> Self {
        self.uv = Some(uv);
        self
    }
}

/// An unordered set of triangles referencing a shared vertex buffer.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, triangles: Vec<[u32; 3]>) -> Self {
        Self { vertices, triangles }
    }

    pub fn face_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn triangle_positions(&self, tri: [u32; 3]) -> [Point3<f64>; 3] {
        [
            self.vertices[tri[0] as usize].position,
            self.vertices[tri[1] as usize].position,
            self.vertices[tri[2] as usize].position,
        ]
    }

    pub fn triangle_area(&self, tri: [u32; 3]) -> f64 {
        let [a, b, c] = self.triangle_positions(tri);
        0.5 * (b - a).cross(&(c - a)).norm()
    }

    pub fn total_area(&self) -> f64 {
        self.triangles.iter().map(|t| self.triangle_area(*t)).sum()
    }

    pub fn uv_area(&self, tri: [u32; 3]) -> Option<f64> {
        let uvs: Vec<Point2<f64>> = tri.iter().map(|&i| self.vertices[i as usize].uv).collect::<Option<Vec<_>>>()?;
        let cross = (uvs[1] - uvs[0]).x * (uvs[2] - uvs[0]).y - (uvs[1] - uvs[0]).y * (uvs[2] - uvs[0]).x;
        Some(0.5 * cross.abs())
    }

    /// Merge `other`'s vertices/triangles into `self`, preserving normals
    /// but dropping UVs and colors -- the contract the Parent Builder
    /// relies on when merging dependency meshes before clip/decimate.
    pub fn merge_preserving_normals_only(&mut self, other: &Mesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend(other.vertices.iter().map(|v| Vertex {
            position: v.position,
            normal: v.normal,
            color: None,
            uv: None,
        }));
        self.triangles
            .extend(other.triangles.iter().map(|t| [t[0] + base, t[1] + base, t[2] + base]));
    }

    /// Merge vertices whose positions are within `epsilon` of each other,
    /// updating triangle indices and dropping the now-duplicate entries.
    /// Per design, only ever applied to parent (not leaf) meshes.
    pub fn merge_nearby_vertices(&mut self, epsilon: f64) {
        let mut representative = vec![u32::MAX; self.vertices.len()];
        let mut kept: Vec<Vertex> = Vec::new();
        for i in 0..self.vertices.len() {
            if representative[i] != u32::MAX {
                continue;
            }
            let keep_index = kept.len() as u32;
            kept.push(self.vertices[i]);
            representative[i] = keep_index;
            for j in (i + 1)..self.vertices.len() {
                if representative[j] == u32::MAX
                    && (self.vertices[i].position - self.vertices[j].position).norm() <= epsilon
                {
                    representative[j] = keep_index;
                }
            }
        }
        for tri in &mut self.triangles {
            for idx in tri.iter_mut() {
                *idx = representative[*idx as usize];
            }
        }
        self.vertices = kept;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Mesh {
        Mesh::new(
            vec![
                Vertex::at(Point3::new(0.0, 0.0, 0.0)),
                Vertex::at(Point3::new(1.0, 0.0, 0.0)),
                Vertex::at(Point3::new(0.0, 1.0, 0.0)),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn triangle_area_of_unit_right_triangle_is_half() {
        let mesh = unit_triangle();
        assert!((mesh.total_area() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn merge_nearby_vertices_collapses_duplicates() {
        let mut mesh = Mesh::new(
            vec![
                Vertex::at(Point3::new(0.0, 0.0, 0.0)),
                Vertex::at(Point3::new(0.0001, 0.0, 0.0)),
                Vertex::at(Point3::new(1.0, 0.0, 0.0)),
            ],
            vec![[0, 1, 2], [1, 0, 2]],
        );
        mesh.merge_nearby_vertices(0.001);
        assert_eq!(mesh.vertices.len(), 2);
    }

    #[test]
    fn merge_preserving_normals_only_drops_uv_and_color() {
        let mut a = Mesh::default();
        let mut b = unit_triangle();
        b.vertices[0].uv = Some(Point2::new(0.0, 0.0));
        b.vertices[0].color = Some([1.0, 0.0, 0.0, 1.0]);
        a.merge_preserving_normals_only(&b);
        assert!(a.vertices[0].uv.is_none());
        assert!(a.vertices[0].color.is_none());
    }
}
