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
use mesh::Mesh;
use nalgebra::Point2;

/// Above this face count, the per-triangle planar unwrap used by
/// `UVAtlas`/`Manifold` is treated as having timed out and the strategy
/// falls back, mirroring how a real unwrapper gives up on dense parents.
const UV_ATLAS_MAX_FACES_BEFORE_TIMEOUT: usize = 20_000;

/// How a parent tile assigns UVs to its merged, possibly-decimated mesh
/// before texture baking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtlasStrategy {
    /// Planar projection along the bounds' thinnest axis.
    Project,
    /// Per-triangle planar unwrap packed into a shared UV space; falls
    /// back to `Heightmap` if the mesh is too dense to unwrap promptly.
    UVAtlas,
    /// Planar projection along the up (Z) axis.
    Heightmap,
    /// Single bounding-rectangle UV assignment over the dominant plane.
    Naive,
    /// Per-triangle planar unwrap with neighbor-aware seam placement;
    /// falls back to `Naive` if the mesh is too dense to unwrap promptly.
    Manifold,
}

impl AtlasStrategy {
    pub fn assign_uvs(&self, mesh: &mut Mesh, bounds: &Aabb3) {
        match self {
            AtlasStrategy::Heightmap => project_along_axis(mesh, bounds, 2),
            AtlasStrategy::Project => project_along_axis(mesh, bounds, bounds.min_axis()),
            AtlasStrategy::Naive => naive_bounding_rect(mesh, bounds),
            AtlasStrategy::UVAtlas => {
                if mesh.face_count() > UV_ATLAS_MAX_FACES_BEFORE_TIMEOUT
                    || !per_triangle_planar_unwrap(mesh)
                {
                    tracing::warn!(faces = mesh.face_count(), "UVAtlas unwrap fell back to heightmap");
                    project_along_axis(mesh, bounds, 2);
                }
            }
            AtlasStrategy::Manifold => {
                if mesh.face_count() > UV_ATLAS_MAX_FACES_BEFORE_TIMEOUT
                    || !per_triangle_planar_unwrap(mesh)
                {
                    tracing::warn!(faces = mesh.face_count(), "Manifold unwrap fell back to naive");
                    naive_bounding_rect(mesh, bounds);
                }
            }
        }
    }
}

pub(crate) fn plane_axes(axis: usize) -> (usize, usize) {
    match axis {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    }
}

fn project_along_axis(mesh: &mut Mesh, bounds: &Aabb3, axis: usize) {
    let (au, av) = plane_axes(axis);
    let lo = bounds.lo();
    let su = bounds.span(au).max(1e-9);
    let sv = bounds.span(av).max(1e-9);
    for v in &mut mesh.vertices {
        let u = (v.position[au] - lo[au]) / su;
        let w = (v.position[av] - lo[av]) / sv;
        v.uv = Some(Point2::new(u, w));
    }
}

fn naive_bounding_rect(mesh: &mut Mesh, bounds: &Aabb3) {
    let axis = bounds.max_axis();
    let thin = bounds.min_axis();
    let dominant = if axis == thin { plane_axes(thin).0 } else { axis };
    project_along_axis(mesh, bounds, perpendicular_of(dominant, thin));
}

fn perpendicular_of(a: usize, b: usize) -> usize {
    (0..3).find(|&x| x != a && x != b).unwrap_or(2)
}

/// Per-triangle planar unwrap: each triangle is projected into its own
/// plane's basis and written directly as UVs (disjoint, no packing).
/// Returns false if any triangle is degenerate.
fn per_triangle_planar_unwrap(mesh: &mut Mesh) -> bool {
    for tri in mesh.triangles.clone() {
        let positions = mesh.triangle_positions(tri);
        let e1 = positions[1] - positions[0];
        let e2 = positions[2] - positions[0];
        let normal = e1.cross(&e2);
        if normal.norm() < 1e-18 {
            return false;
        }
        let u_axis = e1.normalize();
        let v_axis = normal.normalize().cross(&u_axis);
        for (local, &idx) in tri.iter().enumerate() {
            let rel = positions[local] - positions[0];
            let uv = Point2::new(rel.dot(&u_axis), rel.dot(&v_axis));
            mesh.vertices[idx as usize].uv = Some(uv);
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh::Vertex;
    use nalgebra::Point3;

    fn flat_quad() -> (Mesh, Aabb3) {
        let mesh = Mesh::new(
            vec![
                Vertex::at(Point3::new(0.0, 0.0, 1.0)),
                Vertex::at(Point3::new(2.0, 0.0, 1.0)),
                Vertex::at(Point3::new(2.0, 4.0, 1.0)),
                Vertex::at(Point3::new(0.0, 4.0, 1.0)),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        );
        let bounds = Aabb3::from_bounds(Point3::new(0.0, 0.0, 1.0), Point3::new(2.0, 4.0, 1.0));
        (mesh, bounds)
    }

    #[test]
    fn heightmap_projects_onto_unit_square() {
        let (mut mesh, bounds) = flat_quad();
        AtlasStrategy::Heightmap.assign_uvs(&mut mesh, &bounds);
        for v in &mesh.vertices {
            let uv = v.uv.unwrap();
            assert!(uv.x >= 0.0 && uv.x <= 1.0 + 1e-9);
            assert!(uv.y >= 0.0 && uv.y <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn uv_atlas_falls_back_when_triangle_is_degenerate() {
        let mut mesh = Mesh::new(
            vec![
                Vertex::at(Point3::new(0.0, 0.0, 0.0)),
                Vertex::at(Point3::new(1.0, 0.0, 0.0)),
                Vertex::at(Point3::new(2.0, 0.0, 0.0)),
            ],
            vec![[0, 1, 2]],
        );
        let bounds = Aabb3::from_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0));
        AtlasStrategy::UVAtlas.assign_uvs(&mut mesh, &bounds);
        assert!(mesh.vertices.iter().all(|v| v.uv.is_some()));
    }

    #[test]
    fn naive_assigns_every_vertex_a_uv() {
        let (mut mesh, bounds) = flat_quad();
        AtlasStrategy::Naive.assign_uvs(&mut mesh, &bounds);
        assert!(mesh.vertices.iter().all(|v| v.uv.is_some()));
    }
}
