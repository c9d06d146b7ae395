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
use mesh::Mesh;

/// Reduce `mesh` toward `target_faces` by widening the vertex-merge
/// epsilon until the face count drops at or below the target (degenerate
/// zero-area triangles produced by merging are dropped). This stands in
/// for a full surface-reconstruction decimator (e.g. FSSR); it preserves
/// overall shape at coarse LODs without needing a mesh half-edge structure.
pub fn decimate_to_target_faces(mesh: &Mesh, target_faces: usize, bounds_diagonal: f64) -> Mesh {
    if mesh.face_count() <= target_faces || target_faces == 0 {
        return mesh.clone();
    }

    let mut lo = 0.0_f64;
    let mut hi = bounds_diagonal.max(1e-6);
    let mut best = mesh.clone();

    for _ in 0..24 {
        let mid = 0.5 * (lo + hi);
        let mut candidate = mesh.clone();
        candidate.merge_nearby_vertices(mid);
        drop_degenerate_triangles(&mut candidate);
        if candidate.face_count() <= target_faces {
            best = candidate;
            hi = mid;
        } else {
            lo = mid;
        }
        if (hi - lo) / hi.max(1e-12) < 1e-3 {
            break;
        }
    }
    best
}

fn drop_degenerate_triangles(mesh: &mut Mesh) {
    mesh.triangles.retain(|tri| tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh::Vertex;
    use nalgebra::Point3;

    fn grid_mesh(n: usize) -> Mesh {
        let mut vertices = Vec::new();
        let mut triangles = Vec::new();
        for r in 0..=n {
            for c in 0..=n {
                vertices.push(Vertex::at(Point3::new(c as f64, r as f64, 0.0)));
            }
        }
        let idx = |r: usize, c: usize| (r * (n + 1) + c) as u32;
        for r in 0..n {
            for c in 0..n {
                triangles.push([idx(r, c), idx(r, c + 1), idx(r + 1, c)]);
                triangles.push([idx(r, c + 1), idx(r + 1, c + 1), idx(r + 1, c)]);
            }
        }
        Mesh::new(vertices, triangles)
    }

    #[test]
    fn decimation_reduces_face_count_toward_target() {
        let mesh = grid_mesh(8);
        let target = mesh.face_count() / 4;
        let decimated = decimate_to_target_faces(&mesh, target, 8.0 * 1.41421356);
        assert!(decimated.face_count() <= mesh.face_count());
    }

    #[test]
    fn decimation_is_noop_when_already_under_target() {
        let mesh = grid_mesh(2);
        let decimated = decimate_to_target_faces(&mesh, mesh.face_count() + 10, 10.0);
        assert_eq!(decimated.face_count(), mesh.face_count());
    }
}
