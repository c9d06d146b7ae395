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
use crate::mesh::{Mesh, Vertex};
use geometry::Aabb3;
use nalgebra::{Point2, Point3};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// Barycentric coordinates of a point within a triangle, `(u, v, w)` with
/// `u + v + w == 1`.
#[derive(Clone, Copy, Debug)]
pub struct Barycentric {
    pub u: f64,
    pub v: f64,
    pub w: f64,
}

impl Barycentric {
    pub fn interpolate(&self, a: f64, b: f64, c: f64) -> f64 {
        self.u * a + self.v * b + self.w * c
    }
}

#[derive(Clone, Copy)]
struct FaceEntry {
    tri_index: usize,
    p0: Point3<f64>,
    p1: Point3<f64>,
    p2: Point3<f64>,
}

impl RTreeObject for FaceEntry {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        let lo = [
            self.p0.x.min(self.p1.x).min(self.p2.x),
            self.p0.y.min(self.p1.y).min(self.p2.y),
            self.p0.z.min(self.p1.z).min(self.p2.z),
        ];
        let hi = [
            self.p0.x.max(self.p1.x).max(self.p2.x),
            self.p0.y.max(self.p1.y).max(self.p2.y),
            self.p0.z.max(self.p1.z).max(self.p2.z),
        ];
        AABB::from_corners(lo, hi)
    }
}

impl PointDistance for FaceEntry {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let p = Point3::new(point[0], point[1], point[2]);
        closest_point_on_triangle(&p, &self.p0, &self.p1, &self.p2)
            .1
    }
}

/// Closest point on triangle (a, b, c) to `p`, per Ericson's
/// `ClosestPtPointTriangle`. Returns (closest point, squared distance).
fn closest_point_on_triangle(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> (Point3<f64>, f64) {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return (*a, (p - a).norm_squared());
    }
    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return (*b, (p - b).norm_squared());
    }
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        let pt = a + ab * v;
        return (pt, (p - pt).norm_squared());
    }
    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return (*c, (p - c).norm_squared());
    }
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        let pt = a + ac * w;
        return (pt, (p - pt).norm_squared());
    }
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        let pt = b + (c - b) * w;
        return (pt, (p - pt).norm_squared());
    }
    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    let pt = a + ab * v + ac * w;
    (pt, (p - pt).norm_squared())
}

fn barycentric_of(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Barycentric {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < 1e-18 {
        return Barycentric { u: 1.0, v: 0.0, w: 0.0 };
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    Barycentric { u: 1.0 - v - w, v, w }
}

/// A spatial-tree index over one mesh's faces, supporting clip, area,
/// face-count, UV<->barycentric lookup, nearest-triangle search, and
/// sub-sampling.
pub struct MeshOperator<'m> {
    mesh: &'m Mesh,
    tree: RTree<FaceEntry>,
}

impl<'m> MeshOperator<'m> {
    pub fn new(mesh: &'m Mesh) -> Self {
        let entries: Vec<FaceEntry> = mesh
            .triangles
            .iter()
            .enumerate()
            .map(|(i, tri)| {
                let [p0, p1, p2] = mesh.triangle_positions(*tri);
                FaceEntry { tri_index: i, p0, p1, p2 }
            })
            .collect();
        Self { mesh, tree: RTree::bulk_load(entries) }
    }

    pub fn mesh(&self) -> &Mesh {
        self.mesh
    }

    fn faces_in_bounds_indices(&self, bounds: &Aabb3) -> Vec<usize> {
        let lo = bounds.lo();
        let hi = bounds.hi();
        let envelope = AABB::from_corners([lo.x, lo.y, lo.z], [hi.x, hi.y, hi.z]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|f| f.tri_index)
            .collect()
    }

    pub fn face_count_in_bounds(&self, bounds: &Aabb3) -> usize {
        self.faces_in_bounds_indices(bounds).len()
    }

    /// Sum of triangle area for faces whose bounding box intersects
    /// `bounds` (pre-clip estimate, used by `AreaSplitCriteria`).
    pub fn area_in_bounds(&self, bounds: &Aabb3) -> f64 {
        self.faces_in_bounds_indices(bounds)
            .into_iter()
            .map(|i| self.mesh.triangle_area(self.mesh.triangles[i]))
            .sum()
    }

    /// Clip the mesh against an axis-aligned box via Sutherland-Hodgman
    /// polygon clipping per triangle, against each of the box's six
    /// planes in turn; clipped polygons are re-triangulated as a fan.
    pub fn clip(&self, bounds: &Aabb3) -> Mesh {
        let lo = bounds.lo();
        let hi = bounds.hi();
        let planes: [(usize, f64, f64); 3] = [(0, lo.x, hi.x), (1, lo.y, hi.y), (2, lo.z, hi.z)];

        let mut out_vertices: Vec<Vertex> = Vec::new();
        let mut out_triangles: Vec<[u32; 3]> = Vec::new();

        for tri in &self.mesh.triangles {
            let mut poly: Vec<Vertex> = tri.iter().map(|&i| self.mesh.vertices[i as usize]).collect();
            for &(axis, min, max) in &planes {
                poly = clip_polygon_axis(&poly, axis, min, true);
                if poly.is_empty() {
                    break;
                }
                poly = clip_polygon_axis(&poly, axis, max, false);
                if poly.is_empty() {
                    break;
                }
            }
            if poly.len() < 3 {
                continue;
            }
            let base = out_vertices.len() as u32;
            out_vertices.extend(poly.iter().copied());
            for i in 1..poly.len() - 1 {
                out_triangles.push([base, base + i as u32, base + i as u32 + 1]);
            }
        }

        Mesh::new(out_vertices, out_triangles)
    }

    /// Nearest triangle (by exact point-to-triangle distance) to `point`,
    /// returning its index, the closest point on it, and barycentric
    /// coordinates of that closest point.
    pub fn nearest_triangle(&self, point: &Point3<f64>) -> Option<(usize, Point3<f64>, Barycentric)> {
        let entry = self.tree.nearest_neighbor(&[point.x, point.y, point.z])?;
        let (closest, _) = closest_point_on_triangle(point, &entry.p0, &entry.p1, &entry.p2);
        let bary = barycentric_of(&closest, &entry.p0, &entry.p1, &entry.p2);
        Some((entry.tri_index, closest, bary))
    }

    /// Lift a UV coordinate to 3-D via the triangle whose UV footprint
    /// contains it (linear search; meshes passed through the texture
    /// baker are small per-tile patches so this stays cheap).
    pub fn uv_to_point(&self, uv: &Point2<f64>) -> Option<(usize, Point3<f64>)> {
        for (i, tri) in self.mesh.triangles.iter().enumerate() {
            let uvs: Option<Vec<Point2<f64>>> =
                tri.iter().map(|&idx| self.mesh.vertices[idx as usize].uv).collect();
            let Some(uvs) = uvs else { continue };
            if !point_in_triangle_2d(uv, &uvs[0], &uvs[1], &uvs[2]) {
                continue;
            }
            let bary = barycentric_2d(uv, &uvs[0], &uvs[1], &uvs[2]);
            let [p0, p1, p2] = self.mesh.triangle_positions(*tri);
            let point = Point3::new(
                bary.interpolate(p0.x, p1.x, p2.x),
                bary.interpolate(p0.y, p1.y, p2.y),
                bary.interpolate(p0.z, p1.z, p2.z),
            );
            return Some((i, point));
        }
        None
    }

    /// Deterministically sub-sample every `stride`-th triangle's centroid,
    /// used by the approximate texture-split criteria's central-ray test.
    pub fn subsample_centroids(&self, stride: usize) -> Vec<Point3<f64>> {
        self.mesh
            .triangles
            .iter()
            .step_by(stride.max(1))
            .map(|tri| {
                let [a, b, c] = self.mesh.triangle_positions(*tri);
                Point3::new(
                    (a.x + b.x + c.x) / 3.0,
                    (a.y + b.y + c.y) / 3.0,
                    (a.z + b.z + c.z) / 3.0,
                )
            })
            .collect()
    }
}

fn clip_polygon_axis(poly: &[Vertex], axis: usize, value: f64, keep_greater: bool) -> Vec<Vertex> {
    if poly.is_empty() {
        return Vec::new();
    }
    let coord = |v: &Vertex| v.position[axis];
    let inside = |v: &Vertex| if keep_greater { coord(v) >= value } else { coord(v) <= value };
    let mut out = Vec::new();
    for i in 0..poly.len() {
        let curr = poly[i];
        let prev = poly[(i + poly.len() - 1) % poly.len()];
        let curr_in = inside(&curr);
        let prev_in = inside(&prev);
        if curr_in {
            if !prev_in {
                out.push(lerp_vertex(&prev, &curr, axis, value));
            }
            out.push(curr);
        } else if prev_in {
            out.push(lerp_vertex(&prev, &curr, axis, value));
        }
    }
    out
}

fn lerp_vertex(a: &Vertex, b: &Vertex, axis: usize, value: f64) -> Vertex {
    let denom = b.position[axis] - a.position[axis];
    let t = if denom.abs() < 1e-18 { 0.0 } else { (value - a.position[axis]) / denom };
    let t = t.clamp(0.0, 1.0);
    Vertex {
        position: a.position + (b.position - a.position) * t,
        normal: match (a.normal, b.normal) {
            (Some(an), Some(bn)) => Some(an + (bn - an) * t),
            _ => None,
        },
        color: None,
        uv: match (a.uv, b.uv) {
            (Some(au), Some(bu)) => Some(au + (bu - au) * t),
            _ => None,
        },
    }
}

fn point_in_triangle_2d(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> bool {
    let sign = |p1: &Point2<f64>, p2: &Point2<f64>, p3: &Point2<f64>| {
        (p1.x - p3.x) * (p2.y - p3.y) - (p2.x - p3.x) * (p1.y - p3.y)
    };
    let d1 = sign(p, a, b);
    let d2 = sign(p, b, c);
    let d3 = sign(p, c, a);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

fn barycentric_2d(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> Barycentric {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < 1e-18 {
        return Barycentric { u: 1.0, v: 0.0, w: 0.0 };
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    Barycentric { u: 1.0 - v - w, v, w }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangle_quad() -> Mesh {
        Mesh::new(
            vec![
                Vertex::at(Point3::new(0.0, 0.0, 0.0)).with_uv(Point2::new(0.0, 0.0)),
                Vertex::at(Point3::new(2.0, 0.0, 0.0)).with_uv(Point2::new(1.0, 0.0)),
                Vertex::at(Point3::new(2.0, 2.0, 0.0)).with_uv(Point2::new(1.0, 1.0)),
                Vertex::at(Point3::new(0.0, 2.0, 0.0)).with_uv(Point2::new(0.0, 1.0)),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn face_count_in_bounds_counts_intersecting_triangles() {
        let mesh = two_triangle_quad();
        let op = MeshOperator::new(&mesh);
        let bounds = Aabb3::from_bounds(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        assert_eq!(op.face_count_in_bounds(&bounds), 1);
    }

    #[test]
    fn clip_reduces_mesh_to_sub_box() {
        let mesh = two_triangle_quad();
        let op = MeshOperator::new(&mesh);
        let bounds = Aabb3::from_bounds(Point3::new(0.5, 0.5, -1.0), Point3::new(1.5, 1.5, 1.0));
        let clipped = op.clip(&bounds);
        assert!(clipped.face_count() > 0);
        assert!(clipped.total_area() < mesh.total_area());
        for v in &clipped.vertices {
            assert!(v.position.x >= 0.5 - 1e-9 && v.position.x <= 1.5 + 1e-9);
            assert!(v.position.y >= 0.5 - 1e-9 && v.position.y <= 1.5 + 1e-9);
        }
    }

    #[test]
    fn nearest_triangle_finds_the_closer_one() {
        let mesh = two_triangle_quad();
        let op = MeshOperator::new(&mesh);
        let (idx, closest, _) = op.nearest_triangle(&Point3::new(1.9, 0.1, 5.0)).unwrap();
        assert_eq!(idx, 0);
        assert!((closest.z - 0.0).abs() < 1e-9);
    }

    #[test]
    fn uv_to_point_lifts_uv_into_3d() {
        let mesh = two_triangle_quad();
        let op = MeshOperator::new(&mesh);
        let (_, point) = op.uv_to_point(&Point2::new(0.25, 0.25)).unwrap();
        assert!((point.x - 0.5).abs() < 1e-9);
        assert!((point.y - 0.5).abs() < 1e-9);
    }

    #[test]
    fn single_triangle_clip_against_its_own_bounds_is_identity_area() {
        let mesh = Mesh::new(
            vec![
                Vertex::at(Point3::new(0.0, 0.0, 0.0)),
                Vertex::at(Point3::new(1.0, 0.0, 0.0)),
                Vertex::at(Point3::new(0.0, 1.0, 0.0)),
            ],
            vec![[0, 1, 2]],
        );
        let op = MeshOperator::new(&mesh);
        let bounds = Aabb3::from_bounds(Point3::new(-1.0, -1.0, -1.0), Point3::new(2.0, 2.0, 1.0));
        let clipped = op.clip(&bounds);
        assert!((clipped.total_area() - mesh.total_area()).abs() < 1e-9);
    }
}
