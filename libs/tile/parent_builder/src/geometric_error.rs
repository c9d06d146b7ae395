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
use mesh::{Mesh, MeshOperator};

/// Target fraction of the parent mesh's faces sampled when estimating the
/// one-directional Hausdorff distance to its dependencies.
pub const PARENT_HAUSDORFF_RELATIVE_ACCURACY: f64 = 0.05;

/// Scales the texture-resolution error term relative to the Hausdorff
/// geometry term; both are expressed in meters.
pub const TEXTURE_ERROR_MULTIPLIER: f64 = 0.5;

/// Approximate one-directional Hausdorff distance from `parent` to the
/// union of `dependencies`: the largest, over a sample of parent surface
/// points, of the distance to the nearest dependency triangle.
pub fn hausdorff_distance(parent: &Mesh, dependencies: &[&Mesh]) -> f64 {
    if dependencies.is_empty() || parent.face_count() == 0 {
        return 0.0;
    }
    let target_samples = (1.0 / PARENT_HAUSDORFF_RELATIVE_ACCURACY.max(1e-6)).ceil() as usize;
    let stride = (parent.face_count() / target_samples.max(1)).max(1);
    let parent_op = MeshOperator::new(parent);
    let samples = parent_op.subsample_centroids(stride);
    let dep_ops: Vec<MeshOperator> = dependencies.iter().map(|m| MeshOperator::new(m)).collect();

    samples
        .iter()
        .map(|p| {
            dep_ops
                .iter()
                .filter_map(|op| op.nearest_triangle(p).map(|(_, closest, _)| (closest - p).norm()))
                .fold(f64::INFINITY, f64::min)
        })
        .filter(|d| d.is_finite())
        .fold(0.0, f64::max)
}

/// Error contributed by rendering `mesh_surface_area` through a texture
/// texel whose footprint on the ground covers `pixel_footprint_area`.
pub fn texture_error(mesh_surface_area: f64, pixel_footprint_area: f64) -> f64 {
    if pixel_footprint_area <= 0.0 || mesh_surface_area <= 0.0 {
        return 0.0;
    }
    TEXTURE_ERROR_MULTIPLIER * (mesh_surface_area / pixel_footprint_area).sqrt()
}

/// A parent's geometric error is the Hausdorff distance to its
/// dependencies plus whatever error those dependencies already carried
/// (the approximation compounds down the tree), or the texture error,
/// whichever is larger.
pub fn combined_geometric_error(dependency_max_error: f64, hausdorff: f64, texture_error: f64) -> f64 {
    (hausdorff + dependency_max_error).max(texture_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh::Vertex;
    use nalgebra::Point3;

    fn unit_triangle_at(z: f64) -> Mesh {
        Mesh::new(
            vec![
                Vertex::at(Point3::new(0.0, 0.0, z)),
                Vertex::at(Point3::new(1.0, 0.0, z)),
                Vertex::at(Point3::new(0.0, 1.0, z)),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn hausdorff_is_zero_for_identical_meshes() {
        let mesh = unit_triangle_at(0.0);
        let d = hausdorff_distance(&mesh, &[&mesh]);
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn hausdorff_reflects_vertical_offset() {
        let parent = unit_triangle_at(1.0);
        let dependency = unit_triangle_at(0.0);
        let d = hausdorff_distance(&parent, &[&dependency]);
        assert!((d - 1.0).abs() < 1e-6);
    }

    #[test]
    fn combined_error_adds_hausdorff_to_dependency_error() {
        let e = combined_geometric_error(5.0, 0.1, 0.2);
        assert_eq!(e, 5.1);
    }

    #[test]
    fn combined_error_falls_back_to_texture_error_when_larger() {
        let e = combined_geometric_error(0.1, 0.1, 5.0);
        assert_eq!(e, 5.0);
    }

    #[test]
    fn texture_error_grows_with_surface_area() {
        let small = texture_error(1.0, 1.0);
        let big = texture_error(100.0, 1.0);
        assert!(big > small);
    }
}
