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
use crate::atlas::{plane_axes, AtlasStrategy};
use crate::decimate::decimate_to_target_faces;
use crate::error::{ParentBuilderError, Result};
use crate::geometric_error::{combined_geometric_error, hausdorff_distance, texture_error};
use geometry::Aabb3;
use mesh::{Mesh, MeshOperator};
use raster::Image;
use texture_baker::{bake, SourcePair};
use tile_tree::Tile;

/// Vertices within this many meters of each other are merged when a
/// parent mesh is built; leaf meshes are left untouched.
pub const PARENT_MESH_VERTEX_MERGE_EPSILON: f64 = 0.002;

/// One dependency (child) tile's already-built content, as needed to
/// fold it into its parent.
pub struct DependencyInput<'m> {
    pub tile: &'m Tile,
    pub mesh: &'m Mesh,
    pub image: Option<&'m Image<f32>>,
    pub index: Option<&'m Image<u16>>,
}

pub struct ParentBuildOptions {
    pub vertex_merge_epsilon: f64,
    pub max_faces: usize,
    pub atlas_strategy: AtlasStrategy,
    pub texture_width: usize,
    pub texture_height: usize,
    pub texture_pad_width: usize,
    pub thin_axis_expansion: f64,
}

impl Default for ParentBuildOptions {
    fn default() -> Self {
        Self {
            vertex_merge_epsilon: PARENT_MESH_VERTEX_MERGE_EPSILON,
            max_faces: 65_536,
            atlas_strategy: AtlasStrategy::Heightmap,
            texture_width: 512,
            texture_height: 512,
            texture_pad_width: 2,
            thin_axis_expansion: 0.0,
        }
    }
}

pub struct ParentBuildResult {
    pub mesh: Mesh,
    pub image: Option<Image<f32>>,
    pub index: Option<Image<u16>>,
    pub bounds: Aabb3,
    pub geometric_error: f64,
}

/// Build a parent tile's mesh/texture/geometric-error from its
/// dependency (child) tiles: union bounds, merge meshes (normals only),
/// expand the thin axis, clip and merge-nearby-vertices, decimate to the
/// face budget, assign UVs and bake a texture, then derive the parent's
/// geometric error.
pub fn build_parent(
    id: &str,
    dependencies: &[DependencyInput],
    options: &ParentBuildOptions,
) -> Result<ParentBuildResult> {
    if dependencies.is_empty() {
        return Err(ParentBuilderError::DependencyMissing(id.to_string()));
    }

    let mut bounds = Aabb3::empty();
    for dep in dependencies {
        bounds = bounds.union(&dep.tile.bounds);
    }

    let mut merged = Mesh::default();
    for dep in dependencies {
        merged.merge_preserving_normals_only(dep.mesh);
    }

    let thin_axis = bounds.min_axis();
    let expanded_bounds = bounds.expanded_on_axis(thin_axis, options.thin_axis_expansion);

    let clip_op = MeshOperator::new(&merged);
    let mut clipped = clip_op.clip(&expanded_bounds);
    clipped.merge_nearby_vertices(options.vertex_merge_epsilon);

    let diagonal = (expanded_bounds.hi() - expanded_bounds.lo()).norm();
    let mut final_mesh = decimate_to_target_faces(&clipped, options.max_faces, diagonal);

    options.atlas_strategy.assign_uvs(&mut final_mesh, &expanded_bounds);

    let sources: Vec<SourcePair> = dependencies
        .iter()
        .filter_map(|dep| dep.image.map(|image| SourcePair { mesh: dep.mesh, image, index: dep.index }))
        .collect();
    let (image, index) = if sources.is_empty() {
        (None, None)
    } else {
        let (color, index) =
            bake(&final_mesh, &sources, options.texture_width, options.texture_height, options.texture_pad_width)?;
        (Some(color), index)
    };

    let dependency_meshes: Vec<&Mesh> = dependencies.iter().map(|dep| dep.mesh).collect();
    let hausdorff = hausdorff_distance(&final_mesh, &dependency_meshes);
    let dependency_max_error =
        dependencies.iter().filter_map(|dep| dep.tile.geometric_error).fold(0.0_f64, f64::max);
    let (pu, pv) = plane_axes(thin_axis);
    let pixel_footprint_area = (expanded_bounds.span(pu) * expanded_bounds.span(pv))
        / (options.texture_width * options.texture_height).max(1) as f64;
    let texture_err = texture_error(final_mesh.total_area(), pixel_footprint_area);
    let geometric_error = combined_geometric_error(dependency_max_error, hausdorff, texture_err);

    Ok(ParentBuildResult { mesh: final_mesh, image, index, bounds: expanded_bounds, geometric_error })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh::Vertex;
    use nalgebra::Point3;
    use tile_tree::Tile;

    fn leaf(id: &str, x0: f64, x1: f64) -> (Tile, Mesh) {
        let bounds = Aabb3::from_bounds(Point3::new(x0, 0.0, 0.0), Point3::new(x1, 1.0, 0.1));
        let tile = Tile::new_leaf(id, bounds);
        let mesh = Mesh::new(
            vec![
                Vertex::at(Point3::new(x0, 0.0, 0.0)),
                Vertex::at(Point3::new(x1, 0.0, 0.0)),
                Vertex::at(Point3::new(x0, 1.0, 0.0)),
            ],
            vec![[0, 1, 2]],
        );
        (tile, mesh)
    }

    #[test]
    fn build_parent_unions_bounds_and_faces() {
        let (tile_a, mesh_a) = leaf("0", 0.0, 1.0);
        let (tile_b, mesh_b) = leaf("1", 1.0, 2.0);
        let deps = vec![
            DependencyInput { tile: &tile_a, mesh: &mesh_a, image: None, index: None },
            DependencyInput { tile: &tile_b, mesh: &mesh_b, image: None, index: None },
        ];
        let options = ParentBuildOptions::default();
        let result = build_parent("root", &deps, &options).unwrap();
        assert_eq!(result.mesh.face_count(), 2);
        assert!((result.bounds.span(0) - 2.0).abs() < 1e-9);
        assert!(result.geometric_error >= 0.0);
    }

    #[test]
    fn build_parent_rejects_empty_dependencies() {
        let options = ParentBuildOptions::default();
        assert!(matches!(
            build_parent("root", &[], &options),
            Err(ParentBuilderError::DependencyMissing(_))
        ));
    }
}
