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

/// The reserved id of the topological root; synthesized by `connect_by_name`
/// if no tile in the input set carries it.
pub const ROOT_ID: &str = "root";

/// Per-tile vertex/face/pixel summary, carried alongside the tile for
/// reporting and for split-criteria decisions without re-walking the mesh.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TileStats {
    pub vertex_count: usize,
    pub face_count: usize,
    pub pixel_count: usize,
    pub mesh_area: f64,
    pub uv_area: f64,
    pub min_tri_area: f64,
    pub max_tri_area: f64,
    pub has_index: bool,
}

/// A node in the spatial LOD tree. `id` is a digit-string where each
/// character indexes a child of the previous level; `"root"` is reserved
/// for the topological root.
#[derive(Clone, Debug)]
pub struct Tile {
    pub id: String,
    pub bounds: Aabb3,
    pub bounds_with_skirt: Option<Aabb3>,
    pub geometric_error: Option<f64>,
    pub leaf: bool,
    pub mesh_url: Option<String>,
    pub image_url: Option<String>,
    pub index_url: Option<String>,
    pub dependency_ids: Vec<String>,
    pub reverse_dependency_ids: Vec<String>,
    pub stats: TileStats,
}

impl Tile {
    pub fn new_leaf(id: impl Into<String>, bounds: Aabb3) -> Self {
        Self {
            id: id.into(),
            bounds,
            bounds_with_skirt: None,
            geometric_error: Some(0.0),
            leaf: true,
            mesh_url: None,
            image_url: None,
            index_url: None,
            dependency_ids: Vec::new(),
            reverse_dependency_ids: Vec::new(),
            stats: TileStats::default(),
        }
    }

    /// A parent node with no bounds yet; `compute_bounds` must be run
    /// before this tile's `bounds` field is meaningful.
    pub fn new_synthetic_parent(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            bounds: Aabb3::empty(),
            bounds_with_skirt: None,
            geometric_error: None,
            leaf: false,
            mesh_url: None,
            image_url: None,
            index_url: None,
            dependency_ids: Vec::new(),
            reverse_dependency_ids: Vec::new(),
            stats: TileStats::default(),
        }
    }

    pub fn depth(&self) -> usize {
        depth_of(&self.id)
    }

    pub fn parent_id(&self) -> Option<String> {
        parent_id_of(&self.id)
    }
}

/// Depth of `id` in the tree; the root is depth 0, its immediate children
/// (single-character ids) are depth 1, and so on.
pub fn depth_of(id: &str) -> usize {
    if id == ROOT_ID {
        0
    } else {
        id.len()
    }
}

/// The id of `id`'s parent, or `None` if `id` is already the root.
pub fn parent_id_of(id: &str) -> Option<String> {
    if id == ROOT_ID {
        None
    } else if id.len() <= 1 {
        Some(ROOT_ID.to_string())
    } else {
        Some(id[..id.len() - 1].to_string())
    }
}

/// True iff `id` names `ancestor` or a descendant of it (by prefix, with
/// `"root"` a prefix of everything).
pub fn is_descendant_of(id: &str, ancestor: &str) -> bool {
    if ancestor == ROOT_ID {
        return true;
    }
    id == ancestor || id.starts_with(ancestor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_chain_terminates_at_root() {
        assert_eq!(parent_id_of("012"), Some("01".to_string()));
        assert_eq!(parent_id_of("0"), Some(ROOT_ID.to_string()));
        assert_eq!(parent_id_of(ROOT_ID), None);
    }

    #[test]
    fn depth_matches_id_length() {
        assert_eq!(depth_of(ROOT_ID), 0);
        assert_eq!(depth_of("0"), 1);
        assert_eq!(depth_of("01"), 2);
    }

    #[test]
    fn descendant_check_respects_prefix() {
        assert!(is_descendant_of("012", "01"));
        assert!(!is_descendant_of("013", "012"));
        assert!(is_descendant_of("013", ROOT_ID));
    }
}
