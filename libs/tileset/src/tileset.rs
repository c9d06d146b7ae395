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

//! 3D-Tiles-style tileset JSON: a tree of bounding-box/geometric-error/
//! content descriptors, written bottom-up from a built tile tree.

use crate::error::{Result, TilesetError};
use geometry::Aabb3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tile_tree::Tile as TreeTile;

/// Metadata about the entire tileset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub version: String,
    #[serde(rename = "gltfUpAxis")]
    pub gltf_up_axis: String,
}

impl Default for Asset {
    fn default() -> Self {
        Self { version: "1.0".to_string(), gltf_up_axis: "z".to_string() }
    }
}

/// An oriented bounding box, stored as `[cx,cy,cz, halfX.xyz, halfY.xyz, halfZ.xyz]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingVolume {
    #[serde(rename = "box")]
    pub bounding_volume_box: [f64; 12],
}

impl BoundingVolume {
    /// An axis-aligned box expressed in the oriented-box encoding (the
    /// half-axis vectors are simply `(halfExtent, 0, 0)` etc.).
    pub fn from_aabb(bounds: &Aabb3) -> Self {
        let c = bounds.center();
        let half = [bounds.span(0) / 2.0, bounds.span(1) / 2.0, bounds.span(2) / 2.0];
        #[rustfmt::skip]
        let b = [
            c.x, c.y, c.z,
            half[0], 0.0, 0.0,
            0.0, half[1], 0.0,
            0.0, 0.0, half[2],
        ];
        Self { bounding_volume_box: b }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileContent {
    pub uri: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Refine {
    #[serde(rename = "ADD")]
    Add,
    #[serde(rename = "REPLACE")]
    Replace,
}

/// A node in the serialized tileset tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    #[serde(rename = "boundingVolume")]
    pub bounding_volume: BoundingVolume,
    #[serde(rename = "geometricError")]
    pub geometric_error: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refine: Option<Refine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<TileContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Tile>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tileset {
    pub asset: Asset,
    #[serde(rename = "geometricError")]
    pub geometric_error: f64,
    /// Column-major 4x4 affine transform; identity by default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<[f64; 16]>,
    pub root: Tile,
}

const IDENTITY_4X4: [f64; 16] =
    [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0];

/// Builds the serialized tile for `id`, recursing into its children.
/// `content_uri` maps a tile id to the on-disk `.b3dm`/`.pnts` uri that
/// tile's builder wrote; tiles absent from the map are culling-only.
fn build_tile(
    id: &str,
    tiles: &HashMap<String, TreeTile>,
    children_of: &HashMap<String, Vec<String>>,
    content_uri: &dyn Fn(&str) -> Option<String>,
) -> Result<Tile> {
    let tile = tiles.get(id).ok_or_else(|| TilesetError::DanglingChild("<unknown>".to_string(), id.to_string()))?;

    let children = match children_of.get(id) {
        Some(ids) if !ids.is_empty() => {
            let mut built = Vec::with_capacity(ids.len());
            for child_id in ids {
                built.push(build_tile(child_id, tiles, children_of, content_uri)?);
            }
            Some(built)
        }
        _ => None,
    };

    if children.is_none() && content_uri(id).is_none() {
        return Err(TilesetError::MissingContent(id.to_string()));
    }

    Ok(Tile {
        bounding_volume: BoundingVolume::from_aabb(&tile.bounds),
        geometric_error: tile.geometric_error.unwrap_or(0.0),
        refine: None,
        content: content_uri(id).map(|uri| TileContent { uri }),
        children,
    })
}

/// Serializes the full tile tree rooted at `root_id` into a [`Tileset`].
///
/// `content_uri(id)` should return the tile's content uri (typically
/// `"<id>.b3dm"` or `"<id>.pnts"`) if the tile's content was written, or
/// `None` for a bounds-only culling node.
pub fn build_tileset(
    root_id: &str,
    tiles: &HashMap<String, TreeTile>,
    content_uri: impl Fn(&str) -> Option<String>,
) -> Result<Tileset> {
    let root_stats = tiles.get(root_id).ok_or(TilesetError::MissingRoot)?;

    let mut children_of: HashMap<String, Vec<String>> = HashMap::new();
    for tile in tiles.values() {
        if let Some(parent) = tile.parent_id() {
            children_of.entry(parent).or_default().push(tile.id.clone());
        }
    }
    for kids in children_of.values_mut() {
        kids.sort();
    }

    let mut root_tile = build_tile(root_id, tiles, &children_of, &content_uri)?;
    root_tile.refine = Some(Refine::Replace);

    Ok(Tileset {
        asset: Asset::default(),
        geometric_error: root_stats.geometric_error.unwrap_or(0.0),
        transform: Some(IDENTITY_4X4),
        root: root_tile,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn leaf(id: &str, error: f64) -> TreeTile {
        let mut t = TreeTile::new_leaf(id, Aabb3::from_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)));
        t.geometric_error = Some(error);
        t
    }

    #[test]
    fn single_leaf_root_serializes_with_replace_refine() {
        let mut tiles = HashMap::new();
        tiles.insert("root".to_string(), leaf("root", 0.0));
        let tileset = build_tileset("root", &tiles, |id| Some(format!("{id}.b3dm"))).unwrap();
        assert_eq!(tileset.asset.gltf_up_axis, "z");
        assert_eq!(tileset.root.refine, Some(Refine::Replace));
        assert_eq!(tileset.root.content.unwrap().uri, "root.b3dm");
        assert!(tileset.root.children.is_none());
    }

    #[test]
    fn parent_with_children_nests_and_sorts_them() {
        let mut tiles = HashMap::new();
        tiles.insert("root".to_string(), leaf("root", 2.0));
        tiles.insert("1".to_string(), leaf("1", 0.0));
        tiles.insert("0".to_string(), leaf("0", 0.0));
        let tileset = build_tileset("root", &tiles, |id| Some(format!("{id}.b3dm"))).unwrap();
        let children = tileset.root.children.unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].content.as_ref().unwrap().uri, "0.b3dm");
        assert_eq!(children[1].content.as_ref().unwrap().uri, "1.b3dm");
    }

    #[test]
    fn leaf_without_content_is_an_error() {
        let mut tiles = HashMap::new();
        tiles.insert("root".to_string(), leaf("root", 0.0));
        let err = build_tileset("root", &tiles, |_| None).unwrap_err();
        assert!(matches!(err, TilesetError::MissingContent(id) if id == "root"));
    }

    #[test]
    fn bounding_volume_box_centers_on_the_bounds() {
        let bounds = Aabb3::from_bounds(Point3::new(-1.0, -2.0, -3.0), Point3::new(1.0, 2.0, 3.0));
        let bv = BoundingVolume::from_aabb(&bounds);
        assert_eq!(&bv.bounding_volume_box[0..3], &[0.0, 0.0, 0.0]);
        assert_eq!(bv.bounding_volume_box[3], 1.0);
        assert_eq!(bv.bounding_volume_box[7], 2.0);
        assert_eq!(bv.bounding_volume_box[11], 3.0);
    }
}
