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
use crate::tile::{depth_of, parent_id_of, Tile, ROOT_ID};
use fxhash::FxHashMap;
use geometry::Aabb3;

/// Search margin applied to a candidate parent's children-bounds union when
/// looking for the build-dependency set; a node whose bounds only barely
/// miss the union can still be required once skirts/decimation are applied.
pub const CHILD_BOUNDS_SEARCH_RATIO: f64 = 1.1;

/// The reconstructed scene graph of bounded tiles, keyed by id.
#[derive(Clone, Debug, Default)]
pub struct TileTree {
    nodes: FxHashMap<String, Tile>,
}

impl TileTree {
    pub fn get(&self, id: &str) -> Option<&Tile> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Tile> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<&Tile> {
        self.nodes.get(ROOT_ID)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.nodes.values()
    }

    /// Immediate topological children of `id`, by parent-id link (not by
    /// id-prefix length alone, so a tree with gaps still composes).
    pub fn children_of(&self, id: &str) -> Vec<&Tile> {
        self.nodes
            .values()
            .filter(|t| t.parent_id().as_deref() == Some(id))
            .collect()
    }

    /// Reconstruct the tree from a flat set of named tiles by prefix,
    /// synthesizing any missing ancestor (including the root itself) with
    /// no bounds yet -- callers must run `compute_bounds` before relying
    /// on a synthesized parent's `bounds` field.
    pub fn connect_by_name(tiles: Vec<Tile>) -> Self {
        let mut nodes: FxHashMap<String, Tile> = FxHashMap::default();
        for tile in tiles {
            nodes.insert(tile.id.clone(), tile);
        }
        nodes.entry(ROOT_ID.to_string()).or_insert_with(|| Tile::new_synthetic_parent(ROOT_ID));

        let mut frontier: Vec<String> = nodes.keys().cloned().collect();
        while let Some(id) = frontier.pop() {
            if let Some(parent_id) = parent_id_of(&id) {
                if !nodes.contains_key(&parent_id) {
                    nodes.insert(parent_id.clone(), Tile::new_synthetic_parent(parent_id.clone()));
                    frontier.push(parent_id);
                }
            }
        }

        Self { nodes }
    }

    /// Bottom-up union of leaf mesh bounds; a parent's own mesh (if it has
    /// one from a prior build pass) also contributes to its bounds.
    pub fn compute_bounds(&mut self) {
        let mut order: Vec<String> = self.nodes.keys().cloned().collect();
        order.sort_by_key(|id| std::cmp::Reverse(depth_of(id)));
        for id in order {
            let children_union = self
                .children_of(&id)
                .into_iter()
                .map(|c| c.bounds)
                .fold(Aabb3::empty(), |acc, b| acc.union(&b));
            if let Some(tile) = self.nodes.get_mut(&id) {
                if !tile.leaf {
                    tile.bounds = tile.bounds.union(&children_union);
                }
            }
        }
    }

    /// Nodes `d` such that (a) `d` is in the tree, (b) `d`'s bounds
    /// intersect `node`'s children-bounds union scaled by
    /// `CHILD_BOUNDS_SEARCH_RATIO`, and (c) `d` is a leaf or at-or-deeper
    /// than `node.depth + 1`. A superset of `node`'s topological children,
    /// used as the Parent Builder's build-dependency set.
    pub fn find_nodes_required_for_parent(&self, node_id: &str) -> Vec<String> {
        let Some(node) = self.get(node_id) else { return Vec::new() };
        let children_union = self
            .children_of(node_id)
            .into_iter()
            .map(|c| c.bounds)
            .fold(Aabb3::empty(), |acc, b| acc.union(&b));
        if children_union.is_empty() {
            return Vec::new();
        }
        let search_box = children_union.scaled_about_center(CHILD_BOUNDS_SEARCH_RATIO);
        let min_depth = node.depth() + 1;

        self.nodes
            .values()
            .filter(|d| (d.leaf || d.depth() >= min_depth) && d.bounds.intersects(&search_box))
            .map(|d| d.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn leaf(id: &str, lo: Point3<f64>, hi: Point3<f64>) -> Tile {
        Tile::new_leaf(id, Aabb3::from_bounds(lo, hi))
    }

    #[test]
    fn connect_by_name_synthesizes_missing_ancestors() {
        let leaves = vec![
            leaf("00", Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)),
            leaf("01", Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0)),
            leaf("02", Point3::new(0.0, 1.0, 0.0), Point3::new(1.0, 2.0, 1.0)),
            leaf("03", Point3::new(1.0, 1.0, 0.0), Point3::new(2.0, 2.0, 1.0)),
            leaf("10", Point3::new(2.0, 0.0, 0.0), Point3::new(3.0, 1.0, 1.0)),
            leaf("11", Point3::new(3.0, 0.0, 0.0), Point3::new(4.0, 1.0, 1.0)),
            leaf("12", Point3::new(2.0, 1.0, 0.0), Point3::new(3.0, 2.0, 1.0)),
            leaf("13", Point3::new(3.0, 1.0, 0.0), Point3::new(4.0, 2.0, 1.0)),
        ];
        let mut tree = TileTree::connect_by_name(leaves);
        assert!(tree.contains(ROOT_ID));
        assert!(tree.contains("0"));
        assert!(tree.contains("1"));
        assert_eq!(tree.children_of(ROOT_ID).len(), 2);
        assert_eq!(tree.children_of("0").len(), 4);

        tree.compute_bounds();
        let zero = tree.get("0").unwrap();
        assert_eq!(zero.bounds, Aabb3::from_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 1.0)));
        let root = tree.root().unwrap();
        assert_eq!(root.bounds, Aabb3::from_bounds(Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 2.0, 1.0)));
    }

    #[test]
    fn find_nodes_required_for_parent_is_superset_of_children() {
        let leaves = vec![
            leaf("00", Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)),
            leaf("01", Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0)),
        ];
        let mut tree = TileTree::connect_by_name(leaves);
        tree.compute_bounds();
        let deps = tree.find_nodes_required_for_parent("0");
        assert!(deps.contains(&"00".to_string()));
        assert!(deps.contains(&"01".to_string()));
    }
}
