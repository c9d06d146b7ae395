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

//! Queries transforms between observation, site-drive, site, and root
//! frames, composing each frame's prior or bundle-adjusted transform up
//! the parent chain.
//!
//! The frame dictionary is copy-on-write: readers clone the `Arc` under
//! the lock (cheap, no allocation) and then walk it lock-free; mutation
//! -- confined to the single ingestion thread per the concurrency model
//! -- clones the whole map, edits the clone, and swaps it in.

use crate::node::FrameNode;
use nalgebra::Isometry3;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Walking the parent chain more than this many hops means the graph has
/// a cycle; ingestion data is untrusted, so this is a real bound, not a
/// decoration.
const MAX_CHAIN_DEPTH: usize = 256;

#[derive(Default)]
pub struct FrameCache {
    frames: RwLock<Arc<HashMap<String, FrameNode>>>,
}

impl FrameCache {
    pub fn new() -> Self {
        Self { frames: RwLock::new(Arc::new(HashMap::new())) }
    }

    /// Inserts or replaces a frame. Mutation-only; callers must confine
    /// this to a single ingestion thread.
    pub fn set_frame(&self, id: impl Into<String>, node: FrameNode) {
        let mut guard = self.frames.write();
        let mut updated = (**guard).clone();
        updated.insert(id.into(), node);
        *guard = Arc::new(updated);
    }

    /// Records a bundle-adjustment correction for an existing frame.
    /// A no-op (with a warning) if the frame isn't known yet.
    pub fn set_adjusted(&self, id: &str, adjusted: Isometry3<f64>) {
        let mut guard = self.frames.write();
        let mut updated = (**guard).clone();
        match updated.get_mut(id) {
            Some(node) => node.adjusted = Some(adjusted),
            None => {
                warn!(id, "set_adjusted on unknown frame, ignoring");
                return;
            }
        }
        *guard = Arc::new(updated);
    }

    /// This frame's composed transform into the root frame, or `None` if
    /// `id` is unknown or its parent chain is broken (missing parent,
    /// or a cycle).
    pub fn transform_to_root(&self, id: &str) -> Option<Isometry3<f64>> {
        let frames = Arc::clone(&self.frames.read());
        let mut current = frames.get(id)?;
        let mut composed = *current.effective();
        let mut visited = 1;
        while let Some(parent_id) = &current.parent {
            if visited > MAX_CHAIN_DEPTH {
                warn!(id, "frame parent chain exceeded max depth, likely a cycle");
                return None;
            }
            current = frames.get(parent_id)?;
            composed = current.effective() * composed;
            visited += 1;
        }
        Some(composed)
    }

    /// The transform that maps a point expressed in `from`'s frame into
    /// `to`'s frame, via their common root. `None` if either frame is
    /// unresolved; callers decide whether that's fatal.
    pub fn transform_between(&self, from: &str, to: &str) -> Option<Isometry3<f64>> {
        let from_to_root = self.transform_to_root(from)?;
        let to_to_root = self.transform_to_root(to)?;
        Some(to_to_root.inverse() * from_to_root)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.frames.read().contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Translation3, UnitQuaternion, Vector3};

    fn translation(x: f64, y: f64, z: f64) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::new(x, y, z), UnitQuaternion::identity())
    }

    #[test]
    fn root_transform_is_identity_composed_with_itself() {
        let cache = FrameCache::new();
        cache.set_frame("root", FrameNode::root(Isometry3::identity()));
        let t = cache.transform_to_root("root").unwrap();
        assert_eq!(t, Isometry3::identity());
    }

    #[test]
    fn chained_translations_compose_up_to_root() {
        let cache = FrameCache::new();
        cache.set_frame("root", FrameNode::root(Isometry3::identity()));
        cache.set_frame("site", FrameNode::child_of("root", translation(10.0, 0.0, 0.0)));
        cache.set_frame("site_drive", FrameNode::child_of("site", translation(0.0, 5.0, 0.0)));
        cache.set_frame("observation", FrameNode::child_of("site_drive", translation(0.0, 0.0, 2.0)));

        let t = cache.transform_to_root("observation").unwrap();
        let p = t * nalgebra::Point3::origin();
        assert_eq!(p, nalgebra::Point3::new(10.0, 5.0, 2.0));
    }

    #[test]
    fn adjusted_transform_overrides_prior_in_composition() {
        let cache = FrameCache::new();
        cache.set_frame("root", FrameNode::root(Isometry3::identity()));
        cache.set_frame("site", FrameNode::child_of("root", translation(1.0, 0.0, 0.0)));
        cache.set_adjusted("site", translation(100.0, 0.0, 0.0));

        let t = cache.transform_to_root("site").unwrap();
        let p = t * nalgebra::Point3::origin();
        assert_eq!(p, nalgebra::Point3::new(100.0, 0.0, 0.0));
    }

    #[test]
    fn unknown_frame_resolves_to_none() {
        let cache = FrameCache::new();
        assert!(cache.transform_to_root("missing").is_none());
        assert!(cache.transform_between("missing", "also_missing").is_none());
    }

    #[test]
    fn transform_between_two_siblings_round_trips_through_root() {
        let cache = FrameCache::new();
        cache.set_frame("root", FrameNode::root(Isometry3::identity()));
        cache.set_frame("a", FrameNode::child_of("root", translation(1.0, 0.0, 0.0)));
        cache.set_frame("b", FrameNode::child_of("root", translation(0.0, 1.0, 0.0)));

        let a_to_b = cache.transform_between("a", "b").unwrap();
        let p = a_to_b * nalgebra::Point3::origin();
        assert_eq!(p, nalgebra::Point3::new(1.0, -1.0, 0.0));
    }
}
