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

//! Typed build messages exchanged between the master state machine and
//! the worker pool.

/// A unit of work dispatched to the worker pool: build (or rebuild) the
/// tile named `tile_id`. All of `tile_id`'s dependencies are guaranteed
/// to already be marked built in the item store before this is enqueued.
#[derive(Clone, Debug)]
pub struct TileJob {
    pub tile_id: String,
}

impl TileJob {
    pub fn new(tile_id: impl Into<String>) -> Self {
        Self { tile_id: tile_id.into() }
    }
}

/// A worker's report back to the master after running a [`TileJob`].
#[derive(Clone, Debug)]
pub enum TileOutcome {
    Built { tile_id: String },
    Failed { tile_id: String, reason: String },
}

impl TileOutcome {
    pub fn tile_id(&self) -> &str {
        match self {
            Self::Built { tile_id } | Self::Failed { tile_id, .. } => tile_id,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
