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

//! The recursive scene graph of bounded tiles: reconstruction by name,
//! bounds propagation, parent build-dependency search, split predicates,
//! and tiling schemes.

mod connect;
mod scheme;
mod split;
mod tile;

pub use connect::{TileTree, CHILD_BOUNDS_SEARCH_RATIO};
pub use scheme::TilingScheme;
pub use split::{
    AreaSplitCriteria, FaceSplitCriteria, Observation, SplitCriteria, SplitDecision,
    TextureSplitCriteria, TextureSplitMode, MAX_TILE_RES, MIN_TILE_RES,
};
pub use tile::{depth_of, is_descendant_of, parent_id_of, Tile, TileStats, ROOT_ID};
