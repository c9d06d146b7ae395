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

//! Tileset JSON and scene manifest serialization: the tree of tile
//! bounding-volume/geometric-error/content descriptors 3D Tiles clients
//! load, plus the sidecar manifest of camera models, frame graph, and
//! site-drive records that ties a tileset back to its source imagery.

pub mod error;
mod scene;
mod tileset;

pub use error::{Result, TilesetError};
pub use scene::{CameraModelDescriptor, FrameGraphNode, ImageDescriptor, SceneManifest, SiteDriveRecord};
pub use tileset::{build_tileset, Asset, BoundingVolume, Refine, Tile, TileContent, Tileset};
