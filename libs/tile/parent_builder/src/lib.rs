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

//! Builds a parent tile's mesh, texture, and geometric error from its
//! already-built dependency (child) tiles.

mod atlas;
mod builder;
mod decimate;
pub mod error;
mod geometric_error;

pub use atlas::AtlasStrategy;
pub use builder::{
    build_parent, DependencyInput, ParentBuildOptions, ParentBuildResult,
    PARENT_MESH_VERTEX_MERGE_EPSILON,
};
pub use decimate::decimate_to_target_faces;
pub use geometric_error::{
    combined_geometric_error, hausdorff_distance, texture_error, PARENT_HAUSDORFF_RELATIVE_ACCURACY,
    TEXTURE_ERROR_MULTIPLIER,
};
