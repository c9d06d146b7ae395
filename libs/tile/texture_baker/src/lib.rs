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

//! Per-tile texture baking (UV -> barycentric -> nearest source triangle
//! -> resample, with in-paint) and UV-atlas clip/repack.

mod baker;
mod clipper;
pub mod error;

pub use baker::{
    bake, SourcePair, GUTTER_INDEX, MAX_VALID_INDEX, MIN_VALID_INDEX, NO_OBSERVATION_INDEX,
    ORBITAL_DEM_INDEX, ORBITAL_IMAGE_INDEX,
};
pub use clipper::{TexturedMeshClipper, TEXTURE_PATCH_BORDER_SIZE};
