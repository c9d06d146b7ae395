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

//! The raster substrate the rest of the pipeline builds on: an in-core
//! multi-band `Image`, a lazily-materialized `SparseChunkedRaster` over it
//! for imagery larger than RAM, and a `BinaryRaster` mask type with
//! morphology ops.

mod dense;
pub mod error;
mod mask;
mod sparse;

pub use dense::{lab_to_rgb, rgb_to_lab, Cell, Image};
pub use mask::BinaryRaster;
pub use sparse::SparseChunkedRaster;
