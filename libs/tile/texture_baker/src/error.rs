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

#[derive(thiserror::Error, Debug)]
pub enum BakerError {
    #[error("target mesh has no UVs to bake against")]
    MissingTargetUv,
    #[error("no source meshes supplied to bake")]
    NoSources,
    #[error("atlas side {side} exceeds max tile resolution {max}")]
    AtlasTooLarge { side: usize, max: usize },
    #[error(transparent)]
    Raster(#[from] raster::error::RasterError),
}

pub type Result<T> = std::result::Result<T, BakerError>;
