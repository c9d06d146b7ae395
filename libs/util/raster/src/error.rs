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
use thiserror::Error;

/// The array-length limit an `Image` must fit under before allocation is
/// attempted, in elements. Exposed so callers can pre-flight a `Create`
/// without risking an allocator abort.
pub const MAX_RASTER_ELEMENTS: u64 = 1 << 32;

#[derive(Error, Debug, Eq, PartialEq)]
pub enum RasterError {
    #[error("raster of {bands}x{width}x{height} exceeds the {limit} element limit")]
    SizeTooLarge {
        bands: usize,
        width: usize,
        height: usize,
        limit: u64,
    },
    #[error("size mismatch: expected {expected:?}, got {actual:?}")]
    SizeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("band mismatch: raster has {have} bands, operation needs {need}")]
    BandMismatch { have: usize, need: usize },
    #[error("out of bounds: {what} at ({row}, {col}) in a {width}x{height} raster")]
    OutOfBounds {
        what: &'static str,
        row: i64,
        col: i64,
        width: usize,
        height: usize,
    },
    #[error("type mismatch: expected element type {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("mask is absent")]
    MaskAbsent,
    #[error("mask snapshot already saved")]
    MaskAlreadySaved,
}

pub type Result<T> = std::result::Result<T, RasterError>;
