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

#[derive(Debug, Error)]
pub enum TilesetError {
    #[error("tile `{0}` has no content and is not a leaf; refusing to serialize")]
    MissingContent(String),

    #[error("tile `{0}` references child `{1}` which is not present in the input set")]
    DanglingChild(String, String),

    #[error("tile tree has no root tile")]
    MissingRoot,

    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TilesetError>;
