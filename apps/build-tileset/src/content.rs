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

//! A built tile's content as it lives in memory while the tree is being
//! built, and the on-disk DTO it's persisted as. Standing in for the
//! real item-store metadata table and binary tile format (b3dm/glTF),
//! which are outside this pipeline's concern.

use crate::manifest::{ImageDto, MeshDto};
use anyhow::Result;
use mesh::Mesh;
use raster::Image;
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct TileData {
    pub mesh: Mesh,
    pub image: Option<Image<f32>>,
    pub index: Option<Image<u16>>,
}

#[derive(Serialize, Deserialize)]
pub struct TileContentDto {
    pub mesh: MeshDto,
    pub image: Option<ImageDto>,
}

impl TileContentDto {
    pub fn from_data(data: &TileData) -> Result<Self> {
        let image = data.image.as_ref().map(ImageDto::from_image).transpose()?;
        Ok(Self { mesh: MeshDto::from_mesh(&data.mesh), image })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// The `.b3dm`-ish content uri a tile's build task writes its data under.
pub fn content_uri(tile_id: &str) -> String {
    format!("{tile_id}.b3dm")
}
