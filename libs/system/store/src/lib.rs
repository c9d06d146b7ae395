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

//! URL-addressed blob storage and key-value item persistence for the tile
//! build pipeline. A tile owns its mesh/image/index blobs by URL reference;
//! the item store holds Tile/Frame/Observation records the pipeline indexes
//! by a hash key and an optional range key.

mod blob_store;
mod item_store;
mod retry;

pub use blob_store::{BlobStore, CachingBlobStore, FileBlobStore};
pub use item_store::{FileItemStore, ItemStore};
pub use retry::{RetryingBlobStore, RetryPolicy};
