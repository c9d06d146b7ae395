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

//! Triangle meshes and a spatial-tree operator over them: clip, area,
//! face-count, UV<->barycentric lookup, nearest-triangle search, and
//! sub-sampling.

mod mesh;
mod operator;

pub use mesh::{Mesh, Vertex};
pub use operator::{Barycentric, MeshOperator};
