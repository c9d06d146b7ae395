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

//! Screened-Poisson seam removal for composite textures: a multigrid
//! Gauss-Seidel solver (with a single-level conjugate-gradient
//! alternative) over a per-cell flagged, edge-mode-aware grid.

mod conjugate_gradient;
mod flags;
mod gauss_seidel;
mod gradient;
mod grid;
mod solver;

pub use conjugate_gradient::solve_conjugate_gradient;
pub use flags::{CellFlag, ColorSpace, EdgeMode};
pub use gauss_seidel::{relax_pass, relax_until_converged, RelaxParams};
pub use gradient::divergence_field;
pub use grid::{downsample2, pad_to_power_of_two, upsample_bilinear_add_difference, Grid};
pub use solver::{solve_band, solve_image, PoissonParams};
