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
use crate::flags::{CellFlag, ColorSpace, EdgeMode};
use crate::gauss_seidel::{relax_until_converged, RelaxParams};
use crate::grid::{
    downsample2, pad_to_power_of_two, restore_hold_constant, upsample_bilinear_add_difference, Grid,
};
use crate::gradient::divergence_field;
use rayon::prelude::*;
use raster::{lab_to_rgb, rgb_to_lab, Cell, Image};

/// Parameters shared by every band of a solve.
pub struct PoissonParams {
    pub lambda: f64,
    pub epsilon: f64,
    pub num_relaxation_steps: usize,
    pub num_multigrid_iterations: usize,
    pub edge: EdgeMode,
    pub color_space: ColorSpace,
}

impl Default for PoissonParams {
    fn default() -> Self {
        Self {
            lambda: 0.00001,
            epsilon: 0.001,
            num_relaxation_steps: 10,
            num_multigrid_iterations: 5,
            edge: EdgeMode::Clamp,
            color_space: ColorSpace::None,
        }
    }
}

/// Runs the multigrid V-cycle solve for a single band.
///
/// The `u`/flags/gradient pyramid is built once by repeated 2x downsample
/// down to a 2x2 floor. Each outer multigrid iteration downsamples the
/// *current guess* through that same pyramid, relaxes coarsest-first, and
/// folds the bilinear-interpolated correction back up through every
/// level, finishing with one full-resolution relax.
pub fn solve_band(u: &Grid, flags: &[CellFlag], source_index: Option<&[u32]>, params: &PoissonParams) -> Grid {
    let (padded_u, padded_flags) = pad_to_power_of_two(u, flags);
    let relax_params = RelaxParams { lambda: params.lambda, epsilon: params.epsilon, edge: params.edge };

    let mut u_pyramid = vec![padded_u.clone()];
    let mut flags_pyramid = vec![padded_flags.clone()];
    while u_pyramid.last().unwrap().width > 2 || u_pyramid.last().unwrap().height > 2 {
        let (du, df) = downsample2(u_pyramid.last().unwrap(), flags_pyramid.last().unwrap());
        u_pyramid.push(du);
        flags_pyramid.push(df);
    }
    let div_g_pyramid: Vec<Grid> = u_pyramid
        .iter()
        .enumerate()
        .map(|(level, level_u)| {
            let idx = if level == 0 { source_index } else { None };
            divergence_field(level_u, idx, params.edge)
        })
        .collect();
    let num_levels = u_pyramid.len();
    let coarsest = num_levels - 1;

    let mut f = padded_u.clone();

    for _ in 0..params.num_multigrid_iterations {
        let mut guess_pyramid = vec![f.clone()];
        for level in 1..num_levels {
            let (down, _) = downsample2(&guess_pyramid[level - 1], &flags_pyramid[level - 1]);
            guess_pyramid.push(down);
        }

        let mut relaxed_pyramid = guess_pyramid.clone();
        relax_until_converged(
            &mut relaxed_pyramid[coarsest],
            &u_pyramid[coarsest],
            &div_g_pyramid[coarsest],
            &flags_pyramid[coarsest],
            &relax_params,
            params.num_relaxation_steps,
        );

        for level in (0..coarsest).rev() {
            let mut corrected = guess_pyramid[level].clone();
            upsample_bilinear_add_difference(&guess_pyramid[level + 1], &relaxed_pyramid[level + 1], &mut corrected);
            restore_hold_constant(&mut corrected, &u_pyramid[level], &flags_pyramid[level]);
            relax_until_converged(
                &mut corrected,
                &u_pyramid[level],
                &div_g_pyramid[level],
                &flags_pyramid[level],
                &relax_params,
                params.num_relaxation_steps,
            );
            relaxed_pyramid[level] = corrected;
        }

        f = relaxed_pyramid[0].clone();
        let msq = relax_until_converged(
            &mut f,
            &padded_u,
            &div_g_pyramid[0],
            &padded_flags,
            &relax_params,
            params.num_relaxation_steps,
        );
        if msq < params.epsilon * params.epsilon {
            break;
        }
    }

    restore_hold_constant(&mut f, &padded_u, &padded_flags);
    let mut cropped = Grid::filled(u.width, u.height, 0.0);
    for r in 0..u.height {
        for c in 0..u.width {
            cropped.set(r, c, f.get(r, c));
        }
    }
    cropped
}

/// Solves every band of `image` independently (in parallel), applying
/// `color_space` conversion across the first three bands (treated as
/// RGB) before solving and undoing it afterward.
pub fn solve_image(
    image: &Image<f32>,
    flags: Option<&[CellFlag]>,
    source_index: Option<&[u32]>,
    params: &PoissonParams,
) -> raster::error::Result<Image<f32>> {
    let (width, height) = (image.width(), image.height());
    let bands = image.band_count();
    let default_flags = vec![CellFlag::None; width * height];
    let flags = flags.unwrap_or(&default_flags);

    let mut band_grids: Vec<Grid> = (0..bands)
        .map(|b| {
            let mut data = vec![0.0_f64; width * height];
            for r in 0..height {
                for c in 0..width {
                    data[r * width + c] = image.get(b, r, c).map(|v| v.to_f64()).unwrap_or(0.0);
                }
            }
            Grid::from_vec(width, height, data)
        })
        .collect();

    if bands >= 3 && params.color_space != ColorSpace::None {
        let log_luminance = params.color_space == ColorSpace::RgbToLogLab;
        for idx in 0..width * height {
            let rgb = [band_grids[0].data[idx], band_grids[1].data[idx], band_grids[2].data[idx]];
            let lab = rgb_to_lab(rgb, log_luminance);
            for (band, value) in lab.into_iter().enumerate() {
                band_grids[band].data[idx] = value;
            }
        }
    }

    let solved: Vec<Grid> =
        band_grids.par_iter().map(|grid| solve_band(grid, flags, source_index, params)).collect();
    band_grids = solved;

    if bands >= 3 && params.color_space != ColorSpace::None {
        let log_luminance = params.color_space == ColorSpace::RgbToLogLab;
        for idx in 0..width * height {
            let lab = [band_grids[0].data[idx], band_grids[1].data[idx], band_grids[2].data[idx]];
            let rgb = lab_to_rgb(lab, log_luminance);
            for (band, value) in rgb.into_iter().enumerate() {
                band_grids[band].data[idx] = value;
            }
        }
    }

    let mut out = Image::<f32>::create(bands, width, height)?;
    for (b, grid) in band_grids.iter().enumerate() {
        for r in 0..height {
            for c in 0..width {
                out.set(b, r, c, f32::from_f64(grid.get(r, c)))?;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_input_is_a_near_fixed_point() {
        let size = 64;
        let u = Grid::filled(size, size, 0.25);
        let flags = vec![CellFlag::None; size * size];
        let params = PoissonParams {
            lambda: 0.00001,
            epsilon: 0.001,
            num_relaxation_steps: 10,
            num_multigrid_iterations: 5,
            edge: EdgeMode::Clamp,
            color_space: ColorSpace::None,
        };
        let result = solve_band(&u, &flags, None, &params);
        for &v in &result.data {
            assert!((v - 0.25).abs() < 0.001, "got {v}");
        }
    }

    #[test]
    fn hold_constant_survives_the_full_multigrid_solve() {
        let size = 16;
        let u = Grid::filled(size, size, 1.0);
        let mut flags = vec![CellFlag::None; size * size];
        flags[5 * size + 5] = CellFlag::HoldConstant;
        let mut seeded = u;
        seeded.set(5, 5, 0.1);
        let params = PoissonParams::default();
        let result = solve_band(&seeded, &flags, None, &params);
        assert_eq!(result.get(5, 5), 0.1);
    }

    #[test]
    fn solve_image_round_trips_dimensions() {
        let mut image = Image::<f32>::create(1, 8, 8).unwrap();
        for r in 0..8 {
            for c in 0..8 {
                image.set(0, r, c, 0.5).unwrap();
            }
        }
        let params = PoissonParams::default();
        let result = solve_image(&image, None, None, &params).unwrap();
        assert_eq!(result.width(), 8);
        assert_eq!(result.height(), 8);
    }
}
