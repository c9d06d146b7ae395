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
use crate::flags::{CellFlag, EdgeMode};
use crate::grid::Grid;
use rayon::prelude::*;

pub struct RelaxParams {
    pub lambda: f64,
    pub epsilon: f64,
    pub edge: EdgeMode,
}

const NEIGHBOR_OFFSETS: [(i64, i64); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// One red-black Gauss-Seidel sweep of `screened-Poisson - lambda*f =
/// lambda*u - div_g`. Returns `sum((new - old)^2)` over the whole grid,
/// for the caller to compare against `W*H*epsilon^2`.
pub fn relax_pass(f: &mut Grid, u: &Grid, div_g: &Grid, flags: &[CellFlag], params: &RelaxParams) -> f64 {
    let (w, h) = (f.width, f.height);
    let mut sum_sq = 0.0_f64;

    for color in 0..2_usize {
        let updates: Vec<(usize, f64)> = (0..h)
            .into_par_iter()
            .flat_map_iter(|r| {
                let mut local = Vec::new();
                for c in 0..w {
                    if (r + c) % 2 != color {
                        continue;
                    }
                    let idx = r * w + c;
                    let flag = flags[idx];
                    if flag == CellFlag::NoData || flag == CellFlag::HoldConstant {
                        continue;
                    }
                    let mut sum = 0.0_f64;
                    let mut n = 0u32;
                    for (dr, dc) in NEIGHBOR_OFFSETS {
                        if let Some((nr, nc)) = params.edge.neighbor(r, c, dr, dc, w, h) {
                            let nidx = nr * w + nc;
                            if flags[nidx] != CellFlag::NoData {
                                sum += f.get(nr, nc);
                                n += 1;
                            }
                        }
                    }
                    if n == 0 {
                        continue;
                    }
                    let lambda_eff = if flag == CellFlag::GradientOnly { 0.0 } else { params.lambda };
                    let rhs_u = lambda_eff * u.get(r, c);
                    let new_val = (sum - rhs_u + div_g.get(r, c)) / (n as f64 + lambda_eff);
                    local.push((idx, new_val));
                }
                local
            })
            .collect();

        for (idx, new_val) in updates {
            let old = f.data[idx];
            sum_sq += (new_val - old) * (new_val - old);
            f.data[idx] = new_val;
        }
    }
    sum_sq
}

/// Runs up to `max_steps` relaxation passes, stopping early once the
/// mean-squared update drops below `epsilon^2`.
pub fn relax_until_converged(
    f: &mut Grid,
    u: &Grid,
    div_g: &Grid,
    flags: &[CellFlag],
    params: &RelaxParams,
    max_steps: usize,
) -> f64 {
    let cells = (f.width * f.height).max(1) as f64;
    let mut msq = f64::INFINITY;
    for _ in 0..max_steps {
        let sum_sq = relax_pass(f, u, div_g, flags, params);
        msq = sum_sq / cells;
        if msq < params.epsilon * params.epsilon {
            break;
        }
    }
    msq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_input_stays_near_constant() {
        let size = 8;
        let u = Grid::filled(size, size, 0.25);
        let mut f = u.clone();
        let flags = vec![CellFlag::None; size * size];
        let div_g = Grid::filled(size, size, 0.0);
        let params = RelaxParams { lambda: 0.00001, epsilon: 0.001, edge: EdgeMode::Clamp };
        relax_until_converged(&mut f, &u, &div_g, &flags, &params, 10);
        for &v in &f.data {
            assert!((v - 0.25).abs() < 0.001, "got {v}");
        }
    }

    #[test]
    fn hold_constant_cells_are_never_touched_by_relax_pass() {
        let size = 4;
        let u = Grid::filled(size, size, 1.0);
        let mut f = Grid::filled(size, size, 1.0);
        f.set(1, 1, 999.0);
        let mut flags = vec![CellFlag::None; size * size];
        flags[1 * size + 1] = CellFlag::HoldConstant;
        let div_g = Grid::filled(size, size, 0.0);
        let params = RelaxParams { lambda: 0.1, epsilon: 0.001, edge: EdgeMode::Clamp };
        relax_pass(&mut f, &u, &div_g, &flags, &params);
        assert_eq!(f.get(1, 1), 999.0);
    }
}
