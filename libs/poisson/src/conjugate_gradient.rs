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
use crate::gauss_seidel::RelaxParams;
use crate::grid::{restore_hold_constant, Grid};

const NEIGHBOR_OFFSETS: [(i64, i64); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// `(Laplacian - lambda*I) v`, with `NoData` neighbors excluded from the
/// stencil and `HoldConstant` rows replaced by the identity so the
/// residual at those cells is always zero.
fn apply_operator(v: &Grid, flags: &[CellFlag], params: &RelaxParams) -> Grid {
    let (w, h) = (v.width, v.height);
    let mut out = Grid::filled(w, h, 0.0);
    for r in 0..h {
        for c in 0..w {
            let idx = r * w + c;
            match flags[idx] {
                CellFlag::NoData => out.set(r, c, 0.0),
                CellFlag::HoldConstant => out.set(r, c, v.get(r, c)),
                flag => {
                    let lambda_eff = if flag == CellFlag::GradientOnly { 0.0 } else { params.lambda };
                    let mut sum = 0.0_f64;
                    let mut n = 0u32;
                    for (dr, dc) in NEIGHBOR_OFFSETS {
                        if let Some((nr, nc)) = params.edge.neighbor(r, c, dr, dc, w, h) {
                            if flags[nr * w + nc] != CellFlag::NoData {
                                sum += v.get(nr, nc);
                                n += 1;
                            }
                        }
                    }
                    out.set(r, c, sum - (n as f64 + lambda_eff) * v.get(r, c));
                }
            }
        }
    }
    out
}

fn dot(a: &Grid, b: &Grid) -> f64 {
    a.data.iter().zip(b.data.iter()).map(|(x, y)| x * y).sum()
}

fn axpy(y: &mut Grid, alpha: f64, x: &Grid) {
    for (yv, xv) in y.data.iter_mut().zip(x.data.iter()) {
        *yv += alpha * xv;
    }
}

fn zero_hold_constant(v: &mut Grid, flags: &[CellFlag]) {
    for (idx, &flag) in flags.iter().enumerate() {
        if flag == CellFlag::HoldConstant {
            v.data[idx] = 0.0;
        }
    }
}

/// Alternative single-level solver for the same linear system the
/// multigrid Gauss-Seidel solves, via standard conjugate gradient.
pub fn solve_conjugate_gradient(
    u: &Grid,
    div_g: &Grid,
    flags: &[CellFlag],
    params: &RelaxParams,
    max_iterations: usize,
) -> Grid {
    let (w, h) = (u.width, u.height);
    let n = (w * h).max(1) as f64;

    let mut b = Grid::filled(w, h, 0.0);
    for (idx, &flag) in flags.iter().enumerate() {
        b.data[idx] = match flag {
            CellFlag::NoData => 0.0,
            CellFlag::HoldConstant => u.data[idx],
            CellFlag::GradientOnly => div_g.data[idx],
            CellFlag::None => params.lambda * u.data[idx] + div_g.data[idx],
        };
    }

    let mut x = u.clone();
    let mut r = b.clone();
    axpy(&mut r, -1.0, &apply_operator(&x, flags, params));
    zero_hold_constant(&mut r, flags);
    let mut p = r.clone();
    let mut rs_old = dot(&r, &r);

    for _ in 0..max_iterations {
        if rs_old / n < params.epsilon * params.epsilon {
            break;
        }
        let ap = apply_operator(&p, flags, params);
        let denom = dot(&p, &ap);
        if denom.abs() < 1e-18 {
            break;
        }
        let alpha = rs_old / denom;
        axpy(&mut x, alpha, &p);
        axpy(&mut r, -alpha, &ap);
        zero_hold_constant(&mut r, flags);
        let rs_new = dot(&r, &r);
        let beta = rs_new / rs_old.max(1e-18);
        for (pv, rv) in p.data.iter_mut().zip(r.data.iter()) {
            *pv = *rv + beta * *pv;
        }
        rs_old = rs_new;
    }

    restore_hold_constant(&mut x, u, flags);
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_input_stays_near_constant() {
        let size = 8;
        let u = Grid::filled(size, size, 0.25);
        let flags = vec![CellFlag::None; size * size];
        let div_g = Grid::filled(size, size, 0.0);
        let params = RelaxParams { lambda: 0.00001, epsilon: 0.001, edge: EdgeMode::Clamp };
        let result = solve_conjugate_gradient(&u, &div_g, &flags, &params, 50);
        for &v in &result.data {
            assert!((v - 0.25).abs() < 0.001, "got {v}");
        }
    }

    #[test]
    fn hold_constant_cells_are_bit_exact_to_input() {
        let size = 4;
        let u = Grid::filled(size, size, 0.5);
        let mut flags = vec![CellFlag::None; size * size];
        flags[5] = CellFlag::HoldConstant;
        let div_g = Grid::filled(size, size, 0.0);
        let params = RelaxParams { lambda: 0.01, epsilon: 0.001, edge: EdgeMode::Clamp };
        let result = solve_conjugate_gradient(&u, &div_g, &flags, &params, 50);
        assert_eq!(result.data[5], u.data[5]);
    }
}
