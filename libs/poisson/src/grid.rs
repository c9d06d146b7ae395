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
use crate::flags::CellFlag;

/// A single-band dense f64 grid, the unit the solver relaxes over.
#[derive(Clone, Debug)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f64>,
}

impl Grid {
    pub fn filled(width: usize, height: usize, value: f64) -> Self {
        Self { width, height, data: vec![value; width * height] }
    }

    pub fn from_vec(width: usize, height: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self { width, height, data }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, v: f64) {
        self.data[row * self.width + col] = v;
    }
}

/// Pads `grid`/`flags` up to the next power-of-two side length, marking
/// every padding cell `NoData`.
pub fn pad_to_power_of_two(grid: &Grid, flags: &[CellFlag]) -> (Grid, Vec<CellFlag>) {
    let pw = grid.width.max(1).next_power_of_two();
    let ph = grid.height.max(1).next_power_of_two();
    let mut out = Grid::filled(pw, ph, 0.0);
    let mut out_flags = vec![CellFlag::NoData; pw * ph];
    for r in 0..grid.height {
        for c in 0..grid.width {
            out.set(r, c, grid.get(r, c));
            out_flags[r * pw + c] = flags[r * grid.width + c];
        }
    }
    (out, out_flags)
}

/// Box-filter downsample by a factor of two, majority-voting flags: a
/// coarse cell is `NoData` only if every contributor is, `HoldConstant`
/// only if every contributor is.
pub fn downsample2(grid: &Grid, flags: &[CellFlag]) -> (Grid, Vec<CellFlag>) {
    let ow = (grid.width / 2).max(1);
    let oh = (grid.height / 2).max(1);
    let mut out = Grid::filled(ow, oh, 0.0);
    let mut out_flags = vec![CellFlag::None; ow * oh];
    for r in 0..oh {
        for c in 0..ow {
            let mut sum = 0.0_f64;
            let mut valid = 0u32;
            let mut hold = 0u32;
            let mut total = 0u32;
            for dr in 0..2 {
                for dc in 0..2 {
                    let sr = (r * 2 + dr).min(grid.height - 1);
                    let sc = (c * 2 + dc).min(grid.width - 1);
                    let f = flags[sr * grid.width + sc];
                    total += 1;
                    if f != CellFlag::NoData {
                        sum += grid.get(sr, sc);
                        valid += 1;
                    }
                    if f == CellFlag::HoldConstant {
                        hold += 1;
                    }
                }
            }
            out.set(r, c, if valid > 0 { sum / valid as f64 } else { 0.0 });
            out_flags[r * ow + c] = if valid == 0 {
                CellFlag::NoData
            } else if hold == total {
                CellFlag::HoldConstant
            } else {
                CellFlag::None
            };
        }
    }
    (out, out_flags)
}

/// Bilinear-interpolates `(relaxed - guess)` from a coarse grid and adds
/// it into `fine`, which is exactly double the coarse resolution on each
/// axis (with the usual truncation for odd sizes).
pub fn upsample_bilinear_add_difference(coarse_guess: &Grid, coarse_relaxed: &Grid, fine: &mut Grid) {
    let (fw, fh) = (fine.width, fine.height);
    let (cw, ch) = (coarse_relaxed.width, coarse_relaxed.height);
    for r in 0..fh {
        for c in 0..fw {
            let fr = r as f64 / 2.0;
            let fc = c as f64 / 2.0;
            let r0 = (fr.floor() as usize).min(ch - 1);
            let c0 = (fc.floor() as usize).min(cw - 1);
            let r1 = (r0 + 1).min(ch - 1);
            let c1 = (c0 + 1).min(cw - 1);
            let tr = fr - r0 as f64;
            let tc = fc - c0 as f64;
            let diff = |rr: usize, cc: usize| coarse_relaxed.get(rr, cc) - coarse_guess.get(rr, cc);
            let d0 = diff(r0, c0) * (1.0 - tc) + diff(r0, c1) * tc;
            let d1 = diff(r1, c0) * (1.0 - tc) + diff(r1, c1) * tc;
            let d = d0 * (1.0 - tr) + d1 * tr;
            let v = fine.get(r, c) + d;
            fine.set(r, c, v);
        }
    }
}

/// Re-pins `HoldConstant` cells to their input value; used after any step
/// (multigrid correction, CG update) that might otherwise have disturbed
/// them.
pub fn restore_hold_constant(f: &mut Grid, u: &Grid, flags: &[CellFlag]) {
    for (idx, &flag) in flags.iter().enumerate() {
        if flag == CellFlag::HoldConstant {
            f.data[idx] = u.data[idx];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_marks_new_cells_no_data() {
        let grid = Grid::filled(3, 3, 1.0);
        let flags = vec![CellFlag::None; 9];
        let (padded, padded_flags) = pad_to_power_of_two(&grid, &flags);
        assert_eq!(padded.width, 4);
        assert_eq!(padded.height, 4);
        assert_eq!(padded_flags[3 * 4 + 3], CellFlag::NoData);
        assert_eq!(padded.get(0, 0), 1.0);
    }

    #[test]
    fn downsample_averages_and_unions_flags() {
        let grid = Grid::from_vec(4, 4, vec![1.0; 16]);
        let mut flags = vec![CellFlag::None; 16];
        flags[0] = CellFlag::HoldConstant;
        flags[1] = CellFlag::HoldConstant;
        flags[4] = CellFlag::HoldConstant;
        flags[5] = CellFlag::HoldConstant;
        let (down, down_flags) = downsample2(&grid, &flags);
        assert_eq!(down.width, 2);
        assert_eq!(down_flags[0], CellFlag::HoldConstant);
        assert!((down.get(0, 0) - 1.0).abs() < 1e-12);
    }
}
