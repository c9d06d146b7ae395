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
use std::collections::HashSet;

/// A dense or sparse representation of a W x H boolean grid. A single
/// instance uses exactly one representation; `densify`/`sparsify` convert
/// between them explicitly rather than keeping both in sync.
pub enum BinaryRaster {
    Dense { width: usize, height: usize, bits: Vec<bool> },
    Sparse { width: usize, height: usize, set: HashSet<(usize, usize)> },
}

impl BinaryRaster {
    pub fn dense(width: usize, height: usize) -> Self {
        Self::Dense { width, height, bits: vec![false; width * height] }
    }

    pub fn sparse(width: usize, height: usize) -> Self {
        Self::Sparse { width, height, set: HashSet::new() }
    }

    pub fn dims(&self) -> (usize, usize) {
        match self {
            Self::Dense { width, height, .. } => (*width, *height),
            Self::Sparse { width, height, .. } => (*width, *height),
        }
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        match self {
            Self::Dense { width, bits, .. } => bits[row * width + col],
            Self::Sparse { set, .. } => set.contains(&(row, col)),
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        match self {
            Self::Dense { width, bits, .. } => bits[row * *width + col] = value,
            Self::Sparse { set, .. } => {
                if value {
                    set.insert((row, col));
                } else {
                    set.remove(&(row, col));
                }
            }
        }
    }

    pub fn densify(&self) -> Self {
        let (width, height) = self.dims();
        let mut bits = vec![false; width * height];
        for row in 0..height {
            for col in 0..width {
                bits[row * width + col] = self.get(row, col);
            }
        }
        Self::Dense { width, height, bits }
    }

    fn structuring_offsets(radius_rows: i64, radius_cols: i64) -> Vec<(i64, i64)> {
        let mut out = Vec::new();
        for dr in -radius_rows..=radius_rows {
            for dc in -radius_cols..=radius_cols {
                out.push((dr, dc));
            }
        }
        out
    }

    /// Set a cell true iff any cell within the rectangular structuring
    /// element centered on it is already true.
    pub fn dilate(&self, radius_rows: i64, radius_cols: i64) -> Self {
        let (width, height) = self.dims();
        let offsets = Self::structuring_offsets(radius_rows, radius_cols);
        let mut out = Self::dense(width, height);
        for row in 0..height {
            for col in 0..width {
                let hit = offsets.iter().any(|(dr, dc)| {
                    let r = row as i64 + dr;
                    let c = col as i64 + dc;
                    r >= 0 && c >= 0 && (r as usize) < height && (c as usize) < width
                        && self.get(r as usize, c as usize)
                });
                out.set(row, col, hit);
            }
        }
        out
    }

    /// Set a cell true iff every cell within the structuring element is
    /// already true (out-of-bounds neighbors count as false).
    pub fn erode(&self, radius_rows: i64, radius_cols: i64) -> Self {
        let (width, height) = self.dims();
        let offsets = Self::structuring_offsets(radius_rows, radius_cols);
        let mut out = Self::dense(width, height);
        for row in 0..height {
            for col in 0..width {
                let all = offsets.iter().all(|(dr, dc)| {
                    let r = row as i64 + dr;
                    let c = col as i64 + dc;
                    r >= 0 && c >= 0 && (r as usize) < height && (c as usize) < width
                        && self.get(r as usize, c as usize)
                });
                out.set(row, col, all);
            }
        }
        out
    }

    /// Erode then dilate: removes small true regions and noise while
    /// leaving larger shapes' outer boundary roughly intact.
    pub fn open(&self, radius_rows: i64, radius_cols: i64) -> Self {
        self.erode(radius_rows, radius_cols).dilate(radius_rows, radius_cols)
    }

    /// Dilate then erode: fills small gaps/holes in true regions.
    pub fn close(&self, radius_rows: i64, radius_cols: i64) -> Self {
        self.dilate(radius_rows, radius_cols).erode(radius_rows, radius_cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dilate_then_erode_identity_closes_single_point() {
        let mut r = BinaryRaster::dense(32, 32);
        r.set(10, 10, true);
        let closed = r.close(3, 3);
        let mut count = 0;
        for row in 4..=16 {
            for col in 4..=16 {
                if closed.get(row, col) {
                    count += 1;
                }
            }
        }
        // dilate(3,3) around a single point sets a 7x7 window (49 cells);
        // erode(3,3) of a 7x7 filled block of true yields back the same 7x7.
        assert_eq!(count, 49);
    }

    #[test]
    fn sparse_and_dense_agree() {
        let mut dense = BinaryRaster::dense(4, 4);
        let mut sparse = BinaryRaster::sparse(4, 4);
        dense.set(1, 2, true);
        sparse.set(1, 2, true);
        for row in 0..4 {
            for col in 0..4 {
                assert_eq!(dense.get(row, col), sparse.get(row, col));
            }
        }
    }
}
