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

/// Per-cell behavior during relaxation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CellFlag {
    #[default]
    None,
    /// Frozen to its input value; never updated by relaxation.
    HoldConstant,
    /// Omits the lambda term; the cell is constrained by gradients only.
    GradientOnly,
    /// Excluded from the Laplacian and from neighbor sums entirely.
    NoData,
}

/// How the solver treats off-grid neighbor lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeMode {
    Clamp,
    WrapCylinder,
    WrapSphere,
    WrapTorus,
}

impl EdgeMode {
    /// Resolves the neighbor at offset `(dr, dc)` from `(row, col)` in a
    /// `width x height` grid under this edge mode, or `None` if the
    /// neighbor genuinely does not exist.
    pub fn neighbor(
        &self,
        row: usize,
        col: usize,
        dr: i64,
        dc: i64,
        width: usize,
        height: usize,
    ) -> Option<(usize, usize)> {
        let w = width as i64;
        let h = height as i64;
        let mut r = row as i64 + dr;
        let mut c = col as i64 + dc;
        match self {
            EdgeMode::Clamp => {
                r = r.clamp(0, h - 1);
                c = c.clamp(0, w - 1);
            }
            EdgeMode::WrapCylinder => {
                c = c.rem_euclid(w);
                r = r.clamp(0, h - 1);
            }
            EdgeMode::WrapTorus => {
                r = r.rem_euclid(h);
                c = c.rem_euclid(w);
            }
            EdgeMode::WrapSphere => {
                // Columns wrap like longitude; crossing a pole row reflects
                // back into the grid and shifts by half the circumference,
                // approximating the cylinder-to-sphere identification.
                if r < 0 {
                    r = -r - 1;
                    c += w / 2;
                } else if r >= h {
                    r = 2 * h - r - 1;
                    c += w / 2;
                }
                c = c.rem_euclid(w);
            }
        }
        if r < 0 || r >= h || c < 0 || c >= w {
            None
        } else {
            Some((r as usize, c as usize))
        }
    }
}

/// Color space the solver operates in; bands are converted before solving
/// and converted back afterward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorSpace {
    None,
    RgbToLab,
    RgbToLogLab,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_never_leaves_the_grid() {
        let edge = EdgeMode::Clamp;
        assert_eq!(edge.neighbor(0, 0, -1, -1, 4, 4), Some((0, 0)));
        assert_eq!(edge.neighbor(3, 3, 1, 1, 4, 4), Some((3, 3)));
    }

    #[test]
    fn wrap_cylinder_wraps_columns_only() {
        let edge = EdgeMode::WrapCylinder;
        assert_eq!(edge.neighbor(0, 0, 0, -1, 4, 4), Some((0, 3)));
        assert_eq!(edge.neighbor(0, 0, -1, 0, 4, 4), Some((0, 0)));
    }

    #[test]
    fn wrap_torus_wraps_both_axes() {
        let edge = EdgeMode::WrapTorus;
        assert_eq!(edge.neighbor(0, 0, -1, -1, 4, 4), Some((3, 3)));
    }
}
