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
use crate::error::{RasterError, Result, MAX_RASTER_ELEMENTS};
use rayon::prelude::*;
use std::collections::HashMap;

/// Element types an `Image` band may hold.
pub trait Cell: Copy + Send + Sync + PartialEq + Default + 'static {
    fn to_f64(self) -> f64;
    fn from_f64(v: f64) -> Self;
}

macro_rules! impl_cell_float {
    ($t:ty) => {
        impl Cell for $t {
            fn to_f64(self) -> f64 {
                self as f64
            }
            fn from_f64(v: f64) -> Self {
                v as $t
            }
        }
    };
}
macro_rules! impl_cell_int {
    ($t:ty) => {
        impl Cell for $t {
            fn to_f64(self) -> f64 {
                self as f64
            }
            fn from_f64(v: f64) -> Self {
                v.round() as $t
            }
        }
    };
}
impl_cell_float!(f32);
impl_cell_float!(f64);
impl_cell_int!(u8);
impl_cell_int!(u16);
impl_cell_int!(i32);

/// In-core multi-band raster with an optional validity mask and one saved
/// mask snapshot. Bands are row-major; `data[b][r * width + c]` addresses
/// band `b`, row `r`, column `c`.
#[derive(Clone, Debug)]
pub struct Image<T: Cell> {
    width: usize,
    height: usize,
    bands: Vec<Vec<T>>,
    mask: Option<Vec<bool>>,
    saved_mask: Option<Vec<bool>>,
    metadata: HashMap<String, String>,
}

impl<T: Cell> Image<T> {
    /// Create a new zeroed raster. Fails with `SizeTooLarge` before
    /// allocating anything if `band_count * width * height` would exceed
    /// the implementation array limit.
    pub fn create(band_count: usize, width: usize, height: usize) -> Result<Self> {
        let cells = width as u64 * height as u64;
        let total = band_count as u64 * cells;
        if total > MAX_RASTER_ELEMENTS {
            return Err(RasterError::SizeTooLarge {
                bands: band_count,
                width,
                height,
                limit: MAX_RASTER_ELEMENTS,
            });
        }
        Ok(Self {
            width,
            height,
            bands: (0..band_count)
                .map(|_| vec![T::default(); width * height])
                .collect(),
            mask: None,
            saved_mask: None,
            metadata: HashMap::new(),
        })
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    fn check_band(&self, band: usize) -> Result<()> {
        if band >= self.bands.len() {
            return Err(RasterError::BandMismatch {
                have: self.bands.len(),
                need: band + 1,
            });
        }
        Ok(())
    }

    fn check_bounds(&self, what: &'static str, row: i64, col: i64) -> Result<()> {
        if row < 0 || col < 0 || row as usize >= self.height || col as usize >= self.width {
            return Err(RasterError::OutOfBounds {
                what,
                row,
                col,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// R[b, row, col] = R.bandData[b][row * width + col].
    pub fn get(&self, band: usize, row: usize, col: usize) -> Result<T> {
        self.check_band(band)?;
        self.check_bounds("get", row as i64, col as i64)?;
        Ok(self.bands[band][row * self.width + col])
    }

    pub fn set(&mut self, band: usize, row: usize, col: usize, value: T) -> Result<()> {
        self.check_band(band)?;
        self.check_bounds("set", row as i64, col as i64)?;
        self.bands[band][row * self.width + col] = value;
        Ok(())
    }

    pub fn band(&self, band: usize) -> Result<&[T]> {
        self.check_band(band)?;
        Ok(&self.bands[band])
    }

    pub fn band_mut(&mut self, band: usize) -> Result<&mut [T]> {
        self.check_band(band)?;
        Ok(&mut self.bands[band])
    }

    /// Sample at pixel-center: adds a half-pixel offset before truncating
    /// the fractional sub-pixel coordinate into the backing grid.
    pub fn sample_subpixel(&self, band: usize, u_row: f64, u_col: f64) -> Result<T> {
        let row = (u_row - 0.5).round().max(0.0) as usize;
        let col = (u_col - 0.5).round().max(0.0) as usize;
        self.get(band, row.min(self.height - 1), col.min(self.width - 1))
    }

    /// u = col / W; v = 1 - row / H. UV origin is lower-left, pixel origin
    /// is upper-left, so v flips relative to row.
    pub fn pixel_to_uv(&self, row: f64, col: f64) -> (f64, f64) {
        (col / self.width as f64, 1.0 - row / self.height as f64)
    }

    pub fn uv_to_pixel(&self, u: f64, v: f64) -> (f64, f64) {
        ((1.0 - v) * self.height as f64, u * self.width as f64)
    }

    pub fn has_mask(&self) -> bool {
        self.mask.is_some()
    }

    pub fn create_mask(&mut self, initial_valid: bool) {
        self.mask = Some(vec![initial_valid; self.width * self.height]);
    }

    pub fn delete_mask(&mut self) {
        self.mask = None;
    }

    pub fn is_valid(&self, row: usize, col: usize) -> Result<bool> {
        match &self.mask {
            Some(m) => Ok(m[row * self.width + col]),
            None => Err(RasterError::MaskAbsent),
        }
    }

    pub fn set_valid(&mut self, row: usize, col: usize, valid: bool) -> Result<()> {
        match &mut self.mask {
            Some(m) => {
                m[row * self.width + col] = valid;
                Ok(())
            }
            None => Err(RasterError::MaskAbsent),
        }
    }

    /// Snapshot the current mask; only one snapshot may be held at a time.
    pub fn save_mask(&mut self) -> Result<()> {
        if self.saved_mask.is_some() {
            return Err(RasterError::MaskAlreadySaved);
        }
        let mask = self.mask.clone().ok_or(RasterError::MaskAbsent)?;
        self.saved_mask = Some(mask);
        Ok(())
    }

    pub fn restore_mask(&mut self) -> Result<()> {
        self.mask = Some(self.saved_mask.take().ok_or(RasterError::MaskAbsent)?);
        Ok(())
    }

    /// Smallest sub-rectangle enclosing all valid cells, as (row0, col0,
    /// width, height). A raster with no valid cells (or no mask) returns a
    /// zero-size rectangle at the origin.
    pub fn trim_bounds(&self) -> (usize, usize, usize, usize) {
        let Some(mask) = &self.mask else {
            return (0, 0, 0, 0);
        };
        let (mut r0, mut c0) = (usize::MAX, usize::MAX);
        let (mut r1, mut c1) = (0usize, 0usize);
        let mut any = false;
        for row in 0..self.height {
            for col in 0..self.width {
                if mask[row * self.width + col] {
                    any = true;
                    r0 = r0.min(row);
                    c0 = c0.min(col);
                    r1 = r1.max(row);
                    c1 = c1.max(col);
                }
            }
        }
        if !any {
            return (0, 0, 0, 0);
        }
        (r0, c0, c1 - c0 + 1, r1 - r0 + 1)
    }

    pub fn trim(&self) -> Result<Self> {
        let (r0, c0, w, h) = self.trim_bounds();
        self.crop(r0, c0, w, h)
    }

    /// Copies cells into a new raster; mask (if present) is propagated
    /// cell-by-cell.
    pub fn crop(&self, start_row: usize, start_col: usize, w: usize, h: usize) -> Result<Self> {
        if w == 0 || h == 0 {
            let mut out = Self::create(self.bands.len(), 0, 0).map_err(|e| e)?;
            if self.mask.is_some() {
                out.create_mask(true);
            }
            return Ok(out);
        }
        if start_row + h > self.height || start_col + w > self.width {
            return Err(RasterError::OutOfBounds {
                what: "crop",
                row: (start_row + h) as i64,
                col: (start_col + w) as i64,
                width: self.width,
                height: self.height,
            });
        }
        let mut out = Self::create(self.bands.len(), w, h)?;
        for b in 0..self.bands.len() {
            for row in 0..h {
                for col in 0..w {
                    let v = self.get(b, start_row + row, start_col + col)?;
                    out.set(b, row, col, v)?;
                }
            }
        }
        if let Some(mask) = &self.mask {
            let mut new_mask = vec![false; w * h];
            for row in 0..h {
                for col in 0..w {
                    new_mask[row * w + col] = mask[(start_row + row) * self.width + start_col + col];
                }
            }
            out.mask = Some(new_mask);
        }
        Ok(out)
    }

    /// Copies up to `min(src.bands, dst.bands)` bands from `src_rect` of
    /// `src` into `self` at `(dst_row, dst_col)`.
    pub fn blit(
        &mut self,
        src: &Self,
        dst_row: usize,
        dst_col: usize,
        src_rect: (usize, usize, usize, usize),
        clear_dst_mask: bool,
    ) -> Result<()> {
        let (sr0, sc0, sw, sh) = src_rect;
        if sr0 + sh > src.height
            || sc0 + sw > src.width
            || dst_row + sh > self.height
            || dst_col + sw > self.width
        {
            return Err(RasterError::OutOfBounds {
                what: "blit",
                row: (dst_row + sh) as i64,
                col: (dst_col + sw) as i64,
                width: self.width,
                height: self.height,
            });
        }
        let bands = self.bands.len().min(src.bands.len());
        for b in 0..bands {
            for row in 0..sh {
                for col in 0..sw {
                    let v = src.get(b, sr0 + row, sc0 + col)?;
                    self.set(b, dst_row + row, dst_col + col, v)?;
                    if clear_dst_mask {
                        if let Some(m) = &mut self.mask {
                            m[(dst_row + row) * self.width + dst_col + col] = false;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// New raster of size (floor(W/f), floor(H/f)); each output cell is
    /// the mean (or, if `average` is false, the first valid sample) of the
    /// f x f source block. Output mask bit is set iff the block had zero
    /// valid inputs. Runs in parallel across output rows.
    pub fn decimated(&self, factor: usize, average: bool) -> Result<Self> {
        assert!(factor >= 1, "decimation factor must be >= 1");
        let out_w = self.width / factor;
        let out_h = self.height / factor;
        let mut out = Self::create(self.bands.len(), out_w, out_h)?;
        if self.mask.is_some() {
            out.create_mask(true);
        }
        for b in 0..self.bands.len() {
            let src_band = &self.bands[b];
            let mask = self.mask.as_ref();
            let rows: Vec<Vec<T>> = (0..out_h)
                .into_par_iter()
                .map(|out_row| {
                    let mut row_out = vec![T::default(); out_w];
                    for out_col in 0..out_w {
                        let mut sum = 0.0;
                        let mut count = 0u32;
                        let mut first_valid = None;
                        for dr in 0..factor {
                            for dc in 0..factor {
                                let r = out_row * factor + dr;
                                let c = out_col * factor + dc;
                                let idx = r * self.width + c;
                                let valid = mask.map(|m| m[idx]).unwrap_or(true);
                                if valid {
                                    let v = src_band[idx].to_f64();
                                    sum += v;
                                    count += 1;
                                    if first_valid.is_none() {
                                        first_valid = Some(v);
                                    }
                                }
                            }
                        }
                        row_out[out_col] = if count == 0 {
                            T::default()
                        } else if average {
                            T::from_f64(sum / count as f64)
                        } else {
                            T::from_f64(first_valid.unwrap())
                        };
                    }
                    row_out
                })
                .collect();
            for (out_row, row) in rows.into_iter().enumerate() {
                out.bands[b][out_row * out_w..(out_row + 1) * out_w].copy_from_slice(&row);
            }
            if let Some(out_mask) = &mut out.mask {
                for out_row in 0..out_h {
                    for out_col in 0..out_w {
                        let mut any_valid = false;
                        for dr in 0..factor {
                            for dc in 0..factor {
                                let r = out_row * factor + dr;
                                let c = out_col * factor + dc;
                                let idx = r * self.width + c;
                                if self.mask.as_ref().map(|m| m[idx]).unwrap_or(true) {
                                    any_valid = true;
                                }
                            }
                        }
                        out_mask[out_row * out_w + out_col] = any_valid;
                    }
                }
            }
        }
        Ok(out)
    }

    /// Map `f` over valid cells of `band` (or all cells if
    /// `apply_to_masked_values`).
    pub fn apply_in_place(
        &mut self,
        band: usize,
        apply_to_masked_values: bool,
        f: impl Fn(T) -> T + Sync,
    ) -> Result<()> {
        self.check_band(band)?;
        let mask = self.mask.clone();
        let width = self.width;
        let data = &mut self.bands[band];
        data.par_iter_mut().enumerate().for_each(|(idx, v)| {
            let valid = mask.as_ref().map(|m| m[idx]).unwrap_or(true);
            if valid || apply_to_masked_values {
                *v = f(*v);
            }
        });
        let _ = width;
        Ok(())
    }

    pub fn flip_vertical_in_place(&mut self) {
        let (w, h) = (self.width, self.height);
        for band in &mut self.bands {
            for row in 0..h / 2 {
                let (top, bottom) = (row, h - 1 - row);
                let (a, b) = band.split_at_mut(bottom * w);
                a[top * w..top * w + w].swap_with_slice(&mut b[0..w]);
            }
        }
        if let Some(mask) = &mut self.mask {
            for row in 0..h / 2 {
                let (top, bottom) = (row, h - 1 - row);
                let (a, b) = mask.split_at_mut(bottom * w);
                a[top * w..top * w + w].swap_with_slice(&mut b[0..w]);
            }
        }
    }

    /// Copy-rotate 90 degrees clockwise: (row, col) -> (col, H-1-row).
    pub fn rotate90_clockwise(&self) -> Result<Self> {
        let mut out = Self::create(self.bands.len(), self.height, self.width)?;
        if self.mask.is_some() {
            out.create_mask(true);
        }
        for b in 0..self.bands.len() {
            for row in 0..self.height {
                for col in 0..self.width {
                    let v = self.get(b, row, col)?;
                    out.set(b, col, self.height - 1 - row, v)?;
                }
            }
        }
        if let Some(mask) = &self.mask {
            let out_mask = out.mask.as_mut().unwrap();
            for row in 0..self.height {
                for col in 0..self.width {
                    out_mask[col * out.width + (self.height - 1 - row)] =
                        mask[row * self.width + col];
                }
            }
        }
        Ok(out)
    }
}

/// Convert a linear sRGB-like [0,1] RGB triple to CIE LAB, optionally
/// applying a log-luminance remap first. Used only by the Poisson
/// Stitcher, which blends seams in a perceptually uniform space.
pub fn rgb_to_lab(rgb: [f64; 3], log_luminance: bool) -> [f64; 3] {
    fn pivot_rgb(c: f64) -> f64 {
        if c > 0.04045 {
            ((c + 0.055) / 1.055).powf(2.4)
        } else {
            c / 12.92
        }
    }
    fn pivot_xyz(t: f64) -> f64 {
        if t > 0.008856 {
            t.cbrt()
        } else {
            7.787 * t + 16.0 / 116.0
        }
    }
    let [r, g, b] = rgb.map(pivot_rgb);
    let x = r * 0.4124 + g * 0.3576 + b * 0.1805;
    let y = r * 0.2126 + g * 0.7152 + b * 0.0722;
    let z = r * 0.0193 + g * 0.1192 + b * 0.9505;
    let (xn, yn, zn) = (0.95047, 1.0, 1.08883);
    let (fx, fy, fz) = (pivot_xyz(x / xn), pivot_xyz(y / yn), pivot_xyz(z / zn));
    let l = if log_luminance {
        (1.0 + y).ln() * 100.0 / 2.0_f64.ln()
    } else {
        116.0 * fy - 16.0
    };
    [l, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

pub fn lab_to_rgb(lab: [f64; 3], log_luminance: bool) -> [f64; 3] {
    fn inv_pivot_xyz(t: f64) -> f64 {
        if t.powi(3) > 0.008856 {
            t.powi(3)
        } else {
            (t - 16.0 / 116.0) / 7.787
        }
    }
    fn inv_pivot_rgb(c: f64) -> f64 {
        if c > 0.0031308 {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        } else {
            c * 12.92
        }
    }
    let [l, a, b] = lab;
    let fy = if log_luminance {
        ((l * 2.0_f64.ln() / 100.0).exp() - 1.0).max(0.0)
    } else {
        (l + 16.0) / 116.0
    };
    let y = if log_luminance { fy } else { inv_pivot_xyz(fy) };
    let fy2 = if log_luminance { (y + 1e-9).cbrt() } else { fy };
    let fx = fy2 + a / 500.0;
    let fz = fy2 - b / 200.0;
    let (xn, yn, zn) = (0.95047, 1.0, 1.08883);
    let x = inv_pivot_xyz(fx) * xn;
    let z = inv_pivot_xyz(fz) * zn;
    let r = x * 3.2406 + y * -1.5372 + z * -0.4986;
    let g = x * -0.9689 + y * 1.8758 + z * 0.0415;
    let b2 = x * 0.0557 + y * -0.2040 + z * 1.0570;
    [r, g, b2].map(inv_pivot_rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexing_matches_row_major_layout() -> Result<()> {
        let mut img = Image::<f32>::create(1, 4, 3)?;
        img.set(0, 2, 1, 9.0)?;
        assert_eq!(img.band(0)?[2 * 4 + 1], 9.0);
        assert_eq!(img.get(0, 2, 1)?, 9.0);
        Ok(())
    }

    #[test]
    fn crop_copies_expected_window() -> Result<()> {
        let mut img = Image::<f32>::create(1, 4, 4)?;
        for r in 0..4 {
            for c in 0..4 {
                img.set(0, r, c, (r * 4 + c) as f32)?;
            }
        }
        let cropped = img.crop(1, 1, 2, 2)?;
        assert_eq!(cropped.get(0, 0, 0)?, 5.0);
        assert_eq!(cropped.get(0, 1, 1)?, 10.0);
        Ok(())
    }

    #[test]
    fn trim_of_empty_mask_is_zero_size() -> Result<()> {
        let mut img = Image::<f32>::create(1, 4, 4)?;
        img.create_mask(false);
        let trimmed = img.trim()?;
        assert_eq!((trimmed.width(), trimmed.height()), (0, 0));
        Ok(())
    }

    #[test]
    fn decimate_by_two_averages_block() -> Result<()> {
        let mut img = Image::<f32>::create(1, 2, 2)?;
        img.set(0, 0, 0, 1.0)?;
        img.set(0, 0, 1, 3.0)?;
        img.set(0, 1, 0, 5.0)?;
        img.set(0, 1, 1, 7.0)?;
        let small = img.decimated(2, true)?;
        assert_eq!((small.width(), small.height()), (1, 1));
        assert_eq!(small.get(0, 0, 0)?, 4.0);
        Ok(())
    }

    #[test]
    fn pixel_uv_roundtrip_is_identity_modulo_flip() {
        let img = Image::<f32>::create(1, 10, 20).unwrap();
        let (u, v) = img.pixel_to_uv(5.0, 3.0);
        let (row, col) = img.uv_to_pixel(u, v);
        assert!((row - 5.0).abs() < 1e-9);
        assert!((col - 3.0).abs() < 1e-9);
    }

    #[test]
    fn flip_vertical_twice_is_identity() -> Result<()> {
        let mut img = Image::<f32>::create(1, 3, 4)?;
        for r in 0..4 {
            for c in 0..3 {
                img.set(0, r, c, (r * 3 + c) as f32)?;
            }
        }
        let original = img.clone();
        img.flip_vertical_in_place();
        img.flip_vertical_in_place();
        assert_eq!(img.band(0)?, original.band(0)?);
        Ok(())
    }

    #[test]
    fn rotate90_four_times_is_identity() -> Result<()> {
        let mut img = Image::<f32>::create(1, 3, 2)?;
        for r in 0..2 {
            for c in 0..3 {
                img.set(0, r, c, (r * 3 + c) as f32)?;
            }
        }
        let mut out = img.clone();
        for _ in 0..4 {
            out = out.rotate90_clockwise()?;
        }
        assert_eq!((out.width(), out.height()), (img.width(), img.height()));
        assert_eq!(out.band(0)?, img.band(0)?);
        Ok(())
    }

    #[test]
    fn lab_roundtrip_is_approximately_identity() {
        let rgb = [0.6, 0.3, 0.8];
        let lab = rgb_to_lab(rgb, false);
        let back = lab_to_rgb(lab, false);
        for i in 0..3 {
            assert!((rgb[i] - back[i]).abs() < 1e-3, "{:?} vs {:?}", rgb, back);
        }
    }

    #[test]
    fn size_too_large_is_rejected_before_allocation() {
        let err = Image::<f32>::create(1, 1 << 20, 1 << 20).unwrap_err();
        assert!(matches!(err, RasterError::SizeTooLarge { .. }));
    }
}
