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
use crate::error::{BakerError, Result};
use mesh::{Mesh, MeshOperator};
use nalgebra::Point2;
use raster::{Cell, Image};

/// Invalid-observation sentinel written to channel 0 of an index raster.
pub const NO_OBSERVATION_INDEX: u16 = 1;
/// "No mesh here" sentinel, distinct from a valid-but-unobserved texel.
pub const GUTTER_INDEX: u16 = 0;
pub const MIN_VALID_INDEX: u16 = 2;
pub const MAX_VALID_INDEX: u16 = 65535;
pub const ORBITAL_DEM_INDEX: u16 = 65534;
pub const ORBITAL_IMAGE_INDEX: u16 = 65535;

/// One contributing (mesh, color image, optional origin-index image)
/// triple. The index image is only emitted for the bake's output when
/// every source supplies one.
pub struct SourcePair<'m> {
    pub mesh: &'m Mesh,
    pub image: &'m Image<f32>,
    pub index: Option<&'m Image<u16>>,
}

/// Bake a target mesh's texture by, for every output texel: lifting the
/// texel to 3-D via the target's UV, finding the nearest triangle across
/// all source meshes, and resampling that source's image (bicubic) and
/// index (nearest) at the corresponding source UV. Remaining invalid
/// texels are in-painted by neighbor dilation up to `pad_width` passes.
pub fn bake(
    target: &Mesh,
    sources: &[SourcePair],
    width: usize,
    height: usize,
    pad_width: usize,
) -> Result<(Image<f32>, Option<Image<u16>>)> {
    if sources.is_empty() {
        return Err(BakerError::NoSources);
    }
    if target.vertices.iter().any(|v| v.uv.is_none()) {
        return Err(BakerError::MissingTargetUv);
    }

    let target_op = MeshOperator::new(target);
    let source_ops: Vec<MeshOperator> = sources.iter().map(|s| MeshOperator::new(s.mesh)).collect();
    let emit_index = sources.iter().all(|s| s.index.is_some());

    let mut color = Image::<f32>::create(3, width, height)?;
    color.create_mask(false);
    let mut index = if emit_index { Some(Image::<u16>::create(3, width, height)?) } else { None };
    if let Some(idx) = &mut index {
        idx.create_mask(false);
    }

    for row in 0..height {
        for col in 0..width {
            let (u, v) = color.pixel_to_uv(row as f64 + 0.5, col as f64 + 0.5);
            let Some((_, point)) = target_op.uv_to_point(&Point2::new(u, v)) else { continue };

            let mut best: Option<(usize, usize, nalgebra::Point3<f64>, mesh::Barycentric)> = None;
            let mut best_dist = f64::INFINITY;
            for (src_idx, op) in source_ops.iter().enumerate() {
                let Some((tri_idx, closest, bary)) = op.nearest_triangle(&point) else { continue };
                let dist = (closest - point).norm();
                if dist < best_dist {
                    best_dist = dist;
                    best = Some((src_idx, tri_idx, closest, bary));
                }
            }
            let Some((src_idx, tri_idx, _, bary)) = best else { continue };
            let source = &sources[src_idx];
            let tri = source.mesh.triangles[tri_idx];
            let uvs: Option<Vec<Point2<f64>>> =
                tri.iter().map(|&i| source.mesh.vertices[i as usize].uv).collect();
            let Some(uvs) = uvs else { continue };
            let src_uv = Point2::new(
                bary.interpolate(uvs[0].x, uvs[1].x, uvs[2].x),
                bary.interpolate(uvs[0].y, uvs[1].y, uvs[2].y),
            );
            let (src_row, src_col) = source.image.uv_to_pixel(src_uv.x, src_uv.y);

            for band in 0..3 {
                let sample = bicubic_sample(source.image, band, src_row, src_col);
                color.set(band, row, col, sample)?;
            }
            color.set_valid(row, col, true)?;

            if let (Some(idx_image), Some(src_index)) = (&mut index, source.index) {
                let (nr, nc) = (src_row.round().max(0.0) as usize, src_col.round().max(0.0) as usize);
                let nr = nr.min(src_index.height() - 1);
                let nc = nc.min(src_index.width() - 1);
                idx_image.set(0, row, col, src_index.get(0, nr, nc)?)?;
                idx_image.set(1, row, col, nr as u16)?;
                idx_image.set(2, row, col, nc as u16)?;
                idx_image.set_valid(row, col, true)?;
            }
        }
    }

    inpaint(&mut color, pad_width);
    if let Some(idx_image) = &mut index {
        inpaint_nearest(idx_image, pad_width);
    }

    Ok((color, index))
}

fn bicubic_sample(image: &Image<f32>, band: usize, row: f64, col: f64) -> f32 {
    let cubic_weight = |t: f64| -> [f64; 4] {
        let t2 = t * t;
        let t3 = t2 * t;
        [
            -0.5 * t3 + t2 - 0.5 * t,
            1.5 * t3 - 2.5 * t2 + 1.0,
            -1.5 * t3 + 2.0 * t2 + 0.5 * t,
            0.5 * t3 - 0.5 * t2,
        ]
    };
    let r0 = row.floor();
    let c0 = col.floor();
    let fr = row - r0;
    let fc = col - c0;
    let wr = cubic_weight(fr);
    let wc = cubic_weight(fc);

    let clamp_row = |r: i64| r.clamp(0, image.height() as i64 - 1) as usize;
    let clamp_col = |c: i64| c.clamp(0, image.width() as i64 - 1) as usize;

    let mut acc = 0.0_f64;
    for (i, dr) in (-1..=2).enumerate() {
        let rr = clamp_row(r0 as i64 + dr);
        let mut row_acc = 0.0_f64;
        for (j, dc) in (-1..=2).enumerate() {
            let cc = clamp_col(c0 as i64 + dc);
            let v = image.get(band, rr, cc).unwrap_or_default().to_f64();
            row_acc += wc[j] * v;
        }
        acc += wr[i] * row_acc;
    }
    acc as f32
}

/// Average-of-valid-neighbors in-paint, `pad_width` dilation passes.
fn inpaint(image: &mut Image<f32>, pad_width: usize) {
    for _ in 0..pad_width {
        let (w, h) = (image.width(), image.height());
        let mut updates = Vec::new();
        for row in 0..h {
            for col in 0..w {
                if image.is_valid(row, col).unwrap_or(true) {
                    continue;
                }
                let mut sums = [0.0_f64; 3];
                let mut count = 0u32;
                for dr in -1..=1_i64 {
                    for dc in -1..=1_i64 {
                        if dr == 0 && dc == 0 {
                            continue;
                        }
                        let nr = row as i64 + dr;
                        let nc = col as i64 + dc;
                        if nr < 0 || nc < 0 || nr as usize >= h || nc as usize >= w {
                            continue;
                        }
                        let (nr, nc) = (nr as usize, nc as usize);
                        if image.is_valid(nr, nc).unwrap_or(false) {
                            for band in 0..3 {
                                sums[band] += image.get(band, nr, nc).unwrap_or_default().to_f64();
                            }
                            count += 1;
                        }
                    }
                }
                if count > 0 {
                    updates.push((row, col, sums.map(|s| (s / count as f64) as f32)));
                }
            }
        }
        if updates.is_empty() {
            break;
        }
        for (row, col, values) in updates {
            for band in 0..3 {
                let _ = image.set(band, row, col, values[band]);
            }
            let _ = image.set_valid(row, col, true);
        }
    }
}

fn inpaint_nearest(image: &mut Image<u16>, pad_width: usize) {
    for _ in 0..pad_width {
        let (w, h) = (image.width(), image.height());
        let mut updates = Vec::new();
        for row in 0..h {
            for col in 0..w {
                if image.is_valid(row, col).unwrap_or(true) {
                    continue;
                }
                'neighbors: for dr in -1..=1_i64 {
                    for dc in -1..=1_i64 {
                        if dr == 0 && dc == 0 {
                            continue;
                        }
                        let nr = row as i64 + dr;
                        let nc = col as i64 + dc;
                        if nr < 0 || nc < 0 || nr as usize >= h || nc as usize >= w {
                            continue;
                        }
                        let (nr, nc) = (nr as usize, nc as usize);
                        if image.is_valid(nr, nc).unwrap_or(false) {
                            updates.push((
                                row,
                                col,
                                [
                                    image.get(0, nr, nc).unwrap_or_default(),
                                    image.get(1, nr, nc).unwrap_or_default(),
                                    image.get(2, nr, nc).unwrap_or_default(),
                                ],
                            ));
                            break 'neighbors;
                        }
                    }
                }
            }
        }
        if updates.is_empty() {
            break;
        }
        for (row, col, values) in updates {
            for band in 0..3 {
                let _ = image.set(band, row, col, values[band]);
            }
            let _ = image.set_valid(row, col, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh::Vertex;
    use nalgebra::Point3;

    fn unit_quad_mesh(with_uv: bool) -> Mesh {
        let mk = |x: f64, y: f64, u: f64, v: f64| {
            let mut vert = Vertex::at(Point3::new(x, y, 0.0));
            if with_uv {
                vert = vert.with_uv(Point2::new(u, v));
            }
            vert
        };
        Mesh::new(
            vec![
                mk(0.0, 0.0, 0.0, 0.0),
                mk(1.0, 0.0, 1.0, 0.0),
                mk(1.0, 1.0, 1.0, 1.0),
                mk(0.0, 1.0, 0.0, 1.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn bake_fills_every_texel_after_inpaint() {
        let target = unit_quad_mesh(true);
        let source = unit_quad_mesh(true);
        let mut image = Image::<f32>::create(3, 4, 4).unwrap();
        for band in 0..3 {
            for i in 0..16 {
                image.set(band, i / 4, i % 4, 0.5).unwrap();
            }
        }
        let sources = vec![SourcePair { mesh: &source, image: &image, index: None }];
        let (color, index) = bake(&target, &sources, 8, 8, 2).unwrap();
        assert!(index.is_none());
        for row in 0..8 {
            for col in 0..8 {
                assert!(color.is_valid(row, col).unwrap());
            }
        }
    }

    #[test]
    fn bake_requires_target_uv() {
        let target = unit_quad_mesh(false);
        let source = unit_quad_mesh(true);
        let image = Image::<f32>::create(3, 4, 4).unwrap();
        let sources = vec![SourcePair { mesh: &source, image: &image, index: None }];
        assert!(matches!(bake(&target, &sources, 4, 4, 1), Err(BakerError::MissingTargetUv)));
    }

    #[test]
    fn bake_emits_index_only_when_every_source_has_one() {
        let target = unit_quad_mesh(true);
        let source = unit_quad_mesh(true);
        let image = Image::<f32>::create(3, 4, 4).unwrap();
        let mut idx = Image::<u16>::create(1, 4, 4).unwrap();
        idx.create_mask(true);
        let sources = vec![SourcePair { mesh: &source, image: &image, index: Some(&idx) }];
        let (_, index) = bake(&target, &sources, 4, 4, 1).unwrap();
        assert!(index.is_some());
    }
}
