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
use camera::{CameraModel, Pixel};
use geometry::Aabb3;
use mesh::{Mesh, MeshOperator};
use nalgebra::{Point2, Point3};

pub const MIN_TILE_RES: usize = 8;
pub const MAX_TILE_RES: usize = 4096;

/// A single contributing image: its camera model and the 3-D range from
/// the camera to the surface it observes, used for frustum culling and
/// ground-sample-distance estimation.
#[derive(Clone, Debug)]
pub struct Observation {
    pub camera: CameraModel,
    pub near: f64,
    pub far: f64,
}

impl Observation {
    pub fn new(camera: CameraModel, near: f64, far: f64) -> Self {
        Self { camera, near, far }
    }

    /// Ground sample distance in meters/pixel at `range`, estimated by
    /// unprojecting two horizontally adjacent pixels at the image center
    /// and measuring the 3-D distance between the resulting points.
    pub fn ground_sample_distance(&self, range: f64) -> f64 {
        let cx = self.camera.image_width() as f64 / 2.0;
        let cy = self.camera.image_height() as f64 / 2.0;
        let p0 = self.camera.unproject(&Pixel::new(cy, cx), range);
        let p1 = self.camera.unproject(&Pixel::new(cy, cx + 1.0), range);
        (p1 - p0).norm()
    }

    fn visible_against(&self, bounds: &Aabb3) -> bool {
        match self.camera.frustum_hull(self.near, self.far) {
            Some(hull) => hull.intersects_bounds(bounds),
            None => true,
        }
    }
}

/// Outcome of a split test: `None` means the tile need not subdivide;
/// `Some(reason)` carries a human-readable justification for logs/tests.
pub type SplitDecision = Option<String>;

pub trait SplitCriteria {
    fn should_split(&self, bounds: &Aabb3, mesh_ops: &[&MeshOperator]) -> SplitDecision;
}

/// Subdivide iff the total face count across all source meshes within
/// `bounds` exceeds `max_faces`.
pub struct FaceSplitCriteria {
    pub max_faces: usize,
}

impl SplitCriteria for FaceSplitCriteria {
    fn should_split(&self, bounds: &Aabb3, mesh_ops: &[&MeshOperator]) -> SplitDecision {
        let total: usize = mesh_ops.iter().map(|op| op.face_count_in_bounds(bounds)).sum();
        if total > self.max_faces {
            Some(format!("face count {total} exceeds max {}", self.max_faces))
        } else {
            None
        }
    }
}

/// Subdivide iff the total clipped mesh area across all source meshes
/// within `bounds` exceeds `max_area`.
pub struct AreaSplitCriteria {
    pub max_area: f64,
}

impl SplitCriteria for AreaSplitCriteria {
    fn should_split(&self, bounds: &Aabb3, mesh_ops: &[&MeshOperator]) -> SplitDecision {
        let total: f64 = mesh_ops.iter().map(|op| op.clip(bounds).total_area()).sum();
        if total > self.max_area {
            Some(format!("clipped area {total:.3} exceeds max {:.3}", self.max_area))
        } else {
            None
        }
    }
}

/// Which algorithm `TextureSplitCriteria` uses to compare observation
/// resolution against tile texel density.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureSplitMode {
    /// Coarse aggregate estimate over 25 central rays through the mesh.
    Approximate,
    /// Per-texel backprojection against the best-resolving camera, taking
    /// a percentile over a subsampled grid of atlas texels.
    Backproject { percent_pixels_to_test: u8, percent_pixels_satisfied: u8 },
}

/// Resolution-vs-observation-density test: subdivides when the tile's
/// target texel density cannot keep up with the resolution the source
/// imagery actually provides.
pub struct TextureSplitCriteria {
    pub observations: Vec<Observation>,
    pub max_texels_per_meter: f64,
    pub respect_max_texels_per_meter: bool,
    pub round_resolution_to_power_of_two: bool,
    pub max_pixels_per_texel: f64,
    pub mode: TextureSplitMode,
}

impl TextureSplitCriteria {
    fn target_resolution(&self, bounds: &Aabb3, mesh_area: f64) -> usize {
        let linear = self.max_texels_per_meter * bounds.extent().iter().cloned().fold(0.0, f64::max);
        let area_based = (mesh_area.max(1e-9) * self.max_texels_per_meter * self.max_texels_per_meter).sqrt();
        let mut r = linear.max(area_based).round() as usize;
        r = r.clamp(MIN_TILE_RES, MAX_TILE_RES);
        if self.round_resolution_to_power_of_two {
            r = r.next_power_of_two();
        }
        r
    }

    /// Approximate mode: compares texel density against a coarse
    /// observation-pixel density sampled along 25 central rays through the
    /// clipped mesh.
    fn approximate(&self, bounds: &Aabb3, mesh_ops: &[&MeshOperator]) -> SplitDecision {
        let mesh_area: f64 = mesh_ops.iter().map(|op| op.clip(bounds).total_area()).sum();
        if mesh_area <= 0.0 {
            return None;
        }
        let resolution = self.target_resolution(bounds, mesh_area);
        if self.respect_max_texels_per_meter {
            let achieved_tpm = resolution as f64 / bounds.extent().iter().cloned().fold(0.0, f64::max).max(1e-9);
            if achieved_tpm < self.max_texels_per_meter {
                return None;
            }
        }
        let texels_per_m2 = 0.5 * (resolution as f64).powi(2) / mesh_area;

        let visible: Vec<&Observation> =
            self.observations.iter().filter(|o| o.visible_against(bounds)).collect();
        if visible.is_empty() {
            return None;
        }

        let samples = sample_central_points(bounds, mesh_ops, 25);
        if samples.is_empty() {
            return None;
        }

        let mut best_pixels_per_m2 = 0.0_f64;
        for obs in &visible {
            for point in &samples {
                let Some(_) = obs.camera.project(point) else { continue };
                let range = distance_from_camera(&obs.camera, point);
                let gsd = obs.ground_sample_distance(range);
                if gsd <= 0.0 {
                    continue;
                }
                best_pixels_per_m2 = best_pixels_per_m2.max(1.0 / (gsd * gsd));
            }
        }
        if best_pixels_per_m2 <= 0.0 {
            return None;
        }

        let ratio = best_pixels_per_m2 / texels_per_m2;
        if ratio > self.max_pixels_per_texel {
            Some(format!(
                "observations resolve {ratio:.2} px/texel > max {:.2}",
                self.max_pixels_per_texel
            ))
        } else {
            None
        }
    }

    /// Backproject mode: UV-atlases the clipped mesh (the clipped
    /// triangles carry whatever UVs were baked onto them upstream),
    /// subsamples a percentage of the output atlas texels, and for each
    /// finds the best-resolving visible camera and the world-space area
    /// of that texel's footprint under it. The requested percentile of
    /// those per-texel pixels-per-texel ratios drives the decision.
    fn backproject(
        &self,
        bounds: &Aabb3,
        mesh_ops: &[&MeshOperator],
        percent_pixels_to_test: u8,
        percent_pixels_satisfied: u8,
    ) -> SplitDecision {
        let mesh_area: f64 = mesh_ops.iter().map(|op| op.clip(bounds).total_area()).sum();
        if mesh_area <= 0.0 {
            return None;
        }
        let resolution = self.target_resolution(bounds, mesh_area);
        if self.respect_max_texels_per_meter {
            let achieved_tpm = resolution as f64 / bounds.extent().iter().cloned().fold(0.0, f64::max).max(1e-9);
            if achieved_tpm < self.max_texels_per_meter {
                return None;
            }
        }

        let visible: Vec<&Observation> =
            self.observations.iter().filter(|o| o.visible_against(bounds)).collect();
        if visible.is_empty() {
            return None;
        }

        let clipped: Vec<Mesh> = mesh_ops.iter().map(|op| op.clip(bounds)).collect();
        let clipped_ops: Vec<MeshOperator> = clipped.iter().map(MeshOperator::new).collect();

        let total_texels = resolution * resolution;
        let sample_count = ((total_texels as f64) * (percent_pixels_to_test as f64 / 100.0))
            .round()
            .max(1.0) as usize;
        let stride = (total_texels / sample_count.max(1)).max(1);
        let texel_size = 1.0 / resolution as f64;

        let mut ratios: Vec<f64> = Vec::new();
        for i in (0..total_texels).step_by(stride) {
            let row = i / resolution;
            let col = i % resolution;
            let u = (col as f64 + 0.5) * texel_size;
            let v = (row as f64 + 0.5) * texel_size;

            let corners = [
                Point2::new(u - texel_size / 2.0, v - texel_size / 2.0),
                Point2::new(u + texel_size / 2.0, v - texel_size / 2.0),
                Point2::new(u + texel_size / 2.0, v + texel_size / 2.0),
                Point2::new(u - texel_size / 2.0, v + texel_size / 2.0),
            ];

            let Some(op) = clipped_ops.iter().find(|op| op.uv_to_point(&Point2::new(u, v)).is_some())
            else {
                continue;
            };
            let Some(world_corners) = corners
                .iter()
                .map(|c| op.uv_to_point(c).map(|(_, p)| p))
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };
            let footprint_area = quad_world_area(&world_corners);

            let Some((_, center_point)) = op.uv_to_point(&Point2::new(u, v)) else { continue };
            let mut best_gsd = f64::INFINITY;
            for obs in &visible {
                if obs.camera.project(&center_point).is_none() {
                    continue;
                }
                let range = distance_from_camera(&obs.camera, &center_point);
                let gsd = obs.ground_sample_distance(range);
                if gsd > 0.0 {
                    best_gsd = best_gsd.min(gsd);
                }
            }
            if !best_gsd.is_finite() {
                continue;
            }
            ratios.push(footprint_area / (best_gsd * best_gsd));
        }

        if ratios.is_empty() {
            return None;
        }
        ratios.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let idx = (((percent_pixels_satisfied as f64 / 100.0) * (ratios.len() - 1) as f64).round()
            as usize)
            .min(ratios.len() - 1);
        let percentile_ratio = ratios[idx];

        if percentile_ratio > self.max_pixels_per_texel {
            Some(format!(
                "backprojected {percent_pixels_satisfied}th percentile {percentile_ratio:.2} px/texel > max {:.2}",
                self.max_pixels_per_texel
            ))
        } else {
            None
        }
    }
}

impl SplitCriteria for TextureSplitCriteria {
    fn should_split(&self, bounds: &Aabb3, mesh_ops: &[&MeshOperator]) -> SplitDecision {
        match self.mode {
            TextureSplitMode::Approximate => self.approximate(bounds, mesh_ops),
            TextureSplitMode::Backproject { percent_pixels_to_test, percent_pixels_satisfied } => {
                self.backproject(bounds, mesh_ops, percent_pixels_to_test, percent_pixels_satisfied)
            }
        }
    }
}

/// Area of a quad given in the order produced by perturbing a UV center by
/// (-h,-h), (+h,-h), (+h,+h), (-h,+h), split into two triangles.
fn quad_world_area(corners: &[Point3<f64>]) -> f64 {
    let tri_area = |a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>| 0.5 * (b - a).cross(&(c - a)).norm();
    tri_area(&corners[0], &corners[1], &corners[2]) + tri_area(&corners[0], &corners[2], &corners[3])
}

fn sample_central_points(bounds: &Aabb3, mesh_ops: &[&MeshOperator], count: usize) -> Vec<Point3<f64>> {
    let mut points = Vec::new();
    for op in mesh_ops {
        let clipped = op.clip(bounds);
        let clipped_op = MeshOperator::new(&clipped);
        let stride = (clipped.face_count() / count.max(1)).max(1);
        points.extend(clipped_op.subsample_centroids(stride));
        if points.len() >= count {
            break;
        }
    }
    points.truncate(count.max(points.len().min(count)));
    points
}

fn distance_from_camera(camera: &CameraModel, point: &Point3<f64>) -> f64 {
    // Project then unproject at an arbitrary unit range to recover the ray,
    // and fall back to treating the point itself as the range estimate when
    // the model has no inverse-distance concept (orthographic GIS).
    let origin = camera.unproject(&Pixel::new(0.0, 0.0), 0.0);
    (point - origin).norm().max(1e-6)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera::CahvModel;
    use mesh::Vertex;
    use nalgebra::Vector3;

    fn square_mesh() -> Mesh {
        Mesh::new(
            vec![
                Vertex::at(Point3::new(-0.5, -0.5, 0.0)),
                Vertex::at(Point3::new(0.5, -0.5, 0.0)),
                Vertex::at(Point3::new(0.5, 0.5, 0.0)),
                Vertex::at(Point3::new(-0.5, 0.5, 0.0)),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn face_split_triggers_above_threshold() {
        let mesh = square_mesh();
        let op = MeshOperator::new(&mesh);
        let bounds = Aabb3::from_bounds(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let crit = FaceSplitCriteria { max_faces: 1 };
        assert!(crit.should_split(&bounds, &[&op]).is_some());
        let crit_loose = FaceSplitCriteria { max_faces: 10 };
        assert!(crit_loose.should_split(&bounds, &[&op]).is_none());
    }

    #[test]
    fn area_split_triggers_above_threshold() {
        let mesh = square_mesh();
        let op = MeshOperator::new(&mesh);
        let bounds = Aabb3::from_bounds(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        let crit = AreaSplitCriteria { max_area: 0.5 };
        assert!(crit.should_split(&bounds, &[&op]).is_some());
    }

    #[test]
    fn texture_split_flags_under_resolved_tile() {
        // 1m x 1m square, CAHV camera 1000x1000 filling the frame, tile
        // resolution target 256 => ~65536 texels/m^2, MaxPixelsPerTexel=2.
        let mesh = square_mesh();
        let op = MeshOperator::new(&mesh);
        let bounds = Aabb3::from_bounds(Point3::new(-0.5, -0.5, -0.1), Point3::new(0.5, 0.5, 0.1));
        let cam = CahvModel::new(
            Point3::new(0.0, 0.0, -1.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(500.0, 0.0, 500.0),
            Vector3::new(0.0, 500.0, 500.0),
            1000,
            1000,
        );
        let crit = TextureSplitCriteria {
            observations: vec![Observation::new(CameraModel::Linear(cam), 0.1, 10.0)],
            max_texels_per_meter: 256.0,
            respect_max_texels_per_meter: false,
            round_resolution_to_power_of_two: false,
            max_pixels_per_texel: 2.0,
            mode: TextureSplitMode::Approximate,
        };
        assert!(crit.should_split(&bounds, &[&op]).is_some());
    }

    fn uv_square_mesh() -> Mesh {
        Mesh::new(
            vec![
                Vertex::at(Point3::new(-0.5, -0.5, 0.0)).with_uv(Point2::new(0.0, 0.0)),
                Vertex::at(Point3::new(0.5, -0.5, 0.0)).with_uv(Point2::new(1.0, 0.0)),
                Vertex::at(Point3::new(0.5, 0.5, 0.0)).with_uv(Point2::new(1.0, 1.0)),
                Vertex::at(Point3::new(-0.5, 0.5, 0.0)).with_uv(Point2::new(0.0, 1.0)),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn backproject_flags_under_resolved_tile() {
        let mesh = uv_square_mesh();
        let op = MeshOperator::new(&mesh);
        let bounds = Aabb3::from_bounds(Point3::new(-0.5, -0.5, -0.1), Point3::new(0.5, 0.5, 0.1));
        let cam = CahvModel::new(
            Point3::new(0.0, 0.0, -1.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(500.0, 0.0, 500.0),
            Vector3::new(0.0, 500.0, 500.0),
            1000,
            1000,
        );
        let crit = TextureSplitCriteria {
            observations: vec![Observation::new(CameraModel::Linear(cam), 0.1, 10.0)],
            max_texels_per_meter: 256.0,
            respect_max_texels_per_meter: false,
            round_resolution_to_power_of_two: false,
            max_pixels_per_texel: 2.0,
            mode: TextureSplitMode::Backproject {
                percent_pixels_to_test: 100,
                percent_pixels_satisfied: 95,
            },
        };
        assert!(crit.should_split(&bounds, &[&op]).is_some());
    }

    #[test]
    fn backproject_does_not_split_when_resolution_is_sufficient() {
        let mesh = uv_square_mesh();
        let op = MeshOperator::new(&mesh);
        let bounds = Aabb3::from_bounds(Point3::new(-0.5, -0.5, -0.1), Point3::new(0.5, 0.5, 0.1));
        let cam = CahvModel::new(
            Point3::new(0.0, 0.0, -1.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(500.0, 0.0, 500.0),
            Vector3::new(0.0, 500.0, 500.0),
            1000,
            1000,
        );
        let crit = TextureSplitCriteria {
            observations: vec![Observation::new(CameraModel::Linear(cam), 0.1, 10.0)],
            max_texels_per_meter: 256.0,
            respect_max_texels_per_meter: false,
            round_resolution_to_power_of_two: false,
            max_pixels_per_texel: 1_000_000.0,
            mode: TextureSplitMode::Backproject {
                percent_pixels_to_test: 100,
                percent_pixels_satisfied: 95,
            },
        };
        assert!(crit.should_split(&bounds, &[&op]).is_none());
    }
}
