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
use crate::{Ray, Sphere};
use nalgebra::{Point3, Vector3};

pub fn sphere_vs_ray(sphere: &Sphere, ray: &Ray<f64>) -> Option<Point3<f64>> {
    let ray2sphere: Vector3<f64> = ray.origin() - sphere.center();
    let a = ray.direction().dot(ray.direction());
    let b = 2.0 * ray.direction().dot(&ray2sphere);
    let c = ray2sphere.dot(&ray2sphere) - sphere.radius() * sphere.radius();

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let (x0, x1) = if discriminant == 0.0 {
        let x0 = -0.5 * b / a;
        (x0, x0)
    } else {
        let q = if b > 0.0 {
            -0.5 * (b + discriminant.sqrt())
        } else {
            -0.5 * (b - discriminant.sqrt())
        };
        (q / a, c / q)
    };
    let mut t = x0.min(x1);
    // One negative: maybe inside sphere or behind.
    if t < 0.0 {
        t = x0.max(x1);
    }
    // Both negative: sphere is behind us.
    if t < 0.0 {
        return None;
    }

    Some(ray.origin() + (ray.direction() * t))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ray_sphere_basic() {
        let sphere = Sphere::from_center_and_radius(&Point3::new(0.0, 0.0, 10.0), 1.0);
        let ray = Ray::new(Point3::origin(), Vector3::z_axis().into_inner());
        let hit = sphere_vs_ray(&sphere, &ray);
        assert!(hit.is_some());
        let p = hit.unwrap();
        assert!(p.x.abs() < 1e-9);
        assert!(p.y.abs() < 1e-9);
        assert!((p.z - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_ray_sphere_miss() {
        let sphere = Sphere::from_center_and_radius(&Point3::new(100.0, 0.0, 10.0), 1.0);
        let ray = Ray::new(Point3::origin(), Vector3::z_axis().into_inner());
        assert!(sphere_vs_ray(&sphere, &ray).is_none());
    }
}
