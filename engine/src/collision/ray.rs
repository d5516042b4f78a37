//! Ray intersection primitives
//!
//! Rays are `origin + t * direction`. Callers decide whether `direction` is
//! unit length (distance queries) or the full segment (parametric queries
//! where `t` in `[0, 1]` covers the segment).
//!
//! # Example
//!
//! ```ignore
//! use terrain_collisions_engine::collision::ray::{Ray, ray_triangle_intersect};
//! use glam::Vec3;
//!
//! let ray = Ray::new(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -10.0, 0.0));
//! let a = Vec3::new(-1.0, 1.0, -1.0);
//! let b = Vec3::new(-1.0, 1.0, 3.0);
//! let c = Vec3::new(3.0, 1.0, -1.0);
//! if let Some(t) = ray_triangle_intersect(&ray, a, b, c) {
//!     println!("hit at {:?}", ray.point_at(t)); // t = 0.9
//! }
//! ```

use glam::Vec3;

/// Determinant threshold below which a ray counts as parallel to a triangle.
const PARALLEL_EPSILON: f32 = 1e-8;

/// A ray or segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Segment from `from` to `to`; `t = 1` lands on `to`.
    pub fn segment(from: Vec3, to: Vec3) -> Self {
        Self {
            origin: from,
            direction: to - from,
        }
    }

    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Entry and exit parameters of a ray against an AABB (slab method).
///
/// Returns `Some((t_enter, t_exit))` when the infinite line crosses the box
/// and the exit lies at or after the origin. `t_enter` is negative when the
/// origin is inside the box.
pub fn ray_aabb_span(ray: &Ray, aabb_min: Vec3, aabb_max: Vec3) -> Option<(f32, f32)> {
    // Near-zero directions get a huge inverse so the slab is either always
    // or never crossed
    let inv = |d: f32| {
        if d.abs() > 1e-10 {
            1.0 / d
        } else {
            f32::MAX * if d.is_sign_negative() { -1.0 } else { 1.0 }
        }
    };
    let inv_dir = Vec3::new(inv(ray.direction.x), inv(ray.direction.y), inv(ray.direction.z));

    let t1 = (aabb_min - ray.origin) * inv_dir;
    let t2 = (aabb_max - ray.origin) * inv_dir;

    let t_min = t1.min(t2).max_element();
    let t_max = t1.max(t2).min_element();

    if t_max >= t_min && t_max >= 0.0 {
        Some((t_min, t_max))
    } else {
        None
    }
}

/// Two-sided ray/triangle test (Möller-Trumbore).
///
/// Returns the ray parameter `t >= 0` of the hit. Rays parallel to the
/// triangle plane never hit.
pub fn ray_triangle_intersect(ray: &Ray, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let e1 = b - a;
    let e2 = c - a;
    let p = ray.direction.cross(e2);
    let det = e1.dot(p);
    if det.abs() < PARALLEL_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    let s = ray.origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(e1);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(q) * inv_det;
    (t >= 0.0).then_some(t)
}
