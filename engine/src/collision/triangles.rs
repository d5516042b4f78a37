//! Collision triangles
//!
//! Each triangle caches a basis so a point test is one matrix multiply:
//! `reverse` has columns `(b - a, c - a, n)` and maps triangle coordinates
//! `(u, v, z)` to world offsets from `a`; `forward` is its inverse. A point
//! touches the triangle when `u >= 0`, `v >= 0`, `u + v <= 1` and `z` lies in
//! the thin slab just below the surface.

use std::ops::Range;

use glam::{Mat3, Vec3};

use crate::error::GeometryError;
use crate::ground::GroundModelId;

/// Triangles with a shorter normal than this are rejected.
pub const DEGENERATE_EPSILON: f32 = 1e-6;

/// A registered collision triangle.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionTri {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    /// World offset from `a` to triangle coordinates
    pub forward: Mat3,
    /// Triangle coordinates to world offset from `a`
    pub reverse: Mat3,
    /// Padded bounds used by the broad phase
    pub aab_min: Vec3,
    pub aab_max: Vec3,
    pub gm: GroundModelId,
    pub enabled: bool,
}

impl CollisionTri {
    /// Build a triangle with its bounds padded by `skin` on every side.
    pub fn new(a: Vec3, b: Vec3, c: Vec3, gm: GroundModelId, skin: f32) -> Result<Self, GeometryError> {
        let bx = b - a;
        let by = c - a;
        let bz = bx.cross(by);
        let normal_length = bz.length();
        if !(normal_length > DEGENERATE_EPSILON) {
            return Err(GeometryError::DegenerateTriangle { normal_length });
        }

        let reverse = Mat3::from_cols(bx, by, bz / normal_length);
        let forward = reverse.inverse();

        Ok(Self {
            a,
            b,
            c,
            forward,
            reverse,
            aab_min: a.min(b).min(c) - skin,
            aab_max: a.max(b).max(c) + skin,
            gm,
            enabled: true,
        })
    }

    /// Unit normal, following the `(b - a) x (c - a)` winding.
    pub fn normal(&self) -> Vec3 {
        self.reverse * Vec3::Z
    }

    /// World point to triangle coordinates `(u, v, z)`.
    pub fn to_local(&self, p: Vec3) -> Vec3 {
        self.forward * (p - self.a)
    }

    /// Triangle coordinates back to a world point.
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.reverse * local + self.a
    }

    /// Inclusive test against the padded bounds.
    pub fn in_bounds(&self, p: Vec3) -> bool {
        p.cmpge(self.aab_min).all() && p.cmple(self.aab_max).all()
    }

    /// Whether `(x, z)` lies inside the padded bounds footprint.
    pub fn covers_xz(&self, x: f32, z: f32) -> bool {
        x >= self.aab_min.x && x <= self.aab_max.x && z >= self.aab_min.z && z <= self.aab_max.z
    }

    /// Slab contact test. Returns the triangle coordinates of `p` when it
    /// projects inside the triangle and lies within `slab` below the surface.
    pub fn slab_contact(&self, p: Vec3, slab: f32) -> Option<Vec3> {
        let local = self.to_local(p);
        let inside = local.x >= 0.0 && local.y >= 0.0 && local.x + local.y <= 1.0;
        (inside && local.z < 0.0 && local.z > -slab).then_some(local)
    }
}

/// A group of triangles registered together.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionMesh {
    pub name: String,
    pub tris: Range<usize>,
    pub gm: GroundModelId,
    pub enabled: bool,
}

/// Append-only triangle and mesh storage.
#[derive(Debug, Clone, Default)]
pub struct CollisionTriStore {
    tris: Vec<CollisionTri>,
    meshes: Vec<CollisionMesh>,
}

impl CollisionTriStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tri: CollisionTri, limit: usize) -> Result<usize, GeometryError> {
        if self.tris.len() >= limit {
            return Err(GeometryError::TooManyTriangles { limit });
        }
        self.tris.push(tri);
        Ok(self.tris.len() - 1)
    }

    /// Record a mesh covering `tris`.
    pub fn push_mesh(&mut self, mesh: CollisionMesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&CollisionTri> {
        self.tris.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut CollisionTri> {
        self.tris.get_mut(index)
    }

    pub fn mesh(&self, index: usize) -> Option<&CollisionMesh> {
        self.meshes.get(index)
    }

    pub fn meshes(&self) -> &[CollisionMesh] {
        &self.meshes
    }

    /// Enable or disable a mesh and every triangle in it.
    pub fn set_mesh_enabled(&mut self, index: usize, enabled: bool) -> bool {
        let Some(mesh) = self.meshes.get_mut(index) else {
            return false;
        };
        mesh.enabled = enabled;
        let range = mesh.tris.clone();
        for tri in &mut self.tris[range] {
            tri.enabled = enabled;
        }
        true
    }

    pub fn len(&self) -> usize {
        self.tris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tris.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollisionTri> {
        self.tris.iter()
    }

    pub fn clear(&mut self) {
        self.tris.clear();
        self.meshes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gm() -> GroundModelId {
        GroundModelId(0)
    }

    /// Horizontal triangle with a +Y normal.
    fn floor_tri() -> CollisionTri {
        CollisionTri::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 0.0),
            gm(),
            0.1,
        )
        .unwrap()
    }

    #[test]
    fn test_basis_inverse() {
        let tri = CollisionTri::new(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(4.0, 2.5, 3.0),
            Vec3::new(1.5, 3.0, 7.0),
            gm(),
            0.1,
        )
        .unwrap();
        assert!((tri.forward * tri.reverse).abs_diff_eq(Mat3::IDENTITY, 1e-5));
        assert!((tri.reverse * tri.forward).abs_diff_eq(Mat3::IDENTITY, 1e-5));
    }

    #[test]
    fn test_normal_follows_winding() {
        assert!((floor_tri().normal() - Vec3::Y).length() < 1e-6);
        let flipped = CollisionTri::new(Vec3::ZERO, Vec3::X, Vec3::Z, gm(), 0.1).unwrap();
        assert!((flipped.normal() - Vec3::NEG_Y).length() < 1e-6);
    }

    #[test]
    fn test_degenerate_rejected() {
        let err = CollisionTri::new(Vec3::ZERO, Vec3::X, Vec3::X * 2.0, gm(), 0.1).unwrap_err();
        assert!(matches!(err, GeometryError::DegenerateTriangle { .. }));
    }

    #[test]
    fn test_slab_contact() {
        let tri = floor_tri();
        // (u, v) follow (b - a, c - a): u along +Z, v along +X
        let local = tri.slab_contact(Vec3::new(0.25, -0.02, 0.25), 0.1).unwrap();
        assert!((local - Vec3::new(0.25, 0.25, -0.02)).length() < 1e-6);

        // above the surface
        assert!(tri.slab_contact(Vec3::new(0.25, 0.02, 0.25), 0.1).is_none());
        // too deep
        assert!(tri.slab_contact(Vec3::new(0.25, -0.2, 0.25), 0.1).is_none());
        // outside the triangle
        assert!(tri.slab_contact(Vec3::new(0.8, -0.02, 0.8), 0.1).is_none());
    }

    #[test]
    fn test_bounds_skin() {
        let tri = floor_tri();
        assert_eq!(tri.aab_min, Vec3::new(-0.1, -0.1, -0.1));
        assert_eq!(tri.aab_max, Vec3::new(1.1, 0.1, 1.1));
        assert!(tri.in_bounds(Vec3::new(1.05, 0.0, 0.0)));
        assert!(tri.covers_xz(-0.05, 1.05));
        assert!(!tri.covers_xz(-0.2, 0.5));
    }

    #[test]
    fn test_mesh_toggle() {
        let mut store = CollisionTriStore::new();
        for _ in 0..3 {
            store.push(floor_tri(), 100).unwrap();
        }
        let mesh = store.push_mesh(CollisionMesh {
            name: "ramp".into(),
            tris: 1..3,
            gm: gm(),
            enabled: true,
        });
        assert!(store.set_mesh_enabled(mesh, false));
        assert!(store.get(0).unwrap().enabled);
        assert!(!store.get(1).unwrap().enabled);
        assert!(!store.get(2).unwrap().enabled);
        assert!(!store.set_mesh_enabled(7, false));
    }
}
