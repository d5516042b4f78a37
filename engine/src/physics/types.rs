//! Physics type re-exports from glam
//!
//! This module provides the core mathematical types used throughout
//! the collision and contact code, re-exported from the glam library,
//! plus the Euler convention used by terrain configs.

pub use glam::{Mat3, Quat, Vec3};

/// Rotation from Euler angles in degrees, composed as `Qx * Qy * Qz`.
pub fn euler_xyz_degrees(angles: Vec3) -> Quat {
    Quat::from_rotation_x(angles.x.to_radians())
        * Quat::from_rotation_y(angles.y.to_radians())
        * Quat::from_rotation_z(angles.z.to_radians())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euler_single_axis() {
        let q = euler_xyz_degrees(Vec3::new(0.0, 90.0, 0.0));
        let v = q * Vec3::X;
        assert!((v - Vec3::NEG_Z).length() < 1e-6, "got {v:?}");
    }

    #[test]
    fn test_euler_composition_order() {
        let angles = Vec3::new(30.0, 45.0, 60.0);
        let expected = Quat::from_rotation_x(30f32.to_radians())
            * Quat::from_rotation_y(45f32.to_radians())
            * Quat::from_rotation_z(60f32.to_radians());
        assert!(euler_xyz_degrees(angles).abs_diff_eq(expected, 1e-6));
    }
}
