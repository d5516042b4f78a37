//! Collision Tests - Point Correction, Triangle Contacts and Probes
//!
//! Scenario tests for the collision service: nearest-face snapping on
//! plain and rotated boxes, triangle slab contacts, height probes and ray
//! casts, plus the hash and transform invariants.

use std::sync::Arc;

use glam::{Mat3, Quat, Vec3};
use terrain_collisions_engine::collision::spatial_hash::ElementRef;
use terrain_collisions_engine::collision::{BoxDef, CollisionConfig, CollisionService, Ray};
use terrain_collisions_engine::physics::{Node, NodeId};
use terrain_collisions_engine::world::{FlatHeightfield, GridConfig, GridHeightfield, HeightfieldAdapter, cell_id};
use terrain_collisions_engine::GroundModelRegistry;

fn small_config() -> CollisionConfig {
    CollisionConfig {
        grid: GridConfig::new(2.0, 12),
        ..Default::default()
    }
}

fn service_with(heightfield: Arc<dyn HeightfieldAdapter>) -> CollisionService {
    let registry = Arc::new(GroundModelRegistry::builtin().expect("builtin ground models"));
    CollisionService::new(small_config(), registry, heightfield).expect("service")
}

fn service() -> CollisionService {
    service_with(Arc::new(FlatHeightfield::new(0.0)))
}

fn unit_box(center: Vec3) -> BoxDef {
    BoxDef::new(center, Vec3::splat(-0.5), Vec3::splat(0.5))
}

/// Number of local components lying on a face of the box.
fn faces_touched(local: Vec3, lo: Vec3, hi: Vec3) -> usize {
    (0..3)
        .filter(|&i| (local[i] - lo[i]).abs() < 1e-5 || (local[i] - hi[i]).abs() < 1e-5)
        .count()
}

// ============================================================================
// Boxes
// ============================================================================

#[test]
fn test_axis_aligned_box_pushes_through_bottom() {
    let mut svc = service();
    svc.add_collision_box(&unit_box(Vec3::new(0.0, 0.5, 0.0))).unwrap();

    let mut p = Vec3::new(0.3, 0.2, 0.0);
    assert!(svc.correct_static_collision(&mut p, false, None));
    assert!((p - Vec3::new(0.3, 0.0, 0.0)).length() < 1e-6, "got {p:?}");
}

#[test]
fn test_rotated_box_snaps_to_one_face() {
    let mut svc = service();
    let def = unit_box(Vec3::new(0.0, 0.5, 0.0)).with_rotation(Vec3::new(0.0, 45.0, 0.0));
    let index = svc.add_collision_box(&def).unwrap();
    let cbox = svc.collision_box(index).unwrap().clone();

    let mut p = Vec3::new(0.0, 0.5, 0.0);
    assert!(cbox.contains(p).is_some());
    assert!(svc.correct_static_collision(&mut p, false, None));

    let local = cbox.to_local(p);
    assert_eq!(faces_touched(local, cbox.lo_local, cbox.hi_local), 1, "local {local:?}");
}

#[test]
fn test_self_rotated_box_snaps_to_one_face() {
    let mut svc = service();
    let def = BoxDef::new(Vec3::new(10.0, 0.0, 10.0), Vec3::new(-1.0, 0.0, -2.0), Vec3::new(1.0, 1.0, 2.0))
        .with_rotation(Vec3::new(0.0, 30.0, 0.0))
        .with_self_rotation(Vec3::new(0.0, 0.0, 20.0));
    let index = svc.add_collision_box(&def).unwrap();
    let cbox = svc.collision_box(index).unwrap().clone();

    let mut p = cbox.to_world(Vec3::new(0.7, 0.5, 0.2));
    assert!(svc.correct_static_collision(&mut p, false, None));
    let local = cbox.to_local(p);
    assert_eq!(faces_touched(local, cbox.lo_local, cbox.hi_local), 1);
    // +X was the nearest face
    assert!((local.x - cbox.hi_local.x).abs() < 1e-4);
}

#[test]
fn test_correction_is_idempotent() {
    let mut svc = service();
    svc.add_collision_box(&unit_box(Vec3::new(6.0, 0.5, 6.0))).unwrap();

    let mut p = Vec3::new(6.1, 0.6, 5.9);
    assert!(svc.correct_static_collision(&mut p, false, None));
    let once = p;
    assert!(!svc.correct_static_collision(&mut p, false, None));
    assert_eq!(p, once);
}

#[test]
fn test_rotated_correction_settles() {
    let mut svc = service();
    svc.add_collision_box(&unit_box(Vec3::new(6.0, 0.5, 6.0)).with_rotation(Vec3::new(0.0, 20.0, 0.0)))
        .unwrap();

    let mut p = Vec3::new(6.1, 0.6, 5.9);
    assert!(svc.correct_static_collision(&mut p, false, None));
    let once = p;
    svc.correct_static_collision(&mut p, false, None);
    assert!((p - once).length() < 1e-5);
}

#[test]
fn test_box_rotation_inverse_identity() {
    let mut svc = service();
    let index = svc
        .add_collision_box(
            &unit_box(Vec3::new(4.0, 0.0, 4.0))
                .with_rotation(Vec3::new(12.0, 34.0, 56.0))
                .with_self_rotation(Vec3::new(-7.0, 8.0, 9.0)),
        )
        .unwrap();
    let cbox = svc.collision_box(index).unwrap();
    assert!((cbox.outer_unrot() * cbox.outer_rot()).abs_diff_eq(Quat::IDENTITY, 1e-6));
    assert!((cbox.inner_unrot() * cbox.inner_rot()).abs_diff_eq(Quat::IDENTITY, 1e-6));
}

#[test]
fn test_box_registered_once_per_covered_cell() {
    let mut svc = service();
    let def = BoxDef::new(Vec3::new(9.0, 0.0, 9.0), Vec3::splat(-3.0), Vec3::splat(3.0))
        .with_rotation(Vec3::new(0.0, 30.0, 0.0));
    let index = svc.add_collision_box(&def).unwrap();
    let cbox = svc.collision_box(index).unwrap().clone();
    let grid = svc.config().grid;

    for (cx, cz) in grid.cell_cover(cbox.lo_world, cbox.hi_world).iter() {
        let entries: Vec<_> = svc
            .spatial_hash()
            .lookup(cx, cz)
            .entries()
            .iter()
            .filter(|e| e.element() == ElementRef::Box(index) && e.cell_id == cell_id(cx, cz))
            .collect();
        assert_eq!(entries.len(), 1, "cell ({cx}, {cz})");
    }
}

// ============================================================================
// Triangles
// ============================================================================

#[test]
fn test_triangle_contact_uses_its_ground_model() {
    let mut svc = service();
    let concrete = svc.ground_models().lookup("concrete").unwrap();
    // A, C, B winding gives a +Y normal
    svc.add_collision_tri(Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0), concrete)
        .unwrap();

    let tri = svc.collision_tri(0).unwrap();
    let local = tri.slab_contact(Vec3::new(0.25, -0.02, 0.25), 0.1).unwrap();
    assert!((local - Vec3::new(0.25, 0.25, -0.02)).length() < 1e-6);
    assert!((tri.normal() - Vec3::Y).length() < 1e-6);

    let mut node = Node::new(NodeId(0), Vec3::new(0.25, -0.02, 0.25), 1.0)
        .with_velocity(Vec3::new(20.0, 0.0, 0.0))
        .with_forces(Vec3::new(0.0, -100.0, 0.0));
    assert!(svc.compute_node_contact(&mut node, 0.001, None));
    assert_eq!(node.last_collision_gm, Some(concrete));

    let gm = svc.ground_models().get(concrete).unwrap();
    let mu = gm.mc + (gm.ms - gm.mc) * (-(20.0f32 / gm.vs).powf(gm.alpha)).exp();
    let expected = -(mu + (gm.t2 * 20.0).min(5.0)) * 100.0 * gm.strength;
    assert!((node.forces.x - expected).abs() < 1e-2, "friction {}", node.forces.x);
    assert!(node.forces.y.abs() < 1e-3, "normal reaction cancels the load");
}

#[test]
fn test_triangle_basis_inverse_identity() {
    let mut svc = service();
    let gm = svc.default_solid();
    svc.add_collision_tri(Vec3::new(3.0, 1.0, 3.0), Vec3::new(5.0, 1.5, 3.5), Vec3::new(3.5, 2.0, 6.0), gm)
        .unwrap();
    let tri = svc.collision_tri(0).unwrap();
    assert!((tri.reverse * tri.forward).abs_diff_eq(Mat3::IDENTITY, 1e-5));
}

#[test]
fn test_point_snapped_onto_triangle() {
    let mut svc = service();
    let gm = svc.default_solid();
    svc.add_collision_tri(Vec3::new(4.0, 1.0, 4.0), Vec3::new(4.0, 1.0, 8.0), Vec3::new(8.0, 1.0, 4.0), gm)
        .unwrap();

    let mut p = Vec3::new(5.0, 0.95, 5.0);
    assert!(svc.correct_static_collision(&mut p, false, None));
    assert!((p - Vec3::new(5.0, 1.0, 5.0)).length() < 1e-5);

    // below the slab
    let mut deep = Vec3::new(5.0, 0.8, 5.0);
    assert!(!svc.correct_static_collision(&mut deep, false, None));
}

#[test]
fn test_shallowest_triangle_wins() {
    let mut svc = service();
    let asphalt = svc.ground_models().lookup("asphalt").unwrap();
    let ice = svc.ground_models().lookup("ice").unwrap();
    let (a, b, c) = (Vec3::new(4.0, 1.0, 4.0), Vec3::new(4.0, 1.0, 8.0), Vec3::new(8.0, 1.0, 4.0));
    svc.add_collision_tri(a, b, c, asphalt).unwrap();
    let up = Vec3::Y * 0.05;
    svc.add_collision_tri(a + up, b + up, c + up, ice).unwrap();

    let mut node = Node::new(NodeId(0), Vec3::new(5.0, 0.98, 5.0), 1.0);
    assert!(svc.compute_node_contact(&mut node, 0.001, None));
    assert_eq!(node.last_collision_gm, Some(asphalt));
}

#[test]
fn test_disabled_mesh_has_no_contact() {
    let mut svc = service();
    let gm = svc.default_solid();
    let vertices = [Vec3::ZERO, Vec3::new(0.0, 0.0, 4.0), Vec3::new(4.0, 0.0, 0.0)];
    let insert = svc
        .add_collision_mesh("pad", &vertices, &[0, 1, 2], Vec3::new(4.0, 1.0, 4.0), Quat::IDENTITY, Vec3::ONE, gm)
        .unwrap();
    assert!(svc.set_mesh_enabled(insert.mesh, false));

    let mut p = Vec3::new(5.0, 0.95, 5.0);
    assert!(!svc.correct_static_collision(&mut p, false, None));
    assert!(svc.set_mesh_enabled(insert.mesh, true));
    assert!(svc.correct_static_collision(&mut p, false, None));
}

#[test]
fn test_box_and_flush_triangle_both_react() {
    let mut svc = service();
    // box top at y = 0, ice triangle lying on it
    svc.add_collision_box(&BoxDef::new(
        Vec3::new(5.0, -0.5, 5.0),
        Vec3::new(-1.0, -0.5, -1.0),
        Vec3::new(1.0, 0.5, 1.0),
    ))
    .unwrap();
    let ice = svc.ground_models().lookup("ice").unwrap();
    svc.add_collision_tri(Vec3::new(4.0, 0.0, 4.0), Vec3::new(4.0, 0.0, 7.0), Vec3::new(7.0, 0.0, 4.0), ice)
        .unwrap();

    // resting load: the box reaction cancels it, the triangle sees nothing left
    let mut resting = Node::new(NodeId(0), Vec3::new(5.0, -0.02, 5.0), 10.0).with_forces(Vec3::new(0.0, -100.0, 0.0));
    assert!(svc.compute_node_contact(&mut resting, 0.001, None));
    assert!(resting.forces.length() < 1e-3, "got {:?}", resting.forces);
    // triangle applied last
    assert_eq!(resting.last_collision_gm, Some(ice));

    // impact: removed once by the box, not again by the triangle
    let mut falling = Node::new(NodeId(1), Vec3::new(5.0, -0.02, 5.0), 1.0).with_velocity(Vec3::new(0.0, -1.0, 0.0));
    assert!(svc.compute_node_contact(&mut falling, 0.001, None));
    assert!((falling.forces.y - 800.0).abs() < 1e-1, "got {:?}", falling.forces);
    assert!(falling.forces.x.abs() < 1e-3 && falling.forces.z.abs() < 1e-3);
    assert_eq!(falling.last_collision_gm, Some(ice));
}

// ============================================================================
// Probes
// ============================================================================

#[test]
fn test_ray_hits_triangle_at_nine_tenths() {
    let mut svc = service();
    let gm = svc.default_solid();
    // covers (-1..1) x (-1..1) at y = 1
    svc.add_collision_tri(Vec3::new(-1.0, 1.0, -1.0), Vec3::new(-1.0, 1.0, 3.0), Vec3::new(3.0, 1.0, -1.0), gm)
        .unwrap();

    let ray = Ray::segment(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO);
    let t = svc.intersects_any_tri(&ray).expect("hit");
    assert!((t - 0.9).abs() < 1e-5);

    let short = Ray::segment(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, 5.0, 0.0));
    assert_eq!(svc.intersects_any_tri(&short), None);
}

#[test]
fn test_ray_across_cells_returns_nearest() {
    let mut svc = service();
    let gm = svc.default_solid();
    let wall = |x: f32| {
        (
            Vec3::new(x, 0.0, 0.0),
            Vec3::new(x, 4.0, 0.0),
            Vec3::new(x, 0.0, 20.0),
        )
    };
    let (a, b, c) = wall(15.0);
    svc.add_collision_tri(a, b, c, gm).unwrap();
    let (a, b, c) = wall(7.0);
    svc.add_collision_tri(a, b, c, gm).unwrap();

    let ray = Ray::segment(Vec3::new(1.0, 1.0, 5.0), Vec3::new(21.0, 1.0, 5.0));
    let t = svc.intersects_any_tri(&ray).expect("hit");
    assert!((t - 0.3).abs() < 1e-5);
}

#[test]
fn test_surface_height_never_below_terrain() {
    let terrain = GridHeightfield::from_fn((0.0, 0.0), 1.0, 64, 64, |x, z| 0.1 * x + 0.05 * z).unwrap();
    let terrain = Arc::new(terrain);
    let mut svc = service_with(terrain.clone());
    let gm = svc.default_solid();
    svc.add_collision_box(&BoxDef::new(Vec3::new(20.0, 2.0, 20.0), Vec3::splat(-2.0), Vec3::splat(2.0)))
        .unwrap();
    svc.add_collision_tri(Vec3::new(30.0, 1.0, 30.0), Vec3::new(30.0, 1.0, 40.0), Vec3::new(40.0, 1.0, 30.0), gm)
        .unwrap();

    for ix in 0..16 {
        for iz in 0..16 {
            let (x, z) = (ix as f32 * 3.3 + 0.5, iz as f32 * 3.1 + 0.5);
            let h = terrain.height_at(x, z);
            assert!(svc.surface_height(x, z) >= h, "({x}, {z})");
        }
    }
    assert!((svc.surface_height(20.0, 20.0) - 4.0).abs() < 1e-5);
}

#[test]
fn test_surface_height_below_ceiling_skips_bridge() {
    let mut svc = service();
    // deck from y = 5 to y = 5.5
    svc.add_collision_box(&BoxDef::new(
        Vec3::new(10.0, 5.0, 10.0),
        Vec3::new(-4.0, 0.0, -1.0),
        Vec3::new(4.0, 0.5, 1.0),
    ))
    .unwrap();
    assert!((svc.surface_height(10.0, 10.0) - 5.5).abs() < 1e-5);
    assert_eq!(svc.surface_height_below(10.0, 10.0, 2.0), 0.0);
}
