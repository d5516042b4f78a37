//! Hull buoyancy
//!
//! Hulls are triangle soups. Each triangle is clipped against the water
//! height at its centroid; every submerged piece gets
//!
//! - a pressure force: the volume of the prism between the piece and its
//!   vertices pushed along the normal by `rho * g * depth`, closed by eight
//!   tetrahedra around the prism centroid
//! - a drag force `-C * S * |v_rel|² * |cos(aoa)| * n`, signed against the
//!   relative flow, with `v_rel = v - wave velocity`

use glam::Vec3;

use crate::world::adapters::WaveAdapter;

/// Water density times gravity (N/m³).
const PRESSURE_PER_METER: f32 = 9810.0;
/// Hull drag coefficient.
const DRAG_COEF: f32 = 500.0;
/// Triangles with a smaller doubled area produce no force.
const MIN_SURFACE: f32 = 1e-5;
/// Relative speeds at or below this produce no drag.
const MIN_DRAG_SPEED: f32 = 0.01;

/// Which force components are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuoyancyMode {
    /// Pressure and drag
    #[default]
    Normal,
    /// Pressure only
    Dragless,
    /// Drag only
    DragOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuoyancyEvaluator {
    pub mode: BuoyancyMode,
    /// Flooded hull: the pressure term is dropped
    pub sink: bool,
}

/// Signed volume of the tetrahedron `o, a, b, c`.
fn tetra_volume(o: Vec3, a: Vec3, b: Vec3, c: Vec3) -> f32 {
    (a - o).dot((b - o).cross(c - o)) / 6.0
}

/// Point on the edge `from -> to` at water height `h`.
fn cut(from: Vec3, to: Vec3, h: f32) -> Vec3 {
    from + (to - from) * ((h - from.y) / (to.y - from.y))
}

impl BuoyancyEvaluator {
    pub fn new(mode: BuoyancyMode) -> Self {
        Self { mode, sink: false }
    }

    pub fn with_sink(mut self, sink: bool) -> Self {
        self.sink = sink;
        self
    }

    /// Pressure and drag on a triangle, clipped at the water line.
    pub fn compute_pressure_force(&self, a: Vec3, b: Vec3, c: Vec3, vel: Vec3, wave: &dyn WaveAdapter, t: f32) -> Vec3 {
        let h = wave.height_at((a + b + c) / 3.0, t);
        let above = [a.y > h, b.y > h, c.y > h];
        let below = [a.y < h, b.y < h, c.y < h];

        match (above, below) {
            ([true, true, true], _) => Vec3::ZERO,
            ([false, false, false], _) => self.submerged_force(a, b, c, vel, wave, t),
            // one vertex under water
            ([false, true, true], [true, false, false]) => {
                self.submerged_force(a, cut(a, b, h), cut(a, c, h), vel, wave, t)
            }
            ([true, false, true], [false, true, false]) => {
                self.submerged_force(b, cut(b, c, h), cut(b, a, h), vel, wave, t)
            }
            ([true, true, false], [false, false, true]) => {
                self.submerged_force(c, cut(c, a, h), cut(c, b, h), vel, wave, t)
            }
            // two vertices under water: split the quad
            ([true, false, false], [false, true, true]) => {
                let (tb, tc) = (cut(a, b, h), cut(a, c, h));
                self.submerged_force(tb, b, tc, vel, wave, t) + self.submerged_force(tc, b, c, vel, wave, t)
            }
            ([false, true, false], [true, false, true]) => {
                let (tc, ta) = (cut(b, c, h), cut(b, a, h));
                self.submerged_force(tc, c, ta, vel, wave, t) + self.submerged_force(ta, c, a, vel, wave, t)
            }
            ([false, false, true], [true, true, false]) => {
                let (ta, tb) = (cut(c, a, h), cut(c, b, h));
                self.submerged_force(ta, a, tb, vel, wave, t) + self.submerged_force(tb, a, b, vel, wave, t)
            }
            // vertices exactly on the water line
            _ => Vec3::ZERO,
        }
    }

    /// Force on a fully submerged triangle.
    fn submerged_force(&self, a: Vec3, b: Vec3, c: Vec3, vel: Vec3, wave: &dyn WaveAdapter, t: f32) -> Vec3 {
        let cross = (b - a).cross(c - a);
        let doubled = cross.length();
        if doubled < MIN_SURFACE {
            return Vec3::ZERO;
        }
        let normal = cross / doubled;
        let surface = doubled * 0.5;

        let mut volume = 0.0;
        if self.mode != BuoyancyMode::DragOnly {
            let push = |p: Vec3| p + normal * ((wave.height_at(p, t) - p.y) * PRESSURE_PER_METER);
            let (ap, bp, cp) = (push(a), push(b), push(c));
            let centroid = (a + b + c + ap + bp + cp) / 6.0;
            volume = [
                (a, b, c),
                (a, ap, bp),
                (a, bp, b),
                (b, bp, cp),
                (b, cp, c),
                (c, cp, ap),
                (c, ap, a),
                (ap, cp, bp),
            ]
            .iter()
            .map(|&(p, q, r)| tetra_volume(centroid, p, q, r))
            .sum();
        }

        let mut drag = Vec3::ZERO;
        if self.mode != BuoyancyMode::Dragless {
            let rel = vel - wave.velocity_at((a + b + c) / 3.0, t);
            let speed = rel.length();
            if speed > MIN_DRAG_SPEED {
                let cos_aoa = normal.dot(rel / speed);
                drag = normal * (-DRAG_COEF * surface * speed * speed * cos_aoa.abs());
                if cos_aoa < 0.0 {
                    drag = -drag;
                }
            }
        }

        if self.sink {
            return drag;
        }
        normal * volume + drag
    }

    /// Per-node forces of a hull triangle: the triangle force split evenly
    /// over its three nodes. Zero when every node is above the water.
    pub fn compute_node_forces(&self, positions: [Vec3; 3], velocities: [Vec3; 3], wave: &dyn WaveAdapter, t: f32) -> [Vec3; 3] {
        if positions.iter().all(|&p| p.y > wave.height_at(p, t)) {
            return [Vec3::ZERO; 3];
        }
        let vel = (velocities[0] + velocities[1] + velocities[2]) / 3.0;
        let [a, b, c] = positions;
        let share = self.compute_pressure_force(a, b, c, vel, wave, t) / 3.0;
        [share; 3]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::adapters::StillWater;

    /// Flat triangle at depth 1 with a -Y normal (hull bottom).
    fn bottom() -> (Vec3, Vec3, Vec3) {
        (Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, -1.0, 0.0), Vec3::new(0.0, -1.0, 1.0))
    }

    /// Flat water with a uniform surface velocity.
    struct Current(Vec3);

    impl WaveAdapter for Current {
        fn height_at(&self, _pos: Vec3, _t: f32) -> f32 {
            0.0
        }

        fn velocity_at(&self, _pos: Vec3, _t: f32) -> Vec3 {
            self.0
        }
    }

    #[test]
    fn test_submerged_bottom_floats() {
        let (a, b, c) = bottom();
        let water = StillWater::new(0.0);
        let force = BuoyancyEvaluator::default().compute_pressure_force(a, b, c, Vec3::ZERO, &water, 0.0);
        // rho * g * depth * area = 9810 * 1 * 0.5
        assert!((force.y - 4905.0).abs() < 1.0, "got {force:?}");
        assert!(force.x.abs() < 1e-2 && force.z.abs() < 1e-2);
    }

    #[test]
    fn test_emerged_triangle_has_no_force() {
        let (a, b, c) = bottom();
        let lift = Vec3::Y * 2.0;
        let water = StillWater::new(0.0);
        let force = BuoyancyEvaluator::default().compute_pressure_force(a + lift, b + lift, c + lift, Vec3::Y, &water, 0.0);
        assert_eq!(force, Vec3::ZERO);
    }

    #[test]
    fn test_partial_submersion_is_smaller() {
        let water = StillWater::new(0.0);
        let eval = BuoyancyEvaluator::new(BuoyancyMode::Dragless);
        // vertical triangle straddling the surface
        let a = Vec3::new(0.0, -1.0, 0.0);
        let b = Vec3::new(1.0, 1.0, 0.0);
        let c = Vec3::new(0.0, 1.0, 0.0);
        let full = eval.compute_pressure_force(a - Vec3::Y * 2.0, b - Vec3::Y * 2.0, c - Vec3::Y * 2.0, Vec3::ZERO, &water, 0.0);
        let partial = eval.compute_pressure_force(a, b, c, Vec3::ZERO, &water, 0.0);
        assert!(partial.length() > 0.0);
        assert!(partial.length() < full.length());
    }

    #[test]
    fn test_drag_opposes_motion() {
        let (a, b, c) = bottom();
        let water = StillWater::new(0.0);
        let eval = BuoyancyEvaluator::new(BuoyancyMode::DragOnly);
        // moving down into the water, normal points down
        let force = eval.compute_pressure_force(a, b, c, Vec3::new(0.0, -2.0, 0.0), &water, 0.0);
        assert!((force.y - 500.0 * 0.5 * 4.0).abs() < 1e-2, "got {force:?}");
        let force = eval.compute_pressure_force(a, b, c, Vec3::new(0.0, 2.0, 0.0), &water, 0.0);
        assert!((force.y + 1000.0).abs() < 1e-2);
    }

    #[test]
    fn test_drag_uses_relative_velocity() {
        let (a, b, c) = bottom();
        let eval = BuoyancyEvaluator::new(BuoyancyMode::DragOnly);
        let current = Current(Vec3::new(0.0, -2.0, 0.0));
        let force = eval.compute_pressure_force(a, b, c, Vec3::new(0.0, -2.0, 0.0), &current, 0.0);
        assert_eq!(force, Vec3::ZERO);
    }

    #[test]
    fn test_sink_drops_pressure() {
        let (a, b, c) = bottom();
        let water = StillWater::new(0.0);
        let force = BuoyancyEvaluator::default()
            .with_sink(true)
            .compute_pressure_force(a, b, c, Vec3::ZERO, &water, 0.0);
        assert_eq!(force, Vec3::ZERO);
    }

    #[test]
    fn test_node_forces_split_evenly() {
        let (a, b, c) = bottom();
        let water = StillWater::new(0.0);
        let eval = BuoyancyEvaluator::new(BuoyancyMode::Dragless);
        let forces = eval.compute_node_forces([a, b, c], [Vec3::ZERO; 3], &water, 0.0);
        assert_eq!(forces[0], forces[1]);
        assert_eq!(forces[1], forces[2]);
        assert!((forces[0].y * 3.0 - 4905.0).abs() < 1.0);

        let dry = eval.compute_node_forces([a + Vec3::Y * 5.0, b + Vec3::Y * 5.0, c + Vec3::Y * 5.0], [Vec3::ZERO; 3], &water, 0.0);
        assert_eq!(dry, [Vec3::ZERO; 3]);
    }
}
