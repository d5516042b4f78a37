//! Contact force model
//!
//! Turns a penetration of a node into a surface into a force increment.
//! Three parts compose by summation:
//!
//! 1. **Fluid film** - power-law viscous drag plus buoyancy, active while
//!    the surface has a fluid layer (`solid_ground_level > 0`) and the node
//!    is at or below its top.
//! 2. **Normal reaction** - cancels the normal force and removes the impact
//!    velocity once the node reaches solid ground.
//! 3. **Friction** - static (smoothed) below the adhesion velocity while the
//!    tangential load fits in the static cone, Stribeck otherwise:
//!
//! ```text
//! mu = mc + (ms - mc) * exp(-(s / vs)^alpha)
//! F_friction = -(mu + min(t2 * s, 5)) * Gn * slip_dir
//! ```
//!
//! The solver is a pure function of its inputs; [`ContactSolver::apply`]
//! adds the write-back to a [`Node`].

use glam::Vec3;

use super::node::Node;
use crate::ground::{GroundModel, GroundModelId};

/// Cap on the hydrodynamic friction term.
const MAX_HYDRODYNAMIC: f32 = 5.0;
/// Smoothing weight of the slip moving average.
const SLIP_EMA_KEEP: f32 = 0.995;
/// Squared speeds below this give no viscous drag.
const MIN_FLUID_SPEED_SQ: f32 = 1e-12;

/// Inputs of one contact evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactInput {
    pub velocity: Vec3,
    /// Forces accumulated so far this step
    pub forces: Vec3,
    pub mass: f32,
    /// Unit outward surface normal
    pub normal: Vec3,
    pub dt: f32,
    /// Depth below the surface top; 0 for box and triangle contacts
    pub penetration: f32,
    pub friction_coef: f32,
    pub volume_coef: f32,
    pub surface_coef: f32,
}

impl ContactInput {
    /// Contact input from a node's current state.
    pub fn from_node(node: &Node, normal: Vec3, dt: f32, penetration: f32) -> Self {
        Self {
            velocity: node.velocity,
            forces: node.forces,
            mass: node.mass,
            normal,
            dt,
            penetration,
            friction_coef: node.friction_coef,
            volume_coef: node.volume_coef,
            surface_coef: node.surface_coef,
        }
    }
}

/// Which friction law produced the tangential force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrictionRegime {
    /// No solid contact, or no positive reaction
    #[default]
    None,
    Static,
    Stribeck,
}

/// Result of one contact evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContactResponse {
    /// Increment to add to the node's force accumulator
    pub force: Vec3,
    /// Whether the fluid film contributed
    pub fluid: bool,
    /// Whether the node reached solid ground
    pub solid: bool,
    pub regime: FrictionRegime,
    /// Normal reaction magnitude (before clamping to zero)
    pub reaction: f32,
    /// Tangential slip speed
    pub slip_speed: f32,
    /// Unit slip direction (zero when not slipping)
    pub slip_dir: Vec3,
}

/// Per-node friction and fluid force model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactSolver {
    /// Gravity magnitude (m/s²) used for fluid buoyancy
    pub gravity: f32,
}

impl Default for ContactSolver {
    fn default() -> Self {
        Self {
            gravity: crate::collision::config::DEFAULT_GRAVITY,
        }
    }
}

impl ContactSolver {
    pub fn new(gravity: f32) -> Self {
        Self { gravity }
    }

    /// Evaluate the contact force increment.
    pub fn solve(&self, input: &ContactInput, gm: &GroundModel) -> ContactResponse {
        let n = input.normal;
        let v = input.velocity;
        let d = input.penetration;
        let vn = v.dot(n);

        let mut response = ContactResponse::default();
        // running force: accumulated forces plus what this contact added
        let mut force = input.forces;

        if gm.solid_ground_level > 0.0 && d >= 0.0 {
            response.fluid = true;
            let v2 = v.length_squared();
            let viscosity = if v2 > MIN_FLUID_SPEED_SQ {
                gm.flow_consistency_index * v2.powf((gm.flow_behavior_index - 1.0) * 0.5)
            } else {
                0.0
            };

            let mut drag = v * (-viscosity * input.surface_coef);
            if gm.drag_anisotropy < 1.0 && vn > 0.0 {
                let va2 = gm.va * gm.va;
                let factor = if va2 > 0.0 { (v2 / va2).clamp(0.0, 1.0) } else { 1.0 };
                drag += n * (vn * viscosity * (1.0 - gm.drag_anisotropy) * factor);
            }
            force += drag;

            // Pseudoplastic fluids only hold a node up, never push it out
            let mut buoyancy = gm.fluid_density * d * self.gravity * input.volume_coef;
            if gm.flow_behavior_index < 1.0 && vn >= 0.0 {
                let fn_now = force.dot(n);
                if fn_now < 0.0 && buoyancy > -fn_now {
                    buoyancy = -fn_now;
                }
            }
            force += n * buoyancy;
        }

        if d >= gm.solid_ground_level {
            response.solid = true;
            let fnormal = force.dot(n);
            let mut reaction = -fnormal;
            if vn < 0.0 && input.dt > 0.0 {
                reaction += -(0.8 * vn + 0.2 * (gm.solid_ground_level - d) / input.dt) * input.mass / input.dt;
            }
            response.reaction = reaction;

            let slip = v - n * vn;
            let slip_speed = slip.length();
            let slip_dir = slip.normalize_or_zero();
            response.slip_speed = slip_speed;
            response.slip_dir = slip_dir;

            if reaction > 0.0 {
                let gn = reaction * gm.strength * input.friction_coef;
                let static_limit = gm.ms * gn;
                let tangential = force - n * fnormal;

                if slip_speed < gm.va && tangential.length_squared() <= static_limit * static_limit {
                    response.regime = FrictionRegime::Static;
                    let ff = -static_limit * (1.0 - (-slip_speed / gm.va).exp());
                    force += n * reaction - tangential + slip_dir * ff;
                } else {
                    response.regime = FrictionRegime::Stribeck;
                    let stribeck = if gm.vs > 0.0 {
                        (-(slip_speed / gm.vs).powf(gm.alpha)).exp()
                    } else {
                        0.0
                    };
                    let mu = gm.mc + (gm.ms - gm.mc) * stribeck;
                    let ff = -(mu + (gm.t2 * slip_speed).min(MAX_HYDRODYNAMIC)) * gn;
                    force += n * reaction + slip_dir * ff;
                }
            }
        }

        response.force = force - input.forces;
        response
    }

    /// Solve for a node and write the result back: force accumulator and
    /// last surface always; slip feedback and the slip moving average only
    /// while the ground pushes back.
    pub fn apply(
        &self,
        node: &mut Node,
        normal: Vec3,
        dt: f32,
        penetration: f32,
        gm_id: GroundModelId,
        gm: &GroundModel,
    ) -> ContactResponse {
        let response = self.solve(&ContactInput::from_node(node, normal, dt, penetration), gm);
        node.forces += response.force;
        node.last_collision_gm = Some(gm_id);
        if response.regime != FrictionRegime::None {
            node.avg_collision_slip =
                SLIP_EMA_KEEP * node.avg_collision_slip + (1.0 - SLIP_EMA_KEEP) * response.slip_speed;
            node.last_collision_slip = response.slip_dir * response.slip_speed;
            node.last_collision_force = normal * (-response.reaction).min(0.0);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concrete() -> GroundModel {
        let mut gm = GroundModel::new("concrete");
        gm.va = 5.0;
        gm.ms = 2.0;
        gm.mc = 1.0;
        gm.t2 = 0.01;
        gm.vs = 0.9;
        gm
    }

    fn input(velocity: Vec3, forces: Vec3) -> ContactInput {
        ContactInput {
            velocity,
            forces,
            mass: 10.0,
            normal: Vec3::Y,
            dt: 0.0005,
            penetration: 0.0,
            friction_coef: 1.0,
            volume_coef: 1.0,
            surface_coef: 1.0,
        }
    }

    #[test]
    fn test_zero_when_not_touching() {
        let solver = ContactSolver::default();
        let mut gm = concrete();
        gm.solid_ground_level = 0.5;
        let mut inp = input(Vec3::ZERO, Vec3::ZERO);
        inp.penetration = -0.1;
        let r = solver.solve(&inp, &gm);
        assert_eq!(r.force, Vec3::ZERO);
        assert!(!r.fluid && !r.solid);
    }

    #[test]
    fn test_resting_node_static() {
        let solver = ContactSolver::default();
        // resting on the ground under gravity
        let r = solver.solve(&input(Vec3::ZERO, Vec3::new(0.0, -98.07, 0.0)), &concrete());
        assert_eq!(r.regime, FrictionRegime::Static);
        assert!((r.force - Vec3::new(0.0, 98.07, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_static_cancels_small_tangential_load() {
        let solver = ContactSolver::default();
        let r = solver.solve(&input(Vec3::ZERO, Vec3::new(10.0, -100.0, 0.0)), &concrete());
        assert_eq!(r.regime, FrictionRegime::Static);
        let total = Vec3::new(10.0, -100.0, 0.0) + r.force;
        assert!(total.length() < 1e-3, "net force {total:?}");
    }

    #[test]
    fn test_sliding_stribeck() {
        let solver = ContactSolver::default();
        let gm = concrete();
        let speed = 10.0;
        let r = solver.solve(&input(Vec3::new(speed, 0.0, 0.0), Vec3::new(0.0, -100.0, 0.0)), &gm);
        assert_eq!(r.regime, FrictionRegime::Stribeck);
        let mu = gm.mc + (gm.ms - gm.mc) * (-(speed / gm.vs).powf(gm.alpha)).exp();
        let expected_friction = -(mu + (gm.t2 * speed).min(5.0)) * 100.0;
        assert!((r.force.x - expected_friction).abs() < 1e-3);
        assert!((r.force.y - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_impact_adds_reaction() {
        let solver = ContactSolver::default();
        let inp = input(Vec3::new(0.0, -1.0, 0.0), Vec3::ZERO);
        let r = solver.solve(&inp, &concrete());
        // -(0.8 * -1) * m / dt
        let expected = 0.8 * inp.mass / inp.dt;
        assert!((r.reaction - expected).abs() / expected < 1e-5);
    }

    #[test]
    fn test_separating_node_gets_no_reaction() {
        let solver = ContactSolver::default();
        let r = solver.solve(&input(Vec3::new(3.0, 1.0, 0.0), Vec3::new(0.0, 50.0, 0.0)), &concrete());
        assert!(r.solid);
        assert_eq!(r.regime, FrictionRegime::None);
        assert_eq!(r.force, Vec3::ZERO);
    }

    #[test]
    fn test_fluid_buoyancy_and_drag() {
        let solver = ContactSolver::new(9.807);
        let mut gm = concrete();
        gm.solid_ground_level = 1.0;
        gm.fluid_density = 1000.0;
        gm.flow_consistency_index = 10.0;
        gm.flow_behavior_index = 1.0;
        gm.drag_anisotropy = 1.0;

        let mut inp = input(Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO);
        inp.penetration = 0.5;
        let r = solver.solve(&inp, &gm);
        assert!(r.fluid);
        assert!(!r.solid, "fluid layer not crossed");
        assert!((r.force.x + 20.0).abs() < 1e-4, "newtonian drag -k*v");
        assert!((r.force.y - 1000.0 * 0.5 * 9.807).abs() < 1e-2);
    }

    #[test]
    fn test_pseudoplastic_buoyancy_cap() {
        let solver = ContactSolver::default();
        let mut gm = concrete();
        gm.solid_ground_level = 1.0;
        gm.fluid_density = 1000.0;
        gm.flow_behavior_index = 0.5;
        let mut inp = input(Vec3::ZERO, Vec3::new(0.0, -10.0, 0.0));
        inp.penetration = 0.5;
        let r = solver.solve(&inp, &gm);
        // only cancels the existing downward force
        assert!((r.force.y - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_zero_stribeck_velocity_is_finite() {
        let solver = ContactSolver::default();
        let mut gm = concrete();
        gm.vs = 0.0;
        let r = solver.solve(&input(Vec3::new(8.0, 0.0, 0.0), Vec3::new(0.0, -100.0, 0.0)), &gm);
        assert!(r.force.is_finite());
        assert!((r.force.x + (gm.mc + 0.08) * 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_apply_writes_back() {
        let solver = ContactSolver::default();
        let mut node = Node::new(crate::physics::node::NodeId(0), Vec3::ZERO, 10.0)
            .with_velocity(Vec3::new(10.0, 0.0, 0.0))
            .with_forces(Vec3::new(0.0, -100.0, 0.0));
        let gm_id = GroundModelId(3);
        solver.apply(&mut node, Vec3::Y, 0.001, 0.0, gm_id, &concrete());
        assert_eq!(node.last_collision_gm, Some(gm_id));
        assert!((node.last_collision_slip - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-5);
        assert!((node.avg_collision_slip - 0.05).abs() < 1e-5);
        assert!((node.last_collision_force - Vec3::new(0.0, -100.0, 0.0)).length() < 1e-3);
        assert!(node.forces.y.abs() < 1e-3, "reaction cancels the load");
    }

    #[test]
    fn test_separating_node_keeps_slip_feedback() {
        let solver = ContactSolver::default();
        let mut node = Node::new(crate::physics::node::NodeId(0), Vec3::ZERO, 10.0)
            .with_velocity(Vec3::new(10.0, 0.0, 0.0))
            .with_forces(Vec3::new(0.0, -100.0, 0.0));
        solver.apply(&mut node, Vec3::Y, 0.001, 0.0, GroundModelId(0), &concrete());
        let (slip, avg, force) = (node.last_collision_slip, node.avg_collision_slip, node.last_collision_force);

        // lifting off: the accumulated load points away from the ground
        node.velocity = Vec3::new(4.0, 1.0, 0.0);
        node.forces = Vec3::new(0.0, 50.0, 0.0);
        let r = solver.apply(&mut node, Vec3::Y, 0.001, 0.0, GroundModelId(1), &concrete());
        assert!(r.solid);
        assert!(r.reaction <= 0.0);
        assert_eq!(node.last_collision_slip, slip);
        assert_eq!(node.avg_collision_slip, avg);
        assert_eq!(node.last_collision_force, force);
        assert_eq!(node.last_collision_gm, Some(GroundModelId(1)));
    }
}
