//! Physics nodes and actors as seen by the collision code
//!
//! The vehicle simulation owns the real nodes; contacts only read the fields
//! below and write back the force accumulator and the collision feedback
//! used for sound and particle effects.

use glam::Vec3;

use crate::collision::events::ActorEventCache;
use crate::ground::GroundModelId;

/// Index of a node inside its actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// Simulation-wide actor id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorId(pub u32);

/// What an actor is driven as; event filters gate on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActorKind {
    #[default]
    NotDriveable,
    Truck,
    Airplane,
    Boat,
    Machine,
}

/// Point mass at a contact.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// World position
    pub position: Vec3,
    pub velocity: Vec3,
    /// Force accumulator for the current step
    pub forces: Vec3,
    /// kg
    pub mass: f32,
    /// Per-node friction multiplier
    pub friction_coef: f32,
    /// Buoyant volume multiplier for fluid ground
    pub volume_coef: f32,
    /// Drag surface multiplier for fluid ground
    pub surface_coef: f32,

    /// Surface of the latest contact
    pub last_collision_gm: Option<GroundModelId>,
    /// Slip velocity of the latest solid contact
    pub last_collision_slip: Vec3,
    /// Normal reaction of the latest solid contact
    pub last_collision_force: Vec3,
    /// Exponential moving average of slip speed
    pub avg_collision_slip: f32,
}

impl Node {
    pub fn new(id: NodeId, position: Vec3, mass: f32) -> Self {
        Self {
            id,
            position,
            velocity: Vec3::ZERO,
            forces: Vec3::ZERO,
            mass,
            friction_coef: 1.0,
            volume_coef: 1.0,
            surface_coef: 1.0,
            last_collision_gm: None,
            last_collision_slip: Vec3::ZERO,
            last_collision_force: Vec3::ZERO,
            avg_collision_slip: 0.0,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_forces(mut self, forces: Vec3) -> Self {
        self.forces = forces;
        self
    }
}

/// The actor a node belongs to, with its event box residency.
#[derive(Debug, Clone, Default)]
pub struct ActorContext {
    pub id: Option<ActorId>,
    pub kind: ActorKind,
    pub events: ActorEventCache,
}

impl ActorContext {
    pub fn new(id: ActorId, kind: ActorKind) -> Self {
        Self {
            id: Some(id),
            kind,
            events: ActorEventCache::default(),
        }
    }

    /// Start a physics tick: last tick's residency becomes the reference.
    pub fn begin_tick(&mut self) {
        self.events.begin_tick();
    }
}
