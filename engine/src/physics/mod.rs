//! Contact physics
//!
//! Force models evaluated where a node touches static geometry, terrain or
//! water. The vehicle integrator lives elsewhere; these functions only add
//! to a node's force accumulator.
//!
//! # Unit System
//!
//! **1 unit = 1 meter** (SI units throughout)
//!
//! - Velocities in m/s
//! - Forces in N
//! - Mass in kg
//! - Densities in kg/m³
//!
//! # Submodules
//!
//! - [`types`] - glam re-exports and Euler helpers
//! - [`node`] - the node and actor view used by contacts
//! - [`contact`] - fluid film, normal reaction and Stribeck friction
//! - [`buoyancy`] - hull pressure and drag against the water surface

pub mod buoyancy;
pub mod contact;
pub mod node;
pub mod types;

pub use buoyancy::{BuoyancyEvaluator, BuoyancyMode};
pub use contact::{ContactInput, ContactResponse, ContactSolver, FrictionRegime};
pub use node::{ActorContext, ActorId, ActorKind, Node, NodeId};
pub use types::{Mat3, Quat, Vec3, euler_xyz_degrees};
