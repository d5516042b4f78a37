//! Terrain Collisions Engine
//!
//! Static collision geometry of a driving-simulation terrain: boxes and
//! triangle meshes in a cell hash, point correction for characters, contact
//! forces for physics nodes, ground models with Stribeck friction and fluid
//! layers, script event boxes and hull buoyancy.
//!
//! # Modules
//!
//! - [`collision`] - spatial hash, boxes, triangles, events and the [`CollisionService`]
//! - [`ground`] - ground model config and registry
//! - [`physics`] - nodes, contact solver, buoyancy
//! - [`world`] - grid layout and heightfield/wave/landuse adapters
//! - [`terrain`] - JSON terrain object loading
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use terrain_collisions_engine::{CollisionConfig, CollisionService, FlatHeightfield, GroundModelRegistry};
//! use terrain_collisions_engine::physics::Vec3;
//!
//! let registry = Arc::new(GroundModelRegistry::builtin()?);
//! let mut service = CollisionService::new(CollisionConfig::default(), registry, Arc::new(FlatHeightfield::new(0.0)))?;
//! terrain_collisions_engine::terrain::load_terrain_objects(&mut service, &std::fs::read_to_string("objects.json")?)?;
//!
//! let mut pos = Vec3::new(10.0, 0.5, 10.0);
//! service.correct_static_collision(&mut pos, true, None);
//! ```

pub mod collision;
pub mod error;
pub mod ground;
pub mod physics;
pub mod terrain;
pub mod world;

pub use collision::{BoxDef, CollisionConfig, CollisionService, EventDef, EventFilter, Ray};
pub use error::{ConfigError, EventError, GeometryError};
pub use ground::{GroundModel, GroundModelId, GroundModelRegistry};
pub use physics::{ActorContext, ActorKind, ContactSolver, Node, NodeId};
pub use world::{FlatHeightfield, GridConfig, GridHeightfield, HeightfieldAdapter, LanduseAdapter, WaveAdapter};
