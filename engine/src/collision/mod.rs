//! Static collision
//!
//! Boxes and triangles registered once per terrain, indexed by a cell hash
//! and queried every physics tick.
//!
//! # Submodules
//!
//! - [`config`] - grid, slab and skin tunables
//! - [`spatial_hash`] - cell hash with per-bucket max height
//! - [`boxes`] - oriented boxes, event filters, nearest-face snapping
//! - [`triangles`] - triangles with cached bases, meshes
//! - [`events`] - event sources and handler dispatch
//! - [`ray`] - ray/AABB and ray/triangle tests
//! - [`service`] - the [`CollisionService`] facade

pub mod boxes;
pub mod config;
pub mod events;
pub mod ray;
pub mod service;
pub mod spatial_hash;
pub mod triangles;

pub use boxes::{BoxDef, CollisionBox, CollisionBoxStore, EventDef, EventFilter};
pub use config::CollisionConfig;
pub use events::{ActorEventCache, EventBoxRegistry, EventContext, EventHandler, EventSource};
pub use ray::{Ray, ray_aabb_span, ray_triangle_intersect};
pub use service::{CollisionService, MeshInsert, ServiceStats};
pub use spatial_hash::{ElementRef, HashStats, SpatialHash};
pub use triangles::{CollisionMesh, CollisionTri, CollisionTriStore};
