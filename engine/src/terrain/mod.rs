//! Terrain loading
//!
//! Feeds the collision service from the terrain's object stream.

pub mod objects;

pub use objects::{
    LoadReport, MeshDef, TerrainObject, TerrainObjects, load_terrain_objects, load_terrain_objects_file,
    register_terrain_objects,
};
