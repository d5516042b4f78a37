//! Terrain object stream
//!
//! Static collision geometry arrives as a JSON document listing boxes and
//! meshes:
//!
//! ```json
//! { "objects": [
//!     { "kind": "box", "position": [10, 0, 10], "lo": [-1, 0, -1], "hi": [1, 2, 1] },
//!     { "kind": "mesh", "name": "ramp", "ground_model": "asphalt",
//!       "vertices": [[0, 0, 0], [0, 0, 4], [4, 1, 0]], "indices": [0, 1, 2] }
//! ] }
//! ```
//!
//! Mesh vertices are already decoded by the caller; this module only places
//! them and resolves ground model names.

use std::path::Path;

use glam::Vec3;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::collision::boxes::BoxDef;
use crate::collision::service::CollisionService;
use crate::error::ConfigError;
use crate::physics::types::euler_xyz_degrees;

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

/// Triangle mesh placed in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshDef {
    pub name: String,
    #[serde(default)]
    pub position: Vec3,
    /// Euler degrees
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
    /// Surface of every triangle; the default solid model when absent
    #[serde(default)]
    pub ground_model: Option<String>,
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
}

/// One record of the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TerrainObject {
    Box(BoxDef),
    Mesh(MeshDef),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerrainObjects {
    #[serde(default)]
    pub objects: Vec<TerrainObject>,
}

impl TerrainObjects {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// What a load registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub boxes: usize,
    pub meshes: usize,
    pub tris: usize,
    /// Degenerate mesh triangles dropped
    pub rejected_tris: usize,
    /// Objects dropped for invalid geometry
    pub skipped: usize,
    /// Meshes whose ground model fell back to the default solid
    pub substituted_models: usize,
}

/// Register every object of a parsed stream. Invalid objects are logged and
/// skipped; the load itself only fails on malformed input.
pub fn register_terrain_objects(service: &mut CollisionService, objects: &TerrainObjects) -> LoadReport {
    let mut report = LoadReport::default();

    for object in &objects.objects {
        match object {
            TerrainObject::Box(def) => match service.add_collision_box(def) {
                Ok(_) => report.boxes += 1,
                Err(e) => {
                    warn!("Skipping collision box at {}: {}", def.position, e);
                    report.skipped += 1;
                }
            },
            TerrainObject::Mesh(mesh) => {
                let fallback = service.default_solid();
                let gm = match mesh.ground_model.as_deref() {
                    Some(name) => match service.ground_models().lookup(name) {
                        Some(id) => id,
                        None => {
                            warn!("Mesh '{}': unknown ground model '{}', using default", mesh.name, name);
                            report.substituted_models += 1;
                            fallback
                        }
                    },
                    None => {
                        warn!("Mesh '{}': no ground model, using default", mesh.name);
                        report.substituted_models += 1;
                        fallback
                    }
                };

                let placed = service.add_collision_mesh(
                    &mesh.name,
                    &mesh.vertices,
                    &mesh.indices,
                    mesh.position,
                    euler_xyz_degrees(mesh.rotation),
                    mesh.scale,
                    gm,
                );
                match placed {
                    Ok(insert) => {
                        report.meshes += 1;
                        report.tris += insert.tris;
                        report.rejected_tris += insert.rejected;
                    }
                    Err(e) => {
                        warn!("Skipping mesh '{}': {}", mesh.name, e);
                        report.skipped += 1;
                    }
                }
            }
        }
    }

    info!(
        "Terrain objects: {} boxes, {} meshes ({} tris, {} rejected), {} skipped",
        report.boxes, report.meshes, report.tris, report.rejected_tris, report.skipped
    );
    report
}

/// Parse a JSON object stream and register it.
pub fn load_terrain_objects(service: &mut CollisionService, doc: &str) -> Result<LoadReport, ConfigError> {
    let objects = TerrainObjects::from_json_str(doc)?;
    Ok(register_terrain_objects(service, &objects))
}

/// Read, parse and register a JSON object stream file.
pub fn load_terrain_objects_file(service: &mut CollisionService, path: impl AsRef<Path>) -> Result<LoadReport, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    load_terrain_objects(service, &text)
}
