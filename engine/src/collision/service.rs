//! Static collision service
//!
//! Owns the spatial hash, the box and triangle stores and the event source
//! registry of one loaded terrain. Geometry is registered once at load time
//! (`&mut self`); every tick-time query takes `&self` and only touches the
//! event bookkeeping and the one-shot camera override, both behind locks.
//!
//! Per tick, for each node:
//! 1. [`CollisionService::correct_static_collision`] for characters and loose points
//! 2. [`CollisionService::compute_node_contact`] for actor nodes (boxes, then triangles)
//! 3. [`CollisionService::compute_ground_contact`] against the heightfield

use std::sync::Arc;

use glam::{Quat, Vec3};
use log::{debug, info, warn};
use parking_lot::Mutex;

use super::boxes::{BoxDef, CollisionBox, CollisionBoxStore};
use super::config::CollisionConfig;
use super::events::{EventBoxRegistry, EventHandler, EventSource};
use super::ray::{Ray, ray_aabb_span, ray_triangle_intersect};
use super::spatial_hash::{ElementRef, HashStats, SpatialHash, TRI_BASE_INDEX};
use super::triangles::{CollisionMesh, CollisionTri, CollisionTriStore};
use crate::error::{ConfigError, GeometryError};
use crate::ground::{GroundModel, GroundModelId, GroundModelRegistry};
use crate::physics::contact::ContactSolver;
use crate::physics::node::{ActorContext, ActorKind, Node};
use crate::physics::types::euler_xyz_degrees;
use crate::world::adapters::{HeightfieldAdapter, LanduseAdapter};
use crate::world::grid::cell_id;

/// Box indices must stay below the triangle tag of the hash encoding.
const MAX_BOXES: usize = TRI_BASE_INDEX as usize;
const MAX_TRIS: usize = (u32::MAX - TRI_BASE_INDEX) as usize;

/// Counts reported by [`CollisionService::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServiceStats {
    pub boxes: usize,
    pub tris: usize,
    pub meshes: usize,
    pub event_sources: usize,
    pub hash: HashStats,
}

/// Outcome of [`CollisionService::add_collision_mesh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshInsert {
    pub mesh: usize,
    /// Triangles registered
    pub tris: usize,
    /// Degenerate triangles skipped
    pub rejected: usize,
}

/// Best triangle hit while scanning a bucket.
#[derive(Clone, Copy)]
struct TriHit {
    index: usize,
    local: Vec3,
    depth: f32,
}

impl TriHit {
    /// Keep the shallowest contact; on an exact tie the later triangle wins.
    fn consider(best: &mut Option<TriHit>, index: usize, local: Vec3) {
        let depth = -local.z;
        if best.is_none_or(|b| depth <= b.depth) {
            *best = Some(TriHit { index, local, depth });
        }
    }
}

/// Static collision geometry of one terrain plus its queries.
pub struct CollisionService {
    config: CollisionConfig,
    hash: SpatialHash,
    boxes: CollisionBoxStore,
    tris: CollisionTriStore,
    events: EventBoxRegistry,
    ground_models: Arc<GroundModelRegistry>,
    heightfield: Arc<dyn HeightfieldAdapter>,
    landuse: Option<Arc<dyn LanduseAdapter>>,
    default_solid: GroundModelId,
    default_ground: GroundModelId,
    solver: ContactSolver,
    forced_camera: Mutex<Option<Vec3>>,
}

impl std::fmt::Debug for CollisionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionService")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl CollisionService {
    /// Create an empty service. Fails when the config is out of range or
    /// the registry lacks the default solid/ground models.
    pub fn new(
        config: CollisionConfig,
        ground_models: Arc<GroundModelRegistry>,
        heightfield: Arc<dyn HeightfieldAdapter>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let (default_solid, default_ground) = ground_models.require_defaults()?;
        info!(
            "Collision service: {} buckets, {}m cells, {} ground models",
            config.grid.hash_size(),
            config.grid.cell_size,
            ground_models.len()
        );

        Ok(Self {
            hash: SpatialHash::new(config.grid),
            boxes: CollisionBoxStore::new(),
            tris: CollisionTriStore::new(),
            events: EventBoxRegistry::new(),
            ground_models,
            heightfield,
            landuse: None,
            default_solid,
            default_ground,
            solver: ContactSolver::new(config.gravity),
            forced_camera: Mutex::new(None),
            config,
        })
    }

    /// Attach a landuse map for ground contacts.
    pub fn with_landuse(mut self, landuse: Arc<dyn LanduseAdapter>) -> Self {
        self.landuse = Some(landuse);
        self
    }

    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    pub fn ground_models(&self) -> &GroundModelRegistry {
        &self.ground_models
    }

    pub fn default_solid(&self) -> GroundModelId {
        self.default_solid
    }

    pub fn default_ground(&self) -> GroundModelId {
        self.default_ground
    }

    pub fn solver(&self) -> &ContactSolver {
        &self.solver
    }

    pub fn spatial_hash(&self) -> &SpatialHash {
        &self.hash
    }

    pub fn events(&self) -> &EventBoxRegistry {
        &self.events
    }

    pub fn collision_box(&self, index: usize) -> Option<&CollisionBox> {
        self.boxes.get(index)
    }

    pub fn collision_tri(&self, index: usize) -> Option<&CollisionTri> {
        self.tris.get(index)
    }

    pub fn mesh(&self, index: usize) -> Option<&CollisionMesh> {
        self.tris.mesh(index)
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register a box and, when it names an event, its event source.
    pub fn add_collision_box(&mut self, def: &BoxDef) -> Result<usize, GeometryError> {
        let cbox = CollisionBox::from_def(def)?;
        let range = self.config.grid.cell_cover(cbox.lo_world, cbox.hi_world);
        let top = cbox.hi_world.y;
        let index = self.boxes.push(cbox, MAX_BOXES)?;

        if let Some(event) = def.event.as_ref().filter(|e| !e.box_name.is_empty()) {
            let source = self.events.add(EventSource {
                box_name: event.box_name.clone(),
                instance_name: event.instance_name.clone(),
                direction: euler_xyz_degrees(event.direction),
                handler: event.handler,
                cbox: index,
            });
            if let Some(cbox) = self.boxes.get_mut(index) {
                cbox.event_source = Some(source);
            }
        }

        self.hash.insert_range(range, ElementRef::Box(index), top);
        Ok(index)
    }

    /// Register one triangle. Degenerate triangles are logged and rejected.
    pub fn add_collision_tri(&mut self, a: Vec3, b: Vec3, c: Vec3, gm: GroundModelId) -> Result<usize, GeometryError> {
        let tri = match CollisionTri::new(a, b, c, gm, self.config.tri_skin) {
            Ok(tri) => tri,
            Err(e) => {
                warn!("Rejected collision triangle {a} {b} {c}: {e}");
                return Err(e);
            }
        };
        let range = self.config.grid.cell_cover(tri.aab_min, tri.aab_max);
        let top = tri.aab_max.y;
        let index = self.tris.push(tri, MAX_TRIS)?;
        self.hash.insert_range(range, ElementRef::Tri(index), top);
        Ok(index)
    }

    /// Register an indexed triangle mesh placed at `position` with
    /// `orientation` and `scale`. Vertices map to `orientation * (v * scale) + position`.
    pub fn add_collision_mesh(
        &mut self,
        name: &str,
        vertices: &[Vec3],
        indices: &[u32],
        position: Vec3,
        orientation: Quat,
        scale: Vec3,
        gm: GroundModelId,
    ) -> Result<MeshInsert, GeometryError> {
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(GeometryError::IndexOutOfRange {
                index,
                vertex_count: vertices.len(),
            });
        }
        if indices.len() % 3 != 0 {
            warn!(
                "Mesh '{}': {} trailing indices ignored",
                name,
                indices.len() % 3
            );
        }

        let world: Vec<Vec3> = vertices.iter().map(|&v| orientation * (v * scale) + position).collect();
        let first = self.tris.len();
        let mut rejected = 0;
        for tri in indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| world[i as usize]);
            match self.add_collision_tri(a, b, c, gm) {
                Ok(_) => {}
                Err(GeometryError::DegenerateTriangle { .. }) => rejected += 1,
                Err(e) => return Err(e),
            }
        }

        let tris = first..self.tris.len();
        let count = tris.len();
        let mesh = self.tris.push_mesh(CollisionMesh {
            name: name.to_string(),
            tris,
            gm,
            enabled: true,
        });
        info!("Mesh '{name}': {count} collision tris ({rejected} rejected)");
        Ok(MeshInsert {
            mesh,
            tris: count,
            rejected,
        })
    }

    pub fn set_box_enabled(&mut self, index: usize, enabled: bool) -> bool {
        self.boxes.get_mut(index).map(|b| b.enabled = enabled).is_some()
    }

    pub fn set_tri_enabled(&mut self, index: usize, enabled: bool) -> bool {
        self.tris.get_mut(index).map(|t| t.enabled = enabled).is_some()
    }

    /// Toggle every triangle of a mesh at once.
    pub fn set_mesh_enabled(&mut self, index: usize, enabled: bool) -> bool {
        self.tris.set_mesh_enabled(index, enabled)
    }

    /// Install the script host that receives event box entries.
    pub fn set_event_handler(&self, handler: Box<dyn EventHandler>) {
        self.events.set_handler(handler);
    }

    /// Drop all geometry and event sources. The ground models and adapters
    /// are shared and stay untouched.
    pub fn clear(&mut self) {
        self.hash.clear();
        self.boxes.clear();
        self.tris.clear();
        self.events.clear();
        *self.forced_camera.get_mut() = None;
    }

    // ------------------------------------------------------------------
    // Tick-time contacts
    // ------------------------------------------------------------------

    fn force_camera(&self, cbox: &CollisionBox) {
        if let Some(pos) = cbox.camera_pos {
            let mut forced = self.forced_camera.lock();
            if forced.is_none() {
                *forced = Some(pos);
            }
        }
    }

    /// Push a character (or any loose point) out of solid geometry.
    ///
    /// `actor` is the kind of vehicle the player currently drives, if any;
    /// it gates event filters. Returns whether `pos` was moved.
    pub fn correct_static_collision(&self, pos: &mut Vec3, invoke_events: bool, actor: Option<ActorKind>) -> bool {
        let Some((cx, cz)) = self.config.grid.cell_of(pos.x, pos.z) else {
            return false;
        };
        let bucket = self.hash.lookup(cx, cz);
        if pos.y > bucket.max_height {
            return false;
        }

        let mut contacted = false;
        let mut fired = false;
        let mut best: Option<TriHit> = None;

        for element in bucket.elements_in(cell_id(cx, cz)) {
            match element {
                ElementRef::Box(index) => {
                    let Some(cbox) = self.boxes.get(index).filter(|b| b.enabled) else {
                        continue;
                    };
                    let Some(local) = cbox.contains(*pos) else {
                        continue;
                    };
                    if let Some(source) = cbox.event_source
                        && invoke_events
                        && cbox.event_filter.permits(actor)
                    {
                        self.events.dispatch_character(source, *pos);
                        fired = true;
                    }
                    self.force_camera(cbox);
                    if !cbox.virt {
                        contacted = true;
                        *pos = cbox.to_world(cbox.snap_to_nearest_face(local));
                    }
                }
                ElementRef::Tri(index) => {
                    let Some(tri) = self.tris.get(index).filter(|t| t.enabled) else {
                        continue;
                    };
                    if !tri.in_bounds(*pos) {
                        continue;
                    }
                    if let Some(local) = tri.slab_contact(*pos, self.config.slab_depth) {
                        TriHit::consider(&mut best, index, local);
                    }
                }
            }
        }

        if invoke_events {
            self.events.end_character_pass(fired);
        }

        if let Some(hit) = best
            && let Some(tri) = self.tris.get(hit.index)
        {
            contacted = true;
            *pos = tri.to_world(hit.local.with_z(0.0));
        }
        contacted
    }

    /// Contact forces of a node against boxes and triangles in its cell.
    ///
    /// Solid boxes react as the default solid model; the nearest triangle
    /// reacts with its own model. Both are applied when both touch.
    pub fn compute_node_contact(&self, node: &mut Node, dt: f32, mut actor: Option<&mut ActorContext>) -> bool {
        let p = node.position;
        let Some((cx, cz)) = self.config.grid.cell_of(p.x, p.z) else {
            return false;
        };
        let bucket = self.hash.lookup(cx, cz);
        if p.y > bucket.max_height {
            return false;
        }

        let mut contacted = false;
        let mut best: Option<TriHit> = None;

        for element in bucket.elements_in(cell_id(cx, cz)) {
            match element {
                ElementRef::Box(index) => {
                    let Some(cbox) = self.boxes.get(index).filter(|b| b.enabled) else {
                        continue;
                    };
                    let Some(local) = cbox.contains(p) else {
                        continue;
                    };
                    if let Some(source) = cbox.event_source
                        && let Some(ctx) = actor.as_deref_mut()
                        && cbox.event_filter.permits(Some(ctx.kind))
                    {
                        self.events.dispatch_actor(source, &mut ctx.events, ctx.id, node.id, p);
                    }
                    self.force_camera(cbox);
                    if !cbox.virt
                        && let Some((gm_id, gm)) = self.resolve_model(self.default_solid, self.default_solid)
                    {
                        contacted = true;
                        let normal = cbox.nearest_face_normal(local);
                        self.solver.apply(node, normal, dt, 0.0, gm_id, gm);
                    }
                }
                ElementRef::Tri(index) => {
                    let Some(tri) = self.tris.get(index).filter(|t| t.enabled) else {
                        continue;
                    };
                    if !tri.in_bounds(p) {
                        continue;
                    }
                    if let Some(local) = tri.slab_contact(p, self.config.slab_depth) {
                        TriHit::consider(&mut best, index, local);
                    }
                }
            }
        }

        if let Some(hit) = best
            && let Some(tri) = self.tris.get(hit.index)
            && let Some((gm_id, gm)) = self.resolve_model(tri.gm, self.default_solid)
        {
            contacted = true;
            self.solver.apply(node, tri.normal(), dt, 0.0, gm_id, gm);
        }
        contacted
    }

    /// Contact forces of a node against the terrain heightfield.
    pub fn compute_ground_contact(&self, node: &mut Node, dt: f32) -> bool {
        let p = node.position;
        let height = self.heightfield.height_at(p.x, p.z);
        if !(p.y < height) {
            return false;
        }
        let painted = self.landuse.as_ref().and_then(|l| l.ground_model_at(p.x, p.z));
        let Some((gm_id, gm)) = self.resolve_model(painted.unwrap_or(self.default_ground), self.default_ground) else {
            return false;
        };
        let normal = self.heightfield.normal_at(p.x, height, p.z);
        self.solver.apply(node, normal, dt, height - p.y, gm_id, gm);
        true
    }

    /// Model behind `id`, or behind `fallback` when `id` was not issued by
    /// this service's registry.
    fn resolve_model(&self, id: GroundModelId, fallback: GroundModelId) -> Option<(GroundModelId, &GroundModel)> {
        match self.ground_models.get(id) {
            Some(gm) => Some((id, gm)),
            None => {
                debug!("Ground model handle {:?} is not registered, using the default", id);
                self.ground_models.get(fallback).map(|gm| (fallback, gm))
            }
        }
    }

    /// Read and reset the camera position forced by a camera box.
    pub fn take_forced_camera(&self) -> Option<Vec3> {
        self.forced_camera.lock().take()
    }

    /// Forget which event boxes characters already triggered.
    pub fn clear_event_cache(&self) {
        self.events.clear_last_called();
    }

    // ------------------------------------------------------------------
    // Probes
    // ------------------------------------------------------------------

    /// Nearest hit of the segment `ray.origin .. ray.origin + ray.direction`
    /// with any enabled triangle, as a fraction `t` in `[0, 1]`.
    pub fn intersects_any_tri(&self, ray: &Ray) -> Option<f32> {
        let grid = &self.config.grid;
        let steps = ((ray.direction.length() / grid.cell_size) as usize).max(1);
        let mut last_slot = None;
        let mut nearest: Option<f32> = None;

        for i in 0..=steps {
            let p = ray.point_at(i as f32 / steps as f32);
            let Some((cx, cz)) = grid.cell_of(p.x, p.z) else {
                continue;
            };
            let slot = self.hash.slot_of(cell_id(cx, cz));
            if last_slot == Some(slot) {
                continue;
            }
            last_slot = Some(slot);

            for entry in self.hash.bucket(slot).entries() {
                let ElementRef::Tri(index) = entry.element() else {
                    continue;
                };
                let Some(tri) = self.tris.get(index).filter(|t| t.enabled) else {
                    continue;
                };
                if let Some(t) = ray_triangle_intersect(ray, tri.a, tri.b, tri.c)
                    && t <= 1.0
                    && nearest.is_none_or(|n| t < n)
                {
                    nearest = Some(t);
                }
            }
        }
        nearest
    }

    /// Highest walkable surface at `(x, z)`: terrain, solid boxes or triangles.
    pub fn surface_height(&self, x: f32, z: f32) -> f32 {
        self.surface_height_below(x, z, f32::INFINITY)
    }

    /// Highest surface at `(x, z)` not above `ceiling`.
    pub fn surface_height_below(&self, x: f32, z: f32, ceiling: f32) -> f32 {
        let mut height = self.heightfield.height_at(x, z);
        let Some((cx, cz)) = self.config.grid.cell_of(x, z) else {
            return height;
        };
        let bucket = self.hash.lookup(cx, cz);
        if !(bucket.max_height > height) {
            return height;
        }

        let top = bucket.max_height;
        let origin = Vec3::new(x, top, z);
        let down = Ray::new(origin, Vec3::NEG_Y);

        for element in bucket.elements_in(cell_id(cx, cz)) {
            let hit = match element {
                ElementRef::Box(index) => {
                    let Some(cbox) = self.boxes.get(index).filter(|b| b.enabled && !b.virt) else {
                        continue;
                    };
                    if cbox.hi_world.y <= height {
                        continue;
                    }
                    let local = Ray::new(
                        cbox.to_local(origin),
                        cbox.inner_unrot() * (cbox.outer_unrot() * Vec3::NEG_Y),
                    );
                    ray_aabb_span(&local, cbox.lo_local, cbox.hi_local)
                        .and_then(|(t_min, _)| (t_min >= 0.0).then_some(top - t_min))
                }
                ElementRef::Tri(index) => {
                    let Some(tri) = self.tris.get(index).filter(|t| t.enabled) else {
                        continue;
                    };
                    if tri.aab_max.y <= height || !tri.covers_xz(x, z) {
                        continue;
                    }
                    ray_triangle_intersect(&down, tri.a, tri.b, tri.c).map(|t| top - t)
                }
            };
            if let Some(y) = hit
                && y <= ceiling
                && y > height
            {
                height = y;
            }
        }
        height
    }

    // ------------------------------------------------------------------
    // Event box queries
    // ------------------------------------------------------------------

    /// Enabled event boxes in the cells under an AABB that `actor` may trigger.
    pub fn find_potential_event_boxes(&self, lo: Vec3, hi: Vec3, actor: Option<ActorKind>) -> Vec<usize> {
        let mut found = Vec::new();
        for (cx, cz) in self.config.grid.cell_cover(lo, hi).iter() {
            for element in self.hash.lookup(cx, cz).elements_in(cell_id(cx, cz)) {
                let ElementRef::Box(index) = element else {
                    continue;
                };
                let Some(cbox) = self.boxes.get(index) else {
                    continue;
                };
                if cbox.enabled && cbox.event_source.is_some() && cbox.event_filter.permits(actor) && !found.contains(&index) {
                    found.push(index);
                }
            }
        }
        found
    }

    /// Box index behind a named event source.
    pub fn event_box(&self, instance: &str, box_name: &str) -> Option<usize> {
        self.events.find(instance, box_name).and_then(|i| self.events.get(i)).map(|s| s.cbox)
    }

    /// World position of the named event box's own centre.
    pub fn event_position(&self, instance: &str, box_name: &str) -> Option<Vec3> {
        self.event_box(instance, box_name)
            .and_then(|i| self.boxes.get(i))
            .map(CollisionBox::world_selfcenter)
    }

    /// World direction of the named event source.
    pub fn event_direction(&self, instance: &str, box_name: &str) -> Option<Quat> {
        let source = self.events.get(self.events.find(instance, box_name)?)?;
        let cbox = self.boxes.get(source.cbox)?;
        Some(cbox.outer_rot() * source.direction)
    }

    /// Whether `pos` is inside box `index`, with the world bounds widened by `border`.
    pub fn is_inside(&self, pos: Vec3, index: usize, border: f32) -> bool {
        self.boxes.get(index).is_some_and(|b| b.contains_with_border(pos, border))
    }

    pub fn is_inside_named(&self, pos: Vec3, instance: &str, box_name: &str, border: f32) -> bool {
        self.event_box(instance, box_name)
            .is_some_and(|i| self.is_inside(pos, i, border))
    }

    /// First enabled event source whose box holds every position (e.g. all
    /// nodes of an actor parked in a zone).
    pub fn find_event_box_containing_all(&self, positions: &[Vec3]) -> Option<usize> {
        if positions.is_empty() {
            return None;
        }
        self.events.iter().find_map(|(index, source)| {
            let cbox = self.boxes.get(source.cbox).filter(|b| b.enabled)?;
            positions
                .iter()
                .all(|&p| cbox.contains_with_border(p, 0.0))
                .then_some(index)
        })
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            boxes: self.boxes.len(),
            tris: self.tris.len(),
            meshes: self.tris.meshes().len(),
            event_sources: self.events.len(),
            hash: self.hash.stats(),
        }
    }
}
