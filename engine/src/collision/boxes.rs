//! Collision boxes
//!
//! Oriented boxes with two levels of rotation. A box is defined by local
//! extents `lo..hi` (scaled), an optional self-rotation about its own centre
//! (`selfcenter`) and an outer rotation about the placement point. Boxes
//! whose outer Euler angles are all below 1e-4 degrees skip the outer
//! transform entirely.
//!
//! Local frame:
//! ```text
//! local = inner_unrot * (outer_unrot * (p - center) - selfcenter) + selfcenter
//! ```
//!
//! Virtual boxes are non-solid event volumes; solid boxes push characters
//! out through their nearest face and produce contact forces on nodes.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::physics::types::euler_xyz_degrees;

/// Outer rotations with every angle below this (degrees) are ignored.
const UNROTATED_EPSILON_DEG: f32 = 1e-4;

/// Which entities an event box reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventFilter {
    #[default]
    All,
    /// Characters on foot
    Avatar,
    Truck,
    Airplane,
    Boat,
    /// Deletion zones; only characters on foot trigger them
    Delete,
}

fn no_handler() -> i32 {
    -1
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

/// Event attached to a box definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDef {
    pub box_name: String,
    pub instance_name: String,
    /// Euler degrees, reported back to scripts on query
    #[serde(default)]
    pub direction: Vec3,
    /// Opaque script handler token; -1 when unset
    #[serde(default = "no_handler")]
    pub handler: i32,
    #[serde(default)]
    pub filter: EventFilter,
}

impl EventDef {
    pub fn new(instance_name: impl Into<String>, box_name: impl Into<String>) -> Self {
        Self {
            box_name: box_name.into(),
            instance_name: instance_name.into(),
            direction: Vec3::ZERO,
            handler: -1,
            filter: EventFilter::All,
        }
    }

    pub fn with_filter(mut self, filter: EventFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_handler(mut self, handler: i32) -> Self {
        self.handler = handler;
        self
    }

    pub fn with_direction(mut self, direction_deg: Vec3) -> Self {
        self.direction = direction_deg;
        self
    }
}

/// Construction record for a collision box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxDef {
    pub position: Vec3,
    /// Outer rotation, Euler degrees
    #[serde(default)]
    pub rotation: Vec3,
    /// Self-rotation about the box centre, Euler degrees
    #[serde(default)]
    pub self_rotation: Option<Vec3>,
    pub lo: Vec3,
    pub hi: Vec3,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
    #[serde(default, rename = "virtual")]
    pub virt: bool,
    #[serde(default)]
    pub event: Option<EventDef>,
    /// Camera offset (rotated with the box) forced while inside
    #[serde(default)]
    pub camera: Option<Vec3>,
}

impl BoxDef {
    /// Solid, unrotated box.
    pub fn new(position: Vec3, lo: Vec3, hi: Vec3) -> Self {
        Self {
            position,
            rotation: Vec3::ZERO,
            self_rotation: None,
            lo,
            hi,
            scale: Vec3::ONE,
            virt: false,
            event: None,
            camera: None,
        }
    }

    pub fn with_rotation(mut self, euler_deg: Vec3) -> Self {
        self.rotation = euler_deg;
        self
    }

    pub fn with_self_rotation(mut self, euler_deg: Vec3) -> Self {
        self.self_rotation = Some(euler_deg);
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Make the box a non-solid event volume.
    pub fn virtual_box(mut self) -> Self {
        self.virt = true;
        self
    }

    pub fn with_event(mut self, event: EventDef) -> Self {
        self.event = Some(event);
        self
    }

    pub fn with_camera(mut self, offset: Vec3) -> Self {
        self.camera = Some(offset);
        self
    }
}

/// A rotation and its inverse.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Rotation {
    rot: Quat,
    unrot: Quat,
}

impl Rotation {
    fn new(rot: Quat) -> Self {
        Self {
            rot,
            unrot: rot.inverse(),
        }
    }
}

/// A registered collision box.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionBox {
    pub center: Vec3,
    outer: Option<Rotation>,
    inner: Option<Rotation>,
    pub lo_local: Vec3,
    pub hi_local: Vec3,
    pub lo_world: Vec3,
    pub hi_world: Vec3,
    pub selfcenter: Vec3,
    pub virt: bool,
    pub event_filter: EventFilter,
    pub event_source: Option<usize>,
    /// World camera position forced while inside
    pub camera_pos: Option<Vec3>,
    pub enabled: bool,
}

impl CollisionBox {
    /// Build the box and its world bounds. `event_source` is linked later by
    /// the owner.
    pub fn from_def(def: &BoxDef) -> Result<Self, GeometryError> {
        let lo_local = def.lo * def.scale;
        let hi_local = def.hi * def.scale;
        if lo_local.cmpgt(hi_local).any() {
            return Err(GeometryError::InvertedBox);
        }

        let outer = if def.rotation.abs().max_element() < UNROTATED_EPSILON_DEG {
            None
        } else {
            Some(Rotation::new(euler_xyz_degrees(def.rotation)))
        };
        let inner = def.self_rotation.map(|sr| Rotation::new(euler_xyz_degrees(sr)));

        let camera_pos = def
            .camera
            .map(|offset| def.position + outer.map_or(Quat::IDENTITY, |o| o.rot) * offset);

        let mut cbox = CollisionBox {
            center: def.position,
            outer,
            inner,
            lo_local,
            hi_local,
            lo_world: Vec3::ZERO,
            hi_world: Vec3::ZERO,
            selfcenter: (lo_local + hi_local) * 0.5,
            virt: def.virt,
            event_filter: def.event.as_ref().map_or(EventFilter::All, |e| e.filter),
            event_source: None,
            camera_pos,
            enabled: true,
        };

        let corners = cbox.corners_local();
        let first = cbox.to_world(corners[0]);
        let (lo, hi) = corners[1..].iter().fold((first, first), |(lo, hi), &c| {
            let w = cbox.to_world(c);
            (lo.min(w), hi.max(w))
        });
        cbox.lo_world = lo;
        cbox.hi_world = hi;
        Ok(cbox)
    }

    /// The 8 corners of the local extents.
    pub fn corners_local(&self) -> [Vec3; 8] {
        let (l, h) = (self.lo_local, self.hi_local);
        [
            Vec3::new(l.x, l.y, l.z),
            Vec3::new(h.x, l.y, l.z),
            Vec3::new(l.x, h.y, l.z),
            Vec3::new(h.x, h.y, l.z),
            Vec3::new(l.x, l.y, h.z),
            Vec3::new(h.x, l.y, h.z),
            Vec3::new(l.x, h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
        ]
    }

    /// Whether the outer rotation is applied ("refined" box).
    pub fn is_rotated(&self) -> bool {
        self.outer.is_some()
    }

    pub fn is_self_rotated(&self) -> bool {
        self.inner.is_some()
    }

    pub fn outer_rot(&self) -> Quat {
        self.outer.map_or(Quat::IDENTITY, |o| o.rot)
    }

    pub fn outer_unrot(&self) -> Quat {
        self.outer.map_or(Quat::IDENTITY, |o| o.unrot)
    }

    pub fn inner_rot(&self) -> Quat {
        self.inner.map_or(Quat::IDENTITY, |r| r.rot)
    }

    pub fn inner_unrot(&self) -> Quat {
        self.inner.map_or(Quat::IDENTITY, |r| r.unrot)
    }

    /// World point into the inner (local) frame.
    pub fn to_local(&self, p: Vec3) -> Vec3 {
        let mut local = p - self.center;
        if let Some(outer) = self.outer {
            local = outer.unrot * local;
        }
        if let Some(inner) = self.inner {
            local = inner.unrot * (local - self.selfcenter) + self.selfcenter;
        }
        local
    }

    /// Local point back to world.
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        let mut p = local;
        if let Some(inner) = self.inner {
            p = inner.rot * (p - self.selfcenter) + self.selfcenter;
        }
        if let Some(outer) = self.outer {
            p = outer.rot * p;
        }
        p + self.center
    }

    /// Local direction to world (inner then outer rotation).
    pub fn dir_to_world(&self, dir: Vec3) -> Vec3 {
        self.outer_rot() * (self.inner_rot() * dir)
    }

    /// Strict world-bounds test used by the broad phase.
    pub fn in_world_bounds(&self, p: Vec3) -> bool {
        p.cmpgt(self.lo_world).all() && p.cmplt(self.hi_world).all()
    }

    /// Strict local-extents test.
    pub fn contains_local(&self, local: Vec3) -> bool {
        local.cmpgt(self.lo_local).all() && local.cmplt(self.hi_local).all()
    }

    /// Point-in-box test. Returns the local-frame point when inside.
    pub fn contains(&self, p: Vec3) -> Option<Vec3> {
        if !self.in_world_bounds(p) {
            return None;
        }
        let local = self.to_local(p);
        self.contains_local(local).then_some(local)
    }

    /// Point-in-box test with the world bounds widened by `border`. Boxes
    /// without any rotation accept on the widened bounds alone.
    pub fn contains_with_border(&self, p: Vec3, border: f32) -> bool {
        if !((p + border).cmpgt(self.lo_world).all() && (p - border).cmplt(self.hi_world).all()) {
            return false;
        }
        if !self.is_rotated() && !self.is_self_rotated() {
            return true;
        }
        self.contains_local(self.to_local(p))
    }

    /// Snap a local point onto its nearest face.
    ///
    /// Faces are checked in the order -X, -Y, -Z, +X, +Y, +Z; a later face
    /// replaces the current pick only if strictly closer.
    pub fn snap_to_nearest_face(&self, local: Vec3) -> Vec3 {
        let (lo, hi) = (self.lo_local, self.hi_local);
        let mut min = local.x - lo.x;
        let mut snapped = Vec3::new(lo.x, local.y, local.z);

        let candidates = [
            (local.y - lo.y, Vec3::new(local.x, lo.y, local.z)),
            (local.z - lo.z, Vec3::new(local.x, local.y, lo.z)),
            (hi.x - local.x, Vec3::new(hi.x, local.y, local.z)),
            (hi.y - local.y, Vec3::new(local.x, hi.y, local.z)),
            (hi.z - local.z, Vec3::new(local.x, local.y, hi.z)),
        ];
        for (dist, point) in candidates {
            if dist < min {
                min = dist;
                snapped = point;
            }
        }
        snapped
    }

    /// Local outward normal of the face nearest to a local point.
    ///
    /// Faces are checked in the order -Z, +Z, -X, +X, -Y, +Y with strict `<`.
    pub fn nearest_face_normal_local(&self, local: Vec3) -> Vec3 {
        let (lo, hi) = (self.lo_local, self.hi_local);
        let mut min = local.z - lo.z;
        let mut normal = Vec3::NEG_Z;

        let candidates = [
            (hi.z - local.z, Vec3::Z),
            (local.x - lo.x, Vec3::NEG_X),
            (hi.x - local.x, Vec3::X),
            (local.y - lo.y, Vec3::NEG_Y),
            (hi.y - local.y, Vec3::Y),
        ];
        for (dist, n) in candidates {
            if dist < min {
                min = dist;
                normal = n;
            }
        }
        normal
    }

    /// World outward normal of the face nearest to a local point.
    pub fn nearest_face_normal(&self, local: Vec3) -> Vec3 {
        self.dir_to_world(self.nearest_face_normal_local(local))
    }

    /// World position of the box's own centre.
    pub fn world_selfcenter(&self) -> Vec3 {
        self.center + self.outer_rot() * self.selfcenter
    }
}

/// Append-only box storage. Indices are stable.
#[derive(Debug, Clone, Default)]
pub struct CollisionBoxStore {
    boxes: Vec<CollisionBox>,
}

impl CollisionBoxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a box, returning its index.
    pub fn push(&mut self, cbox: CollisionBox, limit: usize) -> Result<usize, GeometryError> {
        if self.boxes.len() >= limit {
            return Err(GeometryError::TooManyBoxes { limit });
        }
        self.boxes.push(cbox);
        Ok(self.boxes.len() - 1)
    }

    pub fn get(&self, index: usize) -> Option<&CollisionBox> {
        self.boxes.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut CollisionBox> {
        self.boxes.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollisionBox> {
        self.boxes.iter()
    }

    pub fn clear(&mut self) {
        self.boxes.clear();
    }
}
