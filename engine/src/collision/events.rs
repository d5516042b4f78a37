//! Event boxes and script dispatch
//!
//! An event source ties a collision box to a pair of script-facing names and
//! an opaque handler token. Entering the box calls the registered
//! [`EventHandler`] at most once per continuous stay:
//! - characters are tracked in a service-wide "last called" list, cleared
//!   after a corrective pass in which no permitted event box was entered
//! - actors track their own residency per tick in an [`ActorEventCache`]
//!
//! All dispatch happens under a single lock. Handlers run on the physics
//! thread and must not call back into the collision service.

use glam::{Quat, Vec3};
use log::{debug, error};
use parking_lot::Mutex;

use super::boxes::EventFilter;
use crate::error::EventError;
use crate::physics::node::{ActorId, ActorKind, NodeId};

/// Named event volume.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSource {
    pub box_name: String,
    pub instance_name: String,
    /// Local direction reported to scripts
    pub direction: Quat,
    /// Opaque script handler token
    pub handler: i32,
    /// Owning collision box
    pub cbox: usize,
}

/// What the handler gets told about an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EventContext {
    pub source_index: usize,
    pub source: EventSource,
    pub node: Option<NodeId>,
    pub actor: Option<ActorId>,
    pub position: Vec3,
}

/// Receiver of event box entries (the script host).
pub trait EventHandler: Send {
    fn on_event(&mut self, ctx: &EventContext) -> Result<(), EventError>;
}

impl<F> EventHandler for F
where
    F: FnMut(&EventContext) -> Result<(), EventError> + Send,
{
    fn on_event(&mut self, ctx: &EventContext) -> Result<(), EventError> {
        self(ctx)
    }
}

impl EventFilter {
    /// Whether an entry by `actor` (`None` for a character on foot) may fire.
    pub fn permits(self, actor: Option<ActorKind>) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Avatar | EventFilter::Delete => actor.is_none(),
            EventFilter::Truck => actor == Some(ActorKind::Truck),
            EventFilter::Airplane => actor == Some(ActorKind::Airplane),
            EventFilter::Boat => actor == Some(ActorKind::Boat),
        }
    }
}

/// Per-actor event box residency across two ticks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActorEventCache {
    previous: Vec<usize>,
    current: Vec<usize>,
}

impl ActorEventCache {
    /// Roll the residency window.
    pub fn begin_tick(&mut self) {
        self.previous = std::mem::take(&mut self.current);
    }

    /// Record that the actor is inside `cbox` this tick. Returns `true` when
    /// the actor was in it neither last tick nor earlier this tick.
    pub fn enter(&mut self, cbox: usize) -> bool {
        if self.current.contains(&cbox) {
            return false;
        }
        self.current.push(cbox);
        !self.previous.contains(&cbox)
    }

    pub fn is_inside(&self, cbox: usize) -> bool {
        self.current.contains(&cbox) || self.previous.contains(&cbox)
    }

    pub fn clear(&mut self) {
        self.previous.clear();
        self.current.clear();
    }
}

struct DispatchState {
    handler: Option<Box<dyn EventHandler>>,
    enabled: Vec<bool>,
    last_called: Vec<usize>,
    fired: u64,
}

/// Registry of event sources with the dispatch lock.
pub struct EventBoxRegistry {
    sources: Vec<EventSource>,
    dispatch: Mutex<DispatchState>,
}

impl Default for EventBoxRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBoxRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBoxRegistry")
            .field("sources", &self.sources)
            .finish_non_exhaustive()
    }
}

impl EventBoxRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            dispatch: Mutex::new(DispatchState {
                handler: None,
                enabled: Vec::new(),
                last_called: Vec::new(),
                fired: 0,
            }),
        }
    }

    /// Register a source, enabled.
    pub fn add(&mut self, source: EventSource) -> usize {
        self.sources.push(source);
        self.dispatch.get_mut().enabled.push(true);
        self.sources.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&EventSource> {
        self.sources.get(index)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &EventSource)> {
        self.sources.iter().enumerate()
    }

    /// Exact-match lookup by instance and box name.
    pub fn find(&self, instance: &str, box_name: &str) -> Option<usize> {
        self.sources
            .iter()
            .position(|s| s.instance_name == instance && s.box_name == box_name)
    }

    /// Install the script host. Replaces any previous handler.
    pub fn set_handler(&self, handler: Box<dyn EventHandler>) {
        self.dispatch.lock().handler = Some(handler);
    }

    pub fn set_enabled(&self, index: usize, enabled: bool) -> bool {
        match self.dispatch.lock().enabled.get_mut(index) {
            Some(slot) => {
                *slot = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, index: usize) -> bool {
        self.dispatch.lock().enabled.get(index).copied().unwrap_or(false)
    }

    /// Total number of handler invocations.
    pub fn fire_count(&self) -> u64 {
        self.dispatch.lock().fired
    }

    /// Character entry. Fires unless the box is already in the last-called
    /// list. Returns whether the handler ran.
    pub fn dispatch_character(&self, source_index: usize, position: Vec3) -> bool {
        let Some(source) = self.sources.get(source_index) else {
            return false;
        };
        let mut state = self.dispatch.lock();
        if !state.enabled.get(source_index).copied().unwrap_or(false) {
            return false;
        }
        if state.last_called.contains(&source.cbox) {
            return false;
        }
        state.last_called.push(source.cbox);
        let ctx = EventContext {
            source_index,
            source: source.clone(),
            node: None,
            actor: None,
            position,
        };
        Self::invoke(&mut state, &ctx);
        true
    }

    /// Actor entry through one of its nodes. Fires when the actor was not
    /// already resident in the box.
    pub fn dispatch_actor(
        &self,
        source_index: usize,
        cache: &mut ActorEventCache,
        actor: Option<ActorId>,
        node: NodeId,
        position: Vec3,
    ) -> bool {
        let Some(source) = self.sources.get(source_index) else {
            return false;
        };
        let mut state = self.dispatch.lock();
        if !state.enabled.get(source_index).copied().unwrap_or(false) {
            return false;
        }
        if !cache.enter(source.cbox) {
            return false;
        }
        let ctx = EventContext {
            source_index,
            source: source.clone(),
            node: Some(node),
            actor,
            position,
        };
        Self::invoke(&mut state, &ctx);
        true
    }

    fn invoke(state: &mut DispatchState, ctx: &EventContext) {
        state.fired += 1;
        debug!(
            "Event box '{}' of '{}' entered (handler {})",
            ctx.source.box_name, ctx.source.instance_name, ctx.source.handler
        );
        let Some(handler) = state.handler.as_mut() else {
            return;
        };
        if let Err(e) = handler.on_event(ctx) {
            error!(
                "Event source '{}'/'{}' disabled: {}",
                ctx.source.instance_name, ctx.source.box_name, e
            );
            if let Some(slot) = state.enabled.get_mut(ctx.source_index) {
                *slot = false;
            }
        }
    }

    /// Close a character corrective pass. The last-called list is cleared
    /// when no permitted event box was entered.
    pub fn end_character_pass(&self, entered_any: bool) {
        if !entered_any {
            self.dispatch.lock().last_called.clear();
        }
    }

    /// Forget every character entry.
    pub fn clear_last_called(&self) {
        self.dispatch.lock().last_called.clear();
    }

    pub fn clear(&mut self) {
        self.sources.clear();
        let state = self.dispatch.get_mut();
        state.enabled.clear();
        state.last_called.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn source(cbox: usize) -> EventSource {
        EventSource {
            box_name: "trigger".into(),
            instance_name: "gate".into(),
            direction: Quat::IDENTITY,
            handler: 7,
            cbox,
        }
    }

    fn counting(registry: &EventBoxRegistry) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        registry.set_handler(Box::new(move |_: &EventContext| -> Result<(), EventError> {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        count
    }

    #[test]
    fn test_filter_permits() {
        assert!(EventFilter::All.permits(None));
        assert!(EventFilter::All.permits(Some(ActorKind::Boat)));
        assert!(EventFilter::Avatar.permits(None));
        assert!(!EventFilter::Avatar.permits(Some(ActorKind::Truck)));
        assert!(EventFilter::Delete.permits(None));
        assert!(EventFilter::Truck.permits(Some(ActorKind::Truck)));
        assert!(!EventFilter::Truck.permits(None));
        assert!(!EventFilter::Boat.permits(Some(ActorKind::Airplane)));
    }

    #[test]
    fn test_find() {
        let mut registry = EventBoxRegistry::new();
        registry.add(source(0));
        assert_eq!(registry.find("gate", "trigger"), Some(0));
        assert_eq!(registry.find("gate", "other"), None);
    }

    #[test]
    fn test_character_dedup() {
        let mut registry = EventBoxRegistry::new();
        let idx = registry.add(source(3));
        let count = counting(&registry);

        assert!(registry.dispatch_character(idx, Vec3::ZERO));
        assert!(!registry.dispatch_character(idx, Vec3::ZERO));
        registry.end_character_pass(true);
        assert!(!registry.dispatch_character(idx, Vec3::ZERO));
        // a quiet pass resets
        registry.end_character_pass(false);
        assert!(registry.dispatch_character(idx, Vec3::ZERO));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_actor_residency() {
        let mut cache = ActorEventCache::default();
        assert!(cache.enter(1));
        assert!(!cache.enter(1));
        cache.begin_tick();
        assert!(!cache.enter(1), "still inside");
        cache.begin_tick();
        cache.begin_tick();
        assert!(cache.enter(1), "left for a tick, re-entered");
    }

    #[test]
    fn test_handler_error_disables_source() {
        let mut registry = EventBoxRegistry::new();
        let idx = registry.add(source(0));
        registry.set_handler(Box::new(|ctx: &EventContext| -> Result<(), EventError> {
            Err(EventError::handler(ctx.source.handler, "script exception"))
        }));
        assert!(registry.dispatch_character(idx, Vec3::ZERO));
        assert!(!registry.is_enabled(idx));
        registry.clear_last_called();
        assert!(!registry.dispatch_character(idx, Vec3::ZERO));
        assert_eq!(registry.fire_count(), 1);
    }
}
