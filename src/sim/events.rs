//! Typed engine events and listener dispatch
//!
//! Events carry copies of the data (positions, types, handles) and never a
//! reference into the body storage. Listeners run synchronously in emission
//! order; a panicking listener is logged and skipped so the step still
//! reaches cleanup.

use std::panic::{AssertUnwindSafe, catch_unwind};

use glam::Vec2;
use serde::Serialize;

use super::body::{BodyHandle, BodyType};

/// Two bodies fused into the next tier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeEvent {
    pub old_type: BodyType,
    pub new_type: BodyType,
    /// Mass-weighted midpoint of the two originals
    pub position: Vec2,
    /// Mass-weighted velocity of the two originals
    pub velocity: Vec2,
    #[serde(skip)]
    pub consumed: [BodyHandle; 2],
}

/// A connected same-type cluster was removed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EliminateEvent {
    pub body_type: BodyType,
    /// Mass-weighted centroid of the cluster
    pub position: Vec2,
    pub count: usize,
    pub score: u64,
    #[serde(skip)]
    pub members: Vec<BodyHandle>,
}

/// A contact hard enough to be heard or seen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactEvent {
    /// Contact point (pair midpoint, or the ground point under the body)
    pub position: Vec2,
    /// Normal velocity change (pixels/s)
    pub strength: f32,
    pub normal: Vec2,
    #[serde(skip)]
    pub body_a: Option<BodyHandle>,
    /// `None` for ground impacts
    #[serde(skip)]
    pub body_b: Option<BodyHandle>,
    /// At least one side was an impact source (undamped)
    pub impact_source: bool,
}

impl ImpactEvent {
    pub fn involves(&self, handle: BodyHandle) -> bool {
        self.body_a == Some(handle) || self.body_b == Some(handle)
    }

    pub fn is_ground(&self) -> bool {
        self.body_b.is_none()
    }
}

/// Result of the merge/elimination pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClusterEvent {
    Merge(MergeEvent),
    Eliminate(EliminateEvent),
}

impl ClusterEvent {
    pub fn position(&self) -> Vec2 {
        match self {
            ClusterEvent::Merge(e) => e.position,
            ClusterEvent::Eliminate(e) => e.position,
        }
    }
}

/// Anything a step emits, in order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimEvent {
    Cluster(ClusterEvent),
    Impact(ImpactEvent),
}

type ClusterListener = Box<dyn FnMut(&ClusterEvent)>;
type ImpactListener = Box<dyn FnMut(&ImpactEvent)>;

/// Registered callbacks
#[derive(Default)]
pub struct EventBus {
    cluster_listeners: Vec<ClusterListener>,
    impact_listeners: Vec<ImpactListener>,
    /// Listener invocations that panicked
    failures: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_cluster(&mut self, listener: impl FnMut(&ClusterEvent) + 'static) {
        self.cluster_listeners.push(Box::new(listener));
    }

    pub fn on_impact(&mut self, listener: impl FnMut(&ImpactEvent) + 'static) {
        self.impact_listeners.push(Box::new(listener));
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn listener_count(&self) -> usize {
        self.cluster_listeners.len() + self.impact_listeners.len()
    }

    pub fn emit_cluster(&mut self, event: &ClusterEvent) {
        for (i, listener) in self.cluster_listeners.iter_mut().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                self.failures += 1;
                log::error!("Merge listener #{} panicked; continuing step", i);
            }
        }
    }

    pub fn emit_impact(&mut self, event: &ImpactEvent) {
        for (i, listener) in self.impact_listeners.iter_mut().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                self.failures += 1;
                log::error!("Impact listener #{} panicked; continuing step", i);
            }
        }
    }

    /// Dispatch to the matching listener list
    pub fn emit(&mut self, event: &SimEvent) {
        match event {
            SimEvent::Cluster(e) => self.emit_cluster(e),
            SimEvent::Impact(e) => self.emit_impact(e),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("cluster_listeners", &self.cluster_listeners.len())
            .field("impact_listeners", &self.impact_listeners.len())
            .field("failures", &self.failures)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn impact() -> ImpactEvent {
        ImpactEvent {
            position: Vec2::new(1.0, 2.0),
            strength: 50.0,
            normal: Vec2::Y,
            body_a: None,
            body_b: None,
            impact_source: true,
        }
    }

    #[test]
    fn test_listeners_called_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        for id in 0..3 {
            let log = Rc::clone(&log);
            bus.on_impact(move |_| log.borrow_mut().push(id));
        }
        bus.emit_impact(&impact());
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let hits = Rc::new(RefCell::new(0));
        let mut bus = EventBus::new();
        bus.on_impact(|_| panic!("broken listener"));
        {
            let hits = Rc::clone(&hits);
            bus.on_impact(move |_| *hits.borrow_mut() += 1);
        }
        bus.emit_impact(&impact());
        bus.emit_impact(&impact());
        assert_eq!(*hits.borrow(), 2);
        assert_eq!(bus.failures(), 2);
    }

    #[test]
    fn test_event_json_uses_canonical_names() {
        let event = SimEvent::Cluster(ClusterEvent::Eliminate(EliminateEvent {
            body_type: BodyType::from("GRAPE"),
            position: Vec2::new(10.0, 20.0),
            count: 3,
            score: 18,
            members: Vec::new(),
        }));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "cluster");
        assert_eq!(json["action"], "eliminate");
        assert_eq!(json["body_type"], "GRAPE");
        assert_eq!(json["count"], 3);
    }
}
