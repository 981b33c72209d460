//! Simulation step orchestration
//!
//! One call to [`PhysicsEngine::step`] runs the fixed pipeline:
//! integrate, constrain, detect, resolve, ground checks, merge or
//! eliminate, cleanup. Bodies are visited in handle order so identical
//! inputs give identical results.

use glam::Vec2;
use slotmap::SlotMap;

use super::body::{BodyHandle, RigidBody};
use super::cluster;
use super::collision;
use super::events::{ClusterEvent, EliminateEvent, EventBus, ImpactEvent, MergeEvent, SimEvent};
use super::integrator::integrate;
use super::sleep;
use super::world::{self, World};
use crate::catalog::TierTable;
use crate::config::{MergeBehavior, PhysicsConfig};
use crate::error::{EngineError, EngineResult, require_positive};
use crate::sanitize_dt;

/// Everything one step emitted, in emission order
#[derive(Debug, Clone, Default)]
pub struct StepReport {
    pub events: Vec<SimEvent>,
    /// Bodies dropped during cleanup
    pub removed: usize,
    /// Timestep actually integrated
    pub dt: f32,
}

impl StepReport {
    pub fn merges(&self) -> impl Iterator<Item = &MergeEvent> {
        self.events.iter().filter_map(|e| match e {
            SimEvent::Cluster(ClusterEvent::Merge(m)) => Some(m),
            _ => None,
        })
    }

    pub fn eliminations(&self) -> impl Iterator<Item = &EliminateEvent> {
        self.events.iter().filter_map(|e| match e {
            SimEvent::Cluster(ClusterEvent::Eliminate(el)) => Some(el),
            _ => None,
        })
    }

    pub fn impacts(&self) -> impl Iterator<Item = &ImpactEvent> {
        self.events.iter().filter_map(|e| match e {
            SimEvent::Impact(i) => Some(i),
            _ => None,
        })
    }
}

/// Counters for debugging and the demo's status line
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct EngineStats {
    pub bodies: usize,
    pub sleeping: usize,
    pub supported: usize,
    pub steps: u64,
    pub merges: u64,
    pub eliminations: u64,
    pub impacts: u64,
    pub listener_failures: u64,
}

/// Owns every body and runs the step pipeline
#[derive(Debug)]
pub struct PhysicsEngine {
    config: PhysicsConfig,
    tiers: TierTable,
    bodies: SlotMap<BodyHandle, RigidBody>,
    events: EventBus,
    steps: u64,
    merges: u64,
    eliminations: u64,
    impacts: u64,
}

impl PhysicsEngine {
    pub fn new(config: PhysicsConfig, tiers: TierTable) -> EngineResult<Self> {
        config.validate()?;
        log::info!(
            "Physics engine ready ({}x{}, behavior: {})",
            config.world.width,
            config.world.height,
            config.behavior.as_str()
        );
        Ok(Self {
            config,
            tiers,
            bodies: SlotMap::with_key(),
            events: EventBus::new(),
            steps: 0,
            merges: 0,
            eliminations: 0,
            impacts: 0,
        })
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    pub fn world(&self) -> &World {
        &self.config.world
    }

    // === Body management ===

    /// Take ownership of a body. Fails once `max_bodies` live bodies exist.
    pub fn add_body(&mut self, body: RigidBody) -> EngineResult<BodyHandle> {
        // Deserialized bodies skip the constructor checks
        require_positive("radius", body.radius)?;
        require_positive("mass", body.mass)?;

        let live = self.bodies.values().filter(|b| !b.marked_for_removal).count();
        if live >= self.config.max_bodies {
            log::warn!("Body limit reached ({}), rejecting {}", self.config.max_bodies, body.body_type);
            return Err(EngineError::BodyLimit {
                max: self.config.max_bodies,
            });
        }

        let body_type = body.body_type.clone();
        let handle = self.bodies.insert(body);
        log::debug!("Added {} as {:?}", body_type, handle);
        Ok(handle)
    }

    /// Spawn a tier body by type name, with the configured material
    pub fn spawn(&mut self, body_type: &str, position: Vec2) -> EngineResult<BodyHandle> {
        let body = self.with_material(self.tiers.spawn(&body_type.into(), position)?);
        self.add_body(body)
    }

    /// Add the upgraded body a merge event asks for
    pub fn spawn_merged(&mut self, event: &MergeEvent) -> EngineResult<BodyHandle> {
        let merged = self.tiers.spawn_merged(event, self.config.merge_cooldown)?;
        let body = self.with_material(merged);
        self.add_body(body)
    }

    fn with_material(&self, body: RigidBody) -> RigidBody {
        body.with_restitution(self.config.restitution)
            .with_friction(self.config.friction)
    }

    /// Tombstone a body; it leaves the world at the end of the next step
    pub fn mark_for_removal(&mut self, handle: BodyHandle) -> EngineResult<()> {
        let body = self.body_mut(handle)?;
        if body.is_static {
            return Err(EngineError::StaticBody(handle));
        }
        body.tombstone();
        Ok(())
    }

    pub fn apply_force(&mut self, handle: BodyHandle, force: Vec2) -> EngineResult<()> {
        let body = self.body_mut(handle)?;
        sleep::wake(body);
        body.apply_force(force);
        Ok(())
    }

    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec2) -> EngineResult<()> {
        let body = self.body_mut(handle)?;
        sleep::wake(body);
        body.apply_impulse(impulse);
        Ok(())
    }

    pub fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec2) -> EngineResult<()> {
        if !velocity.is_finite() {
            return Err(EngineError::InvalidBody {
                field: "velocity",
                value: if velocity.x.is_finite() { velocity.y } else { velocity.x },
            });
        }
        let max_velocity = self.config.max_velocity;
        let body = self.body_mut(handle)?;
        if body.is_static {
            return Err(EngineError::StaticBody(handle));
        }
        sleep::wake(body);
        body.velocity = velocity.clamp_length_max(max_velocity);
        Ok(())
    }

    /// Returns true if the body was asleep
    pub fn wake(&mut self, handle: BodyHandle) -> EngineResult<bool> {
        Ok(sleep::wake(self.body_mut(handle)?))
    }

    fn body_mut(&mut self, handle: BodyHandle) -> EngineResult<&mut RigidBody> {
        self.bodies
            .get_mut(handle)
            .ok_or(EngineError::UnknownBody(handle))
    }

    // === Listeners ===

    /// Called for every merge and elimination
    pub fn on_merge(&mut self, listener: impl FnMut(&ClusterEvent) + 'static) {
        self.events.on_cluster(listener);
    }

    pub fn on_impact(&mut self, listener: impl FnMut(&ImpactEvent) + 'static) {
        self.events.on_impact(listener);
    }

    // === Stepping ===

    /// Advance the world by `dt` seconds (sanitized and clamped to `max_dt`)
    pub fn step(&mut self, dt: f32) -> StepReport {
        let dt = sanitize_dt(dt, self.config.max_dt);
        let mut report = StepReport {
            dt,
            ..StepReport::default()
        };
        let handles: Vec<BodyHandle> = self.bodies.keys().collect();

        // 1. Integrate
        for body in self.bodies.values_mut() {
            integrate(body, &self.config, dt);
        }

        // 2. Walls and ground
        let mut landings = Vec::new();
        for &handle in &handles {
            let body = &mut self.bodies[handle];
            let contact = world::constrain(body, &self.config.world, &self.config, dt);
            if contact.landed {
                landings.push((handle, contact.impact_speed));
            }
        }

        // 3. Detect
        let contacts = collision::detect_collisions(&self.bodies, &handles, &self.config);
        collision::propagate_support(&mut self.bodies, &contacts);
        for body in self.bodies.values_mut() {
            sleep::wake_if_unsupported(body);
        }

        // 4. Resolve, reporting impacts as they happen
        for pair in &contacts.active {
            if let Some(event) = collision::resolve_collision(&mut self.bodies, pair, &self.config)
            {
                self.emit(&mut report, SimEvent::Impact(event));
            }
        }
        // A body that came to rest on the pile has finished falling
        for body in self.bodies.values_mut().filter(|b| b.is_supported()) {
            body.clear_impact_source();
        }

        // 5. Ground impacts, landing clusters, and keeping pushed bodies inside
        for (handle, speed) in landings {
            if let Some(event) = self.ground_impact(handle, speed) {
                self.emit(&mut report, SimEvent::Impact(event));
            }
            if self.config.behavior == MergeBehavior::EliminateOnLanding {
                if let Some(event) = cluster::eliminate_from_landing(
                    &mut self.bodies,
                    &contacts,
                    handle,
                    &self.config,
                    &self.tiers,
                ) {
                    self.emit(&mut report, SimEvent::Cluster(ClusterEvent::Eliminate(event)));
                }
            }
        }
        for body in self.bodies.values_mut().filter(|b| b.is_active()) {
            body.position = world::clamp_position(body.position, body.radius, &self.config.world);
        }

        // 6. Merge or eliminate
        let cluster_events: Vec<ClusterEvent> = match self.config.behavior {
            MergeBehavior::Merge => {
                cluster::find_merges(&mut self.bodies, &contacts, &self.config, &self.tiers)
                    .into_iter()
                    .map(ClusterEvent::Merge)
                    .collect()
            }
            MergeBehavior::Eliminate => {
                cluster::find_eliminations(&mut self.bodies, &contacts, &self.config, &self.tiers)
                    .into_iter()
                    .map(ClusterEvent::Eliminate)
                    .collect()
            }
            MergeBehavior::EliminateOnLanding => Vec::new(),
        };
        for event in cluster_events {
            self.emit(&mut report, SimEvent::Cluster(event));
        }

        // 7. Cleanup
        let before = self.bodies.len();
        self.bodies.retain(|_, b| !b.marked_for_removal);
        report.removed = before - self.bodies.len();

        self.steps += 1;
        report
    }

    /// Impact event for a body that just touched down, within the
    /// per-body cooldown and count limits
    fn ground_impact(&mut self, handle: BodyHandle, speed: f32) -> Option<ImpactEvent> {
        let config = &self.config;
        let body = self.bodies.get_mut(handle)?;
        if !body.is_active()
            || speed < config.ground_impact_speed
            || body.bottom_impact_cooldown > 0.0
            || body.bottom_impact_count >= config.max_ground_impacts
        {
            return None;
        }

        body.bottom_impact_cooldown = config.ground_impact_cooldown;
        body.bottom_impact_count += 1;
        log::debug!("{} landed at {:.0} px/s", body.body_type, speed);

        Some(ImpactEvent {
            position: Vec2::new(body.position.x, config.world.ground_y()),
            strength: speed.min(config.max_impact_strength),
            normal: Vec2::NEG_Y,
            body_a: Some(handle),
            body_b: None,
            impact_source: speed >= config.impact_source_speed,
        })
    }

    fn emit(&mut self, report: &mut StepReport, event: SimEvent) {
        match &event {
            SimEvent::Impact(_) => self.impacts += 1,
            SimEvent::Cluster(ClusterEvent::Merge(_)) => self.merges += 1,
            SimEvent::Cluster(ClusterEvent::Eliminate(_)) => self.eliminations += 1,
        }
        self.events.emit(&event);
        report.events.push(event);
    }

    // === Queries ===

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    /// Every stored body in handle order (tombstoned ones until cleanup)
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.bodies.iter()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn stats(&self) -> EngineStats {
        let live = || self.bodies.values().filter(|b| !b.marked_for_removal);
        EngineStats {
            bodies: live().count(),
            sleeping: live().filter(|b| b.is_sleeping).count(),
            supported: live().filter(|b| b.is_supported()).count(),
            steps: self.steps,
            merges: self.merges,
            eliminations: self.eliminations,
            impacts: self.impacts,
            listener_failures: self.events.failures(),
        }
    }

    /// Asleep, or calm long enough for gameplay to treat it as placed
    pub fn is_settled(&self, handle: BodyHandle) -> bool {
        let Some(body) = self.bodies.get(handle) else {
            return false;
        };
        if body.marked_for_removal {
            return false;
        }
        if body.is_static || body.is_sleeping {
            return true;
        }
        let calm_for = if body.bottom_contact {
            body.bottom_contact_duration.max(body.calm_timer)
        } else {
            body.calm_timer
        };
        body.speed() < self.config.settle_speed && calm_for >= self.config.stable_contact_time
    }

    /// Every live dynamic body is below settle speed
    pub fn is_world_settled(&self) -> bool {
        self.bodies
            .values()
            .filter(|b| b.is_active())
            .all(|b| b.is_sleeping || b.speed() < self.config.settle_speed)
    }

    /// Y of the highest body top, or the ground top when nothing is stacked
    pub fn stack_top_y(&self) -> f32 {
        self.bodies
            .values()
            .filter(|b| b.is_active())
            .map(|b| b.position.y - b.radius)
            .fold(self.ground_top_y(), f32::min)
    }

    pub fn ground_top_y(&self) -> f32 {
        self.config.world.ground_y()
    }

    // === Lifecycle ===

    /// Drop every body. Listeners and counters are kept.
    pub fn clear(&mut self) {
        log::info!("Clearing {} bodies", self.bodies.len());
        self.bodies.clear();
    }

    /// Resize the container; bodies left outside are pulled back in
    pub fn set_world(&mut self, world: World) -> EngineResult<()> {
        world.validate()?;
        log::info!("World resized to {}x{}", world.width, world.height);
        self.config.world = world;
        for body in self.bodies.values_mut().filter(|b| b.is_active()) {
            body.position = world::clamp_position(body.position, body.radius, &world);
            sleep::wake(body);
        }
        Ok(())
    }
}
