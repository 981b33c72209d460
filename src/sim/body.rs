//! Rigid body state
//!
//! One circular body: kinematics, material, and the bookkeeping timers the
//! contact, sleep and merge passes rely on. Timers are in seconds.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{EngineResult, require_positive};

slotmap::new_key_type! {
    /// Stable handle to a body owned by the engine
    pub struct BodyHandle;
}

/// Opaque category tag (e.g. a fruit tier). Only compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyType(String);

impl BodyType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BodyType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for BodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A simulated circle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigidBody {
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    /// Accumulated acceleration, cleared after each integration
    pub(crate) acceleration: Vec2,
    pub(crate) radius: f32,
    pub(crate) mass: f32,
    pub(crate) restitution: f32,
    pub(crate) friction: f32,
    pub(crate) body_type: BodyType,
    pub(crate) is_static: bool,
    pub(crate) marked_for_removal: bool,
    /// Seconds since the body entered the world
    pub(crate) age: f32,

    // Merge refractory period
    pub(crate) can_merge: bool,
    pub(crate) merge_cooldown: f32,

    // Ground contact bookkeeping
    pub(crate) bottom_contact: bool,
    pub(crate) bottom_contact_duration: f32,
    pub(crate) bottom_impact_cooldown: f32,
    pub(crate) bottom_impact_count: u32,
    /// Carried by the ground or by a supported body below (recomputed each step)
    pub(crate) supported: bool,

    // Sleep
    pub(crate) is_sleeping: bool,
    pub(crate) sleep_timer: f32,
    /// Seconds spent below settle speed, regardless of support
    pub(crate) calm_timer: f32,

    // Impact source window
    pub(crate) is_impact_source: bool,
    pub(crate) impact_source_timer: f32,
}

impl RigidBody {
    /// Create a dynamic body at rest. Radius and mass must be positive.
    pub fn new(
        body_type: impl Into<BodyType>,
        position: Vec2,
        radius: f32,
        mass: f32,
    ) -> EngineResult<Self> {
        require_positive("radius", radius)?;
        require_positive("mass", mass)?;
        Ok(Self {
            position,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            radius,
            mass,
            restitution: RESTITUTION,
            friction: FRICTION,
            body_type: body_type.into(),
            is_static: false,
            marked_for_removal: false,
            age: 0.0,
            can_merge: true,
            merge_cooldown: 0.0,
            bottom_contact: false,
            bottom_contact_duration: 0.0,
            bottom_impact_cooldown: 0.0,
            bottom_impact_count: 0,
            supported: false,
            is_sleeping: false,
            sleep_timer: 0.0,
            calm_timer: 0.0,
            is_impact_source: false,
            impact_source_timer: 0.0,
        })
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution.clamp(0.0, 1.0);
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction.clamp(0.0, 1.0);
        self
    }

    /// Immovable obstacle; never integrated, removed, or merged
    pub fn into_static(mut self) -> Self {
        self.is_static = true;
        self.can_merge = false;
        self.velocity = Vec2::ZERO;
        self
    }

    /// Start with a merge refractory period (freshly merged bodies)
    pub fn with_merge_cooldown(mut self, seconds: f32) -> Self {
        self.start_merge_cooldown(seconds);
        self
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn body_type(&self) -> &BodyType {
        &self.body_type
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_marked_for_removal(&self) -> bool {
        self.marked_for_removal
    }

    pub fn is_sleeping(&self) -> bool {
        self.is_sleeping
    }

    pub fn is_impact_source(&self) -> bool {
        self.is_impact_source
    }

    pub fn bottom_contact(&self) -> bool {
        self.bottom_contact
    }

    /// On the ground, on a static body, or resting on a supported body
    pub fn is_supported(&self) -> bool {
        self.bottom_contact || self.supported
    }

    pub fn bottom_contact_duration(&self) -> f32 {
        self.bottom_contact_duration
    }

    pub fn age(&self) -> f32 {
        self.age
    }

    /// Inverse mass; zero for static bodies (infinite mass)
    #[inline]
    pub fn inv_mass(&self) -> f32 {
        if self.is_static { 0.0 } else { 1.0 / self.mass }
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Participates in integration and contact response
    #[inline]
    pub fn is_active(&self) -> bool {
        !self.is_static && !self.marked_for_removal
    }

    /// Supported and below settle speed
    #[inline]
    pub(crate) fn is_resting(&self, settle_speed: f32) -> bool {
        self.is_supported() && self.speed() < settle_speed
    }

    /// Eligible to merge or be eliminated right now
    #[inline]
    pub(crate) fn merge_ready(&self) -> bool {
        self.is_active() && self.can_merge && self.merge_cooldown <= 0.0
    }

    /// Accumulate a force (divided by mass into acceleration)
    pub fn apply_force(&mut self, force: Vec2) {
        if self.is_static {
            return;
        }
        self.acceleration += force / self.mass;
    }

    /// Instantaneous momentum change
    pub fn apply_impulse(&mut self, impulse: Vec2) {
        if self.is_static {
            return;
        }
        self.velocity += impulse / self.mass;
    }

    pub(crate) fn start_merge_cooldown(&mut self, seconds: f32) {
        if seconds > 0.0 {
            self.can_merge = false;
            self.merge_cooldown = seconds;
        }
    }

    /// Tick down refractory timers (runs even while asleep)
    pub(crate) fn tick_timers(&mut self, dt: f32) {
        self.age += dt;

        if self.merge_cooldown > 0.0 {
            self.merge_cooldown -= dt;
            if self.merge_cooldown <= 0.0 {
                self.merge_cooldown = 0.0;
                self.can_merge = !self.is_static;
            }
        }

        if self.bottom_impact_cooldown > 0.0 {
            self.bottom_impact_cooldown = (self.bottom_impact_cooldown - dt).max(0.0);
        }

        if self.is_impact_source {
            self.impact_source_timer -= dt;
            if self.impact_source_timer <= 0.0 {
                self.clear_impact_source();
            }
        }
    }

    pub(crate) fn mark_impact_source(&mut self, duration: f32) {
        self.is_impact_source = true;
        self.impact_source_timer = duration;
    }

    pub(crate) fn clear_impact_source(&mut self) {
        self.is_impact_source = false;
        self.impact_source_timer = 0.0;
    }

    pub(crate) fn tombstone(&mut self) {
        self.marked_for_removal = true;
        self.velocity = Vec2::ZERO;
        self.acceleration = Vec2::ZERO;
    }
}
