//! Fruit Merge - physics core of a merge/stack game
//!
//! Core modules:
//! - `sim`: Rigid-body simulation (integration, contacts, sleep, clustering)
//! - `config`: Tuning knobs and world bounds
//! - `catalog`: Body tiers (size, mass, score, upgrade chain)
//! - `error`: Construction-time errors

pub mod catalog;
pub mod config;
pub mod error;
pub mod sim;

pub use catalog::{TierSpec, TierTable};
pub use config::{MergeBehavior, PhysicsConfig};
pub use error::{EngineError, EngineResult};

use glam::Vec2;

/// 2D vector used throughout the engine
pub type Vector2 = Vec2;

/// Default tuning values
pub mod consts {
    /// Fixed simulation timestep (60 Hz, one step per rendered frame)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Largest timestep a single step will integrate
    pub const MAX_DT: f32 = 0.1;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 4;

    /// Play-field defaults (portrait phone canvas)
    pub const WORLD_WIDTH: f32 = 375.0;
    pub const WORLD_HEIGHT: f32 = 667.0;
    pub const GROUND_THICKNESS: f32 = 28.0;
    pub const WALL_MARGIN: f32 = 6.0;

    /// Downward acceleration (pixels/s²)
    pub const GRAVITY: f32 = 1200.0;
    /// Per-step velocity retention while moving
    pub const AIR_RESISTANCE: f32 = 0.988;
    pub const RESTITUTION: f32 = 0.15;
    /// Per-contact tangential velocity retention
    pub const FRICTION: f32 = 0.95;
    pub const MAX_VELOCITY: f32 = 650.0;
    /// Extra damping on ground bounces
    pub const BOUNCE_DAMPING: f32 = 0.2;

    /// Below this speed a ground-contacting body counts as resting
    pub const SETTLE_SPEED: f32 = 8.0;
    /// Resting pairs overlapping less than this are left alone
    pub const SETTLE_OVERLAP: f32 = 0.5;
    pub const SLEEP_VELOCITY: f32 = 4.0;
    pub const SLEEP_TIME: f32 = 0.5;
    pub const WAKE_IMPULSE: f32 = 30.0;
    pub const WAKE_OVERLAP: f32 = 2.5;
    /// Time a body must stay calm before gameplay treats it as settled
    pub const STABLE_CONTACT_TIME: f32 = 0.15;

    /// Airborne downward speed that makes a body an impact source
    pub const IMPACT_SOURCE_SPEED: f32 = 120.0;
    pub const IMPACT_SOURCE_DURATION: f32 = 0.3;

    pub const POSITION_CORRECTION: f32 = 0.8;
    pub const STACKED_POSITION_CORRECTION: f32 = 0.2;
    pub const IMPULSE_DAMPING: f32 = 0.6;
    pub const STACKED_IMPULSE_DAMPING: f32 = 0.25;
    /// Approach speeds below this end in a dead stop instead of a bounce
    pub const RESTING_CONTACT_SPEED: f32 = 60.0;

    /// Velocity change (pixels/s) that counts as an audible impact
    pub const IMPACT_THRESHOLD: f32 = 36.0;
    pub const STACKED_IMPACT_CLAMP: f32 = 8.0;
    pub const MAX_IMPACT_STRENGTH: f32 = 400.0;
    pub const GROUND_IMPACT_SPEED: f32 = 36.0;
    pub const GROUND_IMPACT_COOLDOWN: f32 = 0.26;
    pub const MAX_GROUND_IMPACTS: u32 = 3;

    pub const MERGE_DISTANCE_FRACTION: f32 = 1.0;
    pub const MIN_MERGE_AGE: f32 = 0.01;
    pub const MAX_MERGE_SPEED: f32 = 250.0;
    /// Refractory period after a merge (seconds)
    pub const MERGE_COOLDOWN: f32 = 0.1;
    pub const MIN_CLUSTER_SIZE: usize = 2;
    pub const ELIMINATE_SCORE_MULTIPLIER: f32 = 1.0;

    pub const MAX_BODIES: usize = 50;
}

/// Normalize a vector, yielding zero for zero-length or non-finite input
#[inline]
pub fn safe_normalize(v: Vec2) -> Vec2 {
    let len = v.length();
    if len > f32::EPSILON && len.is_finite() {
        v / len
    } else {
        Vec2::ZERO
    }
}

/// Replace a non-finite or non-positive timestep with `SIM_DT` and clamp to `max_dt`
#[inline]
pub fn sanitize_dt(dt: f32, max_dt: f32) -> f32 {
    if !dt.is_finite() || dt <= 0.0 {
        log::warn!("Invalid timestep {}, substituting {}", dt, consts::SIM_DT);
        return consts::SIM_DT.min(max_dt);
    }
    dt.min(max_dt)
}
