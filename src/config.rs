//! Physics tuning and play-field configuration
//!
//! Every threshold the engine uses is a named knob here. The values are
//! tuned for a 375x667 canvas at 60 Hz and carry no meaning beyond that.
//! A JSON document only needs to name the keys it overrides.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{EngineError, EngineResult};
use crate::sim::World;

/// What happens when same-type bodies touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergeBehavior {
    /// Two bodies fuse into the next tier
    #[default]
    Merge,
    /// Connected clusters of at least `min_cluster_size` are removed
    Eliminate,
    /// Like `Eliminate`, but only checked when a body lands on the ground
    EliminateOnLanding,
}

impl MergeBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeBehavior::Merge => "merge",
            MergeBehavior::Eliminate => "eliminate",
            MergeBehavior::EliminateOnLanding => "eliminate_on_landing",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "merge" | "upgrade" => Some(MergeBehavior::Merge),
            "eliminate" => Some(MergeBehavior::Eliminate),
            "eliminate_on_landing" | "eliminate_on_bottom" => {
                Some(MergeBehavior::EliminateOnLanding)
            }
            _ => None,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    // === World ===
    pub world: World,
    /// Hard cap on live bodies
    pub max_bodies: usize,
    /// Largest timestep a single step integrates
    pub max_dt: f32,

    // === Integration ===
    pub gravity: f32,
    pub air_resistance: f32,
    pub max_velocity: f32,
    /// Default restitution for new bodies
    pub restitution: f32,
    /// Default tangential retention for new bodies
    pub friction: f32,
    pub bounce_damping: f32,

    // === Settling & sleep ===
    pub settle_speed: f32,
    pub settle_overlap: f32,
    pub sleep_velocity: f32,
    pub sleep_time: f32,
    pub wake_impulse: f32,
    pub wake_overlap: f32,
    pub stable_contact_time: f32,

    // === Contact response ===
    pub impact_source_speed: f32,
    pub impact_source_duration: f32,
    pub position_correction: f32,
    pub stacked_position_correction: f32,
    pub impulse_damping: f32,
    pub stacked_impulse_damping: f32,
    pub resting_contact_speed: f32,

    // === Impact events ===
    pub impact_threshold: f32,
    pub stacked_impact_clamp: f32,
    pub max_impact_strength: f32,
    pub ground_impact_speed: f32,
    pub ground_impact_cooldown: f32,
    pub max_ground_impacts: u32,

    // === Merge / elimination ===
    pub behavior: MergeBehavior,
    pub merge_distance_fraction: f32,
    pub min_merge_age: f32,
    pub max_merge_speed: f32,
    pub merge_cooldown: f32,
    pub min_cluster_size: usize,
    pub eliminate_score_multiplier: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            world: World::default(),
            max_bodies: MAX_BODIES,
            max_dt: MAX_DT,

            gravity: GRAVITY,
            air_resistance: AIR_RESISTANCE,
            max_velocity: MAX_VELOCITY,
            restitution: RESTITUTION,
            friction: FRICTION,
            bounce_damping: BOUNCE_DAMPING,

            settle_speed: SETTLE_SPEED,
            settle_overlap: SETTLE_OVERLAP,
            sleep_velocity: SLEEP_VELOCITY,
            sleep_time: SLEEP_TIME,
            wake_impulse: WAKE_IMPULSE,
            wake_overlap: WAKE_OVERLAP,
            stable_contact_time: STABLE_CONTACT_TIME,

            impact_source_speed: IMPACT_SOURCE_SPEED,
            impact_source_duration: IMPACT_SOURCE_DURATION,
            position_correction: POSITION_CORRECTION,
            stacked_position_correction: STACKED_POSITION_CORRECTION,
            impulse_damping: IMPULSE_DAMPING,
            stacked_impulse_damping: STACKED_IMPULSE_DAMPING,
            resting_contact_speed: RESTING_CONTACT_SPEED,

            impact_threshold: IMPACT_THRESHOLD,
            stacked_impact_clamp: STACKED_IMPACT_CLAMP,
            max_impact_strength: MAX_IMPACT_STRENGTH,
            ground_impact_speed: GROUND_IMPACT_SPEED,
            ground_impact_cooldown: GROUND_IMPACT_COOLDOWN,
            max_ground_impacts: MAX_GROUND_IMPACTS,

            behavior: MergeBehavior::Merge,
            merge_distance_fraction: MERGE_DISTANCE_FRACTION,
            min_merge_age: MIN_MERGE_AGE,
            max_merge_speed: MAX_MERGE_SPEED,
            merge_cooldown: MERGE_COOLDOWN,
            min_cluster_size: MIN_CLUSTER_SIZE,
            eliminate_score_multiplier: ELIMINATE_SCORE_MULTIPLIER,
        }
    }
}

impl PhysicsConfig {
    /// Default config with a different merge behavior
    pub fn with_behavior(behavior: MergeBehavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    /// Parse a (possibly partial) JSON document and validate it
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        log::debug!("Loaded physics config (behavior: {})", config.behavior.as_str());
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> EngineResult<()> {
        self.world.validate()?;

        if self.max_bodies == 0 {
            return Err(EngineError::InvalidConfig {
                name: "max_bodies",
                value: 0.0,
                reason: "must allow at least one body",
            });
        }
        if self.min_cluster_size < 2 {
            return Err(EngineError::InvalidConfig {
                name: "min_cluster_size",
                value: self.min_cluster_size as f32,
                reason: "a cluster needs at least two bodies",
            });
        }

        positive("max_dt", self.max_dt)?;
        positive("max_velocity", self.max_velocity)?;
        positive("merge_distance_fraction", self.merge_distance_fraction)?;
        non_negative("gravity", self.gravity)?;
        non_negative("settle_speed", self.settle_speed)?;
        non_negative("sleep_time", self.sleep_time)?;
        non_negative("resting_contact_speed", self.resting_contact_speed)?;

        unit_interval("air_resistance", self.air_resistance)?;
        unit_interval("restitution", self.restitution)?;
        unit_interval("friction", self.friction)?;
        unit_interval("bounce_damping", self.bounce_damping)?;
        unit_interval("position_correction", self.position_correction)?;
        unit_interval("stacked_position_correction", self.stacked_position_correction)?;
        unit_interval("impulse_damping", self.impulse_damping)?;
        unit_interval("stacked_impulse_damping", self.stacked_impulse_damping)?;

        Ok(())
    }
}

fn positive(name: &'static str, value: f32) -> EngineResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig {
            name,
            value,
            reason: "must be positive",
        })
    }
}

fn non_negative(name: &'static str, value: f32) -> EngineResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig {
            name,
            value,
            reason: "must not be negative",
        })
    }
}

fn unit_interval(name: &'static str, value: f32) -> EngineResult<()> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig {
            name,
            value,
            reason: "must be in (0, 1]",
        })
    }
}
