//! Body tiers: size, mass, score and upgrade chain
//!
//! The engine only needs two facts per type: which tier a merge produces
//! and what a body is worth when eliminated. The rest lets callers spawn
//! bodies of the right size.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::sim::{BodyType, MergeEvent, RigidBody};

/// Radius scale applied to the stock fruit table
pub const FRUIT_RADIUS_SCALE: f32 = 0.65;

/// Score used for types missing from the table
pub const DEFAULT_SCORE: u32 = 1;

/// One tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSpec {
    pub name: BodyType,
    pub radius: f32,
    pub mass: f32,
    pub score: u32,
    /// Tier produced by merging two of these (`None` = top of the chain)
    #[serde(default)]
    pub next: Option<BodyType>,
}

impl TierSpec {
    pub fn new(name: &str, radius: f32, mass: f32, score: u32, next: Option<&str>) -> Self {
        Self {
            name: BodyType::from(name),
            radius,
            mass,
            score,
            next: next.map(BodyType::from),
        }
    }
}

/// Ordered tier list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierTable {
    tiers: Vec<TierSpec>,
}

impl TierTable {
    pub fn new(tiers: Vec<TierSpec>) -> Self {
        Self { tiers }
    }

    /// Stock fruit chain, cherry up to watermelon, plus non-merging extras
    pub fn fruit() -> Self {
        let s = FRUIT_RADIUS_SCALE;
        Self::new(vec![
            TierSpec::new("CHERRY", 32.0 * s, 0.8, 1, Some("STRAWBERRY")),
            TierSpec::new("STRAWBERRY", 32.0 * s, 1.0, 3, Some("GRAPE")),
            TierSpec::new("GRAPE", 32.0 * s, 1.3, 6, Some("LEMON")),
            TierSpec::new("LEMON", 48.0 * s, 1.6, 10, Some("ORANGE")),
            TierSpec::new("ORANGE", 64.0 * s, 2.0, 15, Some("APPLE")),
            TierSpec::new("APPLE", 64.0 * s, 2.5, 21, Some("KIWI")),
            TierSpec::new("KIWI", 48.0 * s, 3.2, 28, Some("TOMATO")),
            TierSpec::new("TOMATO", 48.0 * s, 4.0, 36, Some("COCONUT")),
            TierSpec::new("COCONUT", 96.0 * s, 5.0, 45, Some("WATERMELON")),
            TierSpec::new("WATERMELON", 128.0 * s, 6.5, 45, None),
            TierSpec::new("BLUEBERRY", 32.0 * s, 0.7, 2, None),
            TierSpec::new("PEACH", 64.0 * s, 2.2, 18, None),
            TierSpec::new("PEAR", 64.0 * s, 2.8, 22, None),
            TierSpec::new("MANGO", 64.0 * s, 3.0, 26, None),
            TierSpec::new("PINEAPPLE", 96.0 * s, 5.4, 48, None),
        ])
    }

    /// Parse a JSON array of tiers
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let table: Self = serde_json::from_str(json)?;
        for tier in &table.tiers {
            if !(tier.radius.is_finite() && tier.radius > 0.0) {
                return Err(EngineError::InvalidConfig {
                    name: "tier.radius",
                    value: tier.radius,
                    reason: "must be positive",
                });
            }
            if !(tier.mass.is_finite() && tier.mass > 0.0) {
                return Err(EngineError::InvalidConfig {
                    name: "tier.mass",
                    value: tier.mass,
                    reason: "must be positive",
                });
            }
        }
        Ok(table)
    }

    pub fn get(&self, body_type: &BodyType) -> Option<&TierSpec> {
        self.tiers.iter().find(|t| &t.name == body_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TierSpec> {
        self.tiers.iter()
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Tier a merge of `body_type` produces
    pub fn next_tier(&self, body_type: &BodyType) -> Option<&BodyType> {
        self.get(body_type).and_then(|t| t.next.as_ref())
    }

    /// Base score of one body of this type
    pub fn score(&self, body_type: &BodyType) -> u32 {
        self.get(body_type).map(|t| t.score).unwrap_or(DEFAULT_SCORE)
    }

    /// Tiers that can be dropped by the player (everything below the top
    /// of an upgrade chain)
    pub fn starter_types(&self) -> Vec<BodyType> {
        self.tiers
            .iter()
            .filter(|t| t.next.is_some())
            .map(|t| t.name.clone())
            .collect()
    }

    /// Build a body of the given tier
    pub fn spawn(&self, body_type: &BodyType, position: Vec2) -> EngineResult<RigidBody> {
        let tier = self
            .get(body_type)
            .ok_or_else(|| EngineError::UnknownType(body_type.to_string()))?;
        RigidBody::new(tier.name.clone(), position, tier.radius, tier.mass)
    }

    /// Build the upgraded body a merge event asks for
    pub fn spawn_merged(&self, event: &MergeEvent, merge_cooldown: f32) -> EngineResult<RigidBody> {
        Ok(self
            .spawn(&event.new_type, event.position)?
            .with_velocity(event.velocity)
            .with_merge_cooldown(merge_cooldown))
    }
}
