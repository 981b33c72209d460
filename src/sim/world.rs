//! Rectangular play-field: two side walls and a ground plane
//!
//! Screen coordinates: origin top-left, +y down. The ground's top surface
//! sits at `height - ground_thickness`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::RigidBody;
use crate::config::PhysicsConfig;
use crate::consts::*;
use crate::error::{EngineError, EngineResult};

/// Distance above the ground within which a body still counts as touching
const GROUND_CONTACT_SLOP: f32 = 0.5;

/// Play-field bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct World {
    pub width: f32,
    pub height: f32,
    pub ground_thickness: f32,
    pub left_margin: f32,
    pub right_margin: f32,
}

impl Default for World {
    fn default() -> Self {
        Self {
            width: WORLD_WIDTH,
            height: WORLD_HEIGHT,
            ground_thickness: GROUND_THICKNESS,
            left_margin: WALL_MARGIN,
            right_margin: WALL_MARGIN,
        }
    }
}

impl World {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Y of the ground's top surface
    #[inline]
    pub fn ground_y(&self) -> f32 {
        self.height - self.ground_thickness
    }

    #[inline]
    pub fn left_wall(&self) -> f32 {
        self.left_margin
    }

    #[inline]
    pub fn right_wall(&self) -> f32 {
        self.width - self.right_margin
    }

    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |name, value, reason| EngineError::InvalidConfig {
            name,
            value,
            reason,
        };
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(invalid("world.width", self.width, "must be positive"));
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            return Err(invalid("world.height", self.height, "must be positive"));
        }
        if self.ground_thickness < 0.0 || self.ground_thickness >= self.height {
            return Err(invalid(
                "world.ground_thickness",
                self.ground_thickness,
                "must leave room above the ground",
            ));
        }
        if self.left_margin < 0.0
            || self.right_margin < 0.0
            || self.left_wall() >= self.right_wall()
        {
            return Err(invalid(
                "world.left_margin",
                self.left_margin,
                "margins must leave a play-field between the walls",
            ));
        }
        Ok(())
    }
}

/// Result of constraining one body
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundaryContact {
    /// Touched a side wall
    pub wall: bool,
    /// First ground contact this step (was airborne before)
    pub landed: bool,
    /// Downward speed at the moment of ground contact
    pub impact_speed: f32,
}

/// Clamp a body inside the world, reflecting velocity off walls and ground
pub fn constrain(
    body: &mut RigidBody,
    world: &World,
    config: &PhysicsConfig,
    dt: f32,
) -> BoundaryContact {
    let mut contact = BoundaryContact::default();
    if !body.is_active() {
        return contact;
    }

    let r = body.radius;

    // Side walls: horizontal reflection, friction on the vertical component
    let min_x = world.left_wall() + r;
    let max_x = world.right_wall() - r;
    if min_x > max_x {
        // Body wider than the play-field: pin it to the center
        body.position.x = (world.left_wall() + world.right_wall()) * 0.5;
        body.velocity.x = 0.0;
        contact.wall = true;
    } else if body.position.x < min_x {
        body.position.x = min_x;
        if body.velocity.x < 0.0 {
            body.velocity.x = -body.velocity.x * body.restitution;
        }
        body.velocity.y *= body.friction;
        contact.wall = true;
    } else if body.position.x > max_x {
        body.position.x = max_x;
        if body.velocity.x > 0.0 {
            body.velocity.x = -body.velocity.x * body.restitution;
        }
        body.velocity.y *= body.friction;
        contact.wall = true;
    }

    // Ground
    let max_y = world.ground_y() - r;
    if body.position.y >= max_y - GROUND_CONTACT_SLOP {
        let downward = body.velocity.y.max(0.0);
        if body.position.y > max_y {
            body.position.y = max_y;
        }
        if body.velocity.y > 0.0 {
            body.velocity.y = -body.velocity.y * body.restitution * config.bounce_damping;
        }
        body.velocity.x *= body.friction;
        if body.velocity.x.abs() < config.settle_speed {
            body.velocity.x = 0.0;
        }
        if body.velocity.y.abs() < config.settle_speed {
            body.velocity.y = 0.0;
        }

        if body.bottom_contact {
            body.bottom_contact_duration += dt;
        } else {
            body.bottom_contact = true;
            body.bottom_contact_duration = 0.0;
            contact.landed = true;
            contact.impact_speed = downward;
        }
        // A body resting on the ground no longer counts as falling
        body.clear_impact_source();
    } else if body.bottom_contact {
        body.bottom_contact = false;
        body.bottom_contact_duration = 0.0;
    }

    contact
}

/// Where a body would sit if clamped, without touching its velocity
pub fn clamp_position(position: Vec2, radius: f32, world: &World) -> Vec2 {
    let min_x = world.left_wall() + radius;
    let max_x = (world.right_wall() - radius).max(min_x);
    Vec2::new(
        position.x.clamp(min_x, max_x),
        position.y.min(world.ground_y() - radius),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;

    fn body_at(x: f32, y: f32) -> RigidBody {
        RigidBody::new("A", Vec2::new(x, y), 10.0, 1.0).unwrap()
    }

    #[test]
    fn test_ground_bounce_flips_velocity() {
        let world = World::default();
        let config = PhysicsConfig::default();
        let mut b = body_at(100.0, world.ground_y() - 5.0).with_velocity(Vec2::new(0.0, 600.0));
        let contact = constrain(&mut b, &world, &config, SIM_DT);

        assert!(contact.landed);
        assert_eq!(contact.impact_speed, 600.0);
        assert_eq!(b.position.y, world.ground_y() - 10.0);
        let expected = -600.0 * b.restitution * config.bounce_damping;
        assert!((b.velocity.y - expected).abs() < 1e-3);
        assert!(b.velocity.y < 0.0);
        assert!(b.bottom_contact());
    }

    #[test]
    fn test_small_ground_velocity_zeroed() {
        let world = World::default();
        let config = PhysicsConfig::default();
        let mut b = body_at(100.0, world.ground_y() - 9.0).with_velocity(Vec2::new(3.0, 20.0));
        constrain(&mut b, &world, &config, SIM_DT);
        assert_eq!(b.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_landing_only_reported_once() {
        let world = World::default();
        let config = PhysicsConfig::default();
        let mut b = body_at(100.0, world.ground_y() - 10.0);
        assert!(constrain(&mut b, &world, &config, SIM_DT).landed);
        assert!(!constrain(&mut b, &world, &config, SIM_DT).landed);
        assert!(b.bottom_contact_duration() > 0.0);

        b.position.y = 100.0;
        constrain(&mut b, &world, &config, SIM_DT);
        assert!(!b.bottom_contact());
        assert_eq!(b.bottom_contact_duration(), 0.0);
    }

    #[test]
    fn test_walls_reflect() {
        let world = World::default();
        let config = PhysicsConfig::default();

        let mut left = body_at(0.0, 100.0).with_velocity(Vec2::new(-100.0, 50.0));
        assert!(constrain(&mut left, &world, &config, SIM_DT).wall);
        assert_eq!(left.position.x, world.left_wall() + 10.0);
        assert!(left.velocity.x > 0.0);
        assert!((left.velocity.y - 50.0 * left.friction).abs() < 1e-4);

        let mut right = body_at(world.width, 100.0).with_velocity(Vec2::new(100.0, 0.0));
        constrain(&mut right, &world, &config, SIM_DT);
        assert_eq!(right.position.x, world.right_wall() - 10.0);
        assert!(right.velocity.x < 0.0);
    }

    #[test]
    fn test_ground_clears_impact_source() {
        let world = World::default();
        let config = PhysicsConfig::default();
        let mut b = body_at(100.0, world.ground_y());
        b.mark_impact_source(1.0);
        constrain(&mut b, &world, &config, SIM_DT);
        assert!(!b.is_impact_source());
    }

    #[test]
    fn test_world_validation() {
        assert!(World::default().validate().is_ok());
        assert!(World::new(0.0, 100.0).validate().is_err());
        let mut narrow = World::default();
        narrow.left_margin = 200.0;
        narrow.right_margin = 200.0;
        assert!(narrow.validate().is_err());
    }

    #[test]
    fn test_clamp_position() {
        let world = World::default();
        let p = clamp_position(Vec2::new(-50.0, 10_000.0), 10.0, &world);
        assert_eq!(p, Vec2::new(world.left_wall() + 10.0, world.ground_y() - 10.0));
    }
}
