//! Per-body semi-implicit Euler integration
//!
//! Gravity is applied as a mass-proportional force, velocity is damped by
//! air resistance and clamped, then position advances. The caller passes an
//! already sanitized `dt`.

use glam::Vec2;

use super::body::RigidBody;
use super::sleep;
use crate::config::PhysicsConfig;

/// Advance one body by `dt` seconds
pub fn integrate(body: &mut RigidBody, config: &PhysicsConfig, dt: f32) {
    if !body.is_active() {
        return;
    }

    body.tick_timers(dt);

    if body.is_sleeping {
        body.velocity = Vec2::ZERO;
        body.acceleration = Vec2::ZERO;
        return;
    }

    // Velocity here is what the previous step's contacts left behind
    if sleep::update_sleep(body, config, dt) {
        return;
    }
    if body.speed() < config.settle_speed {
        body.calm_timer += dt;
    } else {
        body.calm_timer = 0.0;
    }

    body.apply_force(Vec2::new(0.0, config.gravity * body.mass));

    let mut vel = body.velocity + body.acceleration * dt;
    vel *= config.air_resistance;

    if body.is_supported() {
        if vel.x.abs() < config.settle_speed {
            vel.x = 0.0;
        }
        if vel.y.abs() < config.settle_speed {
            vel.y = 0.0;
        }
    }

    vel = vel.clamp_length_max(config.max_velocity);
    if !vel.is_finite() {
        vel = Vec2::ZERO;
    }
    body.velocity = vel;

    // Screen space: +y is down. A body carried by the stack is not falling
    // even when a hit pushes it downward.
    if !body.is_supported() && vel.y > config.impact_source_speed {
        body.mark_impact_source(config.impact_source_duration);
    }

    body.position += vel * dt;
    body.acceleration = Vec2::ZERO;
}
