//! Sleep/wake state machine
//!
//! A supported body that stays below `sleep_velocity` for
//! `sleep_time` seconds goes to sleep: it keeps its position, stops
//! integrating, and acts as a stationary obstacle until a strong enough
//! contact wakes it.

use glam::Vec2;

use super::body::RigidBody;
use crate::config::PhysicsConfig;

/// Advance the sleep timer from the body's current (post-contact) velocity.
/// Returns true if the body fell asleep this call.
pub fn update_sleep(body: &mut RigidBody, config: &PhysicsConfig, dt: f32) -> bool {
    if body.is_sleeping || body.is_static {
        return false;
    }

    let v = body.velocity;
    let calm = body.is_supported()
        && v.x.abs() < config.sleep_velocity
        && v.y.abs() < config.sleep_velocity;

    if !calm {
        body.sleep_timer = 0.0;
        return false;
    }

    body.sleep_timer += dt;
    if body.sleep_timer >= config.sleep_time {
        put_to_sleep(body);
        return true;
    }
    false
}

pub fn put_to_sleep(body: &mut RigidBody) {
    body.is_sleeping = true;
    body.velocity = Vec2::ZERO;
    body.acceleration = Vec2::ZERO;
    body.clear_impact_source();
}

/// Wake a body. Returns true if it was asleep.
pub fn wake(body: &mut RigidBody) -> bool {
    body.sleep_timer = 0.0;
    if body.is_sleeping {
        body.is_sleeping = false;
        return true;
    }
    false
}

/// Wake a sleeper whose support went away. Returns true if it woke.
pub fn wake_if_unsupported(body: &mut RigidBody) -> bool {
    if body.is_sleeping && !body.is_static && !body.is_supported() {
        return wake(body);
    }
    false
}

/// Whether a contact is strong enough to wake the bodies involved
#[inline]
pub fn should_wake(strength: f32, overlap: f32, config: &PhysicsConfig) -> bool {
    strength >= config.wake_impulse || overlap >= config.wake_overlap
}
