//! Circle-circle collision detection and impulse response
//!
//! Detection is an all-pairs scan; the body count is capped by config so
//! O(n²) stays cheap. Response separates overlapping bodies, applies a
//! normal impulse plus tangential friction, and reports impacts.
//!
//! The interesting part is damping: bodies resting in a stack absorb
//! contacts gently, while an impact source (a body actually falling onto the
//! pile) hits with full strength. A supported body also carries whatever
//! rests on it as if it were immovable, which keeps tall stacks from sinking.

use glam::Vec2;
use slotmap::SlotMap;

use super::body::{BodyHandle, RigidBody};
use super::events::ImpactEvent;
use super::sleep;
use crate::config::PhysicsConfig;
use crate::safe_normalize;

/// Normal used when two centers coincide
const FALLBACK_NORMAL: Vec2 = Vec2::Y;

/// Vertical component of the contact normal above which the lower body
/// carries the upper one (about 60 degrees from vertical)
const SUPPORT_NORMAL_Y: f32 = 0.5;

/// Two overlapping bodies (valid for the current step only)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionPair {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    /// Center distance
    pub distance: f32,
    /// Sum of radii
    pub min_distance: f32,
    /// Penetration depth
    pub overlap: f32,
}

/// Output of the detection pass
#[derive(Debug, Clone, Default)]
pub struct Contacts {
    /// Pairs that need a response this step
    pub active: Vec<CollisionPair>,
    /// Touching pairs skipped as settled or asleep; kept for clustering only
    pub resting: Vec<CollisionPair>,
}

impl Contacts {
    /// Every touching pair, active first
    pub fn all(&self) -> impl Iterator<Item = &CollisionPair> {
        self.active.iter().chain(self.resting.iter())
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.resting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.resting.is_empty()
    }
}

/// Resting stack contact or dozing pair that is not worth resolving
fn is_quiet_contact(a: &RigidBody, b: &RigidBody, overlap: f32, config: &PhysicsConfig) -> bool {
    let settled = a.is_resting(config.settle_speed)
        && b.is_resting(config.settle_speed)
        && overlap < config.settle_overlap;
    let dozing = a.is_sleeping && b.is_sleeping && overlap < config.wake_overlap;
    settled || dozing
}

/// Test one pair of bodies for overlap
pub fn check_pair(
    handle_a: BodyHandle,
    a: &RigidBody,
    handle_b: BodyHandle,
    b: &RigidBody,
) -> Option<CollisionPair> {
    if a.marked_for_removal || b.marked_for_removal {
        return None;
    }
    if a.is_static && b.is_static {
        return None;
    }

    let distance = a.position.distance(b.position);
    let min_distance = a.radius + b.radius;
    if distance < min_distance {
        Some(CollisionPair {
            body_a: handle_a,
            body_b: handle_b,
            distance,
            min_distance,
            overlap: min_distance - distance,
        })
    } else {
        None
    }
}

/// Find all overlapping pairs, in `handles` order
pub fn detect_collisions(
    bodies: &SlotMap<BodyHandle, RigidBody>,
    handles: &[BodyHandle],
    config: &PhysicsConfig,
) -> Contacts {
    let mut contacts = Contacts::default();

    for (i, &ha) in handles.iter().enumerate() {
        let Some(a) = bodies.get(ha) else { continue };
        for &hb in &handles[i + 1..] {
            let Some(b) = bodies.get(hb) else { continue };
            let Some(pair) = check_pair(ha, a, hb, b) else {
                continue;
            };
            if is_quiet_contact(a, b, pair.overlap, config) {
                contacts.resting.push(pair);
            } else {
                contacts.active.push(pair);
            }
        }
    }

    contacts
}

/// Recompute which bodies are carried, bottom-up from the ground.
///
/// Grounded and static bodies are supported; a body resting on top of a
/// supported body is supported too.
pub fn propagate_support(bodies: &mut SlotMap<BodyHandle, RigidBody>, contacts: &Contacts) {
    for body in bodies.values_mut() {
        body.supported = body.bottom_contact || body.is_static;
    }

    // Each round lifts support at least one body higher; stops when stable
    let mut changed = true;
    let mut rounds = 0;
    while changed && rounds <= bodies.len() {
        changed = false;
        rounds += 1;
        for pair in contacts.all() {
            let (Some(a), Some(b)) = (bodies.get(pair.body_a), bodies.get(pair.body_b)) else {
                continue;
            };
            if a.marked_for_removal || b.marked_for_removal {
                continue;
            }
            // +y is down: positive means B sits below A
            let down = safe_normalize(b.position - a.position).y;
            let upper = if down > SUPPORT_NORMAL_Y && b.supported && !a.supported {
                pair.body_a
            } else if down < -SUPPORT_NORMAL_Y && a.supported && !b.supported {
                pair.body_b
            } else {
                continue;
            };
            if let Some(body) = bodies.get_mut(upper) {
                body.supported = true;
                changed = true;
            }
        }
    }
}

/// Separate a colliding pair and apply impulses.
///
/// Returns an impact event when the velocity change is strong enough to be
/// heard.
pub fn resolve_collision(
    bodies: &mut SlotMap<BodyHandle, RigidBody>,
    pair: &CollisionPair,
    config: &PhysicsConfig,
) -> Option<ImpactEvent> {
    let [a, b] = bodies.get_disjoint_mut([pair.body_a, pair.body_b])?;
    if a.marked_for_removal || b.marked_for_removal {
        return None;
    }

    // Positions may have moved since detection (earlier pairs this step)
    let delta = b.position - a.position;
    let distance = delta.length();
    let overlap = pair.min_distance - distance;
    if overlap <= 0.0 || is_quiet_contact(a, b, overlap, config) {
        return None;
    }

    // Normal points from A to B
    let mut normal = safe_normalize(delta);
    if normal == Vec2::ZERO {
        normal = FALLBACK_NORMAL;
    }

    let either_source = a.is_impact_source || b.is_impact_source;
    let stacked = a.is_supported() && b.is_supported();
    let calm_stack = stacked && !either_source;

    let rel_vel = b.velocity - a.velocity;
    let vel_along_normal = rel_vel.dot(normal);

    let e = a.restitution.min(b.restitution);
    let damping = if either_source {
        1.0
    } else if stacked {
        config.stacked_impulse_damping
    } else {
        config.impulse_damping
    };

    // Velocity change along the normal, independent of mass
    let impulse_strength = if vel_along_normal < 0.0 {
        -(1.0 + e) * vel_along_normal * damping
    } else {
        0.0
    };
    let strength = impulse_strength.min(config.max_impact_strength);

    // A sleeper stays a stationary obstacle unless this contact wakes it
    if sleep::should_wake(strength, overlap, config) {
        sleep::wake(a);
        sleep::wake(b);
    }
    let mut inv_a = if a.is_sleeping { 0.0 } else { a.inv_mass() };
    let mut inv_b = if b.is_sleeping { 0.0 } else { b.inv_mass() };

    // A supported body underneath does not give way to a calm body on top
    if !either_source {
        if normal.y > SUPPORT_NORMAL_Y && b.is_supported() {
            inv_b = 0.0;
        } else if normal.y < -SUPPORT_NORMAL_Y && a.is_supported() {
            inv_a = 0.0;
        }
    }
    let inv_sum = inv_a + inv_b;
    if inv_sum <= 0.0 {
        return None;
    }

    // Positional correction, gentler inside a calm stack
    let fraction = if calm_stack {
        config.stacked_position_correction
    } else {
        config.position_correction
    };
    let correction = normal * (overlap * fraction / inv_sum);
    a.position -= correction * inv_a;
    b.position += correction * inv_b;

    if vel_along_normal > 0.0 {
        // Already separating
        return None;
    }

    let j = impulse_strength / inv_sum;
    let impulse = normal * j;
    a.velocity -= impulse * inv_a;
    b.velocity += impulse * inv_b;

    // Calm stacked and slow contacts end at rest instead of leaking
    // approach speed into the next step
    let approach = (b.velocity - a.velocity).dot(normal);
    if approach < 0.0 && (calm_stack || -vel_along_normal < config.resting_contact_speed) {
        let stop = normal * (-approach / inv_sum);
        a.velocity -= stop * inv_a;
        b.velocity += stop * inv_b;
    }

    // Tangential friction: remove part of the sliding velocity
    let tangent_vel = rel_vel - normal * vel_along_normal;
    let tangent = safe_normalize(tangent_vel);
    if tangent != Vec2::ZERO {
        let grip = 1.0 - (a.friction * b.friction).sqrt();
        let jt = tangent_vel.length() * grip / inv_sum;
        let friction_impulse = tangent * jt;
        a.velocity += friction_impulse * inv_a;
        b.velocity -= friction_impulse * inv_b;
    }

    if strength < config.impact_threshold {
        return None;
    }

    Some(ImpactEvent {
        position: (a.position + b.position) * 0.5,
        strength: if calm_stack {
            strength.min(config.stacked_impact_clamp)
        } else {
            strength
        },
        normal,
        body_a: Some(pair.body_a),
        body_b: Some(pair.body_b),
        impact_source: either_source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with(bodies: Vec<RigidBody>) -> (SlotMap<BodyHandle, RigidBody>, Vec<BodyHandle>) {
        let mut map = SlotMap::with_key();
        let handles = bodies.into_iter().map(|b| map.insert(b)).collect();
        (map, handles)
    }

    fn body(x: f32, y: f32) -> RigidBody {
        RigidBody::new("A", Vec2::new(x, y), 10.0, 1.0).unwrap()
    }

    #[test]
    fn test_detects_overlap() {
        let config = PhysicsConfig::default();
        let (map, handles) = world_with(vec![body(0.0, 0.0), body(15.0, 0.0), body(100.0, 0.0)]);
        let contacts = detect_collisions(&map, &handles, &config);
        assert_eq!(contacts.active.len(), 1);
        let pair = contacts.active[0];
        assert_eq!(pair.body_a, handles[0]);
        assert_eq!(pair.body_b, handles[1]);
        assert!((pair.overlap - 5.0).abs() < 1e-4);
        assert_eq!(pair.min_distance, 20.0);
    }

    #[test]
    fn test_skips_removed_bodies() {
        let config = PhysicsConfig::default();
        let mut gone = body(5.0, 0.0);
        gone.tombstone();
        let (map, handles) = world_with(vec![body(0.0, 0.0), gone]);
        assert!(detect_collisions(&map, &handles, &config).is_empty());
    }

    #[test]
    fn test_settled_pair_is_resting() {
        let config = PhysicsConfig::default();
        let mut a = body(0.0, 0.0);
        let mut b = body(19.8, 0.0);
        a.bottom_contact = true;
        b.bottom_contact = true;
        let (map, handles) = world_with(vec![a, b]);
        let contacts = detect_collisions(&map, &handles, &config);
        assert!(contacts.active.is_empty());
        assert_eq!(contacts.resting.len(), 1);
    }

    #[test]
    fn test_sleeping_pair_is_resting() {
        let config = PhysicsConfig::default();
        let mut a = body(0.0, 0.0);
        let mut b = body(19.5, 0.0);
        sleep::put_to_sleep(&mut a);
        sleep::put_to_sleep(&mut b);
        let (map, handles) = world_with(vec![a, b]);
        let contacts = detect_collisions(&map, &handles, &config);
        assert_eq!(contacts.resting.len(), 1);
    }

    #[test]
    fn test_resolution_separates_and_bounces() {
        let config = PhysicsConfig::default();
        let a = body(0.0, 0.0).with_velocity(Vec2::new(100.0, 0.0));
        let b = body(15.0, 0.0).with_velocity(Vec2::new(-100.0, 0.0));
        let (mut map, handles) = world_with(vec![a, b]);
        let contacts = detect_collisions(&map, &handles, &config);
        let event = resolve_collision(&mut map, &contacts.active[0], &config);

        let (a, b) = (&map[handles[0]], &map[handles[1]]);
        assert!(b.position.x - a.position.x > 15.0);
        assert!(a.velocity.x < 100.0);
        assert!(b.velocity.x > -100.0);
        let event = event.expect("head-on hit should report an impact");
        assert!(event.strength >= config.impact_threshold);
        assert!((event.normal - Vec2::X).length() < 1e-5);
    }

    #[test]
    fn test_separating_pair_gets_no_impulse() {
        let config = PhysicsConfig::default();
        let a = body(0.0, 0.0).with_velocity(Vec2::new(-50.0, 0.0));
        let b = body(15.0, 0.0).with_velocity(Vec2::new(50.0, 0.0));
        let (mut map, handles) = world_with(vec![a, b]);
        let contacts = detect_collisions(&map, &handles, &config);
        assert!(resolve_collision(&mut map, &contacts.active[0], &config).is_none());
        assert_eq!(map[handles[0]].velocity.x, -50.0);
        assert_eq!(map[handles[1]].velocity.x, 50.0);
    }

    #[test]
    fn test_static_body_does_not_move() {
        let config = PhysicsConfig::default();
        let wall = body(0.0, 0.0).into_static();
        let mut ball = body(0.0, -15.0).with_velocity(Vec2::new(0.0, 200.0));
        ball.mark_impact_source(1.0);
        let (mut map, handles) = world_with(vec![wall, ball]);
        let contacts = detect_collisions(&map, &handles, &config);
        resolve_collision(&mut map, &contacts.active[0], &config);
        assert_eq!(map[handles[0]].position, Vec2::ZERO);
        assert!(map[handles[1]].velocity.y < 0.0);
    }

    #[test]
    fn test_coincident_centers_still_separate() {
        let config = PhysicsConfig::default();
        let (mut map, handles) = world_with(vec![body(50.0, 50.0), body(50.0, 50.0)]);
        let contacts = detect_collisions(&map, &handles, &config);
        resolve_collision(&mut map, &contacts.active[0], &config);
        let d = map[handles[0]].position.distance(map[handles[1]].position);
        assert!(d > 0.0);
        assert!(map[handles[0]].position.is_finite());
    }

    #[test]
    fn test_stacked_contact_is_damped() {
        let config = PhysicsConfig::default();
        let make = |stacked: bool| {
            let mut a = body(0.0, 0.0).with_velocity(Vec2::new(100.0, 0.0));
            let mut b = body(18.0, 0.0).with_velocity(Vec2::new(-100.0, 0.0));
            a.bottom_contact = stacked;
            b.bottom_contact = stacked;
            let (mut map, handles) = world_with(vec![a, b]);
            let contacts = detect_collisions(&map, &handles, &config);
            let event = resolve_collision(&mut map, &contacts.active[0], &config);
            (map[handles[1]].velocity.x - map[handles[0]].velocity.x, event)
        };
        let (free_closing, free_event) = make(false);
        let (stacked_closing, stacked_event) = make(true);
        // A calm stacked pair absorbs the approach; a loose pair keeps some of it
        assert!(stacked_closing.abs() < 1e-4);
        assert!(free_closing < 0.0);
        let stacked_event = stacked_event.expect("still loud enough to report");
        assert!(stacked_event.strength <= config.stacked_impact_clamp);
        assert!(free_event.unwrap().strength > config.stacked_impact_clamp);
    }

    #[test]
    fn test_support_propagates_up_a_stack() {
        let config = PhysicsConfig::default();
        let mut bottom = body(100.0, 100.0);
        bottom.bottom_contact = true;
        let middle = body(100.0, 82.0);
        let top = body(100.0, 64.0);
        let loose = body(300.0, 64.0);
        let (mut map, handles) = world_with(vec![top, middle, bottom, loose]);
        let contacts = detect_collisions(&map, &handles, &config);
        propagate_support(&mut map, &contacts);
        assert!(map[handles[0]].is_supported());
        assert!(map[handles[1]].is_supported());
        assert!(map[handles[2]].is_supported());
        assert!(!map[handles[3]].is_supported());
    }

    #[test]
    fn test_supported_body_carries_resting_load() {
        let config = PhysicsConfig::default();
        let mut bottom = body(100.0, 100.0);
        bottom.bottom_contact = true;
        // Top has picked up one step of gravity
        let top = body(100.0, 81.0).with_velocity(Vec2::new(0.0, 20.0));
        let (mut map, handles) = world_with(vec![bottom, top]);
        let contacts = detect_collisions(&map, &handles, &config);
        propagate_support(&mut map, &contacts);
        let event = resolve_collision(&mut map, &contacts.active[0], &config);

        assert!(event.is_none());
        assert_eq!(map[handles[0]].position, Vec2::new(100.0, 100.0));
        assert_eq!(map[handles[0]].velocity, Vec2::ZERO);
        assert!(map[handles[1]].velocity.y.abs() < 1e-4);
    }

    #[test]
    fn test_strong_hit_wakes_sleeper() {
        let config = PhysicsConfig::default();
        let mut sleeper = body(0.0, 0.0);
        sleep::put_to_sleep(&mut sleeper);
        let falling = body(0.0, -18.0).with_velocity(Vec2::new(0.0, 400.0));
        let (mut map, handles) = world_with(vec![sleeper, falling]);
        let contacts = detect_collisions(&map, &handles, &config);
        resolve_collision(&mut map, &contacts.active[0], &config);
        assert!(!map[handles[0]].is_sleeping());
    }

    #[test]
    fn test_weak_contact_leaves_sleeper_still() {
        let config = PhysicsConfig::default();
        let mut sleeper = body(100.0, 100.0);
        sleeper.bottom_contact = true;
        sleep::put_to_sleep(&mut sleeper);
        let mut slider = body(118.0, 100.0).with_velocity(Vec2::new(-20.0, 0.0));
        slider.bottom_contact = true;
        let (mut map, handles) = world_with(vec![sleeper, slider]);
        let contacts = detect_collisions(&map, &handles, &config);
        let event = resolve_collision(&mut map, &contacts.active[0], &config);

        assert!(event.is_none());
        let sleeper = &map[handles[0]];
        assert!(sleeper.is_sleeping());
        assert_eq!(sleeper.velocity, Vec2::ZERO);
        assert_eq!(sleeper.position, Vec2::new(100.0, 100.0));
        // The slider stops against it and is pushed back out
        assert!(map[handles[1]].velocity.x.abs() < 1e-4);
        assert!(map[handles[1]].position.x > 118.0);
    }
}
