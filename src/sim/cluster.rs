//! Same-type merge and cluster elimination
//!
//! Both passes work off the step's contact set. Merge fuses qualifying
//! pairs one at a time; elimination runs a breadth-first search over the
//! same-type contact graph and removes every component that is large enough.
//! Tombstoned bodies are skipped, so no body joins two merges or clusters.

use std::collections::{HashMap, HashSet, VecDeque};

use glam::Vec2;
use slotmap::SlotMap;

use super::body::{BodyHandle, BodyType, RigidBody};
use super::collision::{CollisionPair, Contacts};
use super::events::{EliminateEvent, MergeEvent};
use crate::catalog::TierTable;
use crate::config::PhysicsConfig;

/// Connected same-type bodies (valid for the current step only)
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub body_type: BodyType,
    pub members: Vec<BodyHandle>,
}

/// Same type, both eligible, and close enough to count as touching
fn linked(a: &RigidBody, b: &RigidBody, config: &PhysicsConfig) -> bool {
    if a.body_type != b.body_type || !a.merge_ready() || !b.merge_ready() {
        return false;
    }
    let reach = (a.radius + b.radius) * config.merge_distance_fraction;
    a.position.distance(b.position) <= reach
}

/// Mass-weighted position and velocity of a set of bodies
fn centroid(bodies: &SlotMap<BodyHandle, RigidBody>, members: &[BodyHandle]) -> (Vec2, Vec2) {
    let mut mass = 0.0;
    let mut pos = Vec2::ZERO;
    let mut vel = Vec2::ZERO;
    for body in members.iter().filter_map(|&h| bodies.get(h)) {
        mass += body.mass;
        pos += body.position * body.mass;
        vel += body.velocity * body.mass;
    }
    if mass > 0.0 {
        (pos / mass, vel / mass)
    } else {
        (Vec2::ZERO, Vec2::ZERO)
    }
}

/// Merge every qualifying same-type pair into the next tier
pub fn find_merges(
    bodies: &mut SlotMap<BodyHandle, RigidBody>,
    contacts: &Contacts,
    config: &PhysicsConfig,
    tiers: &TierTable,
) -> Vec<MergeEvent> {
    let mut merges = Vec::new();

    for pair in contacts.all() {
        let (Some(a), Some(b)) = (bodies.get(pair.body_a), bodies.get(pair.body_b)) else {
            continue;
        };
        if !linked(a, b, config) {
            continue;
        }
        // Fresh or fast bodies wait
        if a.age < config.min_merge_age || b.age < config.min_merge_age {
            continue;
        }
        if a.speed() > config.max_merge_speed || b.speed() > config.max_merge_speed {
            continue;
        }
        let Some(new_type) = tiers.next_tier(&a.body_type).cloned() else {
            continue;
        };

        let old_type = a.body_type.clone();
        let consumed = [pair.body_a, pair.body_b];
        let (position, velocity) = centroid(bodies, &consumed);

        for handle in consumed {
            if let Some(body) = bodies.get_mut(handle) {
                body.start_merge_cooldown(config.merge_cooldown);
                body.tombstone();
            }
        }

        log::debug!("Merge {} + {} -> {} at {:?}", old_type, old_type, new_type, position);
        merges.push(MergeEvent {
            old_type,
            new_type,
            position,
            velocity,
            consumed,
        });
    }

    merges
}

/// Adjacency lists over linked pairs accepted by `include`, with nodes in
/// first-seen order so traversal is deterministic
fn build_graph(
    bodies: &SlotMap<BodyHandle, RigidBody>,
    pairs: impl Iterator<Item = CollisionPair>,
    config: &PhysicsConfig,
    include: impl Fn(&RigidBody) -> bool,
) -> (Vec<BodyHandle>, HashMap<BodyHandle, Vec<BodyHandle>>) {
    let mut order = Vec::new();
    let mut adjacency: HashMap<BodyHandle, Vec<BodyHandle>> = HashMap::new();

    for pair in pairs {
        let (Some(a), Some(b)) = (bodies.get(pair.body_a), bodies.get(pair.body_b)) else {
            continue;
        };
        if !include(a) || !include(b) || !linked(a, b, config) {
            continue;
        }
        for (from, to) in [(pair.body_a, pair.body_b), (pair.body_b, pair.body_a)] {
            adjacency
                .entry(from)
                .or_insert_with(|| {
                    order.push(from);
                    Vec::new()
                })
                .push(to);
        }
    }

    (order, adjacency)
}

/// Breadth-first walk from `seed`, marking bodies in `visited`
fn walk(
    seed: BodyHandle,
    adjacency: &HashMap<BodyHandle, Vec<BodyHandle>>,
    visited: &mut HashSet<BodyHandle>,
) -> Vec<BodyHandle> {
    let mut members = Vec::new();
    if !visited.insert(seed) {
        return members;
    }
    let mut queue = VecDeque::from([seed]);
    while let Some(current) = queue.pop_front() {
        members.push(current);
        for &next in adjacency.get(&current).into_iter().flatten() {
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }
    members
}

/// All connected same-type components with at least `min_size` members
pub fn connected_clusters(
    bodies: &SlotMap<BodyHandle, RigidBody>,
    contacts: &Contacts,
    config: &PhysicsConfig,
    min_size: usize,
) -> Vec<Cluster> {
    let (order, adjacency) = build_graph(bodies, contacts.all().copied(), config, |_| true);
    let mut visited = HashSet::new();
    let mut clusters = Vec::new();

    for seed in order {
        let members = walk(seed, &adjacency, &mut visited);
        if members.len() >= min_size {
            let body_type = bodies[seed].body_type.clone();
            clusters.push(Cluster { body_type, members });
        }
    }

    clusters
}

/// Tombstone a cluster and describe it
fn eliminate(
    bodies: &mut SlotMap<BodyHandle, RigidBody>,
    cluster: Cluster,
    config: &PhysicsConfig,
    tiers: &TierTable,
) -> EliminateEvent {
    let (position, _) = centroid(bodies, &cluster.members);
    let base: u64 = cluster
        .members
        .iter()
        .map(|_| u64::from(tiers.score(&cluster.body_type)))
        .sum();
    let score = (base as f32 * config.eliminate_score_multiplier).round().max(0.0) as u64;

    for &handle in &cluster.members {
        if let Some(body) = bodies.get_mut(handle) {
            body.tombstone();
        }
    }

    log::debug!(
        "Eliminated {} x{} at {:?} (+{})",
        cluster.body_type,
        cluster.members.len(),
        position,
        score
    );
    EliminateEvent {
        body_type: cluster.body_type,
        position,
        count: cluster.members.len(),
        score,
        members: cluster.members,
    }
}

/// Remove every same-type cluster of at least `min_cluster_size`
pub fn find_eliminations(
    bodies: &mut SlotMap<BodyHandle, RigidBody>,
    contacts: &Contacts,
    config: &PhysicsConfig,
    tiers: &TierTable,
) -> Vec<EliminateEvent> {
    connected_clusters(bodies, contacts, config, config.min_cluster_size)
        .into_iter()
        .map(|cluster| eliminate(bodies, cluster, config, tiers))
        .collect()
}

/// Cluster search seeded from a body that just landed, restricted to
/// ground-contacting bodies of its type
pub fn eliminate_from_landing(
    bodies: &mut SlotMap<BodyHandle, RigidBody>,
    contacts: &Contacts,
    seed: BodyHandle,
    config: &PhysicsConfig,
    tiers: &TierTable,
) -> Option<EliminateEvent> {
    let seed_body = bodies.get(seed)?;
    if !seed_body.merge_ready() {
        return None;
    }

    let (_, adjacency) =
        build_graph(bodies, contacts.all().copied(), config, |b| b.bottom_contact);
    let members = walk(seed, &adjacency, &mut HashSet::new());
    if members.len() < config.min_cluster_size {
        return None;
    }

    let body_type = seed_body.body_type.clone();
    Some(eliminate(
        bodies,
        Cluster { body_type, members },
        config,
        tiers,
    ))
}
