//! Deterministic simulation module
//!
//! All physics lives here. This module must be pure and deterministic:
//! - Caller-supplied timestep only (sanitized, never wall-clock)
//! - Stable iteration order (by body handle)
//! - No rendering or platform dependencies

pub mod body;
pub mod clock;
pub mod cluster;
pub mod collision;
pub mod engine;
pub mod events;
pub mod integrator;
pub mod sleep;
pub mod world;

pub use body::{BodyHandle, BodyType, RigidBody};
pub use clock::FixedStepper;
pub use cluster::Cluster;
pub use collision::{CollisionPair, Contacts};
pub use engine::{EngineStats, PhysicsEngine, StepReport};
pub use events::{ClusterEvent, EliminateEvent, EventBus, ImpactEvent, MergeEvent, SimEvent};
pub use world::{BoundaryContact, World};
