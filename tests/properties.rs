//! Property tests for the physics engine

use fruit_merge::consts::SIM_DT;
use fruit_merge::sim::{PhysicsEngine, RigidBody};
use fruit_merge::{MergeBehavior, PhysicsConfig, TierTable, Vector2};
use proptest::prelude::*;

fn engine(behavior: MergeBehavior) -> PhysicsEngine {
    PhysicsEngine::new(PhysicsConfig::with_behavior(behavior), TierTable::fruit()).unwrap()
}

fn body_strategy() -> impl Strategy<Value = (f32, f32, f32, f32, f32)> {
    (
        20.0f32..355.0,   // x
        20.0f32..600.0,   // y
        -600.0f32..600.0, // vx
        -600.0f32..600.0, // vy
        5.0f32..30.0,     // radius
    )
}

proptest! {
    #[test]
    fn bodies_stay_inside_the_container(
        specs in prop::collection::vec(body_strategy(), 1..12),
        steps in 1usize..90,
    ) {
        let mut engine = engine(MergeBehavior::Merge);
        for (i, &(x, y, vx, vy, r)) in specs.iter().enumerate() {
            let body = RigidBody::new(format!("B{}", i).as_str(), Vector2::new(x, y), r, 1.0)
                .unwrap()
                .with_velocity(Vector2::new(vx, vy));
            engine.add_body(body).unwrap();
        }

        let world = *engine.world();
        for _ in 0..steps {
            engine.step(SIM_DT);
            for (_, b) in engine.bodies() {
                let p = b.position();
                prop_assert!(p.is_finite());
                prop_assert!(p.x >= world.left_wall() + b.radius() - 1e-3);
                prop_assert!(p.x <= world.right_wall() - b.radius() + 1e-3);
                prop_assert!(p.y <= world.ground_y() - b.radius() + 1e-3);
            }
        }
    }

    #[test]
    fn invalid_dimensions_are_rejected(radius in -50.0f32..=0.0, mass in -50.0f32..=0.0) {
        prop_assert!(RigidBody::new("A", Vector2::ZERO, radius, 1.0).is_err());
        prop_assert!(RigidBody::new("A", Vector2::ZERO, 1.0, mass).is_err());
    }

    #[test]
    fn removed_bodies_never_reappear(
        specs in prop::collection::vec(body_strategy(), 2..10),
        victim in any::<prop::sample::Index>(),
    ) {
        let mut engine = engine(MergeBehavior::Eliminate);
        let handles: Vec<_> = specs
            .iter()
            .map(|&(x, y, vx, vy, _)| {
                let body = RigidBody::new("CHERRY", Vector2::new(x, y), 12.0, 1.0)
                    .unwrap()
                    .with_velocity(Vector2::new(vx, vy));
                engine.add_body(body).unwrap()
            })
            .collect();
        let victim = handles[victim.index(handles.len())];
        engine.mark_for_removal(victim).unwrap();

        for _ in 0..30 {
            let report = engine.step(SIM_DT);
            prop_assert!(engine.body(victim).is_none());
            prop_assert!(report.impacts().all(|i| !i.involves(victim)));
            for e in report.eliminations() {
                prop_assert!(!e.members.contains(&victim));
            }
        }
    }

    #[test]
    fn a_lone_body_settles_and_stays_put(x in 30.0f32..345.0, y in 30.0f32..500.0) {
        let mut engine = engine(MergeBehavior::Merge);
        let handle = engine
            .add_body(RigidBody::new("STONE", Vector2::new(x, y), 15.0, 1.0).unwrap())
            .unwrap();
        for _ in 0..300 {
            engine.step(SIM_DT);
        }
        let body = engine.body(handle).unwrap();
        prop_assert!(body.is_sleeping());
        let rest = body.position();
        for _ in 0..30 {
            engine.step(SIM_DT);
        }
        prop_assert_eq!(engine.body(handle).unwrap().position(), rest);
        prop_assert!(engine.is_world_settled());
    }
}
