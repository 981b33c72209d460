//! Fruit Merge headless demo
//!
//! Drops random starter fruit into the default container and lets the
//! engine merge them, logging what happens. Deterministic for a given seed.
//!
//! Usage: `fruit-merge [seed] [behavior] [config.json]`
//!
//! `behavior` is `merge`, `eliminate` or `eliminate_on_landing` and overrides
//! the config file.

use std::cell::RefCell;
use std::rc::Rc;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use fruit_merge::consts::SIM_DT;
use fruit_merge::sim::{ClusterEvent, FixedStepper, PhysicsEngine};
use fruit_merge::{EngineError, EngineResult, MergeBehavior, PhysicsConfig, TierTable, Vector2};

/// Seconds of simulated play
const DEMO_DURATION: f32 = 60.0;
/// Seconds between drops
const DROP_INTERVAL: f32 = 0.8;
/// Only the smallest tiers are dropped by the player
const DROP_TIERS: usize = 5;
/// Height above which a settled stack ends the run
const LOSE_LINE_Y: f32 = 120.0;

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(42_u64);
    let behavior = args.next().map(|name| match MergeBehavior::from_str(&name) {
        Some(behavior) => behavior,
        None => {
            log::error!("Unknown behavior {:?}", name);
            std::process::exit(1);
        }
    });
    let mut config = match args.next() {
        Some(path) => match load_config(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Could not load {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => PhysicsConfig::default(),
    };
    if let Some(behavior) = behavior {
        config.behavior = behavior;
    }

    if let Err(e) = run(seed, config) {
        log::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: &str) -> EngineResult<PhysicsConfig> {
    let json = std::fs::read_to_string(path)?;
    PhysicsConfig::from_json(&json)
}

fn run(seed: u64, config: PhysicsConfig) -> EngineResult<()> {
    log::info!("Fruit Merge demo starting (seed {})", seed);

    let tiers = TierTable::fruit();
    let starters: Vec<_> = tiers.starter_types().into_iter().take(DROP_TIERS).collect();
    if starters.is_empty() {
        return Err(EngineError::UnknownType("any droppable tier".to_string()));
    }
    let mut engine = PhysicsEngine::new(config, tiers)?;
    let mut rng = Pcg32::seed_from_u64(seed);

    let score = Rc::new(RefCell::new(0_u64));
    {
        let score = Rc::clone(&score);
        let tiers = engine.tiers().clone();
        engine.on_merge(move |event| match event {
            ClusterEvent::Merge(m) => {
                *score.borrow_mut() += u64::from(tiers.score(&m.new_type));
                log::info!("{} + {} -> {}", m.old_type, m.old_type, m.new_type);
            }
            ClusterEvent::Eliminate(e) => {
                *score.borrow_mut() += e.score;
                log::info!("Cleared {} x{}", e.body_type, e.count);
            }
        });
    }
    engine.on_impact(|impact| {
        log::trace!("Impact {:.0} at {:?}", impact.strength, impact.position);
    });

    let mut stepper = FixedStepper::new();
    let mut elapsed = 0.0;
    let mut next_drop = 0.0;

    while elapsed < DEMO_DURATION {
        if elapsed >= next_drop {
            next_drop += DROP_INTERVAL;
            let body_type = &starters[rng.random_range(0..starters.len())];
            let world = *engine.world();
            let x = rng.random_range(world.left_wall() + 30.0..world.right_wall() - 30.0);
            match engine.spawn(body_type.as_str(), Vector2::new(x, 40.0)) {
                Ok(_) => log::debug!("Dropped {} at x={:.0}", body_type, x),
                Err(e) => log::warn!("Drop skipped: {}", e),
            }
        }

        for report in stepper.advance(&mut engine, SIM_DT) {
            for merge in report.merges() {
                if let Err(e) = engine.spawn_merged(merge) {
                    log::warn!("Could not spawn {}: {}", merge.new_type, e);
                }
            }
        }
        elapsed += SIM_DT;

        if engine.is_world_settled() && engine.stack_top_y() < LOSE_LINE_Y {
            log::info!("Stack reached the top after {:.1}s", elapsed);
            break;
        }
    }

    let stats = engine.stats();
    log::info!(
        "Done: {} bodies ({} asleep), {} merges, {} impacts, score {}",
        stats.bodies,
        stats.sleeping,
        stats.merges,
        stats.impacts,
        score.borrow()
    );
    match serde_json::to_string(&stats) {
        Ok(json) => println!("{}", json),
        Err(e) => log::warn!("Could not serialize stats: {}", e),
    }
    Ok(())
}
