//! Fixed-timestep accumulator
//!
//! Turns variable frame times into whole `SIM_DT` steps so the engine sees
//! the same timestep no matter the frame rate.

use super::engine::{PhysicsEngine, StepReport};
use crate::consts::{MAX_SUBSTEPS, SIM_DT};

#[derive(Debug, Clone)]
pub struct FixedStepper {
    accumulator: f32,
    step_dt: f32,
    max_substeps: u32,
}

impl Default for FixedStepper {
    fn default() -> Self {
        Self::new()
    }
}

impl FixedStepper {
    pub fn new() -> Self {
        Self::with_step(SIM_DT, MAX_SUBSTEPS)
    }

    pub fn with_step(step_dt: f32, max_substeps: u32) -> Self {
        Self {
            accumulator: 0.0,
            step_dt: if step_dt.is_finite() && step_dt > 0.0 { step_dt } else { SIM_DT },
            max_substeps: max_substeps.max(1),
        }
    }

    /// Feed one frame's elapsed time (capped at the engine's `max_dt`) and
    /// run as many steps as fit
    pub fn advance(&mut self, engine: &mut PhysicsEngine, frame_dt: f32) -> Vec<StepReport> {
        let max_dt = engine.config().max_dt;
        let frame_dt = if frame_dt.is_finite() { frame_dt.clamp(0.0, max_dt) } else { 0.0 };
        self.accumulator += frame_dt;

        let mut reports = Vec::new();
        let mut substeps = 0;
        while self.accumulator >= self.step_dt && substeps < self.max_substeps {
            reports.push(engine.step(self.step_dt));
            self.accumulator -= self.step_dt;
            substeps += 1;
        }

        // Prevent spiral of death: drop whatever a slow frame left behind
        if substeps == self.max_substeps && self.accumulator >= self.step_dt {
            log::debug!("Dropping {:.3}s of simulation backlog", self.accumulator);
            self.accumulator %= self.step_dt;
        }

        reports
    }

    /// Fraction of a step left in the accumulator, for render interpolation
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.step_dt
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
