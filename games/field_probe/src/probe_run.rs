use std::time::{Duration, Instant};

use anyhow::{ensure, Result};
use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rusgrav::{
    debug_print,
    engine::{FieldProbe, FieldScene, GravityBody, GravityField, GravityManager},
};
use tracing::info;

/// Largest allowed gap between batched and direct gravity, per component
const CROSS_CHECK_TOLERANCE: f32 = 1e-3;

pub struct Ball {
    position: Vec3,
    gravity: Vec3,
}

impl GravityBody for Ball {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn apply_gravity(&mut self, acceleration: Vec3) {
        self.gravity = acceleration;
    }
}

pub struct ProbeRun {
    manager: GravityManager,
    field: GravityField,
    balls: Vec<Ball>,
    rng: StdRng,
    tick_times: Vec<Duration>,
}

impl ProbeRun {
    pub fn new(scene: &FieldScene, body_count: usize, seed: u64) -> Result<Self> {
        let manager = GravityManager::from_scene(scene)?;
        let field = GravityField::new(scene.arrows.clone())
            .with_acceleration(scene.config.gravity_acceleration)?
            .with_policy(scene.config.degenerate)?;

        let mut rng = StdRng::seed_from_u64(seed);
        let balls = (0..body_count)
            .map(|_| Ball {
                position: spawn_point(&mut rng),
                gravity: Vec3::ZERO,
            })
            .collect();

        Ok(Self {
            manager,
            field,
            balls,
            rng,
            tick_times: Vec::new(),
        })
    }

    pub fn run(&mut self, ticks: usize) -> Result<()> {
        for tick in 0..ticks {
            // Bodies jitter between ticks so every step sees fresh positions
            for ball in &mut self.balls {
                ball.position += Vec3::new(
                    self.rng.random_range(-0.5..0.5),
                    self.rng.random_range(-0.5..0.5),
                    self.rng.random_range(-0.5..0.5),
                );
            }

            let started = Instant::now();
            self.manager.tick(&mut self.balls)?;
            self.tick_times.push(started.elapsed());

            if let Some(stats) = self.manager.resolver().last_stats() {
                debug_print!(
                    "tick {tick}: {} queries, {} coincident, weights {:?}, reduce {:?}",
                    stats.queries,
                    stats.coincident_queries,
                    stats.elapsed_weights,
                    stats.elapsed_reduce
                );
            }
        }
        self.cross_check()
    }

    /// Batched output must agree with resolving every ball directly
    fn cross_check(&self) -> Result<()> {
        let normalize = self.manager.config().normalize;
        let mut worst = 0.0f32;
        for ball in &self.balls {
            let direct = self.field.gravity(ball.position, normalize);
            worst = worst.max((direct - ball.gravity).abs().max_element());
        }
        info!(worst, "cross-checked batch against direct resolve");
        ensure!(
            worst <= CROSS_CHECK_TOLERANCE,
            "batched gravity drifted from direct resolve by {worst}"
        );
        Ok(())
    }

    pub fn report(&self) {
        let total: Duration = self.tick_times.iter().sum();
        let ticks = self.tick_times.len().max(1) as u32;
        info!(
            bodies = self.balls.len(),
            capacity = self.manager.capacity(),
            ticks = self.tick_times.len(),
            mean_tick = ?(total / ticks),
            "field run finished"
        );

        let probe = FieldProbe::default();
        let samples = probe.sample(&self.field, Vec3::ZERO);
        let dead_spots = samples.iter().filter(|s| s.direction == Vec3::ZERO).count();
        let mean_tint = samples.iter().map(|s| s.tint()).sum::<Vec3>() / samples.len().max(1) as f32;
        info!(
            samples = samples.len(),
            dead_spots,
            mean_tint = %mean_tint,
            "probe grid around the origin"
        );
    }
}

fn spawn_point(rng: &mut StdRng) -> Vec3 {
    Vec3::new(
        rng.random_range(-45.0..45.0),
        rng.random_range(-20.0..20.0),
        rng.random_range(-20.0..20.0),
    )
}
