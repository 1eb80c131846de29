use glam::Vec3;

use crate::engine::{normalize_and_scale, Arrow, BatchResolver, FieldConfig, FieldError, FieldResult, FieldScene};

/// Anything the manager can pull a position from and push gravity into
pub trait GravityBody {
    fn position(&self) -> Vec3;

    /// Receives this tick's gravity as an acceleration
    fn apply_gravity(&mut self, acceleration: Vec3);
}

/// Drives a [`BatchResolver`] once per simulation tick.
///
/// Construct it once and hand it to whatever runs the fixed update. Bodies
/// are matched to results by slice index only, so the caller must pass them
/// in the same order the whole tick.
pub struct GravityManager {
    config: FieldConfig,
    resolver: BatchResolver,
    positions: Vec<Vec3>,
    accelerations: Vec<Vec3>,
}

impl GravityManager {
    pub fn new(config: FieldConfig, arrows: &[Arrow]) -> FieldResult<Self> {
        config.validate()?;

        let mut resolver = BatchResolver::from_config(&config)?;
        resolver.initialize(arrows, config.group_count)?;
        let capacity = resolver.capacity();

        Ok(Self {
            config,
            resolver,
            positions: Vec::with_capacity(capacity),
            accelerations: Vec::with_capacity(capacity),
        })
    }

    pub fn from_scene(scene: &FieldScene) -> FieldResult<Self> {
        Self::new(scene.config.clone(), &scene.arrows)
    }

    /// Resolve gravity for every body and apply it
    pub fn tick<B: GravityBody>(&mut self, bodies: &mut [B]) -> FieldResult<()> {
        self.positions.clear();
        self.positions.extend(bodies.iter().map(|body| body.position()));

        self.resolve_positions()?;

        for (body, acceleration) in bodies.iter_mut().zip(&self.accelerations) {
            body.apply_gravity(*acceleration);
        }
        Ok(())
    }

    /// Same as `tick` for callers that only have positions.
    /// Returns one acceleration per position.
    pub fn tick_positions(&mut self, positions: &[Vec3]) -> FieldResult<&[Vec3]> {
        self.positions.clear();
        self.positions.extend_from_slice(positions);
        self.resolve_positions()?;
        Ok(&self.accelerations)
    }

    fn resolve_positions(&mut self) -> FieldResult<()> {
        let capacity = self.resolver.capacity();
        if self.positions.len() > capacity {
            return Err(FieldError::CapacityOverflow {
                len: self.positions.len(),
                capacity,
            });
        }

        self.accelerations.clear();
        if self.positions.is_empty() {
            return Ok(());
        }

        let normalize = self.config.normalize;
        let acceleration = self.config.gravity_acceleration;
        let output = self.resolver.step_resolved(&self.positions)?;
        // Bodies sitting on an arrow take its raw direction, like the direct resolver
        self.accelerations.extend(output.directions.iter().zip(output.coincident).map(
            |(direction, on_arrow)| {
                if *on_arrow {
                    *direction
                } else {
                    normalize_and_scale(*direction, normalize, acceleration)
                }
            },
        ));
        Ok(())
    }

    /// Replace arrow data between ticks
    pub fn update_arrows(&mut self, arrows: &[Arrow]) -> FieldResult<()> {
        self.resolver.update_arrows(arrows)
    }

    /// Accelerations handed out by the last tick
    pub fn last_accelerations(&self) -> &[Vec3] {
        &self.accelerations
    }

    pub fn capacity(&self) -> usize {
        self.resolver.capacity()
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn resolver(&self) -> &BatchResolver {
        &self.resolver
    }
}
