pub mod debug;
pub mod error;
pub mod physics;

use serde::{Deserialize, Serialize};

pub use debug::*;
pub use error::*;
pub use physics::*;

/// Acceleration the batch controller scales resolved directions by
pub const DEFAULT_CONTROLLER_ACCELERATION: f32 = 9.81;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub gravity_acceleration: f32,
    pub normalize: bool,
    /// Queries per group. Sets the granularity of the parallel stages.
    pub batch_width: usize,
    pub group_count: usize,
    pub degenerate: DegeneratePolicy,
    pub backend: ExecutionBackend,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            gravity_acceleration: DEFAULT_CONTROLLER_ACCELERATION,
            normalize: true,
            batch_width: DEFAULT_BATCH_WIDTH,
            group_count: 1,
            degenerate: DegeneratePolicy::default(),
            backend: ExecutionBackend::default(),
        }
    }
}

impl FieldConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_acceleration(mut self, acceleration: f32) -> Self {
        self.gravity_acceleration = acceleration;
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_batch_width(mut self, width: usize) -> Self {
        self.batch_width = width;
        self
    }

    pub fn with_groups(mut self, group_count: usize) -> Self {
        self.group_count = group_count;
        self
    }

    pub fn with_degenerate(mut self, policy: DegeneratePolicy) -> Self {
        self.degenerate = policy;
        self
    }

    pub fn with_backend(mut self, backend: ExecutionBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Total number of queries one step can resolve
    pub fn capacity(&self) -> usize {
        self.batch_width.saturating_mul(self.group_count)
    }

    pub fn validate(&self) -> FieldResult<()> {
        if !self.gravity_acceleration.is_finite() || self.gravity_acceleration < 0.0 {
            return Err(FieldError::InvalidMagnitude { magnitude: self.gravity_acceleration });
        }
        if self.batch_width == 0 {
            return Err(FieldError::InvalidBatchWidth { width: self.batch_width });
        }
        if self.group_count == 0 {
            return Err(FieldError::ZeroGroups);
        }
        self.degenerate.validate()
    }
}
