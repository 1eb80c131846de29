use std::time::Duration;

use glam::Vec3;

use crate::debug_print;
use crate::engine::physics::pipeline::Pipeline;
use crate::engine::{debug_flags, Arrow, DegeneratePolicy, ExecutionBackend, FieldConfig, FieldError, FieldResult};

/// Queries per group unless configured otherwise
pub const DEFAULT_BATCH_WIDTH: usize = 1024;

/// Working storage, sized once by `initialize` and reused every step
struct FieldBuffers {
    arrows: Vec<Arrow>,
    queries: Vec<Vec3>,
    weights: Vec<f32>,
    results: Vec<Vec3>,
    coincident: Vec<bool>,
    group_count: usize,
}

/// Read-only view of the current arrows and the last resolved directions
#[derive(Debug, Clone, Copy)]
pub struct FieldSnapshot<'a> {
    pub arrows: &'a [Arrow],
    pub directions: &'a [Vec3],
    pub coincident: &'a [bool],
}

/// One step's output, index-aligned with the input positions
#[derive(Debug, Clone, Copy)]
pub struct StepOutput<'a> {
    pub directions: &'a [Vec3],
    /// `true` where the query sat on an arrow and got its raw direction
    pub coincident: &'a [bool],
}

/// Numbers from the last `step`
#[derive(Debug, Clone, Default)]
pub struct StepStats {
    pub queries: usize,
    pub sources: usize,
    pub weight_cells: usize,
    pub weight_tasks: usize,
    pub coincident_queries: usize,
    pub elapsed_weights: Duration,
    pub elapsed_reduce: Duration,
}

/// Resolves many queries per call through a weight matrix
pub struct BatchResolver {
    batch_width: usize,
    backend: ExecutionBackend,
    policy: DegeneratePolicy,
    buffers: Option<FieldBuffers>,
    last_stats: Option<StepStats>,
}

impl BatchResolver {
    pub fn new(batch_width: usize, backend: ExecutionBackend, policy: DegeneratePolicy) -> FieldResult<Self> {
        if batch_width == 0 {
            return Err(FieldError::InvalidBatchWidth { width: batch_width });
        }
        policy.validate()?;

        Ok(Self {
            batch_width,
            backend,
            policy,
            buffers: None,
            last_stats: None,
        })
    }

    pub fn from_config(config: &FieldConfig) -> FieldResult<Self> {
        Self::new(config.batch_width, config.backend, config.degenerate)
    }

    /// Allocate every buffer for `arrows.len()` sources and `group_count` groups
    pub fn initialize(&mut self, arrows: &[Arrow], group_count: usize) -> FieldResult<()> {
        if self.buffers.is_some() {
            return Err(FieldError::AlreadyInitialized);
        }
        if arrows.is_empty() {
            return Err(FieldError::NoSources);
        }
        if group_count == 0 {
            return Err(FieldError::ZeroGroups);
        }

        let capacity = self
            .batch_width
            .checked_mul(group_count)
            .ok_or_else(|| FieldError::InvalidConfig {
                reason: format!("{group_count} groups of {} overflow the query capacity", self.batch_width),
            })?;
        let weight_cells = capacity
            .checked_mul(arrows.len())
            .ok_or_else(|| FieldError::InvalidConfig {
                reason: format!("{} arrows x {capacity} queries overflow the weight buffer", arrows.len()),
            })?;

        self.buffers = Some(FieldBuffers {
            arrows: arrows.to_vec(),
            queries: vec![Vec3::ZERO; capacity],
            weights: vec![0.0; weight_cells],
            results: vec![Vec3::ZERO; capacity],
            coincident: vec![false; capacity],
            group_count,
        });
        self.last_stats = None;

        tracing::info!(
            sources = arrows.len(),
            groups = group_count,
            batch_width = self.batch_width,
            weight_cells,
            backend = ?self.backend,
            "batch resolver initialized"
        );
        Ok(())
    }

    /// Drop all buffers so `initialize` can run again
    pub fn teardown(&mut self) {
        if self.buffers.take().is_some() {
            tracing::info!("batch resolver torn down");
        }
        self.last_stats = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.buffers.is_some()
    }

    pub fn batch_width(&self) -> usize {
        self.batch_width
    }

    pub fn backend(&self) -> ExecutionBackend {
        self.backend
    }

    pub fn policy(&self) -> DegeneratePolicy {
        self.policy
    }

    pub fn source_count(&self) -> usize {
        self.buffers.as_ref().map_or(0, |b| b.arrows.len())
    }

    pub fn group_count(&self) -> usize {
        self.buffers.as_ref().map_or(0, |b| b.group_count)
    }

    /// Queries one step can take
    pub fn capacity(&self) -> usize {
        self.buffers.as_ref().map_or(0, |b| b.queries.len())
    }

    /// Replace arrow data between steps. The count is fixed at initialization.
    pub fn update_arrows(&mut self, arrows: &[Arrow]) -> FieldResult<()> {
        let buffers = self.buffers.as_mut().ok_or(FieldError::NotInitialized)?;
        if arrows.len() != buffers.arrows.len() {
            return Err(FieldError::SourceCountMismatch {
                expected: buffers.arrows.len(),
                got: arrows.len(),
            });
        }
        buffers.arrows.copy_from_slice(arrows);
        debug_print!("updated {} arrows", arrows.len());
        Ok(())
    }

    /// Resolve every position. Output index `i` belongs to input index `i`.
    ///
    /// Shorter input is padded with zero positions whose results are dropped.
    /// Results are weighted means, neither normalized nor scaled.
    pub fn step(&mut self, positions: &[Vec3]) -> FieldResult<&[Vec3]> {
        Ok(self.step_resolved(positions)?.directions)
    }

    /// Like `step`, also reporting which queries short-circuited on an arrow
    pub fn step_resolved(&mut self, positions: &[Vec3]) -> FieldResult<StepOutput<'_>> {
        let buffers = self.buffers.as_mut().ok_or(FieldError::NotInitialized)?;
        let capacity = buffers.queries.len();
        if positions.len() > capacity {
            return Err(FieldError::CapacityOverflow {
                len: positions.len(),
                capacity,
            });
        }

        let FieldBuffers {
            arrows,
            queries,
            weights,
            results,
            coincident,
            ..
        } = buffers;

        queries[..positions.len()].copy_from_slice(positions);
        queries[positions.len()..].fill(Vec3::ZERO);

        let pipeline = Pipeline {
            backend: self.backend,
            batch_width: self.batch_width,
            policy: self.policy,
            arrows,
        };
        let report = pipeline.run(queries, weights, results, coincident);

        let stats = StepStats {
            queries: positions.len(),
            sources: arrows.len(),
            weight_cells: weights.len(),
            weight_tasks: report.weight_tasks,
            coincident_queries: report.coincident_queries,
            elapsed_weights: report.elapsed_weights,
            elapsed_reduce: report.elapsed_reduce,
        };
        if debug_flags().is_field_trace_enabled() {
            tracing::debug!(
                queries = stats.queries,
                weight_tasks = stats.weight_tasks,
                coincident = stats.coincident_queries,
                weights = ?stats.elapsed_weights,
                reduce = ?stats.elapsed_reduce,
                "field step"
            );
        }
        self.last_stats = Some(stats);

        Ok(StepOutput {
            directions: &results[..positions.len()],
            coincident: &coincident[..positions.len()],
        })
    }

    pub fn snapshot(&self) -> Option<FieldSnapshot<'_>> {
        self.buffers.as_ref().map(|b| FieldSnapshot {
            arrows: &b.arrows,
            directions: &b.results,
            coincident: &b.coincident,
        })
    }

    pub fn last_stats(&self) -> Option<&StepStats> {
        self.last_stats.as_ref()
    }
}
