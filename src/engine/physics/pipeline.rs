//! Two-stage weight/reduce dispatch.
//!
//! Stage 1 writes one weight per (query, arrow) cell, split into work units
//! of `batch_width` cells, so its parallelism grows with arrows x queries.
//! Stage 2 folds each query's row of weights into a direction, one query per
//! work item. Stage 2 only starts once every Stage 1 unit has returned,
//! which is the single barrier per step.
//!
//! Weight layout is query-major: cell `q * arrow_count + a`.

use std::time::{Duration, Instant};

use glam::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engine::{pair_weight, reduce_weights, Arrow, DegeneratePolicy};

/// Where the two stages run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionBackend {
    /// Every work unit on the calling thread, in order
    Serial,
    /// Work units spread over the rayon thread pool
    #[default]
    Parallel,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PassReport {
    /// Stage 1 work units dispatched, `ceil(cells / batch_width)`
    pub weight_tasks: usize,
    pub coincident_queries: usize,
    pub elapsed_weights: Duration,
    pub elapsed_reduce: Duration,
}

pub(crate) struct Pipeline<'a> {
    pub backend: ExecutionBackend,
    pub batch_width: usize,
    pub policy: DegeneratePolicy,
    pub arrows: &'a [Arrow],
}

impl Pipeline<'_> {
    /// Runs both stages. `weights` must hold `queries.len() * arrows.len()`
    /// cells, `results` and `coincident` one entry per query.
    pub fn run(
        &self,
        queries: &[Vec3],
        weights: &mut [f32],
        results: &mut [Vec3],
        coincident: &mut [bool],
    ) -> PassReport {
        debug_assert!(!self.arrows.is_empty());
        debug_assert_eq!(weights.len(), queries.len() * self.arrows.len());
        debug_assert_eq!(results.len(), queries.len());
        debug_assert_eq!(coincident.len(), queries.len());

        let started = Instant::now();
        let weight_tasks = self.compute_weights(queries, weights);
        let elapsed_weights = started.elapsed();

        // Barrier: stage 1 held `weights` mutably until every unit returned
        let started = Instant::now();
        let coincident_queries = self.resolve_directions(weights, results, coincident);
        let elapsed_reduce = started.elapsed();

        PassReport {
            weight_tasks,
            coincident_queries,
            elapsed_weights,
            elapsed_reduce,
        }
    }

    fn compute_weights(&self, queries: &[Vec3], weights: &mut [f32]) -> usize {
        let unit = self.batch_width;
        match self.backend {
            ExecutionBackend::Serial => weights
                .chunks_mut(unit)
                .enumerate()
                .map(|(task, cells)| self.weight_unit(task * unit, queries, cells))
                .sum(),
            ExecutionBackend::Parallel => weights
                .par_chunks_mut(unit)
                .enumerate()
                .map(|(task, cells)| self.weight_unit(task * unit, queries, cells))
                .sum(),
        }
    }

    fn weight_unit(&self, first_cell: usize, queries: &[Vec3], cells: &mut [f32]) -> usize {
        let arrow_count = self.arrows.len();
        for (offset, weight) in cells.iter_mut().enumerate() {
            let cell = first_cell + offset;
            let arrow = &self.arrows[cell % arrow_count];
            *weight = pair_weight(arrow.position, queries[cell / arrow_count], self.policy);
        }
        1
    }

    fn resolve_directions(&self, weights: &[f32], results: &mut [Vec3], coincident: &mut [bool]) -> usize {
        let arrow_count = self.arrows.len();
        match self.backend {
            ExecutionBackend::Serial => results
                .iter_mut()
                .zip(coincident.iter_mut())
                .zip(weights.chunks(arrow_count))
                .map(|((direction, on_arrow), row)| self.reduce_query(row, direction, on_arrow))
                .sum(),
            ExecutionBackend::Parallel => results
                .par_iter_mut()
                .zip(coincident.par_iter_mut())
                .zip(weights.par_chunks(arrow_count))
                .map(|((direction, on_arrow), row)| self.reduce_query(row, direction, on_arrow))
                .sum(),
        }
    }

    fn reduce_query(&self, row: &[f32], direction: &mut Vec3, on_arrow: &mut bool) -> usize {
        let reduction = reduce_weights(row.iter().copied(), self.arrows);
        *on_arrow = reduction.is_coincident();
        *direction = reduction.vector();
        usize::from(*on_arrow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::COINCIDENT_WEIGHT;

    fn two_arrows() -> Vec<Arrow> {
        vec![
            Arrow::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::X),
            Arrow::new(Vec3::new(2.0, 0.0, 0.0), Vec3::Y),
        ]
    }

    fn run_with_width(
        backend: ExecutionBackend,
        batch_width: usize,
        queries: &[Vec3],
        arrows: &[Arrow],
    ) -> (Vec<f32>, Vec<Vec3>, Vec<bool>, PassReport) {
        let pipeline = Pipeline {
            backend,
            batch_width,
            policy: DegeneratePolicy::ShortCircuit,
            arrows,
        };
        let mut weights = vec![0.0; queries.len() * arrows.len()];
        let mut results = vec![Vec3::ZERO; queries.len()];
        let mut coincident = vec![false; queries.len()];
        let report = pipeline.run(queries, &mut weights, &mut results, &mut coincident);
        (weights, results, coincident, report)
    }

    fn run(backend: ExecutionBackend, queries: &[Vec3], arrows: &[Arrow]) -> (Vec<f32>, Vec<Vec3>, Vec<bool>, PassReport) {
        run_with_width(backend, 2, queries, arrows)
    }

    #[test]
    fn weights_are_query_major() {
        let arrows = two_arrows();
        let queries = [Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0)];
        let (weights, _, _, _) = run(ExecutionBackend::Serial, &queries, &arrows);

        assert!((weights[0] - 1.0).abs() < 1e-6); // q0 to a0, d^2 = 1
        assert!((weights[1] - 0.25).abs() < 1e-6); // q0 to a1, d^2 = 4
        assert!((weights[2] - 0.5).abs() < 1e-6); // q1 to a0, d^2 = 2
        assert!((weights[3] - 0.2).abs() < 1e-6); // q1 to a1, d^2 = 5
    }

    #[test]
    fn serial_and_parallel_agree() {
        let arrows = two_arrows();
        let queries: Vec<Vec3> = (0..6).map(|i| Vec3::new(i as f32 * 0.7, 1.0, -0.5)).collect();

        let (serial_weights, serial, serial_mask, _) = run(ExecutionBackend::Serial, &queries, &arrows);
        let (parallel_weights, parallel, parallel_mask, _) = run(ExecutionBackend::Parallel, &queries, &arrows);

        assert_eq!(serial_weights, parallel_weights);
        assert_eq!(serial, parallel);
        assert_eq!(serial_mask, parallel_mask);
    }

    #[test]
    fn coincident_queries_are_counted() {
        let arrows = two_arrows();
        let queries = [arrows[0].position, Vec3::ZERO, arrows[1].position, Vec3::ONE];
        let (weights, results, mask, report) = run(ExecutionBackend::Parallel, &queries, &arrows);

        assert_eq!(weights[0], COINCIDENT_WEIGHT);
        assert_eq!(report.coincident_queries, 2);
        assert_eq!(mask, vec![true, false, true, false]);
        assert_eq!(results[0], Vec3::X);
        assert_eq!(results[2], Vec3::Y);
    }

    #[test]
    fn single_group_splits_stage_one_into_many_units() {
        let arrows: Vec<Arrow> = (0..64)
            .map(|i| Arrow::new(Vec3::new(i as f32, 3.0, -1.0), Vec3::NEG_Y))
            .collect();
        let queries: Vec<Vec3> = (0..1024).map(|i| Vec3::new(0.0, i as f32 * 0.01, 0.0)).collect();

        let (_, _, _, parallel) = run_with_width(ExecutionBackend::Parallel, 1024, &queries, &arrows);
        let (_, _, _, serial) = run_with_width(ExecutionBackend::Serial, 1024, &queries, &arrows);

        // 64 arrows x 1024 queries in units of 1024 cells
        assert_eq!(parallel.weight_tasks, 64);
        assert_eq!(serial.weight_tasks, 64);
    }

    #[test]
    fn uneven_cell_count_gets_a_trailing_unit() {
        let arrows = two_arrows();
        let queries = [Vec3::ZERO, Vec3::ONE, Vec3::NEG_ONE];
        let (_, _, _, report) = run_with_width(ExecutionBackend::Parallel, 4, &queries, &arrows);
        assert_eq!(report.weight_tasks, 2);
    }
}
