//! Per-pair weighting and per-query reduction shared by the scalar and the
//! batched resolvers, so both produce the same field.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::engine::{Arrow, FieldError, FieldResult};

/// Weight written for a coincident pair under [`DegeneratePolicy::ShortCircuit`].
/// A pair is coincident when `1 / d²` is not representable: `d² == 0`, or so
/// small the reciprocal overflows.
pub const COINCIDENT_WEIGHT: f32 = f32::INFINITY;

/// What to do when a query sits (almost) exactly on an arrow
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// The first coincident arrow's raw direction wins outright
    #[default]
    ShortCircuit,
    /// Squared distance is floored, every arrow keeps contributing
    Clamp { min_distance_sq: f32 },
}

impl DegeneratePolicy {
    pub fn validate(&self) -> FieldResult<()> {
        match *self {
            DegeneratePolicy::ShortCircuit => Ok(()),
            DegeneratePolicy::Clamp { min_distance_sq } => {
                if min_distance_sq > 0.0 && min_distance_sq.is_finite() && (1.0 / min_distance_sq).is_finite() {
                    Ok(())
                } else {
                    Err(FieldError::InvalidConfig {
                        reason: format!("clamp floor must be a positive squared distance, got {min_distance_sq}"),
                    })
                }
            }
        }
    }
}

/// Inverse squared distance between an arrow and a query
#[inline]
pub fn pair_weight(arrow_position: Vec3, query: Vec3, policy: DegeneratePolicy) -> f32 {
    let distance_sq = query.distance_squared(arrow_position);
    match policy {
        DegeneratePolicy::ShortCircuit => {
            let weight = 1.0 / distance_sq;
            if weight.is_infinite() {
                COINCIDENT_WEIGHT
            } else {
                weight
            }
        }
        DegeneratePolicy::Clamp { min_distance_sq } => 1.0 / distance_sq.max(min_distance_sq),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reduction {
    /// Query landed on arrow `index`, its direction is returned untouched
    Coincident { index: usize, direction: Vec3 },
    /// Weighted mean of every arrow direction
    Mean(Vec3),
}

impl Reduction {
    pub fn vector(self) -> Vec3 {
        match self {
            Reduction::Coincident { direction, .. } => direction,
            Reduction::Mean(mean) => mean,
        }
    }

    pub fn is_coincident(&self) -> bool {
        matches!(self, Reduction::Coincident { .. })
    }
}

/// Folds one query's weights (in arrow order) into its weighted mean direction.
///
/// Stops at the first coincident weight. An empty or all-zero weight set
/// reduces to the zero vector.
pub fn reduce_weights(weights: impl IntoIterator<Item = f32>, arrows: &[Arrow]) -> Reduction {
    let mut direction_sum = Vec3::ZERO;
    let mut weight_sum = 0.0f32;

    for (index, (weight, arrow)) in weights.into_iter().zip(arrows).enumerate() {
        if weight == COINCIDENT_WEIGHT {
            return Reduction::Coincident { index, direction: arrow.direction };
        }
        direction_sum += arrow.direction * weight;
        weight_sum += weight;
    }

    Reduction::Mean(weighted_mean(direction_sum, weight_sum))
}

#[inline]
pub fn weighted_mean(direction_sum: Vec3, weight_sum: f32) -> Vec3 {
    if weight_sum > 0.0 && weight_sum.is_finite() {
        let mean = direction_sum / weight_sum;
        if mean.is_finite() {
            return mean;
        }
    }
    Vec3::ZERO
}

/// Optional unit-normalization followed by scaling. Zero stays zero.
#[inline]
pub fn normalize_and_scale(direction: Vec3, normalize: bool, magnitude: f32) -> Vec3 {
    let direction = if normalize { direction.normalize_or_zero() } else { direction };
    direction * magnitude
}
