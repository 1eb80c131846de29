use glam::Vec3;

use crate::engine::{
    normalize_and_scale, pair_weight, reduce_weights, Arrow, DegeneratePolicy, FieldError, FieldResult,
    Reduction,
};

pub const DEFAULT_GRAVITY_ACCELERATION: f32 = 9.8;

/// Resolves the field at one point by summing over every arrow.
///
/// A query on top of an arrow returns that arrow's raw direction, ignoring
/// `normalize` and `magnitude`. An empty arrow list resolves to zero.
pub fn resolve(query: Vec3, arrows: &[Arrow], normalize: bool, magnitude: f32) -> Vec3 {
    resolve_with_policy(query, arrows, normalize, magnitude, DegeneratePolicy::ShortCircuit)
}

pub fn resolve_with_policy(
    query: Vec3,
    arrows: &[Arrow],
    normalize: bool,
    magnitude: f32,
    policy: DegeneratePolicy,
) -> Vec3 {
    // Lazy weights, so the first coincident arrow ends the walk
    let weights = arrows.iter().map(|arrow| pair_weight(arrow.position, query, policy));
    match reduce_weights(weights, arrows) {
        Reduction::Coincident { direction, .. } => direction,
        Reduction::Mean(mean) => normalize_and_scale(mean, normalize, magnitude.max(0.0)),
    }
}

/// Arrow set with a fixed acceleration, for direct per-point lookups
#[derive(Debug, Clone)]
pub struct GravityField {
    arrows: Vec<Arrow>,
    acceleration: f32,
    policy: DegeneratePolicy,
}

impl GravityField {
    pub fn new(arrows: Vec<Arrow>) -> Self {
        Self {
            arrows,
            acceleration: DEFAULT_GRAVITY_ACCELERATION,
            policy: DegeneratePolicy::ShortCircuit,
        }
    }

    pub fn with_acceleration(mut self, acceleration: f32) -> FieldResult<Self> {
        if !acceleration.is_finite() || acceleration < 0.0 {
            return Err(FieldError::InvalidMagnitude { magnitude: acceleration });
        }
        self.acceleration = acceleration;
        Ok(self)
    }

    pub fn with_policy(mut self, policy: DegeneratePolicy) -> FieldResult<Self> {
        policy.validate()?;
        self.policy = policy;
        Ok(self)
    }

    /// Gravity acting at `position`, scaled by this field's acceleration
    pub fn gravity(&self, position: Vec3, normalized: bool) -> Vec3 {
        resolve_with_policy(position, &self.arrows, normalized, self.acceleration, self.policy)
    }

    pub fn arrows(&self) -> &[Arrow] {
        &self.arrows
    }

    pub fn acceleration(&self) -> f32 {
        self.acceleration
    }

    pub fn policy(&self) -> DegeneratePolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec_close(actual: Vec3, expected: Vec3) {
        let tolerance = 1e-5 + expected.length() * 1e-5;
        assert!(
            (actual - expected).length() <= tolerance,
            "expected {expected}, got {actual}"
        );
    }

    /// Inverse-square weighted mean in f64, straight from the definition
    fn reference_mean(query: Vec3, arrows: &[Arrow]) -> Vec3 {
        let q = query.as_dvec3();
        let mut sum = glam::DVec3::ZERO;
        let mut weights = 0.0f64;
        for arrow in arrows {
            let w = 1.0 / q.distance_squared(arrow.position.as_dvec3());
            sum += arrow.direction.as_dvec3() * w;
            weights += w;
        }
        (sum / weights).as_vec3()
    }

    fn scattered_arrows() -> Vec<Arrow> {
        vec![
            Arrow::new(Vec3::new(3.0, 0.0, 0.0), Vec3::new(0.0, -1.0, 0.0)),
            Arrow::new(Vec3::new(-2.0, 4.0, 1.0), Vec3::new(1.0, 0.0, 0.0)),
            Arrow::new(Vec3::new(0.0, -5.0, 2.0), Vec3::new(0.0, 0.0, 2.0)),
            Arrow::new(Vec3::new(7.0, 7.0, -7.0), Vec3::new(-1.0, 1.0, 0.5)),
        ]
    }

    #[test]
    fn single_arrow_scaled_and_normalized() {
        let arrows = [Arrow::new(Vec3::ZERO, Vec3::new(0.0, -1.0, 0.0))];
        let g = resolve(Vec3::new(0.0, 10.0, 0.0), &arrows, true, 9.8);
        assert_vec_close(g, Vec3::new(0.0, -9.8, 0.0));
    }

    #[test]
    fn single_arrow_unnormalized_keeps_length() {
        let arrows = [Arrow::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(0.0, -3.0, 4.0))];
        let g = resolve(Vec3::new(-6.0, 2.0, 0.5), &arrows, false, 2.0);
        assert_vec_close(g, Vec3::new(0.0, -6.0, 8.0));
    }

    #[test]
    fn matches_reference_weighted_mean() {
        let arrows = scattered_arrows();
        for query in [Vec3::new(0.5, 0.5, 0.5), Vec3::new(-10.0, 3.0, 2.0), Vec3::new(6.0, 6.0, -6.0)] {
            let g = resolve(query, &arrows, false, 1.0);
            assert_vec_close(g, reference_mean(query, &arrows));
        }
    }

    #[test]
    fn coincident_query_returns_raw_direction() {
        let arrows = scattered_arrows();
        let on_top = arrows[2];
        let g = resolve(on_top.position, &arrows, true, 9.8);
        assert_eq!(g, on_top.direction);
    }

    #[test]
    fn query_just_off_an_arrow_is_still_scaled() {
        let arrows = [
            Arrow::new(Vec3::ZERO, Vec3::new(0.0, -2.0, 0.0)),
            Arrow::new(Vec3::new(50.0, 0.0, 0.0), Vec3::X),
        ];
        let g = resolve(Vec3::new(0.0, 5e-7, 0.0), &arrows, true, 9.8);
        assert_vec_close(g, Vec3::new(0.0, -9.8, 0.0));
    }

    #[test]
    fn first_coincident_arrow_wins() {
        let arrows = [
            Arrow::new(Vec3::new(5.0, 0.0, 0.0), Vec3::Z),
            Arrow::new(Vec3::ZERO, Vec3::X),
            Arrow::new(Vec3::ZERO, Vec3::Y),
        ];
        assert_eq!(resolve(Vec3::ZERO, &arrows, false, 1.0), Vec3::X);
    }

    #[test]
    fn duplicating_arrows_changes_nothing() {
        let arrows = scattered_arrows();
        let doubled: Vec<Arrow> = arrows.iter().chain(arrows.iter()).copied().collect();
        let query = Vec3::new(1.5, -2.0, 0.25);
        assert_vec_close(resolve(query, &doubled, false, 1.0), resolve(query, &arrows, false, 1.0));
    }

    #[test]
    fn opposing_arrows_cancel_without_nan() {
        let arrows = [
            Arrow::new(Vec3::new(-10.0, 0.0, 0.0), Vec3::X),
            Arrow::new(Vec3::new(10.0, 0.0, 0.0), Vec3::NEG_X),
        ];
        let raw = resolve(Vec3::ZERO, &arrows, false, 1.0);
        assert_vec_close(raw, Vec3::ZERO);

        let normalized = resolve(Vec3::ZERO, &arrows, true, 9.8);
        assert!(normalized.is_finite());
        assert_eq!(normalized, Vec3::ZERO);
    }

    #[test]
    fn empty_arrow_list_resolves_to_zero() {
        assert_eq!(resolve(Vec3::ONE, &[], true, 9.8), Vec3::ZERO);
    }

    #[test]
    fn clamp_policy_blends_instead_of_short_circuit() {
        let arrows = [
            Arrow::new(Vec3::ZERO, Vec3::X),
            Arrow::new(Vec3::new(1.0, 0.0, 0.0), Vec3::Y),
        ];
        let policy = DegeneratePolicy::Clamp { min_distance_sq: 0.25 };
        let g = resolve_with_policy(Vec3::ZERO, &arrows, false, 1.0, policy);
        // weights 4 and 1
        assert_vec_close(g, Vec3::new(0.8, 0.2, 0.0));
    }

    #[test]
    fn field_scales_by_its_acceleration() {
        let field = GravityField::new(vec![Arrow::new(Vec3::ZERO, Vec3::new(0.0, -2.0, 0.0))]);
        assert_vec_close(field.gravity(Vec3::new(0.0, 4.0, 0.0), true), Vec3::new(0.0, -9.8, 0.0));
        assert_vec_close(field.gravity(Vec3::new(0.0, 4.0, 0.0), false), Vec3::new(0.0, -19.6, 0.0));
    }

    #[test]
    fn field_rejects_negative_acceleration() {
        let result = GravityField::new(Vec::new()).with_acceleration(-9.8);
        assert!(matches!(result, Err(FieldError::InvalidMagnitude { .. })));
    }
}
