use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::error::ConstraintError;
use crate::physics::body_properties::{BodyInertiaWide, BodyVelocityWide};
use crate::physics::constraints::center_distance_constraint::CenterDistanceConstraintFunctions;
use crate::physics::constraints::constraint_checker::ConstraintChecker;
use crate::physics::constraints::constraint_description::IConstraintDescription;
use crate::physics::constraints::inequality_helpers::InequalityHelpers;
use crate::physics::constraints::spring_settings::{SpringSettings, SpringSettingsWide};
use crate::physics::constraints::two_body_type_processor::{ITwoBodyConstraintFunctions, TwoBodyTypeProcessor};
use crate::physics::constraints::type_processor::ITypeProcessor;
use crate::utilities::quaternion_wide::QuaternionWide;
use crate::utilities::vector::{Mask, Vector};
use crate::utilities::vector3_wide::Vector3Wide;

/// Constrains the distance between the centers of two bodies to a range.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CenterDistanceLimit {
    /// Minimum distance between the body centers.
    pub minimum_distance: f32,
    /// Maximum distance between the body centers.
    pub maximum_distance: f32,
    /// Spring frequency and damping parameters.
    pub spring_settings: SpringSettings,
}

impl CenterDistanceLimit {
    #[inline(always)]
    pub fn new(minimum_distance: f32, maximum_distance: f32, spring_settings: SpringSettings) -> Self {
        Self {
            minimum_distance,
            maximum_distance,
            spring_settings,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CenterDistanceLimitPrestepData {
    pub minimum_distance: Vector<f32>,
    pub maximum_distance: Vector<f32>,
    pub spring_settings: SpringSettingsWide,
}

impl IConstraintDescription for CenterDistanceLimit {
    type PrestepData = CenterDistanceLimitPrestepData;
    const CONSTRAINT_TYPE_ID: usize = 34;

    fn apply_description(&self, prestep_data: &mut CenterDistanceLimitPrestepData, inner_index: usize) {
        prestep_data.minimum_distance[inner_index] = self.minimum_distance;
        prestep_data.maximum_distance[inner_index] = self.maximum_distance;
        prestep_data.spring_settings.write_slot(&self.spring_settings, inner_index);
    }

    fn build_description(prestep_data: &CenterDistanceLimitPrestepData, inner_index: usize) -> Self {
        Self {
            minimum_distance: prestep_data.minimum_distance[inner_index],
            maximum_distance: prestep_data.maximum_distance[inner_index],
            spring_settings: prestep_data.spring_settings.read_slot(inner_index),
        }
    }

    fn validate(&self) -> Result<(), ConstraintError> {
        ConstraintChecker::require_nonnegative(self.minimum_distance, "center_distance_limit.minimum_distance")?;
        ConstraintChecker::require_nonnegative(self.maximum_distance, "center_distance_limit.maximum_distance")?;
        if self.maximum_distance < self.minimum_distance {
            return Err(ConstraintError::InvalidRange {
                field: "center_distance_limit.maximum_distance",
                reason: format!("{} is below the minimum {}", self.maximum_distance, self.minimum_distance),
            });
        }
        self.spring_settings.validate()
    }

    fn create_type_processor() -> Box<dyn ITypeProcessor> {
        Box::new(CenterDistanceLimitTypeProcessor::new(Self::CONSTRAINT_TYPE_ID, 1))
    }
}

pub struct CenterDistanceLimitFunctions;

impl CenterDistanceLimitFunctions {
    /// Computes the jacobian of whichever bound is closer. The jacobian is negated when the
    /// minimum is active so that a positive impulse always pushes toward the valid range.
    #[inline(always)]
    fn compute_jacobian(
        minimum_distance: &Vector<f32>,
        maximum_distance: &Vector<f32>,
        position_a: &Vector3Wide,
        position_b: &Vector3Wide,
    ) -> (Vector3Wide, Vector<f32>, Mask) {
        let ab = *position_b - *position_a;
        let distance = Vector3Wide::length(&ab);
        let axis = CenterDistanceConstraintFunctions::compute_axis(&ab, &distance, &distance, 1e-5);
        let use_minimum = (distance - *minimum_distance)
            .abs()
            .simd_lt((distance - *maximum_distance).abs());
        let jacobian_a = Vector3Wide::conditional_select(use_minimum, &-axis, &axis);
        (jacobian_a, distance, use_minimum)
    }
}

impl ITwoBodyConstraintFunctions<CenterDistanceLimitPrestepData, Vector<f32>> for CenterDistanceLimitFunctions {
    #[inline(always)]
    fn warm_start(
        position_a: &Vector3Wide,
        _orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        position_b: &Vector3Wide,
        _orientation_b: &QuaternionWide,
        inertia_b: &BodyInertiaWide,
        prestep: &CenterDistanceLimitPrestepData,
        accumulated_impulses: &Vector<f32>,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let (jacobian_a, _, _) =
            Self::compute_jacobian(&prestep.minimum_distance, &prestep.maximum_distance, position_a, position_b);
        CenterDistanceConstraintFunctions::apply_impulse(
            &jacobian_a,
            &inertia_a.inverse_mass,
            &inertia_b.inverse_mass,
            accumulated_impulses,
            wsv_a,
            wsv_b,
        );
    }

    #[inline(always)]
    fn solve(
        position_a: &Vector3Wide,
        _orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        position_b: &Vector3Wide,
        _orientation_b: &QuaternionWide,
        inertia_b: &BodyInertiaWide,
        dt: f32,
        inverse_dt: f32,
        prestep: &CenterDistanceLimitPrestepData,
        accumulated_impulse: &mut Vector<f32>,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let (jacobian_a, distance, use_minimum) =
            Self::compute_jacobian(&prestep.minimum_distance, &prestep.maximum_distance, position_a, position_b);

        let (mut position_error_to_velocity, mut effective_mass_cfm_scale, mut softness_impulse_scale) =
            Default::default();
        SpringSettingsWide::compute_springiness(
            &prestep.spring_settings,
            dt,
            &mut position_error_to_velocity,
            &mut effective_mass_cfm_scale,
            &mut softness_impulse_scale,
        );
        let effective_mass = effective_mass_cfm_scale / (inertia_a.inverse_mass + inertia_b.inverse_mass);

        let error = use_minimum.select(prestep.minimum_distance - distance, distance - prestep.maximum_distance);
        let bias_velocity = InequalityHelpers::compute_bias_velocity(error, &position_error_to_velocity, inverse_dt);
        let csv = Vector3Wide::dot(&wsv_a.linear, &jacobian_a) - Vector3Wide::dot(&wsv_b.linear, &jacobian_a);
        let mut csi = (bias_velocity - csv) * effective_mass - *accumulated_impulse * softness_impulse_scale;
        InequalityHelpers::clamp_positive(accumulated_impulse, &mut csi);
        CenterDistanceConstraintFunctions::apply_impulse(
            &jacobian_a,
            &inertia_a.inverse_mass,
            &inertia_b.inverse_mass,
            &csi,
            wsv_a,
            wsv_b,
        );
    }
}

pub type CenterDistanceLimitTypeProcessor =
    TwoBodyTypeProcessor<CenterDistanceLimitPrestepData, Vector<f32>, CenterDistanceLimitFunctions>;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn solve(separation: f32, approach_speed: f32) -> (Vector<f32>, BodyVelocityWide) {
        let mut prestep = CenterDistanceLimitPrestepData::default();
        CenterDistanceLimit::new(1.0, 2.0, SpringSettings::new(30.0, 1.0)).apply_description(&mut prestep, 0);
        let inertia = BodyInertiaWide {
            inverse_mass: Vector::splat(1.0),
            ..Default::default()
        };
        let mut impulse = Vector::splat(0.0);
        let mut wsv_a = BodyVelocityWide::default();
        wsv_a.linear.write_slot(Vec3::new(approach_speed, 0.0, 0.0), 0);
        let mut wsv_b = BodyVelocityWide::default();
        for _ in 0..4 {
            CenterDistanceLimitFunctions::solve(
                &Vector3Wide::default(),
                &QuaternionWide::identity(),
                &inertia,
                &Vector3Wide::broadcast(Vec3::new(separation, 0.0, 0.0)),
                &QuaternionWide::identity(),
                &inertia,
                1.0 / 60.0,
                60.0,
                &prestep,
                &mut impulse,
                &mut wsv_a,
                &mut wsv_b,
            );
        }
        (impulse, wsv_a)
    }

    #[test]
    fn test_inside_range_applies_nothing() {
        let (impulse, wsv_a) = solve(1.5, 0.0);
        assert_eq!(impulse[0], 0.0);
        assert_eq!(wsv_a.linear.x[0], 0.0);
    }

    #[test]
    fn test_impulse_is_never_negative() {
        for &(separation, speed) in &[(0.5, 0.0), (2.5, 0.0), (1.9, -10.0), (1.1, 10.0), (3.0, -5.0)] {
            let (impulse, _) = solve(separation, speed);
            assert!(impulse[0] >= 0.0, "{separation} {speed}: {}", impulse[0]);
        }
    }

    #[test]
    fn test_minimum_pushes_apart() {
        let (impulse, wsv_a) = solve(0.5, 0.0);
        assert!(impulse[0] > 0.0);
        assert!(wsv_a.linear.x[0] < 0.0);
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        assert!(CenterDistanceLimit::new(2.0, 1.0, SpringSettings::default()).validate().is_err());
    }
}
