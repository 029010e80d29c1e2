use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConstraintError;
use crate::physics::body_properties::{BodyInertiaWide, BodyVelocityWide};
use crate::physics::constraints::constraint_checker::ConstraintChecker;
use crate::physics::constraints::constraint_description::IConstraintDescription;
use crate::physics::constraints::spring_settings::{SpringSettings, SpringSettingsWide};
use crate::physics::constraints::two_body_type_processor::{ITwoBodyConstraintFunctions, TwoBodyTypeProcessor};
use crate::physics::constraints::type_processor::ITypeProcessor;
use crate::utilities::quaternion_wide::QuaternionWide;
use crate::utilities::vector::Vector;
use crate::utilities::vector3_wide::Vector3Wide;

/// Constrains the center of two bodies to be separated by a goal distance.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CenterDistanceConstraint {
    /// Target distance between the body centers.
    pub target_distance: f32,
    /// Spring frequency and damping parameters.
    pub spring_settings: SpringSettings,
}

impl CenterDistanceConstraint {
    #[inline(always)]
    pub fn new(target_distance: f32, spring_settings: SpringSettings) -> Self {
        Self {
            target_distance,
            spring_settings,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CenterDistancePrestepData {
    pub target_distance: Vector<f32>,
    pub spring_settings: SpringSettingsWide,
}

impl IConstraintDescription for CenterDistanceConstraint {
    type PrestepData = CenterDistancePrestepData;
    const CONSTRAINT_TYPE_ID: usize = 33;

    fn apply_description(&self, prestep_data: &mut CenterDistancePrestepData, inner_index: usize) {
        prestep_data.target_distance[inner_index] = self.target_distance;
        prestep_data.spring_settings.write_slot(&self.spring_settings, inner_index);
    }

    fn build_description(prestep_data: &CenterDistancePrestepData, inner_index: usize) -> Self {
        Self {
            target_distance: prestep_data.target_distance[inner_index],
            spring_settings: prestep_data.spring_settings.read_slot(inner_index),
        }
    }

    fn validate(&self) -> Result<(), ConstraintError> {
        ConstraintChecker::require_nonnegative(self.target_distance, "center_distance.target_distance")?;
        self.spring_settings.validate()
    }

    fn create_type_processor() -> Box<dyn ITypeProcessor> {
        Box::new(CenterDistanceTypeProcessor::new(Self::CONSTRAINT_TYPE_ID, 1))
    }
}

pub struct CenterDistanceConstraintFunctions;

impl CenterDistanceConstraintFunctions {
    /// Computes the unit axis from A to B, substituting (1, 0, 0) when `length_measure` is below `epsilon`.
    #[inline(always)]
    pub(crate) fn compute_axis(ab: &Vector3Wide, length: &Vector<f32>, length_measure: &Vector<f32>, epsilon: f32) -> Vector3Wide {
        let use_fallback = length_measure.simd_lt(Vector::splat(epsilon));
        Vector3Wide::conditional_select(
            use_fallback,
            &Vector3Wide::broadcast(Vec3::X),
            &Vector3Wide::scale(ab, &length.recip()),
        )
    }

    /// Applies an impulse along `jacobian_a` to A and the opposite impulse to B. Linear only.
    #[inline(always)]
    pub fn apply_impulse(
        jacobian_a: &Vector3Wide,
        inverse_mass_a: &Vector<f32>,
        inverse_mass_b: &Vector<f32>,
        impulse: &Vector<f32>,
        a: &mut BodyVelocityWide,
        b: &mut BodyVelocityWide,
    ) {
        a.linear += *jacobian_a * (*impulse * *inverse_mass_a);
        b.linear -= *jacobian_a * (*impulse * *inverse_mass_b);
    }
}

impl ITwoBodyConstraintFunctions<CenterDistancePrestepData, Vector<f32>> for CenterDistanceConstraintFunctions {
    #[inline(always)]
    fn warm_start(
        position_a: &Vector3Wide,
        _orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        position_b: &Vector3Wide,
        _orientation_b: &QuaternionWide,
        inertia_b: &BodyInertiaWide,
        _prestep: &CenterDistancePrestepData,
        accumulated_impulses: &Vector<f32>,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let ab = *position_b - *position_a;
        let length_squared = Vector3Wide::length_squared(&ab);
        let jacobian_a = Self::compute_axis(&ab, &length_squared.sqrt(), &length_squared, 1e-10);
        Self::apply_impulse(
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
        _inverse_dt: f32,
        prestep: &CenterDistancePrestepData,
        accumulated_impulse: &mut Vector<f32>,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let ab = *position_b - *position_a;
        let distance = Vector3Wide::length(&ab);
        let jacobian_a = Self::compute_axis(&ab, &distance, &distance, 1e-5);

        let (mut position_error_to_velocity, mut effective_mass_cfm_scale, mut softness_impulse_scale) =
            Default::default();
        SpringSettingsWide::compute_springiness(
            &prestep.spring_settings,
            dt,
            &mut position_error_to_velocity,
            &mut effective_mass_cfm_scale,
            &mut softness_impulse_scale,
        );
        // The jacobian is a unit direction, so only the inverse masses contribute.
        let effective_mass = effective_mass_cfm_scale / (inertia_a.inverse_mass + inertia_b.inverse_mass);
        let bias_velocity = (distance - prestep.target_distance) * position_error_to_velocity;

        let csv = Vector3Wide::dot(&wsv_a.linear, &jacobian_a) - Vector3Wide::dot(&wsv_b.linear, &jacobian_a);
        let csi = (bias_velocity - csv) * effective_mass - *accumulated_impulse * softness_impulse_scale;
        *accumulated_impulse += csi;
        Self::apply_impulse(
            &jacobian_a,
            &inertia_a.inverse_mass,
            &inertia_b.inverse_mass,
            &csi,
            wsv_a,
            wsv_b,
        );
    }
}

/// Handles the solve iterations of a bunch of center distance constraints.
pub type CenterDistanceTypeProcessor =
    TwoBodyTypeProcessor<CenterDistancePrestepData, Vector<f32>, CenterDistanceConstraintFunctions>;

#[cfg(test)]
mod tests {
    use super::*;

    fn solve_once(separation: f32, target: f32, iterations: usize) -> (Vector<f32>, BodyVelocityWide, BodyVelocityWide) {
        let mut prestep = CenterDistancePrestepData::default();
        let description = CenterDistanceConstraint::new(target, SpringSettings::new(1e5, 1.0));
        for lane in 0..Vector::<f32>::LEN {
            description.apply_description(&mut prestep, lane);
        }
        let inertia = BodyInertiaWide {
            inverse_mass: Vector::splat(1.0),
            ..Default::default()
        };
        let position_b = Vector3Wide::broadcast(Vec3::new(separation, 0.0, 0.0));
        let mut impulse = Vector::splat(0.0);
        let mut wsv_a = BodyVelocityWide::default();
        let mut wsv_b = BodyVelocityWide::default();
        for _ in 0..iterations {
            CenterDistanceConstraintFunctions::solve(
                &Vector3Wide::default(),
                &QuaternionWide::identity(),
                &inertia,
                &position_b,
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
        (impulse, wsv_a, wsv_b)
    }

    #[test]
    fn test_stretched_constraint_pulls_bodies_together() {
        let (impulse, wsv_a, wsv_b) = solve_once(3.0, 2.0, 8);
        assert!(impulse[0] > 0.0);
        assert!(wsv_a.linear.x[0] > 0.0);
        assert!(wsv_b.linear.x[0] < 0.0);
    }

    #[test]
    fn test_coincident_centers_use_fallback_axis() {
        let (impulse, wsv_a, _) = solve_once(0.0, 1.0, 1);
        assert!(impulse[0].is_finite());
        // Too close, so A is pushed away from B along -X.
        assert!(wsv_a.linear.x[0] < 0.0);
        assert_eq!(wsv_a.linear.y[0], 0.0);
    }

    #[test]
    fn test_description_round_trip() {
        let mut prestep = CenterDistancePrestepData::default();
        let description = CenterDistanceConstraint::new(2.5, SpringSettings::new(5.0, 0.7));
        description.apply_description(&mut prestep, 3);
        let rebuilt = CenterDistanceConstraint::build_description(&prestep, 3);
        assert_eq!(rebuilt.target_distance, 2.5);
        assert!((rebuilt.spring_settings.frequency() - 5.0).abs() < 1e-5);
        assert!(description.validate().is_ok());
        assert!(CenterDistanceConstraint::new(-1.0, SpringSettings::default()).validate().is_err());
    }
}
