use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConstraintError;
use crate::physics::body_properties::{BodyInertiaWide, BodyVelocityWide};
use crate::physics::constraints::constraint_checker::ConstraintChecker;
use crate::physics::constraints::constraint_description::IConstraintDescription;
use crate::physics::constraints::distance_servo::{AnchorLineJacobians, DistanceServoFunctions};
use crate::physics::constraints::inequality_helpers::InequalityHelpers;
use crate::physics::constraints::spring_settings::{SpringSettings, SpringSettingsWide};
use crate::physics::constraints::two_body_type_processor::{ITwoBodyConstraintFunctions, TwoBodyTypeProcessor};
use crate::physics::constraints::type_processor::ITypeProcessor;
use crate::utilities::quaternion_wide::QuaternionWide;
use crate::utilities::vector::{Mask, Vector};
use crate::utilities::vector3_wide::Vector3Wide;

/// Constrains points on two bodies to be separated by a distance within a range.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceLimit {
    /// Local offset from the center of body A to its attachment point.
    pub local_offset_a: Vec3,
    /// Local offset from the center of body B to its attachment point.
    pub local_offset_b: Vec3,
    /// Minimum distance permitted between the point on A and the point on B.
    pub minimum_distance: f32,
    /// Maximum distance permitted between the point on A and the point on B.
    pub maximum_distance: f32,
    /// Spring frequency and damping parameters.
    pub spring_settings: SpringSettings,
}

impl DistanceLimit {
    pub fn new(
        local_offset_a: Vec3,
        local_offset_b: Vec3,
        minimum_distance: f32,
        maximum_distance: f32,
        spring_settings: SpringSettings,
    ) -> Self {
        Self {
            local_offset_a,
            local_offset_b,
            minimum_distance,
            maximum_distance,
            spring_settings,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct DistanceLimitPrestepData {
    pub local_offset_a: Vector3Wide,
    pub local_offset_b: Vector3Wide,
    pub minimum_distance: Vector<f32>,
    pub maximum_distance: Vector<f32>,
    pub spring_settings: SpringSettingsWide,
}

impl IConstraintDescription for DistanceLimit {
    type PrestepData = DistanceLimitPrestepData;
    const CONSTRAINT_TYPE_ID: usize = 31;

    fn apply_description(&self, prestep_data: &mut DistanceLimitPrestepData, inner_index: usize) {
        prestep_data.local_offset_a.write_slot(self.local_offset_a, inner_index);
        prestep_data.local_offset_b.write_slot(self.local_offset_b, inner_index);
        prestep_data.minimum_distance[inner_index] = self.minimum_distance;
        prestep_data.maximum_distance[inner_index] = self.maximum_distance;
        prestep_data.spring_settings.write_slot(&self.spring_settings, inner_index);
    }

    fn build_description(prestep_data: &DistanceLimitPrestepData, inner_index: usize) -> Self {
        Self {
            local_offset_a: prestep_data.local_offset_a.read_slot(inner_index),
            local_offset_b: prestep_data.local_offset_b.read_slot(inner_index),
            minimum_distance: prestep_data.minimum_distance[inner_index],
            maximum_distance: prestep_data.maximum_distance[inner_index],
            spring_settings: prestep_data.spring_settings.read_slot(inner_index),
        }
    }

    fn validate(&self) -> Result<(), ConstraintError> {
        ConstraintChecker::require_finite_vec3(self.local_offset_a, "distance_limit.local_offset_a")?;
        ConstraintChecker::require_finite_vec3(self.local_offset_b, "distance_limit.local_offset_b")?;
        ConstraintChecker::require_nonnegative(self.minimum_distance, "distance_limit.minimum_distance")?;
        ConstraintChecker::require_nonnegative(self.maximum_distance, "distance_limit.maximum_distance")?;
        if self.maximum_distance < self.minimum_distance {
            return Err(ConstraintError::InvalidRange {
                field: "distance_limit.maximum_distance",
                reason: format!("{} is below the minimum {}", self.maximum_distance, self.minimum_distance),
            });
        }
        self.spring_settings.validate()
    }

    fn create_type_processor() -> Box<dyn ITypeProcessor> {
        Box::new(DistanceLimitTypeProcessor::new(Self::CONSTRAINT_TYPE_ID, 1))
    }
}

pub struct DistanceLimitFunctions;

impl DistanceLimitFunctions {
    /// Builds the anchor line jacobians for whichever bound is closer to the current distance.
    /// When the minimum is active the jacobians flip so a positive impulse separates the anchors.
    #[inline(always)]
    #[allow(clippy::too_many_arguments)]
    fn compute_jacobians(
        position_a: &Vector3Wide,
        orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        position_b: &Vector3Wide,
        orientation_b: &QuaternionWide,
        inertia_b: &BodyInertiaWide,
        prestep: &DistanceLimitPrestepData,
    ) -> (AnchorLineJacobians, Vector<f32>, Mask) {
        let (anchor_offset_a, anchor_offset_b, anchor_offset, distance) = DistanceServoFunctions::get_distance(
            position_a,
            orientation_a,
            position_b,
            orientation_b,
            &prestep.local_offset_a,
            &prestep.local_offset_b,
        );
        let mut jacobians = DistanceServoFunctions::compute_jacobians(
            inertia_a,
            inertia_b,
            &anchor_offset_a,
            &anchor_offset_b,
            &anchor_offset,
            &distance,
        );
        let use_minimum = (distance - prestep.minimum_distance)
            .abs()
            .simd_lt((distance - prestep.maximum_distance).abs());
        let flip = |v: &Vector3Wide| Vector3Wide::conditional_select(use_minimum, &-*v, v);
        jacobians.direction = flip(&jacobians.direction);
        jacobians.angular_ja = flip(&jacobians.angular_ja);
        jacobians.angular_jb = flip(&jacobians.angular_jb);
        jacobians.angular_impulse_to_velocity_a = flip(&jacobians.angular_impulse_to_velocity_a);
        jacobians.angular_impulse_to_velocity_b = flip(&jacobians.angular_impulse_to_velocity_b);
        (jacobians, distance, use_minimum)
    }
}

impl ITwoBodyConstraintFunctions<DistanceLimitPrestepData, Vector<f32>> for DistanceLimitFunctions {
    #[inline(always)]
    fn warm_start(
        position_a: &Vector3Wide,
        orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        position_b: &Vector3Wide,
        orientation_b: &QuaternionWide,
        inertia_b: &BodyInertiaWide,
        prestep: &DistanceLimitPrestepData,
        accumulated_impulses: &Vector<f32>,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let (jacobians, _, _) =
            Self::compute_jacobians(position_a, orientation_a, inertia_a, position_b, orientation_b, inertia_b, prestep);
        DistanceServoFunctions::apply_impulse(
            &jacobians,
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
        orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        position_b: &Vector3Wide,
        orientation_b: &QuaternionWide,
        inertia_b: &BodyInertiaWide,
        dt: f32,
        inverse_dt: f32,
        prestep: &DistanceLimitPrestepData,
        accumulated_impulses: &mut Vector<f32>,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let (jacobians, distance, use_minimum) =
            Self::compute_jacobians(position_a, orientation_a, inertia_a, position_b, orientation_b, inertia_b, prestep);

        let (mut position_error_to_velocity, mut effective_mass_cfm_scale, mut softness_impulse_scale) =
            Default::default();
        SpringSettingsWide::compute_springiness(
            &prestep.spring_settings,
            dt,
            &mut position_error_to_velocity,
            &mut effective_mass_cfm_scale,
            &mut softness_impulse_scale,
        );
        // Flipping the jacobians does not change the effective mass.
        let effective_mass = effective_mass_cfm_scale
            / DistanceServoFunctions::inverse_effective_mass(&jacobians, inertia_a, inertia_b);

        let error = use_minimum.select(prestep.minimum_distance - distance, distance - prestep.maximum_distance);
        let bias_velocity = InequalityHelpers::compute_bias_velocity(error, &position_error_to_velocity, inverse_dt);
        let csv = DistanceServoFunctions::constraint_space_velocity(&jacobians, wsv_a, wsv_b);
        let mut csi = (bias_velocity - csv) * effective_mass - *accumulated_impulses * softness_impulse_scale;
        InequalityHelpers::clamp_positive(accumulated_impulses, &mut csi);
        DistanceServoFunctions::apply_impulse(
            &jacobians,
            &inertia_a.inverse_mass,
            &inertia_b.inverse_mass,
            &csi,
            wsv_a,
            wsv_b,
        );
    }
}

pub type DistanceLimitTypeProcessor = TwoBodyTypeProcessor<DistanceLimitPrestepData, Vector<f32>, DistanceLimitFunctions>;

#[cfg(test)]
mod tests {
    use super::*;

    fn solve_at(separation: f32) -> (f32, BodyVelocityWide, BodyVelocityWide) {
        let mut prestep = DistanceLimitPrestepData::default();
        DistanceLimit::new(Vec3::new(0.0, 0.5, 0.0), Vec3::ZERO, 1.0, 2.0, SpringSettings::new(30.0, 1.0))
            .apply_description(&mut prestep, 0);
        let inertia = BodyInertiaWide {
            inverse_mass: Vector::splat(1.0),
            ..Default::default()
        };
        let mut impulse = Vector::splat(0.0);
        let (mut wsv_a, mut wsv_b) = (BodyVelocityWide::default(), BodyVelocityWide::default());
        for _ in 0..4 {
            DistanceLimitFunctions::solve(
                &Vector3Wide::default(),
                &QuaternionWide::identity(),
                &inertia,
                &Vector3Wide::broadcast(Vec3::new(separation, 0.5, 0.0)),
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
        (impulse[0], wsv_a, wsv_b)
    }

    #[test]
    fn test_limit_is_inactive_within_range() {
        let (impulse, wsv_a, _) = solve_at(1.5);
        assert_eq!(impulse, 0.0);
        assert_eq!(wsv_a.linear.read_slot(0), Vec3::ZERO);
    }

    #[test]
    fn test_limit_pulls_together_beyond_maximum() {
        let (impulse, wsv_a, wsv_b) = solve_at(3.0);
        assert!(impulse > 0.0);
        assert!(wsv_a.linear.x[0] > 0.0);
        assert!(wsv_b.linear.x[0] < 0.0);
    }

    #[test]
    fn test_limit_pushes_apart_below_minimum() {
        let (impulse, wsv_a, wsv_b) = solve_at(0.5);
        assert!(impulse > 0.0);
        assert!(wsv_a.linear.x[0] < 0.0);
        assert!(wsv_b.linear.x[0] > 0.0);
    }

    #[test]
    fn test_description_survives_bundle_storage() {
        let description = DistanceLimit::new(Vec3::X, Vec3::NEG_Y, 0.25, 3.0, SpringSettings::new(5.0, 0.5));
        let mut prestep = DistanceLimitPrestepData::default();
        description.apply_description(&mut prestep, 6);
        assert_eq!(DistanceLimit::build_description(&prestep, 6), description);
        assert!(DistanceLimit::new(Vec3::ZERO, Vec3::ZERO, 2.0, 1.0, SpringSettings::default()).validate().is_err());
    }
}
