use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConstraintError;
use crate::physics::body_properties::{BodyInertiaWide, BodyVelocityWide};
use crate::physics::constraints::constraint_checker::ConstraintChecker;
use crate::physics::constraints::constraint_description::IConstraintDescription;
use crate::physics::constraints::servo_settings::{ServoSettings, ServoSettingsWide};
use crate::physics::constraints::spring_settings::{SpringSettings, SpringSettingsWide};
use crate::physics::constraints::two_body_type_processor::{ITwoBodyConstraintFunctions, TwoBodyTypeProcessor};
use crate::physics::constraints::type_processor::ITypeProcessor;
use crate::utilities::quaternion_wide::QuaternionWide;
use crate::utilities::symmetric3x3_wide::Symmetric3x3Wide;
use crate::utilities::vector::Vector;
use crate::utilities::vector3_wide::Vector3Wide;

/// Constrains points on two bodies to be separated by a goal distance.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceServo {
    /// Local offset from the center of body A to its attachment point.
    pub local_offset_a: Vec3,
    /// Local offset from the center of body B to its attachment point.
    pub local_offset_b: Vec3,
    /// Distance that the constraint will try to reach between the attachment points.
    pub target_distance: f32,
    /// Servo control parameters.
    pub servo_settings: ServoSettings,
    /// Spring frequency and damping parameters.
    pub spring_settings: SpringSettings,
}

impl DistanceServo {
    pub fn new(
        local_offset_a: Vec3,
        local_offset_b: Vec3,
        target_distance: f32,
        spring_settings: SpringSettings,
        servo_settings: ServoSettings,
    ) -> Self {
        Self {
            local_offset_a,
            local_offset_b,
            target_distance,
            servo_settings,
            spring_settings,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct DistanceServoPrestepData {
    pub local_offset_a: Vector3Wide,
    pub local_offset_b: Vector3Wide,
    pub target_distance: Vector<f32>,
    pub servo_settings: ServoSettingsWide,
    pub spring_settings: SpringSettingsWide,
}

impl IConstraintDescription for DistanceServo {
    type PrestepData = DistanceServoPrestepData;
    const CONSTRAINT_TYPE_ID: usize = 32;

    fn apply_description(&self, prestep_data: &mut DistanceServoPrestepData, inner_index: usize) {
        prestep_data.local_offset_a.write_slot(self.local_offset_a, inner_index);
        prestep_data.local_offset_b.write_slot(self.local_offset_b, inner_index);
        prestep_data.target_distance[inner_index] = self.target_distance;
        prestep_data.servo_settings.write_slot(&self.servo_settings, inner_index);
        prestep_data.spring_settings.write_slot(&self.spring_settings, inner_index);
    }

    fn build_description(prestep_data: &DistanceServoPrestepData, inner_index: usize) -> Self {
        Self {
            local_offset_a: prestep_data.local_offset_a.read_slot(inner_index),
            local_offset_b: prestep_data.local_offset_b.read_slot(inner_index),
            target_distance: prestep_data.target_distance[inner_index],
            servo_settings: prestep_data.servo_settings.read_slot(inner_index),
            spring_settings: prestep_data.spring_settings.read_slot(inner_index),
        }
    }

    fn validate(&self) -> Result<(), ConstraintError> {
        ConstraintChecker::require_finite_vec3(self.local_offset_a, "distance_servo.local_offset_a")?;
        ConstraintChecker::require_finite_vec3(self.local_offset_b, "distance_servo.local_offset_b")?;
        ConstraintChecker::require_nonnegative(self.target_distance, "distance_servo.target_distance")?;
        self.servo_settings.validate()?;
        self.spring_settings.validate()
    }

    fn create_type_processor() -> Box<dyn ITypeProcessor> {
        Box::new(DistanceServoTypeProcessor::new(Self::CONSTRAINT_TYPE_ID, 1))
    }
}

/// Jacobians and impulse-to-velocity transforms of a constraint acting along the line between two anchors.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct AnchorLineJacobians {
    /// Unit direction from anchor A to anchor B; the linear jacobian of A.
    pub direction: Vector3Wide,
    pub angular_ja: Vector3Wide,
    pub angular_jb: Vector3Wide,
    pub angular_impulse_to_velocity_a: Vector3Wide,
    pub angular_impulse_to_velocity_b: Vector3Wide,
}

pub struct DistanceServoFunctions;

impl DistanceServoFunctions {
    /// Computes the world anchor offsets and the distance between the anchors.
    #[inline(always)]
    pub(crate) fn get_distance(
        position_a: &Vector3Wide,
        orientation_a: &QuaternionWide,
        position_b: &Vector3Wide,
        orientation_b: &QuaternionWide,
        local_offset_a: &Vector3Wide,
        local_offset_b: &Vector3Wide,
    ) -> (Vector3Wide, Vector3Wide, Vector3Wide, Vector<f32>) {
        let anchor_offset_a = QuaternionWide::transform(local_offset_a, orientation_a);
        let anchor_offset_b = QuaternionWide::transform(local_offset_b, orientation_b);
        let anchor_offset = anchor_offset_b + (*position_b - *position_a) - anchor_offset_a;
        let distance = Vector3Wide::length(&anchor_offset);
        (anchor_offset_a, anchor_offset_b, anchor_offset, distance)
    }

    /// Builds the jacobians for the anchor line. If the anchors coincide there is no valid
    /// direction, so (1, 0, 0) is used.
    #[inline(always)]
    pub(crate) fn compute_jacobians(
        inertia_a: &BodyInertiaWide,
        inertia_b: &BodyInertiaWide,
        anchor_offset_a: &Vector3Wide,
        anchor_offset_b: &Vector3Wide,
        anchor_offset: &Vector3Wide,
        distance: &Vector<f32>,
    ) -> AnchorLineJacobians {
        let need_fallback = distance.simd_lt(Vector::splat(1e-9));
        let direction = Vector3Wide::conditional_select(
            need_fallback,
            &Vector3Wide::broadcast(Vec3::X),
            &Vector3Wide::scale(anchor_offset, &distance.recip()),
        );
        let angular_ja = Vector3Wide::cross(anchor_offset_a, &direction);
        let angular_jb = Vector3Wide::cross(&direction, anchor_offset_b);
        AnchorLineJacobians {
            direction,
            angular_ja,
            angular_jb,
            angular_impulse_to_velocity_a: Symmetric3x3Wide::transform(&angular_ja, &inertia_a.inverse_inertia_tensor),
            angular_impulse_to_velocity_b: Symmetric3x3Wide::transform(&angular_jb, &inertia_b.inverse_inertia_tensor),
        }
    }

    #[inline(always)]
    pub(crate) fn inverse_effective_mass(
        jacobians: &AnchorLineJacobians,
        inertia_a: &BodyInertiaWide,
        inertia_b: &BodyInertiaWide,
    ) -> Vector<f32> {
        inertia_a.inverse_mass
            + inertia_b.inverse_mass
            + Vector3Wide::dot(&jacobians.angular_ja, &jacobians.angular_impulse_to_velocity_a)
            + Vector3Wide::dot(&jacobians.angular_jb, &jacobians.angular_impulse_to_velocity_b)
    }

    /// Velocity at which the anchors approach each other along the line.
    #[inline(always)]
    pub(crate) fn constraint_space_velocity(
        jacobians: &AnchorLineJacobians,
        wsv_a: &BodyVelocityWide,
        wsv_b: &BodyVelocityWide,
    ) -> Vector<f32> {
        Vector3Wide::dot(&wsv_a.linear, &jacobians.direction) - Vector3Wide::dot(&wsv_b.linear, &jacobians.direction)
            + Vector3Wide::dot(&wsv_a.angular, &jacobians.angular_ja)
            + Vector3Wide::dot(&wsv_b.angular, &jacobians.angular_jb)
    }

    #[inline(always)]
    pub(crate) fn apply_impulse(
        jacobians: &AnchorLineJacobians,
        inverse_mass_a: &Vector<f32>,
        inverse_mass_b: &Vector<f32>,
        csi: &Vector<f32>,
        velocity_a: &mut BodyVelocityWide,
        velocity_b: &mut BodyVelocityWide,
    ) {
        velocity_a.linear += jacobians.direction * (*csi * *inverse_mass_a);
        velocity_a.angular += jacobians.angular_impulse_to_velocity_a * *csi;
        velocity_b.linear -= jacobians.direction * (*csi * *inverse_mass_b);
        velocity_b.angular += jacobians.angular_impulse_to_velocity_b * *csi;
    }

    #[inline(always)]
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn warm_start_along_anchor_line(
        position_a: &Vector3Wide,
        orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        position_b: &Vector3Wide,
        orientation_b: &QuaternionWide,
        inertia_b: &BodyInertiaWide,
        local_offset_a: &Vector3Wide,
        local_offset_b: &Vector3Wide,
        accumulated_impulse: &Vector<f32>,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let (anchor_offset_a, anchor_offset_b, anchor_offset, distance) =
            Self::get_distance(position_a, orientation_a, position_b, orientation_b, local_offset_a, local_offset_b);
        let jacobians =
            Self::compute_jacobians(inertia_a, inertia_b, &anchor_offset_a, &anchor_offset_b, &anchor_offset, &distance);
        Self::apply_impulse(
            &jacobians,
            &inertia_a.inverse_mass,
            &inertia_b.inverse_mass,
            accumulated_impulse,
            wsv_a,
            wsv_b,
        );
    }
}

impl ITwoBodyConstraintFunctions<DistanceServoPrestepData, Vector<f32>> for DistanceServoFunctions {
    #[inline(always)]
    fn warm_start(
        position_a: &Vector3Wide,
        orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        position_b: &Vector3Wide,
        orientation_b: &QuaternionWide,
        inertia_b: &BodyInertiaWide,
        prestep: &DistanceServoPrestepData,
        accumulated_impulses: &Vector<f32>,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        Self::warm_start_along_anchor_line(
            position_a,
            orientation_a,
            inertia_a,
            position_b,
            orientation_b,
            inertia_b,
            &prestep.local_offset_a,
            &prestep.local_offset_b,
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
        prestep: &DistanceServoPrestepData,
        accumulated_impulses: &mut Vector<f32>,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let (anchor_offset_a, anchor_offset_b, anchor_offset, distance) = Self::get_distance(
            position_a,
            orientation_a,
            position_b,
            orientation_b,
            &prestep.local_offset_a,
            &prestep.local_offset_b,
        );
        let jacobians =
            Self::compute_jacobians(inertia_a, inertia_b, &anchor_offset_a, &anchor_offset_b, &anchor_offset, &distance);

        let (mut position_error_to_velocity, mut effective_mass_cfm_scale, mut softness_impulse_scale) =
            Default::default();
        SpringSettingsWide::compute_springiness(
            &prestep.spring_settings,
            dt,
            &mut position_error_to_velocity,
            &mut effective_mass_cfm_scale,
            &mut softness_impulse_scale,
        );
        let effective_mass = effective_mass_cfm_scale / Self::inverse_effective_mass(&jacobians, inertia_a, inertia_b);

        let error = distance - prestep.target_distance;
        let (mut clamped_bias_velocity, mut maximum_impulse) = Default::default();
        ServoSettingsWide::compute_clamped_bias_velocity_1d(
            &error,
            &position_error_to_velocity,
            &prestep.servo_settings,
            dt,
            inverse_dt,
            &mut clamped_bias_velocity,
            &mut maximum_impulse,
        );

        let csv = Self::constraint_space_velocity(&jacobians, wsv_a, wsv_b);
        let mut csi = (clamped_bias_velocity - csv) * effective_mass - *accumulated_impulses * softness_impulse_scale;
        ServoSettingsWide::clamp_impulse_1d(&maximum_impulse, accumulated_impulses, &mut csi);
        Self::apply_impulse(
            &jacobians,
            &inertia_a.inverse_mass,
            &inertia_b.inverse_mass,
            &csi,
            wsv_a,
            wsv_b,
        );
    }
}

pub type DistanceServoTypeProcessor = TwoBodyTypeProcessor<DistanceServoPrestepData, Vector<f32>, DistanceServoFunctions>;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn test_anchor_velocity_matches_rigid_motion() {
        // The constraint space velocity must equal the approach rate of the two anchor points.
        let orientation_a = Quat::from_rotation_z(0.4);
        let local_offset_a = Vec3::new(0.5, 0.0, 0.0);
        let local_offset_b = Vec3::new(0.0, 0.3, 0.2);
        let position_b = Vec3::new(2.0, 1.0, 0.0);
        let (offset_a, offset_b, offset, distance) = DistanceServoFunctions::get_distance(
            &Vector3Wide::default(),
            &QuaternionWide::broadcast(orientation_a),
            &Vector3Wide::broadcast(position_b),
            &QuaternionWide::identity(),
            &Vector3Wide::broadcast(local_offset_a),
            &Vector3Wide::broadcast(local_offset_b),
        );
        let inertia = BodyInertiaWide::default();
        let jacobians = DistanceServoFunctions::compute_jacobians(&inertia, &inertia, &offset_a, &offset_b, &offset, &distance);
        let mut wsv_a = BodyVelocityWide::default();
        let mut wsv_b = BodyVelocityWide::default();
        let (linear_a, angular_a) = (Vec3::new(0.1, -0.2, 0.3), Vec3::new(0.0, 0.5, 1.0));
        let (linear_b, angular_b) = (Vec3::new(-0.4, 0.0, 0.1), Vec3::new(0.7, 0.0, -0.2));
        wsv_a.linear.write_slot(linear_a, 0);
        wsv_a.angular.write_slot(angular_a, 0);
        wsv_b.linear.write_slot(linear_b, 0);
        wsv_b.angular.write_slot(angular_b, 0);
        let csv = DistanceServoFunctions::constraint_space_velocity(&jacobians, &wsv_a, &wsv_b)[0];

        let world_offset_a = orientation_a * local_offset_a;
        let anchor_velocity_a = linear_a + angular_a.cross(world_offset_a);
        let anchor_velocity_b = linear_b + angular_b.cross(local_offset_b);
        let direction = (position_b + local_offset_b - world_offset_a).normalize();
        let expected = (anchor_velocity_a - anchor_velocity_b).dot(direction);
        assert!((csv - expected).abs() < 1e-5, "{csv} vs {expected}");
    }

    #[test]
    fn test_maximum_force_caps_accumulated_impulse() {
        let description = DistanceServo::new(
            Vec3::ZERO,
            Vec3::ZERO,
            1.0,
            SpringSettings::new(30.0, 1.0),
            ServoSettings::new(f32::MAX, 0.0, 6.0),
        );
        let mut prestep = DistanceServoPrestepData::default();
        description.apply_description(&mut prestep, 0);
        let inertia = BodyInertiaWide {
            inverse_mass: Vector::splat(1.0),
            ..Default::default()
        };
        let mut impulse = Vector::splat(0.0);
        let (mut wsv_a, mut wsv_b) = Default::default();
        for _ in 0..10 {
            DistanceServoFunctions::solve(
                &Vector3Wide::default(),
                &QuaternionWide::identity(),
                &inertia,
                &Vector3Wide::broadcast(Vec3::new(5.0, 0.0, 0.0)),
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
        assert!((impulse[0] - 0.1).abs() < 1e-6);
        assert_eq!(DistanceServo::build_description(&prestep, 0), description);
    }
}
