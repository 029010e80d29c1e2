use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConstraintError;
use crate::physics::body_properties::{BodyInertiaWide, BodyVelocityWide};
use crate::physics::constraints::constraint_checker::ConstraintChecker;
use crate::physics::constraints::constraint_description::IConstraintDescription;
use crate::physics::constraints::one_body_type_processor::{IOneBodyConstraintFunctions, OneBodyTypeProcessor};
use crate::physics::constraints::servo_settings::{ServoSettings, ServoSettingsWide};
use crate::physics::constraints::spring_settings::{SpringSettings, SpringSettingsWide};
use crate::physics::constraints::type_processor::ITypeProcessor;
use crate::utilities::quaternion_wide::QuaternionWide;
use crate::utilities::symmetric3x3_wide::Symmetric3x3Wide;
use crate::utilities::vector3_wide::Vector3Wide;

/// Pulls a point on a body toward a world space target.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OneBodyLinearServo {
    /// Offset to the attachment point in the local space of the body.
    pub local_offset: Vec3,
    /// Target position in world space.
    pub target: Vec3,
    /// Spring frequency and damping parameters.
    pub spring_settings: SpringSettings,
    /// Servo control parameters.
    pub servo_settings: ServoSettings,
}

impl OneBodyLinearServo {
    pub fn new(local_offset: Vec3, target: Vec3, spring_settings: SpringSettings, servo_settings: ServoSettings) -> Self {
        Self {
            local_offset,
            target,
            spring_settings,
            servo_settings,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct OneBodyLinearServoPrestepData {
    pub local_offset: Vector3Wide,
    pub target: Vector3Wide,
    pub spring_settings: SpringSettingsWide,
    pub servo_settings: ServoSettingsWide,
}

impl IConstraintDescription for OneBodyLinearServo {
    type PrestepData = OneBodyLinearServoPrestepData;
    const CONSTRAINT_TYPE_ID: usize = 36;

    fn apply_description(&self, prestep_data: &mut OneBodyLinearServoPrestepData, inner_index: usize) {
        prestep_data.local_offset.write_slot(self.local_offset, inner_index);
        prestep_data.target.write_slot(self.target, inner_index);
        prestep_data.spring_settings.write_slot(&self.spring_settings, inner_index);
        prestep_data.servo_settings.write_slot(&self.servo_settings, inner_index);
    }

    fn build_description(prestep_data: &OneBodyLinearServoPrestepData, inner_index: usize) -> Self {
        Self {
            local_offset: prestep_data.local_offset.read_slot(inner_index),
            target: prestep_data.target.read_slot(inner_index),
            spring_settings: prestep_data.spring_settings.read_slot(inner_index),
            servo_settings: prestep_data.servo_settings.read_slot(inner_index),
        }
    }

    fn validate(&self) -> Result<(), ConstraintError> {
        ConstraintChecker::require_finite_vec3(self.local_offset, "one_body_linear_servo.local_offset")?;
        ConstraintChecker::require_finite_vec3(self.target, "one_body_linear_servo.target")?;
        self.spring_settings.validate()?;
        self.servo_settings.validate()
    }

    fn create_type_processor() -> Box<dyn ITypeProcessor> {
        Box::new(OneBodyLinearServoTypeProcessor::new(Self::CONSTRAINT_TYPE_ID, 3))
    }
}

pub struct OneBodyLinearServoFunctions;

impl OneBodyLinearServoFunctions {
    #[inline(always)]
    fn apply_impulse(offset: &Vector3Wide, inertia: &BodyInertiaWide, velocity: &mut BodyVelocityWide, csi: &Vector3Wide) {
        let angular_impulse = Vector3Wide::cross(offset, csi);
        velocity.angular += Symmetric3x3Wide::transform(&angular_impulse, &inertia.inverse_inertia_tensor);
        velocity.linear += *csi * inertia.inverse_mass;
    }
}

impl IOneBodyConstraintFunctions<OneBodyLinearServoPrestepData, Vector3Wide> for OneBodyLinearServoFunctions {
    #[inline(always)]
    fn warm_start(
        _position_a: &Vector3Wide,
        orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        prestep: &OneBodyLinearServoPrestepData,
        accumulated_impulses: &Vector3Wide,
        wsv_a: &mut BodyVelocityWide,
    ) {
        let offset = QuaternionWide::transform(&prestep.local_offset, orientation_a);
        Self::apply_impulse(&offset, inertia_a, wsv_a, accumulated_impulses);
    }

    #[inline(always)]
    fn solve(
        position_a: &Vector3Wide,
        orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        dt: f32,
        inverse_dt: f32,
        prestep: &OneBodyLinearServoPrestepData,
        accumulated_impulses: &mut Vector3Wide,
        wsv_a: &mut BodyVelocityWide,
    ) {
        let offset = QuaternionWide::transform(&prestep.local_offset, orientation_a);
        let (mut position_error_to_velocity, mut effective_mass_cfm_scale, mut softness_impulse_scale) =
            Default::default();
        SpringSettingsWide::compute_springiness(
            &prestep.spring_settings,
            dt,
            &mut position_error_to_velocity,
            &mut effective_mass_cfm_scale,
            &mut softness_impulse_scale,
        );

        let error = prestep.target - (*position_a + offset);
        let (mut bias_velocity, mut maximum_impulse) = Default::default();
        ServoSettingsWide::compute_clamped_bias_velocity_3d(
            &error,
            &position_error_to_velocity,
            &prestep.servo_settings,
            dt,
            inverse_dt,
            &mut bias_velocity,
            &mut maximum_impulse,
        );

        // Same jacobians as a ball socket with only one body.
        let mut inverse_effective_mass = Symmetric3x3Wide::default();
        Symmetric3x3Wide::skew_sandwich_without_overlap(&offset, &inertia_a.inverse_inertia_tensor, &mut inverse_effective_mass);
        Symmetric3x3Wide::add_to_diagonal(&mut inverse_effective_mass, &inertia_a.inverse_mass);
        let mut effective_mass = Symmetric3x3Wide::default();
        Symmetric3x3Wide::invert(&inverse_effective_mass, &mut effective_mass);

        let csv = wsv_a.linear + Vector3Wide::cross(&wsv_a.angular, &offset);
        let mut csi = Symmetric3x3Wide::transform(&(bias_velocity - csv), &effective_mass) * effective_mass_cfm_scale
            - Vector3Wide::scale(accumulated_impulses, &softness_impulse_scale);
        ServoSettingsWide::clamp_impulse_3d(&maximum_impulse, accumulated_impulses, &mut csi);
        Self::apply_impulse(&offset, inertia_a, wsv_a, &csi);
    }
}

pub type OneBodyLinearServoTypeProcessor =
    OneBodyTypeProcessor<OneBodyLinearServoPrestepData, Vector3Wide, OneBodyLinearServoFunctions>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_properties::BodyInertia;
    use crate::utilities::vector::Vector;

    #[test]
    fn test_servo_speed_is_capped() {
        let mut prestep = OneBodyLinearServoPrestepData::default();
        let description = OneBodyLinearServo::new(
            Vec3::ZERO,
            Vec3::new(10.0, 0.0, 0.0),
            SpringSettings::new(30.0, 1.0),
            ServoSettings::new(2.0, 0.0, f32::MAX),
        );
        for lane in 0..Vector::<f32>::LEN {
            description.apply_description(&mut prestep, lane);
        }
        let body = BodyInertia::sphere(1.0, 0.5);
        let mut inertia = BodyInertiaWide::default();
        for lane in 0..Vector::<f32>::LEN {
            inertia.inverse_inertia_tensor.write_slot(&body.inverse_inertia_tensor, lane);
            inertia.inverse_mass[lane] = body.inverse_mass;
        }
        let mut impulse = Vector3Wide::default();
        let mut wsv = BodyVelocityWide::default();
        for _ in 0..16 {
            OneBodyLinearServoFunctions::solve(
                &Vector3Wide::default(),
                &QuaternionWide::identity(),
                &inertia,
                1.0 / 60.0,
                60.0,
                &prestep,
                &mut impulse,
                &mut wsv,
            );
        }
        let velocity = wsv.linear.read_slot(3);
        assert!(velocity.x > 0.0 && velocity.x <= 2.0 + 1e-4, "{velocity}");
        assert!(velocity.y.abs() < 1e-5 && velocity.z.abs() < 1e-5);
        assert_eq!(OneBodyLinearServo::build_description(&prestep, 3), description);
    }
}
