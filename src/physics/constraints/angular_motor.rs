use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConstraintError;
use crate::physics::body_properties::{BodyInertiaWide, BodyVelocityWide};
use crate::physics::constraints::constraint_checker::ConstraintChecker;
use crate::physics::constraints::constraint_description::IConstraintDescription;
use crate::physics::constraints::motor_settings::{MotorSettings, MotorSettingsWide};
use crate::physics::constraints::servo_settings::ServoSettingsWide;
use crate::physics::constraints::two_body_type_processor::{ITwoBodyConstraintFunctions, TwoBodyTypeProcessor};
use crate::physics::constraints::type_processor::ITypeProcessor;
use crate::utilities::quaternion_wide::QuaternionWide;
use crate::utilities::symmetric3x3_wide::Symmetric3x3Wide;
use crate::utilities::vector3_wide::Vector3Wide;

/// Constrains the relative angular velocity between two bodies to a target.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngularMotor {
    /// Target angular velocity of B relative to A, stored in A's local space.
    /// The world space target for B is `angular_velocity_a + orientation_a * target_velocity_local_a`.
    pub target_velocity_local_a: Vec3,
    /// Motor control parameters.
    pub settings: MotorSettings,
}

impl AngularMotor {
    pub fn new(target_velocity_local_a: Vec3, settings: MotorSettings) -> Self {
        Self {
            target_velocity_local_a,
            settings,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct AngularMotorPrestepData {
    pub target_velocity_local_a: Vector3Wide,
    pub settings: MotorSettingsWide,
}

impl IConstraintDescription for AngularMotor {
    type PrestepData = AngularMotorPrestepData;
    const CONSTRAINT_TYPE_ID: usize = 35;

    fn apply_description(&self, prestep_data: &mut AngularMotorPrestepData, inner_index: usize) {
        prestep_data.target_velocity_local_a.write_slot(self.target_velocity_local_a, inner_index);
        prestep_data.settings.write_slot(&self.settings, inner_index);
    }

    fn build_description(prestep_data: &AngularMotorPrestepData, inner_index: usize) -> Self {
        Self {
            target_velocity_local_a: prestep_data.target_velocity_local_a.read_slot(inner_index),
            settings: prestep_data.settings.read_slot(inner_index),
        }
    }

    fn validate(&self) -> Result<(), ConstraintError> {
        ConstraintChecker::require_finite_vec3(self.target_velocity_local_a, "angular_motor.target_velocity_local_a")?;
        self.settings.validate()
    }

    fn create_type_processor() -> Box<dyn ITypeProcessor> {
        Box::new(AngularMotorTypeProcessor::new(Self::CONSTRAINT_TYPE_ID, 3))
    }
}

pub struct AngularMotorFunctions;

impl AngularMotorFunctions {
    /// Jacobians are `-I` for A and `I` for B.
    #[inline(always)]
    fn apply_impulse(
        angular_velocity_a: &mut Vector3Wide,
        angular_velocity_b: &mut Vector3Wide,
        inertia_a: &BodyInertiaWide,
        inertia_b: &BodyInertiaWide,
        csi: &Vector3Wide,
    ) {
        *angular_velocity_a -= Symmetric3x3Wide::transform(csi, &inertia_a.inverse_inertia_tensor);
        *angular_velocity_b += Symmetric3x3Wide::transform(csi, &inertia_b.inverse_inertia_tensor);
    }
}

impl ITwoBodyConstraintFunctions<AngularMotorPrestepData, Vector3Wide> for AngularMotorFunctions {
    #[inline(always)]
    fn warm_start(
        _position_a: &Vector3Wide,
        _orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        _position_b: &Vector3Wide,
        _orientation_b: &QuaternionWide,
        inertia_b: &BodyInertiaWide,
        _prestep: &AngularMotorPrestepData,
        accumulated_impulses: &Vector3Wide,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        Self::apply_impulse(&mut wsv_a.angular, &mut wsv_b.angular, inertia_a, inertia_b, accumulated_impulses);
    }

    #[inline(always)]
    fn solve(
        _position_a: &Vector3Wide,
        orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        _position_b: &Vector3Wide,
        _orientation_b: &QuaternionWide,
        inertia_b: &BodyInertiaWide,
        dt: f32,
        _inverse_dt: f32,
        prestep: &AngularMotorPrestepData,
        accumulated_impulses: &mut Vector3Wide,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let (mut effective_mass_cfm_scale, mut softness_impulse_scale, mut maximum_impulse) = Default::default();
        MotorSettingsWide::compute_softness(
            &prestep.settings,
            dt,
            &mut effective_mass_cfm_scale,
            &mut softness_impulse_scale,
            &mut maximum_impulse,
        );
        let mut inverse_effective_mass = Symmetric3x3Wide::default();
        Symmetric3x3Wide::add(
            &inertia_a.inverse_inertia_tensor,
            &inertia_b.inverse_inertia_tensor,
            &mut inverse_effective_mass,
        );
        let mut effective_mass = Symmetric3x3Wide::default();
        Symmetric3x3Wide::invert(&inverse_effective_mass, &mut effective_mass);

        let target_velocity = QuaternionWide::transform(&prestep.target_velocity_local_a, orientation_a);
        let csv = wsv_b.angular - wsv_a.angular;
        // The softness scales the impulse rather than the effective mass.
        let mut csi = Symmetric3x3Wide::transform(&(target_velocity - csv), &effective_mass) * effective_mass_cfm_scale
            - Vector3Wide::scale(accumulated_impulses, &softness_impulse_scale);
        ServoSettingsWide::clamp_impulse_3d(&maximum_impulse, accumulated_impulses, &mut csi);
        Self::apply_impulse(&mut wsv_a.angular, &mut wsv_b.angular, inertia_a, inertia_b, &csi);
    }
}

pub type AngularMotorTypeProcessor = TwoBodyTypeProcessor<AngularMotorPrestepData, Vector3Wide, AngularMotorFunctions>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_properties::BodyInertia;

    fn sphere_inertia() -> BodyInertiaWide {
        let body = BodyInertia::sphere(1.0, 1.0);
        let mut wide = BodyInertiaWide::default();
        wide.inverse_inertia_tensor.write_slot(&body.inverse_inertia_tensor, 0);
        wide.inverse_mass[0] = body.inverse_mass;
        wide
    }

    fn run(settings: MotorSettings, iterations: usize) -> (Vector3Wide, BodyVelocityWide, BodyVelocityWide) {
        let mut prestep = AngularMotorPrestepData::default();
        AngularMotor::new(Vec3::new(0.0, 2.0, 0.0), settings).apply_description(&mut prestep, 0);
        let inertia = sphere_inertia();
        let mut impulse = Vector3Wide::default();
        let (mut wsv_a, mut wsv_b) = (BodyVelocityWide::default(), BodyVelocityWide::default());
        for _ in 0..iterations {
            AngularMotorFunctions::solve(
                &Vector3Wide::default(),
                &QuaternionWide::identity(),
                &inertia,
                &Vector3Wide::default(),
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
    fn test_motor_reaches_target_relative_velocity() {
        let (_, wsv_a, wsv_b) = run(MotorSettings::new(f32::MAX, 0.0), 1);
        let relative = wsv_b.angular.read_slot(0) - wsv_a.angular.read_slot(0);
        assert!((relative - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-4, "{relative}");
        // Equal and opposite angular impulses on identical bodies.
        assert!((wsv_a.angular.read_slot(0) + wsv_b.angular.read_slot(0)).length() < 1e-5);
    }

    #[test]
    fn test_maximum_force_limits_impulse_magnitude() {
        let (impulse, _, _) = run(MotorSettings::new(3.0, 0.0), 10);
        let magnitude = Vector3Wide::length(&impulse)[0];
        assert!(magnitude <= 3.0 / 60.0 + 1e-6);
        assert!(magnitude > 0.0);
    }
}
