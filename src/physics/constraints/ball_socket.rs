use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConstraintError;
use crate::physics::body_properties::{BodyInertiaWide, BodyVelocityWide};
use crate::physics::constraints::ball_socket_shared::BallSocketShared;
use crate::physics::constraints::constraint_checker::ConstraintChecker;
use crate::physics::constraints::constraint_description::IConstraintDescription;
use crate::physics::constraints::spring_settings::{SpringSettings, SpringSettingsWide};
use crate::physics::constraints::two_body_type_processor::{ITwoBodyConstraintFunctions, TwoBodyTypeProcessor};
use crate::physics::constraints::type_processor::ITypeProcessor;
use crate::utilities::quaternion_wide::QuaternionWide;
use crate::utilities::vector3_wide::Vector3Wide;

/// Constrains a point on one body to a point on another body.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallSocket {
    /// Offset from the center of body A to its attachment in A's local space.
    pub local_offset_a: Vec3,
    /// Offset from the center of body B to its attachment in B's local space.
    pub local_offset_b: Vec3,
    /// Spring frequency and damping parameters.
    pub spring_settings: SpringSettings,
}

impl BallSocket {
    pub fn new(local_offset_a: Vec3, local_offset_b: Vec3, spring_settings: SpringSettings) -> Self {
        Self {
            local_offset_a,
            local_offset_b,
            spring_settings,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BallSocketPrestepData {
    pub local_offset_a: Vector3Wide,
    pub local_offset_b: Vector3Wide,
    pub spring_settings: SpringSettingsWide,
}

impl IConstraintDescription for BallSocket {
    type PrestepData = BallSocketPrestepData;
    const CONSTRAINT_TYPE_ID: usize = 30;

    fn apply_description(&self, prestep_data: &mut BallSocketPrestepData, inner_index: usize) {
        prestep_data.local_offset_a.write_slot(self.local_offset_a, inner_index);
        prestep_data.local_offset_b.write_slot(self.local_offset_b, inner_index);
        prestep_data.spring_settings.write_slot(&self.spring_settings, inner_index);
    }

    fn build_description(prestep_data: &BallSocketPrestepData, inner_index: usize) -> Self {
        Self {
            local_offset_a: prestep_data.local_offset_a.read_slot(inner_index),
            local_offset_b: prestep_data.local_offset_b.read_slot(inner_index),
            spring_settings: prestep_data.spring_settings.read_slot(inner_index),
        }
    }

    fn validate(&self) -> Result<(), ConstraintError> {
        ConstraintChecker::require_finite_vec3(self.local_offset_a, "ball_socket.local_offset_a")?;
        ConstraintChecker::require_finite_vec3(self.local_offset_b, "ball_socket.local_offset_b")?;
        self.spring_settings.validate()
    }

    fn create_type_processor() -> Box<dyn ITypeProcessor> {
        Box::new(BallSocketTypeProcessor::new(Self::CONSTRAINT_TYPE_ID, 3))
    }
}

pub struct BallSocketFunctions;

impl ITwoBodyConstraintFunctions<BallSocketPrestepData, Vector3Wide> for BallSocketFunctions {
    #[inline(always)]
    fn warm_start(
        _position_a: &Vector3Wide,
        orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        _position_b: &Vector3Wide,
        orientation_b: &QuaternionWide,
        inertia_b: &BodyInertiaWide,
        prestep: &BallSocketPrestepData,
        accumulated_impulses: &Vector3Wide,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let offset_a = QuaternionWide::transform(&prestep.local_offset_a, orientation_a);
        let offset_b = QuaternionWide::transform(&prestep.local_offset_b, orientation_b);
        BallSocketShared::apply_impulse(wsv_a, wsv_b, &offset_a, &offset_b, inertia_a, inertia_b, accumulated_impulses);
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
        _inverse_dt: f32,
        prestep: &BallSocketPrestepData,
        accumulated_impulses: &mut Vector3Wide,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let offset_a = QuaternionWide::transform(&prestep.local_offset_a, orientation_a);
        let offset_b = QuaternionWide::transform(&prestep.local_offset_b, orientation_b);
        let (mut position_error_to_velocity, mut effective_mass_cfm_scale, mut softness_impulse_scale) =
            Default::default();
        SpringSettingsWide::compute_springiness(
            &prestep.spring_settings,
            dt,
            &mut position_error_to_velocity,
            &mut effective_mass_cfm_scale,
            &mut softness_impulse_scale,
        );
        let effective_mass =
            BallSocketShared::compute_effective_mass(inertia_a, inertia_b, &offset_a, &offset_b, &effective_mass_cfm_scale);

        // Error points from anchor A to anchor B so the bias pulls A toward B.
        let error = (*position_b - *position_a) + offset_b - offset_a;
        let bias_velocity = Vector3Wide::scale(&error, &position_error_to_velocity);
        BallSocketShared::solve(
            wsv_a,
            wsv_b,
            &offset_a,
            &offset_b,
            &bias_velocity,
            &effective_mass,
            &softness_impulse_scale,
            accumulated_impulses,
            inertia_a,
            inertia_b,
        );
    }
}

pub type BallSocketTypeProcessor = TwoBodyTypeProcessor<BallSocketPrestepData, Vector3Wide, BallSocketFunctions>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_properties::BodyInertia;
    use crate::utilities::vector::Vector;

    fn inertia(body: &BodyInertia) -> BodyInertiaWide {
        let mut wide = BodyInertiaWide::default();
        for lane in 0..Vector::<f32>::LEN {
            wide.inverse_inertia_tensor.write_slot(&body.inverse_inertia_tensor, lane);
            wide.inverse_mass[lane] = body.inverse_mass;
        }
        wide
    }

    #[test]
    fn test_converges_to_zero_anchor_velocity() {
        let mut prestep = BallSocketPrestepData::default();
        BallSocket::new(Vec3::new(0.5, 0.0, 0.0), Vec3::new(-0.5, 0.0, 0.0), SpringSettings::new(30.0, 1.0))
            .apply_description(&mut prestep, 0);
        let inertia_a = inertia(&BodyInertia::sphere(1.0, 0.5));
        let inertia_b = inertia(&BodyInertia::sphere(3.0, 0.5));
        let position_b = Vector3Wide::broadcast(Vec3::new(1.0, 0.0, 0.0));
        let mut wsv_a = BodyVelocityWide::default();
        wsv_a.linear.write_slot(Vec3::new(0.0, 2.0, 0.0), 0);
        let mut wsv_b = BodyVelocityWide::default();
        wsv_b.angular.write_slot(Vec3::new(0.0, 0.0, 1.0), 0);
        let mut impulse = Vector3Wide::default();
        for _ in 0..32 {
            BallSocketFunctions::solve(
                &Vector3Wide::default(),
                &QuaternionWide::identity(),
                &inertia_a,
                &position_b,
                &QuaternionWide::identity(),
                &inertia_b,
                1.0 / 60.0,
                60.0,
                &prestep,
                &mut impulse,
                &mut wsv_a,
                &mut wsv_b,
            );
        }
        // The anchors coincide, so the soft constraint only damps the initial 2.5 relative anchor speed.
        let offset_a = Vec3::new(0.5, 0.0, 0.0);
        let offset_b = Vec3::new(-0.5, 0.0, 0.0);
        let anchor_velocity_a = wsv_a.linear.read_slot(0) + wsv_a.angular.read_slot(0).cross(offset_a);
        let anchor_velocity_b = wsv_b.linear.read_slot(0) + wsv_b.angular.read_slot(0).cross(offset_b);
        assert!((anchor_velocity_a - anchor_velocity_b).length() < 0.5);
    }
}
