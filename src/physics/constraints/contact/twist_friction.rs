use crate::physics::body_properties::{BodyInertiaWide, BodyVelocityWide};
use crate::utilities::symmetric3x3_wide::Symmetric3x3Wide;
use crate::utilities::vector::Vector;
use crate::utilities::vector3_wide::Vector3Wide;

/// Friction opposing relative rotation around the contact normal.
pub struct TwistFriction;

impl TwistFriction {
    /// Inverts an inverse effective mass, treating a zero inverse (two immovable sides) as zero mass.
    #[inline(always)]
    pub(crate) fn guarded_effective_mass(inverse_effective_mass: Vector<f32>) -> Vector<f32> {
        let zero = Vector::<f32>::splat(0.0);
        inverse_effective_mass
            .simd_eq(zero)
            .select(zero, Vector::splat(1.0) / inverse_effective_mass)
    }

    #[inline(always)]
    pub(crate) fn clamp_accumulated(
        negated_csi: &Vector<f32>,
        maximum_impulse: &Vector<f32>,
        accumulated_impulse: &mut Vector<f32>,
    ) -> Vector<f32> {
        let previous_accumulated = *accumulated_impulse;
        *accumulated_impulse = (*accumulated_impulse - *negated_csi)
            .simd_min(*maximum_impulse)
            .simd_max(-*maximum_impulse);
        *accumulated_impulse - previous_accumulated
    }

    #[inline(always)]
    pub fn apply_impulse(
        angular_jacobian_a: &Vector3Wide,
        inertia_a: &BodyInertiaWide,
        inertia_b: &BodyInertiaWide,
        corrective_impulse: &Vector<f32>,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let world_impulse = Vector3Wide::scale(angular_jacobian_a, corrective_impulse);
        wsv_a.angular += Symmetric3x3Wide::transform(&world_impulse, &inertia_a.inverse_inertia_tensor);
        wsv_b.angular -= Symmetric3x3Wide::transform(&world_impulse, &inertia_b.inverse_inertia_tensor);
    }

    #[inline(always)]
    pub fn warm_start(
        angular_jacobian_a: &Vector3Wide,
        inertia_a: &BodyInertiaWide,
        inertia_b: &BodyInertiaWide,
        accumulated_impulse: &Vector<f32>,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        Self::apply_impulse(angular_jacobian_a, inertia_a, inertia_b, accumulated_impulse, wsv_a, wsv_b);
    }

    #[inline(always)]
    pub fn solve(
        angular_jacobian_a: &Vector3Wide,
        inertia_a: &BodyInertiaWide,
        inertia_b: &BodyInertiaWide,
        maximum_impulse: &Vector<f32>,
        accumulated_impulse: &mut Vector<f32>,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let effective_mass = Self::guarded_effective_mass(
            Symmetric3x3Wide::vector_sandwich(angular_jacobian_a, &inertia_a.inverse_inertia_tensor)
                + Symmetric3x3Wide::vector_sandwich(angular_jacobian_a, &inertia_b.inverse_inertia_tensor),
        );
        let negated_csi = (Vector3Wide::dot(&wsv_a.angular, angular_jacobian_a)
            - Vector3Wide::dot(&wsv_b.angular, angular_jacobian_a))
            * effective_mass;
        let corrective_impulse = Self::clamp_accumulated(&negated_csi, maximum_impulse, accumulated_impulse);
        Self::apply_impulse(angular_jacobian_a, inertia_a, inertia_b, &corrective_impulse, wsv_a, wsv_b);
    }
}

/// Twist friction for contacts whose other side cannot move.
pub struct TwistFrictionOneBody;

impl TwistFrictionOneBody {
    #[inline(always)]
    pub fn warm_start(
        angular_jacobian_a: &Vector3Wide,
        inertia_a: &BodyInertiaWide,
        accumulated_impulse: &Vector<f32>,
        wsv_a: &mut BodyVelocityWide,
    ) {
        let world_impulse = Vector3Wide::scale(angular_jacobian_a, accumulated_impulse);
        wsv_a.angular += Symmetric3x3Wide::transform(&world_impulse, &inertia_a.inverse_inertia_tensor);
    }

    #[inline(always)]
    pub fn solve(
        angular_jacobian_a: &Vector3Wide,
        inertia_a: &BodyInertiaWide,
        maximum_impulse: &Vector<f32>,
        accumulated_impulse: &mut Vector<f32>,
        wsv_a: &mut BodyVelocityWide,
    ) {
        let effective_mass = TwistFriction::guarded_effective_mass(Symmetric3x3Wide::vector_sandwich(
            angular_jacobian_a,
            &inertia_a.inverse_inertia_tensor,
        ));
        let negated_csi = Vector3Wide::dot(&wsv_a.angular, angular_jacobian_a) * effective_mass;
        let corrective_impulse = TwistFriction::clamp_accumulated(&negated_csi, maximum_impulse, accumulated_impulse);
        Self::warm_start(angular_jacobian_a, inertia_a, &corrective_impulse, wsv_a);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_properties::BodyInertia;
    use glam::Vec3;

    #[test]
    fn test_immovable_sides_produce_finite_zero_impulse() {
        let inertia = BodyInertiaWide::default();
        let mut wsv_a = BodyVelocityWide::default();
        wsv_a.angular = Vector3Wide::broadcast(Vec3::Y);
        let mut wsv_b = BodyVelocityWide::default();
        let mut accumulated = Vector::splat(0.0);
        TwistFriction::solve(
            &Vector3Wide::broadcast(Vec3::Y),
            &inertia,
            &inertia,
            &Vector::splat(10.0),
            &mut accumulated,
            &mut wsv_a,
            &mut wsv_b,
        );
        assert_eq!(accumulated[0], 0.0);
        assert_eq!(wsv_a.angular.read_slot(0), Vec3::Y);
    }

    #[test]
    fn test_twist_is_stopped_within_budget() {
        let body = BodyInertia::sphere(1.0, 1.0);
        let mut inertia = BodyInertiaWide::default();
        for lane in 0..Vector::<f32>::LEN {
            inertia.inverse_inertia_tensor.write_slot(&body.inverse_inertia_tensor, lane);
            inertia.inverse_mass[lane] = body.inverse_mass;
        }
        let mut wsv = BodyVelocityWide::default();
        wsv.angular = Vector3Wide::broadcast(Vec3::new(0.0, 1.0, 0.0));
        let mut accumulated = Vector::splat(0.0);
        TwistFrictionOneBody::solve(&Vector3Wide::broadcast(Vec3::Y), &inertia, &Vector::splat(100.0), &mut accumulated, &mut wsv);
        assert!(wsv.angular.read_slot(0).y.abs() < 1e-5);
        assert!(accumulated[0] < 0.0);
    }
}
