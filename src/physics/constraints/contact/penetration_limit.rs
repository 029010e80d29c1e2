use crate::physics::body_properties::{BodyInertiaWide, BodyVelocityWide};
use crate::utilities::symmetric3x3_wide::Symmetric3x3Wide;
use crate::utilities::vector::Vector;
use crate::utilities::vector3_wide::Vector3Wide;

/// Nonnegative impulse along the contact normal keeping two bodies from approaching.
///
/// The normal points from B toward A. `contact_offset_a` is the offset from A's center to the
/// contact and `contact_offset_b` the offset from B's center to the same point.
pub struct PenetrationLimit;

impl PenetrationLimit {
    /// Computes the bias velocity from a penetration depth. Negative depths (speculative contacts)
    /// permit approach up to the point of touching.
    #[inline(always)]
    pub fn compute_bias_velocity(
        depth: &Vector<f32>,
        position_error_to_velocity: &Vector<f32>,
        maximum_recovery_velocity: &Vector<f32>,
        inverse_dt: &Vector<f32>,
    ) -> Vector<f32> {
        (*depth * *inverse_dt).simd_min((*depth * *position_error_to_velocity).simd_min(*maximum_recovery_velocity))
    }

    /// Applies the accumulated impulse change with the usual nonnegative clamp.
    #[inline(always)]
    pub fn clamp_accumulated(
        negated_csi: &Vector<f32>,
        accumulated_impulse: &mut Vector<f32>,
    ) -> Vector<f32> {
        let previous_accumulated = *accumulated_impulse;
        *accumulated_impulse = (*accumulated_impulse - *negated_csi).simd_max(Vector::splat(0.0));
        *accumulated_impulse - previous_accumulated
    }

    /// Predicts the change in depth from the velocities of the bodies over `dt`.
    #[inline(always)]
    pub fn update_penetration_depth(
        dt: &Vector<f32>,
        contact_offset_a: &Vector3Wide,
        offset_b: &Vector3Wide,
        normal: &Vector3Wide,
        velocity_a: &BodyVelocityWide,
        velocity_b: &BodyVelocityWide,
        penetration_depth: &mut Vector<f32>,
    ) {
        // Motion of A along the normal reduces depth, motion of B along the normal increases it.
        let contact_velocity_a = velocity_a.linear + Vector3Wide::cross(&velocity_a.angular, contact_offset_a);
        let contact_offset_b = *contact_offset_a - *offset_b;
        let contact_velocity_b = velocity_b.linear + Vector3Wide::cross(&velocity_b.angular, &contact_offset_b);
        let estimated_depth_change_velocity = Vector3Wide::dot(normal, &(contact_velocity_a - contact_velocity_b));
        *penetration_depth = *penetration_depth - estimated_depth_change_velocity * *dt;
    }

    #[inline(always)]
    #[allow(clippy::too_many_arguments)]
    pub fn apply_impulse(
        inertia_a: &BodyInertiaWide,
        inertia_b: &BodyInertiaWide,
        normal: &Vector3Wide,
        angular_a: &Vector3Wide,
        angular_b: &Vector3Wide,
        corrective_impulse: &Vector<f32>,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        wsv_a.linear += Vector3Wide::scale(normal, &(*corrective_impulse * inertia_a.inverse_mass));
        wsv_a.angular += Symmetric3x3Wide::transform(
            &Vector3Wide::scale(angular_a, corrective_impulse),
            &inertia_a.inverse_inertia_tensor,
        );
        // The linear jacobian of B is the negated normal.
        wsv_b.linear -= Vector3Wide::scale(normal, &(*corrective_impulse * inertia_b.inverse_mass));
        wsv_b.angular += Symmetric3x3Wide::transform(
            &Vector3Wide::scale(angular_b, corrective_impulse),
            &inertia_b.inverse_inertia_tensor,
        );
    }

    #[inline(always)]
    #[allow(clippy::too_many_arguments)]
    pub fn warm_start(
        inertia_a: &BodyInertiaWide,
        inertia_b: &BodyInertiaWide,
        normal: &Vector3Wide,
        contact_offset_a: &Vector3Wide,
        contact_offset_b: &Vector3Wide,
        accumulated_impulse: &Vector<f32>,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let angular_a = Vector3Wide::cross(contact_offset_a, normal);
        let angular_b = Vector3Wide::cross(normal, contact_offset_b);
        Self::apply_impulse(inertia_a, inertia_b, normal, &angular_a, &angular_b, accumulated_impulse, wsv_a, wsv_b);
    }

    #[inline(always)]
    #[allow(clippy::too_many_arguments)]
    pub fn solve(
        inertia_a: &BodyInertiaWide,
        inertia_b: &BodyInertiaWide,
        normal: &Vector3Wide,
        contact_offset_a: &Vector3Wide,
        contact_offset_b: &Vector3Wide,
        depth: &Vector<f32>,
        position_error_to_velocity: &Vector<f32>,
        effective_mass_cfm_scale: &Vector<f32>,
        maximum_recovery_velocity: &Vector<f32>,
        inverse_dt: &Vector<f32>,
        softness_impulse_scale: &Vector<f32>,
        accumulated_impulse: &mut Vector<f32>,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let angular_a = Vector3Wide::cross(contact_offset_a, normal);
        let angular_b = Vector3Wide::cross(normal, contact_offset_b);
        // dot(normal, normal) == 1, so each body's linear contribution is its inverse mass.
        let inverse_effective_mass = inertia_a.inverse_mass
            + inertia_b.inverse_mass
            + Symmetric3x3Wide::vector_sandwich(&angular_a, &inertia_a.inverse_inertia_tensor)
            + Symmetric3x3Wide::vector_sandwich(&angular_b, &inertia_b.inverse_inertia_tensor);
        let effective_mass = *effective_mass_cfm_scale / inverse_effective_mass;
        let bias_velocity =
            Self::compute_bias_velocity(depth, position_error_to_velocity, maximum_recovery_velocity, inverse_dt);

        let csv = Vector3Wide::dot(&wsv_a.linear, normal) - Vector3Wide::dot(&wsv_b.linear, normal)
            + Vector3Wide::dot(&wsv_a.angular, &angular_a)
            + Vector3Wide::dot(&wsv_b.angular, &angular_b);
        let negated_csi = *accumulated_impulse * *softness_impulse_scale + (csv - bias_velocity) * effective_mass;
        let corrective_impulse = Self::clamp_accumulated(&negated_csi, accumulated_impulse);
        Self::apply_impulse(inertia_a, inertia_b, normal, &angular_a, &angular_b, &corrective_impulse, wsv_a, wsv_b);
    }
}

/// Penetration limit for contacts whose other side cannot move.
pub struct PenetrationLimitOneBody;

impl PenetrationLimitOneBody {
    #[inline(always)]
    pub fn update_penetration_depth(
        dt: &Vector<f32>,
        contact_offset: &Vector3Wide,
        normal: &Vector3Wide,
        velocity: &BodyVelocityWide,
        penetration_depth: &mut Vector<f32>,
    ) {
        let contact_velocity = velocity.linear + Vector3Wide::cross(&velocity.angular, contact_offset);
        *penetration_depth = *penetration_depth - Vector3Wide::dot(normal, &contact_velocity) * *dt;
    }

    #[inline(always)]
    fn apply_impulse(
        inertia_a: &BodyInertiaWide,
        normal: &Vector3Wide,
        angular_a: &Vector3Wide,
        corrective_impulse: &Vector<f32>,
        wsv_a: &mut BodyVelocityWide,
    ) {
        wsv_a.linear += Vector3Wide::scale(normal, &(*corrective_impulse * inertia_a.inverse_mass));
        wsv_a.angular += Symmetric3x3Wide::transform(
            &Vector3Wide::scale(angular_a, corrective_impulse),
            &inertia_a.inverse_inertia_tensor,
        );
    }

    #[inline(always)]
    pub fn warm_start(
        inertia_a: &BodyInertiaWide,
        normal: &Vector3Wide,
        contact_offset_a: &Vector3Wide,
        accumulated_impulse: &Vector<f32>,
        wsv_a: &mut BodyVelocityWide,
    ) {
        let angular_a = Vector3Wide::cross(contact_offset_a, normal);
        Self::apply_impulse(inertia_a, normal, &angular_a, accumulated_impulse, wsv_a);
    }

    #[inline(always)]
    #[allow(clippy::too_many_arguments)]
    pub fn solve(
        inertia_a: &BodyInertiaWide,
        normal: &Vector3Wide,
        contact_offset_a: &Vector3Wide,
        depth: &Vector<f32>,
        position_error_to_velocity: &Vector<f32>,
        effective_mass_cfm_scale: &Vector<f32>,
        maximum_recovery_velocity: &Vector<f32>,
        inverse_dt: &Vector<f32>,
        softness_impulse_scale: &Vector<f32>,
        accumulated_impulse: &mut Vector<f32>,
        wsv_a: &mut BodyVelocityWide,
    ) {
        let angular_a = Vector3Wide::cross(contact_offset_a, normal);
        let inverse_effective_mass =
            inertia_a.inverse_mass + Symmetric3x3Wide::vector_sandwich(&angular_a, &inertia_a.inverse_inertia_tensor);
        let effective_mass = *effective_mass_cfm_scale / inverse_effective_mass;
        let bias_velocity = PenetrationLimit::compute_bias_velocity(
            depth,
            position_error_to_velocity,
            maximum_recovery_velocity,
            inverse_dt,
        );
        let csv = Vector3Wide::dot(&wsv_a.linear, normal) + Vector3Wide::dot(&wsv_a.angular, &angular_a);
        let negated_csi = *accumulated_impulse * *softness_impulse_scale + (csv - bias_velocity) * effective_mass;
        let corrective_impulse = PenetrationLimit::clamp_accumulated(&negated_csi, accumulated_impulse);
        Self::apply_impulse(inertia_a, normal, &angular_a, &corrective_impulse, wsv_a);
    }
}
