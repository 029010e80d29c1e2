use crate::physics::body_properties::{BodyInertiaWide, BodyVelocityWide};
use crate::utilities::symmetric3x3_wide::Symmetric3x3Wide;
use crate::utilities::vector::Vector;
use crate::utilities::vector3_wide::Vector3Wide;

/// Shared math for constraints that hold two anchor points together in all three linear directions.
///
/// Jacobians are `[I, -skew(offset_a), -I, skew(offset_b)]`.
pub struct BallSocketShared;

impl BallSocketShared {
    /// Computes the softened 3x3 effective mass of the anchor pair.
    #[inline(always)]
    pub fn compute_effective_mass(
        inertia_a: &BodyInertiaWide,
        inertia_b: &BodyInertiaWide,
        offset_a: &Vector3Wide,
        offset_b: &Vector3Wide,
        effective_mass_cfm_scale: &Vector<f32>,
    ) -> Symmetric3x3Wide {
        let mut angular_a = Symmetric3x3Wide::default();
        Symmetric3x3Wide::skew_sandwich_without_overlap(offset_a, &inertia_a.inverse_inertia_tensor, &mut angular_a);
        // The sign of offset_b cancels in the sandwich.
        let mut angular_b = Symmetric3x3Wide::default();
        Symmetric3x3Wide::skew_sandwich_without_overlap(offset_b, &inertia_b.inverse_inertia_tensor, &mut angular_b);
        let mut inverse_effective_mass = Symmetric3x3Wide::default();
        Symmetric3x3Wide::add(&angular_a, &angular_b, &mut inverse_effective_mass);
        Symmetric3x3Wide::add_to_diagonal(
            &mut inverse_effective_mass,
            &(inertia_a.inverse_mass + inertia_b.inverse_mass),
        );
        let mut effective_mass = Symmetric3x3Wide::default();
        Symmetric3x3Wide::invert(&inverse_effective_mass, &mut effective_mass);
        Symmetric3x3Wide::scale(&effective_mass, effective_mass_cfm_scale)
    }

    #[inline(always)]
    pub fn apply_impulse(
        velocity_a: &mut BodyVelocityWide,
        velocity_b: &mut BodyVelocityWide,
        offset_a: &Vector3Wide,
        offset_b: &Vector3Wide,
        inertia_a: &BodyInertiaWide,
        inertia_b: &BodyInertiaWide,
        constraint_space_impulse: &Vector3Wide,
    ) {
        let angular_impulse_a = Vector3Wide::cross(offset_a, constraint_space_impulse);
        velocity_a.angular += Symmetric3x3Wide::transform(&angular_impulse_a, &inertia_a.inverse_inertia_tensor);
        velocity_a.linear += *constraint_space_impulse * inertia_a.inverse_mass;
        let angular_impulse_b = Vector3Wide::cross(constraint_space_impulse, offset_b);
        velocity_b.angular += Symmetric3x3Wide::transform(&angular_impulse_b, &inertia_b.inverse_inertia_tensor);
        velocity_b.linear -= *constraint_space_impulse * inertia_b.inverse_mass;
    }

    /// Computes `effective_mass * (bias - csv) - accumulated * softness`.
    #[inline(always)]
    #[allow(clippy::too_many_arguments)]
    pub fn compute_corrective_impulse(
        velocity_a: &BodyVelocityWide,
        velocity_b: &BodyVelocityWide,
        offset_a: &Vector3Wide,
        offset_b: &Vector3Wide,
        bias_velocity: &Vector3Wide,
        effective_mass: &Symmetric3x3Wide,
        softness_impulse_scale: &Vector<f32>,
        accumulated_impulse: &Vector3Wide,
    ) -> Vector3Wide {
        // Relative velocity of anchor A with respect to anchor B.
        let csv = (velocity_a.linear - velocity_b.linear)
            + Vector3Wide::cross(&velocity_a.angular, offset_a)
            + Vector3Wide::cross(offset_b, &velocity_b.angular);
        Symmetric3x3Wide::transform(&(*bias_velocity - csv), effective_mass)
            - Vector3Wide::scale(accumulated_impulse, softness_impulse_scale)
    }

    #[inline(always)]
    #[allow(clippy::too_many_arguments)]
    pub fn solve(
        velocity_a: &mut BodyVelocityWide,
        velocity_b: &mut BodyVelocityWide,
        offset_a: &Vector3Wide,
        offset_b: &Vector3Wide,
        bias_velocity: &Vector3Wide,
        effective_mass: &Symmetric3x3Wide,
        softness_impulse_scale: &Vector<f32>,
        accumulated_impulse: &mut Vector3Wide,
        inertia_a: &BodyInertiaWide,
        inertia_b: &BodyInertiaWide,
    ) {
        let corrective_impulse = Self::compute_corrective_impulse(
            velocity_a,
            velocity_b,
            offset_a,
            offset_b,
            bias_velocity,
            effective_mass,
            softness_impulse_scale,
            accumulated_impulse,
        );
        *accumulated_impulse += corrective_impulse;
        Self::apply_impulse(velocity_a, velocity_b, offset_a, offset_b, inertia_a, inertia_b, &corrective_impulse);
    }
}
