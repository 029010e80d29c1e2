use bytemuck::{Pod, Zeroable};

use crate::physics::constraints::spring_settings::SpringSettingsWide;
use crate::utilities::vector::Vector;
use crate::utilities::vector3_wide::Vector3Wide;

/// One contact of a convex manifold. All contacts in the manifold share the normal.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ConvexContactWide {
    /// Offset from the center of body A to the contact.
    pub offset_a: Vector3Wide,
    /// Penetration depth along the normal. Negative values are speculative.
    pub depth: Vector<f32>,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MaterialPropertiesWide {
    pub friction_coefficient: Vector<f32>,
    pub spring_settings: SpringSettingsWide,
    pub maximum_recovery_velocity: Vector<f32>,
}

pub struct FrictionHelpers;

impl FrictionHelpers {
    /// Averages the contact offsets of a manifold into the point where tangent and twist friction act.
    ///
    /// Contacts with nonnegative depth weigh 1 and speculative contacts weigh 0. If every contact
    /// is speculative, all contacts weigh equally.
    #[inline(always)]
    pub fn compute_friction_center<const N: usize>(contacts: &[ConvexContactWide; N]) -> Vector3Wide {
        let zero = Vector::<f32>::splat(0.0);
        let one = Vector::<f32>::splat(1.0);
        let mut weights = [zero; N];
        let mut weight_sum = zero;
        for (weight, contact) in weights.iter_mut().zip(contacts) {
            *weight = contact.depth.simd_lt(zero).select(zero, one);
            weight_sum += *weight;
        }
        let use_fallback = weight_sum.simd_eq(zero);
        let weight_sum = use_fallback.select(Vector::splat(N as f32), weight_sum);
        let inverse_weight_sum = one / weight_sum;
        let mut center = Vector3Wide::default();
        for (weight, contact) in weights.iter().zip(contacts) {
            let weight = use_fallback.select(inverse_weight_sum, *weight * inverse_weight_sum);
            center += Vector3Wide::scale(&contact.offset_a, &weight);
        }
        center
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn contact(offset: Vec3, depth: f32) -> ConvexContactWide {
        ConvexContactWide {
            offset_a: Vector3Wide::broadcast(offset),
            depth: Vector::splat(depth),
        }
    }

    #[test]
    fn test_speculative_contacts_are_ignored() {
        let center = FrictionHelpers::compute_friction_center(&[
            contact(Vec3::new(1.0, 0.0, 0.0), 0.1),
            contact(Vec3::new(-1.0, 0.0, 0.0), 0.0),
            contact(Vec3::new(0.0, 0.0, 5.0), -0.2),
        ]);
        assert_eq!(center.read_slot(0), Vec3::ZERO);
    }

    #[test]
    fn test_all_speculative_contacts_average_evenly() {
        let center = FrictionHelpers::compute_friction_center(&[
            contact(Vec3::new(2.0, 0.0, 0.0), -0.1),
            contact(Vec3::new(0.0, 2.0, 0.0), -0.3),
        ]);
        assert_eq!(center.read_slot(5), Vec3::new(1.0, 1.0, 0.0));
    }
}
