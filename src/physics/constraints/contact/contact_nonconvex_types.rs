use bytemuck::{Pod, Zeroable};

use crate::physics::body_properties::{BodyInertiaWide, BodyVelocityWide};
use crate::physics::constraints::contact::contact_convex_common::MaterialPropertiesWide;
use crate::physics::constraints::contact::contact_nonconvex_common::{NonconvexAccumulatedImpulses, NonconvexContactPrestepData};
use crate::physics::constraints::contact::penetration_limit::{PenetrationLimit, PenetrationLimitOneBody};
use crate::physics::constraints::contact::tangent_friction::{TangentFriction, TangentFrictionOneBody};
use crate::physics::constraints::one_body_type_processor::{IOneBodyConstraintFunctions, OneBodyTypeProcessor};
use crate::physics::constraints::spring_settings::SpringSettingsWide;
use crate::physics::constraints::two_body_type_processor::{ITwoBodyConstraintFunctions, TwoBodyTypeProcessor};
use crate::physics::helpers::Helpers;
use crate::utilities::quaternion_wide::QuaternionWide;
use crate::utilities::vector::Vector;
use crate::utilities::vector3_wide::Vector3Wide;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NonconvexOneBodyPrestepData<const N: usize> {
    pub material_properties: MaterialPropertiesWide,
    pub contacts: [NonconvexContactPrestepData; N],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NonconvexPrestepData<const N: usize> {
    pub offset_b: Vector3Wide,
    pub material_properties: MaterialPropertiesWide,
    pub contacts: [NonconvexContactPrestepData; N],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NonconvexContactAccumulatedImpulses<const N: usize> {
    pub contacts: [NonconvexAccumulatedImpulses; N],
}

unsafe impl<const N: usize> Zeroable for NonconvexOneBodyPrestepData<N> {}
unsafe impl<const N: usize> Pod for NonconvexOneBodyPrestepData<N> {}
unsafe impl<const N: usize> Zeroable for NonconvexPrestepData<N> {}
unsafe impl<const N: usize> Pod for NonconvexPrestepData<N> {}
unsafe impl<const N: usize> Zeroable for NonconvexContactAccumulatedImpulses<N> {}
unsafe impl<const N: usize> Pod for NonconvexContactAccumulatedImpulses<N> {}

impl<const N: usize> Default for NonconvexOneBodyPrestepData<N> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const N: usize> Default for NonconvexPrestepData<N> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const N: usize> Default for NonconvexContactAccumulatedImpulses<N> {
    fn default() -> Self {
        Self::zeroed()
    }
}

#[inline(always)]
fn tangents_of(normal: &Vector3Wide) -> (Vector3Wide, Vector3Wide) {
    let mut x = Vector3Wide::default();
    let mut z = Vector3Wide::default();
    Helpers::build_orthonormal_basis(normal, &mut x, &mut z);
    (x, z)
}

/// Solves nonconvex manifolds contact by contact. Each contact gets a penetration limit and
/// tangent friction bounded by its own normal impulse; there is no twist friction.
pub struct ContactNonconvexOneBodyFunctions<const N: usize>;

impl<const N: usize> IOneBodyConstraintFunctions<NonconvexOneBodyPrestepData<N>, NonconvexContactAccumulatedImpulses<N>>
    for ContactNonconvexOneBodyFunctions<N>
{
    const REQUIRES_INCREMENTAL_SUBSTEP_UPDATES: bool = true;

    #[inline(always)]
    fn warm_start(
        _position_a: &Vector3Wide,
        _orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        prestep: &NonconvexOneBodyPrestepData<N>,
        accumulated_impulses: &NonconvexContactAccumulatedImpulses<N>,
        wsv_a: &mut BodyVelocityWide,
    ) {
        for (contact, impulses) in prestep.contacts.iter().zip(&accumulated_impulses.contacts) {
            let (x, z) = tangents_of(&contact.normal);
            TangentFrictionOneBody::warm_start(&x, &z, &contact.offset, inertia_a, &impulses.tangent, wsv_a);
            PenetrationLimitOneBody::warm_start(inertia_a, &contact.normal, &contact.offset, &impulses.penetration, wsv_a);
        }
    }

    #[inline(always)]
    fn solve(
        _position_a: &Vector3Wide,
        _orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        dt: f32,
        inverse_dt: f32,
        prestep: &NonconvexOneBodyPrestepData<N>,
        accumulated_impulses: &mut NonconvexContactAccumulatedImpulses<N>,
        wsv_a: &mut BodyVelocityWide,
    ) {
        let material = &prestep.material_properties;
        let (mut position_error_to_velocity, mut effective_mass_cfm_scale, mut softness_impulse_scale) = Default::default();
        SpringSettingsWide::compute_springiness(
            &material.spring_settings,
            dt,
            &mut position_error_to_velocity,
            &mut effective_mass_cfm_scale,
            &mut softness_impulse_scale,
        );
        let inverse_dt_wide = Vector::<f32>::splat(inverse_dt);
        for (contact, impulses) in prestep.contacts.iter().zip(accumulated_impulses.contacts.iter_mut()) {
            PenetrationLimitOneBody::solve(
                inertia_a,
                &contact.normal,
                &contact.offset,
                &contact.depth,
                &position_error_to_velocity,
                &effective_mass_cfm_scale,
                &material.maximum_recovery_velocity,
                &inverse_dt_wide,
                &softness_impulse_scale,
                &mut impulses.penetration,
                wsv_a,
            );
            let (x, z) = tangents_of(&contact.normal);
            let maximum_tangent_impulse = material.friction_coefficient * impulses.penetration;
            TangentFrictionOneBody::solve(
                &x,
                &z,
                &contact.offset,
                inertia_a,
                &maximum_tangent_impulse,
                &mut impulses.tangent,
                wsv_a,
            );
        }
    }

    #[inline(always)]
    fn incrementally_update_for_substep(
        dt: &Vector<f32>,
        wsv_a: &BodyVelocityWide,
        prestep: &mut NonconvexOneBodyPrestepData<N>,
    ) {
        for contact in prestep.contacts.iter_mut() {
            PenetrationLimitOneBody::update_penetration_depth(dt, &contact.offset, &contact.normal, wsv_a, &mut contact.depth);
        }
    }
}

pub struct ContactNonconvexFunctions<const N: usize>;

impl<const N: usize> ITwoBodyConstraintFunctions<NonconvexPrestepData<N>, NonconvexContactAccumulatedImpulses<N>>
    for ContactNonconvexFunctions<N>
{
    const REQUIRES_INCREMENTAL_SUBSTEP_UPDATES: bool = true;

    #[inline(always)]
    fn warm_start(
        _position_a: &Vector3Wide,
        _orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        _position_b: &Vector3Wide,
        _orientation_b: &QuaternionWide,
        inertia_b: &BodyInertiaWide,
        prestep: &NonconvexPrestepData<N>,
        accumulated_impulses: &NonconvexContactAccumulatedImpulses<N>,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        for (contact, impulses) in prestep.contacts.iter().zip(&accumulated_impulses.contacts) {
            let offset_b = contact.offset - prestep.offset_b;
            let (x, z) = tangents_of(&contact.normal);
            TangentFriction::warm_start(
                &x,
                &z,
                &contact.offset,
                &offset_b,
                inertia_a,
                inertia_b,
                &impulses.tangent,
                wsv_a,
                wsv_b,
            );
            PenetrationLimit::warm_start(
                inertia_a,
                inertia_b,
                &contact.normal,
                &contact.offset,
                &offset_b,
                &impulses.penetration,
                wsv_a,
                wsv_b,
            );
        }
    }

    #[inline(always)]
    fn solve(
        _position_a: &Vector3Wide,
        _orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        _position_b: &Vector3Wide,
        _orientation_b: &QuaternionWide,
        inertia_b: &BodyInertiaWide,
        dt: f32,
        inverse_dt: f32,
        prestep: &NonconvexPrestepData<N>,
        accumulated_impulses: &mut NonconvexContactAccumulatedImpulses<N>,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let material = &prestep.material_properties;
        let (mut position_error_to_velocity, mut effective_mass_cfm_scale, mut softness_impulse_scale) = Default::default();
        SpringSettingsWide::compute_springiness(
            &material.spring_settings,
            dt,
            &mut position_error_to_velocity,
            &mut effective_mass_cfm_scale,
            &mut softness_impulse_scale,
        );
        let inverse_dt_wide = Vector::<f32>::splat(inverse_dt);
        for (contact, impulses) in prestep.contacts.iter().zip(accumulated_impulses.contacts.iter_mut()) {
            let offset_b = contact.offset - prestep.offset_b;
            PenetrationLimit::solve(
                inertia_a,
                inertia_b,
                &contact.normal,
                &contact.offset,
                &offset_b,
                &contact.depth,
                &position_error_to_velocity,
                &effective_mass_cfm_scale,
                &material.maximum_recovery_velocity,
                &inverse_dt_wide,
                &softness_impulse_scale,
                &mut impulses.penetration,
                wsv_a,
                wsv_b,
            );
            let (x, z) = tangents_of(&contact.normal);
            let maximum_tangent_impulse = material.friction_coefficient * impulses.penetration;
            TangentFriction::solve(
                &x,
                &z,
                &contact.offset,
                &offset_b,
                inertia_a,
                inertia_b,
                &maximum_tangent_impulse,
                &mut impulses.tangent,
                wsv_a,
                wsv_b,
            );
        }
    }

    #[inline(always)]
    fn incrementally_update_for_substep(
        dt: &Vector<f32>,
        wsv_a: &BodyVelocityWide,
        wsv_b: &BodyVelocityWide,
        prestep: &mut NonconvexPrestepData<N>,
    ) {
        for contact in prestep.contacts.iter_mut() {
            PenetrationLimit::update_penetration_depth(
                dt,
                &contact.offset,
                &prestep.offset_b,
                &contact.normal,
                wsv_a,
                wsv_b,
                &mut contact.depth,
            );
        }
    }
}

pub type ContactNonconvexOneBodyTypeProcessor<const N: usize> = OneBodyTypeProcessor<
    NonconvexOneBodyPrestepData<N>,
    NonconvexContactAccumulatedImpulses<N>,
    ContactNonconvexOneBodyFunctions<N>,
>;

pub type ContactNonconvexTypeProcessor<const N: usize> =
    TwoBodyTypeProcessor<NonconvexPrestepData<N>, NonconvexContactAccumulatedImpulses<N>, ContactNonconvexFunctions<N>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_properties::BodyInertia;
    use crate::physics::constraints::spring_settings::SpringSettings;
    use glam::Vec3;

    fn wide_inertia(body: &BodyInertia) -> BodyInertiaWide {
        let mut inertia = BodyInertiaWide::default();
        for lane in 0..Vector::<f32>::LEN {
            inertia.inverse_inertia_tensor.write_slot(&body.inverse_inertia_tensor, lane);
            inertia.inverse_mass[lane] = body.inverse_mass;
        }
        inertia
    }

    #[test]
    fn test_each_contact_pushes_along_its_own_normal() {
        // A ball wedged in a V: two contacts with normals tilted toward each other.
        let mut prestep = NonconvexPrestepData::<2>::default();
        let left = Vec3::new(1.0, 1.0, 0.0).normalize();
        let right = Vec3::new(-1.0, 1.0, 0.0).normalize();
        prestep.contacts[0].normal = Vector3Wide::broadcast(left);
        prestep.contacts[0].offset = Vector3Wide::broadcast(-left * 0.5);
        prestep.contacts[1].normal = Vector3Wide::broadcast(right);
        prestep.contacts[1].offset = Vector3Wide::broadcast(-right * 0.5);
        prestep.offset_b = Vector3Wide::broadcast(Vec3::new(0.0, -2.0, 0.0));
        prestep.material_properties.maximum_recovery_velocity = Vector::splat(2.0);
        for lane in 0..Vector::<f32>::LEN {
            prestep.material_properties.spring_settings.write_slot(&SpringSettings::new(30.0, 1.0), lane);
        }
        let inertia_a = wide_inertia(&BodyInertia::sphere(1.0, 0.5));
        let inertia_b = BodyInertiaWide::default();
        let mut wsv_a = BodyVelocityWide::default();
        wsv_a.linear = Vector3Wide::broadcast(Vec3::new(0.0, -3.0, 0.0));
        let mut wsv_b = BodyVelocityWide::default();
        let mut impulses = NonconvexContactAccumulatedImpulses::<2>::default();
        for _ in 0..16 {
            ContactNonconvexFunctions::<2>::solve(
                &Vector3Wide::default(),
                &QuaternionWide::identity(),
                &inertia_a,
                &Vector3Wide::default(),
                &QuaternionWide::identity(),
                &inertia_b,
                1.0 / 60.0,
                60.0,
                &prestep,
                &mut impulses,
                &mut wsv_a,
                &mut wsv_b,
            );
        }
        let velocity = wsv_a.linear.read_slot(0);
        assert!(velocity.y.abs() < 0.3, "{velocity}");
        assert!(velocity.x.abs() < 1e-3);
        assert!((impulses.contacts[0].penetration[0] - impulses.contacts[1].penetration[0]).abs() < 1e-3);
        assert!(impulses.contacts[0].penetration[0] > 0.0);
        // Static B never moves.
        assert_eq!(wsv_b.linear.read_slot(0), Vec3::ZERO);
    }

    #[test]
    fn test_depth_update_uses_per_contact_normal() {
        let mut prestep = NonconvexOneBodyPrestepData::<2>::default();
        prestep.contacts[0].normal = Vector3Wide::broadcast(Vec3::Y);
        prestep.contacts[1].normal = Vector3Wide::broadcast(Vec3::X);
        let mut velocity = BodyVelocityWide::default();
        velocity.linear = Vector3Wide::broadcast(Vec3::new(0.0, -1.0, 0.0));
        ContactNonconvexOneBodyFunctions::<2>::incrementally_update_for_substep(&Vector::splat(0.5), &velocity, &mut prestep);
        assert_eq!(prestep.contacts[0].depth[0], 0.5);
        assert_eq!(prestep.contacts[1].depth[0], 0.0);
    }
}
