use bytemuck::{Pod, Zeroable};

use crate::physics::body_properties::{BodyInertiaWide, BodyVelocityWide};
use crate::physics::constraints::contact::contact_convex_common::{ConvexContactWide, FrictionHelpers, MaterialPropertiesWide};
use crate::physics::constraints::contact::penetration_limit::{PenetrationLimit, PenetrationLimitOneBody};
use crate::physics::constraints::contact::tangent_friction::{TangentFriction, TangentFrictionOneBody};
use crate::physics::constraints::contact::twist_friction::{TwistFriction, TwistFrictionOneBody};
use crate::physics::constraints::one_body_type_processor::{IOneBodyConstraintFunctions, OneBodyTypeProcessor};
use crate::physics::constraints::spring_settings::SpringSettingsWide;
use crate::physics::constraints::two_body_type_processor::{ITwoBodyConstraintFunctions, TwoBodyTypeProcessor};
use crate::physics::helpers::Helpers;
use crate::utilities::quaternion_wide::QuaternionWide;
use crate::utilities::vector::Vector;
use crate::utilities::vector2_wide::Vector2Wide;
use crate::utilities::vector3_wide::Vector3Wide;

/// Accumulated impulses of a convex manifold with `N` contacts.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactAccumulatedImpulses<const N: usize> {
    pub tangent: Vector2Wide,
    pub penetration: [Vector<f32>; N],
    pub twist: Vector<f32>,
}

/// Prestep data of a convex manifold between a body and something that cannot move.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactOneBodyPrestepData<const N: usize> {
    pub contacts: [ConvexContactWide; N],
    pub normal: Vector3Wide,
    pub material_properties: MaterialPropertiesWide,
}

/// Prestep data of a convex manifold between two bodies.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactPrestepData<const N: usize> {
    pub contacts: [ConvexContactWide; N],
    /// Offset from the center of body A to the center of body B.
    pub offset_b: Vector3Wide,
    /// Surface normal pointing from B toward A.
    pub normal: Vector3Wide,
    pub material_properties: MaterialPropertiesWide,
}

// Every field is a run of 32 byte lanes, so none of these layouts contain padding.
unsafe impl<const N: usize> Zeroable for ContactAccumulatedImpulses<N> {}
unsafe impl<const N: usize> Pod for ContactAccumulatedImpulses<N> {}
unsafe impl<const N: usize> Zeroable for ContactOneBodyPrestepData<N> {}
unsafe impl<const N: usize> Pod for ContactOneBodyPrestepData<N> {}
unsafe impl<const N: usize> Zeroable for ContactPrestepData<N> {}
unsafe impl<const N: usize> Pod for ContactPrestepData<N> {}

impl<const N: usize> Default for ContactAccumulatedImpulses<N> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const N: usize> Default for ContactOneBodyPrestepData<N> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const N: usize> Default for ContactPrestepData<N> {
    fn default() -> Self {
        Self::zeroed()
    }
}

#[inline(always)]
fn compute_springiness(material: &MaterialPropertiesWide, dt: f32) -> (Vector<f32>, Vector<f32>, Vector<f32>) {
    let (mut position_error_to_velocity, mut effective_mass_cfm_scale, mut softness_impulse_scale) = Default::default();
    SpringSettingsWide::compute_springiness(
        &material.spring_settings,
        dt,
        &mut position_error_to_velocity,
        &mut effective_mass_cfm_scale,
        &mut softness_impulse_scale,
    );
    (position_error_to_velocity, effective_mass_cfm_scale, softness_impulse_scale)
}

#[inline(always)]
fn build_tangents(normal: &Vector3Wide) -> (Vector3Wide, Vector3Wide) {
    let mut x = Vector3Wide::default();
    let mut z = Vector3Wide::default();
    Helpers::build_orthonormal_basis(normal, &mut x, &mut z);
    (x, z)
}

/// Computes the friction budgets of a convex manifold.
///
/// Tangent friction is bounded by the friction coefficient times the mean normal impulse. Twist
/// friction additionally weighs each normal impulse by its contact's distance from the friction
/// center. A single contact has no patch, so the depth stands in for the lever arm.
#[inline(always)]
fn compute_maximum_friction_impulses<const N: usize>(
    friction_coefficient: &Vector<f32>,
    contacts: &[ConvexContactWide; N],
    penetration_impulses: &[Vector<f32>; N],
    offset_to_manifold_center_a: &Vector3Wide,
) -> (Vector<f32>, Vector<f32>) {
    if N == 1 {
        let maximum_tangent = *friction_coefficient * penetration_impulses[0];
        let maximum_twist = maximum_tangent * contacts[0].depth.simd_max(Vector::splat(0.0));
        return (maximum_tangent, maximum_twist);
    }
    let premultiplied_friction_coefficient = Vector::<f32>::splat(1.0 / N as f32) * *friction_coefficient;
    let mut penetration_sum = Vector::<f32>::splat(0.0);
    let mut twist_lever_sum = Vector::<f32>::splat(0.0);
    for (contact, impulse) in contacts.iter().zip(penetration_impulses) {
        penetration_sum += *impulse;
        twist_lever_sum += *impulse * Vector3Wide::distance(offset_to_manifold_center_a, &contact.offset_a);
    }
    (
        premultiplied_friction_coefficient * penetration_sum,
        premultiplied_friction_coefficient * twist_lever_sum,
    )
}

pub struct ContactOneBodyFunctions<const N: usize>;

impl<const N: usize> IOneBodyConstraintFunctions<ContactOneBodyPrestepData<N>, ContactAccumulatedImpulses<N>>
    for ContactOneBodyFunctions<N>
{
    const REQUIRES_INCREMENTAL_SUBSTEP_UPDATES: bool = true;

    #[inline(always)]
    fn warm_start(
        _position_a: &Vector3Wide,
        _orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        prestep: &ContactOneBodyPrestepData<N>,
        accumulated_impulses: &ContactAccumulatedImpulses<N>,
        wsv_a: &mut BodyVelocityWide,
    ) {
        let (x, z) = build_tangents(&prestep.normal);
        let offset_to_manifold_center_a = FrictionHelpers::compute_friction_center(&prestep.contacts);
        TangentFrictionOneBody::warm_start(&x, &z, &offset_to_manifold_center_a, inertia_a, &accumulated_impulses.tangent, wsv_a);
        for (contact, impulse) in prestep.contacts.iter().zip(&accumulated_impulses.penetration) {
            PenetrationLimitOneBody::warm_start(inertia_a, &prestep.normal, &contact.offset_a, impulse, wsv_a);
        }
        TwistFrictionOneBody::warm_start(&prestep.normal, inertia_a, &accumulated_impulses.twist, wsv_a);
    }

    #[inline(always)]
    fn solve(
        _position_a: &Vector3Wide,
        _orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        dt: f32,
        inverse_dt: f32,
        prestep: &ContactOneBodyPrestepData<N>,
        accumulated_impulses: &mut ContactAccumulatedImpulses<N>,
        wsv_a: &mut BodyVelocityWide,
    ) {
        let material = &prestep.material_properties;
        let (position_error_to_velocity, effective_mass_cfm_scale, softness_impulse_scale) =
            compute_springiness(material, dt);
        let inverse_dt_wide = Vector::<f32>::splat(inverse_dt);
        // Penetration first so that friction, solved last, is more authoritative.
        for (contact, impulse) in prestep.contacts.iter().zip(accumulated_impulses.penetration.iter_mut()) {
            PenetrationLimitOneBody::solve(
                inertia_a,
                &prestep.normal,
                &contact.offset_a,
                &contact.depth,
                &position_error_to_velocity,
                &effective_mass_cfm_scale,
                &material.maximum_recovery_velocity,
                &inverse_dt_wide,
                &softness_impulse_scale,
                impulse,
                wsv_a,
            );
        }
        let (x, z) = build_tangents(&prestep.normal);
        let offset_to_manifold_center_a = FrictionHelpers::compute_friction_center(&prestep.contacts);
        let (maximum_tangent_impulse, maximum_twist_impulse) = compute_maximum_friction_impulses(
            &material.friction_coefficient,
            &prestep.contacts,
            &accumulated_impulses.penetration,
            &offset_to_manifold_center_a,
        );
        TangentFrictionOneBody::solve(
            &x,
            &z,
            &offset_to_manifold_center_a,
            inertia_a,
            &maximum_tangent_impulse,
            &mut accumulated_impulses.tangent,
            wsv_a,
        );
        TwistFrictionOneBody::solve(
            &prestep.normal,
            inertia_a,
            &maximum_twist_impulse,
            &mut accumulated_impulses.twist,
            wsv_a,
        );
    }

    #[inline(always)]
    fn incrementally_update_for_substep(
        dt: &Vector<f32>,
        wsv_a: &BodyVelocityWide,
        prestep: &mut ContactOneBodyPrestepData<N>,
    ) {
        for contact in prestep.contacts.iter_mut() {
            PenetrationLimitOneBody::update_penetration_depth(dt, &contact.offset_a, &prestep.normal, wsv_a, &mut contact.depth);
        }
    }
}

pub struct ContactFunctions<const N: usize>;

impl<const N: usize> ITwoBodyConstraintFunctions<ContactPrestepData<N>, ContactAccumulatedImpulses<N>> for ContactFunctions<N> {
    const REQUIRES_INCREMENTAL_SUBSTEP_UPDATES: bool = true;

    #[inline(always)]
    fn warm_start(
        _position_a: &Vector3Wide,
        _orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        _position_b: &Vector3Wide,
        _orientation_b: &QuaternionWide,
        inertia_b: &BodyInertiaWide,
        prestep: &ContactPrestepData<N>,
        accumulated_impulses: &ContactAccumulatedImpulses<N>,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let (x, z) = build_tangents(&prestep.normal);
        let offset_to_manifold_center_a = FrictionHelpers::compute_friction_center(&prestep.contacts);
        let offset_to_manifold_center_b = offset_to_manifold_center_a - prestep.offset_b;
        TangentFriction::warm_start(
            &x,
            &z,
            &offset_to_manifold_center_a,
            &offset_to_manifold_center_b,
            inertia_a,
            inertia_b,
            &accumulated_impulses.tangent,
            wsv_a,
            wsv_b,
        );
        for (contact, impulse) in prestep.contacts.iter().zip(&accumulated_impulses.penetration) {
            let contact_offset_b = contact.offset_a - prestep.offset_b;
            PenetrationLimit::warm_start(
                inertia_a,
                inertia_b,
                &prestep.normal,
                &contact.offset_a,
                &contact_offset_b,
                impulse,
                wsv_a,
                wsv_b,
            );
        }
        TwistFriction::warm_start(&prestep.normal, inertia_a, inertia_b, &accumulated_impulses.twist, wsv_a, wsv_b);
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
        prestep: &ContactPrestepData<N>,
        accumulated_impulses: &mut ContactAccumulatedImpulses<N>,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let material = &prestep.material_properties;
        let (position_error_to_velocity, effective_mass_cfm_scale, softness_impulse_scale) =
            compute_springiness(material, dt);
        let inverse_dt_wide = Vector::<f32>::splat(inverse_dt);
        for (contact, impulse) in prestep.contacts.iter().zip(accumulated_impulses.penetration.iter_mut()) {
            let contact_offset_b = contact.offset_a - prestep.offset_b;
            PenetrationLimit::solve(
                inertia_a,
                inertia_b,
                &prestep.normal,
                &contact.offset_a,
                &contact_offset_b,
                &contact.depth,
                &position_error_to_velocity,
                &effective_mass_cfm_scale,
                &material.maximum_recovery_velocity,
                &inverse_dt_wide,
                &softness_impulse_scale,
                impulse,
                wsv_a,
                wsv_b,
            );
        }
        let (x, z) = build_tangents(&prestep.normal);
        let offset_to_manifold_center_a = FrictionHelpers::compute_friction_center(&prestep.contacts);
        let offset_to_manifold_center_b = offset_to_manifold_center_a - prestep.offset_b;
        let (maximum_tangent_impulse, maximum_twist_impulse) = compute_maximum_friction_impulses(
            &material.friction_coefficient,
            &prestep.contacts,
            &accumulated_impulses.penetration,
            &offset_to_manifold_center_a,
        );
        TangentFriction::solve(
            &x,
            &z,
            &offset_to_manifold_center_a,
            &offset_to_manifold_center_b,
            inertia_a,
            inertia_b,
            &maximum_tangent_impulse,
            &mut accumulated_impulses.tangent,
            wsv_a,
            wsv_b,
        );
        TwistFriction::solve(
            &prestep.normal,
            inertia_a,
            inertia_b,
            &maximum_twist_impulse,
            &mut accumulated_impulses.twist,
            wsv_a,
            wsv_b,
        );
    }

    #[inline(always)]
    fn incrementally_update_for_substep(
        dt: &Vector<f32>,
        wsv_a: &BodyVelocityWide,
        wsv_b: &BodyVelocityWide,
        prestep: &mut ContactPrestepData<N>,
    ) {
        for contact in prestep.contacts.iter_mut() {
            PenetrationLimit::update_penetration_depth(
                dt,
                &contact.offset_a,
                &prestep.offset_b,
                &prestep.normal,
                wsv_a,
                wsv_b,
                &mut contact.depth,
            );
        }
    }
}

pub type ContactOneBodyTypeProcessor<const N: usize> =
    OneBodyTypeProcessor<ContactOneBodyPrestepData<N>, ContactAccumulatedImpulses<N>, ContactOneBodyFunctions<N>>;

pub type ContactTypeProcessor<const N: usize> =
    TwoBodyTypeProcessor<ContactPrestepData<N>, ContactAccumulatedImpulses<N>, ContactFunctions<N>>;
