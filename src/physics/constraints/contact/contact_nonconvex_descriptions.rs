use glam::Vec3;

use crate::error::ConstraintError;
use crate::physics::constraints::constraint_checker::ConstraintChecker;
use crate::physics::constraints::constraint_description::IConstraintDescription;
use crate::physics::constraints::contact::contact_constraint_description::{
    validate_material, validate_nonconvex_contact, ContactCount, NonconvexConstraintContactData,
};
use crate::physics::constraints::contact::contact_nonconvex_common::NonconvexContactPrestepData;
use crate::physics::constraints::contact::contact_nonconvex_types::{
    ContactNonconvexOneBodyTypeProcessor, ContactNonconvexTypeProcessor, NonconvexOneBodyPrestepData,
    NonconvexPrestepData,
};
use crate::physics::constraints::spring_settings::SpringSettings;
use crate::physics::constraints::type_processor::ITypeProcessor;

/// Nonconvex contact manifold between two bodies. Every contact carries its own normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactNonconvex<const N: usize> {
    pub contacts: [NonconvexConstraintContactData; N],
    /// Offset from the center of body A to the center of body B.
    pub offset_b: Vec3,
    pub friction_coefficient: f32,
    pub spring_settings: SpringSettings,
    pub maximum_recovery_velocity: f32,
}

/// Nonconvex contact manifold between a body and something that does not move.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactNonconvexOneBody<const N: usize> {
    pub contacts: [NonconvexConstraintContactData; N],
    pub friction_coefficient: f32,
    pub spring_settings: SpringSettings,
    pub maximum_recovery_velocity: f32,
}

pub type Contact2Nonconvex = ContactNonconvex<2>;
pub type Contact3Nonconvex = ContactNonconvex<3>;
pub type Contact4Nonconvex = ContactNonconvex<4>;
pub type Contact2NonconvexOneBody = ContactNonconvexOneBody<2>;
pub type Contact3NonconvexOneBody = ContactNonconvexOneBody<3>;
pub type Contact4NonconvexOneBody = ContactNonconvexOneBody<4>;

#[inline(always)]
fn write_contacts(
    target: &mut [NonconvexContactPrestepData],
    source: &[NonconvexConstraintContactData],
    inner_index: usize,
) {
    for (target, source) in target.iter_mut().zip(source) {
        target.offset.write_slot(source.offset_a, inner_index);
        target.depth[inner_index] = source.penetration_depth;
        target.normal.write_slot(source.normal, inner_index);
    }
}

#[inline(always)]
fn read_contact(source: &NonconvexContactPrestepData, inner_index: usize) -> NonconvexConstraintContactData {
    NonconvexConstraintContactData {
        offset_a: source.offset.read_slot(inner_index),
        normal: source.normal.read_slot(inner_index),
        penetration_depth: source.depth[inner_index],
    }
}

impl<const N: usize> IConstraintDescription for ContactNonconvex<N> {
    type PrestepData = NonconvexPrestepData<N>;
    const CONSTRAINT_TYPE_ID: usize = N + 9;

    fn apply_description(&self, prestep_data: &mut NonconvexPrestepData<N>, inner_index: usize) {
        prestep_data.offset_b.write_slot(self.offset_b, inner_index);
        let material = &mut prestep_data.material_properties;
        material.friction_coefficient[inner_index] = self.friction_coefficient;
        material.spring_settings.write_slot(&self.spring_settings, inner_index);
        material.maximum_recovery_velocity[inner_index] = self.maximum_recovery_velocity;
        write_contacts(&mut prestep_data.contacts, &self.contacts, inner_index);
    }

    fn build_description(prestep_data: &NonconvexPrestepData<N>, inner_index: usize) -> Self {
        let material = &prestep_data.material_properties;
        Self {
            contacts: std::array::from_fn(|i| read_contact(&prestep_data.contacts[i], inner_index)),
            offset_b: prestep_data.offset_b.read_slot(inner_index),
            friction_coefficient: material.friction_coefficient[inner_index],
            spring_settings: material.spring_settings.read_slot(inner_index),
            maximum_recovery_velocity: material.maximum_recovery_velocity[inner_index],
        }
    }

    fn validate(&self) -> Result<(), ConstraintError> {
        ConstraintChecker::require_finite_vec3(self.offset_b, "contact.offset_b")?;
        self.contacts.iter().try_for_each(validate_nonconvex_contact)?;
        validate_material(self.friction_coefficient, &self.spring_settings, self.maximum_recovery_velocity)
    }

    fn create_type_processor() -> Box<dyn ITypeProcessor> {
        let () = ContactCount::<N>::NONCONVEX;
        Box::new(ContactNonconvexTypeProcessor::<N>::new(Self::CONSTRAINT_TYPE_ID, 3 * N))
    }
}

impl<const N: usize> IConstraintDescription for ContactNonconvexOneBody<N> {
    type PrestepData = NonconvexOneBodyPrestepData<N>;
    const CONSTRAINT_TYPE_ID: usize = N + 6;

    fn apply_description(&self, prestep_data: &mut NonconvexOneBodyPrestepData<N>, inner_index: usize) {
        let material = &mut prestep_data.material_properties;
        material.friction_coefficient[inner_index] = self.friction_coefficient;
        material.spring_settings.write_slot(&self.spring_settings, inner_index);
        material.maximum_recovery_velocity[inner_index] = self.maximum_recovery_velocity;
        write_contacts(&mut prestep_data.contacts, &self.contacts, inner_index);
    }

    fn build_description(prestep_data: &NonconvexOneBodyPrestepData<N>, inner_index: usize) -> Self {
        let material = &prestep_data.material_properties;
        Self {
            contacts: std::array::from_fn(|i| read_contact(&prestep_data.contacts[i], inner_index)),
            friction_coefficient: material.friction_coefficient[inner_index],
            spring_settings: material.spring_settings.read_slot(inner_index),
            maximum_recovery_velocity: material.maximum_recovery_velocity[inner_index],
        }
    }

    fn validate(&self) -> Result<(), ConstraintError> {
        self.contacts.iter().try_for_each(validate_nonconvex_contact)?;
        validate_material(self.friction_coefficient, &self.spring_settings, self.maximum_recovery_velocity)
    }

    fn create_type_processor() -> Box<dyn ITypeProcessor> {
        let () = ContactCount::<N>::NONCONVEX;
        Box::new(ContactNonconvexOneBodyTypeProcessor::<N>::new(Self::CONSTRAINT_TYPE_ID, 3 * N))
    }
}
