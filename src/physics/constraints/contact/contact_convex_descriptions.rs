use glam::Vec3;

use crate::error::ConstraintError;
use crate::physics::constraints::constraint_checker::ConstraintChecker;
use crate::physics::constraints::constraint_description::IConstraintDescription;
use crate::physics::constraints::contact::contact_constraint_description::{
    validate_convex_contact, validate_material, ConstraintContactData, ContactCount,
};
use crate::physics::constraints::contact::contact_convex_common::MaterialPropertiesWide;
use crate::physics::constraints::contact::contact_convex_types::{
    ContactOneBodyPrestepData, ContactOneBodyTypeProcessor, ContactPrestepData, ContactTypeProcessor,
};
use crate::physics::constraints::spring_settings::SpringSettings;
use crate::physics::constraints::type_processor::ITypeProcessor;

/// Convex contact manifold between two bodies, solved as one constraint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact<const N: usize> {
    pub contacts: [ConstraintContactData; N],
    /// Offset from the center of body A to the center of body B.
    pub offset_b: Vec3,
    /// Surface normal shared by every contact, pointing from B toward A.
    pub normal: Vec3,
    pub friction_coefficient: f32,
    pub spring_settings: SpringSettings,
    pub maximum_recovery_velocity: f32,
}

/// Convex contact manifold between a body and something that does not move.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactOneBody<const N: usize> {
    pub contacts: [ConstraintContactData; N],
    pub normal: Vec3,
    pub friction_coefficient: f32,
    pub spring_settings: SpringSettings,
    pub maximum_recovery_velocity: f32,
}

pub type Contact1 = Contact<1>;
pub type Contact2 = Contact<2>;
pub type Contact3 = Contact<3>;
pub type Contact4 = Contact<4>;
pub type Contact1OneBody = ContactOneBody<1>;
pub type Contact2OneBody = ContactOneBody<2>;
pub type Contact3OneBody = ContactOneBody<3>;
pub type Contact4OneBody = ContactOneBody<4>;

#[inline(always)]
fn write_material(
    target: &mut MaterialPropertiesWide,
    friction_coefficient: f32,
    spring_settings: &SpringSettings,
    maximum_recovery_velocity: f32,
    inner_index: usize,
) {
    target.friction_coefficient[inner_index] = friction_coefficient;
    target.spring_settings.write_slot(spring_settings, inner_index);
    target.maximum_recovery_velocity[inner_index] = maximum_recovery_velocity;
}

impl<const N: usize> IConstraintDescription for Contact<N> {
    type PrestepData = ContactPrestepData<N>;
    const CONSTRAINT_TYPE_ID: usize = 3 + N;

    fn apply_description(&self, prestep_data: &mut ContactPrestepData<N>, inner_index: usize) {
        for (target, source) in prestep_data.contacts.iter_mut().zip(&self.contacts) {
            target.offset_a.write_slot(source.offset_a, inner_index);
            target.depth[inner_index] = source.penetration_depth;
        }
        prestep_data.offset_b.write_slot(self.offset_b, inner_index);
        prestep_data.normal.write_slot(self.normal, inner_index);
        write_material(
            &mut prestep_data.material_properties,
            self.friction_coefficient,
            &self.spring_settings,
            self.maximum_recovery_velocity,
            inner_index,
        );
    }

    fn build_description(prestep_data: &ContactPrestepData<N>, inner_index: usize) -> Self {
        let material = &prestep_data.material_properties;
        Self {
            contacts: std::array::from_fn(|i| ConstraintContactData {
                offset_a: prestep_data.contacts[i].offset_a.read_slot(inner_index),
                penetration_depth: prestep_data.contacts[i].depth[inner_index],
            }),
            offset_b: prestep_data.offset_b.read_slot(inner_index),
            normal: prestep_data.normal.read_slot(inner_index),
            friction_coefficient: material.friction_coefficient[inner_index],
            spring_settings: material.spring_settings.read_slot(inner_index),
            maximum_recovery_velocity: material.maximum_recovery_velocity[inner_index],
        }
    }

    fn validate(&self) -> Result<(), ConstraintError> {
        ConstraintChecker::require_finite_vec3(self.offset_b, "contact.offset_b")?;
        ConstraintChecker::require_unit_length_vec3(self.normal, "contact.normal")?;
        self.contacts.iter().try_for_each(validate_convex_contact)?;
        validate_material(self.friction_coefficient, &self.spring_settings, self.maximum_recovery_velocity)
    }

    fn create_type_processor() -> Box<dyn ITypeProcessor> {
        let () = ContactCount::<N>::CONVEX;
        Box::new(ContactTypeProcessor::<N>::new(Self::CONSTRAINT_TYPE_ID, N + 3))
    }
}

impl<const N: usize> IConstraintDescription for ContactOneBody<N> {
    type PrestepData = ContactOneBodyPrestepData<N>;
    const CONSTRAINT_TYPE_ID: usize = N - 1;

    fn apply_description(&self, prestep_data: &mut ContactOneBodyPrestepData<N>, inner_index: usize) {
        for (target, source) in prestep_data.contacts.iter_mut().zip(&self.contacts) {
            target.offset_a.write_slot(source.offset_a, inner_index);
            target.depth[inner_index] = source.penetration_depth;
        }
        prestep_data.normal.write_slot(self.normal, inner_index);
        write_material(
            &mut prestep_data.material_properties,
            self.friction_coefficient,
            &self.spring_settings,
            self.maximum_recovery_velocity,
            inner_index,
        );
    }

    fn build_description(prestep_data: &ContactOneBodyPrestepData<N>, inner_index: usize) -> Self {
        let material = &prestep_data.material_properties;
        Self {
            contacts: std::array::from_fn(|i| ConstraintContactData {
                offset_a: prestep_data.contacts[i].offset_a.read_slot(inner_index),
                penetration_depth: prestep_data.contacts[i].depth[inner_index],
            }),
            normal: prestep_data.normal.read_slot(inner_index),
            friction_coefficient: material.friction_coefficient[inner_index],
            spring_settings: material.spring_settings.read_slot(inner_index),
            maximum_recovery_velocity: material.maximum_recovery_velocity[inner_index],
        }
    }

    fn validate(&self) -> Result<(), ConstraintError> {
        ConstraintChecker::require_unit_length_vec3(self.normal, "contact.normal")?;
        self.contacts.iter().try_for_each(validate_convex_contact)?;
        validate_material(self.friction_coefficient, &self.spring_settings, self.maximum_recovery_velocity)
    }

    fn create_type_processor() -> Box<dyn ITypeProcessor> {
        let () = ContactCount::<N>::CONVEX;
        Box::new(ContactOneBodyTypeProcessor::<N>::new(Self::CONSTRAINT_TYPE_ID, N + 3))
    }
}
