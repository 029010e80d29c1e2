use glam::Vec3;

use crate::error::ConstraintError;
use crate::physics::constraints::constraint_checker::ConstraintChecker;
use crate::physics::constraints::spring_settings::SpringSettings;

/// Per-contact data of a convex contact constraint description.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConstraintContactData {
    /// Offset from the center of body A to the contact.
    pub offset_a: Vec3,
    pub penetration_depth: f32,
}

/// Per-contact data of a nonconvex contact constraint description. Each contact has its own normal.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NonconvexConstraintContactData {
    pub offset_a: Vec3,
    pub normal: Vec3,
    pub penetration_depth: f32,
}

/// Compile time bounds on the number of contacts a contact constraint type can hold.
pub(crate) struct ContactCount<const N: usize>;

impl<const N: usize> ContactCount<N> {
    pub(crate) const CONVEX: () = assert!(N >= 1 && N <= 4, "convex manifolds hold 1 to 4 contacts");
    pub(crate) const NONCONVEX: () = assert!(N >= 2 && N <= 4, "nonconvex manifolds hold 2 to 4 contacts");
}

/// Checks the material settings shared by every contact constraint description.
pub(crate) fn validate_material(
    friction_coefficient: f32,
    spring_settings: &SpringSettings,
    maximum_recovery_velocity: f32,
) -> Result<(), ConstraintError> {
    ConstraintChecker::require_nonnegative(friction_coefficient, "contact.friction_coefficient")?;
    spring_settings.validate()?;
    ConstraintChecker::require_nonnegative(maximum_recovery_velocity, "contact.maximum_recovery_velocity")
}

pub(crate) fn validate_convex_contact(contact: &ConstraintContactData) -> Result<(), ConstraintError> {
    ConstraintChecker::require_finite_vec3(contact.offset_a, "contact.offset_a")?;
    ConstraintChecker::require_finite(contact.penetration_depth, "contact.penetration_depth")
}

pub(crate) fn validate_nonconvex_contact(contact: &NonconvexConstraintContactData) -> Result<(), ConstraintError> {
    ConstraintChecker::require_finite_vec3(contact.offset_a, "contact.offset_a")?;
    ConstraintChecker::require_unit_length_vec3(contact.normal, "contact.normal")?;
    ConstraintChecker::require_finite(contact.penetration_depth, "contact.penetration_depth")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_validation() {
        let spring = SpringSettings::new(30.0, 1.0);
        assert!(validate_material(1.0, &spring, 2.0).is_ok());
        assert!(validate_material(1.0, &spring, f32::MAX).is_ok());
        assert!(matches!(
            validate_material(-0.1, &spring, 2.0),
            Err(ConstraintError::Negative { field: "contact.friction_coefficient", .. })
        ));
    }

    #[test]
    fn test_nonconvex_contact_requires_unit_normal() {
        let contact = NonconvexConstraintContactData {
            offset_a: Vec3::ZERO,
            normal: Vec3::new(0.0, 2.0, 0.0),
            penetration_depth: 0.1,
        };
        assert!(validate_nonconvex_contact(&contact).is_err());
        assert!(validate_nonconvex_contact(&NonconvexConstraintContactData { normal: Vec3::Y, ..contact }).is_ok());
    }
}
