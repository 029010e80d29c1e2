use glam::{Quat, Vec3};

use crate::error::ConstraintError;

/// Provides helper functions for validating constraint parameter values.
pub struct ConstraintChecker;

impl ConstraintChecker {
    /// Checks if a value is a finite number, neither infinite nor NaN.
    #[inline(always)]
    pub fn is_finite_number(value: f32) -> bool {
        value.is_finite()
    }

    /// Checks if a value is a finite value greater than zero and not NaN.
    #[inline(always)]
    pub fn is_positive_number(value: f32) -> bool {
        Self::is_finite_number(value) && value > 0.0
    }

    /// Checks if a value is a finite value greater than or equal to zero and not NaN.
    #[inline(always)]
    pub fn is_nonnegative_number(value: f32) -> bool {
        Self::is_finite_number(value) && value >= 0.0
    }

    pub fn require_finite(value: f32, field: &'static str) -> Result<(), ConstraintError> {
        if Self::is_finite_number(value) {
            Ok(())
        } else {
            Err(ConstraintError::NonFinite { field, value })
        }
    }

    pub fn require_finite_vec3(value: Vec3, field: &'static str) -> Result<(), ConstraintError> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(ConstraintError::NonFinite {
                field,
                value: value.length(),
            })
        }
    }

    pub fn require_positive(value: f32, field: &'static str) -> Result<(), ConstraintError> {
        Self::require_finite(value, field)?;
        if value > 0.0 {
            Ok(())
        } else {
            Err(ConstraintError::NonPositive { field, value })
        }
    }

    /// Accepts `f32::MAX` style "unlimited" values but rejects NaN and negatives.
    pub fn require_nonnegative(value: f32, field: &'static str) -> Result<(), ConstraintError> {
        if value.is_nan() {
            return Err(ConstraintError::NonFinite { field, value });
        }
        if value >= 0.0 {
            Ok(())
        } else {
            Err(ConstraintError::Negative { field, value })
        }
    }

    pub fn require_unit_length_vec3(value: Vec3, field: &'static str) -> Result<(), ConstraintError> {
        let length_squared = value.length_squared();
        if (1.0 - 1e-5..=1.0 + 1e-5).contains(&length_squared) {
            Ok(())
        } else {
            Err(ConstraintError::InvalidRange {
                field,
                reason: format!("must be unit length, squared length is {length_squared}"),
            })
        }
    }

    pub fn require_unit_length_quat(value: Quat, field: &'static str) -> Result<(), ConstraintError> {
        let length_squared = value.length_squared();
        if (1.0 - 1e-5..=1.0 + 1e-5).contains(&length_squared) {
            Ok(())
        } else {
            Err(ConstraintError::InvalidRange {
                field,
                reason: format!("must be unit length, squared length is {length_squared}"),
            })
        }
    }

    /// Asserts in debug builds that a validation result is `Ok`. Compiles to nothing in release.
    #[cfg(debug_assertions)]
    #[track_caller]
    pub fn assert_valid(result: Result<(), ConstraintError>, type_name: &str) {
        if let Err(error) = result {
            panic!("{type_name}: {error}");
        }
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    pub fn assert_valid(_result: Result<(), ConstraintError>, _type_name: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_functions() {
        assert!(ConstraintChecker::require_positive(1.0, "x").is_ok());
        assert_eq!(
            ConstraintChecker::require_positive(0.0, "x"),
            Err(ConstraintError::NonPositive { field: "x", value: 0.0 })
        );
        assert!(ConstraintChecker::require_nonnegative(f32::MAX, "x").is_ok());
        assert!(ConstraintChecker::require_nonnegative(-1.0, "x").is_err());
        assert!(ConstraintChecker::require_finite(f32::NAN, "x").is_err());
        assert!(ConstraintChecker::require_unit_length_vec3(Vec3::Y, "axis").is_ok());
        assert!(ConstraintChecker::require_unit_length_vec3(Vec3::ONE, "axis").is_err());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "DistanceLimit: maximum_force must be nonnegative")]
    fn test_assert_valid_panics_in_debug() {
        ConstraintChecker::assert_valid(
            ConstraintChecker::require_nonnegative(-2.0, "maximum_force"),
            "DistanceLimit",
        );
    }
}
