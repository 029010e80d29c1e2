use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::error::ConstraintError;
use crate::physics::constraints::constraint_checker::ConstraintChecker;
use crate::utilities::vector::Vector;

/// Defines some of the shared behavior across motor constraints.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorSettings {
    /// Maximum amount of force the motor can apply in one unit of time.
    pub maximum_force: f32,
    /// Mass-scaled damping constant. To simulate a viscous damping coefficient of D
    /// on an object of mass M, set this damping value to D / M.
    pub damping: f32,
}

impl MotorSettings {
    /// Defines settings for a motor constraint.
    ///
    /// * `maximum_force` - Maximum amount of force the motor can apply in one unit of time.
    /// * `softness` - How soft the constraint is. 0 is perfectly rigid, larger values are softer.
    pub fn new(maximum_force: f32, softness: f32) -> Self {
        let mut settings = Self {
            maximum_force,
            damping: 0.0,
        };
        settings.set_softness(softness);
        debug_assert!(
            settings.is_valid(),
            "Motor settings must have nonnegative maximum force and nonnegative damping."
        );
        settings
    }

    /// Gets how soft the constraint is. Softness is inverse damping; 0 is perfectly rigid.
    #[inline(always)]
    pub fn softness(&self) -> f32 {
        1.0 / self.damping
    }

    #[inline(always)]
    pub fn set_softness(&mut self, value: f32) {
        self.damping = if value <= 0.0 { f32::MAX } else { 1.0 / value };
    }

    #[inline(always)]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> Result<(), ConstraintError> {
        ConstraintChecker::require_nonnegative(self.maximum_force, "motor_settings.maximum_force")?;
        ConstraintChecker::require_nonnegative(self.damping, "motor_settings.damping")
    }
}

/// SIMD-wide motor settings.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MotorSettingsWide {
    pub maximum_force: Vector<f32>,
    pub damping: Vector<f32>,
}

impl MotorSettingsWide {
    #[inline(always)]
    pub fn write_slot(&mut self, source: &MotorSettings, slot_index: usize) {
        self.maximum_force[slot_index] = source.maximum_force;
        self.damping[slot_index] = source.damping;
    }

    #[inline(always)]
    pub fn read_slot(&self, slot_index: usize) -> MotorSettings {
        MotorSettings {
            maximum_force: self.maximum_force[slot_index],
            damping: self.damping[slot_index],
        }
    }

    #[inline(always)]
    pub fn compute_softness(
        settings: &MotorSettingsWide,
        dt: f32,
        effective_mass_cfm_scale: &mut Vector<f32>,
        softness_impulse_scale: &mut Vector<f32>,
        maximum_impulse: &mut Vector<f32>,
    ) {
        let dt_wide = Vector::<f32>::splat(dt);
        let dtd = dt_wide * settings.damping;
        *maximum_impulse = settings.maximum_force * dt_wide;
        *softness_impulse_scale = Vector::<f32>::splat(1.0) / (dtd + Vector::<f32>::splat(1.0));
        *effective_mass_cfm_scale = dtd * *softness_impulse_scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softness_terms_sum_to_one() {
        let mut wide = MotorSettingsWide::default();
        wide.write_slot(&MotorSettings::new(10.0, 0.25), 3);
        let (mut cfm, mut softness, mut maximum_impulse) = Default::default();
        MotorSettingsWide::compute_softness(&wide, 0.01, &mut cfm, &mut softness, &mut maximum_impulse);
        // dtd = 0.01 * 4
        assert!((softness[3] - 1.0 / 1.04).abs() < 1e-6);
        assert!((cfm[3] + softness[3] - 1.0).abs() < 1e-6);
        assert!((maximum_impulse[3] - 0.1).abs() < 1e-7);
    }

    #[test]
    fn test_zero_softness_is_rigid() {
        let settings = MotorSettings::new(1.0, 0.0);
        assert_eq!(settings.damping, f32::MAX);
        assert!(settings.is_valid());
        assert!(!MotorSettings { maximum_force: -1.0, damping: 1.0 }.is_valid());
    }
}
