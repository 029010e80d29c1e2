use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::error::ConstraintError;
use crate::physics::constraints::constraint_checker::ConstraintChecker;
use crate::utilities::vector::Vector;

/// SIMD-wide spring settings, aligned with execution order.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SpringSettingsWide {
    pub angular_frequency: Vector<f32>,
    pub twice_damping_ratio: Vector<f32>,
}

impl SpringSettingsWide {
    #[inline(always)]
    pub fn write_slot(&mut self, source: &SpringSettings, slot_index: usize) {
        self.angular_frequency[slot_index] = source.angular_frequency;
        self.twice_damping_ratio[slot_index] = source.twice_damping_ratio;
    }

    #[inline(always)]
    pub fn read_slot(&self, slot_index: usize) -> SpringSettings {
        SpringSettings {
            angular_frequency: self.angular_frequency[slot_index],
            twice_damping_ratio: self.twice_damping_ratio[slot_index],
        }
    }

    /// Computes springiness values for a set of constraints.
    ///
    /// * `position_error_to_velocity` - gain converting position error into a target velocity.
    /// * `effective_mass_cfm_scale` - scale applied to the effective mass, in (0, 1].
    /// * `softness_impulse_scale` - fraction of the accumulated impulse subtracted every iteration.
    #[inline(always)]
    pub fn compute_springiness(
        settings: &SpringSettingsWide,
        dt: f32,
        position_error_to_velocity: &mut Vector<f32>,
        effective_mass_cfm_scale: &mut Vector<f32>,
        softness_impulse_scale: &mut Vector<f32>,
    ) {
        let one = Vector::<f32>::splat(1.0);
        let angular_frequency_dt = settings.angular_frequency * Vector::splat(dt);
        *position_error_to_velocity =
            settings.angular_frequency / (angular_frequency_dt + settings.twice_damping_ratio);
        let extra = one / (angular_frequency_dt * (angular_frequency_dt + settings.twice_damping_ratio));
        *effective_mass_cfm_scale = one / (one + extra);
        *softness_impulse_scale = extra * *effective_mass_cfm_scale;
    }
}

/// Scalar spring settings describing the frequency and damping of a springy constraint.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpringSettings {
    /// Target number of undamped oscillations per unit of time, scaled by 2 * PI.
    pub angular_frequency: f32,
    /// Twice the ratio of the spring's actual damping to its critical damping.
    pub twice_damping_ratio: f32,
}

impl Default for SpringSettings {
    /// 30 Hz, critically damped.
    fn default() -> Self {
        Self::new(30.0, 1.0)
    }
}

impl SpringSettings {
    /// Constructs a new spring settings instance.
    ///
    /// * `frequency` - Target number of undamped oscillations per unit of time.
    /// * `damping_ratio` - Ratio of the spring's actual damping to its critical damping.
    ///   0 is undamped, 1 is critically damped, and higher values are overdamped.
    pub fn new(frequency: f32, damping_ratio: f32) -> Self {
        let settings = Self {
            angular_frequency: frequency * (2.0 * std::f32::consts::PI),
            twice_damping_ratio: damping_ratio * 2.0,
        };
        debug_assert!(
            settings.is_valid(),
            "Spring settings must have positive frequency and nonnegative damping ratio."
        );
        settings
    }

    /// Gets the target number of undamped oscillations per unit of time.
    #[inline(always)]
    pub fn frequency(&self) -> f32 {
        self.angular_frequency / (2.0 * std::f32::consts::PI)
    }

    #[inline(always)]
    pub fn set_frequency(&mut self, value: f32) {
        self.angular_frequency = value * (2.0 * std::f32::consts::PI);
    }

    /// Gets the ratio of the spring's actual damping to its critical damping.
    #[inline(always)]
    pub fn damping_ratio(&self) -> f32 {
        self.twice_damping_ratio / 2.0
    }

    #[inline(always)]
    pub fn set_damping_ratio(&mut self, value: f32) {
        self.twice_damping_ratio = value * 2.0;
    }

    /// Checks if a spring settings instance contains valid values.
    #[inline(always)]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> Result<(), ConstraintError> {
        ConstraintChecker::require_positive(self.angular_frequency, "spring_settings.angular_frequency")?;
        ConstraintChecker::require_finite(self.twice_damping_ratio, "spring_settings.twice_damping_ratio")?;
        ConstraintChecker::require_nonnegative(self.twice_damping_ratio, "spring_settings.twice_damping_ratio")
    }
}
