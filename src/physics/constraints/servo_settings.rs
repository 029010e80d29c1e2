use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::error::ConstraintError;
use crate::physics::constraints::constraint_checker::ConstraintChecker;
use crate::utilities::vector::Vector;
use crate::utilities::vector2_wide::Vector2Wide;
use crate::utilities::vector3_wide::Vector3Wide;

/// Describes how quickly and strongly a servo constraint should move towards a position target.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServoSettings {
    /// Maximum speed that the constraint can try to use to move towards the target.
    pub maximum_speed: f32,
    /// Minimum speed that the constraint will try to use to move towards the target.
    /// If the speed implied by the spring configuration is higher than this, the servo will
    /// attempt to use the higher speed. Will be clamped by the maximum speed.
    pub base_speed: f32,
    /// The maximum force that the constraint can apply to move towards the target.
    pub maximum_force: f32,
}

impl Default for ServoSettings {
    /// A servo with unlimited force, speed, and no base speed.
    /// It behaves like a conventional position-level constraint.
    fn default() -> Self {
        Self::new(f32::MAX, 0.0, f32::MAX)
    }
}

impl ServoSettings {
    /// Creates a new servo settings instance with the specified properties.
    pub fn new(maximum_speed: f32, base_speed: f32, maximum_force: f32) -> Self {
        let settings = Self {
            maximum_speed,
            base_speed,
            maximum_force,
        };
        debug_assert!(
            settings.is_valid(),
            "Servo settings must have nonnegative maximum speed, base speed, and maximum force."
        );
        settings
    }

    #[inline(always)]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> Result<(), ConstraintError> {
        ConstraintChecker::require_nonnegative(self.maximum_speed, "servo_settings.maximum_speed")?;
        ConstraintChecker::require_nonnegative(self.base_speed, "servo_settings.base_speed")?;
        ConstraintChecker::require_nonnegative(self.maximum_force, "servo_settings.maximum_force")
    }
}

/// SIMD-wide servo settings.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ServoSettingsWide {
    pub maximum_speed: Vector<f32>,
    pub base_speed: Vector<f32>,
    pub maximum_force: Vector<f32>,
}

impl ServoSettingsWide {
    #[inline(always)]
    pub fn write_slot(&mut self, source: &ServoSettings, slot_index: usize) {
        self.maximum_speed[slot_index] = source.maximum_speed;
        self.base_speed[slot_index] = source.base_speed;
        self.maximum_force[slot_index] = source.maximum_force;
    }

    #[inline(always)]
    pub fn read_slot(&self, slot_index: usize) -> ServoSettings {
        ServoSettings {
            maximum_speed: self.maximum_speed[slot_index],
            base_speed: self.base_speed[slot_index],
            maximum_force: self.maximum_force[slot_index],
        }
    }

    /// Computes a clamped bias velocity for a 1D error.
    #[inline(always)]
    pub fn compute_clamped_bias_velocity_1d(
        error: &Vector<f32>,
        position_error_to_velocity: &Vector<f32>,
        servo_settings: &ServoSettingsWide,
        dt: f32,
        inverse_dt: f32,
        clamped_bias_velocity: &mut Vector<f32>,
        maximum_impulse: &mut Vector<f32>,
    ) {
        // Can't request speed that would cause an overshoot.
        let base_speed = servo_settings
            .base_speed
            .simd_min(error.abs() * Vector::splat(inverse_dt));
        let bias_velocity = *error * *position_error_to_velocity;
        let negative = bias_velocity.simd_lt(Vector::splat(0.0));
        let negative_branch =
            (-servo_settings.maximum_speed).simd_max((-base_speed).simd_min(bias_velocity));
        let positive_branch = servo_settings
            .maximum_speed
            .simd_min(base_speed.simd_max(bias_velocity));
        *clamped_bias_velocity = negative.select(negative_branch, positive_branch);
        *maximum_impulse = servo_settings.maximum_force * Vector::splat(dt);
    }

    /// Computes a clamped bias velocity for a 2D error. Zero length errors produce zero bias.
    #[inline(always)]
    pub fn compute_clamped_bias_velocity_2d(
        error: &Vector2Wide,
        position_error_to_bias_velocity: &Vector<f32>,
        servo_settings: &ServoSettingsWide,
        dt: f32,
        inverse_dt: f32,
        clamped_bias_velocity: &mut Vector2Wide,
        maximum_impulse: &mut Vector<f32>,
    ) {
        let zero = Vector::<f32>::splat(0.0);
        let one = Vector::<f32>::splat(1.0);
        let error_length = Vector2Wide::length(error);
        // Can't request speed that would cause an overshoot.
        let base_speed = servo_settings.base_speed.simd_min(error_length * Vector::splat(inverse_dt));
        let target_speed = base_speed.simd_max(error_length * *position_error_to_bias_velocity);
        let use_fallback = error_length.simd_lt(Vector::splat(1e-10));
        let speed_scale = use_fallback.select(one, one.simd_min(servo_settings.maximum_speed / target_speed));
        let scale = use_fallback.select(zero, speed_scale * target_speed / error_length);
        *clamped_bias_velocity = Vector2Wide::scale(error, &scale);
        *maximum_impulse = servo_settings.maximum_force * Vector::splat(dt);
    }

    /// Computes a clamped bias velocity for a 3D error given as a unit axis and a length.
    /// The bias speed is the larger of the spring speed and the overshoot-capped base speed, limited to the maximum speed.
    #[inline(always)]
    pub fn compute_clamped_bias_velocity_3d_axis(
        error_axis: &Vector3Wide,
        error_length: &Vector<f32>,
        position_error_to_bias_velocity: &Vector<f32>,
        servo_settings: &ServoSettingsWide,
        dt: f32,
        inverse_dt: f32,
        clamped_bias_velocity: &mut Vector3Wide,
        maximum_impulse: &mut Vector<f32>,
    ) {
        let one = Vector::<f32>::splat(1.0);
        // Can't request speed that would cause an overshoot.
        let base_speed = servo_settings
            .base_speed
            .simd_min(*error_length * Vector::splat(inverse_dt));
        let unclamped_bias_speed = *error_length * *position_error_to_bias_velocity;
        let target_speed = base_speed.simd_max(unclamped_bias_speed);
        let use_fallback = target_speed.simd_lt(Vector::splat(1e-10));
        let scale = use_fallback.select(one, one.simd_min(servo_settings.maximum_speed / target_speed));
        Vector3Wide::scale_to(error_axis, &(scale * target_speed), clamped_bias_velocity);
        *maximum_impulse = servo_settings.maximum_force * Vector::splat(dt);
    }

    /// Computes a clamped bias velocity for a 3D error vector. Zero length errors produce zero bias.
    #[inline(always)]
    pub fn compute_clamped_bias_velocity_3d(
        error: &Vector3Wide,
        position_error_to_bias_velocity: &Vector<f32>,
        servo_settings: &ServoSettingsWide,
        dt: f32,
        inverse_dt: f32,
        clamped_bias_velocity: &mut Vector3Wide,
        maximum_impulse: &mut Vector<f32>,
    ) {
        let error_length = Vector3Wide::length(error);
        let use_fallback = error_length.simd_lt(Vector::splat(1e-10));
        let error_axis = Vector3Wide::conditional_select(
            use_fallback,
            &Vector3Wide::default(),
            &Vector3Wide::scale(error, &error_length.recip()),
        );
        Self::compute_clamped_bias_velocity_3d_axis(
            &error_axis,
            &error_length,
            position_error_to_bias_velocity,
            servo_settings,
            dt,
            inverse_dt,
            clamped_bias_velocity,
            maximum_impulse,
        );
    }

    /// Clamps a 1D impulse within [-maximum_impulse, maximum_impulse].
    #[inline(always)]
    pub fn clamp_impulse_1d(maximum_impulse: &Vector<f32>, accumulated_impulse: &mut Vector<f32>, csi: &mut Vector<f32>) {
        let previous = *accumulated_impulse;
        *accumulated_impulse = (-*maximum_impulse).simd_max(maximum_impulse.simd_min(previous + *csi));
        *csi = *accumulated_impulse - previous;
    }

    /// Clamps the magnitude of a 2D accumulated impulse to `maximum_impulse`.
    #[inline(always)]
    pub fn clamp_impulse_2d(maximum_impulse: &Vector<f32>, accumulated_impulse: &mut Vector2Wide, csi: &mut Vector2Wide) {
        let previous = *accumulated_impulse;
        let unclamped = previous + *csi;
        let impulse_magnitude = Vector2Wide::length(&unclamped);
        let one = Vector::<f32>::splat(1.0);
        let use_fallback = impulse_magnitude.simd_lt(Vector::splat(1e-10));
        let impulse_scale = use_fallback.select(one, one.simd_min(*maximum_impulse / impulse_magnitude));
        *accumulated_impulse = Vector2Wide::scale(&unclamped, &impulse_scale);
        *csi = *accumulated_impulse - previous;
    }

    /// Clamps the magnitude of a 3D accumulated impulse to `maximum_impulse`.
    #[inline(always)]
    pub fn clamp_impulse_3d(maximum_impulse: &Vector<f32>, accumulated_impulse: &mut Vector3Wide, csi: &mut Vector3Wide) {
        let previous = *accumulated_impulse;
        let unclamped = previous + *csi;
        let impulse_magnitude = Vector3Wide::length(&unclamped);
        let one = Vector::<f32>::splat(1.0);
        let use_fallback = impulse_magnitude.simd_lt(Vector::splat(1e-10));
        let impulse_scale = use_fallback.select(one, one.simd_min(*maximum_impulse / impulse_magnitude));
        *accumulated_impulse = unclamped * impulse_scale;
        *csi = *accumulated_impulse - previous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide(settings: &ServoSettings) -> ServoSettingsWide {
        let mut wide = ServoSettingsWide::default();
        for lane in 0..Vector::<f32>::LEN {
            wide.write_slot(settings, lane);
        }
        wide
    }

    #[test]
    fn test_maximum_speed_clamps_bias_velocity() {
        let dt = 1.0 / 60.0;
        let settings = wide(&ServoSettings::new(1.0, 0.0, f32::MAX));
        let (mut bias, mut maximum_impulse) = Default::default();
        ServoSettingsWide::compute_clamped_bias_velocity_1d(
            &Vector::splat(10.0),
            &Vector::splat(1.0 / dt),
            &settings,
            dt,
            1.0 / dt,
            &mut bias,
            &mut maximum_impulse,
        );
        assert!(bias[0] <= 1.0);
        assert_eq!(bias[0], 1.0);
        ServoSettingsWide::compute_clamped_bias_velocity_1d(
            &Vector::splat(-10.0),
            &Vector::splat(1.0 / dt),
            &settings,
            dt,
            1.0 / dt,
            &mut bias,
            &mut maximum_impulse,
        );
        assert_eq!(bias[0], -1.0);
    }

    #[test]
    fn test_base_speed_never_overshoots() {
        let dt = 1.0 / 60.0;
        let settings = wide(&ServoSettings::new(100.0, 50.0, 2.0));
        let (mut bias, mut maximum_impulse) = Default::default();
        // Error of 0.1 can be resolved at 6 units per second; the base speed of 50 would overshoot.
        ServoSettingsWide::compute_clamped_bias_velocity_1d(
            &Vector::splat(0.1),
            &Vector::splat(1.0),
            &settings,
            dt,
            1.0 / dt,
            &mut bias,
            &mut maximum_impulse,
        );
        assert!((bias[0] - 6.0).abs() < 1e-4);
        assert!((maximum_impulse[0] - 2.0 * dt).abs() < 1e-7);
    }

    #[test]
    fn test_zero_length_3d_error_produces_zero_bias() {
        let settings = wide(&ServoSettings::default());
        let mut bias = Vector3Wide::default();
        let mut maximum_impulse = Vector::default();
        ServoSettingsWide::compute_clamped_bias_velocity_3d(
            &Vector3Wide::default(),
            &Vector::splat(30.0),
            &settings,
            1.0 / 60.0,
            60.0,
            &mut bias,
            &mut maximum_impulse,
        );
        assert_eq!(bias, Vector3Wide::default());
    }

    #[test]
    fn test_clamp_impulse_limits_magnitude() {
        let mut accumulated = Vector::splat(0.5);
        let mut csi = Vector::splat(2.0);
        ServoSettingsWide::clamp_impulse_1d(&Vector::splat(1.0), &mut accumulated, &mut csi);
        assert_eq!(accumulated[0], 1.0);
        assert_eq!(csi[0], 0.5);
    }

    #[test]
    fn test_2d_bias_points_along_error_and_respects_maximum_speed() {
        let dt = 1.0 / 60.0;
        let settings = wide(&ServoSettings::new(2.0, 0.0, 10.0));
        let error = Vector2Wide {
            x: Vector::splat(3.0),
            y: Vector::splat(4.0),
        };
        let mut bias = Vector2Wide::default();
        let mut maximum_impulse = Vector::default();
        ServoSettingsWide::compute_clamped_bias_velocity_2d(&error, &Vector::splat(30.0), &settings, dt, 1.0 / dt, &mut bias, &mut maximum_impulse);
        assert!((bias.x[0] - 1.2).abs() < 1e-4);
        assert!((bias.y[0] - 1.6).abs() < 1e-4);

        let mut zero_bias = Vector2Wide::default();
        ServoSettingsWide::compute_clamped_bias_velocity_2d(
            &Vector2Wide::default(),
            &Vector::splat(30.0),
            &settings,
            dt,
            1.0 / dt,
            &mut zero_bias,
            &mut maximum_impulse,
        );
        assert_eq!(zero_bias, Vector2Wide::default());
    }

    #[test]
    fn test_clamp_impulse_2d_limits_magnitude() {
        let mut accumulated = Vector2Wide::default();
        let mut csi = Vector2Wide {
            x: Vector::splat(6.0),
            y: Vector::splat(8.0),
        };
        ServoSettingsWide::clamp_impulse_2d(&Vector::splat(5.0), &mut accumulated, &mut csi);
        assert!((accumulated.x[0] - 3.0).abs() < 1e-5);
        assert!((accumulated.y[0] - 4.0).abs() < 1e-5);
        assert_eq!(csi, accumulated);
    }

    #[test]
    fn test_3d_base_speed_raises_slow_spring_bias() {
        let dt = 1.0 / 60.0;
        let settings = wide(&ServoSettings::new(10.0, 2.0, 5.0));
        let error = Vector3Wide {
            x: Vector::splat(0.0),
            y: Vector::splat(0.0),
            z: Vector::splat(0.5),
        };
        let mut bias = Vector3Wide::default();
        let mut maximum_impulse = Vector::default();
        // The spring alone asks for 0.5 units per second; the base speed lifts that to 2.
        ServoSettingsWide::compute_clamped_bias_velocity_3d(&error, &Vector::splat(1.0), &settings, dt, 1.0 / dt, &mut bias, &mut maximum_impulse);
        assert!(bias.x[0].abs() < 1e-6);
        assert!((bias.z[0] - 2.0).abs() < 1e-4);
        assert!((maximum_impulse[0] - 5.0 * dt).abs() < 1e-7);

        // Near the target the base speed is capped so the step cannot overshoot.
        let small = Vector3Wide {
            z: Vector::splat(0.01),
            ..error
        };
        ServoSettingsWide::compute_clamped_bias_velocity_3d(&small, &Vector::splat(1.0), &settings, dt, 1.0 / dt, &mut bias, &mut maximum_impulse);
        assert!((bias.z[0] - 0.6).abs() < 1e-4);
    }
}
