use crate::utilities::vector::Vector;

/// Helpers for one-sided constraints.
pub struct InequalityHelpers;

impl InequalityHelpers {
    /// Computes the bias velocity of a one-sided constraint. Separated constraints (negative error)
    /// use the full `error / dt` so that speculative contacts do not pull bodies together; the
    /// spring gain applies once the error is positive.
    #[inline(always)]
    pub fn compute_bias_velocity(
        error: Vector<f32>,
        position_error_to_velocity: &Vector<f32>,
        inverse_dt: f32,
    ) -> Vector<f32> {
        let inverse_dt_wide = Vector::<f32>::splat(inverse_dt);
        (error * inverse_dt_wide).simd_min(error * *position_error_to_velocity)
    }

    /// Adds `impulse` to the accumulated impulse, clamping the sum at zero. On return `impulse`
    /// holds the change that was actually applied.
    #[inline(always)]
    pub fn clamp_positive(accumulated_impulse: &mut Vector<f32>, impulse: &mut Vector<f32>) {
        let previous = *accumulated_impulse;
        *accumulated_impulse = Vector::<f32>::splat(0.0).simd_max(*accumulated_impulse + *impulse);
        *impulse = *accumulated_impulse - previous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_positive_reports_applied_delta() {
        let mut accumulated = Vector::splat(1.0);
        let mut impulse = Vector::splat(-3.0);
        InequalityHelpers::clamp_positive(&mut accumulated, &mut impulse);
        assert_eq!(accumulated[0], 0.0);
        assert_eq!(impulse[0], -1.0);
    }

    #[test]
    fn test_bias_velocity_is_capped_by_error_over_dt() {
        let bias = InequalityHelpers::compute_bias_velocity(Vector::splat(0.5), &Vector::splat(1000.0), 60.0);
        assert_eq!(bias[0], 30.0);
        let soft = InequalityHelpers::compute_bias_velocity(Vector::splat(0.5), &Vector::splat(10.0), 60.0);
        assert_eq!(soft[0], 5.0);
    }
}
