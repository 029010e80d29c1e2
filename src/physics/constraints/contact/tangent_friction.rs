use crate::physics::body_properties::{BodyInertiaWide, BodyVelocityWide};
use crate::utilities::matrix2x3_wide::Matrix2x3Wide;
use crate::utilities::symmetric2x2_wide::Symmetric2x2Wide;
use crate::utilities::symmetric3x3_wide::Symmetric3x3Wide;
use crate::utilities::vector::Vector;
use crate::utilities::vector2_wide::Vector2Wide;
use crate::utilities::vector3_wide::Vector3Wide;

/// Two dimensional friction in the plane perpendicular to the contact normal.
pub struct TangentFriction;

#[derive(Clone, Copy, Debug, Default)]
pub struct TangentFrictionJacobians {
    pub linear_a: Matrix2x3Wide,
    pub angular_a: Matrix2x3Wide,
    pub angular_b: Matrix2x3Wide,
}

impl TangentFriction {
    #[inline(always)]
    pub fn compute_jacobians(
        tangent_x: &Vector3Wide,
        tangent_y: &Vector3Wide,
        offset_a: &Vector3Wide,
        offset_b: &Vector3Wide,
    ) -> TangentFrictionJacobians {
        TangentFrictionJacobians {
            linear_a: Matrix2x3Wide {
                x: *tangent_x,
                y: *tangent_y,
            },
            angular_a: Matrix2x3Wide {
                x: Vector3Wide::cross(offset_a, tangent_x),
                y: Vector3Wide::cross(offset_a, tangent_y),
            },
            angular_b: Matrix2x3Wide {
                x: Vector3Wide::cross(tangent_x, offset_b),
                y: Vector3Wide::cross(tangent_y, offset_b),
            },
        }
    }

    #[inline(always)]
    pub fn apply_impulse(
        jacobians: &TangentFrictionJacobians,
        inertia_a: &BodyInertiaWide,
        inertia_b: &BodyInertiaWide,
        corrective_impulse: &Vector2Wide,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let mut linear_impulse_a = Vector3Wide::default();
        Matrix2x3Wide::transform(corrective_impulse, &jacobians.linear_a, &mut linear_impulse_a);
        let mut angular_impulse_a = Vector3Wide::default();
        Matrix2x3Wide::transform(corrective_impulse, &jacobians.angular_a, &mut angular_impulse_a);
        let mut angular_impulse_b = Vector3Wide::default();
        Matrix2x3Wide::transform(corrective_impulse, &jacobians.angular_b, &mut angular_impulse_b);

        wsv_a.linear += Vector3Wide::scale(&linear_impulse_a, &inertia_a.inverse_mass);
        wsv_a.angular += Symmetric3x3Wide::transform(&angular_impulse_a, &inertia_a.inverse_inertia_tensor);
        // B's linear jacobian is the negation of A's.
        wsv_b.linear -= Vector3Wide::scale(&linear_impulse_a, &inertia_b.inverse_mass);
        wsv_b.angular += Symmetric3x3Wide::transform(&angular_impulse_b, &inertia_b.inverse_inertia_tensor);
    }

    /// Accumulates the impulse and scales it back into the friction disc of radius `maximum_impulse`.
    /// Returns the change actually applied.
    #[inline(always)]
    pub fn clamp_to_disc(
        csi: &Vector2Wide,
        maximum_impulse: &Vector<f32>,
        accumulated_impulse: &mut Vector2Wide,
    ) -> Vector2Wide {
        let previous_accumulated = *accumulated_impulse;
        let unclamped = *accumulated_impulse + *csi;
        let accumulated_magnitude = Vector2Wide::length(&unclamped);
        let scale = Vector::<f32>::splat(1.0).simd_min(*maximum_impulse / accumulated_magnitude.simd_max(Vector::splat(1e-16)));
        *accumulated_impulse = Vector2Wide::scale(&unclamped, &scale);
        *accumulated_impulse - previous_accumulated
    }

    #[inline(always)]
    pub fn compute_corrective_impulse(
        wsv_a: &BodyVelocityWide,
        wsv_b: &BodyVelocityWide,
        effective_mass: &Symmetric2x2Wide,
        jacobians: &TangentFrictionJacobians,
        maximum_impulse: &Vector<f32>,
        accumulated_impulse: &mut Vector2Wide,
    ) -> Vector2Wide {
        let mut csva_linear = Vector2Wide::default();
        Matrix2x3Wide::transform_by_transpose_without_overlap(&wsv_a.linear, &jacobians.linear_a, &mut csva_linear);
        let mut csva_angular = Vector2Wide::default();
        Matrix2x3Wide::transform_by_transpose_without_overlap(&wsv_a.angular, &jacobians.angular_a, &mut csva_angular);
        let mut csvb_linear = Vector2Wide::default();
        Matrix2x3Wide::transform_by_transpose_without_overlap(&wsv_b.linear, &jacobians.linear_a, &mut csvb_linear);
        let mut csvb_angular = Vector2Wide::default();
        Matrix2x3Wide::transform_by_transpose_without_overlap(&wsv_b.angular, &jacobians.angular_b, &mut csvb_angular);
        // Negated constraint space velocity; friction has no bias.
        let negated_csv = (csvb_linear - csva_linear) - (csva_angular + csvb_angular);
        let mut csi = Vector2Wide::default();
        Symmetric2x2Wide::transform_without_overlap(&negated_csv, effective_mass, &mut csi);
        Self::clamp_to_disc(&csi, maximum_impulse, accumulated_impulse)
    }

    #[inline(always)]
    #[allow(clippy::too_many_arguments)]
    pub fn warm_start(
        tangent_x: &Vector3Wide,
        tangent_y: &Vector3Wide,
        offset_to_manifold_center_a: &Vector3Wide,
        offset_to_manifold_center_b: &Vector3Wide,
        inertia_a: &BodyInertiaWide,
        inertia_b: &BodyInertiaWide,
        accumulated_impulse: &Vector2Wide,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let jacobians =
            Self::compute_jacobians(tangent_x, tangent_y, offset_to_manifold_center_a, offset_to_manifold_center_b);
        Self::apply_impulse(&jacobians, inertia_a, inertia_b, accumulated_impulse, wsv_a, wsv_b);
    }

    #[inline(always)]
    #[allow(clippy::too_many_arguments)]
    pub fn solve(
        tangent_x: &Vector3Wide,
        tangent_y: &Vector3Wide,
        offset_to_manifold_center_a: &Vector3Wide,
        offset_to_manifold_center_b: &Vector3Wide,
        inertia_a: &BodyInertiaWide,
        inertia_b: &BodyInertiaWide,
        maximum_impulse: &Vector<f32>,
        accumulated_impulse: &mut Vector2Wide,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    ) {
        let jacobians =
            Self::compute_jacobians(tangent_x, tangent_y, offset_to_manifold_center_a, offset_to_manifold_center_b);
        let mut linear_a = Symmetric2x2Wide::default();
        Symmetric2x2Wide::sandwich_scale(&jacobians.linear_a, &inertia_a.inverse_mass, &mut linear_a);
        let mut linear_b = Symmetric2x2Wide::default();
        Symmetric2x2Wide::sandwich_scale(&jacobians.linear_a, &inertia_b.inverse_mass, &mut linear_b);
        let mut angular_a = Symmetric2x2Wide::default();
        Symmetric3x3Wide::matrix_sandwich(&jacobians.angular_a, &inertia_a.inverse_inertia_tensor, &mut angular_a);
        let mut angular_b = Symmetric2x2Wide::default();
        Symmetric3x3Wide::matrix_sandwich(&jacobians.angular_b, &inertia_b.inverse_inertia_tensor, &mut angular_b);
        let mut linear = Symmetric2x2Wide::default();
        Symmetric2x2Wide::add(&linear_a, &linear_b, &mut linear);
        let mut angular = Symmetric2x2Wide::default();
        Symmetric2x2Wide::add(&angular_a, &angular_b, &mut angular);
        let mut inverse_effective_mass = Symmetric2x2Wide::default();
        Symmetric2x2Wide::add(&linear, &angular, &mut inverse_effective_mass);
        let mut effective_mass = Symmetric2x2Wide::default();
        Symmetric2x2Wide::invert_without_overlap(&inverse_effective_mass, &mut effective_mass);

        let corrective_impulse =
            Self::compute_corrective_impulse(wsv_a, wsv_b, &effective_mass, &jacobians, maximum_impulse, accumulated_impulse);
        Self::apply_impulse(&jacobians, inertia_a, inertia_b, &corrective_impulse, wsv_a, wsv_b);
    }
}

/// Tangent friction for contacts whose other side cannot move.
pub struct TangentFrictionOneBody;

impl TangentFrictionOneBody {
    #[inline(always)]
    fn compute_jacobians(tangent_x: &Vector3Wide, tangent_y: &Vector3Wide, offset_a: &Vector3Wide) -> (Matrix2x3Wide, Matrix2x3Wide) {
        (
            Matrix2x3Wide {
                x: *tangent_x,
                y: *tangent_y,
            },
            Matrix2x3Wide {
                x: Vector3Wide::cross(offset_a, tangent_x),
                y: Vector3Wide::cross(offset_a, tangent_y),
            },
        )
    }

    #[inline(always)]
    fn apply_impulse(
        linear_a: &Matrix2x3Wide,
        angular_a: &Matrix2x3Wide,
        inertia_a: &BodyInertiaWide,
        corrective_impulse: &Vector2Wide,
        wsv_a: &mut BodyVelocityWide,
    ) {
        let mut linear_impulse = Vector3Wide::default();
        Matrix2x3Wide::transform(corrective_impulse, linear_a, &mut linear_impulse);
        let mut angular_impulse = Vector3Wide::default();
        Matrix2x3Wide::transform(corrective_impulse, angular_a, &mut angular_impulse);
        wsv_a.linear += Vector3Wide::scale(&linear_impulse, &inertia_a.inverse_mass);
        wsv_a.angular += Symmetric3x3Wide::transform(&angular_impulse, &inertia_a.inverse_inertia_tensor);
    }

    #[inline(always)]
    pub fn warm_start(
        tangent_x: &Vector3Wide,
        tangent_y: &Vector3Wide,
        offset_to_manifold_center_a: &Vector3Wide,
        inertia_a: &BodyInertiaWide,
        accumulated_impulse: &Vector2Wide,
        wsv_a: &mut BodyVelocityWide,
    ) {
        let (linear_a, angular_a) = Self::compute_jacobians(tangent_x, tangent_y, offset_to_manifold_center_a);
        Self::apply_impulse(&linear_a, &angular_a, inertia_a, accumulated_impulse, wsv_a);
    }

    #[inline(always)]
    pub fn solve(
        tangent_x: &Vector3Wide,
        tangent_y: &Vector3Wide,
        offset_to_manifold_center_a: &Vector3Wide,
        inertia_a: &BodyInertiaWide,
        maximum_impulse: &Vector<f32>,
        accumulated_impulse: &mut Vector2Wide,
        wsv_a: &mut BodyVelocityWide,
    ) {
        let (linear_a, angular_a) = Self::compute_jacobians(tangent_x, tangent_y, offset_to_manifold_center_a);
        let mut linear = Symmetric2x2Wide::default();
        Symmetric2x2Wide::sandwich_scale(&linear_a, &inertia_a.inverse_mass, &mut linear);
        let mut angular = Symmetric2x2Wide::default();
        Symmetric3x3Wide::matrix_sandwich(&angular_a, &inertia_a.inverse_inertia_tensor, &mut angular);
        let mut inverse_effective_mass = Symmetric2x2Wide::default();
        Symmetric2x2Wide::add(&linear, &angular, &mut inverse_effective_mass);
        let mut effective_mass = Symmetric2x2Wide::default();
        Symmetric2x2Wide::invert_without_overlap(&inverse_effective_mass, &mut effective_mass);

        let mut csv_linear = Vector2Wide::default();
        Matrix2x3Wide::transform_by_transpose_without_overlap(&wsv_a.linear, &linear_a, &mut csv_linear);
        let mut csv_angular = Vector2Wide::default();
        Matrix2x3Wide::transform_by_transpose_without_overlap(&wsv_a.angular, &angular_a, &mut csv_angular);
        let negated_csv = Vector2Wide::negate(&(csv_linear + csv_angular));
        let mut csi = Vector2Wide::default();
        Symmetric2x2Wide::transform_without_overlap(&negated_csv, &effective_mass, &mut csi);
        let corrective_impulse = TangentFriction::clamp_to_disc(&csi, maximum_impulse, accumulated_impulse);
        Self::apply_impulse(&linear_a, &angular_a, inertia_a, &corrective_impulse, wsv_a);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_zero_maximum_impulse_applies_nothing() {
        let inertia = BodyInertiaWide {
            inverse_mass: Vector::splat(1.0),
            ..Default::default()
        };
        let mut wsv = BodyVelocityWide::default();
        wsv.linear = Vector3Wide::broadcast(Vec3::new(4.0, 0.0, 0.0));
        let mut accumulated = Vector2Wide::default();
        TangentFrictionOneBody::solve(
            &Vector3Wide::broadcast(Vec3::X),
            &Vector3Wide::broadcast(Vec3::Z),
            &Vector3Wide::default(),
            &inertia,
            &Vector::splat(0.0),
            &mut accumulated,
            &mut wsv,
        );
        assert_eq!(accumulated.x[0], 0.0);
        assert_eq!(accumulated.y[0], 0.0);
        assert_eq!(wsv.linear.read_slot(0), Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn test_impulse_is_clamped_to_friction_disc() {
        let mut accumulated = Vector2Wide::default();
        let csi = Vector2Wide {
            x: Vector::splat(3.0),
            y: Vector::splat(4.0),
        };
        let applied = TangentFriction::clamp_to_disc(&csi, &Vector::splat(1.0), &mut accumulated);
        assert!((Vector2Wide::length(&accumulated)[0] - 1.0).abs() < 1e-6);
        assert!((applied.x[0] - 0.6).abs() < 1e-6);
        assert!((applied.y[0] - 0.8).abs() < 1e-6);
    }
}
