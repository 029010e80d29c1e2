use glam::Vec3;

use crate::utilities::vector::Vector;
use crate::utilities::vector3_wide::Vector3Wide;

/// Basis construction shared by friction and axis-based constraints.
pub struct Helpers;

impl Helpers {
    /// Builds two tangents perpendicular to a unit normal and to each other.
    #[inline(always)]
    pub fn build_orthonormal_basis(normal: &Vector3Wide, t1: &mut Vector3Wide, t2: &mut Vector3Wide) {
        let neg_one = Vector::<f32>::splat(-1.0);
        let one = Vector::<f32>::splat(1.0);
        let sign = normal.z.simd_lt(Vector::splat(0.0)).select(neg_one, one);

        // Discontinuous at z == 0, which only changes which tangents are picked.
        let scale = neg_one / (sign + normal.z);
        t1.x = normal.x * normal.y * scale;
        t1.y = sign + normal.y * normal.y * scale;
        t1.z = -normal.y;

        t2.x = one + sign * normal.x * normal.x * scale;
        t2.y = sign * t1.x;
        t2.z = -sign * normal.x;
    }

    /// Scalar counterpart of `build_orthonormal_basis`.
    #[inline(always)]
    pub fn build_orthonormal_basis_scalar(normal: Vec3) -> (Vec3, Vec3) {
        let sign = if normal.z < 0.0 { -1.0f32 } else { 1.0f32 };
        let scale = -1.0 / (sign + normal.z);
        let t1 = Vec3::new(
            normal.x * normal.y * scale,
            sign + normal.y * normal.y * scale,
            -normal.y,
        );
        let t2 = Vec3::new(
            1.0 + sign * normal.x * normal.x * scale,
            sign * t1.x,
            -sign * normal.x,
        );
        (t1, t2)
    }
}
