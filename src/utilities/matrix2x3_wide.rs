use bytemuck::{Pod, Zeroable};

use crate::utilities::vector2_wide::Vector2Wide;
use crate::utilities::vector3_wide::Vector3Wide;

/// 2 row, 3 column matrix with SIMD lanes. Rows are stored as `x` and `y`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Matrix2x3Wide {
    /// First row of the matrix.
    pub x: Vector3Wide,
    /// Second row of the matrix.
    pub y: Vector3Wide,
}

impl Matrix2x3Wide {
    /// Multiplies a row vector by the matrix: `v * m`, producing a 3 component vector.
    #[inline(always)]
    pub fn transform(v: &Vector2Wide, m: &Self, result: &mut Vector3Wide) {
        result.x = v.x * m.x.x + v.y * m.y.x;
        result.y = v.x * m.x.y + v.y * m.y.y;
        result.z = v.x * m.x.z + v.y * m.y.z;
    }

    /// Multiplies a 3 component vector by the transpose of the matrix, producing one value per row.
    #[inline(always)]
    pub fn transform_by_transpose_without_overlap(v: &Vector3Wide, m: &Self, result: &mut Vector2Wide) {
        result.x = Vector3Wide::dot(v, &m.x);
        result.y = Vector3Wide::dot(v, &m.y);
    }
}
