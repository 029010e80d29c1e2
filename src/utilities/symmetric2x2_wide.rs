use bytemuck::{Pod, Zeroable};

use crate::utilities::matrix2x3_wide::Matrix2x3Wide;
use crate::utilities::vector::Vector;
use crate::utilities::vector2_wide::Vector2Wide;
use crate::utilities::vector3_wide::Vector3Wide;

/// Lower triangle of a symmetric 2x2 matrix with SIMD lanes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Symmetric2x2Wide {
    /// First row, first column of the matrix.
    pub xx: Vector<f32>,
    /// Second row, first column of the matrix.
    pub yx: Vector<f32>,
    /// Second row, second column of the matrix.
    pub yy: Vector<f32>,
}

impl Symmetric2x2Wide {
    /// Computes `m * scale * transpose(m)` for a 2x3 matrix `m`.
    #[inline(always)]
    pub fn sandwich_scale(m: &Matrix2x3Wide, scale: &Vector<f32>, result: &mut Self) {
        result.xx = Vector3Wide::dot(&m.x, &m.x) * *scale;
        result.yx = Vector3Wide::dot(&m.y, &m.x) * *scale;
        result.yy = Vector3Wide::dot(&m.y, &m.y) * *scale;
    }

    #[inline(always)]
    pub fn add(a: &Self, b: &Self, result: &mut Self) {
        result.xx = a.xx + b.xx;
        result.yx = a.yx + b.yx;
        result.yy = a.yy + b.yy;
    }

    #[inline(always)]
    pub fn invert_without_overlap(m: &Self, inverse: &mut Self) {
        let denom = Vector::splat(1.0) / (m.yx * m.yx - m.xx * m.yy);
        inverse.xx = -m.yy * denom;
        inverse.yx = m.yx * denom;
        inverse.yy = -m.xx * denom;
    }

    #[inline(always)]
    pub fn transform_without_overlap(v: &Vector2Wide, m: &Self, result: &mut Vector2Wide) {
        result.x = v.x * m.xx + v.y * m.yx;
        result.y = v.x * m.yx + v.y * m.yy;
    }
}
