use bytemuck::{Pod, Zeroable};

use crate::utilities::matrix2x3_wide::Matrix2x3Wide;
use crate::utilities::symmetric2x2_wide::Symmetric2x2Wide;
use crate::utilities::symmetric3x3::Symmetric3x3;
use crate::utilities::vector::Vector;
use crate::utilities::vector3_wide::Vector3Wide;

/// Lower triangle of a symmetric 3x3 matrix with SIMD lanes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Symmetric3x3Wide {
    /// First row, first column of the matrix.
    pub xx: Vector<f32>,
    /// Second row, first column of the matrix.
    pub yx: Vector<f32>,
    /// Second row, second column of the matrix.
    pub yy: Vector<f32>,
    /// Third row, first column of the matrix.
    pub zx: Vector<f32>,
    /// Third row, second column of the matrix.
    pub zy: Vector<f32>,
    /// Third row, third column of the matrix.
    pub zz: Vector<f32>,
}

impl Symmetric3x3Wide {
    #[inline(always)]
    pub fn write_slot(&mut self, source: &Symmetric3x3, slot_index: usize) {
        self.xx[slot_index] = source.xx;
        self.yx[slot_index] = source.yx;
        self.yy[slot_index] = source.yy;
        self.zx[slot_index] = source.zx;
        self.zy[slot_index] = source.zy;
        self.zz[slot_index] = source.zz;
    }

    #[inline(always)]
    pub fn add(a: &Self, b: &Self, result: &mut Self) {
        result.xx = a.xx + b.xx;
        result.yx = a.yx + b.yx;
        result.yy = a.yy + b.yy;
        result.zx = a.zx + b.zx;
        result.zy = a.zy + b.zy;
        result.zz = a.zz + b.zz;
    }

    #[inline(always)]
    pub fn scale(m: &Self, scale: &Vector<f32>) -> Self {
        Self {
            xx: m.xx * *scale,
            yx: m.yx * *scale,
            yy: m.yy * *scale,
            zx: m.zx * *scale,
            zy: m.zy * *scale,
            zz: m.zz * *scale,
        }
    }

    #[inline(always)]
    pub fn add_to_diagonal(m: &mut Self, value: &Vector<f32>) {
        m.xx += *value;
        m.yy += *value;
        m.zz += *value;
    }

    #[inline(always)]
    pub fn transform_without_overlap(v: &Vector3Wide, m: &Self, result: &mut Vector3Wide) {
        result.x = v.x * m.xx + v.y * m.yx + v.z * m.zx;
        result.y = v.x * m.yx + v.y * m.yy + v.z * m.zy;
        result.z = v.x * m.zx + v.y * m.zy + v.z * m.zz;
    }

    #[inline(always)]
    pub fn transform(v: &Vector3Wide, m: &Self) -> Vector3Wide {
        let mut result = Vector3Wide::default();
        Self::transform_without_overlap(v, m, &mut result);
        result
    }

    /// Computes `dot(v, m * v)`.
    #[inline(always)]
    pub fn vector_sandwich(v: &Vector3Wide, m: &Self) -> Vector<f32> {
        let x = v.x * m.xx + v.y * m.yx + v.z * m.zx;
        let y = v.x * m.yx + v.y * m.yy + v.z * m.zy;
        let z = v.x * m.zx + v.y * m.zy + v.z * m.zz;
        x * v.x + y * v.y + z * v.z
    }

    /// Computes `a * m * transpose(a)` for a 2x3 matrix `a`.
    #[inline(always)]
    pub fn matrix_sandwich(a: &Matrix2x3Wide, m: &Self, result: &mut Symmetric2x2Wide) {
        let mut mx = Vector3Wide::default();
        Self::transform_without_overlap(&a.x, m, &mut mx);
        let mut my = Vector3Wide::default();
        Self::transform_without_overlap(&a.y, m, &mut my);
        result.xx = Vector3Wide::dot(&a.x, &mx);
        result.yx = Vector3Wide::dot(&a.y, &mx);
        result.yy = Vector3Wide::dot(&a.y, &my);
    }

    /// Computes `skew(v) * m * transpose(skew(v))`, where `skew(v) * x = v × x`.
    #[inline(always)]
    pub fn skew_sandwich_without_overlap(v: &Vector3Wide, m: &Self, sandwich: &mut Self) {
        // Rows of skew(v) * m.
        let a0 = Vector3Wide {
            x: v.y * m.zx - v.z * m.yx,
            y: v.y * m.zy - v.z * m.yy,
            z: v.y * m.zz - v.z * m.zy,
        };
        let a1 = Vector3Wide {
            x: v.z * m.xx - v.x * m.zx,
            y: v.z * m.yx - v.x * m.zy,
            z: v.z * m.zx - v.x * m.zz,
        };
        let a2 = Vector3Wide {
            x: v.x * m.yx - v.y * m.xx,
            y: v.x * m.yy - v.y * m.yx,
            z: v.x * m.zy - v.y * m.zx,
        };
        // Columns of transpose(skew(v)) are the rows of skew(v).
        let zero = Vector::splat(0.0);
        let s0 = Vector3Wide { x: zero, y: -v.z, z: v.y };
        let s1 = Vector3Wide { x: v.z, y: zero, z: -v.x };
        let s2 = Vector3Wide { x: -v.y, y: v.x, z: zero };
        sandwich.xx = Vector3Wide::dot(&a0, &s0);
        sandwich.yx = Vector3Wide::dot(&a1, &s0);
        sandwich.yy = Vector3Wide::dot(&a1, &s1);
        sandwich.zx = Vector3Wide::dot(&a2, &s0);
        sandwich.zy = Vector3Wide::dot(&a2, &s1);
        sandwich.zz = Vector3Wide::dot(&a2, &s2);
    }

    /// Inverts the matrix through its adjugate. Singular lanes produce non-finite values.
    #[inline(always)]
    pub fn invert(m: &Self, inverse: &mut Self) {
        let m11 = m.yy * m.zz - m.zy * m.zy;
        let m21 = m.zy * m.zx - m.zz * m.yx;
        let m31 = m.yx * m.zy - m.zx * m.yy;
        let determinant_inverse = Vector::splat(1.0) / (m11 * m.xx + m21 * m.yx + m31 * m.zx);
        let m22 = m.zz * m.xx - m.zx * m.zx;
        let m32 = m.zx * m.yx - m.xx * m.zy;
        let m33 = m.xx * m.yy - m.yx * m.yx;
        inverse.xx = m11 * determinant_inverse;
        inverse.yx = m21 * determinant_inverse;
        inverse.zx = m31 * determinant_inverse;
        inverse.yy = m22 * determinant_inverse;
        inverse.zy = m32 * determinant_inverse;
        inverse.zz = m33 * determinant_inverse;
    }
}
