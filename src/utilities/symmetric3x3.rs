use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Lower left triangle (including diagonal) of a symmetric 3x3 matrix.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Symmetric3x3 {
    /// First row, first column of the matrix.
    pub xx: f32,
    /// Second row, first column of the matrix.
    pub yx: f32,
    /// Second row, second column of the matrix.
    pub yy: f32,
    /// Third row, first column of the matrix.
    pub zx: f32,
    /// Third row, second column of the matrix.
    pub zy: f32,
    /// Third row, third column of the matrix.
    pub zz: f32,
}

impl Symmetric3x3 {
    pub const ZERO: Self = Self {
        xx: 0.0,
        yx: 0.0,
        yy: 0.0,
        zx: 0.0,
        zy: 0.0,
        zz: 0.0,
    };

    /// Creates a diagonal matrix.
    #[inline(always)]
    pub fn from_diagonal(diagonal: Vec3) -> Self {
        Self {
            xx: diagonal.x,
            yy: diagonal.y,
            zz: diagonal.z,
            ..Self::ZERO
        }
    }

    #[inline(always)]
    pub fn to_mat3(&self) -> Mat3 {
        Mat3::from_cols(
            Vec3::new(self.xx, self.yx, self.zx),
            Vec3::new(self.yx, self.yy, self.zy),
            Vec3::new(self.zx, self.zy, self.zz),
        )
    }

    /// Takes the lower triangle of a matrix that is assumed to be symmetric.
    #[inline(always)]
    pub fn from_mat3(m: &Mat3) -> Self {
        Self {
            xx: m.x_axis.x,
            yx: m.x_axis.y,
            yy: m.y_axis.y,
            zx: m.x_axis.z,
            zy: m.y_axis.z,
            zz: m.z_axis.z,
        }
    }

    /// Computes `r * m * transpose(r)` for the rotation matrix of `orientation`.
    #[inline(always)]
    pub fn rotation_sandwich(orientation: Quat, m: &Self) -> Self {
        let r = Mat3::from_quat(orientation);
        Self::from_mat3(&(r * m.to_mat3() * r.transpose()))
    }

    #[inline(always)]
    pub fn transform(v: Vec3, m: &Self) -> Vec3 {
        Vec3::new(
            v.x * m.xx + v.y * m.yx + v.z * m.zx,
            v.x * m.yx + v.y * m.yy + v.z * m.zy,
            v.x * m.zx + v.y * m.zy + v.z * m.zz,
        )
    }
}
