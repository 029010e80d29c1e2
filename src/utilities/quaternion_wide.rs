use bytemuck::{Pod, Zeroable};
use glam::Quat;

use crate::utilities::vector::Vector;
use crate::utilities::vector3_wide::Vector3Wide;

/// Quaternion with SIMD lanes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct QuaternionWide {
    pub x: Vector<f32>,
    pub y: Vector<f32>,
    pub z: Vector<f32>,
    pub w: Vector<f32>,
}

impl QuaternionWide {
    #[inline(always)]
    pub fn identity() -> Self {
        Self {
            x: Vector::splat(0.0),
            y: Vector::splat(0.0),
            z: Vector::splat(0.0),
            w: Vector::splat(1.0),
        }
    }

    #[inline(always)]
    pub fn broadcast(source: Quat) -> Self {
        Self {
            x: Vector::splat(source.x),
            y: Vector::splat(source.y),
            z: Vector::splat(source.z),
            w: Vector::splat(source.w),
        }
    }

    #[inline(always)]
    pub fn write_slot(&mut self, source: Quat, slot_index: usize) {
        self.x[slot_index] = source.x;
        self.y[slot_index] = source.y;
        self.z[slot_index] = source.z;
        self.w[slot_index] = source.w;
    }

    #[inline(always)]
    pub fn read_slot(&self, slot_index: usize) -> Quat {
        Quat::from_xyzw(
            self.x[slot_index],
            self.y[slot_index],
            self.z[slot_index],
            self.w[slot_index],
        )
    }

    /// Transforms the vector using a quaternion, assuming that the output does not alias with the input.
    #[inline(always)]
    pub fn transform_without_overlap(v: &Vector3Wide, rotation: &Self, result: &mut Vector3Wide) {
        let two = Vector::splat(2.0);
        let one = Vector::splat(1.0);
        let x2 = rotation.x * two;
        let y2 = rotation.y * two;
        let z2 = rotation.z * two;
        let xx2 = rotation.x * x2;
        let xy2 = rotation.x * y2;
        let xz2 = rotation.x * z2;
        let yy2 = rotation.y * y2;
        let yz2 = rotation.y * z2;
        let zz2 = rotation.z * z2;
        let wx2 = rotation.w * x2;
        let wy2 = rotation.w * y2;
        let wz2 = rotation.w * z2;
        result.x = v.x * (one - yy2 - zz2) + v.y * (xy2 - wz2) + v.z * (xz2 + wy2);
        result.y = v.x * (xy2 + wz2) + v.y * (one - xx2 - zz2) + v.z * (yz2 - wx2);
        result.z = v.x * (xz2 - wy2) + v.y * (yz2 + wx2) + v.z * (one - xx2 - yy2);
    }

    #[inline(always)]
    pub fn transform(v: &Vector3Wide, rotation: &Self) -> Vector3Wide {
        let mut result = Vector3Wide::default();
        Self::transform_without_overlap(v, rotation, &mut result);
        result
    }
}
