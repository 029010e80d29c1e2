use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use crate::utilities::vector::{Mask, Vector};

/// Three dimensional vector with SIMD lanes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vector3Wide {
    /// First component of the vector.
    pub x: Vector<f32>,
    /// Second component of the vector.
    pub y: Vector<f32>,
    /// Third component of the vector.
    pub z: Vector<f32>,
}

impl Vector3Wide {
    /// Creates a vector by populating each component with the given bundle.
    #[inline(always)]
    pub fn new(s: Vector<f32>) -> Self {
        Self { x: s, y: s, z: s }
    }

    /// Creates a vector with every lane set to `source`.
    #[inline(always)]
    pub fn broadcast(source: Vec3) -> Self {
        Self {
            x: Vector::splat(source.x),
            y: Vector::splat(source.y),
            z: Vector::splat(source.z),
        }
    }

    /// Performs a componentwise add between two vectors.
    #[inline(always)]
    pub fn add(a: &Self, b: &Self, result: &mut Self) {
        result.x = a.x + b.x;
        result.y = a.y + b.y;
        result.z = a.z + b.z;
    }

    /// Subtracts one vector from another.
    #[inline(always)]
    pub fn subtract(a: &Self, b: &Self, result: &mut Self) {
        result.x = a.x - b.x;
        result.y = a.y - b.y;
        result.z = a.z - b.z;
    }

    /// Computes the inner product between two vectors.
    #[inline(always)]
    pub fn dot(a: &Self, b: &Self) -> Vector<f32> {
        a.x * b.x + a.y * b.y + a.z * b.z
    }

    #[inline(always)]
    pub fn scale(vector: &Self, scale: &Vector<f32>) -> Self {
        Self {
            x: vector.x * *scale,
            y: vector.y * *scale,
            z: vector.z * *scale,
        }
    }

    #[inline(always)]
    pub fn scale_to(vector: &Self, scale: &Vector<f32>, result: &mut Self) {
        result.x = vector.x * *scale;
        result.y = vector.y * *scale;
        result.z = vector.z * *scale;
    }

    #[inline(always)]
    pub fn negate(v: &Self) -> Self {
        Self {
            x: -v.x,
            y: -v.y,
            z: -v.z,
        }
    }

    #[inline(always)]
    pub fn length_squared(v: &Self) -> Vector<f32> {
        v.x * v.x + v.y * v.y + v.z * v.z
    }

    #[inline(always)]
    pub fn length(v: &Self) -> Vector<f32> {
        Self::length_squared(v).sqrt()
    }

    #[inline(always)]
    pub fn distance(a: &Self, b: &Self) -> Vector<f32> {
        let x = b.x - a.x;
        let y = b.y - a.y;
        let z = b.z - a.z;
        (x * x + y * y + z * z).sqrt()
    }

    /// Computes the cross product between two vectors, assuming that the result is not aliased with either input.
    #[inline(always)]
    pub fn cross_without_overlap(a: &Self, b: &Self, result: &mut Self) {
        result.x = a.y * b.z - a.z * b.y;
        result.y = a.z * b.x - a.x * b.z;
        result.z = a.x * b.y - a.y * b.x;
    }

    #[inline(always)]
    pub fn cross(a: &Self, b: &Self) -> Self {
        let mut result = Self::default();
        Self::cross_without_overlap(a, b, &mut result);
        result
    }

    /// Picks lanes of `left` where the mask is set, `right` elsewhere.
    #[inline(always)]
    pub fn conditional_select(condition: Mask, left: &Self, right: &Self) -> Self {
        Self {
            x: condition.select(left.x, right.x),
            y: condition.select(left.y, right.y),
            z: condition.select(left.z, right.z),
        }
    }

    /// Writes a scalar vector into one lane.
    #[inline(always)]
    pub fn write_slot(&mut self, source: Vec3, slot_index: usize) {
        self.x[slot_index] = source.x;
        self.y[slot_index] = source.y;
        self.z[slot_index] = source.z;
    }

    /// Reads one lane as a scalar vector.
    #[inline(always)]
    pub fn read_slot(&self, slot_index: usize) -> Vec3 {
        Vec3::new(self.x[slot_index], self.y[slot_index], self.z[slot_index])
    }
}

impl Add for Vector3Wide {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl Sub for Vector3Wide {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl AddAssign for Vector3Wide {
    #[inline(always)]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Vector3Wide {
    #[inline(always)]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Vector3Wide {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        Self::negate(&self)
    }
}

impl Mul<Vector<f32>> for Vector3Wide {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Vector<f32>) -> Self {
        Self::scale(&self, &rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_and_dot_match_scalar() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(-2.0, 0.5, 4.0);
        let wide_a = Vector3Wide::broadcast(a);
        let wide_b = Vector3Wide::broadcast(b);
        assert_eq!(Vector3Wide::cross(&wide_a, &wide_b).read_slot(6), a.cross(b));
        assert_eq!(Vector3Wide::dot(&wide_a, &wide_b)[2], a.dot(b));
        assert_eq!(Vector3Wide::distance(&wide_a, &wide_a)[0], 0.0);
    }
}
