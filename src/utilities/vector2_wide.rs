use bytemuck::{Pod, Zeroable};
use std::ops::{Add, Sub};

use crate::utilities::vector::Vector;

/// Two dimensional vector with SIMD lanes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vector2Wide {
    pub x: Vector<f32>,
    pub y: Vector<f32>,
}

impl Vector2Wide {
    #[inline(always)]
    pub fn dot(a: &Self, b: &Self) -> Vector<f32> {
        a.x * b.x + a.y * b.y
    }

    #[inline(always)]
    pub fn scale(vector: &Self, scale: &Vector<f32>) -> Self {
        Self {
            x: vector.x * *scale,
            y: vector.y * *scale,
        }
    }

    #[inline(always)]
    pub fn length(v: &Self) -> Vector<f32> {
        (v.x * v.x + v.y * v.y).sqrt()
    }

    #[inline(always)]
    pub fn negate(v: &Self) -> Self {
        Self { x: -v.x, y: -v.y }
    }
}

impl Add for Vector2Wide {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for Vector2Wide {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}
