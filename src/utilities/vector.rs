use std::ops::{
    Add, AddAssign, BitAnd, BitOr, Div, Index, IndexMut, Mul, MulAssign, Neg, Not, Sub, SubAssign,
};

use bytemuck::{Pod, Zeroable};

/// Number of lanes in every bundle. Solver storage, gathers and scatters are all sized by this.
pub const LANES: usize = 8;

/// A bundle of `LANES` scalars processed together.
///
/// Operations are elementwise. The layout is a plain aligned array so that bundles of
/// `f32`/`i32` can be reinterpreted as flat scalar slices by lane copy helpers.
#[repr(C, align(32))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vector<T>(pub [T; LANES]);

// Both instantiations are 32 bytes with 32 byte alignment, so there is no padding.
unsafe impl Zeroable for Vector<f32> {}
unsafe impl Pod for Vector<f32> {}
unsafe impl Zeroable for Vector<i32> {}
unsafe impl Pod for Vector<i32> {}

impl<T: Copy + Default> Default for Vector<T> {
    #[inline(always)]
    fn default() -> Self {
        Self([T::default(); LANES])
    }
}

impl<T: Copy> Vector<T> {
    /// Number of lanes in the bundle.
    pub const LEN: usize = LANES;

    /// Creates a bundle with every lane set to `value`.
    #[inline(always)]
    pub fn splat(value: T) -> Self {
        Self([value; LANES])
    }

    #[inline(always)]
    pub fn from_array(lanes: [T; LANES]) -> Self {
        Self(lanes)
    }

    #[inline(always)]
    pub fn to_array(self) -> [T; LANES] {
        self.0
    }

    #[inline(always)]
    pub fn as_array(&self) -> &[T; LANES] {
        &self.0
    }

    #[inline(always)]
    pub fn as_mut_array(&mut self) -> &mut [T; LANES] {
        &mut self.0
    }

    #[inline(always)]
    fn zip(self, other: Self, f: impl Fn(T, T) -> T) -> Self {
        Self(std::array::from_fn(|i| f(self.0[i], other.0[i])))
    }

    #[inline(always)]
    fn compare(self, other: Self, f: impl Fn(T, T) -> bool) -> Mask {
        Mask(std::array::from_fn(|i| f(self.0[i], other.0[i])))
    }
}

impl<T: Copy + PartialOrd> Vector<T> {
    #[inline(always)]
    pub fn simd_lt(self, other: Self) -> Mask {
        self.compare(other, |a, b| a < b)
    }

    #[inline(always)]
    pub fn simd_le(self, other: Self) -> Mask {
        self.compare(other, |a, b| a <= b)
    }

    #[inline(always)]
    pub fn simd_gt(self, other: Self) -> Mask {
        self.compare(other, |a, b| a > b)
    }

    #[inline(always)]
    pub fn simd_ge(self, other: Self) -> Mask {
        self.compare(other, |a, b| a >= b)
    }

    #[inline(always)]
    pub fn simd_eq(self, other: Self) -> Mask {
        self.compare(other, |a, b| a == b)
    }

    #[inline(always)]
    pub fn simd_ne(self, other: Self) -> Mask {
        self.compare(other, |a, b| a != b)
    }

    /// Lane-wise minimum. If either lane is NaN, the other operand's lane is returned.
    #[inline(always)]
    pub fn simd_min(self, other: Self) -> Self {
        self.zip(other, |a, b| if b < a { b } else { a })
    }

    /// Lane-wise maximum.
    #[inline(always)]
    pub fn simd_max(self, other: Self) -> Self {
        self.zip(other, |a, b| if b > a { b } else { a })
    }

    #[inline(always)]
    pub fn simd_clamp(self, min: Self, max: Self) -> Self {
        self.simd_max(min).simd_min(max)
    }
}

impl Vector<f32> {
    #[inline(always)]
    pub fn abs(self) -> Self {
        Self(self.0.map(f32::abs))
    }

    #[inline(always)]
    pub fn sqrt(self) -> Self {
        Self(self.0.map(f32::sqrt))
    }

    #[inline(always)]
    pub fn recip(self) -> Self {
        Self(self.0.map(f32::recip))
    }

    #[inline(always)]
    pub fn is_finite(self) -> Mask {
        Mask(self.0.map(f32::is_finite))
    }

    /// Sums all lanes.
    #[inline(always)]
    pub fn reduce_sum(self) -> f32 {
        self.0.iter().sum()
    }
}

impl<T: Copy> Index<usize> for Vector<T> {
    type Output = T;
    #[inline(always)]
    fn index(&self, index: usize) -> &T {
        &self.0[index]
    }
}

impl<T: Copy> IndexMut<usize> for Vector<T> {
    #[inline(always)]
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.0[index]
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $op:tt) => {
        impl<T: Copy + $trait<Output = T>> $trait for Vector<T> {
            type Output = Self;
            #[inline(always)]
            fn $method(self, rhs: Self) -> Self {
                self.zip(rhs, |a, b| a $op b)
            }
        }

        impl<T: Copy + $trait<Output = T>> $assign_trait for Vector<T> {
            #[inline(always)]
            fn $assign_method(&mut self, rhs: Self) {
                *self = *self $op rhs;
            }
        }
    };
}

impl_binary_op!(Add, add, AddAssign, add_assign, +);
impl_binary_op!(Sub, sub, SubAssign, sub_assign, -);
impl_binary_op!(Mul, mul, MulAssign, mul_assign, *);

impl<T: Copy + Div<Output = T>> Div for Vector<T> {
    type Output = Self;
    #[inline(always)]
    fn div(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a / b)
    }
}

impl<T: Copy + Neg<Output = T>> Neg for Vector<T> {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        Self(self.0.map(|a| -a))
    }
}

impl BitAnd for Vector<i32> {
    type Output = Self;
    #[inline(always)]
    fn bitand(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a & b)
    }
}

impl BitOr for Vector<i32> {
    type Output = Self;
    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a | b)
    }
}

/// Per-lane boolean produced by bundle comparisons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Mask(pub [bool; LANES]);

impl Mask {
    #[inline(always)]
    pub fn splat(value: bool) -> Self {
        Self([value; LANES])
    }

    /// Picks lanes from `if_true` where the mask is set and from `if_false` elsewhere.
    #[inline(always)]
    pub fn select<T: Copy>(self, if_true: Vector<T>, if_false: Vector<T>) -> Vector<T> {
        Vector(std::array::from_fn(|i| {
            if self.0[i] {
                if_true.0[i]
            } else {
                if_false.0[i]
            }
        }))
    }

    #[inline(always)]
    pub fn test(&self, lane: usize) -> bool {
        self.0[lane]
    }

    #[inline(always)]
    pub fn set(&mut self, lane: usize, value: bool) {
        self.0[lane] = value;
    }

    #[inline(always)]
    pub fn any(self) -> bool {
        self.0.iter().any(|&lane| lane)
    }

    #[inline(always)]
    pub fn all(self) -> bool {
        self.0.iter().all(|&lane| lane)
    }

    /// Converts to the integer form: -1 for set lanes, 0 otherwise.
    #[inline(always)]
    pub fn to_int(self) -> Vector<i32> {
        Vector(self.0.map(|lane| if lane { -1 } else { 0 }))
    }

    /// Interprets any nonzero integer lane as set.
    #[inline(always)]
    pub fn from_int(value: Vector<i32>) -> Self {
        Self(value.0.map(|lane| lane != 0))
    }
}

impl BitAnd for Mask {
    type Output = Self;
    #[inline(always)]
    fn bitand(self, rhs: Self) -> Self {
        Self(std::array::from_fn(|i| self.0[i] & rhs.0[i]))
    }
}

impl BitOr for Mask {
    type Output = Self;
    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self {
        Self(std::array::from_fn(|i| self.0[i] | rhs.0[i]))
    }
}

impl Not for Mask {
    type Output = Self;
    #[inline(always)]
    fn not(self) -> Self {
        Self(self.0.map(|lane| !lane))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_picks_per_lane() {
        let a = Vector::<f32>::splat(1.0);
        let b = Vector::<f32>::splat(2.0);
        let mut mask = Mask::splat(false);
        mask.set(3, true);
        let result = mask.select(a, b);
        assert_eq!(result[3], 1.0);
        assert_eq!(result[0], 2.0);
        assert_eq!(mask.to_int()[3], -1);
        assert_eq!(Mask::from_int(mask.to_int()), mask);
    }

    #[test]
    fn test_min_max_and_arithmetic() {
        let a = Vector::from_array([0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let b = Vector::<f32>::splat(3.5);
        assert_eq!(a.simd_min(b)[7], 3.5);
        assert_eq!(a.simd_max(b)[0], 3.5);
        assert_eq!((a + b)[1], 4.5);
        assert_eq!((a * b)[2], 7.0);
        assert_eq!((-a)[4], -4.0);
        assert_eq!(a.reduce_sum(), 28.0);
        assert!(a.simd_lt(b).test(3));
        assert!(!a.simd_lt(b).test(4));
    }
}
