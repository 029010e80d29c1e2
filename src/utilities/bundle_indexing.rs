use crate::utilities::vector::{Mask, Vector, LANES};

pub const VECTOR_MASK: usize = LANES - 1;
pub const VECTOR_SHIFT: usize = LANES.trailing_zeros() as usize;

/// Some helpers for indexing into vector bundles.
pub struct BundleIndexing;

impl BundleIndexing {
    /// Splits a linear index into the bundle index and the lane within that bundle.
    #[inline(always)]
    pub fn get_bundle_indices(linear_index: usize) -> (usize, usize) {
        (linear_index >> VECTOR_SHIFT, linear_index & VECTOR_MASK)
    }

    /// Gets the number of bundles required to hold `element_count` lanes.
    #[inline(always)]
    pub fn get_bundle_count(element_count: usize) -> usize {
        (element_count + VECTOR_MASK) >> VECTOR_SHIFT
    }

    /// Gets the number of live lanes in a bundle of a collection holding `element_count` lanes.
    #[inline(always)]
    pub fn get_count_in_bundle(element_count: usize, bundle_index: usize) -> usize {
        element_count.saturating_sub(bundle_index << VECTOR_SHIFT).min(LANES)
    }

    /// Creates a mask where lanes below `count_in_bundle` are set.
    #[inline(always)]
    pub fn create_mask_for_count_in_bundle(count_in_bundle: usize) -> Mask {
        let count = Vector::<i32>::splat(count_in_bundle as i32);
        let indices = Vector::<i32>::from_array(std::array::from_fn(|i| i as i32));
        count.simd_gt(indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_math() {
        assert_eq!(BundleIndexing::get_bundle_indices(19), (2, 3));
        assert_eq!(BundleIndexing::get_bundle_count(0), 0);
        assert_eq!(BundleIndexing::get_bundle_count(8), 1);
        assert_eq!(BundleIndexing::get_bundle_count(9), 2);
        assert_eq!(BundleIndexing::get_count_in_bundle(9, 1), 1);
        assert_eq!(BundleIndexing::get_count_in_bundle(9, 0), 8);
        let mask = BundleIndexing::create_mask_for_count_in_bundle(3);
        assert!(mask.test(2) && !mask.test(3));
    }
}
