use bytemuck::Pod;

use crate::utilities::vector::LANES;

/// Lane-granularity access into bundle structs.
///
/// Every bundle struct in the solver is a `#[repr(C)]` sequence of 4 byte scalar bundles, so
/// viewed as a flat scalar slice, lane `i` of field `f` lives at `f * LANES + i`.
pub struct GatherScatter;

impl GatherScatter {
    /// Number of scalar bundles making up `T`.
    #[inline(always)]
    pub fn bundle_field_count<T: Pod>() -> usize {
        std::mem::size_of::<T>() / (LANES * 4)
    }

    #[inline(always)]
    fn scalars<T: Pod>(bundle: &T) -> &[u32] {
        bytemuck::cast_slice(std::slice::from_ref(bundle))
    }

    #[inline(always)]
    fn scalars_mut<T: Pod>(bundle: &mut T) -> &mut [u32] {
        bytemuck::cast_slice_mut(std::slice::from_mut(bundle))
    }

    /// Copies one lane of a bundle into a lane of another bundle of the same type.
    #[inline(always)]
    pub fn copy_lane<T: Pod>(
        source_bundle: &T,
        source_inner_index: usize,
        target_bundle: &mut T,
        target_inner_index: usize,
    ) {
        debug_assert!(source_inner_index < LANES && target_inner_index < LANES);
        let source = Self::scalars(source_bundle);
        let target = Self::scalars_mut(target_bundle);
        for (source_field, target_field) in source.chunks_exact(LANES).zip(target.chunks_exact_mut(LANES)) {
            target_field[target_inner_index] = source_field[source_inner_index];
        }
    }

    /// Copies a lane within a single bundle.
    #[inline(always)]
    pub fn copy_lane_within<T: Pod>(bundle: &mut T, source_inner_index: usize, target_inner_index: usize) {
        for field in Self::scalars_mut(bundle).chunks_exact_mut(LANES) {
            field[target_inner_index] = field[source_inner_index];
        }
    }

    /// Zeroes every field of one lane.
    #[inline(always)]
    pub fn clear_lane<T: Pod>(bundle: &mut T, inner_index: usize) {
        for field in Self::scalars_mut(bundle).chunks_exact_mut(LANES) {
            field[inner_index] = 0;
        }
    }

    /// Reads every field of a lane of a float bundle struct in declaration order.
    pub fn read_lane<T: Pod>(bundle: &T, inner_index: usize, values: &mut [f32]) {
        let source: &[f32] = bytemuck::cast_slice(std::slice::from_ref(bundle));
        for (value, field) in values.iter_mut().zip(source.chunks_exact(LANES)) {
            *value = field[inner_index];
        }
    }

    /// Writes every field of a lane of a float bundle struct in declaration order.
    pub fn write_lane<T: Pod>(bundle: &mut T, inner_index: usize, values: &[f32]) {
        let target: &mut [f32] = bytemuck::cast_slice_mut(std::slice::from_mut(bundle));
        for (value, field) in values.iter().zip(target.chunks_exact_mut(LANES)) {
            field[inner_index] = *value;
        }
    }

    /// Scales every field of a float bundle struct.
    pub fn scale<T: Pod>(bundle: &mut T, scale: f32) {
        let target: &mut [f32] = bytemuck::cast_slice_mut(std::slice::from_mut(bundle));
        for value in target {
            *value *= scale;
        }
    }
}
