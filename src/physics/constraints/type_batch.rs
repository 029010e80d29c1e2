use bytemuck::Pod;

use crate::physics::constraint_location::ConstraintLocation;
use crate::physics::handles::{BodyHandle, ConstraintHandle};
use crate::utilities::bundle_indexing::BundleIndexing;
use crate::utilities::gather_scatter::GatherScatter;
use crate::utilities::vector::Vector;

/// Stores the bundle-major data of every constraint of one type within one solver batch.
///
/// The storage is untyped: a bundle of body references is `bodies_per_constraint` handle vectors,
/// a bundle of prestep data is `prestep_field_count` scalar vectors and so on. The owning type
/// processor reinterprets bundles as its concrete `Pod` structs.
/// Lane `i` of bundle `b` in every array belongs to constraint `b * LANES + i`.
#[derive(Clone, Debug)]
pub struct TypeBatch {
    body_references: Vec<Vector<i32>>,
    prestep_data: Vec<Vector<f32>>,
    accumulated_impulses: Vec<Vector<f32>>,
    index_to_handle: Vec<ConstraintHandle>,
    type_id: usize,
    bodies_per_constraint: usize,
    prestep_field_count: usize,
    impulse_field_count: usize,
}

impl TypeBatch {
    /// Creates an empty type batch laid out for the given bundle types.
    pub fn new<TBodyReferences: Pod, TPrestepData: Pod, TAccumulatedImpulse: Pod>(type_id: usize) -> Self {
        Self {
            body_references: Vec::new(),
            prestep_data: Vec::new(),
            accumulated_impulses: Vec::new(),
            index_to_handle: Vec::new(),
            type_id,
            bodies_per_constraint: GatherScatter::bundle_field_count::<TBodyReferences>(),
            prestep_field_count: GatherScatter::bundle_field_count::<TPrestepData>(),
            impulse_field_count: GatherScatter::bundle_field_count::<TAccumulatedImpulse>(),
        }
    }

    #[inline(always)]
    pub fn type_id(&self) -> usize {
        self.type_id
    }

    #[inline(always)]
    pub fn constraint_count(&self) -> usize {
        self.index_to_handle.len()
    }

    #[inline(always)]
    pub fn bundle_count(&self) -> usize {
        BundleIndexing::get_bundle_count(self.constraint_count())
    }

    #[inline(always)]
    pub fn bodies_per_constraint(&self) -> usize {
        self.bodies_per_constraint
    }

    /// Number of scalars making up one constraint's accumulated impulse.
    #[inline(always)]
    pub fn accumulated_impulse_scalar_count(&self) -> usize {
        self.impulse_field_count
    }

    /// Handles of the constraints in storage order.
    #[inline(always)]
    pub fn index_to_handle(&self) -> &[ConstraintHandle] {
        &self.index_to_handle
    }

    #[inline(always)]
    pub fn prestep_data<T: Pod>(&self) -> &[T] {
        bytemuck::cast_slice(&self.prestep_data)
    }

    #[inline(always)]
    pub fn prestep_data_mut<T: Pod>(&mut self) -> &mut [T] {
        bytemuck::cast_slice_mut(&mut self.prestep_data)
    }

    #[inline(always)]
    pub fn accumulated_impulses<T: Pod>(&self) -> &[T] {
        bytemuck::cast_slice(&self.accumulated_impulses)
    }

    #[inline(always)]
    pub fn body_references<T: Pod>(&self) -> &[T] {
        bytemuck::cast_slice(&self.body_references)
    }

    /// Borrows the body references alongside mutable prestep and impulse bundles.
    #[inline(always)]
    pub fn split_mut<TBodyReferences: Pod, TPrestepData: Pod, TAccumulatedImpulse: Pod>(
        &mut self,
    ) -> (&[TBodyReferences], &mut [TPrestepData], &mut [TAccumulatedImpulse]) {
        (
            bytemuck::cast_slice(&self.body_references),
            bytemuck::cast_slice_mut(&mut self.prestep_data),
            bytemuck::cast_slice_mut(&mut self.accumulated_impulses),
        )
    }

    /// Gets the body handles referenced by the constraint at `index`.
    pub fn body_handles(&self, index: usize) -> impl Iterator<Item = BodyHandle> + '_ {
        let (bundle_index, inner_index) = BundleIndexing::get_bundle_indices(index);
        let start = bundle_index * self.bodies_per_constraint;
        self.body_references[start..start + self.bodies_per_constraint]
            .iter()
            .map(move |references| BodyHandle(references[inner_index]))
    }

    /// Appends a constraint referencing `body_handles`, with zeroed prestep data and impulses.
    /// Returns the index of the new constraint.
    pub fn allocate(&mut self, handle: ConstraintHandle, body_handles: &[BodyHandle]) -> usize {
        debug_assert_eq!(body_handles.len(), self.bodies_per_constraint);
        let index = self.constraint_count();
        let (bundle_index, inner_index) = BundleIndexing::get_bundle_indices(index);
        if inner_index == 0 {
            let empty_references = Vector::splat(-1);
            self.body_references
                .extend(std::iter::repeat(empty_references).take(self.bodies_per_constraint));
            self.prestep_data
                .extend(std::iter::repeat(Vector::splat(0.0)).take(self.prestep_field_count));
            self.accumulated_impulses
                .extend(std::iter::repeat(Vector::splat(0.0)).take(self.impulse_field_count));
        }
        let start = bundle_index * self.bodies_per_constraint;
        for (references, body) in self.body_references[start..start + self.bodies_per_constraint]
            .iter_mut()
            .zip(body_handles)
        {
            references[inner_index] = body.0;
        }
        Self::fill_lane(&mut self.prestep_data, self.prestep_field_count, index, 0.0);
        Self::fill_lane(&mut self.accumulated_impulses, self.impulse_field_count, index, 0.0);
        self.index_to_handle.push(handle);
        index
    }

    /// Removes the constraint at `index` by moving the last constraint into its slot.
    /// The moved constraint's location in `handle_to_constraint` is updated in place.
    pub fn remove(&mut self, index: usize, handle_to_constraint: &mut [ConstraintLocation]) {
        let last_index = self.constraint_count() - 1;
        debug_assert!(index <= last_index, "Removal index must point to a live constraint.");
        if index < last_index {
            Self::copy_lane(&mut self.body_references, self.bodies_per_constraint, last_index, index);
            Self::copy_lane(&mut self.prestep_data, self.prestep_field_count, last_index, index);
            Self::copy_lane(&mut self.accumulated_impulses, self.impulse_field_count, last_index, index);
            let moved_handle = self.index_to_handle[last_index];
            self.index_to_handle[index] = moved_handle;
            handle_to_constraint[moved_handle.0 as usize].index_in_type_batch = index as i32;
        }
        self.index_to_handle.pop();
        let remaining_bundles = self.bundle_count();
        if remaining_bundles < BundleIndexing::get_bundle_count(last_index + 1) {
            self.body_references
                .truncate(remaining_bundles * self.bodies_per_constraint);
            self.prestep_data.truncate(remaining_bundles * self.prestep_field_count);
            self.accumulated_impulses
                .truncate(remaining_bundles * self.impulse_field_count);
        } else {
            Self::fill_lane(&mut self.body_references, self.bodies_per_constraint, last_index, -1);
            Self::fill_lane(&mut self.prestep_data, self.prestep_field_count, last_index, 0.0);
            Self::fill_lane(&mut self.accumulated_impulses, self.impulse_field_count, last_index, 0.0);
        }
    }

    /// Copies the prestep data and accumulated impulses of a constraint in a batch of the same type.
    pub fn copy_constraint_data(&mut self, target_index: usize, source: &TypeBatch, source_index: usize) {
        debug_assert_eq!(self.type_id, source.type_id, "Constraint data can only move between batches of one type.");
        let (source_bundle, source_inner) = BundleIndexing::get_bundle_indices(source_index);
        let (target_bundle, target_inner) = BundleIndexing::get_bundle_indices(target_index);
        for field in 0..self.prestep_field_count {
            self.prestep_data[target_bundle * self.prestep_field_count + field][target_inner] =
                source.prestep_data[source_bundle * self.prestep_field_count + field][source_inner];
        }
        for field in 0..self.impulse_field_count {
            self.accumulated_impulses[target_bundle * self.impulse_field_count + field][target_inner] =
                source.accumulated_impulses[source_bundle * self.impulse_field_count + field][source_inner];
        }
    }

    /// Reads the accumulated impulse scalars of one constraint in declaration order.
    pub fn read_accumulated_impulses(&self, index: usize, impulses: &mut [f32]) {
        let (bundle_index, inner_index) = BundleIndexing::get_bundle_indices(index);
        let start = bundle_index * self.impulse_field_count;
        for (value, field) in impulses
            .iter_mut()
            .zip(&self.accumulated_impulses[start..start + self.impulse_field_count])
        {
            *value = field[inner_index];
        }
    }

    /// Overwrites the accumulated impulse scalars of one constraint in declaration order.
    pub fn write_accumulated_impulses(&mut self, index: usize, impulses: &[f32]) {
        let (bundle_index, inner_index) = BundleIndexing::get_bundle_indices(index);
        let start = bundle_index * self.impulse_field_count;
        for (value, field) in impulses
            .iter()
            .zip(&mut self.accumulated_impulses[start..start + self.impulse_field_count])
        {
            field[inner_index] = *value;
        }
    }

    pub fn scale_accumulated_impulses(&mut self, scale: f32) {
        let scale = Vector::splat(scale);
        for field in &mut self.accumulated_impulses {
            *field *= scale;
        }
    }

    #[inline(always)]
    fn copy_lane<T: Copy>(fields: &mut [Vector<T>], field_count: usize, source_index: usize, target_index: usize) {
        let (source_bundle, source_inner) = BundleIndexing::get_bundle_indices(source_index);
        let (target_bundle, target_inner) = BundleIndexing::get_bundle_indices(target_index);
        for field in 0..field_count {
            let value = fields[source_bundle * field_count + field][source_inner];
            fields[target_bundle * field_count + field][target_inner] = value;
        }
    }

    #[inline(always)]
    fn fill_lane<T: Copy>(fields: &mut [Vector<T>], field_count: usize, index: usize, value: T) {
        let (bundle_index, inner_index) = BundleIndexing::get_bundle_indices(index);
        for field in &mut fields[bundle_index * field_count..(bundle_index + 1) * field_count] {
            field[inner_index] = value;
        }
    }
}
