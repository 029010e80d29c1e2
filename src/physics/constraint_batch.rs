use log::debug;

use crate::physics::constraints::type_batch::TypeBatch;
use crate::physics::constraints::type_processor::ITypeProcessor;

/// Contains a set of type batches whose constraints share no dynamic body.
#[derive(Clone, Debug, Default)]
pub struct ConstraintBatch {
    // The handle table stores a type id rather than a type batch index, so removing a type batch
    // only has to patch this map.
    pub(crate) type_index_to_type_batch_index: Vec<i32>,
    pub(crate) type_batches: Vec<TypeBatch>,
}

impl ConstraintBatch {
    pub fn new(type_count: usize) -> Self {
        Self {
            type_index_to_type_batch_index: vec![-1; type_count],
            type_batches: Vec::new(),
        }
    }

    /// Gets the index of the type batch holding constraints of `type_id`, if any exist.
    #[inline(always)]
    pub fn type_batch_index(&self, type_id: usize) -> Option<usize> {
        match self.type_index_to_type_batch_index.get(type_id) {
            Some(&index) if index >= 0 => Some(index as usize),
            _ => None,
        }
    }

    /// Gets the type batch matching the given type id. The type batch must exist.
    #[inline(always)]
    pub fn get_type_batch(&self, type_id: usize) -> &TypeBatch {
        match self.type_batch_index(type_id) {
            Some(index) => &self.type_batches[index],
            None => panic!("No type batch exists for type id {type_id}."),
        }
    }

    #[inline(always)]
    pub fn get_type_batch_mut(&mut self, type_id: usize) -> &mut TypeBatch {
        match self.type_batch_index(type_id) {
            Some(index) => &mut self.type_batches[index],
            None => panic!("No type batch exists for type id {type_id}."),
        }
    }

    #[inline(always)]
    pub fn type_batches(&self) -> &[TypeBatch] {
        &self.type_batches
    }

    pub(crate) fn get_or_create_type_batch(&mut self, type_processor: &dyn ITypeProcessor) -> &mut TypeBatch {
        let type_id = type_processor.type_id();
        if type_id >= self.type_index_to_type_batch_index.len() {
            self.type_index_to_type_batch_index.resize(type_id + 1, -1);
        }
        let index = match self.type_batch_index(type_id) {
            Some(index) => index,
            None => {
                let index = self.type_batches.len();
                self.type_batches.push(type_processor.create_type_batch());
                self.type_index_to_type_batch_index[type_id] = index as i32;
                debug!("created type batch for constraint type {type_id}");
                index
            }
        };
        &mut self.type_batches[index]
    }

    /// Removes a type batch if it has no more constraints.
    pub(crate) fn remove_type_batch_if_empty(&mut self, type_batch_index: usize) {
        if self.type_batches[type_batch_index].constraint_count() > 0 {
            return;
        }
        let removed_type_id = self.type_batches[type_batch_index].type_id();
        self.type_index_to_type_batch_index[removed_type_id] = -1;
        self.type_batches.swap_remove(type_batch_index);
        if type_batch_index < self.type_batches.len() {
            let moved_type_id = self.type_batches[type_batch_index].type_id();
            self.type_index_to_type_batch_index[moved_type_id] = type_batch_index as i32;
        }
        debug!("removed empty type batch for constraint type {removed_type_id}");
    }

    pub fn constraint_count(&self) -> usize {
        self.type_batches.iter().map(TypeBatch::constraint_count).sum()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.type_batches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::constraint_location::ConstraintLocation;
    use crate::physics::constraints::ball_socket::BallSocket;
    use crate::physics::constraints::center_distance_constraint::CenterDistanceConstraint;
    use crate::physics::constraints::constraint_description::IConstraintDescription;
    use crate::physics::handles::{BodyHandle, ConstraintHandle};

    #[test]
    fn test_removing_type_batch_remaps_moved_type() {
        let ball_socket = BallSocket::create_type_processor();
        let center_distance = CenterDistanceConstraint::create_type_processor();
        let mut batch = ConstraintBatch::new(4);
        batch
            .get_or_create_type_batch(ball_socket.as_ref())
            .allocate(ConstraintHandle(0), &[BodyHandle(0), BodyHandle(1)]);
        batch
            .get_or_create_type_batch(center_distance.as_ref())
            .allocate(ConstraintHandle(1), &[BodyHandle(2), BodyHandle(3)]);
        assert_eq!(batch.type_batch_index(BallSocket::CONSTRAINT_TYPE_ID), Some(0));
        assert_eq!(batch.constraint_count(), 2);

        let mut locations = vec![ConstraintLocation::UNUSED; 2];
        batch.get_type_batch_mut(BallSocket::CONSTRAINT_TYPE_ID).remove(0, &mut locations);
        batch.remove_type_batch_if_empty(0);
        assert_eq!(batch.type_batch_index(BallSocket::CONSTRAINT_TYPE_ID), None);
        assert_eq!(batch.type_batch_index(CenterDistanceConstraint::CONSTRAINT_TYPE_ID), Some(0));
        assert_eq!(batch.get_type_batch(CenterDistanceConstraint::CONSTRAINT_TYPE_ID).constraint_count(), 1);
    }
}
