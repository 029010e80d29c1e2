use bytemuck::Pod;

use crate::error::ConstraintError;
use crate::physics::constraints::type_processor::ITypeProcessor;

/// Marks a type as a description of a constraint associated with a particular type batch.
pub trait IConstraintDescription: Sized {
    /// Bundle layout the description is written into.
    type PrestepData: Pod;

    /// Fixed id routing handle operations to the right type batch.
    const CONSTRAINT_TYPE_ID: usize;

    /// Changes the batch-held memory at a given lane to match the description.
    fn apply_description(&self, prestep_data: &mut Self::PrestepData, inner_index: usize);

    /// Creates a description from the batch-held memory at a given lane.
    fn build_description(prestep_data: &Self::PrestepData, inner_index: usize) -> Self;

    /// Checks the description's settings.
    fn validate(&self) -> Result<(), ConstraintError> {
        Ok(())
    }

    /// Creates the type processor that solves constraints of this type.
    fn create_type_processor() -> Box<dyn ITypeProcessor>;
}
