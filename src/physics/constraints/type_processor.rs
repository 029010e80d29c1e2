use crate::physics::bodies_gather_scatter::SolverBodies;
use crate::physics::constraints::type_batch::TypeBatch;

/// Interprets the untyped storage of a type batch for bookkeeping and solving.
///
/// Holds no constraint state. The solver keeps one processor per registered constraint type and
/// selects it once per type batch; the per-bundle loops inside are fully monomorphized.
pub trait ITypeProcessor: Send + Sync {
    /// Gets the type id assigned to this processor.
    fn type_id(&self) -> usize;

    /// Gets the number of bodies associated with each constraint in this type processor.
    fn bodies_per_constraint(&self) -> usize;

    /// Gets the number of degrees of freedom that each constraint constrains.
    fn constrained_degrees_of_freedom(&self) -> usize;

    /// Whether the prestep data must be refreshed between substeps (contacts).
    fn requires_incremental_substep_updates(&self) -> bool;

    /// Creates an empty type batch laid out for this processor's bundle types.
    fn create_type_batch(&self) -> TypeBatch;

    /// Applies every constraint's accumulated impulse to its bodies.
    ///
    /// # Safety
    /// No other thread may access the velocities of bodies referenced by `type_batch` for the
    /// duration of the call.
    unsafe fn warm_start(&self, type_batch: &mut TypeBatch, bodies: &SolverBodies);

    /// Runs one velocity iteration over every constraint in the type batch.
    ///
    /// # Safety
    /// Same requirements as `warm_start`.
    unsafe fn solve(&self, type_batch: &mut TypeBatch, bodies: &SolverBodies, dt: f32, inverse_dt: f32);

    /// Refreshes velocity-dependent prestep data before a substep after the first.
    fn incrementally_update_for_substep(&self, type_batch: &mut TypeBatch, bodies: &SolverBodies, dt: f32);
}
