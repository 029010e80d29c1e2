use log::debug;

use crate::physics::handles::ConstraintHandle;
use crate::physics::solver::Solver;

/// Handles the movement of constraints from higher indexed batches into lower indexed batches
/// to avoid accumulating unnecessary ConstraintBatches.
///
/// Removals leave holes in low batches that new constraints cannot always fill, so without
/// compression the batch count only ratchets upward.
pub struct BatchCompressor;

impl BatchCompressor {
    /// Fraction of the constraint count moved per incremental compression.
    pub const DEFAULT_MAXIMUM_COMPRESSION_FRACTION: f32 = 0.0005;

    /// Gets the move budget of an incremental compression: the default fraction of the
    /// constraint count, but never less than one.
    pub fn maximum_moves_for(constraint_count: usize) -> usize {
        ((Self::DEFAULT_MAXIMUM_COMPRESSION_FRACTION * constraint_count as f32).round() as usize).max(1)
    }

    /// Moves up to `maximum_moves` constraints into the lowest batch able to hold them.
    /// Returns the number of constraints moved.
    ///
    /// Candidates are visited from the highest batch down so that the batches most likely to
    /// empty are drained first. Handles, settings and accumulated impulses survive the move.
    pub fn compress(solver: &mut Solver, maximum_moves: usize) -> usize {
        let mut move_count = 0;
        let mut source_batch_index = solver.batch_count();
        while source_batch_index > 1 && move_count < maximum_moves {
            source_batch_index -= 1;
            if source_batch_index >= solver.batch_count() {
                // Earlier moves emptied the trailing batches.
                continue;
            }
            let candidates: Vec<ConstraintHandle> = solver.batches[source_batch_index]
                .type_batches()
                .iter()
                .flat_map(|type_batch| type_batch.index_to_handle().iter().copied())
                .collect();
            for handle in candidates {
                if move_count == maximum_moves {
                    break;
                }
                if let Some(target_batch_index) = Self::find_lower_batch(solver, handle) {
                    solver.move_constraint(handle, target_batch_index);
                    debug!("moved {handle} from solver batch {source_batch_index} to {target_batch_index}");
                    move_count += 1;
                }
            }
        }
        move_count
    }

    /// Finds the lowest batch below the constraint's current batch that shares none of its dynamic bodies.
    fn find_lower_batch(solver: &Solver, handle: ConstraintHandle) -> Option<usize> {
        let location = solver.location(handle);
        let batch_index = location.batch_index as usize;
        let referenced = &solver.batch_referenced_handles[batch_index];
        let blocking_handles: Vec<usize> = solver
            .get_body_handles(handle)
            .into_iter()
            .map(|body| body.0 as usize)
            .filter(|&body| referenced.contains(body))
            .collect();
        solver.batch_referenced_handles[..batch_index]
            .iter()
            .position(|lower| lower.can_fit(&blocking_handles))
    }
}
