use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;
use log::{debug, trace};

use crate::error::SolverError;
use crate::physics::bodies::Bodies;
use crate::physics::bodies_gather_scatter::SolverBodies;
use crate::physics::body_properties::BodyInertia;
use crate::physics::constraint_batch::ConstraintBatch;
use crate::physics::constraint_location::ConstraintLocation;
#[cfg(not(feature = "validate-descriptions"))]
use crate::physics::constraints::constraint_checker::ConstraintChecker;
use crate::physics::constraints::constraint_description::IConstraintDescription;
use crate::physics::constraints::type_batch::TypeBatch;
use crate::physics::constraints::type_processor::ITypeProcessor;
use crate::physics::handles::{BodyHandle, ConstraintHandle};
use crate::physics::pose_integrator::IPoseIntegrator;
use crate::physics::solve_description::SolveDescription;
use crate::utilities::bundle_indexing::BundleIndexing;
use crate::utilities::collections::index_set::IndexSet;
use crate::utilities::memory::id_pool::IdPool;
use crate::utilities::thread_dispatcher::IThreadDispatcher;

/// Holds and solves constraints between bodies.
///
/// Constraints are partitioned into solver batches. No dynamic body appears in more than one
/// constraint of a batch, so every constraint of a batch can be solved in parallel; batches are
/// solved one after another. Kinematic bodies are never written by constraints and do not block
/// batch membership.
pub struct Solver {
    /// Processors for each registered constraint type, indexed by type id.
    type_processors: Vec<Option<Box<dyn ITypeProcessor>>>,
    pub(crate) batches: Vec<ConstraintBatch>,
    /// Handles of the dynamic bodies referenced by each batch, parallel to `batches`.
    pub(crate) batch_referenced_handles: Vec<IndexSet>,
    /// Pool to retrieve constraint handles from when creating new constraints.
    handle_pool: IdPool,
    /// Mapping from constraint handle (via its internal integer value) to the location of a constraint in memory.
    pub(crate) handle_to_constraint: Vec<ConstraintLocation>,
    /// Constraints attached to each body, indexed by body handle.
    body_constraints: Vec<Vec<ConstraintHandle>>,
    solve_description: SolveDescription,
    /// Remaining unclaimed jobs of the stage currently being dispatched.
    job_counter: CachePadded<AtomicUsize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SolverStageType {
    IncrementalUpdate,
    WarmStart,
    Solve,
}

/// Shares the type batches of one solver batch with the dispatched workers.
struct TypeBatchJobs<'a> {
    type_batches: *mut TypeBatch,
    count: usize,
    _marker: PhantomData<&'a mut [TypeBatch]>,
}

// Each job index is claimed by exactly one worker through the job counter.
unsafe impl Sync for TypeBatchJobs<'_> {}

impl<'a> TypeBatchJobs<'a> {
    fn new(type_batches: &'a mut [TypeBatch]) -> Self {
        Self {
            count: type_batches.len(),
            type_batches: type_batches.as_mut_ptr(),
            _marker: PhantomData,
        }
    }

    /// # Safety
    /// No two live references may be created for the same `job_index`.
    #[inline(always)]
    #[allow(clippy::mut_from_ref)]
    unsafe fn get(&self, job_index: usize) -> &mut TypeBatch {
        debug_assert!(job_index < self.count);
        &mut *self.type_batches.add(job_index)
    }
}

impl Solver {
    pub fn new(solve_description: SolveDescription) -> Self {
        Self {
            type_processors: Vec::new(),
            batches: Vec::new(),
            batch_referenced_handles: Vec::new(),
            handle_pool: IdPool::new(128),
            handle_to_constraint: Vec::new(),
            body_constraints: Vec::new(),
            solve_description,
            job_counter: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    #[inline(always)]
    pub fn solve_description(&self) -> &SolveDescription {
        &self.solve_description
    }

    pub fn set_solve_description(&mut self, solve_description: SolveDescription) {
        self.solve_description = solve_description;
    }

    /// Registers the processor for the constraint type described by `TDescription`.
    pub fn register<TDescription: IConstraintDescription>(&mut self) {
        let processor = TDescription::create_type_processor();
        debug_assert_eq!(
            processor.type_id(),
            TDescription::CONSTRAINT_TYPE_ID,
            "The description's type id must match its type processor's."
        );
        self.register_type_processor(processor);
    }

    /// Registers a type processor under its own type id. Re-registering a type id replaces the processor.
    pub fn register_type_processor(&mut self, processor: Box<dyn ITypeProcessor>) {
        let type_id = processor.type_id();
        if type_id >= self.type_processors.len() {
            self.type_processors.resize_with(type_id + 1, || None);
        }
        debug!(
            "registered constraint type {type_id} with {} bodies per constraint",
            processor.bodies_per_constraint()
        );
        self.type_processors[type_id] = Some(processor);
    }

    /// Gets the processor registered for a type id.
    #[inline(always)]
    pub fn type_processor(&self, type_id: usize) -> Option<&dyn ITypeProcessor> {
        self.type_processors.get(type_id).and_then(Option::as_deref)
    }

    #[inline(always)]
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    #[inline(always)]
    pub fn batches(&self) -> &[ConstraintBatch] {
        &self.batches
    }

    /// Gets the set of dynamic body handles referenced by the constraints of a batch.
    #[inline(always)]
    pub fn batch_referenced_handles(&self, batch_index: usize) -> &IndexSet {
        &self.batch_referenced_handles[batch_index]
    }

    pub fn constraint_count(&self) -> usize {
        self.batches.iter().map(ConstraintBatch::constraint_count).sum()
    }

    /// Checks whether a constraint handle refers to a live constraint.
    #[inline(always)]
    pub fn constraint_exists(&self, handle: ConstraintHandle) -> bool {
        handle.0 >= 0
            && self
                .handle_to_constraint
                .get(handle.0 as usize)
                .is_some_and(ConstraintLocation::is_used)
    }

    /// Gets the memory location of a constraint. The handle must be live.
    #[inline(always)]
    pub fn location(&self, handle: ConstraintHandle) -> ConstraintLocation {
        if !self.constraint_exists(handle) {
            panic!("{handle} does not refer to a live constraint.");
        }
        self.handle_to_constraint[handle.0 as usize]
    }

    fn type_batch_for(&self, handle: ConstraintHandle) -> (&TypeBatch, usize) {
        let location = self.location(handle);
        let type_batch = self.batches[location.batch_index as usize].get_type_batch(location.type_id as usize);
        (type_batch, location.index_in_type_batch as usize)
    }

    fn type_batch_for_mut(&mut self, handle: ConstraintHandle) -> (&mut TypeBatch, usize) {
        let location = self.location(handle);
        let type_batch = self.batches[location.batch_index as usize].get_type_batch_mut(location.type_id as usize);
        (type_batch, location.index_in_type_batch as usize)
    }

    /// Gets the handles of the bodies a constraint references, in constraint order.
    pub fn get_body_handles(&self, handle: ConstraintHandle) -> Vec<BodyHandle> {
        let (type_batch, index) = self.type_batch_for(handle);
        type_batch.body_handles(index).collect()
    }

    /// Gets the constraints currently attached to a body.
    pub fn constraints_for_body(&self, body: BodyHandle) -> &[ConstraintHandle] {
        match self.body_constraints.get(body.0 as usize) {
            Some(constraints) if body.0 >= 0 => constraints,
            _ => &[],
        }
    }

    /// Checks a description according to the build's validation mode.
    fn check_description<TDescription: IConstraintDescription>(description: &TDescription) -> Result<(), SolverError> {
        #[cfg(feature = "validate-descriptions")]
        description.validate()?;
        #[cfg(not(feature = "validate-descriptions"))]
        ConstraintChecker::assert_valid(description.validate(), std::any::type_name::<TDescription>());
        Ok(())
    }

    /// Gets the handles that keep a constraint's batch from holding other constraints on the same bodies.
    fn blocking_handles_of(&self, location: &ConstraintLocation) -> Vec<usize> {
        let batch_index = location.batch_index as usize;
        let referenced = &self.batch_referenced_handles[batch_index];
        self.batches[batch_index]
            .get_type_batch(location.type_id as usize)
            .body_handles(location.index_in_type_batch as usize)
            .map(|body| body.0 as usize)
            .filter(|&body| referenced.contains(body))
            .collect()
    }

    /// Finds the first batch able to hold a constraint on the given dynamic bodies.
    /// Returns the batch count if a new batch is needed.
    pub(crate) fn find_candidate_batch(&self, blocking_handles: &[usize]) -> usize {
        self.batch_referenced_handles
            .iter()
            .position(|referenced| referenced.can_fit(blocking_handles))
            .unwrap_or(self.batches.len())
    }

    /// Allocates a constraint slot in a batch, creating the batch if `batch_index` is one past the end.
    /// Points the handle at the new slot.
    fn allocate_in_batch(
        &mut self,
        batch_index: usize,
        handle: ConstraintHandle,
        body_handles: &[BodyHandle],
        blocking_handles: &[usize],
        type_id: usize,
    ) -> ConstraintLocation {
        debug_assert!(batch_index <= self.batches.len());
        if batch_index == self.batches.len() {
            self.batches.push(ConstraintBatch::new(self.type_processors.len()));
            self.batch_referenced_handles.push(IndexSet::default());
            debug!("created solver batch {batch_index}");
        }
        let Some(processor) = self.type_processors.get(type_id).and_then(Option::as_deref) else {
            unreachable!("Constraints can only be allocated for registered types.");
        };
        let index = self.batches[batch_index]
            .get_or_create_type_batch(processor)
            .allocate(handle, body_handles);
        let referenced = &mut self.batch_referenced_handles[batch_index];
        for &body in blocking_handles {
            referenced.add(body);
        }
        let location = ConstraintLocation {
            batch_index: batch_index as i32,
            type_id: type_id as i32,
            index_in_type_batch: index as i32,
        };
        let slot = handle.0 as usize;
        if slot >= self.handle_to_constraint.len() {
            self.handle_to_constraint.resize(slot + 1, ConstraintLocation::UNUSED);
        }
        self.handle_to_constraint[slot] = location;
        location
    }

    fn write_description<TDescription: IConstraintDescription>(
        &mut self,
        location: &ConstraintLocation,
        description: &TDescription,
    ) {
        let type_batch = self.batches[location.batch_index as usize].get_type_batch_mut(location.type_id as usize);
        let (bundle_index, inner_index) = BundleIndexing::get_bundle_indices(location.index_in_type_batch as usize);
        description.apply_description(
            &mut type_batch.prestep_data_mut::<TDescription::PrestepData>()[bundle_index],
            inner_index,
        );
    }

    /// Adds a constraint between the given bodies.
    ///
    /// Fails without modifying the solver when the type is unregistered, the body count is wrong, a
    /// body is missing or repeated, or (with the `validate-descriptions` feature) the description is invalid.
    pub fn add<TDescription: IConstraintDescription>(
        &mut self,
        bodies: &Bodies,
        body_handles: &[BodyHandle],
        description: &TDescription,
    ) -> Result<ConstraintHandle, SolverError> {
        let type_id = TDescription::CONSTRAINT_TYPE_ID;
        let expected = self
            .type_processor(type_id)
            .ok_or(SolverError::UnknownConstraintType { type_id })?
            .bodies_per_constraint();
        if body_handles.len() != expected {
            return Err(SolverError::BodyCountMismatch {
                expected,
                actual: body_handles.len(),
            });
        }
        for (i, &body) in body_handles.iter().enumerate() {
            if !bodies.contains(body) {
                return Err(SolverError::UnknownBody(body));
            }
            if body_handles[..i].contains(&body) {
                return Err(SolverError::DuplicateBody(body));
            }
        }
        Self::check_description(description)?;

        let blocking_handles: Vec<usize> = body_handles
            .iter()
            .filter(|&&body| !bodies.local_inertia(body).is_kinematic())
            .map(|body| body.0 as usize)
            .collect();
        let batch_index = self.find_candidate_batch(&blocking_handles);
        let handle = ConstraintHandle(self.handle_pool.take() as i32);
        let location = self.allocate_in_batch(batch_index, handle, body_handles, &blocking_handles, type_id);
        self.write_description(&location, description);
        for body in body_handles {
            let slot = body.0 as usize;
            if slot >= self.body_constraints.len() {
                self.body_constraints.resize_with(slot + 1, Vec::new);
            }
            self.body_constraints[slot].push(handle);
        }
        trace!("added {handle} of type {type_id} to batch {batch_index}");
        Ok(handle)
    }

    /// Overwrites the settings of an existing constraint. Accumulated impulses are kept.
    pub fn apply_description<TDescription: IConstraintDescription>(
        &mut self,
        handle: ConstraintHandle,
        description: &TDescription,
    ) -> Result<(), SolverError> {
        let location = self.location(handle);
        assert_eq!(
            location.type_id as usize,
            TDescription::CONSTRAINT_TYPE_ID,
            "The description's type must match the constraint's type."
        );
        Self::check_description(description)?;
        self.write_description(&location, description);
        Ok(())
    }

    /// Reads back the description of an existing constraint.
    pub fn get_description<TDescription: IConstraintDescription>(&self, handle: ConstraintHandle) -> TDescription {
        let location = self.location(handle);
        assert_eq!(
            location.type_id as usize,
            TDescription::CONSTRAINT_TYPE_ID,
            "The description's type must match the constraint's type."
        );
        let (type_batch, index) = self.type_batch_for(handle);
        let (bundle_index, inner_index) = BundleIndexing::get_bundle_indices(index);
        TDescription::build_description(
            &type_batch.prestep_data::<TDescription::PrestepData>()[bundle_index],
            inner_index,
        )
    }

    /// Removes a constraint and recycles its handle.
    pub fn remove(&mut self, handle: ConstraintHandle) {
        let location = self.location(handle);
        for body in self.get_body_handles(handle) {
            if let Some(constraints) = self.body_constraints.get_mut(body.0 as usize) {
                constraints.retain(|&constraint| constraint != handle);
            }
        }
        self.remove_from_batch(location);
        self.handle_to_constraint[handle.0 as usize] = ConstraintLocation::UNUSED;
        self.handle_pool.return_id(handle.0 as usize);
        trace!("removed {handle}");
    }

    /// Releases the slot at `location`, dropping its type batch and trailing batches once empty.
    /// The handle table entry of the removed constraint is left to the caller.
    pub(crate) fn remove_from_batch(&mut self, location: ConstraintLocation) {
        let batch_index = location.batch_index as usize;
        let type_id = location.type_id as usize;
        let index = location.index_in_type_batch as usize;
        let batch = &mut self.batches[batch_index];
        let Some(type_batch_index) = batch.type_batch_index(type_id) else {
            unreachable!("A live constraint's type batch must exist.");
        };
        let referenced = &mut self.batch_referenced_handles[batch_index];
        let type_batch = &mut batch.type_batches[type_batch_index];
        for body in type_batch.body_handles(index) {
            // Only dynamic bodies were added to the set; a dynamic body has one constraint per batch.
            if referenced.contains(body.0 as usize) {
                referenced.remove(body.0 as usize);
            }
        }
        type_batch.remove(index, &mut self.handle_to_constraint);
        batch.remove_type_batch_if_empty(type_batch_index);
        self.remove_batch_if_empty(batch_index);
    }

    /// Drops trailing empty batches once the last batch empties.
    fn remove_batch_if_empty(&mut self, batch_index: usize) {
        if batch_index + 1 != self.batches.len() {
            return;
        }
        while self.batches.last().is_some_and(ConstraintBatch::is_empty) {
            self.batches.pop();
            self.batch_referenced_handles.pop();
            debug!("removed empty solver batch {}", self.batches.len());
        }
    }

    /// Moves a constraint into a lower batch, keeping its handle, settings and accumulated impulses.
    /// The target batch must be able to hold the constraint's dynamic bodies.
    pub(crate) fn move_constraint(&mut self, handle: ConstraintHandle, target_batch_index: usize) {
        let source = self.location(handle);
        debug_assert!(target_batch_index < source.batch_index as usize);
        let blocking_handles = self.blocking_handles_of(&source);
        self.transfer_constraint(handle, source, target_batch_index, &blocking_handles);
    }

    /// Copies a constraint into another batch (one past the end creates it) and frees its old slot.
    fn transfer_constraint(
        &mut self,
        handle: ConstraintHandle,
        source: ConstraintLocation,
        target_batch_index: usize,
        blocking_handles: &[usize],
    ) {
        let source_batch_index = source.batch_index as usize;
        debug_assert_ne!(target_batch_index, source_batch_index);
        debug_assert!(
            target_batch_index == self.batches.len()
                || self.batch_referenced_handles[target_batch_index].can_fit(blocking_handles)
        );
        let body_handles = self.get_body_handles(handle);
        let type_id = source.type_id as usize;
        let target = self.allocate_in_batch(target_batch_index, handle, &body_handles, blocking_handles, type_id);

        let (target_type_batch, source_type_batch) = if target_batch_index < source_batch_index {
            let (lower, upper) = self.batches.split_at_mut(source_batch_index);
            (lower[target_batch_index].get_type_batch_mut(type_id), upper[0].get_type_batch(type_id))
        } else {
            let (lower, upper) = self.batches.split_at_mut(target_batch_index);
            (upper[0].get_type_batch_mut(type_id), lower[source_batch_index].get_type_batch(type_id))
        };
        target_type_batch.copy_constraint_data(
            target.index_in_type_batch as usize,
            source_type_batch,
            source.index_in_type_batch as usize,
        );
        self.remove_from_batch(source);
    }

    /// Changes a body's local inertia and keeps batch membership consistent with its kinematic state.
    ///
    /// A body becoming kinematic stops blocking batches. A body becoming dynamic may now be shared by
    /// several constraints of one batch; every constraint after the first is moved to the lowest
    /// batch that can hold it, keeping its handle, settings and accumulated impulses.
    pub fn set_local_inertia(
        &mut self,
        bodies: &mut Bodies,
        body: BodyHandle,
        inertia: BodyInertia,
    ) -> Result<(), SolverError> {
        if !bodies.contains(body) {
            return Err(SolverError::UnknownBody(body));
        }
        let was_kinematic = bodies.local_inertia(body).is_kinematic();
        bodies.set_local_inertia(body, inertia);
        match (was_kinematic, inertia.is_kinematic()) {
            (false, true) => self.update_references_for_body_becoming_kinematic(body),
            (true, false) => self.update_references_for_body_becoming_dynamic(bodies, body),
            _ => {}
        }
        Ok(())
    }

    fn update_references_for_body_becoming_kinematic(&mut self, body: BodyHandle) {
        let slot = body.0 as usize;
        let Self {
            body_constraints,
            handle_to_constraint,
            batch_referenced_handles,
            ..
        } = self;
        for constraint in body_constraints.get(slot).into_iter().flatten() {
            let referenced = &mut batch_referenced_handles[handle_to_constraint[constraint.0 as usize].batch_index as usize];
            if referenced.contains(slot) {
                referenced.remove(slot);
            }
        }
        trace!("{body} became kinematic");
    }

    fn update_references_for_body_becoming_dynamic(&mut self, bodies: &Bodies, body: BodyHandle) {
        let slot = body.0 as usize;
        for constraint in self.constraints_for_body(body).to_vec() {
            let source = self.location(constraint);
            let batch_index = source.batch_index as usize;
            if !self.batch_referenced_handles[batch_index].contains(slot) {
                self.batch_referenced_handles[batch_index].add(slot);
                continue;
            }
            // Another constraint in this batch already holds the body.
            let blocking_handles: Vec<usize> = self
                .get_body_handles(constraint)
                .into_iter()
                .filter(|&handle| !bodies.local_inertia(handle).is_kinematic())
                .map(|handle| handle.0 as usize)
                .collect();
            let target_batch_index = self
                .batch_referenced_handles
                .iter()
                .enumerate()
                .position(|(index, referenced)| index != batch_index && referenced.can_fit(&blocking_handles))
                .unwrap_or(self.batches.len());
            self.transfer_constraint(constraint, source, target_batch_index, &blocking_handles);
            // Freeing the old slot released the body; it still belongs to the holding constraint.
            self.batch_referenced_handles[batch_index].add(slot);
            debug!("moved {constraint} from batch {batch_index} to {target_batch_index} after {body} became dynamic");
        }
    }

    /// Gets the accumulated impulse scalars of a constraint in declaration order.
    pub fn get_accumulated_impulses(&self, handle: ConstraintHandle) -> Vec<f32> {
        let (type_batch, index) = self.type_batch_for(handle);
        let mut impulses = vec![0.0; type_batch.accumulated_impulse_scalar_count()];
        type_batch.read_accumulated_impulses(index, &mut impulses);
        impulses
    }

    /// Overwrites the accumulated impulse scalars of a constraint in declaration order.
    pub fn set_accumulated_impulses(&mut self, handle: ConstraintHandle, impulses: &[f32]) {
        let (type_batch, index) = self.type_batch_for_mut(handle);
        assert_eq!(
            impulses.len(),
            type_batch.accumulated_impulse_scalar_count(),
            "Impulse count must match the constraint type."
        );
        type_batch.write_accumulated_impulses(index, impulses);
    }

    /// Gets the magnitude of a constraint's accumulated impulse vector.
    pub fn get_accumulated_impulse_magnitude(&self, handle: ConstraintHandle) -> f32 {
        self.get_accumulated_impulses(handle)
            .iter()
            .map(|impulse| impulse * impulse)
            .sum::<f32>()
            .sqrt()
    }

    /// Scales every accumulated impulse in the solver.
    pub fn scale_accumulated_impulses(&mut self, scale: f32) {
        for batch in &mut self.batches {
            for type_batch in &mut batch.type_batches {
                type_batch.scale_accumulated_impulses(scale);
            }
        }
    }

    /// Runs one stage over every batch in order. Within a batch, type batches are distributed to
    /// workers through the job counter.
    fn execute_stage(
        &mut self,
        bodies: &mut Bodies,
        stage: SolverStageType,
        dt: f32,
        thread_dispatcher: Option<&dyn IThreadDispatcher>,
    ) {
        let inverse_dt = 1.0 / dt;
        let Self {
            type_processors,
            batches,
            job_counter,
            ..
        } = self;
        let type_processors: &[Option<Box<dyn ITypeProcessor>>] = type_processors;
        let job_counter: &AtomicUsize = job_counter;
        let solver_bodies = bodies.solver_access();
        for batch in batches.iter_mut() {
            let job_count = batch.type_batches.len();
            match thread_dispatcher {
                Some(dispatcher) if job_count > 1 && dispatcher.thread_count() > 1 => {
                    job_counter.store(job_count, Ordering::Release);
                    let jobs = TypeBatchJobs::new(&mut batch.type_batches);
                    let worker = |_worker_index: usize| {
                        while let Ok(remaining) =
                            job_counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| count.checked_sub(1))
                        {
                            // SAFETY: the counter hands out each job index once.
                            let type_batch = unsafe { jobs.get(remaining - 1) };
                            Self::execute_job(type_processors, type_batch, &solver_bodies, stage, dt, inverse_dt);
                        }
                    };
                    dispatcher.dispatch_workers(&worker, job_count);
                }
                _ => {
                    for type_batch in batch.type_batches.iter_mut() {
                        Self::execute_job(type_processors, type_batch, &solver_bodies, stage, dt, inverse_dt);
                    }
                }
            }
        }
    }

    #[inline(always)]
    fn execute_job(
        type_processors: &[Option<Box<dyn ITypeProcessor>>],
        type_batch: &mut TypeBatch,
        bodies: &SolverBodies,
        stage: SolverStageType,
        dt: f32,
        inverse_dt: f32,
    ) {
        let Some(processor) = type_processors.get(type_batch.type_id()).and_then(Option::as_deref) else {
            unreachable!("Type batches only exist for registered types.");
        };
        // SAFETY: type batches of one solver batch share no dynamic body, and kinematic bodies are never written.
        unsafe {
            match stage {
                SolverStageType::IncrementalUpdate => {
                    if processor.requires_incremental_substep_updates() {
                        processor.incrementally_update_for_substep(type_batch, bodies, dt);
                    }
                }
                SolverStageType::WarmStart => processor.warm_start(type_batch, bodies),
                SolverStageType::Solve => processor.solve(type_batch, bodies, dt, inverse_dt),
            }
        }
    }

    /// Warm starts and runs the configured velocity iterations for one substep of length `dt`.
    /// Poses are not integrated. World inertias must be current.
    pub fn solve_velocities(
        &mut self,
        bodies: &mut Bodies,
        dt: f32,
        thread_dispatcher: Option<&dyn IThreadDispatcher>,
    ) {
        self.execute_stage(bodies, SolverStageType::WarmStart, dt, thread_dispatcher);
        for _ in 0..self.solve_description.velocity_iteration_count {
            self.execute_stage(bodies, SolverStageType::Solve, dt, thread_dispatcher);
        }
    }

    /// Advances the bodies by `dt`, split into the configured number of substeps.
    ///
    /// Each substep integrates velocities, warm starts, runs the velocity iterations and then
    /// integrates poses. From the second substep on, constraints tracking separation are first
    /// refreshed with the motion of the previous substep.
    pub fn solve(
        &mut self,
        bodies: &mut Bodies,
        dt: f32,
        pose_integrator: &dyn IPoseIntegrator,
        thread_dispatcher: Option<&dyn IThreadDispatcher>,
    ) {
        let substep_count = self.solve_description.substep_count;
        let substep_dt = dt / substep_count as f32;
        trace!(
            "solving {} constraints in {} batches: {} substeps of {} iterations",
            self.constraint_count(),
            self.batches.len(),
            substep_count,
            self.solve_description.velocity_iteration_count
        );
        bodies.update_world_inertias();
        for substep_index in 0..substep_count {
            if substep_index > 0 {
                self.execute_stage(bodies, SolverStageType::IncrementalUpdate, substep_dt, thread_dispatcher);
            }
            pose_integrator.integrate_velocities(bodies, substep_dt);
            self.solve_velocities(bodies, substep_dt, thread_dispatcher);
            pose_integrator.integrate_poses(bodies, substep_dt);
            trace!("finished substep {substep_index}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_description::BodyDescription;
    use crate::physics::body_properties::{BodyInertia, BodyVelocity};
    use crate::physics::constraints::ball_socket::BallSocket;
    use crate::physics::constraints::center_distance_constraint::CenterDistanceConstraint;
    use crate::physics::constraints::spring_settings::SpringSettings;
    use glam::Vec3;

    fn solver() -> Solver {
        let mut solver = Solver::new(SolveDescription::default());
        solver.register::<BallSocket>();
        solver.register::<CenterDistanceConstraint>();
        solver
    }

    fn chain(bodies: &mut Bodies, count: usize) -> Vec<BodyHandle> {
        (0..count)
            .map(|i| {
                bodies.add(&BodyDescription::create_dynamic(
                    Vec3::new(i as f32, 0.0, 0.0),
                    Vec3::ZERO,
                    BodyInertia::sphere(1.0, 0.5),
                ))
            })
            .collect()
    }

    fn socket() -> BallSocket {
        BallSocket::new(Vec3::new(0.5, 0.0, 0.0), Vec3::new(-0.5, 0.0, 0.0), SpringSettings::new(30.0, 1.0))
    }

    #[test]
    fn test_chain_alternates_batches() {
        let mut bodies = Bodies::new(4);
        let handles = chain(&mut bodies, 4);
        let mut solver = solver();
        let constraints: Vec<_> = handles
            .windows(2)
            .map(|pair| solver.add(&bodies, pair, &socket()).unwrap())
            .collect();
        assert_eq!(solver.batch_count(), 2);
        assert_eq!(solver.location(constraints[0]).batch_index, 0);
        assert_eq!(solver.location(constraints[1]).batch_index, 1);
        assert_eq!(solver.location(constraints[2]).batch_index, 0);
        assert_eq!(solver.constraints_for_body(handles[1]), &[constraints[0], constraints[1]]);
    }

    #[test]
    fn test_kinematic_bodies_do_not_block_batches() {
        let mut bodies = Bodies::new(3);
        let anchor = bodies.add(&BodyDescription::create_kinematic(Vec3::ZERO, Vec3::ZERO));
        let a = bodies.add(&BodyDescription::create_dynamic(Vec3::X, Vec3::ZERO, BodyInertia::sphere(1.0, 0.5)));
        let b = bodies.add(&BodyDescription::create_dynamic(-Vec3::X, Vec3::ZERO, BodyInertia::sphere(1.0, 0.5)));
        let mut solver = solver();
        solver.add(&bodies, &[anchor, a], &socket()).unwrap();
        solver.add(&bodies, &[anchor, b], &socket()).unwrap();
        assert_eq!(solver.batch_count(), 1);
        assert!(!solver.batch_referenced_handles(0).contains(anchor.0 as usize));
    }

    #[test]
    fn test_add_rejects_bad_input() {
        let mut bodies = Bodies::new(2);
        let handles = chain(&mut bodies, 2);
        let mut solver = Solver::new(SolveDescription::default());
        assert_eq!(
            solver.add(&bodies, &handles, &socket()),
            Err(SolverError::UnknownConstraintType {
                type_id: BallSocket::CONSTRAINT_TYPE_ID
            })
        );
        solver.register::<BallSocket>();
        assert_eq!(
            solver.add(&bodies, &handles[..1], &socket()),
            Err(SolverError::BodyCountMismatch { expected: 2, actual: 1 })
        );
        assert_eq!(
            solver.add(&bodies, &[handles[0], handles[0]], &socket()),
            Err(SolverError::DuplicateBody(handles[0]))
        );
        assert_eq!(
            solver.add(&bodies, &[handles[0], BodyHandle(17)], &socket()),
            Err(SolverError::UnknownBody(BodyHandle(17)))
        );
        assert_eq!(solver.constraint_count(), 0);
    }

    #[test]
    fn test_remove_updates_moved_constraint_and_drops_trailing_batches() {
        let mut bodies = Bodies::new(4);
        let handles = chain(&mut bodies, 4);
        let mut solver = solver();
        let first = solver.add(&bodies, &handles[0..2], &socket()).unwrap();
        let second = solver.add(&bodies, &handles[2..4], &socket()).unwrap();
        let upper = solver.add(&bodies, &handles[1..3], &socket()).unwrap();
        assert_eq!(solver.batch_count(), 2);
        solver.set_accumulated_impulses(second, &[1.0, 2.0, 3.0]);

        solver.remove(first);
        assert!(!solver.constraint_exists(first));
        assert_eq!(solver.location(second).index_in_type_batch, 0);
        assert_eq!(solver.get_accumulated_impulses(second), vec![1.0, 2.0, 3.0]);
        assert_eq!(solver.get_body_handles(second), vec![handles[2], handles[3]]);
        assert!(!solver.batch_referenced_handles(0).contains(handles[0].0 as usize));

        solver.remove(upper);
        assert_eq!(solver.batch_count(), 1);
        assert_eq!(solver.constraints_for_body(handles[1]), &[] as &[ConstraintHandle]);
        // The freed handle is recycled.
        let again = solver.add(&bodies, &handles[0..2], &socket()).unwrap();
        assert!(again == first || again == upper);
    }

    #[test]
    fn test_description_round_trip_and_reapply_keeps_impulses() {
        let mut bodies = Bodies::new(2);
        let handles = chain(&mut bodies, 2);
        let mut solver = solver();
        let handle = solver
            .add(&bodies, &handles, &CenterDistanceConstraint::new(1.0, SpringSettings::new(30.0, 1.0)))
            .unwrap();
        solver.set_accumulated_impulses(handle, &[4.0]);
        let updated = CenterDistanceConstraint::new(2.0, SpringSettings::new(10.0, 0.5));
        solver.apply_description(handle, &updated).unwrap();
        assert_eq!(solver.get_description::<CenterDistanceConstraint>(handle), updated);
        assert_eq!(solver.get_accumulated_impulses(handle), vec![4.0]);
        solver.scale_accumulated_impulses(0.5);
        assert_eq!(solver.get_accumulated_impulse_magnitude(handle), 2.0);
    }

    #[test]
    #[should_panic(expected = "must match the constraint's type")]
    fn test_get_description_with_wrong_type_panics() {
        let mut bodies = Bodies::new(2);
        let handles = chain(&mut bodies, 2);
        let mut solver = solver();
        let handle = solver.add(&bodies, &handles, &socket()).unwrap();
        solver.get_description::<CenterDistanceConstraint>(handle);
    }

    #[test]
    fn test_solve_velocities_drives_separating_pair_toward_target_distance() {
        let mut bodies = Bodies::new(2);
        let handles = chain(&mut bodies, 2);
        bodies.set_velocity(handles[1], BodyVelocity::from_linear(Vec3::new(2.0, 0.0, 0.0)));
        let mut solver = solver();
        solver
            .add(&bodies, &handles, &CenterDistanceConstraint::new(1.0, SpringSettings::new(30.0, 1.0)))
            .unwrap();
        solver.solve_velocities(&mut bodies, 1.0 / 60.0, None);
        let relative = bodies.velocity(handles[1]).linear.x - bodies.velocity(handles[0]).linear.x;
        assert!(relative.abs() < 0.5, "relative velocity {relative}");
        // Momentum is conserved between two equal masses.
        let total = bodies.velocity(handles[1]).linear.x + bodies.velocity(handles[0]).linear.x;
        assert!((total - 2.0).abs() < 1e-4);
    }

    fn linked_to_anchor(bodies: &mut Bodies, solver: &mut Solver) -> (BodyHandle, [BodyHandle; 2], [ConstraintHandle; 2]) {
        let anchor = bodies.add(&BodyDescription::create_kinematic(Vec3::ZERO, Vec3::ZERO));
        let a = bodies.add(&BodyDescription::create_dynamic(Vec3::new(3.0, 0.0, 0.0), Vec3::ZERO, BodyInertia::sphere(1.0, 0.5)));
        let b = bodies.add(&BodyDescription::create_dynamic(Vec3::new(-3.0, 0.0, 0.0), Vec3::ZERO, BodyInertia::sphere(1.0, 0.5)));
        let distance = CenterDistanceConstraint::new(2.0, SpringSettings::new(30.0, 1.0));
        let first = solver.add(bodies, &[anchor, a], &distance).unwrap();
        let second = solver.add(bodies, &[anchor, b], &distance).unwrap();
        (anchor, [a, b], [first, second])
    }

    #[test]
    fn test_body_becoming_dynamic_moves_conflicting_constraint() {
        let mut bodies = Bodies::new(3);
        let mut solver = solver();
        let (anchor, [a, b], [first, second]) = linked_to_anchor(&mut bodies, &mut solver);
        assert_eq!(solver.batch_count(), 1);
        solver.set_accumulated_impulses(second, &[0.25]);

        solver.set_local_inertia(&mut bodies, anchor, BodyInertia::sphere(1.0, 0.5)).unwrap();
        assert_eq!(solver.batch_count(), 2);
        assert_eq!(solver.location(first).batch_index, 0);
        assert_eq!(solver.location(second).batch_index, 1);
        assert_eq!(solver.get_accumulated_impulses(second), vec![0.25]);
        assert_eq!(solver.get_body_handles(second), vec![anchor, b]);
        for batch_index in 0..2 {
            assert!(solver.batch_referenced_handles(batch_index).contains(anchor.0 as usize));
        }
        assert!(solver.batch_referenced_handles(0).contains(a.0 as usize));
        assert!(solver.batch_referenced_handles(1).contains(b.0 as usize));

        solver.solve_velocities(&mut bodies, 1.0 / 60.0, None);
        // Only internal constraints act on three equal masses.
        let momentum = bodies.velocity(anchor).linear + bodies.velocity(a).linear + bodies.velocity(b).linear;
        assert!(momentum.length() < 1e-3, "momentum {momentum}");
        assert!(bodies.velocity(a).linear.x < 0.0);
        assert!(bodies.velocity(b).linear.x > 0.0);
    }

    #[test]
    fn test_body_becoming_kinematic_stops_blocking_batches() {
        let mut bodies = Bodies::new(4);
        let handles = chain(&mut bodies, 3);
        let mut solver = solver();
        let left = solver.add(&bodies, &handles[0..2], &socket()).unwrap();
        let right = solver.add(&bodies, &handles[1..3], &socket()).unwrap();
        assert_eq!(solver.location(right).batch_index, 1);

        solver.set_local_inertia(&mut bodies, handles[1], BodyInertia::KINEMATIC).unwrap();
        assert!(!solver.batch_referenced_handles(0).contains(handles[1].0 as usize));
        assert!(!solver.batch_referenced_handles(1).contains(handles[1].0 as usize));
        assert!(solver.batch_referenced_handles(0).contains(handles[0].0 as usize));
        let extra = bodies.add(&BodyDescription::create_dynamic(Vec3::Y, Vec3::ZERO, BodyInertia::sphere(1.0, 0.5)));
        let shared = solver.add(&bodies, &[handles[1], extra], &socket()).unwrap();
        assert_eq!(solver.location(shared).batch_index, 0);

        solver.set_local_inertia(&mut bodies, handles[1], BodyInertia::sphere(1.0, 0.5)).unwrap();
        let batch_indices = [left, right, shared].map(|constraint| solver.location(constraint).batch_index);
        assert_ne!(batch_indices[0], batch_indices[1]);
        assert_ne!(batch_indices[0], batch_indices[2]);
        assert_ne!(batch_indices[1], batch_indices[2]);
        assert_eq!(
            solver.set_local_inertia(&mut bodies, BodyHandle(42), BodyInertia::KINEMATIC),
            Err(SolverError::UnknownBody(BodyHandle(42)))
        );
    }
}
