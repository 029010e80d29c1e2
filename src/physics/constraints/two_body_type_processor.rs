use std::marker::PhantomData;

use bytemuck::Pod;

use crate::physics::bodies_gather_scatter::SolverBodies;
use crate::physics::body_properties::{BodyInertiaWide, BodyVelocityWide};
use crate::physics::constraints::body_references::TwoBodyReferences;
use crate::physics::constraints::type_batch::TypeBatch;
use crate::physics::constraints::type_processor::ITypeProcessor;
use crate::utilities::quaternion_wide::QuaternionWide;
use crate::utilities::vector::Vector;
use crate::utilities::vector3_wide::Vector3Wide;

/// Prestep, warm start and solve iteration functions for a two-body constraint type.
#[allow(clippy::too_many_arguments)]
pub trait ITwoBodyConstraintFunctions<TPrestepData, TAccumulatedImpulse> {
    /// Whether the prestep data tracks velocity between substeps.
    const REQUIRES_INCREMENTAL_SUBSTEP_UPDATES: bool = false;

    fn warm_start(
        position_a: &Vector3Wide,
        orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        position_b: &Vector3Wide,
        orientation_b: &QuaternionWide,
        inertia_b: &BodyInertiaWide,
        prestep: &TPrestepData,
        accumulated_impulses: &TAccumulatedImpulse,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    );

    fn solve(
        position_a: &Vector3Wide,
        orientation_a: &QuaternionWide,
        inertia_a: &BodyInertiaWide,
        position_b: &Vector3Wide,
        orientation_b: &QuaternionWide,
        inertia_b: &BodyInertiaWide,
        dt: f32,
        inverse_dt: f32,
        prestep: &TPrestepData,
        accumulated_impulses: &mut TAccumulatedImpulse,
        wsv_a: &mut BodyVelocityWide,
        wsv_b: &mut BodyVelocityWide,
    );

    #[inline(always)]
    fn incrementally_update_for_substep(
        _dt: &Vector<f32>,
        _wsv_a: &BodyVelocityWide,
        _wsv_b: &BodyVelocityWide,
        _prestep: &mut TPrestepData,
    ) {
    }
}

/// Type processor for constraints coupling two bodies.
pub struct TwoBodyTypeProcessor<TPrestepData, TAccumulatedImpulse, TConstraintFunctions> {
    type_id: usize,
    constrained_degrees_of_freedom: usize,
    _marker: PhantomData<fn() -> (TPrestepData, TAccumulatedImpulse, TConstraintFunctions)>,
}

impl<TPrestepData, TAccumulatedImpulse, TConstraintFunctions>
    TwoBodyTypeProcessor<TPrestepData, TAccumulatedImpulse, TConstraintFunctions>
{
    pub fn new(type_id: usize, constrained_degrees_of_freedom: usize) -> Self {
        Self {
            type_id,
            constrained_degrees_of_freedom,
            _marker: PhantomData,
        }
    }
}

impl<TPrestepData, TAccumulatedImpulse, TConstraintFunctions> ITypeProcessor
    for TwoBodyTypeProcessor<TPrestepData, TAccumulatedImpulse, TConstraintFunctions>
where
    TPrestepData: Pod,
    TAccumulatedImpulse: Pod,
    TConstraintFunctions: ITwoBodyConstraintFunctions<TPrestepData, TAccumulatedImpulse>,
{
    fn type_id(&self) -> usize {
        self.type_id
    }

    fn bodies_per_constraint(&self) -> usize {
        2
    }

    fn constrained_degrees_of_freedom(&self) -> usize {
        self.constrained_degrees_of_freedom
    }

    fn requires_incremental_substep_updates(&self) -> bool {
        TConstraintFunctions::REQUIRES_INCREMENTAL_SUBSTEP_UPDATES
    }

    fn create_type_batch(&self) -> TypeBatch {
        TypeBatch::new::<TwoBodyReferences, TPrestepData, TAccumulatedImpulse>(self.type_id)
    }

    unsafe fn warm_start(&self, type_batch: &mut TypeBatch, bodies: &SolverBodies) {
        let (references, prestep, impulses) =
            type_batch.split_mut::<TwoBodyReferences, TPrestepData, TAccumulatedImpulse>();
        for ((references, prestep), impulses) in references.iter().zip(prestep.iter()).zip(impulses.iter()) {
            let a = bodies.gather_state(&references.handle_a);
            let b = bodies.gather_state(&references.handle_b);
            let mut wsv_a = a.velocities;
            let mut wsv_b = b.velocities;
            TConstraintFunctions::warm_start(
                &a.positions,
                &a.orientations,
                &a.inertias,
                &b.positions,
                &b.orientations,
                &b.inertias,
                prestep,
                impulses,
                &mut wsv_a,
                &mut wsv_b,
            );
            bodies.scatter_velocities(&wsv_a, &references.handle_a);
            bodies.scatter_velocities(&wsv_b, &references.handle_b);
        }
    }

    unsafe fn solve(&self, type_batch: &mut TypeBatch, bodies: &SolverBodies, dt: f32, inverse_dt: f32) {
        let (references, prestep, impulses) =
            type_batch.split_mut::<TwoBodyReferences, TPrestepData, TAccumulatedImpulse>();
        for ((references, prestep), impulses) in references.iter().zip(prestep.iter()).zip(impulses.iter_mut()) {
            let a = bodies.gather_state(&references.handle_a);
            let b = bodies.gather_state(&references.handle_b);
            let mut wsv_a = a.velocities;
            let mut wsv_b = b.velocities;
            TConstraintFunctions::solve(
                &a.positions,
                &a.orientations,
                &a.inertias,
                &b.positions,
                &b.orientations,
                &b.inertias,
                dt,
                inverse_dt,
                prestep,
                impulses,
                &mut wsv_a,
                &mut wsv_b,
            );
            bodies.scatter_velocities(&wsv_a, &references.handle_a);
            bodies.scatter_velocities(&wsv_b, &references.handle_b);
        }
    }

    fn incrementally_update_for_substep(&self, type_batch: &mut TypeBatch, bodies: &SolverBodies, dt: f32) {
        if !TConstraintFunctions::REQUIRES_INCREMENTAL_SUBSTEP_UPDATES {
            return;
        }
        let dt = Vector::splat(dt);
        let (references, prestep, _) =
            type_batch.split_mut::<TwoBodyReferences, TPrestepData, TAccumulatedImpulse>();
        for (references, prestep) in references.iter().zip(prestep.iter_mut()) {
            let a = bodies.gather_state(&references.handle_a);
            let b = bodies.gather_state(&references.handle_b);
            TConstraintFunctions::incrementally_update_for_substep(&dt, &a.velocities, &b.velocities, prestep);
        }
    }
}
