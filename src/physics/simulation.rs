use glam::Vec3;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::{ConstraintError, SolverError};
use crate::physics::batch_compressor::BatchCompressor;
use crate::physics::bodies::Bodies;
use crate::physics::body_description::BodyDescription;
use crate::physics::body_properties::BodyInertia;
use crate::physics::collision_detection::collidable_pair::CollidablePair;
use crate::physics::collision_detection::contact_constraint_cache::ContactConstraintCache;
use crate::physics::collision_detection::contact_manifold::{ConvexContactManifold, NonconvexContactManifold};
use crate::physics::collision_detection::narrow_phase_callbacks::{INarrowPhaseCallbacks, PairMaterialProperties};
use crate::physics::constraints::constraint_description::IConstraintDescription;
use crate::physics::default_types::DefaultTypes;
use crate::physics::handles::{BodyHandle, ConstraintHandle};
use crate::physics::pose_integrator::PoseIntegrator;
use crate::physics::solve_description::SolveDescription;
use crate::physics::solver::Solver;
use crate::utilities::thread_dispatcher::IThreadDispatcher;

/// Configuration of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub gravity: Vec3,
    /// Fraction of linear velocity removed per unit of time, in [0, 1].
    pub linear_damping: f32,
    /// Fraction of angular velocity removed per unit of time, in [0, 1].
    pub angular_damping: f32,
    pub solve: SolveDescription,
    /// Initial body capacity.
    pub initial_body_capacity: usize,
}

impl SimulationSettings {
    pub fn validate(&self) -> Result<(), ConstraintError> {
        if !self.gravity.is_finite() {
            return Err(ConstraintError::NonFinite {
                field: "simulation.gravity",
                value: self.gravity.max_element(),
            });
        }
        for (field, value) in [
            ("simulation.linear_damping", self.linear_damping),
            ("simulation.angular_damping", self.angular_damping),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConstraintError::InvalidRange {
                    field,
                    reason: format!("damping must be within [0, 1], got {value}"),
                });
            }
        }
        self.solve.validate()
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -10.0, 0.0),
            linear_damping: 0.03,
            angular_damping: 0.03,
            solve: SolveDescription::default(),
            initial_body_capacity: 128,
        }
    }
}

/// Orchestrates the bookkeeping and execution of a dynamic simulation: bodies, the constraint
/// solver, and the contact constraints generated from externally supplied manifolds.
pub struct Simulation {
    /// The collection of bodies in the simulation.
    pub bodies: Bodies,
    /// The solver used to solve constraints within the simulation.
    pub solver: Solver,
    /// Contact constraints of the pairs with manifolds.
    pub contacts: ContactConstraintCache,
    settings: SimulationSettings,
}

impl Simulation {
    /// Creates a simulation with every default constraint type registered.
    pub fn new(settings: SimulationSettings) -> Result<Self, ConstraintError> {
        settings.validate()?;
        let mut solver = Solver::new(settings.solve);
        DefaultTypes::register_defaults(&mut solver);
        debug!(
            "created simulation: {} velocity iterations, {} substeps",
            settings.solve.velocity_iteration_count, settings.solve.substep_count
        );
        Ok(Self {
            bodies: Bodies::new(settings.initial_body_capacity),
            solver,
            contacts: ContactConstraintCache::new(),
            settings,
        })
    }

    #[inline(always)]
    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: SimulationSettings) -> Result<(), ConstraintError> {
        settings.validate()?;
        self.solver.set_solve_description(settings.solve);
        self.settings = settings;
        Ok(())
    }

    pub fn add_body(&mut self, description: &BodyDescription) -> BodyHandle {
        self.bodies.add(description)
    }

    /// Removes a body along with every constraint referencing it.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<(), SolverError> {
        if !self.bodies.contains(handle) {
            return Err(SolverError::UnknownBody(handle));
        }
        self.contacts.remove_body(&mut self.solver, handle);
        let constraints = self.solver.constraints_for_body(handle).to_vec();
        for constraint in &constraints {
            self.solver.remove(*constraint);
        }
        self.bodies.remove(handle);
        trace!("removed {handle} and {} attached constraints", constraints.len());
        Ok(())
    }

    /// Changes a body's mass properties. Switching between kinematic and dynamic updates the solver batches.
    pub fn set_local_inertia(&mut self, handle: BodyHandle, inertia: BodyInertia) -> Result<(), SolverError> {
        self.solver.set_local_inertia(&mut self.bodies, handle, inertia)
    }

    pub fn add_constraint<TDescription: IConstraintDescription>(
        &mut self,
        body_handles: &[BodyHandle],
        description: &TDescription,
    ) -> Result<ConstraintHandle, SolverError> {
        self.solver.add(&self.bodies, body_handles, description)
    }

    pub fn apply_description<TDescription: IConstraintDescription>(
        &mut self,
        handle: ConstraintHandle,
        description: &TDescription,
    ) -> Result<(), SolverError> {
        self.solver.apply_description(handle, description)
    }

    pub fn remove_constraint(&mut self, handle: ConstraintHandle) {
        self.solver.remove(handle);
    }

    /// Hands a convex manifold for the pair to the simulation.
    /// Returns the pair's contact constraint, or `None` if the callbacks rejected the manifold.
    pub fn submit_convex_manifold<TCallbacks: INarrowPhaseCallbacks>(
        &mut self,
        callbacks: &TCallbacks,
        pair: CollidablePair,
        manifold: &ConvexContactManifold,
    ) -> Result<Option<ConstraintHandle>, SolverError> {
        if !callbacks.allow_contact_generation(pair.a, pair.b) {
            return Ok(None);
        }
        let mut material = PairMaterialProperties::default();
        if !callbacks.configure_contact_manifold(pair, manifold, &mut material) {
            return Ok(None);
        }
        self.contacts
            .update_convex(&mut self.solver, &self.bodies, pair, manifold, &material)
            .map(Some)
    }

    /// Hands a nonconvex manifold for the pair to the simulation.
    /// Returns the pair's contact constraint, or `None` if the callbacks rejected the manifold.
    pub fn submit_nonconvex_manifold<TCallbacks: INarrowPhaseCallbacks>(
        &mut self,
        callbacks: &TCallbacks,
        pair: CollidablePair,
        manifold: &NonconvexContactManifold,
    ) -> Result<Option<ConstraintHandle>, SolverError> {
        if !callbacks.allow_contact_generation(pair.a, pair.b) {
            return Ok(None);
        }
        let mut material = PairMaterialProperties::default();
        if !callbacks.configure_contact_manifold(pair, manifold, &mut material) {
            return Ok(None);
        }
        self.contacts
            .update_nonconvex(&mut self.solver, &self.bodies, pair, manifold, &material)
            .map(Some)
    }

    /// Performs one timestep of the given length.
    ///
    /// Contact constraints of pairs that received no manifold since the previous timestep are
    /// removed first, then constraint batches are incrementally compressed before solving.
    pub fn timestep(&mut self, dt: f32, thread_dispatcher: Option<&dyn IThreadDispatcher>) {
        assert!(dt > 0.0, "Timestep duration must be positive.");
        self.contacts.flush_stale(&mut self.solver);
        let maximum_moves = BatchCompressor::maximum_moves_for(self.solver.constraint_count());
        BatchCompressor::compress(&mut self.solver, maximum_moves);
        let pose_integrator = PoseIntegrator::new(
            self.settings.gravity,
            self.settings.linear_damping,
            self.settings.angular_damping,
        );
        self.solver.solve(&mut self.bodies, dt, &pose_integrator, thread_dispatcher);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::collision_detection::contact_manifold::{ConvexContact, IContactManifold};
    use crate::physics::collision_detection::narrow_phase_callbacks::DefaultNarrowPhaseCallbacks;
    use crate::physics::constraints::ball_socket::BallSocket;
    use crate::physics::constraints::spring_settings::SpringSettings;
    use crate::physics::handles::StaticHandle;

    struct RejectAll;

    impl INarrowPhaseCallbacks for RejectAll {
        fn configure_contact_manifold<TManifold: IContactManifold>(
            &self,
            _pair: CollidablePair,
            _manifold: &TManifold,
            _pair_material: &mut PairMaterialProperties,
        ) -> bool {
            false
        }
    }

    fn ground_manifold(depth: f32) -> ConvexContactManifold {
        let mut manifold = ConvexContactManifold::new(Vec3::ZERO, Vec3::Y);
        manifold.add(ConvexContact::new(Vec3::new(0.0, -0.5, 0.0), depth, 0));
        manifold
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let settings = SimulationSettings {
            linear_damping: 1.5,
            ..SimulationSettings::default()
        };
        assert!(matches!(
            Simulation::new(settings),
            Err(ConstraintError::InvalidRange {
                field: "simulation.linear_damping",
                ..
            })
        ));
    }

    #[test]
    fn test_remove_body_drops_attached_constraints() {
        let mut simulation = Simulation::new(SimulationSettings::default()).unwrap();
        let a = simulation.add_body(&BodyDescription::create_dynamic(Vec3::ZERO, Vec3::ZERO, BodyInertia::sphere(1.0, 0.5)));
        let b = simulation.add_body(&BodyDescription::create_dynamic(Vec3::X, Vec3::ZERO, BodyInertia::sphere(1.0, 0.5)));
        let socket = BallSocket::new(Vec3::new(0.5, 0.0, 0.0), Vec3::new(-0.5, 0.0, 0.0), SpringSettings::default());
        simulation.add_constraint(&[a, b], &socket).unwrap();
        simulation
            .submit_convex_manifold(&DefaultNarrowPhaseCallbacks::default(), CollidablePair::new(a, StaticHandle(0)), &ground_manifold(0.01))
            .unwrap();
        assert_eq!(simulation.solver.constraint_count(), 2);

        simulation.remove_body(a).unwrap();
        assert_eq!(simulation.solver.constraint_count(), 0);
        assert!(simulation.contacts.is_empty());
        assert!(simulation.solver.constraints_for_body(b).is_empty());
        assert_eq!(simulation.remove_body(a), Err(SolverError::UnknownBody(a)));
    }

    #[test]
    fn test_rejected_manifolds_create_nothing_and_stale_contacts_expire() {
        let mut simulation = Simulation::new(SimulationSettings::default()).unwrap();
        let body = simulation.add_body(&BodyDescription::create_dynamic(Vec3::ZERO, Vec3::ZERO, BodyInertia::sphere(1.0, 0.5)));
        let pair = CollidablePair::new(body, StaticHandle(0));
        assert_eq!(simulation.submit_convex_manifold(&RejectAll, pair, &ground_manifold(0.01)), Ok(None));
        assert_eq!(simulation.solver.constraint_count(), 0);

        simulation
            .submit_convex_manifold(&DefaultNarrowPhaseCallbacks::default(), pair, &ground_manifold(0.01))
            .unwrap();
        simulation.timestep(1.0 / 60.0, None);
        assert_eq!(simulation.solver.constraint_count(), 1);
        // No manifold arrived for the pair during the last step.
        simulation.timestep(1.0 / 60.0, None);
        assert_eq!(simulation.solver.constraint_count(), 0);
    }

    #[test]
    fn test_falling_body_accelerates_under_gravity() {
        let settings = SimulationSettings {
            linear_damping: 0.0,
            angular_damping: 0.0,
            ..SimulationSettings::default()
        };
        let mut simulation = Simulation::new(settings).unwrap();
        let body = simulation.add_body(&BodyDescription::create_dynamic(Vec3::ZERO, Vec3::ZERO, BodyInertia::sphere(1.0, 0.5)));
        for _ in 0..10 {
            simulation.timestep(0.1, None);
        }
        let velocity = simulation.bodies.velocity(body).linear;
        assert!((velocity.y + 10.0).abs() < 1e-4);
    }
}
