//! Constraint solving core of a rigid body simulator.
//!
//! Constraints are grouped into solver batches in which no dynamic body appears twice, stored per
//! type in bundles of [`utilities::vector::LANES`] constraints, and solved with warm started,
//! substepped sequential impulses. Contact constraints are created from externally supplied
//! manifolds and keep their accumulated impulses across steps by feature id.

pub mod error;
pub mod physics;
pub mod utilities;

pub use error::{ConstraintError, ContactError, SolverError};
pub use physics::bodies::Bodies;
pub use physics::body_description::BodyDescription;
pub use physics::body_properties::{BodyInertia, BodyVelocity, RigidPose};
pub use physics::handles::{BodyHandle, ConstraintHandle, StaticHandle};
pub use physics::simulation::{Simulation, SimulationSettings};
pub use physics::solve_description::SolveDescription;
pub use physics::solver::Solver;
