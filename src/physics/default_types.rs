use crate::physics::solver::Solver;

use crate::physics::constraints::angular_motor::AngularMotor;
use crate::physics::constraints::ball_socket::BallSocket;
use crate::physics::constraints::center_distance_constraint::CenterDistanceConstraint;
use crate::physics::constraints::center_distance_limit::CenterDistanceLimit;
use crate::physics::constraints::contact::{
    Contact1, Contact1OneBody, Contact2, Contact2Nonconvex, Contact2NonconvexOneBody, Contact2OneBody, Contact3,
    Contact3Nonconvex, Contact3NonconvexOneBody, Contact3OneBody, Contact4, Contact4Nonconvex,
    Contact4NonconvexOneBody, Contact4OneBody,
};
use crate::physics::constraints::distance_limit::DistanceLimit;
use crate::physics::constraints::distance_servo::DistanceServo;
use crate::physics::constraints::one_body_linear_servo::OneBodyLinearServo;

/// Helper to register the default types within a solver.
pub struct DefaultTypes;

impl DefaultTypes {
    /// Registers the set of constraints that are packaged in the engine.
    pub fn register_defaults(solver: &mut Solver) {
        solver.register::<BallSocket>();
        solver.register::<DistanceLimit>();
        solver.register::<DistanceServo>();
        solver.register::<CenterDistanceConstraint>();
        solver.register::<CenterDistanceLimit>();
        solver.register::<AngularMotor>();
        solver.register::<OneBodyLinearServo>();

        // Contact constraint types.
        solver.register::<Contact1OneBody>();
        solver.register::<Contact2OneBody>();
        solver.register::<Contact3OneBody>();
        solver.register::<Contact4OneBody>();
        solver.register::<Contact1>();
        solver.register::<Contact2>();
        solver.register::<Contact3>();
        solver.register::<Contact4>();
        solver.register::<Contact2NonconvexOneBody>();
        solver.register::<Contact3NonconvexOneBody>();
        solver.register::<Contact4NonconvexOneBody>();
        solver.register::<Contact2Nonconvex>();
        solver.register::<Contact3Nonconvex>();
        solver.register::<Contact4Nonconvex>();
    }
}
