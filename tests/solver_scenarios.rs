use approx::assert_relative_eq;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_bepusolver::physics::constraints::ball_socket::BallSocket;
use rust_bepusolver::physics::constraints::center_distance_constraint::CenterDistanceConstraint;
use rust_bepusolver::physics::constraints::center_distance_limit::CenterDistanceLimit;
use rust_bepusolver::physics::constraints::contact::{ConstraintContactData, Contact1OneBody};
use rust_bepusolver::physics::constraints::distance_limit::DistanceLimit;
use rust_bepusolver::physics::constraints::one_body_linear_servo::OneBodyLinearServo;
use rust_bepusolver::physics::constraints::servo_settings::ServoSettings;
use rust_bepusolver::physics::constraints::spring_settings::SpringSettings;
use rust_bepusolver::physics::default_types::DefaultTypes;
use rust_bepusolver::physics::pose_integrator::PoseIntegrator;
use rust_bepusolver::{BodyDescription, BodyHandle, BodyInertia, BodyVelocity, Bodies, SolveDescription, Solver};

const DT: f32 = 1.0 / 60.0;

fn solver() -> Solver {
    let mut solver = Solver::new(SolveDescription::new(8, 1));
    DefaultTypes::register_defaults(&mut solver);
    solver
}

fn dynamic(bodies: &mut Bodies, position: Vec3) -> BodyHandle {
    bodies.add(&BodyDescription::create_dynamic(position, Vec3::ZERO, BodyInertia::sphere(1.0, 0.5)))
}

#[test]
fn test_stiff_center_distance_closes_gap_then_stops() {
    let mut bodies = Bodies::new(2);
    let a = dynamic(&mut bodies, Vec3::ZERO);
    let b = dynamic(&mut bodies, Vec3::new(3.0, 0.0, 0.0));
    let mut solver = solver();
    let handle = solver
        .add(&bodies, &[a, b], &CenterDistanceConstraint::new(2.0, SpringSettings::new(1e4, 1.0)))
        .unwrap();
    let integrator = PoseIntegrator::default();

    solver.solve(&mut bodies, DT, &integrator, None);
    // Pulling together is a positive impulse.
    assert!(solver.get_accumulated_impulses(handle)[0] > 0.0);
    let distance = bodies.pose(b).position.distance(bodies.pose(a).position);
    assert_relative_eq!(distance, 2.0, epsilon = 0.01);

    solver.solve(&mut bodies, DT, &integrator, None);
    let relative = bodies.velocity(b).linear.x - bodies.velocity(a).linear.x;
    assert!(relative.abs() < 0.5, "relative velocity {relative}");
}

#[test]
fn test_servo_speed_stays_below_maximum_despite_large_error() {
    let mut bodies = Bodies::new(1);
    let body = dynamic(&mut bodies, Vec3::ZERO);
    let mut solver = solver();
    let servo = OneBodyLinearServo::new(
        Vec3::ZERO,
        Vec3::new(10.0, 0.0, 0.0),
        SpringSettings::new(30.0, 1.0),
        ServoSettings::new(1.0, 0.0, 1000.0),
    );
    solver.add(&bodies, &[body], &servo).unwrap();
    bodies.update_world_inertias();
    solver.solve_velocities(&mut bodies, DT, None);
    let velocity = bodies.velocity(body).linear;
    // The unclamped bias would be error / dt = 600.
    assert!(velocity.length() <= 1.0 + 1e-4, "speed {}", velocity.length());
    assert!(velocity.x > 0.5);
}

#[test]
fn test_friction_without_normal_impulse_leaves_sliding_body_alone() {
    let mut bodies = Bodies::new(1);
    let body = dynamic(&mut bodies, Vec3::new(0.0, 1.0, 0.0));
    bodies.set_velocity(body, BodyVelocity::from_linear(Vec3::new(5.0, 0.0, -3.0)));
    let mut solver = solver();
    // Separated by half a unit; nothing approaches, so the contact carries no load.
    let contact = Contact1OneBody {
        contacts: [ConstraintContactData {
            offset_a: Vec3::new(0.0, -0.5, 0.0),
            penetration_depth: -0.5,
        }],
        normal: Vec3::Y,
        friction_coefficient: 1.0,
        spring_settings: SpringSettings::new(30.0, 1.0),
        maximum_recovery_velocity: 2.0,
    };
    let handle = solver.add(&bodies, &[body], &contact).unwrap();
    bodies.update_world_inertias();
    solver.solve_velocities(&mut bodies, DT, None);
    assert_eq!(solver.get_accumulated_impulses(handle), vec![0.0; 4]);
    assert_eq!(bodies.velocity(body).linear, Vec3::new(5.0, 0.0, -3.0));
}

#[test]
fn test_hanging_body_reaches_steady_impulse() {
    let mut bodies = Bodies::new(2);
    let anchor = bodies.add(&BodyDescription::create_kinematic(Vec3::ZERO, Vec3::ZERO));
    let body = dynamic(&mut bodies, Vec3::new(0.0, -1.0, 0.0));
    let mut solver = solver();
    let socket = BallSocket::new(Vec3::new(0.0, -0.5, 0.0), Vec3::new(0.0, 0.5, 0.0), SpringSettings::new(30.0, 1.0));
    let handle = solver.add(&bodies, &[anchor, body], &socket).unwrap();
    let integrator = PoseIntegrator::new(Vec3::new(0.0, -10.0, 0.0), 0.0, 0.0);

    let mut previous = Vec::new();
    for _ in 0..240 {
        previous = solver.get_accumulated_impulses(handle);
        solver.solve(&mut bodies, DT, &integrator, None);
    }
    let current = solver.get_accumulated_impulses(handle);
    for (previous, current) in previous.iter().zip(&current) {
        assert_relative_eq!(previous, current, epsilon = 1e-4);
    }
    // The joint carries the weight of the body each step.
    assert_relative_eq!(current[1].abs(), 10.0 * DT, epsilon = 1e-3);
    assert!(bodies.velocity(body).linear.length() < 1e-3);
}

#[test]
fn test_one_sided_limits_never_pull_past_their_bounds() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut bodies = Bodies::new(64);
    let mut solver = solver();
    let mut limits = Vec::new();
    for i in 0..16 {
        let base = Vec3::new(i as f32 * 10.0, 0.0, 0.0);
        let separation = rng.gen_range(0.2..4.0);
        let a = dynamic(&mut bodies, base);
        let b = dynamic(&mut bodies, base + Vec3::new(separation, 0.0, 0.0));
        for handle in [a, b] {
            let velocity = Vec3::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0));
            bodies.set_velocity(handle, BodyVelocity::from_linear(velocity));
        }
        let spring = SpringSettings::new(30.0, 1.0);
        let limit = if i % 2 == 0 {
            solver.add(&bodies, &[a, b], &CenterDistanceLimit::new(1.0, 2.0, spring))
        } else {
            solver.add(&bodies, &[a, b], &DistanceLimit::new(Vec3::ZERO, Vec3::ZERO, 1.0, 2.0, spring))
        };
        limits.push(limit.unwrap());
    }
    let integrator = PoseIntegrator::default();
    for _ in 0..30 {
        solver.solve(&mut bodies, DT, &integrator, None);
        for &limit in &limits {
            let impulse = solver.get_accumulated_impulses(limit)[0];
            assert!(impulse >= 0.0, "limit {limit} accumulated {impulse}");
        }
    }
}
