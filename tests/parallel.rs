#![cfg(feature = "parallel")]

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_bepusolver::physics::collision_detection::collidable_pair::CollidablePair;
use rust_bepusolver::physics::collision_detection::contact_manifold::{ConvexContact, ConvexContactManifold};
use rust_bepusolver::physics::collision_detection::narrow_phase_callbacks::DefaultNarrowPhaseCallbacks;
use rust_bepusolver::physics::constraints::angular_motor::AngularMotor;
use rust_bepusolver::physics::constraints::ball_socket::BallSocket;
use rust_bepusolver::physics::constraints::distance_servo::DistanceServo;
use rust_bepusolver::physics::constraints::motor_settings::MotorSettings;
use rust_bepusolver::physics::constraints::servo_settings::ServoSettings;
use rust_bepusolver::physics::constraints::spring_settings::SpringSettings;
use rust_bepusolver::utilities::thread_dispatcher::{IThreadDispatcher, ThreadDispatcher};
use rust_bepusolver::{BodyDescription, BodyHandle, BodyInertia, Simulation, SimulationSettings, StaticHandle};

const DT: f32 = 1.0 / 60.0;

/// Chains of mixed joints hanging from kinematic anchors, each link also touching the ground.
fn build(seed: u64) -> (Simulation, Vec<BodyHandle>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut simulation = Simulation::new(SimulationSettings {
        solve: rust_bepusolver::SolveDescription::new(6, 2),
        ..SimulationSettings::default()
    })
    .unwrap();
    let spring = SpringSettings::new(30.0, 1.0);
    let mut dynamic = Vec::new();
    for chain in 0..24 {
        let z = chain as f32 * 3.0;
        let mut previous = simulation.add_body(&BodyDescription::create_kinematic(Vec3::new(0.0, 5.0, z), Vec3::ZERO));
        for link in 1..12 {
            let velocity = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
            let body = simulation.add_body(&BodyDescription::create_dynamic(
                Vec3::new(link as f32, 5.0, z),
                velocity,
                BodyInertia::sphere(1.0, 0.4),
            ));
            let pair = [previous, body];
            match link % 3 {
                0 => simulation
                    .add_constraint(&pair, &BallSocket::new(Vec3::X * 0.5, -Vec3::X * 0.5, spring))
                    .unwrap(),
                1 => simulation
                    .add_constraint(
                        &pair,
                        &DistanceServo::new(Vec3::ZERO, Vec3::ZERO, 1.0, spring, ServoSettings::default()),
                    )
                    .unwrap(),
                _ => simulation
                    .add_constraint(&pair, &AngularMotor::new(Vec3::Y, MotorSettings::new(50.0, 0.01)))
                    .unwrap(),
            };
            previous = body;
            dynamic.push(body);
        }
    }
    (simulation, dynamic)
}

fn run(simulation: &mut Simulation, dynamic: &[BodyHandle], dispatcher: Option<&dyn IThreadDispatcher>) {
    let callbacks = DefaultNarrowPhaseCallbacks::default();
    for _ in 0..20 {
        for &body in dynamic {
            let position = simulation.bodies.pose(body).position;
            if position.y < 4.9 {
                let mut manifold = ConvexContactManifold::new(-position, Vec3::Y);
                manifold.add(ConvexContact::new(Vec3::new(0.0, -0.4, 0.0), 4.9 - position.y, 0));
                simulation
                    .submit_convex_manifold(&callbacks, CollidablePair::new(body, StaticHandle(0)), &manifold)
                    .unwrap();
            }
        }
        simulation.timestep(DT, dispatcher);
    }
}

#[test]
fn test_parallel_solve_matches_sequential_solve() {
    let (mut sequential, dynamic) = build(3);
    let (mut parallel, _) = build(3);
    assert!(sequential.solver.batch_count() > 1);
    let dispatcher = ThreadDispatcher::new(4).unwrap();

    run(&mut sequential, &dynamic, None);
    run(&mut parallel, &dynamic, Some(&dispatcher));

    for &body in &dynamic {
        assert_eq!(sequential.bodies.pose(body), parallel.bodies.pose(body), "{body}");
        assert_eq!(sequential.bodies.velocity(body), parallel.bodies.velocity(body), "{body}");
    }
}
