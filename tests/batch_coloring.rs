use std::collections::HashSet;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_bepusolver::physics::batch_compressor::BatchCompressor;
use rust_bepusolver::physics::constraints::ball_socket::BallSocket;
use rust_bepusolver::physics::constraints::center_distance_constraint::CenterDistanceConstraint;
use rust_bepusolver::physics::constraints::one_body_linear_servo::OneBodyLinearServo;
use rust_bepusolver::physics::constraints::servo_settings::ServoSettings;
use rust_bepusolver::physics::constraints::spring_settings::SpringSettings;
use rust_bepusolver::physics::default_types::DefaultTypes;
use rust_bepusolver::{BodyDescription, BodyHandle, BodyInertia, Bodies, ConstraintHandle, SolveDescription, Solver};

/// Checks that no dynamic body is referenced twice within a solver batch and that the batch
/// bookkeeping agrees with the stored constraints.
fn assert_coloring(solver: &Solver, bodies: &Bodies, live: &HashSet<ConstraintHandle>) {
    let mut seen_constraints = 0;
    for (batch_index, batch) in solver.batches().iter().enumerate() {
        let mut referenced = HashSet::new();
        for type_batch in batch.type_batches() {
            for &constraint in type_batch.index_to_handle() {
                assert!(live.contains(&constraint), "{constraint} should have been removed");
                assert_eq!(solver.location(constraint).batch_index as usize, batch_index);
                seen_constraints += 1;
                for body in solver.get_body_handles(constraint) {
                    if bodies.local_inertia(body).is_kinematic() {
                        continue;
                    }
                    assert!(
                        referenced.insert(body),
                        "{body} appears twice in batch {batch_index}"
                    );
                    assert!(solver.batch_referenced_handles(batch_index).contains(body.0 as usize));
                }
            }
        }
        assert_eq!(solver.batch_referenced_handles(batch_index).count(), referenced.len());
    }
    assert_eq!(seen_constraints, live.len());
    assert_eq!(solver.constraint_count(), live.len());
}

fn random_pair(rng: &mut StdRng, handles: &[BodyHandle]) -> [BodyHandle; 2] {
    let a = rng.gen_range(0..handles.len());
    let mut b = rng.gen_range(0..handles.len() - 1);
    if b >= a {
        b += 1;
    }
    [handles[a], handles[b]]
}

#[test]
fn test_random_constraint_graphs_keep_batches_body_disjoint() {
    for seed in 0..4 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut bodies = Bodies::new(48);
        let handles: Vec<BodyHandle> = (0..48)
            .map(|i| {
                let position = Vec3::new(i as f32, 0.0, 0.0);
                if i % 8 == 0 {
                    bodies.add(&BodyDescription::create_kinematic(position, Vec3::ZERO))
                } else {
                    bodies.add(&BodyDescription::create_dynamic(position, Vec3::ZERO, BodyInertia::sphere(1.0, 0.5)))
                }
            })
            .collect();
        let mut solver = Solver::new(SolveDescription::default());
        DefaultTypes::register_defaults(&mut solver);
        let spring = SpringSettings::new(30.0, 1.0);
        let mut live = HashSet::new();
        let mut order = Vec::new();

        for step in 0..400 {
            if !order.is_empty() && rng.gen_bool(0.3) {
                let constraint = order.swap_remove(rng.gen_range(0..order.len()));
                live.remove(&constraint);
                solver.remove(constraint);
            } else {
                let constraint = match rng.gen_range(0..3) {
                    0 => solver.add(
                        &bodies,
                        &random_pair(&mut rng, &handles),
                        &BallSocket::new(Vec3::X * 0.5, -Vec3::X * 0.5, spring),
                    ),
                    1 => solver.add(
                        &bodies,
                        &random_pair(&mut rng, &handles),
                        &CenterDistanceConstraint::new(1.0, spring),
                    ),
                    _ => solver.add(
                        &bodies,
                        &[handles[rng.gen_range(0..handles.len())]],
                        &OneBodyLinearServo::new(Vec3::ZERO, Vec3::ZERO, spring, ServoSettings::default()),
                    ),
                }
                .unwrap();
                assert!(live.insert(constraint));
                order.push(constraint);
            }
            if step % 50 == 49 {
                BatchCompressor::compress(&mut solver, 16);
            }
            assert_coloring(&solver, &bodies, &live);
        }
    }
}

#[test]
fn test_full_compression_never_increases_batch_count() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut bodies = Bodies::new(32);
    let handles: Vec<BodyHandle> = (0..32)
        .map(|i| {
            bodies.add(&BodyDescription::create_dynamic(
                Vec3::new(i as f32, 0.0, 0.0),
                Vec3::ZERO,
                BodyInertia::sphere(1.0, 0.5),
            ))
        })
        .collect();
    let mut solver = Solver::new(SolveDescription::default());
    DefaultTypes::register_defaults(&mut solver);
    let description = CenterDistanceConstraint::new(1.0, SpringSettings::new(30.0, 1.0));
    let mut constraints: Vec<ConstraintHandle> = (0..200)
        .map(|_| solver.add(&bodies, &random_pair(&mut rng, &handles), &description).unwrap())
        .collect();
    for _ in 0..120 {
        let constraint = constraints.swap_remove(rng.gen_range(0..constraints.len()));
        solver.remove(constraint);
    }
    let before = solver.batch_count();
    while BatchCompressor::compress(&mut solver, 8) > 0 {}
    assert!(solver.batch_count() <= before);
    let live: HashSet<ConstraintHandle> = constraints.iter().copied().collect();
    assert_coloring(&solver, &bodies, &live);
}

#[test]
fn test_kinematic_transitions_keep_batches_body_disjoint() {
    for seed in 10..14 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut bodies = Bodies::new(40);
        let handles: Vec<BodyHandle> = (0..40)
            .map(|i| {
                let position = Vec3::new(i as f32, 0.0, 0.0);
                if i % 5 == 0 {
                    bodies.add(&BodyDescription::create_kinematic(position, Vec3::ZERO))
                } else {
                    bodies.add(&BodyDescription::create_dynamic(position, Vec3::ZERO, BodyInertia::sphere(1.0, 0.5)))
                }
            })
            .collect();
        let mut solver = Solver::new(SolveDescription::default());
        DefaultTypes::register_defaults(&mut solver);
        let description = CenterDistanceConstraint::new(1.0, SpringSettings::new(30.0, 1.0));
        let mut live = HashSet::new();
        let mut order = Vec::new();

        for step in 0..500 {
            let roll: f64 = rng.gen();
            if roll < 0.15 {
                let body = handles[rng.gen_range(0..handles.len())];
                let inertia = if bodies.local_inertia(body).is_kinematic() {
                    BodyInertia::sphere(1.0, 0.5)
                } else {
                    BodyInertia::KINEMATIC
                };
                solver.set_local_inertia(&mut bodies, body, inertia).unwrap();
            } else if roll < 0.35 && !order.is_empty() {
                let constraint = order.swap_remove(rng.gen_range(0..order.len()));
                live.remove(&constraint);
                solver.remove(constraint);
            } else {
                let constraint = solver.add(&bodies, &random_pair(&mut rng, &handles), &description).unwrap();
                assert!(live.insert(constraint));
                order.push(constraint);
            }
            if step % 40 == 39 {
                BatchCompressor::compress(&mut solver, 16);
            }
            assert_coloring(&solver, &bodies, &live);
        }
    }
}
