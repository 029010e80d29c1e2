use glam::Vec3;
use rust_bepusolver::physics::constraints::center_distance_constraint::CenterDistanceConstraint;
use rust_bepusolver::physics::constraints::spring_settings::SpringSettings;
use rust_bepusolver::physics::default_types::DefaultTypes;
use rust_bepusolver::physics::pose_integrator::PoseIntegrator;
use rust_bepusolver::{
    BodyDescription, BodyHandle, BodyInertia, BodyVelocity, Bodies, ConstraintHandle, SolveDescription, Solver,
};

const PAIR_COUNT: usize = 20;
const DT: f32 = 1.0 / 60.0;

struct Scene {
    bodies: Bodies,
    solver: Solver,
    pairs: Vec<[BodyHandle; 2]>,
    spare: [BodyHandle; 2],
}

/// Disjoint pairs all land in the first solver batch, spread over several bundles.
fn scene() -> Scene {
    let mut bodies = Bodies::new(2 * PAIR_COUNT + 2);
    let mut add = |position: Vec3, velocity: Vec3| {
        bodies.add(&BodyDescription::create_dynamic(position, velocity, BodyInertia::sphere(1.0, 0.5)))
    };
    let pairs: Vec<[BodyHandle; 2]> = (0..PAIR_COUNT)
        .map(|i| {
            let base = Vec3::new(0.0, 0.0, i as f32 * 5.0);
            let separation = 1.0 + i as f32 * 0.1;
            [
                add(base, Vec3::new(0.0, i as f32 * 0.05, 0.0)),
                add(base + Vec3::new(separation, 0.0, 0.0), Vec3::new(-0.5, 0.0, 0.0)),
            ]
        })
        .collect();
    let spare = [add(Vec3::new(0.0, 50.0, 0.0), Vec3::ZERO), add(Vec3::new(1.0, 50.0, 0.0), Vec3::ZERO)];
    let mut solver = Solver::new(SolveDescription::new(4, 2));
    DefaultTypes::register_defaults(&mut solver);
    Scene {
        bodies,
        solver,
        pairs,
        spare,
    }
}

fn description(pair_index: usize) -> CenterDistanceConstraint {
    CenterDistanceConstraint::new(1.5, SpringSettings::new(10.0 + pair_index as f32, 1.0))
}

fn step(scene: &mut Scene) {
    let integrator = PoseIntegrator::new(Vec3::new(0.0, -10.0, 0.0), 0.0, 0.0);
    scene.solver.solve(&mut scene.bodies, DT, &integrator, None);
}

fn assert_same_state(expected: &Scene, expected_handles: &[ConstraintHandle], actual: &Scene, actual_handles: &[ConstraintHandle]) {
    for (i, pair) in expected.pairs.iter().enumerate() {
        assert_eq!(
            expected.solver.get_accumulated_impulses(expected_handles[i]),
            actual.solver.get_accumulated_impulses(actual_handles[i]),
            "pair {i}"
        );
        for &body in pair {
            let expected_velocity: &BodyVelocity = expected.bodies.velocity(body);
            assert_eq!(expected_velocity, actual.bodies.velocity(body), "pair {i}");
        }
    }
}

#[test]
fn test_removing_unrelated_lane_does_not_disturb_others() {
    let mut reference = scene();
    let reference_handles: Vec<ConstraintHandle> = (0..PAIR_COUNT)
        .map(|i| reference.solver.add(&reference.bodies, &reference.pairs[i], &description(i)).unwrap())
        .collect();

    let mut compacted = scene();
    let mut compacted_handles = Vec::new();
    let mut extra = None;
    for i in 0..PAIR_COUNT {
        if i == 5 {
            let spare = compacted.spare;
            extra = Some(compacted.solver.add(&compacted.bodies, &spare, &description(99)).unwrap());
        }
        compacted_handles.push(compacted.solver.add(&compacted.bodies, &compacted.pairs[i], &description(i)).unwrap());
    }
    for _ in 0..3 {
        step(&mut reference);
        step(&mut compacted);
    }
    // Removal swaps the last lane of the type batch into the freed slot.
    compacted.solver.remove(extra.unwrap());
    for _ in 0..3 {
        step(&mut reference);
        step(&mut compacted);
    }
    assert_same_state(&reference, &reference_handles, &compacted, &compacted_handles);
}

#[test]
fn test_readding_with_saved_impulses_reproduces_trajectory() {
    let mut reference = scene();
    let reference_handles: Vec<ConstraintHandle> = (0..PAIR_COUNT)
        .map(|i| reference.solver.add(&reference.bodies, &reference.pairs[i], &description(i)).unwrap())
        .collect();
    let mut readded = scene();
    let mut readded_handles: Vec<ConstraintHandle> = (0..PAIR_COUNT)
        .map(|i| readded.solver.add(&readded.bodies, &readded.pairs[i], &description(i)).unwrap())
        .collect();
    for _ in 0..4 {
        step(&mut reference);
        step(&mut readded);
    }

    for &i in &[3, 11, 0] {
        let impulses = readded.solver.get_accumulated_impulses(readded_handles[i]);
        readded.solver.remove(readded_handles[i]);
        let handle = readded.solver.add(&readded.bodies, &readded.pairs[i], &description(i)).unwrap();
        readded.solver.set_accumulated_impulses(handle, &impulses);
        readded_handles[i] = handle;
    }
    assert_eq!(readded.solver.constraint_count(), PAIR_COUNT);
    assert_eq!(readded.solver.batch_count(), 1);

    for _ in 0..4 {
        step(&mut reference);
        step(&mut readded);
    }
    assert_same_state(&reference, &reference_handles, &readded, &readded_handles);
}
