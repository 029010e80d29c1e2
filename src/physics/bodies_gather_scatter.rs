use std::marker::PhantomData;

use crate::physics::bodies::Bodies;
use crate::physics::body_properties::{
    BodyInertia, BodyInertiaWide, BodyVelocity, BodyVelocityWide, RigidPose,
};
use crate::utilities::quaternion_wide::QuaternionWide;
use crate::utilities::vector::{Vector, LANES};
use crate::utilities::vector3_wide::Vector3Wide;

/// Gathered state of one body slot across a bundle of constraints.
#[derive(Clone, Copy, Debug, Default)]
pub struct GatheredBodies {
    pub positions: Vector3Wide,
    pub orientations: QuaternionWide,
    pub inertias: BodyInertiaWide,
    pub velocities: BodyVelocityWide,
}

/// View of body storage handed to the solver for the duration of a step.
///
/// Poses and inertias are shared reads. Velocities are read and written through a raw pointer
/// so that workers solving different constraints of the same solver batch can write concurrently;
/// the batch's body exclusivity makes those writes disjoint.
pub struct SolverBodies<'a> {
    handle_to_index: &'a [i32],
    poses: &'a [RigidPose],
    inertias: &'a [BodyInertia],
    velocities: *mut BodyVelocity,
    body_count: usize,
    _velocities: PhantomData<&'a mut [BodyVelocity]>,
}

// Velocity writes are partitioned by the solver batch invariant; see scatter_velocities.
unsafe impl Send for SolverBodies<'_> {}
unsafe impl Sync for SolverBodies<'_> {}

impl Bodies {
    /// Creates the solver's view of the bodies. World inertias must already be current.
    pub fn solver_access(&mut self) -> SolverBodies<'_> {
        SolverBodies {
            handle_to_index: &self.handle_to_index,
            poses: &self.poses,
            inertias: &self.world_inertias,
            body_count: self.velocities.len(),
            velocities: self.velocities.as_mut_ptr(),
            _velocities: PhantomData,
        }
    }
}

impl<'a> SolverBodies<'a> {
    /// Resolves an encoded body handle to its memory index. Negative handles mark empty lanes.
    #[inline(always)]
    fn resolve(&self, handle: i32) -> Option<usize> {
        if handle < 0 {
            return None;
        }
        let index = self.handle_to_index[handle as usize];
        debug_assert!(index >= 0, "Constraint references a removed body.");
        Some(index as usize)
    }

    /// Gathers pose, inertia and velocity for the body handles in `references`.
    /// Lanes holding a negative handle are left zeroed, so impulses applied to them vanish.
    #[inline(always)]
    pub fn gather_state(&self, references: &Vector<i32>) -> GatheredBodies {
        let mut gathered = GatheredBodies::default();
        for lane in 0..LANES {
            let Some(index) = self.resolve(references[lane]) else {
                continue;
            };
            debug_assert!(index < self.body_count);
            let pose = &self.poses[index];
            let inertia = &self.inertias[index];
            // SAFETY: index is in bounds, and no other worker writes this body during the current
            // solver batch.
            let velocity = unsafe { *self.velocities.add(index) };
            gathered.positions.write_slot(pose.position, lane);
            gathered.orientations.write_slot(pose.orientation, lane);
            gathered
                .inertias
                .inverse_inertia_tensor
                .write_slot(&inertia.inverse_inertia_tensor, lane);
            gathered.inertias.inverse_mass[lane] = inertia.inverse_mass;
            gathered.velocities.linear.write_slot(velocity.linear, lane);
            gathered.velocities.angular.write_slot(velocity.angular, lane);
        }
        gathered
    }

    /// Writes velocities back for the body handles in `references`, skipping empty lanes.
    ///
    /// Kinematic bodies are skipped too. Constraints cannot change their velocity, and they may
    /// appear in many constraints of one solver batch.
    ///
    /// # Safety
    /// No other thread may concurrently access the velocities of the referenced bodies. The
    /// solver upholds this by only running constraints of one solver batch at a time.
    #[inline(always)]
    pub unsafe fn scatter_velocities(&self, velocities: &BodyVelocityWide, references: &Vector<i32>) {
        for lane in 0..LANES {
            let Some(index) = self.resolve(references[lane]) else {
                continue;
            };
            debug_assert!(index < self.body_count);
            if self.inertias[index].is_kinematic() {
                continue;
            }
            *self.velocities.add(index) = BodyVelocity {
                linear: velocities.linear.read_slot(lane),
                angular: velocities.angular.read_slot(lane),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_description::BodyDescription;
    use glam::Vec3;

    #[test]
    fn test_gather_and_scatter_skip_empty_lanes() {
        let mut bodies = Bodies::new(2);
        let a = bodies.add(&BodyDescription::create_dynamic(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::X,
            BodyInertia::sphere(2.0, 1.0),
        ));
        let mut references = Vector::<i32>::splat(-1);
        references[2] = a.0;
        let access = bodies.solver_access();
        let mut gathered = access.gather_state(&references);
        assert_eq!(gathered.positions.read_slot(2), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(gathered.inertias.inverse_mass[2], 0.5);
        assert_eq!(gathered.inertias.inverse_mass[0], 0.0);
        gathered.velocities.linear.write_slot(Vec3::Y, 2);
        unsafe { access.scatter_velocities(&gathered.velocities, &references) };
        assert_eq!(bodies.velocity(a).linear, Vec3::Y);
    }
}
