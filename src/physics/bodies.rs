use glam::Vec3;

use crate::physics::body_description::BodyDescription;
use crate::physics::body_properties::{BodyInertia, BodyVelocity, RigidPose};
use crate::physics::handles::BodyHandle;
use crate::utilities::memory::id_pool::IdPool;
use crate::utilities::symmetric3x3::Symmetric3x3;

/// Collection of all allocated bodies.
///
/// Bodies are stored densely; removing a body moves the last body into its slot. Handles stay
/// stable across those moves through `handle_to_index`.
#[derive(Debug, Default)]
pub struct Bodies {
    /// Remaps a body handle integer value to the actual array index of the body, -1 if unused.
    pub(crate) handle_to_index: Vec<i32>,
    /// Pool from which handles are pulled for new bodies.
    handle_pool: IdPool,
    pub(crate) index_to_handle: Vec<BodyHandle>,
    pub(crate) poses: Vec<RigidPose>,
    pub(crate) velocities: Vec<BodyVelocity>,
    pub(crate) local_inertias: Vec<BodyInertia>,
    /// Inverse inertias rotated into world space by `update_world_inertias`.
    pub(crate) world_inertias: Vec<BodyInertia>,
}

impl Bodies {
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            handle_to_index: Vec::with_capacity(initial_capacity),
            handle_pool: IdPool::new(initial_capacity),
            index_to_handle: Vec::with_capacity(initial_capacity),
            poses: Vec::with_capacity(initial_capacity),
            velocities: Vec::with_capacity(initial_capacity),
            local_inertias: Vec::with_capacity(initial_capacity),
            world_inertias: Vec::with_capacity(initial_capacity),
        }
    }

    /// Gets the number of bodies.
    #[inline(always)]
    pub fn count(&self) -> usize {
        self.index_to_handle.len()
    }

    /// Adds a body and returns its handle.
    pub fn add(&mut self, description: &BodyDescription) -> BodyHandle {
        let handle = BodyHandle(self.handle_pool.take() as i32);
        let index = self.index_to_handle.len();
        let slot = handle.0 as usize;
        if slot >= self.handle_to_index.len() {
            self.handle_to_index.resize(slot + 1, -1);
        }
        self.handle_to_index[slot] = index as i32;
        self.index_to_handle.push(handle);
        self.poses.push(description.pose);
        self.velocities.push(description.velocity);
        self.local_inertias.push(description.local_inertia);
        self.world_inertias.push(Self::compute_world_inertia(
            &description.pose,
            &description.local_inertia,
        ));
        handle
    }

    /// Removes a body. The last body in memory is moved into the freed slot.
    ///
    /// Constraints referencing the body are not touched; `Simulation::remove_body` removes them first.
    pub fn remove(&mut self, handle: BodyHandle) {
        let index = self.index_of(handle);
        self.index_to_handle.swap_remove(index);
        self.poses.swap_remove(index);
        self.velocities.swap_remove(index);
        self.local_inertias.swap_remove(index);
        self.world_inertias.swap_remove(index);
        if index < self.index_to_handle.len() {
            let moved_handle = self.index_to_handle[index];
            self.handle_to_index[moved_handle.0 as usize] = index as i32;
        }
        self.handle_to_index[handle.0 as usize] = -1;
        self.handle_pool.return_id(handle.0 as usize);
    }

    /// Checks whether the handle refers to a live body.
    #[inline(always)]
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.get_index(handle).is_some()
    }

    /// Gets the memory index of a body.
    #[inline(always)]
    pub fn get_index(&self, handle: BodyHandle) -> Option<usize> {
        if handle.0 < 0 {
            return None;
        }
        match self.handle_to_index.get(handle.0 as usize) {
            Some(&index) if index >= 0 => Some(index as usize),
            _ => None,
        }
    }

    #[inline(always)]
    fn index_of(&self, handle: BodyHandle) -> usize {
        match self.get_index(handle) {
            Some(index) => index,
            None => panic!("{handle} does not refer to a live body."),
        }
    }

    /// Gets the handles of every live body in memory order.
    pub fn handles(&self) -> &[BodyHandle] {
        &self.index_to_handle
    }

    pub fn pose(&self, handle: BodyHandle) -> &RigidPose {
        &self.poses[self.index_of(handle)]
    }

    pub fn set_pose(&mut self, handle: BodyHandle, pose: RigidPose) {
        let index = self.index_of(handle);
        self.poses[index] = pose;
        self.world_inertias[index] = Self::compute_world_inertia(&pose, &self.local_inertias[index]);
    }

    pub fn velocity(&self, handle: BodyHandle) -> &BodyVelocity {
        &self.velocities[self.index_of(handle)]
    }

    pub fn set_velocity(&mut self, handle: BodyHandle, velocity: BodyVelocity) {
        let index = self.index_of(handle);
        self.velocities[index] = velocity;
    }

    pub fn local_inertia(&self, handle: BodyHandle) -> &BodyInertia {
        &self.local_inertias[self.index_of(handle)]
    }

    /// Kinematic state changes must also reach the solver's batches; see `Solver::set_local_inertia`.
    pub(crate) fn set_local_inertia(&mut self, handle: BodyHandle, inertia: BodyInertia) {
        let index = self.index_of(handle);
        self.local_inertias[index] = inertia;
        self.world_inertias[index] = Self::compute_world_inertia(&self.poses[index], &inertia);
    }

    /// Gets the most recently computed world space inertia of a body.
    pub fn world_inertia(&self, handle: BodyHandle) -> &BodyInertia {
        &self.world_inertias[self.index_of(handle)]
    }

    /// Applies a linear impulse at the center of mass.
    pub fn apply_linear_impulse(&mut self, handle: BodyHandle, impulse: Vec3) {
        let index = self.index_of(handle);
        self.velocities[index].linear += impulse * self.world_inertias[index].inverse_mass;
    }

    #[inline(always)]
    fn compute_world_inertia(pose: &RigidPose, local_inertia: &BodyInertia) -> BodyInertia {
        BodyInertia {
            inverse_inertia_tensor: Symmetric3x3::rotation_sandwich(
                pose.orientation,
                &local_inertia.inverse_inertia_tensor,
            ),
            inverse_mass: local_inertia.inverse_mass,
        }
    }

    /// Recomputes every body's world space inverse inertia from its current orientation.
    pub fn update_world_inertias(&mut self) {
        for ((world, local), pose) in self
            .world_inertias
            .iter_mut()
            .zip(&self.local_inertias)
            .zip(&self.poses)
        {
            *world = Self::compute_world_inertia(pose, local);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_at(x: f32) -> BodyDescription {
        BodyDescription::create_dynamic(Vec3::new(x, 0.0, 0.0), Vec3::ZERO, BodyInertia::sphere(1.0, 0.5))
    }

    #[test]
    fn test_remove_moves_last_body_and_keeps_handles_valid() {
        let mut bodies = Bodies::new(4);
        let a = bodies.add(&body_at(0.0));
        let b = bodies.add(&body_at(1.0));
        let c = bodies.add(&body_at(2.0));
        bodies.remove(a);
        assert!(!bodies.contains(a));
        assert_eq!(bodies.get_index(c), Some(0));
        assert_eq!(bodies.pose(c).position.x, 2.0);
        assert_eq!(bodies.pose(b).position.x, 1.0);
        let d = bodies.add(&body_at(3.0));
        assert_eq!(d, a, "handles are recycled");
        assert_eq!(bodies.count(), 3);
    }

    #[test]
    #[should_panic(expected = "does not refer to a live body")]
    fn test_stale_handle_panics() {
        let mut bodies = Bodies::new(1);
        let a = bodies.add(&body_at(0.0));
        bodies.remove(a);
        bodies.pose(a);
    }
}
