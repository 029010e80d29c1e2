use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::physics::bodies::Bodies;

/// Integrates body velocities and poses around the solver.
///
/// Velocity integration runs at the start of each substep, pose integration at its end.
pub trait IPoseIntegrator: Send + Sync {
    /// Applies external accelerations and damping to every dynamic body.
    fn integrate_velocities(&self, bodies: &mut Bodies, dt: f32);

    /// Advances every body's pose by its velocity and refreshes world space inertias.
    fn integrate_poses(&self, bodies: &mut Bodies, dt: f32);
}

/// Pose integrator applying uniform gravity and fractional damping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseIntegrator {
    pub gravity: Vec3,
    /// Fraction of linear velocity removed per unit of time, in [0, 1].
    pub linear_damping: f32,
    /// Fraction of angular velocity removed per unit of time, in [0, 1].
    pub angular_damping: f32,
}

impl PoseIntegrator {
    pub fn new(gravity: Vec3, linear_damping: f32, angular_damping: f32) -> Self {
        Self {
            gravity,
            linear_damping,
            angular_damping,
        }
    }

    /// Integrates an orientation by a world space angular velocity over `dt`.
    #[inline(always)]
    pub fn integrate_orientation(orientation: Quat, angular_velocity: Vec3, dt: f32) -> Quat {
        let speed = angular_velocity.length();
        if speed > 1e-15 {
            let rotation = Quat::from_axis_angle(angular_velocity / speed, speed * dt);
            (rotation * orientation).normalize()
        } else {
            orientation
        }
    }

    #[inline(always)]
    fn damping_multiplier(damping: f32, dt: f32) -> f32 {
        (1.0 - damping).clamp(0.0, 1.0).powf(dt)
    }
}

impl Default for PoseIntegrator {
    fn default() -> Self {
        Self::new(Vec3::ZERO, 0.0, 0.0)
    }
}

impl IPoseIntegrator for PoseIntegrator {
    fn integrate_velocities(&self, bodies: &mut Bodies, dt: f32) {
        let linear_multiplier = Self::damping_multiplier(self.linear_damping, dt);
        let angular_multiplier = Self::damping_multiplier(self.angular_damping, dt);
        let gravity_dt = self.gravity * dt;
        for (velocity, inertia) in bodies.velocities.iter_mut().zip(&bodies.local_inertias) {
            // Kinematic bodies keep whatever velocity they were given.
            if inertia.is_kinematic() {
                continue;
            }
            velocity.linear = (velocity.linear + gravity_dt) * linear_multiplier;
            velocity.angular *= angular_multiplier;
        }
    }

    fn integrate_poses(&self, bodies: &mut Bodies, dt: f32) {
        for (pose, velocity) in bodies.poses.iter_mut().zip(&bodies.velocities) {
            pose.position += velocity.linear * dt;
            pose.orientation = Self::integrate_orientation(pose.orientation, velocity.angular, dt);
        }
        bodies.update_world_inertias();
    }
}
