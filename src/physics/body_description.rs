use crate::physics::body_properties::{BodyInertia, BodyVelocity, RigidPose};

/// Describes a body's state.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyDescription {
    /// Position and orientation of the body.
    pub pose: RigidPose,
    /// Linear and angular velocity of the body.
    pub velocity: BodyVelocity,
    /// Mass and inertia tensor of the body in its local space.
    pub local_inertia: BodyInertia,
}

impl BodyDescription {
    /// Creates a dynamic body description.
    pub fn create_dynamic(
        pose: impl Into<RigidPose>,
        velocity: impl Into<BodyVelocity>,
        local_inertia: BodyInertia,
    ) -> Self {
        Self {
            pose: pose.into(),
            velocity: velocity.into(),
            local_inertia,
        }
    }

    /// Creates a body with zero inverse mass and inertia. Constraints cannot change its velocity.
    pub fn create_kinematic(pose: impl Into<RigidPose>, velocity: impl Into<BodyVelocity>) -> Self {
        Self {
            pose: pose.into(),
            velocity: velocity.into(),
            local_inertia: BodyInertia::KINEMATIC,
        }
    }
}
