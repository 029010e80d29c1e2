use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utilities::symmetric3x3::Symmetric3x3;
use crate::utilities::symmetric3x3_wide::Symmetric3x3Wide;
use crate::utilities::vector::Vector;
use crate::utilities::vector3_wide::Vector3Wide;

/// Represents a rigid transformation.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidPose {
    /// Orientation of the pose.
    pub orientation: Quat,
    /// Position of the pose.
    pub position: Vec3,
}

impl Default for RigidPose {
    #[inline(always)]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RigidPose {
    /// Returns a pose with a position at (0,0,0) and identity orientation.
    pub const IDENTITY: Self = Self {
        orientation: Quat::IDENTITY,
        position: Vec3::ZERO,
    };

    /// Creates a rigid pose with the given position and orientation.
    #[inline(always)]
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Creates a rigid pose with the given position and identity orientation.
    #[inline(always)]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }

    /// Transforms a point from the pose's local space into world space.
    #[inline(always)]
    pub fn transform(&self, v: Vec3) -> Vec3 {
        self.orientation * v + self.position
    }
}

impl From<Vec3> for RigidPose {
    fn from(position: Vec3) -> Self {
        Self::from_position(position)
    }
}

impl fmt::Display for RigidPose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.position, self.orientation)
    }
}

/// Linear and angular velocity of a body.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyVelocity {
    /// Linear velocity associated with the body.
    pub linear: Vec3,
    /// Angular velocity associated with the body.
    pub angular: Vec3,
}

impl BodyVelocity {
    /// Creates a new set of body velocities with the given linear velocity and zero angular velocity.
    #[inline(always)]
    pub fn from_linear(linear: Vec3) -> Self {
        Self {
            linear,
            angular: Vec3::ZERO,
        }
    }

    #[inline(always)]
    pub fn new(linear: Vec3, angular: Vec3) -> Self {
        Self { linear, angular }
    }
}

impl From<Vec3> for BodyVelocity {
    fn from(linear: Vec3) -> Self {
        Self::from_linear(linear)
    }
}

impl fmt::Display for BodyVelocity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "linear {}, angular {}", self.linear, self.angular)
    }
}

/// Stores the inertia for a body.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyInertia {
    /// Inverse of the body's inertia tensor.
    pub inverse_inertia_tensor: Symmetric3x3,
    /// Inverse of the body's mass.
    pub inverse_mass: f32,
}

impl BodyInertia {
    /// Inertia of a body that cannot be moved by constraints.
    pub const KINEMATIC: Self = Self {
        inverse_inertia_tensor: Symmetric3x3::ZERO,
        inverse_mass: 0.0,
    };

    /// Computes the inertia of a solid sphere.
    pub fn sphere(mass: f32, radius: f32) -> Self {
        let inverse_diagonal = 1.0 / (0.4 * mass * radius * radius);
        Self {
            inverse_inertia_tensor: Symmetric3x3::from_diagonal(Vec3::splat(inverse_diagonal)),
            inverse_mass: 1.0 / mass,
        }
    }

    /// Computes the inertia of a solid box with the given full extents.
    pub fn cuboid(mass: f32, width: f32, height: f32, length: f32) -> Self {
        let scale = mass / 12.0;
        let diagonal = Vec3::new(
            scale * (height * height + length * length),
            scale * (width * width + length * length),
            scale * (width * width + height * height),
        );
        Self {
            inverse_inertia_tensor: Symmetric3x3::from_diagonal(diagonal.recip()),
            inverse_mass: 1.0 / mass,
        }
    }

    #[inline(always)]
    pub fn is_kinematic(&self) -> bool {
        self.inverse_mass == 0.0
            && self.inverse_inertia_tensor.xx == 0.0
            && self.inverse_inertia_tensor.yy == 0.0
            && self.inverse_inertia_tensor.zz == 0.0
    }
}

impl fmt::Display for BodyInertia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inverse mass {}", self.inverse_mass)
    }
}

/// Linear and angular velocities of a bundle of bodies.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct BodyVelocityWide {
    pub linear: Vector3Wide,
    pub angular: Vector3Wide,
}

/// Inertias of a bundle of bodies.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct BodyInertiaWide {
    pub inverse_inertia_tensor: Symmetric3x3Wide,
    pub inverse_mass: Vector<f32>,
}
