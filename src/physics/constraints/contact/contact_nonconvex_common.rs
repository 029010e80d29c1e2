use bytemuck::{Pod, Zeroable};

use crate::utilities::vector::Vector;
use crate::utilities::vector2_wide::Vector2Wide;
use crate::utilities::vector3_wide::Vector3Wide;

/// One contact of a nonconvex manifold, carrying its own normal.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct NonconvexContactPrestepData {
    /// Offset from the center of body A to the contact.
    pub offset: Vector3Wide,
    pub depth: Vector<f32>,
    /// Contact normal pointing from B toward A.
    pub normal: Vector3Wide,
}

/// Accumulated impulses of a single nonconvex contact.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct NonconvexAccumulatedImpulses {
    pub tangent: Vector2Wide,
    pub penetration: Vector<f32>,
}
