use bytemuck::{Pod, Zeroable};

use crate::utilities::vector::Vector;

/// Body handle lanes of a bundle of one-body constraints. Empty lanes hold -1.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct OneBodyReferences {
    pub handle_a: Vector<i32>,
}

/// Body handle lanes of a bundle of two-body constraints, stored apart from the prestep data
/// since the gather and scatter work is scalar-granularity.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TwoBodyReferences {
    pub handle_a: Vector<i32>,
    pub handle_b: Vector<i32>,
}

impl Default for OneBodyReferences {
    fn default() -> Self {
        Self {
            handle_a: Vector::splat(-1),
        }
    }
}

impl Default for TwoBodyReferences {
    fn default() -> Self {
        Self {
            handle_a: Vector::splat(-1),
            handle_b: Vector::splat(-1),
        }
    }
}
