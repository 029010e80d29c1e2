pub mod bundle_indexing;
pub mod collections;
pub mod gather_scatter;
pub mod matrix2x3_wide;
pub mod memory;
pub mod quaternion_wide;
pub mod symmetric2x2_wide;
pub mod symmetric3x3;
pub mod symmetric3x3_wide;
pub mod thread_dispatcher;
pub mod vector;
pub mod vector2_wide;
pub mod vector3_wide;
