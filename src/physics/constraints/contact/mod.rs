//! Contact constraints: penetration limits with tangent and twist friction for convex
//! manifolds, and per-contact penetration with tangent friction for nonconvex manifolds.

pub mod contact_constraint_description;
pub mod contact_convex_common;
pub mod contact_convex_descriptions;
pub mod contact_convex_types;
pub mod contact_nonconvex_common;
pub mod contact_nonconvex_descriptions;
pub mod contact_nonconvex_types;
pub mod penetration_limit;
pub mod tangent_friction;
pub mod twist_friction;

pub use contact_constraint_description::{ConstraintContactData, NonconvexConstraintContactData};
pub use contact_convex_descriptions::*;
pub use contact_nonconvex_descriptions::*;
