pub mod batch_compressor;
pub mod bodies;
pub mod bodies_gather_scatter;
pub mod body_description;
pub mod body_properties;
pub mod collision_detection;
pub mod constraint_batch;
pub mod constraint_location;
pub mod constraints;
pub mod default_types;
pub mod handles;
pub mod helpers;
pub mod pose_integrator;
pub mod simulation;
pub mod solve_description;
pub mod solver;
