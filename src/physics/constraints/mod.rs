pub mod angular_motor;
pub mod ball_socket;
pub mod ball_socket_shared;
pub mod body_references;
pub mod center_distance_constraint;
pub mod center_distance_limit;
pub mod constraint_checker;
pub mod constraint_description;
pub mod contact;
pub mod distance_limit;
pub mod distance_servo;
pub mod inequality_helpers;
pub mod motor_settings;
pub mod one_body_linear_servo;
pub mod one_body_type_processor;
pub mod servo_settings;
pub mod spring_settings;
pub mod two_body_type_processor;
pub mod type_batch;
pub mod type_processor;
