use thiserror::Error;

use crate::physics::handles::BodyHandle;

/// Invalid constraint settings detected by description validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstraintError {
    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f32 },
    #[error("{field} must be nonnegative, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },
    #[error("{field} has an invalid range: {reason}")]
    InvalidRange { field: &'static str, reason: String },
}

/// Contact manifolds the constraint layer cannot represent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContactError {
    #[error("contact manifolds must hold between 1 and 4 contacts, got {count}")]
    UnsupportedContactCount { count: usize },
    #[error("a pair of two statics cannot produce a contact constraint")]
    NoBodyInPair,
}

/// Errors raised by solver operations on user input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("constraint type {type_id} is not registered with the solver")]
    UnknownConstraintType { type_id: usize },
    #[error("constraint type expects {expected} bodies, got {actual}")]
    BodyCountMismatch { expected: usize, actual: usize },
    #[error("{0} appears more than once in a single constraint")]
    DuplicateBody(BodyHandle),
    #[error("{0} does not refer to a live body")]
    UnknownBody(BodyHandle),
    #[error(transparent)]
    InvalidDescription(#[from] ConstraintError),
    #[error(transparent)]
    Contact(#[from] ContactError),
}
