use serde::{Deserialize, Serialize};

use crate::error::ConstraintError;

/// Describes how the solver should schedule substeps and velocity iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveDescription {
    /// Number of velocity iterations to run in each substep.
    pub velocity_iteration_count: usize,
    /// Number of substeps to execute each time the solver runs.
    pub substep_count: usize,
}

impl SolveDescription {
    pub const DEFAULT_VELOCITY_ITERATION_COUNT: usize = 8;
    pub const DEFAULT_SUBSTEP_COUNT: usize = 1;

    /// Creates a solve description. Both counts must be at least 1.
    pub fn new(velocity_iteration_count: usize, substep_count: usize) -> Self {
        let description = Self {
            velocity_iteration_count,
            substep_count,
        };
        if let Err(error) = description.validate() {
            panic!("{error}");
        }
        description
    }

    pub fn validate(&self) -> Result<(), ConstraintError> {
        if self.velocity_iteration_count == 0 {
            return Err(ConstraintError::InvalidRange {
                field: "solve.velocity_iteration_count",
                reason: "at least one velocity iteration is required".to_string(),
            });
        }
        if self.substep_count == 0 {
            return Err(ConstraintError::InvalidRange {
                field: "solve.substep_count",
                reason: "at least one substep is required".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for SolveDescription {
    fn default() -> Self {
        Self {
            velocity_iteration_count: Self::DEFAULT_VELOCITY_ITERATION_COUNT,
            substep_count: Self::DEFAULT_SUBSTEP_COUNT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SolveDescription::default().validate().is_ok());
    }

    #[test]
    #[should_panic(expected = "at least one substep is required")]
    fn test_zero_substeps_panics() {
        SolveDescription::new(4, 0);
    }

    #[test]
    fn test_zero_iterations_is_reported() {
        let description = SolveDescription {
            velocity_iteration_count: 0,
            substep_count: 1,
        };
        assert!(matches!(
            description.validate(),
            Err(ConstraintError::InvalidRange { field: "solve.velocity_iteration_count", .. })
        ));
    }
}
