/// Location in memory where a constraint is stored.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintLocation {
    /// Index of the solver batch the constraint belongs to.
    pub batch_index: i32,
    /// Type id of the constraint. Used to look up the type batch index in a constraint batch's type id to type batch index table.
    pub type_id: i32,
    /// Index of the constraint in a type batch.
    pub index_in_type_batch: i32,
}

impl ConstraintLocation {
    /// Marks a handle slot that is not backed by a live constraint.
    pub const UNUSED: Self = Self {
        batch_index: -1,
        type_id: -1,
        index_in_type_batch: -1,
    };

    #[inline(always)]
    pub fn is_used(&self) -> bool {
        self.batch_index >= 0
    }
}

impl Default for ConstraintLocation {
    fn default() -> Self {
        Self::UNUSED
    }
}
