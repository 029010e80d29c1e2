/// Collection of unique indices supporting add, remove, and contains operations.
/// Uses packed bitfields where each bit represents one index's containment state.
#[derive(Clone, Debug, Default)]
pub struct IndexSet {
    /// Packed bitfields representing index containment.
    flags: Vec<u64>,
}

impl IndexSet {
    const SHIFT: usize = 6;
    const MASK: usize = 63;

    /// Creates a new set able to hold indices below `initial_capacity` without resizing.
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            flags: vec![0; (initial_capacity + Self::MASK) >> Self::SHIFT],
        }
    }

    /// Checks if an index is contained in the set.
    #[inline(always)]
    pub fn contains(&self, index: usize) -> bool {
        let packed_index = index >> Self::SHIFT;
        packed_index < self.flags.len() && (self.flags[packed_index] & (1u64 << (index & Self::MASK))) != 0
    }

    /// Gets whether none of the given indices are in the set.
    #[inline(always)]
    pub fn can_fit(&self, indices: &[usize]) -> bool {
        indices.iter().all(|&index| !self.contains(index))
    }

    /// Adds an index to the set.
    #[inline(always)]
    pub fn add(&mut self, index: usize) {
        let bundle_index = index >> Self::SHIFT;
        if bundle_index >= self.flags.len() {
            // Round up to power of 2
            self.flags.resize((bundle_index + 1).next_power_of_two(), 0);
        }
        debug_assert!(
            (self.flags[bundle_index] & (1u64 << (index & Self::MASK))) == 0,
            "Cannot add if it's already present!"
        );
        self.flags[bundle_index] |= 1u64 << (index & Self::MASK);
    }

    /// Removes an index from the set.
    #[inline(always)]
    pub fn remove(&mut self, index: usize) {
        debug_assert!(self.contains(index), "If you try to remove an index, it should be present.");
        self.flags[index >> Self::SHIFT] &= !(1u64 << (index & Self::MASK));
    }

    /// Gets the number of indices in the set.
    pub fn count(&self) -> usize {
        self.flags.iter().map(|flags| flags.count_ones() as usize).sum()
    }

    pub fn clear(&mut self) {
        self.flags.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remove_contains() {
        let mut set = IndexSet::new(8);
        set.add(3);
        set.add(200);
        assert!(set.contains(3) && set.contains(200));
        assert!(!set.can_fit(&[1, 200]));
        assert!(set.can_fit(&[1, 2]));
        set.remove(200);
        assert!(!set.contains(200));
        assert_eq!(set.count(), 1);
    }

    #[test]
    #[should_panic(expected = "Cannot add if it's already present!")]
    fn test_double_add_panics() {
        let mut set = IndexSet::new(8);
        set.add(5);
        set.add(5);
    }
}
