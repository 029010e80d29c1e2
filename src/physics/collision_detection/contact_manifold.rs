use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Information about a single contact.
/// This type contains a field for the normal; it is used to represent contacts within nonconvex manifolds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Offset from the position of collidable A to the contact position.
    pub offset: Vec3,
    /// Penetration depth between the two collidables at this contact. Negative values represent separation.
    pub depth: f32,
    /// Surface basis of the contact. Points from collidable B to collidable A.
    pub normal: Vec3,
    /// Id of the features involved in the collision that generated this contact.
    pub feature_id: i32,
}

/// Information about a single contact in a convex collidable pair.
/// Convex collidable pairs share one surface basis across the manifold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvexContact {
    /// Offset from the position of collidable A to the contact position.
    pub offset: Vec3,
    /// Penetration depth between the two collidables at this contact. Negative values represent separation.
    pub depth: f32,
    /// Id of the features involved in the collision that generated this contact.
    pub feature_id: i32,
}

impl ConvexContact {
    #[inline(always)]
    pub fn new(offset: Vec3, depth: f32, feature_id: i32) -> Self {
        Self {
            offset,
            depth,
            feature_id,
        }
    }
}

/// Read access shared by both manifold kinds.
pub trait IContactManifold {
    /// Gets the number of contacts in the manifold.
    fn count(&self) -> usize;

    /// Gets whether the contact manifold was created by a pair of convex objects.
    fn convex(&self) -> bool;

    /// Gets the feature id associated with a requested contact.
    fn feature_id(&self, contact_index: usize) -> i32;

    /// Gets the depth associated with a requested contact.
    fn depth(&self, contact_index: usize) -> f32;

    /// Gets a contact's normal. Points from collidable B to collidable A.
    fn normal(&self, contact_index: usize) -> Vec3;

    /// Gets the offset from collidable A to the requested contact.
    fn offset(&self, contact_index: usize) -> Vec3;
}

/// Contains the data associated with a nonconvex contact manifold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NonconvexContactManifold {
    /// Offset from collidable A to collidable B.
    pub offset_b: Vec3,
    /// Number of live entries in `contacts`. Values outside 1..=4 are rejected by the contact cache.
    pub count: usize,
    pub contacts: [Contact; 4],
}

impl NonconvexContactManifold {
    /// The maximum number of contacts that can exist within a nonconvex manifold.
    pub const MAXIMUM_CONTACT_COUNT: usize = 4;

    pub fn new(offset_b: Vec3) -> Self {
        Self {
            offset_b,
            ..Self::default()
        }
    }

    /// Gets the live contacts.
    #[inline(always)]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts[..self.count.min(Self::MAXIMUM_CONTACT_COUNT)]
    }

    /// Appends a contact. The manifold must not be full.
    pub fn add(&mut self, contact: Contact) {
        assert!(self.count < Self::MAXIMUM_CONTACT_COUNT, "Nonconvex manifolds hold at most 4 contacts.");
        self.contacts[self.count] = contact;
        self.count += 1;
    }

    /// Quickly removes a contact at the given index by swapping with the last.
    pub fn fast_remove_at(&mut self, index: usize) {
        debug_assert!(index < self.count, "Contact index must be within the contact count.");
        self.count -= 1;
        if index < self.count {
            self.contacts[index] = self.contacts[self.count];
        }
    }

    /// Expresses the manifold from collidable B's point of view.
    pub fn flipped(&self) -> Self {
        let mut flipped = *self;
        flipped.offset_b = -self.offset_b;
        for contact in &mut flipped.contacts[..self.count.min(Self::MAXIMUM_CONTACT_COUNT)] {
            contact.offset -= self.offset_b;
            contact.normal = -contact.normal;
        }
        flipped
    }
}

impl IContactManifold for NonconvexContactManifold {
    #[inline(always)]
    fn count(&self) -> usize {
        self.count
    }

    #[inline(always)]
    fn convex(&self) -> bool {
        false
    }

    #[inline(always)]
    fn feature_id(&self, contact_index: usize) -> i32 {
        self.contacts()[contact_index].feature_id
    }

    #[inline(always)]
    fn depth(&self, contact_index: usize) -> f32 {
        self.contacts()[contact_index].depth
    }

    #[inline(always)]
    fn normal(&self, contact_index: usize) -> Vec3 {
        self.contacts()[contact_index].normal
    }

    #[inline(always)]
    fn offset(&self, contact_index: usize) -> Vec3 {
        self.contacts()[contact_index].offset
    }
}

/// Contains the data associated with a convex contact manifold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvexContactManifold {
    /// Offset from collidable A to collidable B.
    pub offset_b: Vec3,
    /// Surface normal shared by all contacts. Points from collidable B to collidable A.
    pub normal: Vec3,
    /// Number of live entries in `contacts`. Values outside 1..=4 are rejected by the contact cache.
    pub count: usize,
    pub contacts: [ConvexContact; 4],
}

impl ConvexContactManifold {
    /// The maximum number of contacts that can exist within a convex manifold.
    pub const MAXIMUM_CONTACT_COUNT: usize = 4;

    pub fn new(offset_b: Vec3, normal: Vec3) -> Self {
        Self {
            offset_b,
            normal,
            ..Self::default()
        }
    }

    /// Gets the live contacts.
    #[inline(always)]
    pub fn contacts(&self) -> &[ConvexContact] {
        &self.contacts[..self.count.min(Self::MAXIMUM_CONTACT_COUNT)]
    }

    /// Appends a contact. The manifold must not be full.
    pub fn add(&mut self, contact: ConvexContact) {
        assert!(self.count < Self::MAXIMUM_CONTACT_COUNT, "Convex manifolds hold at most 4 contacts.");
        self.contacts[self.count] = contact;
        self.count += 1;
    }

    /// Quickly removes a contact at the given index by swapping with the last.
    pub fn fast_remove_at(&mut self, index: usize) {
        debug_assert!(index < self.count, "Contact index must be within the contact count.");
        self.count -= 1;
        if index < self.count {
            self.contacts[index] = self.contacts[self.count];
        }
    }

    /// Expresses the manifold from collidable B's point of view.
    pub fn flipped(&self) -> Self {
        let mut flipped = *self;
        flipped.offset_b = -self.offset_b;
        flipped.normal = -self.normal;
        for contact in &mut flipped.contacts[..self.count.min(Self::MAXIMUM_CONTACT_COUNT)] {
            contact.offset -= self.offset_b;
        }
        flipped
    }
}

impl IContactManifold for ConvexContactManifold {
    #[inline(always)]
    fn count(&self) -> usize {
        self.count
    }

    #[inline(always)]
    fn convex(&self) -> bool {
        true
    }

    #[inline(always)]
    fn feature_id(&self, contact_index: usize) -> i32 {
        self.contacts()[contact_index].feature_id
    }

    #[inline(always)]
    fn depth(&self, contact_index: usize) -> f32 {
        self.contacts()[contact_index].depth
    }

    #[inline(always)]
    fn normal(&self, _contact_index: usize) -> Vec3 {
        self.normal
    }

    #[inline(always)]
    fn offset(&self, contact_index: usize) -> Vec3 {
        self.contacts()[contact_index].offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_remove_moves_last_contact() {
        let mut manifold = ConvexContactManifold::new(Vec3::Y, Vec3::Y);
        for i in 0..3 {
            manifold.add(ConvexContact::new(Vec3::splat(i as f32), 0.1, i));
        }
        manifold.fast_remove_at(0);
        assert_eq!(manifold.count(), 2);
        assert_eq!(manifold.feature_id(0), 2);
        assert_eq!(manifold.feature_id(1), 1);
    }

    #[test]
    fn test_flipped_manifold_is_relative_to_b() {
        let mut manifold = ConvexContactManifold::new(Vec3::new(0.0, -1.0, 0.0), Vec3::Y);
        manifold.add(ConvexContact::new(Vec3::new(0.5, -0.5, 0.0), 0.01, 7));
        let flipped = manifold.flipped();
        assert_eq!(flipped.offset_b, Vec3::Y);
        assert_eq!(flipped.normal, -Vec3::Y);
        assert_eq!(flipped.offset(0), Vec3::new(0.5, 0.5, 0.0));
        assert_eq!(flipped.depth(0), 0.01);
    }

    #[test]
    #[should_panic(expected = "at most 4 contacts")]
    fn test_adding_fifth_contact_panics() {
        let mut manifold = NonconvexContactManifold::new(Vec3::ZERO);
        for i in 0..5 {
            manifold.add(Contact {
                feature_id: i,
                ..Contact::default()
            });
        }
    }
}
