use std::collections::HashMap;

use log::{debug, warn};

use super::collidable_pair::CollidablePair;
use super::contact_manifold::{ConvexContact, ConvexContactManifold, NonconvexContactManifold};
use super::narrow_phase_callbacks::PairMaterialProperties;
use crate::error::{ContactError, SolverError};
use crate::physics::bodies::Bodies;
use crate::physics::constraints::constraint_description::IConstraintDescription;
use crate::physics::constraints::contact::{
    ConstraintContactData, Contact, ContactNonconvex, ContactNonconvexOneBody, ContactOneBody,
    NonconvexConstraintContactData,
};
use crate::physics::handles::{BodyHandle, ConstraintHandle};
use crate::physics::solver::Solver;

/// Shape of the contact constraint currently backing a pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ManifoldShape {
    convex: bool,
    contact_count: usize,
    feature_ids: [i32; 4],
}

impl ManifoldShape {
    #[inline(always)]
    fn feature_ids(&self) -> &[i32] {
        &self.feature_ids[..self.contact_count]
    }

    /// Index of a contact's penetration impulse within the flat accumulated impulse scalars.
    #[inline(always)]
    fn penetration_index(&self, contact_index: usize) -> usize {
        if self.convex {
            // Tangent (2), penetration per contact, twist.
            2 + contact_index
        } else {
            // Per contact: tangent (2), penetration.
            3 * contact_index + 2
        }
    }

    #[inline(always)]
    fn impulse_count(&self) -> usize {
        if self.convex {
            self.contact_count + 3
        } else {
            3 * self.contact_count
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct CachedContactConstraint {
    handle: ConstraintHandle,
    type_id: usize,
    shape: ManifoldShape,
    /// Set when the pair was updated since the last flush.
    fresh: bool,
}

#[derive(Clone, Copy, Debug)]
enum PairBodies {
    One(BodyHandle),
    Two(BodyHandle, BodyHandle),
}

/// Tracks the contact constraint of every colliding pair across steps.
///
/// Refreshing a pair reuses its constraint when the constraint type is unchanged and replaces it
/// otherwise. Either way, accumulated impulses are carried to the new contacts by feature id so
/// that warm starting survives manifold changes.
#[derive(Debug, Default)]
pub struct ContactConstraintCache {
    constraints: HashMap<CollidablePair, CachedContactConstraint>,
}

impl ContactConstraintCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the number of tracked pairs.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Gets the constraint currently backing a pair.
    pub fn constraint_handle(&self, pair: &CollidablePair) -> Option<ConstraintHandle> {
        self.constraints.get(pair).map(|cached| cached.handle)
    }

    /// Gets the feature ids of the contacts in a pair's constraint, in contact order.
    pub fn feature_ids(&self, pair: &CollidablePair) -> Option<&[i32]> {
        self.constraints.get(pair).map(|cached| cached.shape.feature_ids())
    }

    fn check_count(pair: &CollidablePair, count: usize) -> Result<(), ContactError> {
        if (1..=4).contains(&count) {
            Ok(())
        } else {
            warn!("rejected manifold with {count} contacts for pair {pair}");
            Err(ContactError::UnsupportedContactCount { count })
        }
    }

    /// Orders the pair's bodies so that a lone body is body A. Returns whether the manifold must be flipped.
    fn resolve_bodies(pair: &CollidablePair) -> Result<(PairBodies, bool), ContactError> {
        match (pair.a.body_handle(), pair.b.body_handle()) {
            (Some(a), Some(b)) => Ok((PairBodies::Two(a, b), false)),
            (Some(a), None) => Ok((PairBodies::One(a), false)),
            (None, Some(b)) => Ok((PairBodies::One(b), true)),
            (None, None) => {
                warn!("rejected manifold for static pair {pair}");
                Err(ContactError::NoBodyInPair)
            }
        }
    }

    /// Creates or refreshes the constraint for a convex manifold.
    pub fn update_convex(
        &mut self,
        solver: &mut Solver,
        bodies: &Bodies,
        pair: CollidablePair,
        manifold: &ConvexContactManifold,
        material: &PairMaterialProperties,
    ) -> Result<ConstraintHandle, SolverError> {
        Self::check_count(&pair, manifold.count)?;
        let (pair_bodies, flip) = Self::resolve_bodies(&pair)?;
        let manifold = if flip { manifold.flipped() } else { *manifold };
        let mut feature_ids = [0; 4];
        for (feature_id, contact) in feature_ids.iter_mut().zip(manifold.contacts()) {
            *feature_id = contact.feature_id;
        }
        let shape = ManifoldShape {
            convex: true,
            contact_count: manifold.count,
            feature_ids,
        };
        match pair_bodies {
            PairBodies::One(a) => match manifold.count {
                1 => self.update(solver, bodies, pair, &[a], &convex_one_body::<1>(&manifold, material), shape),
                2 => self.update(solver, bodies, pair, &[a], &convex_one_body::<2>(&manifold, material), shape),
                3 => self.update(solver, bodies, pair, &[a], &convex_one_body::<3>(&manifold, material), shape),
                _ => self.update(solver, bodies, pair, &[a], &convex_one_body::<4>(&manifold, material), shape),
            },
            PairBodies::Two(a, b) => match manifold.count {
                1 => self.update(solver, bodies, pair, &[a, b], &convex_two_body::<1>(&manifold, material), shape),
                2 => self.update(solver, bodies, pair, &[a, b], &convex_two_body::<2>(&manifold, material), shape),
                3 => self.update(solver, bodies, pair, &[a, b], &convex_two_body::<3>(&manifold, material), shape),
                _ => self.update(solver, bodies, pair, &[a, b], &convex_two_body::<4>(&manifold, material), shape),
            },
        }
    }

    /// Creates or refreshes the constraint for a nonconvex manifold.
    /// A single contact manifold is solved as a convex one.
    pub fn update_nonconvex(
        &mut self,
        solver: &mut Solver,
        bodies: &Bodies,
        pair: CollidablePair,
        manifold: &NonconvexContactManifold,
        material: &PairMaterialProperties,
    ) -> Result<ConstraintHandle, SolverError> {
        Self::check_count(&pair, manifold.count)?;
        if manifold.count == 1 {
            let contact = manifold.contacts[0];
            let mut convex = ConvexContactManifold::new(manifold.offset_b, contact.normal);
            convex.add(ConvexContact::new(contact.offset, contact.depth, contact.feature_id));
            return self.update_convex(solver, bodies, pair, &convex, material);
        }
        let (pair_bodies, flip) = Self::resolve_bodies(&pair)?;
        let manifold = if flip { manifold.flipped() } else { *manifold };
        let mut feature_ids = [0; 4];
        for (feature_id, contact) in feature_ids.iter_mut().zip(manifold.contacts()) {
            *feature_id = contact.feature_id;
        }
        let shape = ManifoldShape {
            convex: false,
            contact_count: manifold.count,
            feature_ids,
        };
        match pair_bodies {
            PairBodies::One(a) => match manifold.count {
                2 => self.update(solver, bodies, pair, &[a], &nonconvex_one_body::<2>(&manifold, material), shape),
                3 => self.update(solver, bodies, pair, &[a], &nonconvex_one_body::<3>(&manifold, material), shape),
                _ => self.update(solver, bodies, pair, &[a], &nonconvex_one_body::<4>(&manifold, material), shape),
            },
            PairBodies::Two(a, b) => match manifold.count {
                2 => self.update(solver, bodies, pair, &[a, b], &nonconvex_two_body::<2>(&manifold, material), shape),
                3 => self.update(solver, bodies, pair, &[a, b], &nonconvex_two_body::<3>(&manifold, material), shape),
                _ => self.update(solver, bodies, pair, &[a, b], &nonconvex_two_body::<4>(&manifold, material), shape),
            },
        }
    }

    fn update<TDescription: IConstraintDescription>(
        &mut self,
        solver: &mut Solver,
        bodies: &Bodies,
        pair: CollidablePair,
        body_handles: &[BodyHandle],
        description: &TDescription,
        shape: ManifoldShape,
    ) -> Result<ConstraintHandle, SolverError> {
        let type_id = TDescription::CONSTRAINT_TYPE_ID;
        let previous = self
            .constraints
            .get(&pair)
            .copied()
            .filter(|previous| solver.constraint_exists(previous.handle));
        let handle = match previous {
            Some(previous) if previous.type_id == type_id => {
                let old_impulses = solver.get_accumulated_impulses(previous.handle);
                solver.apply_description(previous.handle, description)?;
                let new_impulses = Self::redistribute_impulses(&previous.shape, &old_impulses, &shape);
                solver.set_accumulated_impulses(previous.handle, &new_impulses);
                previous.handle
            }
            Some(previous) => {
                let old_impulses = solver.get_accumulated_impulses(previous.handle);
                solver.remove(previous.handle);
                let handle = match solver.add(bodies, body_handles, description) {
                    Ok(handle) => handle,
                    Err(error) => {
                        self.constraints.remove(&pair);
                        return Err(error);
                    }
                };
                let new_impulses = Self::redistribute_impulses(&previous.shape, &old_impulses, &shape);
                solver.set_accumulated_impulses(handle, &new_impulses);
                debug!(
                    "replaced contact constraint of pair {pair}: {} -> {} contacts",
                    previous.shape.contact_count, shape.contact_count
                );
                handle
            }
            None => solver.add(bodies, body_handles, description)?,
        };
        self.constraints.insert(
            pair,
            CachedContactConstraint {
                handle,
                type_id,
                shape,
                fresh: true,
            },
        );
        Ok(handle)
    }

    /// Maps the accumulated impulses of an old manifold onto a new one.
    ///
    /// A new contact inherits the penetration impulse of the old contact with the same feature id.
    /// Penetration impulse of unmatched old contacts is split evenly over unmatched new contacts.
    /// Convex manifolds keep their tangent and twist impulses; nonconvex contacts keep the tangent
    /// impulse of the contact they matched.
    fn redistribute_impulses(old: &ManifoldShape, old_impulses: &[f32], new: &ManifoldShape) -> Vec<f32> {
        debug_assert_eq!(old_impulses.len(), old.impulse_count());
        let mut new_impulses = vec![0.0; new.impulse_count()];
        let mut unclaimed: Vec<f32> = (0..old.contact_count)
            .map(|i| old_impulses[old.penetration_index(i)])
            .collect();
        let mut unmatched = Vec::new();
        for (new_index, feature_id) in new.feature_ids().iter().enumerate() {
            match old.feature_ids().iter().position(|old_id| old_id == feature_id) {
                Some(old_index) => {
                    new_impulses[new.penetration_index(new_index)] = unclaimed[old_index];
                    // Claimed impulse is not distributed to unmatched contacts.
                    unclaimed[old_index] = 0.0;
                    if !old.convex && !new.convex {
                        let old_tangent = old.penetration_index(old_index) - 2;
                        let new_tangent = new.penetration_index(new_index) - 2;
                        new_impulses[new_tangent..new_tangent + 2]
                            .copy_from_slice(&old_impulses[old_tangent..old_tangent + 2]);
                    }
                }
                None => unmatched.push(new_index),
            }
        }
        if !unmatched.is_empty() {
            let impulse_per_unmatched = unclaimed.iter().sum::<f32>() / unmatched.len() as f32;
            for new_index in unmatched {
                new_impulses[new.penetration_index(new_index)] = impulse_per_unmatched;
            }
        }
        if old.convex && new.convex {
            new_impulses[..2].copy_from_slice(&old_impulses[..2]);
            new_impulses[new.impulse_count() - 1] = old_impulses[old.impulse_count() - 1];
        }
        new_impulses
    }

    /// Removes the pair's constraint. Returns whether the pair was tracked.
    pub fn remove(&mut self, solver: &mut Solver, pair: &CollidablePair) -> bool {
        match self.constraints.remove(pair) {
            Some(cached) => {
                if solver.constraint_exists(cached.handle) {
                    solver.remove(cached.handle);
                }
                true
            }
            None => false,
        }
    }

    /// Removes the constraint of every pair not updated since the previous flush, then starts a new
    /// freshness period. Returns the number of pairs removed.
    pub fn flush_stale(&mut self, solver: &mut Solver) -> usize {
        let mut stale: Vec<CollidablePair> = self
            .constraints
            .iter()
            .filter(|(_, cached)| !cached.fresh)
            .map(|(pair, _)| *pair)
            .collect();
        // Removal order decides handle and batch slot reuse, so keep it independent of hashing.
        stale.sort_unstable();
        for pair in &stale {
            self.remove(solver, pair);
        }
        for cached in self.constraints.values_mut() {
            cached.fresh = false;
        }
        if !stale.is_empty() {
            debug!("flushed {} stale contact constraints", stale.len());
        }
        stale.len()
    }

    /// Removes every pair involving a body.
    pub fn remove_body(&mut self, solver: &mut Solver, body: BodyHandle) {
        let mut pairs: Vec<CollidablePair> = self.constraints.keys().filter(|pair| pair.involves(body)).copied().collect();
        pairs.sort_unstable();
        for pair in &pairs {
            self.remove(solver, pair);
        }
    }

    /// Removes every tracked pair and its constraint.
    pub fn clear(&mut self, solver: &mut Solver) {
        let mut pairs: Vec<CollidablePair> = self.constraints.keys().copied().collect();
        pairs.sort_unstable();
        for pair in &pairs {
            self.remove(solver, pair);
        }
    }
}

fn convex_contact_data<const N: usize>(manifold: &ConvexContactManifold) -> [ConstraintContactData; N] {
    std::array::from_fn(|i| ConstraintContactData {
        offset_a: manifold.contacts[i].offset,
        penetration_depth: manifold.contacts[i].depth,
    })
}

fn nonconvex_contact_data<const N: usize>(manifold: &NonconvexContactManifold) -> [NonconvexConstraintContactData; N] {
    std::array::from_fn(|i| NonconvexConstraintContactData {
        offset_a: manifold.contacts[i].offset,
        normal: manifold.contacts[i].normal,
        penetration_depth: manifold.contacts[i].depth,
    })
}

fn convex_one_body<const N: usize>(manifold: &ConvexContactManifold, material: &PairMaterialProperties) -> ContactOneBody<N> {
    ContactOneBody {
        contacts: convex_contact_data(manifold),
        normal: manifold.normal,
        friction_coefficient: material.friction_coefficient,
        spring_settings: material.spring_settings,
        maximum_recovery_velocity: material.maximum_recovery_velocity,
    }
}

fn convex_two_body<const N: usize>(manifold: &ConvexContactManifold, material: &PairMaterialProperties) -> Contact<N> {
    Contact {
        contacts: convex_contact_data(manifold),
        offset_b: manifold.offset_b,
        normal: manifold.normal,
        friction_coefficient: material.friction_coefficient,
        spring_settings: material.spring_settings,
        maximum_recovery_velocity: material.maximum_recovery_velocity,
    }
}

fn nonconvex_one_body<const N: usize>(
    manifold: &NonconvexContactManifold,
    material: &PairMaterialProperties,
) -> ContactNonconvexOneBody<N> {
    ContactNonconvexOneBody {
        contacts: nonconvex_contact_data(manifold),
        friction_coefficient: material.friction_coefficient,
        spring_settings: material.spring_settings,
        maximum_recovery_velocity: material.maximum_recovery_velocity,
    }
}

fn nonconvex_two_body<const N: usize>(
    manifold: &NonconvexContactManifold,
    material: &PairMaterialProperties,
) -> ContactNonconvex<N> {
    ContactNonconvex {
        contacts: nonconvex_contact_data(manifold),
        offset_b: manifold.offset_b,
        friction_coefficient: material.friction_coefficient,
        spring_settings: material.spring_settings,
        maximum_recovery_velocity: material.maximum_recovery_velocity,
    }
}
