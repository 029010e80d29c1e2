use serde::{Deserialize, Serialize};

use super::collidable_pair::{CollidablePair, CollidableReference};
use super::contact_manifold::IContactManifold;
use crate::error::ConstraintError;
use crate::physics::constraints::contact::contact_constraint_description::validate_material;
use crate::physics::constraints::spring_settings::SpringSettings;

/// Material properties governing the interaction between colliding bodies.
/// Used to create contact constraints of the appropriate configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairMaterialProperties {
    /// Coefficient of friction to apply for the constraint.
    /// Maximum friction force will be equal to the normal force times the friction coefficient.
    pub friction_coefficient: f32,
    /// Maximum relative velocity along the contact normal at which the collision constraint will recover from penetration.
    /// Clamps the velocity goal created from the spring settings.
    pub maximum_recovery_velocity: f32,
    /// Defines the constraint's penetration recovery spring properties.
    pub spring_settings: SpringSettings,
}

impl PairMaterialProperties {
    /// Constructs a pair's material properties.
    #[inline(always)]
    pub fn new(friction_coefficient: f32, maximum_recovery_velocity: f32, spring_settings: SpringSettings) -> Self {
        Self {
            friction_coefficient,
            maximum_recovery_velocity,
            spring_settings,
        }
    }

    pub fn validate(&self) -> Result<(), ConstraintError> {
        validate_material(self.friction_coefficient, &self.spring_settings, self.maximum_recovery_velocity)
    }
}

impl Default for PairMaterialProperties {
    /// Unit friction, 2 units per second of penetration recovery, 30 Hz critically damped springs.
    fn default() -> Self {
        Self::new(1.0, 2.0, SpringSettings::default())
    }
}

/// Defines handlers for contact manifolds handed to the simulation.
pub trait INarrowPhaseCallbacks {
    /// Chooses whether contact constraints may exist between two collidables at all.
    fn allow_contact_generation(&self, _a: CollidableReference, _b: CollidableReference) -> bool {
        true
    }

    /// Provides a notification that a manifold has been created for a pair.
    /// Offers an opportunity to change the pair's material.
    /// Returns true if a constraint should be created for the manifold, false otherwise.
    fn configure_contact_manifold<TManifold: IContactManifold>(
        &self,
        pair: CollidablePair,
        manifold: &TManifold,
        pair_material: &mut PairMaterialProperties,
    ) -> bool;
}

/// Callbacks giving every pair the same material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultNarrowPhaseCallbacks {
    pub material: PairMaterialProperties,
}

impl DefaultNarrowPhaseCallbacks {
    pub fn new(material: PairMaterialProperties) -> Self {
        Self { material }
    }
}

impl INarrowPhaseCallbacks for DefaultNarrowPhaseCallbacks {
    #[inline(always)]
    fn configure_contact_manifold<TManifold: IContactManifold>(
        &self,
        _pair: CollidablePair,
        _manifold: &TManifold,
        pair_material: &mut PairMaterialProperties,
    ) -> bool {
        *pair_material = self.material;
        true
    }
}
