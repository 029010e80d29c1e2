use std::fmt;

use serde::{Deserialize, Serialize};

use crate::physics::handles::{BodyHandle, StaticHandle};

/// Refers to the owner of a collidable: a body, or an immobile static.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CollidableReference {
    Body(BodyHandle),
    Static(StaticHandle),
}

impl CollidableReference {
    /// Gets the body handle of the owner, if the owner is a body.
    #[inline(always)]
    pub fn body_handle(&self) -> Option<BodyHandle> {
        match *self {
            Self::Body(handle) => Some(handle),
            Self::Static(_) => None,
        }
    }

    #[inline(always)]
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static(_))
    }
}

impl From<BodyHandle> for CollidableReference {
    fn from(handle: BodyHandle) -> Self {
        Self::Body(handle)
    }
}

impl From<StaticHandle> for CollidableReference {
    fn from(handle: StaticHandle) -> Self {
        Self::Static(handle)
    }
}

impl fmt::Display for CollidableReference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Body(handle) => write!(f, "{handle}"),
            Self::Static(handle) => write!(f, "{handle}"),
        }
    }
}

/// Pair of collidables whose contact manifold is tracked across steps.
///
/// The order is significant: manifold offsets are measured from `a`, and normals point from `b` to `a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollidablePair {
    pub a: CollidableReference,
    pub b: CollidableReference,
}

impl CollidablePair {
    #[inline(always)]
    pub fn new(a: impl Into<CollidableReference>, b: impl Into<CollidableReference>) -> Self {
        Self { a: a.into(), b: b.into() }
    }

    /// Checks whether either side of the pair is owned by the given body.
    #[inline(always)]
    pub fn involves(&self, body: BodyHandle) -> bool {
        self.a.body_handle() == Some(body) || self.b.body_handle() == Some(body)
    }
}

impl fmt::Display for CollidablePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}>", self.a, self.b)
    }
}
