//! Resource ownership and sharing records.
//!
//! Ownership is implicit: the creator recorded on the [`Resource`]. Everyone else reaches a
//! resource through exactly one [`Grant`] per (resource, principal) pair.

use crate::access::level::AccessLevel;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque principal (user) identifier.
pub type PrincipalId = String;
/// Opaque resource (task) identifier.
pub type ResourceId = String;

/// A shareable resource as seen by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Resource {
    pub id: ResourceId,
    /// Creator. Never appears as a grant target.
    pub owner_id: PrincipalId,
}

impl Resource {
    pub fn new(id: impl Into<ResourceId>, owner_id: impl Into<PrincipalId>) -> Self {
        Self { id: id.into(), owner_id: owner_id.into() }
    }

    pub fn is_owned_by(&self, principal: &str) -> bool {
        self.owner_id == principal
    }
}

/// Access granted by a resource's owner to another principal.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Grant {
    pub resource_id: ResourceId,
    /// Owner who issued the grant.
    pub granted_by: PrincipalId,
    /// Principal receiving access.
    pub principal_id: PrincipalId,
    pub level: AccessLevel,
    /// Epoch milliseconds of the latest share; refreshed on re-share.
    pub granted_at: u64,
}

impl Grant {
    /// Natural key: at most one grant exists per pair.
    pub fn key(&self) -> (&str, &str) {
        (&self.resource_id, &self.principal_id)
    }
}
