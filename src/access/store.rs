use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::access::grant::{Grant, PrincipalId, Resource, ResourceId};

/// Outcome of [`AccessStore::upsert_grant`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantUpsert {
    /// No grant existed for the pair.
    Created(Grant),
    /// The existing grant's level and timestamp were replaced.
    Updated(Grant),
}

impl GrantUpsert {
    pub fn is_created(&self) -> bool {
        matches!(self, GrantUpsert::Created(_))
    }

    pub fn grant(&self) -> &Grant {
        match self {
            GrantUpsert::Created(g) | GrantUpsert::Updated(g) => g,
        }
    }

    pub fn into_grant(self) -> Grant {
        match self {
            GrantUpsert::Created(g) | GrantUpsert::Updated(g) => g,
        }
    }
}

/// Abstract storage for ownership and sharing records.
///
/// Backed by a relational database in production; the only hard requirement is that
/// `upsert_grant` is atomic with respect to the (resource, principal) uniqueness rule, e.g. a
/// single `INSERT .. ON CONFLICT DO UPDATE`.
#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch a resource by id.
    async fn resource(&self, id: &str) -> Result<Option<Resource>, Self::Error>;

    /// Whether a principal with this id exists.
    async fn principal_exists(&self, id: &str) -> Result<bool, Self::Error>;

    /// Fetch the grant for a (resource, principal) pair.
    async fn grant(
        &self,
        resource_id: &str,
        principal_id: &str,
    ) -> Result<Option<Grant>, Self::Error>;

    /// Insert the grant, or replace level and `granted_at` of the existing one for the same pair.
    async fn upsert_grant(&self, grant: Grant) -> Result<GrantUpsert, Self::Error>;

    /// Remove the grant for a pair. Returns whether one existed.
    async fn delete_grant(&self, resource_id: &str, principal_id: &str)
        -> Result<bool, Self::Error>;

    /// All grants on a resource.
    async fn grants_for_resource(&self, resource_id: &str) -> Result<Vec<Grant>, Self::Error>;

    /// All grants held by a principal.
    async fn grants_for_principal(&self, principal_id: &str) -> Result<Vec<Grant>, Self::Error>;
}

#[derive(Debug, Default)]
struct State {
    principals: HashSet<PrincipalId>,
    resources: HashMap<ResourceId, Resource>,
    grants: HashMap<(ResourceId, PrincipalId), Grant>,
}

/// Simple in-memory access store. Clones share the same state.
#[derive(Default, Clone, Debug)]
pub struct InMemoryAccessStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryAccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_principal(&self, id: impl Into<PrincipalId>) {
        self.state.write().await.principals.insert(id.into());
    }

    /// Register a resource. Its owner is registered as a principal too.
    pub async fn insert_resource(&self, resource: Resource) {
        let mut state = self.state.write().await;
        state.principals.insert(resource.owner_id.clone());
        state.resources.insert(resource.id.clone(), resource);
    }

    /// Delete a resource together with every grant on it.
    pub async fn remove_resource(&self, id: &str) -> Option<Resource> {
        let mut state = self.state.write().await;
        let removed = state.resources.remove(id)?;
        state.grants.retain(|(resource_id, _), _| resource_id != id);
        Some(removed)
    }

    /// Total number of stored grants.
    pub async fn grant_count(&self) -> usize {
        self.state.read().await.grants.len()
    }
}

#[async_trait]
impl AccessStore for InMemoryAccessStore {
    type Error = std::convert::Infallible;

    async fn resource(&self, id: &str) -> Result<Option<Resource>, Self::Error> {
        Ok(self.state.read().await.resources.get(id).cloned())
    }

    async fn principal_exists(&self, id: &str) -> Result<bool, Self::Error> {
        Ok(self.state.read().await.principals.contains(id))
    }

    async fn grant(
        &self,
        resource_id: &str,
        principal_id: &str,
    ) -> Result<Option<Grant>, Self::Error> {
        let state = self.state.read().await;
        Ok(state.grants.get(&(resource_id.to_owned(), principal_id.to_owned())).cloned())
    }

    async fn upsert_grant(&self, grant: Grant) -> Result<GrantUpsert, Self::Error> {
        // check and write under one guard
        let mut state = self.state.write().await;
        let key = (grant.resource_id.clone(), grant.principal_id.clone());
        match state.grants.entry(key) {
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                existing.level = grant.level;
                existing.granted_at = grant.granted_at;
                existing.granted_by = grant.granted_by;
                Ok(GrantUpsert::Updated(existing.clone()))
            }
            Entry::Vacant(slot) => {
                slot.insert(grant.clone());
                Ok(GrantUpsert::Created(grant))
            }
        }
    }

    async fn delete_grant(
        &self,
        resource_id: &str,
        principal_id: &str,
    ) -> Result<bool, Self::Error> {
        let mut state = self.state.write().await;
        Ok(state.grants.remove(&(resource_id.to_owned(), principal_id.to_owned())).is_some())
    }

    async fn grants_for_resource(&self, resource_id: &str) -> Result<Vec<Grant>, Self::Error> {
        let state = self.state.read().await;
        Ok(state.grants.values().filter(|g| g.resource_id == resource_id).cloned().collect())
    }

    async fn grants_for_principal(&self, principal_id: &str) -> Result<Vec<Grant>, Self::Error> {
        let state = self.state.read().await;
        Ok(state.grants.values().filter(|g| g.principal_id == principal_id).cloned().collect())
    }
}
