use std::sync::Arc;

use tracing::{debug, info};

use crate::access::grant::{Grant, Resource};
use crate::access::level::{authorize, AccessLevel, Action, EffectiveAccess, EffectiveLevel};
use crate::access::store::AccessStore;
use crate::clock::{Clock, SystemClock};
use crate::error::AccessError;

type Result<T, E> = std::result::Result<T, AccessError<E>>;

/// Resolves what a principal may do with a resource and maintains the grant set.
///
/// Holds no locks of its own. The store is responsible for making
/// [`AccessStore::upsert_grant`] atomic.
#[derive(Debug)]
pub struct AccessResolver<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for AccessResolver<S> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), clock: self.clock.clone() }
    }
}

impl<S: AccessStore> AccessResolver<S> {
    pub fn new(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    pub fn from_shared(store: Arc<S>) -> Self {
        Self { store, clock: Arc::new(SystemClock) }
    }

    /// Stamp `granted_at` from a custom clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn load(&self, resource_id: &str) -> Result<Resource, S::Error> {
        self.store
            .resource(resource_id)
            .await
            .map_err(AccessError::Storage)?
            .ok_or(AccessError::ResourceNotFound)
    }

    async fn load_owned(&self, owner: &str, resource_id: &str) -> Result<Resource, S::Error> {
        let resource = self.load(resource_id).await?;
        if !resource.is_owned_by(owner) {
            debug!(
                target: "taskgate::access",
                principal = owner,
                resource = resource_id,
                "owner-only operation refused"
            );
            return Err(AccessError::NotOwner);
        }
        Ok(resource)
    }

    /// Relation of `principal` to an already-loaded resource.
    ///
    /// Ownership is decided before grants are consulted, so a stray grant held by the owner can
    /// never downgrade them.
    pub async fn effective_access(
        &self,
        resource: &Resource,
        principal: &str,
    ) -> Result<EffectiveAccess, S::Error> {
        if resource.is_owned_by(principal) {
            return Ok(EffectiveAccess::Owner);
        }
        match self.store.grant(&resource.id, principal).await.map_err(AccessError::Storage)? {
            Some(grant) => Ok(EffectiveAccess::Grant(grant.level)),
            None => Err(AccessError::AccessDenied),
        }
    }

    /// Flat level of `principal` on an already-loaded resource.
    pub async fn resolve_for(
        &self,
        resource: &Resource,
        principal: &str,
    ) -> Result<EffectiveLevel, S::Error> {
        self.effective_access(resource, principal).await.map(EffectiveAccess::level)
    }

    /// Flat level of `principal` on the resource with this id.
    pub async fn resolve_access_level(
        &self,
        principal: &str,
        resource_id: &str,
    ) -> Result<EffectiveLevel, S::Error> {
        let resource = self.load(resource_id).await?;
        self.resolve_for(&resource, principal).await
    }

    /// Resolve and check against the capability table in one step.
    pub async fn require(
        &self,
        principal: &str,
        resource_id: &str,
        action: Action,
    ) -> Result<EffectiveLevel, S::Error> {
        let level = self.resolve_access_level(principal, resource_id).await?;
        if authorize(level, action).is_allowed() {
            Ok(level)
        } else {
            debug!(
                target: "taskgate::access",
                principal,
                resource = resource_id,
                %level,
                %action,
                "action denied"
            );
            Err(AccessError::AccessDenied)
        }
    }

    /// Grant `target` access to a resource owned by `owner`, or change the level of an existing
    /// grant. Re-sharing refreshes `granted_at` and is never an error.
    pub async fn share_resource(
        &self,
        owner: &str,
        resource_id: &str,
        target: &str,
        level: AccessLevel,
    ) -> Result<Grant, S::Error> {
        let resource = self.load_owned(owner, resource_id).await?;
        if target == resource.owner_id {
            return Err(AccessError::SelfShare);
        }
        if !self.store.principal_exists(target).await.map_err(AccessError::Storage)? {
            return Err(AccessError::TargetNotFound);
        }

        let grant = Grant {
            resource_id: resource.id,
            granted_by: owner.to_owned(),
            principal_id: target.to_owned(),
            level,
            granted_at: self.clock.now_millis(),
        };
        let outcome = self.store.upsert_grant(grant).await.map_err(AccessError::Storage)?;
        info!(
            target: "taskgate::access",
            resource = resource_id,
            principal = target,
            %level,
            created = outcome.is_created(),
            "resource shared"
        );
        Ok(outcome.into_grant())
    }

    /// Remove `target`'s grant. Returns whether one existed.
    pub async fn revoke_access(
        &self,
        owner: &str,
        resource_id: &str,
        target: &str,
    ) -> Result<bool, S::Error> {
        self.load_owned(owner, resource_id).await?;
        let removed =
            self.store.delete_grant(resource_id, target).await.map_err(AccessError::Storage)?;
        if removed {
            info!(
                target: "taskgate::access",
                resource = resource_id,
                principal = target,
                "access revoked"
            );
        }
        Ok(removed)
    }

    /// Everyone the owner has shared the resource with, oldest grant first.
    pub async fn list_grants(&self, owner: &str, resource_id: &str) -> Result<Vec<Grant>, S::Error> {
        self.load_owned(owner, resource_id).await?;
        let mut grants =
            self.store.grants_for_resource(resource_id).await.map_err(AccessError::Storage)?;
        grants.sort_by(|a, b| {
            a.granted_at.cmp(&b.granted_at).then_with(|| a.principal_id.cmp(&b.principal_id))
        });
        Ok(grants)
    }

    /// Grants held by `principal`, newest first.
    pub async fn shared_with(&self, principal: &str) -> Result<Vec<Grant>, S::Error> {
        let mut grants =
            self.store.grants_for_principal(principal).await.map_err(AccessError::Storage)?;
        grants.sort_by(|a, b| {
            b.granted_at.cmp(&a.granted_at).then_with(|| a.resource_id.cmp(&b.resource_id))
        });
        Ok(grants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::store::InMemoryAccessStore;
    use crate::clock::ManualClock;

    async fn fixture() -> (AccessResolver<InMemoryAccessStore>, ManualClock) {
        let store = InMemoryAccessStore::new();
        store.insert_resource(Resource::new("t1", "alice")).await;
        store.insert_principal("bob").await;
        store.insert_principal("carol").await;
        let clock = ManualClock::starting_at(1_000);
        (AccessResolver::new(store).with_clock(clock.clone()), clock)
    }

    #[tokio::test]
    async fn owner_resolves_without_grant() {
        let (resolver, _) = fixture().await;
        let level = resolver.resolve_access_level("alice", "t1").await.unwrap();
        assert_eq!(level, EffectiveLevel::Owner);
    }

    #[tokio::test]
    async fn stranger_is_denied_and_missing_resource_is_not_found() {
        let (resolver, _) = fixture().await;
        assert_eq!(
            resolver.resolve_access_level("bob", "t1").await,
            Err(AccessError::AccessDenied)
        );
        assert_eq!(
            resolver.resolve_access_level("alice", "nope").await,
            Err(AccessError::ResourceNotFound)
        );
    }

    #[tokio::test]
    async fn stray_owner_grant_does_not_downgrade() {
        let (resolver, _) = fixture().await;
        resolver
            .store()
            .upsert_grant(Grant {
                resource_id: "t1".into(),
                granted_by: "alice".into(),
                principal_id: "alice".into(),
                level: AccessLevel::Viewer,
                granted_at: 0,
            })
            .await
            .unwrap();
        let level = resolver.resolve_access_level("alice", "t1").await.unwrap();
        assert_eq!(level, EffectiveLevel::Owner);
    }

    #[tokio::test]
    async fn share_checks_run_in_order() {
        let (resolver, _) = fixture().await;
        assert_eq!(
            resolver.share_resource("bob", "missing", "bob", AccessLevel::Viewer).await,
            Err(AccessError::ResourceNotFound)
        );
        assert_eq!(
            resolver.share_resource("bob", "t1", "bob", AccessLevel::Viewer).await,
            Err(AccessError::NotOwner)
        );
        assert_eq!(
            resolver.share_resource("alice", "t1", "alice", AccessLevel::Viewer).await,
            Err(AccessError::SelfShare)
        );
        assert_eq!(
            resolver.share_resource("alice", "t1", "zed", AccessLevel::Viewer).await,
            Err(AccessError::TargetNotFound)
        );
    }

    #[tokio::test]
    async fn reshare_updates_level_and_timestamp() {
        let (resolver, clock) = fixture().await;
        let first = resolver.share_resource("alice", "t1", "bob", AccessLevel::Viewer).await.unwrap();
        assert_eq!(first.granted_at, 1_000);

        clock.advance(500);
        let second =
            resolver.share_resource("alice", "t1", "bob", AccessLevel::Editor).await.unwrap();
        assert_eq!(second.level, AccessLevel::Editor);
        assert_eq!(second.granted_at, 1_500);
        assert_eq!(resolver.store().grant_count().await, 1);
        assert_eq!(
            resolver.resolve_access_level("bob", "t1").await.unwrap(),
            EffectiveLevel::Editor
        );
    }

    #[tokio::test]
    async fn require_applies_capability_table() {
        let (resolver, _) = fixture().await;
        resolver.share_resource("alice", "t1", "bob", AccessLevel::Editor).await.unwrap();
        assert!(resolver.require("bob", "t1", Action::Edit).await.is_ok());
        assert_eq!(
            resolver.require("bob", "t1", Action::Delete).await,
            Err(AccessError::AccessDenied)
        );
        assert_eq!(
            resolver.require("alice", "t1", Action::Delete).await,
            Ok(EffectiveLevel::Owner)
        );
    }

    #[tokio::test]
    async fn revoke_is_owner_only_and_idempotent() {
        let (resolver, _) = fixture().await;
        resolver.share_resource("alice", "t1", "bob", AccessLevel::Viewer).await.unwrap();
        assert_eq!(resolver.revoke_access("bob", "t1", "bob").await, Err(AccessError::NotOwner));
        assert_eq!(resolver.revoke_access("alice", "t1", "bob").await, Ok(true));
        assert_eq!(resolver.revoke_access("alice", "t1", "bob").await, Ok(false));
        assert_eq!(
            resolver.resolve_access_level("bob", "t1").await,
            Err(AccessError::AccessDenied)
        );
    }

    #[tokio::test]
    async fn listings_are_ordered() {
        let (resolver, clock) = fixture().await;
        resolver.store().insert_resource(Resource::new("t2", "alice")).await;
        resolver.share_resource("alice", "t1", "carol", AccessLevel::Viewer).await.unwrap();
        clock.advance(10);
        resolver.share_resource("alice", "t1", "bob", AccessLevel::Editor).await.unwrap();
        clock.advance(10);
        resolver.share_resource("alice", "t2", "bob", AccessLevel::Viewer).await.unwrap();

        let on_t1 = resolver.list_grants("alice", "t1").await.unwrap();
        let who: Vec<_> = on_t1.iter().map(|g| g.principal_id.as_str()).collect();
        assert_eq!(who, ["carol", "bob"]);
        assert_eq!(resolver.list_grants("bob", "t1").await, Err(AccessError::NotOwner));

        let mine = resolver.shared_with("bob").await.unwrap();
        let what: Vec<_> = mine.iter().map(|g| g.resource_id.as_str()).collect();
        assert_eq!(what, ["t2", "t1"]);
    }
}
