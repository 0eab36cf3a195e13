use std::sync::Arc;

use moka::future::Cache;

use crate::directory::{DirectoryRetry, EmployeeDirectory, lookup_scope};
use crate::error::{EngineError, EngineResult};
use crate::model::employee::EmployeeRef;
use crate::model::policy::{EffectivePolicy, PolicyScope};

/// Resolves the single effective policy for an employee by scope precedence:
/// User > Department > Role > Organization.
///
/// Resolution is pure per employee until an assignment changes, so results
/// are cached and invalidated by assignment writes, never by time.
pub struct PolicyResolver {
    store: Arc<crate::engine::policy_store::PolicyStore>,
    directory: Arc<dyn EmployeeDirectory>,
    retry: DirectoryRetry,
    cache: Cache<EmployeeRef, EffectivePolicy>,
}

impl PolicyResolver {
    pub fn new(
        store: Arc<crate::engine::policy_store::PolicyStore>,
        directory: Arc<dyn EmployeeDirectory>,
        retry: DirectoryRetry,
    ) -> Self {
        Self {
            store,
            directory,
            retry,
            cache: Cache::builder().max_capacity(100_000).build(),
        }
    }

    /// Returns the effective policy for the employee.
    ///
    /// Fails with `NoPolicyConfigured` only when even the organization-wide
    /// default is missing, which is a deployment defect.
    pub async fn resolve(&self, employee: EmployeeRef) -> EngineResult<EffectivePolicy> {
        if let Some(hit) = self.cache.get(&employee).await {
            return Ok(hit);
        }

        let scope = lookup_scope(self.directory.as_ref(), employee, self.retry).await?;

        let candidates = [
            PolicyScope::User(employee),
            PolicyScope::Department(scope.department_id),
            PolicyScope::Role(scope.role_id),
            PolicyScope::Organization,
        ];

        for candidate in candidates {
            if let Some(policy) = self.store.find_by_scope(candidate).await {
                let effective = EffectivePolicy::from_policy(&policy);
                self.cache.insert(employee, effective.clone()).await;
                return Ok(effective);
            }
        }

        Err(EngineError::NoPolicyConfigured(employee))
    }

    /// Synchronous-from-the-caller's-view invalidation after an assignment
    /// write. Scoped writes that cannot be attributed to a single employee
    /// (role/department/organization) flush the whole cache: correctness over
    /// hit rate.
    pub async fn invalidate_for_write(&self, scope: PolicyScope) {
        match scope {
            PolicyScope::User(employee) => self.cache.invalidate(&employee).await,
            _ => self.cache.invalidate_all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{org_rules, seed_directory};
    use crate::engine::policy_store::PolicyStore;

    async fn fixture() -> (Arc<PolicyStore>, PolicyResolver) {
        let store = Arc::new(PolicyStore::new());
        let directory = seed_directory(&[(7, 3, 10)]).await;
        let resolver = PolicyResolver::new(store.clone(), directory, DirectoryRetry::default());
        (store, resolver)
    }

    #[tokio::test]
    async fn user_scope_overrides_organization() {
        let (store, resolver) = fixture().await;
        store
            .create("org".into(), PolicyScope::Organization, org_rules(9.0))
            .await
            .unwrap();
        store
            .create(
                "special".into(),
                PolicyScope::User(EmployeeRef(7)),
                org_rules(6.0),
            )
            .await
            .unwrap();

        let effective = resolver.resolve(EmployeeRef(7)).await.unwrap();
        assert_eq!(effective.name, "special");
        assert_eq!(effective.rules.required_daily_hours, 6.0);
    }

    #[tokio::test]
    async fn department_beats_role() {
        let (store, resolver) = fixture().await;
        store
            .create("org".into(), PolicyScope::Organization, org_rules(9.0))
            .await
            .unwrap();
        store
            .create("role".into(), PolicyScope::Role(3), org_rules(8.0))
            .await
            .unwrap();
        store
            .create("dept".into(), PolicyScope::Department(10), org_rules(7.0))
            .await
            .unwrap();

        let effective = resolver.resolve(EmployeeRef(7)).await.unwrap();
        assert_eq!(effective.name, "dept");
    }

    #[tokio::test]
    async fn missing_org_default_is_a_deployment_error() {
        let (_store, resolver) = fixture().await;
        let err = resolver.resolve(EmployeeRef(7)).await.unwrap_err();
        assert!(matches!(err, EngineError::NoPolicyConfigured(_)));
    }

    #[tokio::test]
    async fn reassignment_is_visible_to_the_next_resolution() {
        let (store, resolver) = fixture().await;
        store
            .create("org".into(), PolicyScope::Organization, org_rules(9.0))
            .await
            .unwrap();
        let user_scope = PolicyScope::User(EmployeeRef(7));
        let special = store
            .create("special".into(), user_scope, org_rules(6.0))
            .await
            .unwrap();
        assert_eq!(resolver.resolve(EmployeeRef(7)).await.unwrap().name, "special");

        // Move the policy to a role nobody holds: employee 7 must fall back
        // to the org default as soon as the write returns.
        let parked = PolicyScope::Role(99);
        store.assign(special.id, parked).await.unwrap();
        resolver.invalidate_for_write(user_scope).await;
        resolver.invalidate_for_write(parked).await;
        assert_eq!(resolver.resolve(EmployeeRef(7)).await.unwrap().name, "org");

        // And back again.
        store.assign(special.id, user_scope).await.unwrap();
        resolver.invalidate_for_write(parked).await;
        resolver.invalidate_for_write(user_scope).await;
        assert_eq!(resolver.resolve(EmployeeRef(7)).await.unwrap().name, "special");
    }

    #[tokio::test]
    async fn assigning_onto_an_occupied_scope_is_refused() {
        let (store, _resolver) = fixture().await;
        store
            .create("org".into(), PolicyScope::Organization, org_rules(9.0))
            .await
            .unwrap();
        let role = store
            .create("role".into(), PolicyScope::Role(3), org_rules(8.0))
            .await
            .unwrap();

        let err = store
            .assign(role.id, PolicyScope::Organization)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        // The refused move leaves the policy where it was.
        assert_eq!(store.get(role.id).await.unwrap().scope, PolicyScope::Role(3));
    }

    #[tokio::test]
    async fn assignment_write_invalidates_cache() {
        let (store, resolver) = fixture().await;
        store
            .create("org".into(), PolicyScope::Organization, org_rules(9.0))
            .await
            .unwrap();
        let first = resolver.resolve(EmployeeRef(7)).await.unwrap();
        assert_eq!(first.name, "org");

        // A user-scope policy appears; the stale cached resolution must not
        // survive the write.
        let user_scope = PolicyScope::User(EmployeeRef(7));
        store
            .create("special".into(), user_scope, org_rules(6.0))
            .await
            .unwrap();
        resolver.invalidate_for_write(user_scope).await;

        let second = resolver.resolve(EmployeeRef(7)).await.unwrap();
        assert_eq!(second.name, "special");
    }
}
