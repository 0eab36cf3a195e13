use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::model::policy::{Policy, PolicyRules, PolicyScope};

/// Persistence of policy definitions and their assignment scope.
/// Pure data access: precedence logic lives in the resolver.
pub struct PolicyStore {
    policies: RwLock<HashMap<Uuid, Policy>>,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self {
            policies: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a policy. At most one policy may exist per scope; a second
    /// definition for an occupied scope is refused.
    pub async fn create(
        &self,
        name: String,
        scope: PolicyScope,
        rules: PolicyRules,
    ) -> EngineResult<Policy> {
        rules.validate()?;
        if name.trim().is_empty() {
            return Err(EngineError::Validation("policy name must not be empty".into()));
        }

        let mut policies = self.policies.write().await;
        if policies.values().any(|p| p.scope == scope) {
            return Err(EngineError::Validation(
                "a policy already exists for this scope; use assign to re-scope".into(),
            ));
        }
        let policy = Policy {
            id: Uuid::new_v4(),
            name,
            scope,
            rules,
        };
        policies.insert(policy.id, policy.clone());
        Ok(policy)
    }

    /// Moves an existing policy to a new scope. Refused when another policy
    /// already occupies the target scope.
    pub async fn assign(&self, policy_id: Uuid, scope: PolicyScope) -> EngineResult<Policy> {
        let mut policies = self.policies.write().await;
        if policies
            .values()
            .any(|p| p.scope == scope && p.id != policy_id)
        {
            return Err(EngineError::Validation(
                "another policy already occupies the target scope".into(),
            ));
        }
        let policy = policies
            .get_mut(&policy_id)
            .ok_or_else(|| EngineError::NotFound(format!("policy {policy_id} not found")))?;
        policy.scope = scope;
        Ok(policy.clone())
    }

    pub async fn find_by_scope(&self, scope: PolicyScope) -> Option<Policy> {
        self.policies
            .read()
            .await
            .values()
            .find(|p| p.scope == scope)
            .cloned()
    }

    pub async fn get(&self, policy_id: Uuid) -> Option<Policy> {
        self.policies.read().await.get(&policy_id).cloned()
    }

    pub async fn list(&self) -> Vec<Policy> {
        let mut all: Vec<Policy> = self.policies.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}
