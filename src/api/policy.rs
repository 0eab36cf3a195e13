use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::identity::Caller;
use crate::model::policy::{Policy, PolicyRules, PolicyScope, ScopeType};
use crate::state::AppState;

#[derive(Deserialize, ToSchema)]
#[schema(example = json!({
    "name": "head office default",
    "scope_type": "organization",
    "scope_target": null,
    "rules": {
        "required_daily_hours": 9.0,
        "max_idle_gap_minutes": 45,
        "auto_checkout_after_hours": 12,
        "timezone": "Asia/Dhaka",
        "working_days": ["Mon", "Tue", "Wed", "Thu", "Fri"],
        "leave_entitlements": { "annual": 20, "sick": 10 }
    }
}))]
pub struct CreatePolicy {
    #[schema(example = "head office default")]
    pub name: String,
    pub scope_type: ScopeType,
    /// Required for every scope except organization
    #[schema(example = json!(null), nullable = true)]
    pub scope_target: Option<u64>,
    pub rules: PolicyRules,
}

#[derive(Serialize, ToSchema)]
pub struct PolicyResponse {
    pub id: Uuid,
    #[schema(example = "head office default")]
    pub name: String,
    pub scope_type: ScopeType,
    #[schema(example = json!(null), nullable = true)]
    pub scope_target: Option<u64>,
    pub rules: PolicyRules,
}

impl From<Policy> for PolicyResponse {
    fn from(policy: Policy) -> Self {
        Self {
            id: policy.id,
            name: policy.name,
            scope_type: policy.scope.scope_type(),
            scope_target: policy.scope.target(),
            rules: policy.rules,
        }
    }
}

/// Create a policy for a free scope (admin)
#[utoipa::path(
    post,
    path = "/api/v1/policy",
    request_body = CreatePolicy,
    responses(
        (status = 200, description = "Policy created", body = PolicyResponse),
        (status = 400, description = "Invalid rules or occupied scope"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Policy"
)]
pub async fn create_policy(
    caller: Caller,
    state: web::Data<AppState>,
    payload: web::Json<CreatePolicy>,
) -> actix_web::Result<impl Responder> {
    caller.require_admin()?;
    let payload = payload.into_inner();

    let scope = PolicyScope::from_parts(payload.scope_type, payload.scope_target)?;
    let policy = state
        .policies
        .create(payload.name, scope, payload.rules)
        .await?;
    // New assignments must be visible to the very next resolution.
    state.resolver.invalidate_for_write(scope).await;

    tracing::info!(policy_id = %policy.id, ?scope, "policy created");
    Ok(HttpResponse::Ok().json(PolicyResponse::from(policy)))
}

/// List all policies (admin/HR)
#[utoipa::path(
    get,
    path = "/api/v1/policy",
    responses(
        (status = 200, description = "All policies", body = [PolicyResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Policy"
)]
pub async fn list_policies(
    caller: Caller,
    state: web::Data<AppState>,
) -> actix_web::Result<impl Responder> {
    caller.require_hr_or_admin()?;
    let policies: Vec<PolicyResponse> = state
        .policies
        .list()
        .await
        .into_iter()
        .map(PolicyResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(policies))
}

#[derive(Deserialize, ToSchema)]
pub struct AssignPolicy {
    pub policy_id: Uuid,
    pub scope_type: ScopeType,
    #[schema(example = 7, nullable = true)]
    pub scope_target: Option<u64>,
}

/// Re-scope an existing policy (admin)
#[utoipa::path(
    post,
    path = "/api/v1/policy/assign",
    request_body = AssignPolicy,
    responses(
        (status = 200, description = "Policy reassigned", body = PolicyResponse),
        (status = 400, description = "Occupied target scope"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Policy not found")
    ),
    tag = "Policy"
)]
pub async fn assign_policy(
    caller: Caller,
    state: web::Data<AppState>,
    payload: web::Json<AssignPolicy>,
) -> actix_web::Result<impl Responder> {
    caller.require_admin()?;
    let payload = payload.into_inner();

    let new_scope = PolicyScope::from_parts(payload.scope_type, payload.scope_target)?;
    let old_scope = state.policies.get(payload.policy_id).await.map(|p| p.scope);
    let policy = state.policies.assign(payload.policy_id, new_scope).await?;

    // Both the vacated and the newly covered scope change resolutions; the
    // cache must not serve either stale result once this request returns.
    if let Some(old) = old_scope {
        state.resolver.invalidate_for_write(old).await;
    }
    state.resolver.invalidate_for_write(new_scope).await;

    tracing::info!(policy_id = %policy.id, ?new_scope, "policy reassigned");
    Ok(HttpResponse::Ok().json(PolicyResponse::from(policy)))
}
