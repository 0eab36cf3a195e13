use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::identity::Caller;
use crate::model::employee::{EmployeeRef, EmployeeScope};
use crate::state::AppState;

#[derive(Deserialize, ToSchema)]
#[schema(example = json!({ "employee_id": 7, "role_id": 3, "department_id": 10 }))]
pub struct UpsertDirectoryEntry {
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = 3)]
    pub role_id: u64,
    #[schema(example = 10)]
    pub department_id: u64,
}

/// Seed or update the in-process employee directory (admin)
#[utoipa::path(
    post,
    path = "/api/v1/directory",
    request_body = UpsertDirectoryEntry,
    responses(
        (status = 200, description = "Entry stored", body = Object, example = json!({
            "message": "Directory entry stored"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Directory"
)]
pub async fn upsert_entry(
    caller: Caller,
    state: web::Data<AppState>,
    payload: web::Json<UpsertDirectoryEntry>,
) -> actix_web::Result<impl Responder> {
    caller.require_admin()?;
    let payload = payload.into_inner();
    let employee = EmployeeRef(payload.employee_id);

    state
        .directory
        .upsert(
            employee,
            EmployeeScope {
                role_id: payload.role_id,
                department_id: payload.department_id,
            },
        )
        .await;
    // Scope moves change which department/role policies apply.
    state
        .resolver
        .invalidate_for_write(crate::model::policy::PolicyScope::User(employee))
        .await;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Directory entry stored"
    })))
}
