use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::engine::leave_ledger::LeaveDecision;
use crate::identity::Caller;
use crate::model::employee::EmployeeRef;
use crate::model::leave::LeaveType;
use crate::state::AppState;

#[derive(Deserialize, ToSchema)]
#[schema(example = json!({
    "leave_type": "annual",
    "start_date": "2024-01-10",
    "end_date": "2024-01-12",
    "reason": "family trip"
}))]
pub struct CreateLeave {
    pub leave_type: LeaveType,
    #[schema(example = "2024-01-10", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2024-01-12", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "family trip")]
    pub reason: String,
}

/// File a leave request
#[utoipa::path(
    post,
    path = "/api/v1/leave/request",
    request_body = CreateLeave,
    responses(
        (status = 200, description = "Request filed", body = crate::model::leave::LeaveRequest),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Overlapping leave or insufficient balance")
    ),
    tag = "Leave"
)]
pub async fn request_leave(
    caller: Caller,
    state: web::Data<AppState>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let employee = caller.employee_ref()?;
    let payload = payload.into_inner();
    let request = state
        .ledger
        .request_leave(
            employee,
            payload.leave_type,
            payload.start_date,
            payload.end_date,
            payload.reason,
        )
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

/// Approve a pending leave request (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/v1/leave/request/{id}/approve",
    params(("id" = Uuid, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Leave approved", body = crate::model::leave::LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already processed")
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> actix_web::Result<impl Responder> {
    caller.require_hr_or_admin()?;
    let request = state
        .ledger
        .decide(path.into_inner(), LeaveDecision::Approve, caller.attribution())
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

/// Reject a pending leave request (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/v1/leave/request/{id}/reject",
    params(("id" = Uuid, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Leave rejected", body = crate::model::leave::LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already processed")
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> actix_web::Result<impl Responder> {
    caller.require_hr_or_admin()?;
    let request = state
        .ledger
        .decide(path.into_inner(), LeaveDecision::Reject, caller.attribution())
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

/// Leave balances per entitled type
#[utoipa::path(
    get,
    path = "/api/v1/leave/balance/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Derived balances", body = [crate::model::leave::LeaveBalance]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Leave"
)]
pub async fn balance(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee = EmployeeRef(path.into_inner());
    // Employees may only read their own balance.
    if caller.require_hr_or_admin().is_err() && caller.employee_ref()? != employee {
        return Err(actix_web::error::ErrorForbidden("Own balance only"));
    }
    let balances = state.ledger.balance(employee).await?;
    Ok(HttpResponse::Ok().json(balances))
}
