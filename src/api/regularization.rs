use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::engine::regularization::Decision;
use crate::identity::Caller;
use crate::model::regularization::ProposedShift;
use crate::state::AppState;

#[derive(Deserialize, ToSchema)]
#[schema(example = json!({
    "date": "2024-03-04",
    "reason": "badge reader was down",
    "proposed_changes": [
        { "check_in": "2024-03-04T09:00:00Z", "check_out": "2024-03-04T18:00:00Z" }
    ]
}))]
pub struct SubmitRegularization {
    #[schema(example = "2024-03-04", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "badge reader was down")]
    pub reason: String,
    pub proposed_changes: Vec<ProposedShift>,
}

/// Manual regularization request for one day
#[utoipa::path(
    post,
    path = "/api/v1/regularization",
    request_body = SubmitRegularization,
    responses(
        (status = 200, description = "Request filed", body = crate::model::regularization::RegularizationRequest),
        (status = 400, description = "Malformed proposal"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "A pending request already exists for this day")
    ),
    tag = "Regularization"
)]
pub async fn submit(
    caller: Caller,
    state: web::Data<AppState>,
    payload: web::Json<SubmitRegularization>,
) -> actix_web::Result<impl Responder> {
    let employee = caller.employee_ref()?;
    let payload = payload.into_inner();
    let request = state
        .workflow
        .submit(employee, payload.date, payload.reason, payload.proposed_changes)
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

/// Approval queue (HR/Admin)
#[utoipa::path(
    get,
    path = "/api/v1/regularization/pending",
    responses(
        (status = 200, description = "Pending requests, oldest first",
         body = [crate::model::regularization::RegularizationRequest]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Regularization"
)]
pub async fn pending(
    caller: Caller,
    state: web::Data<AppState>,
) -> actix_web::Result<impl Responder> {
    caller.require_hr_or_admin()?;
    Ok(HttpResponse::Ok().json(state.workflow.pending().await))
}

#[derive(Deserialize, ToSchema)]
#[schema(example = json!({
    "decision": "approve",
    "proposed_changes": null
}))]
pub struct DecideRegularization {
    pub decision: Decision,
    /// Optional override of the requester's proposal
    #[serde(default)]
    pub proposed_changes: Option<Vec<ProposedShift>>,
}

/// Decide a pending request (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/v1/regularization/{id}/decision",
    params(("id" = Uuid, Path, description = "Regularization request id")),
    request_body = DecideRegularization,
    responses(
        (status = 200, description = "Request decided", body = crate::model::regularization::RegularizationRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Not pending, or proposal overlaps")
    ),
    tag = "Regularization"
)]
pub async fn decide(
    caller: Caller,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    payload: web::Json<DecideRegularization>,
) -> actix_web::Result<impl Responder> {
    caller.require_hr_or_admin()?;
    let request_id = path.into_inner();
    let payload = payload.into_inner();

    let request = state
        .workflow
        .decide(
            request_id,
            payload.decision,
            payload.proposed_changes,
            caller.attribution(),
        )
        .await?;
    tracing::info!(%request_id, status = %request.status, "regularization decided");
    Ok(HttpResponse::Ok().json(request))
}
