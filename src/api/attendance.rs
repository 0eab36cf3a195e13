use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::identity::Caller;
use crate::model::attendance::{AttendanceDay, DayStatus, Shift};
use crate::model::employee::EmployeeRef;
use crate::state::AppState;

/// Attendance day as returned to collaborators. Worked time is rounded to
/// two decimal hours here and nowhere earlier.
#[derive(Serialize, ToSchema)]
#[schema(example = json!({
    "employee_id": 7,
    "date": "2024-03-04",
    "status": "ACTIVE",
    "shifts": [{ "check_in": "2024-03-04T09:00:00Z", "check_out": null }],
    "total_worked_hours": 0.0,
    "leave_covered": false,
    "idle_flagged": false
}))]
pub struct DaySnapshot {
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = "2024-03-04", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub status: DayStatus,
    pub shifts: Vec<Shift>,
    #[schema(example = 7.5)]
    pub total_worked_hours: f64,
    pub leave_covered: bool,
    pub idle_flagged: bool,
}

impl From<AttendanceDay> for DaySnapshot {
    fn from(day: AttendanceDay) -> Self {
        Self {
            employee_id: day.employee.0,
            date: day.date,
            status: day.status,
            total_worked_hours: day.worked_hours(),
            leave_covered: day.leave_covered,
            idle_flagged: day.idle_flagged,
            shifts: day.shifts,
        }
    }
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    responses(
        (status = 200, description = "Checked in; current day snapshot", body = DaySnapshot),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Already checked in", body = Object, example = json!({
            "message": "employee 7 already has an active shift"
        }))
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    caller: Caller,
    state: web::Data<AppState>,
) -> actix_web::Result<impl Responder> {
    let employee = caller.employee_ref()?;
    let day = state.tracker.check_in(employee, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(DaySnapshot::from(day)))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-out",
    responses(
        (status = 200, description = "Checked out; current day snapshot", body = DaySnapshot),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "No active shift", body = Object, example = json!({
            "message": "employee 7 has no active shift"
        }))
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    caller: Caller,
    state: web::Data<AppState>,
) -> actix_web::Result<impl Responder> {
    let employee = caller.employee_ref()?;
    let day = state.tracker.check_out(employee, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(DaySnapshot::from(day)))
}

#[derive(Deserialize, IntoParams)]
pub struct ReportQuery {
    /// Limit to one employee; HR/admin may omit for the whole organization
    #[param(example = 7)]
    pub employee_id: Option<u64>,
    #[param(example = "2024-03-01")]
    pub from: NaiveDate,
    #[param(example = "2024-03-31")]
    pub to: NaiveDate,
}

/// Read-only attendance projection for dashboards
#[utoipa::path(
    get,
    path = "/api/v1/attendance/report",
    params(ReportQuery),
    responses(
        (status = 200, description = "Attendance days in range", body = [DaySnapshot]),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Attendance"
)]
pub async fn report(
    caller: Caller,
    state: web::Data<AppState>,
    query: web::Query<ReportQuery>,
) -> actix_web::Result<impl Responder> {
    if query.from > query.to {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "from cannot be after to"
        })));
    }

    // Employees may only read their own record.
    let scope = match query.employee_id.map(EmployeeRef) {
        Some(employee) => {
            if caller.require_hr_or_admin().is_err() && caller.employee_ref()? != employee {
                return Err(actix_web::error::ErrorForbidden("Own record only"));
            }
            Some(employee)
        }
        None => {
            caller.require_hr_or_admin()?;
            None
        }
    };

    let days = state.attendance.range(scope, query.from, query.to).await;
    let snapshots: Vec<DaySnapshot> = days.into_iter().map(DaySnapshot::from).collect();
    Ok(HttpResponse::Ok().json(snapshots))
}
