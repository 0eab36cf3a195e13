use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::employee::EmployeeRef;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Unpaid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

/// A leave request over an inclusive date range.
///
/// No two pending-or-approved requests for one employee may overlap.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LeaveRequest {
    pub id: Uuid,
    pub employee: EmployeeRef,
    pub leave_type: LeaveType,
    #[schema(format = "date", value_type = String, example = "2024-01-10")]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = String, example = "2024-01-12")]
    pub end_date: NaiveDate,
    #[schema(example = 3)]
    pub total_days: i64,
    pub status: LeaveStatus,
    pub reason: String,
    pub decided_by: Option<String>,
    #[schema(format = "date-time", value_type = String, nullable = true)]
    pub decided_at: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl LeaveRequest {
    /// Inclusive range intersection.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && start <= self.end_date
    }
}

/// Balance view for one leave type; derived from the ledger, never stored.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "leave_type": "annual",
    "total_days": 20,
    "used_days": 5,
    "pending_days": 2,
    "remaining": 13
}))]
pub struct LeaveBalance {
    pub leave_type: LeaveType,
    pub total_days: i64,
    pub used_days: i64,
    pub pending_days: i64,
    pub remaining: i64,
}
