use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::attendance::Shift;
use crate::model::employee::EmployeeRef;

pub const REASON_INSUFFICIENT_HOURS: &str = "insufficient hours";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// A closed replacement interval proposed for one shift of the day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProposedShift {
    #[schema(format = "date-time", value_type = String, example = "2024-03-04T09:00:00Z")]
    pub check_in: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String, example = "2024-03-04T18:00:00Z")]
    pub check_out: DateTime<Utc>,
}

impl From<ProposedShift> for Shift {
    fn from(p: ProposedShift) -> Self {
        Shift {
            check_in: p.check_in,
            check_out: Some(p.check_out),
        }
    }
}

/// A proposed correction to one day's recorded shifts, awaiting decision.
/// Exactly one pending request may exist per (employee, date).
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RegularizationRequest {
    pub id: Uuid,
    pub employee: EmployeeRef,
    #[schema(format = "date", value_type = String, example = "2024-03-04")]
    pub date: NaiveDate,
    pub reason: String,
    pub proposed_changes: Vec<ProposedShift>,
    pub status: RequestStatus,
    pub decided_by: Option<String>,
    #[schema(format = "date-time", value_type = String, nullable = true)]
    pub decided_at: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}
