use actix_web::{HttpResponse, http::StatusCode};
use thiserror::Error;

use crate::model::employee::EmployeeRef;

/// Engine-wide error taxonomy.
///
/// Validation errors are rejected before any mutation. State-conflict errors
/// mean the operation was refused and the caller must reconcile and retry with
/// corrected intent; they are never resolved by blind retry. `NoPolicyConfigured`
/// is a deployment defect, not a user error. `DirectoryUnavailable` is the
/// retryable surface of a collaborator that timed out past its retry budget.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),

    #[error("employee {0} already has an active shift")]
    AlreadyActive(EmployeeRef),

    #[error("employee {0} has no active shift")]
    NoActiveShift(EmployeeRef),

    #[error("request is not pending")]
    InvalidTransition,

    #[error("proposed shifts overlap or are out of order")]
    OverlappingShifts,

    #[error("leave range overlaps an existing pending or approved request")]
    OverlappingLeave,

    #[error("insufficient leave balance: {available} day(s) available, {requested} requested")]
    InsufficientBalance { available: i64, requested: i64 },

    #[error("a pending regularization request already exists for {employee} on {date}")]
    PendingRegularizationExists {
        employee: EmployeeRef,
        date: chrono::NaiveDate,
    },

    #[error("day {date} is closed for employee {employee}; corrections go through regularization")]
    DayClosed {
        employee: EmployeeRef,
        date: chrono::NaiveDate,
    },

    #[error("no policy configured for employee {0}; an organization-wide default must exist")]
    NoPolicyConfigured(EmployeeRef),

    #[error("directory lookup failed: {0}")]
    DirectoryUnavailable(String),

    #[error("{0}")]
    NotFound(String),
}

impl EngineError {
    fn status(&self) -> StatusCode {
        match self {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::AlreadyActive(_)
            | EngineError::NoActiveShift(_)
            | EngineError::InvalidTransition
            | EngineError::OverlappingShifts
            | EngineError::OverlappingLeave
            | EngineError::InsufficientBalance { .. }
            | EngineError::PendingRegularizationExists { .. }
            | EngineError::DayClosed { .. } => StatusCode::CONFLICT,
            EngineError::NoPolicyConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EngineError::DirectoryUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl actix_web::ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        if self.status() == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "engine failure");
        }
        HttpResponse::build(self.status()).json(serde_json::json!({
            "message": self.to_string()
        }))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
