use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

use crate::model::employee::EmployeeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum CallerRole {
    Admin,
    Hr,
    Employee,
}

/// Authenticated caller identity, as asserted by the fronting gateway.
///
/// Session mechanics live outside this engine; the gateway terminates
/// authentication and forwards the verified identity in trusted headers:
/// `X-Caller-Id`, `X-Caller-Role` and, for employee-linked callers,
/// `X-Employee-Id`.
pub struct Caller {
    pub user_id: u64,
    pub role: CallerRole,

    /// Present only if this caller is linked to an employee record
    pub employee_id: Option<EmployeeRef>,
}

impl FromRequest for Caller {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(str::to_owned)
        };

        let Some(user_id) = header("X-Caller-Id").and_then(|v| v.parse::<u64>().ok()) else {
            return ready(Err(ErrorUnauthorized("Missing or malformed X-Caller-Id")));
        };
        let Some(role) = header("X-Caller-Role").and_then(|v| v.parse::<CallerRole>().ok()) else {
            return ready(Err(ErrorUnauthorized("Missing or malformed X-Caller-Role")));
        };
        let employee_id = match header("X-Employee-Id") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(id) => Some(EmployeeRef(id)),
                Err(_) => return ready(Err(ErrorUnauthorized("Malformed X-Employee-Id"))),
            },
            None => None,
        };

        ready(Ok(Caller {
            user_id,
            role,
            employee_id,
        }))
    }
}

impl Caller {
    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == CallerRole::Admin {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if matches!(self.role, CallerRole::Admin | CallerRole::Hr) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("HR/Admin only"))
        }
    }

    /// Employee identity for self-service operations.
    pub fn employee_ref(&self) -> actix_web::Result<EmployeeRef> {
        self.employee_id
            .ok_or_else(|| actix_web::error::ErrorForbidden("No employee profile"))
    }

    /// Attribution string recorded on decisions.
    pub fn attribution(&self) -> String {
        format!("{}:{}", self.role, self.user_id)
    }
}
