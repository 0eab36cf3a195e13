use crate::api::attendance::DaySnapshot;
use crate::api::directory::UpsertDirectoryEntry;
use crate::api::leave::CreateLeave;
use crate::api::policy::{AssignPolicy, CreatePolicy, PolicyResponse};
use crate::api::regularization::{DecideRegularization, SubmitRegularization};
use crate::engine::leave_ledger::LeaveDecision;
use crate::engine::regularization::Decision;
use crate::model::attendance::{DayStatus, Shift};
use crate::model::employee::{EmployeeRef, EmployeeScope};
use crate::model::leave::{LeaveBalance, LeaveRequest, LeaveStatus, LeaveType};
use crate::model::policy::{PolicyRules, ScopeType};
use crate::model::regularization::{ProposedShift, RegularizationRequest, RequestStatus};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Engine API",
        version = "1.0.0",
        description = r#"
## Attendance, Policy-Resolution & Leave-Accounting Engine

The stateful core behind an HR platform: it turns raw check-in/check-out
events into worked-hours records, evaluates them against hierarchically
resolved attendance policies, drives the regularization approval workflow
for days that fall short, and keeps the leave-balance ledger consistent.

### 🔹 Key Features
- **Attendance Tracking**
  - Multiple check-in/check-out cycles per day, idle-gap advisories,
    automatic checkout at the policy ceiling and at day boundaries
- **Policy Resolution**
  - One effective policy per employee by scope precedence
    (user > department > role > organization), cached until reassignment
- **Regularization**
  - Auto-created and manual correction requests with an approval lifecycle
- **Leave Accounting**
  - Overlap-free requests, entitlement-checked balances, approved leave
    exempting covered days from regularization

### 📦 Response Format
- JSON-based RESTful responses
- Timestamps are RFC3339 instants; dates are interpreted in the effective
  policy's timezone

---
Built with **Rust**, **Actix Web**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::report,

        crate::api::policy::create_policy,
        crate::api::policy::list_policies,
        crate::api::policy::assign_policy,

        crate::api::regularization::submit,
        crate::api::regularization::pending,
        crate::api::regularization::decide,

        crate::api::leave::request_leave,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,
        crate::api::leave::balance,

        crate::api::directory::upsert_entry
    ),
    components(
        schemas(
            DaySnapshot,
            DayStatus,
            Shift,
            EmployeeRef,
            EmployeeScope,
            CreatePolicy,
            AssignPolicy,
            PolicyResponse,
            PolicyRules,
            ScopeType,
            SubmitRegularization,
            DecideRegularization,
            Decision,
            ProposedShift,
            RegularizationRequest,
            RequestStatus,
            CreateLeave,
            LeaveDecision,
            LeaveRequest,
            LeaveBalance,
            LeaveStatus,
            LeaveType,
            UpsertDirectoryEntry
        )
    ),
    tags(
        (name = "Attendance", description = "Check-in/check-out and reporting APIs"),
        (name = "Policy", description = "Policy definition and assignment APIs"),
        (name = "Regularization", description = "Attendance correction workflow APIs"),
        (name = "Leave", description = "Leave lifecycle and balance APIs"),
        (name = "Directory", description = "Employee directory seeding APIs"),
    )
)]
pub struct ApiDoc;
