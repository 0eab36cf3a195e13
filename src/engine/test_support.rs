use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::directory::{DirectoryRetry, InMemoryDirectory};
use crate::engine::attendance_store::AttendanceStore;
use crate::engine::leave_ledger::LeaveLedger;
use crate::engine::policy_resolver::PolicyResolver;
use crate::engine::policy_store::PolicyStore;
use crate::engine::regularization::RegularizationWorkflow;
use crate::engine::shift_tracker::ShiftTracker;
use crate::model::employee::{EmployeeRef, EmployeeScope};
use crate::model::leave::LeaveType;
use crate::model::policy::{PolicyRules, PolicyScope};

pub fn ts(s: &str) -> DateTime<Utc> {
    s.parse().expect("test timestamp")
}

pub fn d(s: &str) -> NaiveDate {
    s.parse().expect("test date")
}

/// UTC rules with every weekday working, so scenario dates never collide
/// with a weekend exemption.
pub fn org_rules(required_daily_hours: f64) -> PolicyRules {
    PolicyRules {
        required_daily_hours,
        max_idle_gap_minutes: 45,
        auto_checkout_after_hours: 12,
        timezone: "UTC".into(),
        working_days: ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]
            .into_iter()
            .map(String::from)
            .collect(),
        leave_entitlements: HashMap::from([(LeaveType::Annual, 20), (LeaveType::Sick, 10)]),
    }
}

pub async fn seed_directory(entries: &[(u64, u64, u64)]) -> Arc<InMemoryDirectory> {
    let directory = Arc::new(InMemoryDirectory::new());
    for &(employee, role_id, department_id) in entries {
        directory
            .upsert(
                EmployeeRef(employee),
                EmployeeScope {
                    role_id,
                    department_id,
                },
            )
            .await;
    }
    directory
}

pub struct EngineFixture {
    pub policies: Arc<PolicyStore>,
    pub resolver: Arc<PolicyResolver>,
    pub attendance: Arc<AttendanceStore>,
    pub workflow: Arc<RegularizationWorkflow>,
    pub tracker: Arc<ShiftTracker>,
    pub ledger: Arc<LeaveLedger>,
}

/// Full engine over one organization-wide policy, with employee 7
/// (role 3, department 10) seeded in the directory.
pub async fn engine_with_org_policy(rules: PolicyRules) -> EngineFixture {
    let policies = Arc::new(PolicyStore::new());
    policies
        .create("org default".into(), PolicyScope::Organization, rules)
        .await
        .expect("org policy");

    let directory = seed_directory(&[(7, 3, 10), (8, 3, 10)]).await;
    let resolver = Arc::new(PolicyResolver::new(
        policies.clone(),
        directory,
        DirectoryRetry::default(),
    ));
    let attendance = Arc::new(AttendanceStore::new());
    let workflow = Arc::new(RegularizationWorkflow::new(attendance.clone()));
    let tracker = Arc::new(ShiftTracker::new(
        attendance.clone(),
        resolver.clone(),
        workflow.clone(),
    ));
    let ledger = Arc::new(LeaveLedger::new(resolver.clone(), attendance.clone()));

    EngineFixture {
        policies,
        resolver,
        attendance,
        workflow,
        tracker,
        ledger,
    }
}
