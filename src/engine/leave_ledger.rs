use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::engine::attendance_store::AttendanceStore;
use crate::engine::policy_resolver::PolicyResolver;
use crate::error::{EngineError, EngineResult};
use crate::model::attendance::AttendanceDay;
use crate::model::employee::EmployeeRef;
use crate::model::leave::{LeaveBalance, LeaveRequest, LeaveStatus, LeaveType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeaveDecision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Copy, Default)]
struct Consumption {
    used_days: i64,
    pending_days: i64,
}

/// Authoritative leave-balance accounting.
///
/// Entitlement (`totalDays`) comes from the effective policy; only the
/// consumed portion is stored here. The invariant
/// `used + pending <= total` holds after every operation: days move from
/// pending to used on approval and are released from pending on rejection,
/// never double-counted.
pub struct LeaveLedger {
    requests: RwLock<HashMap<Uuid, LeaveRequest>>,
    consumed: RwLock<HashMap<(EmployeeRef, LeaveType), Consumption>>,
    locks: crate::utils::keyed_lock::KeyedLock<EmployeeRef>,
    resolver: Arc<PolicyResolver>,
    attendance: Arc<AttendanceStore>,
}

impl LeaveLedger {
    pub fn new(resolver: Arc<PolicyResolver>, attendance: Arc<AttendanceStore>) -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
            consumed: RwLock::new(HashMap::new()),
            locks: crate::utils::keyed_lock::KeyedLock::new(),
            resolver,
            attendance,
        }
    }

    /// Files a leave request over an inclusive date range.
    ///
    /// Overlap with any pending or approved request is refused before any
    /// balance mutation, as is a request exceeding the remaining balance.
    pub async fn request_leave(
        &self,
        employee: EmployeeRef,
        leave_type: LeaveType,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: String,
    ) -> EngineResult<LeaveRequest> {
        if start_date > end_date {
            return Err(EngineError::Validation(
                "start_date cannot be after end_date".into(),
            ));
        }
        let requested_days = (end_date - start_date).num_days() + 1;

        let _guard = self.locks.acquire(employee).await;

        {
            let requests = self.requests.read().await;
            let conflict = requests.values().any(|r| {
                r.employee == employee
                    && matches!(r.status, LeaveStatus::Pending | LeaveStatus::Approved)
                    && r.overlaps(start_date, end_date)
            });
            if conflict {
                return Err(EngineError::OverlappingLeave);
            }
        }

        let policy = self.resolver.resolve(employee).await?;
        let total = i64::from(policy.rules.entitlement(leave_type));
        let consumption = self.consumption(employee, leave_type).await;
        let available = total - consumption.used_days - consumption.pending_days;
        if available < requested_days {
            return Err(EngineError::InsufficientBalance {
                available,
                requested: requested_days,
            });
        }

        let request = LeaveRequest {
            id: Uuid::new_v4(),
            employee,
            leave_type,
            start_date,
            end_date,
            total_days: requested_days,
            status: LeaveStatus::Pending,
            reason,
            decided_by: None,
            decided_at: None,
            created_at: Utc::now(),
        };
        self.requests
            .write()
            .await
            .insert(request.id, request.clone());
        self.consumed
            .write()
            .await
            .entry((employee, leave_type))
            .or_default()
            .pending_days += requested_days;

        tracing::info!(%employee, %leave_type, days = requested_days, "leave requested");
        Ok(request)
    }

    /// Decides a pending request. Approval moves the day count from pending
    /// to used and marks the covered attendance dates leave-covered, which
    /// exempts them from regularization. Rejection only releases the pending
    /// days.
    pub async fn decide(
        &self,
        request_id: Uuid,
        decision: LeaveDecision,
        decided_by: String,
    ) -> EngineResult<LeaveRequest> {
        let employee = {
            let requests = self.requests.read().await;
            requests
                .get(&request_id)
                .ok_or_else(|| EngineError::NotFound(format!("leave request {request_id} not found")))?
                .employee
        };

        let _guard = self.locks.acquire(employee).await;

        let updated = {
            let mut requests = self.requests.write().await;
            let request = requests.get_mut(&request_id).ok_or_else(|| {
                EngineError::NotFound(format!("leave request {request_id} not found"))
            })?;
            if request.status != LeaveStatus::Pending {
                return Err(EngineError::InvalidTransition);
            }
            request.status = match decision {
                LeaveDecision::Approve => LeaveStatus::Approved,
                LeaveDecision::Reject => LeaveStatus::Rejected,
            };
            request.decided_by = Some(decided_by);
            request.decided_at = Some(Utc::now());
            request.clone()
        };

        {
            let mut consumed = self.consumed.write().await;
            let entry = consumed
                .entry((employee, updated.leave_type))
                .or_default();
            entry.pending_days -= updated.total_days;
            if decision == LeaveDecision::Approve {
                entry.used_days += updated.total_days;
            }
        }

        if decision == LeaveDecision::Approve {
            self.cover_attendance_days(&updated).await;
        }
        tracing::info!(
            %employee,
            request_id = %updated.id,
            status = %updated.status,
            "leave request decided"
        );
        Ok(updated)
    }

    /// Balance view across every leave type the effective policy entitles.
    /// Derived on read, never stored.
    pub async fn balance(&self, employee: EmployeeRef) -> EngineResult<Vec<LeaveBalance>> {
        let policy = self.resolver.resolve(employee).await?;
        let mut out = Vec::new();
        for (&leave_type, &total) in &policy.rules.leave_entitlements {
            let consumption = self.consumption(employee, leave_type).await;
            let total = i64::from(total);
            out.push(LeaveBalance {
                leave_type,
                total_days: total,
                used_days: consumption.used_days,
                pending_days: consumption.pending_days,
                remaining: total - consumption.used_days - consumption.pending_days,
            });
        }
        out.sort_by_key(|b| b.leave_type.to_string());
        Ok(out)
    }

    pub async fn get(&self, request_id: Uuid) -> Option<LeaveRequest> {
        self.requests.read().await.get(&request_id).cloned()
    }

    async fn consumption(&self, employee: EmployeeRef, leave_type: LeaveType) -> Consumption {
        self.consumed
            .read()
            .await
            .get(&(employee, leave_type))
            .copied()
            .unwrap_or_default()
    }

    async fn cover_attendance_days(&self, request: &LeaveRequest) {
        let mut date = request.start_date;
        while date <= request.end_date {
            let _guard = self.attendance.lock_day(request.employee, date).await;
            let mut day = self
                .attendance
                .get(request.employee, date)
                .await
                .unwrap_or_else(|| AttendanceDay::new(request.employee, date));
            day.leave_covered = true;
            self.attendance.put(day).await;
            let Some(next) = date.succ_opt() else { break };
            date = next;
        }
    }
}
