use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::engine::attendance_store::AttendanceStore;
use crate::error::{EngineError, EngineResult};
use crate::model::attendance::{AttendanceDay, DayStatus, Shift};
use crate::model::employee::EmployeeRef;
use crate::model::policy::EffectivePolicy;
use crate::model::regularization::{
    ProposedShift, REASON_INSUFFICIENT_HOURS, RegularizationRequest, RequestStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

/// Approval workflow over proposed corrections to a day's recorded shifts.
pub struct RegularizationWorkflow {
    attendance: Arc<AttendanceStore>,
    requests: RwLock<HashMap<Uuid, RegularizationRequest>>,
}

impl RegularizationWorkflow {
    pub fn new(attendance: Arc<AttendanceStore>) -> Self {
        Self {
            attendance,
            requests: RwLock::new(HashMap::new()),
        }
    }

    /// Flags a closed day that fell short of its required hours.
    ///
    /// Called with the day's keyed lock held by the shift tracker. No-ops for
    /// leave-covered days, non-working days, days already flagged, and days
    /// that already carry a pending request. The caller persists `day`.
    pub async fn flag_if_needed(
        &self,
        day: &mut AttendanceDay,
        policy: &EffectivePolicy,
    ) -> Option<RegularizationRequest> {
        if day.leave_covered
            || day.status == DayStatus::PendingRegularization
            || !policy.rules.is_working_day(day.date)
            || day.worked_seconds >= policy.rules.required_seconds()
        {
            return None;
        }
        if self.pending_for(day.employee, day.date).await.is_some() {
            return None;
        }

        let request = self
            .insert_request(
                day.employee,
                day.date,
                REASON_INSUFFICIENT_HOURS.to_string(),
                day.shifts
                    .iter()
                    .filter_map(|s| {
                        s.check_out.map(|out| ProposedShift {
                            check_in: s.check_in,
                            check_out: out,
                        })
                    })
                    .collect(),
            )
            .await;

        day.status = DayStatus::PendingRegularization;
        tracing::info!(
            employee = %day.employee,
            date = %day.date,
            worked_hours = day.worked_hours(),
            required_hours = policy.rules.required_daily_hours,
            "day flagged for regularization"
        );
        Some(request)
    }

    /// Manual submission by the employee for a specific day.
    pub async fn submit(
        &self,
        employee: EmployeeRef,
        date: NaiveDate,
        reason: String,
        proposed_changes: Vec<ProposedShift>,
    ) -> EngineResult<RegularizationRequest> {
        if reason.trim().is_empty() {
            return Err(EngineError::Validation("reason must not be empty".into()));
        }
        validate_proposed(&proposed_changes)?;

        let _guard = self.attendance.lock_day(employee, date).await;
        if self.pending_for(employee, date).await.is_some() {
            return Err(EngineError::PendingRegularizationExists { employee, date });
        }
        Ok(self.insert_request(employee, date, reason, proposed_changes).await)
    }

    /// Applies a decision to a pending request.
    ///
    /// Approval replaces the day's shifts with the proposed changes (the
    /// decider may override the requester's proposal), recomputes the total
    /// and settles the day as CHECKED_OUT. Rejection leaves the day untouched.
    pub async fn decide(
        &self,
        request_id: Uuid,
        decision: Decision,
        proposed_override: Option<Vec<ProposedShift>>,
        decided_by: String,
    ) -> EngineResult<RegularizationRequest> {
        let (employee, date) = {
            let requests = self.requests.read().await;
            let request = requests
                .get(&request_id)
                .ok_or_else(|| EngineError::NotFound(format!("request {request_id} not found")))?;
            (request.employee, request.date)
        };

        // Same lock as every other mutation of this day; the pending check is
        // re-done under it so concurrent deciders cannot both pass.
        let _guard = self.attendance.lock_day(employee, date).await;

        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(&request_id)
            .ok_or_else(|| EngineError::NotFound(format!("request {request_id} not found")))?;
        if request.status != RequestStatus::Pending {
            return Err(EngineError::InvalidTransition);
        }

        if decision == Decision::Approve {
            let changes = proposed_override.unwrap_or_else(|| request.proposed_changes.clone());
            validate_proposed(&changes)?;

            let mut day = self
                .attendance
                .get(employee, date)
                .await
                .unwrap_or_else(|| AttendanceDay::new(employee, date));
            day.shifts = changes.iter().copied().map(Shift::from).collect();
            day.recompute();
            day.status = DayStatus::CheckedOut;
            self.attendance.put(day).await;

            request.proposed_changes = changes;
            request.status = RequestStatus::Approved;
        } else {
            request.status = RequestStatus::Rejected;
        }
        request.decided_by = Some(decided_by);
        request.decided_at = Some(Utc::now());
        Ok(request.clone())
    }

    pub async fn pending(&self) -> Vec<RegularizationRequest> {
        let mut out: Vec<RegularizationRequest> = self
            .requests
            .read()
            .await
            .values()
            .filter(|r| r.status == RequestStatus::Pending)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.created_at);
        out
    }

    async fn pending_for(
        &self,
        employee: EmployeeRef,
        date: NaiveDate,
    ) -> Option<RegularizationRequest> {
        self.requests
            .read()
            .await
            .values()
            .find(|r| {
                r.employee == employee && r.date == date && r.status == RequestStatus::Pending
            })
            .cloned()
    }

    async fn insert_request(
        &self,
        employee: EmployeeRef,
        date: NaiveDate,
        reason: String,
        proposed_changes: Vec<ProposedShift>,
    ) -> RegularizationRequest {
        let request = RegularizationRequest {
            id: Uuid::new_v4(),
            employee,
            date,
            reason,
            proposed_changes,
            status: RequestStatus::Pending,
            decided_by: None,
            decided_at: None,
            created_at: Utc::now(),
        };
        self.requests
            .write()
            .await
            .insert(request.id, request.clone());
        request
    }
}

/// Proposed shifts must be well-formed closed intervals, check-in ordered and
/// pairwise non-overlapping.
fn validate_proposed(changes: &[ProposedShift]) -> EngineResult<()> {
    if changes.is_empty() {
        return Err(EngineError::Validation(
            "proposed changes must contain at least one shift".into(),
        ));
    }
    for change in changes {
        if change.check_in >= change.check_out {
            return Err(EngineError::Validation(
                "proposed check-in must precede check-out".into(),
            ));
        }
    }
    for pair in changes.windows(2) {
        if pair[1].check_in < pair[0].check_out {
            return Err(EngineError::OverlappingShifts);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{EngineFixture, d, engine_with_org_policy, org_rules, ts};

    const EMP: EmployeeRef = EmployeeRef(7);

    /// Day flagged after 7.5 worked hours against a 9h requirement.
    async fn flagged_fixture() -> (EngineFixture, RegularizationRequest) {
        let engine = engine_with_org_policy(org_rules(9.0)).await;
        engine.tracker.check_in(EMP, ts("2024-03-04T09:00:00Z")).await.unwrap();
        engine.tracker.check_out(EMP, ts("2024-03-04T16:30:00Z")).await.unwrap();
        engine.tracker.close_day(EMP, d("2024-03-04")).await.unwrap();
        let request = engine.workflow.pending().await.pop().expect("auto-created request");
        (engine, request)
    }

    #[tokio::test]
    async fn approving_the_original_shifts_is_a_no_op_on_totals() {
        let (engine, request) = flagged_fixture().await;
        let before = engine.attendance.get(EMP, d("2024-03-04")).await.unwrap();

        let decided = engine
            .workflow
            .decide(request.id, Decision::Approve, None, "hr-1".into())
            .await
            .unwrap();
        assert_eq!(decided.status, RequestStatus::Approved);
        assert_eq!(decided.decided_by.as_deref(), Some("hr-1"));

        let after = engine.attendance.get(EMP, d("2024-03-04")).await.unwrap();
        assert_eq!(after.worked_seconds, before.worked_seconds);
        assert_eq!(after.status, DayStatus::CheckedOut);
    }

    #[tokio::test]
    async fn approval_replaces_shifts_and_recomputes() {
        let (engine, request) = flagged_fixture().await;
        let proposed = vec![ProposedShift {
            check_in: ts("2024-03-04T09:00:00Z"),
            check_out: ts("2024-03-04T18:00:00Z"),
        }];
        engine
            .workflow
            .decide(request.id, Decision::Approve, Some(proposed), "hr-1".into())
            .await
            .unwrap();

        let day = engine.attendance.get(EMP, d("2024-03-04")).await.unwrap();
        assert_eq!(day.worked_hours(), 9.0);
        assert_eq!(day.status, DayStatus::CheckedOut);
        assert!(day.shifts_consistent());
    }

    #[tokio::test]
    async fn overlapping_proposal_is_refused_and_request_stays_pending() {
        let (engine, request) = flagged_fixture().await;
        let proposed = vec![
            ProposedShift {
                check_in: ts("2024-03-04T09:00:00Z"),
                check_out: ts("2024-03-04T13:00:00Z"),
            },
            ProposedShift {
                check_in: ts("2024-03-04T12:00:00Z"),
                check_out: ts("2024-03-04T18:00:00Z"),
            },
        ];
        let err = engine
            .workflow
            .decide(request.id, Decision::Approve, Some(proposed), "hr-1".into())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::OverlappingShifts));
        assert_eq!(engine.workflow.pending().await.len(), 1);
    }

    #[tokio::test]
    async fn rejection_leaves_the_day_unchanged() {
        let (engine, request) = flagged_fixture().await;
        let before = engine.attendance.get(EMP, d("2024-03-04")).await.unwrap();

        let decided = engine
            .workflow
            .decide(request.id, Decision::Reject, None, "hr-1".into())
            .await
            .unwrap();
        assert_eq!(decided.status, RequestStatus::Rejected);
        assert!(decided.decided_at.is_some());

        let after = engine.attendance.get(EMP, d("2024-03-04")).await.unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn deciding_twice_is_an_invalid_transition() {
        let (engine, request) = flagged_fixture().await;
        engine
            .workflow
            .decide(request.id, Decision::Reject, None, "hr-1".into())
            .await
            .unwrap();
        let err = engine
            .workflow
            .decide(request.id, Decision::Approve, None, "hr-2".into())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition));
    }

    #[tokio::test]
    async fn one_pending_request_per_day() {
        let (engine, _request) = flagged_fixture().await;
        let err = engine
            .workflow
            .submit(
                EMP,
                d("2024-03-04"),
                "forgot to check out".into(),
                vec![ProposedShift {
                    check_in: ts("2024-03-04T09:00:00Z"),
                    check_out: ts("2024-03-04T18:00:00Z"),
                }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PendingRegularizationExists { .. }));
    }

    #[tokio::test]
    async fn short_day_outside_working_days_is_not_flagged() {
        let mut rules = org_rules(9.0);
        rules.working_days = ["Mon", "Tue", "Wed", "Thu", "Fri"]
            .into_iter()
            .map(String::from)
            .collect();
        let engine = engine_with_org_policy(rules).await;

        // 2024-03-09 is a Saturday: two worked hours close without a request.
        engine.tracker.check_in(EMP, ts("2024-03-09T09:00:00Z")).await.unwrap();
        engine.tracker.check_out(EMP, ts("2024-03-09T11:00:00Z")).await.unwrap();
        let day = engine.tracker.close_day(EMP, d("2024-03-09")).await.unwrap();

        assert_eq!(day.status, DayStatus::CheckedOut);
        assert!(engine.workflow.pending().await.is_empty());
    }

    #[tokio::test]
    async fn manual_submission_for_a_clean_day() {
        let engine = engine_with_org_policy(org_rules(9.0)).await;
        let request = engine
            .workflow
            .submit(
                EMP,
                d("2024-03-04"),
                "badge reader was down".into(),
                vec![ProposedShift {
                    check_in: ts("2024-03-04T09:00:00Z"),
                    check_out: ts("2024-03-04T18:00:00Z"),
                }],
            )
            .await
            .unwrap();
        assert_eq!(request.status, RequestStatus::Pending);

        engine
            .workflow
            .decide(request.id, Decision::Approve, None, "hr-1".into())
            .await
            .unwrap();
        let day = engine.attendance.get(EMP, d("2024-03-04")).await.unwrap();
        assert_eq!(day.worked_hours(), 9.0);
    }
}
