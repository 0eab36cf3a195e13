use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::employee::EmployeeRef;

/// One continuous check-in-to-check-out interval within a day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Shift {
    #[schema(format = "date-time", value_type = String, example = "2024-03-04T09:00:00Z")]
    pub check_in: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String, example = "2024-03-04T17:30:00Z", nullable = true)]
    pub check_out: Option<DateTime<Utc>>,
}

impl Shift {
    pub fn is_open(&self) -> bool {
        self.check_out.is_none()
    }

    /// Duration of a closed shift in seconds; open shifts contribute nothing.
    pub fn worked_seconds(&self) -> i64 {
        match self.check_out {
            Some(out) => (out - self.check_in).num_seconds(),
            None => 0,
        }
    }

    /// Overlap test over closed intervals; an open shift extends to infinity.
    pub fn overlaps(&self, other: &Shift) -> bool {
        let self_end = self.check_out.unwrap_or(DateTime::<Utc>::MAX_UTC);
        let other_end = other.check_out.unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.check_in < other_end && other.check_in < self_end
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DayStatus {
    NotStarted,
    Active,
    CheckedOut,
    AutoCheckedOut,
    PendingRegularization,
}

/// Per-day attendance record, keyed by (employee, date in policy timezone).
///
/// Invariants: shifts are check-in ordered and pairwise non-overlapping, and
/// at most one shift is open at a time. Records are amended, never deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceDay {
    pub employee: EmployeeRef,
    pub date: NaiveDate,
    pub shifts: Vec<Shift>,
    pub status: DayStatus,
    /// Full-precision aggregate of closed shifts; rounding to hours happens
    /// only at the presentation boundary.
    pub worked_seconds: i64,
    /// Set when an approved leave covers this date; exempts the day from
    /// regularization.
    pub leave_covered: bool,
    /// Advisory idle-gap marker; never closes a shift by itself.
    pub idle_flagged: bool,
}

impl AttendanceDay {
    pub fn new(employee: EmployeeRef, date: NaiveDate) -> Self {
        Self {
            employee,
            date,
            shifts: Vec::new(),
            status: DayStatus::NotStarted,
            worked_seconds: 0,
            leave_covered: false,
            idle_flagged: false,
        }
    }

    pub fn open_shift(&self) -> Option<&Shift> {
        self.shifts.last().filter(|s| s.is_open())
    }

    pub fn open_shift_mut(&mut self) -> Option<&mut Shift> {
        self.shifts.last_mut().filter(|s| s.is_open())
    }

    /// Recomputes the worked-seconds aggregate. Called after every mutation.
    pub fn recompute(&mut self) {
        self.worked_seconds = self.shifts.iter().map(Shift::worked_seconds).sum();
    }

    /// Worked hours rounded to two decimals, for the presentation boundary.
    pub fn worked_hours(&self) -> f64 {
        (self.worked_seconds as f64 / 3600.0 * 100.0).round() / 100.0
    }

    /// Checks the ordering and non-overlap invariants over the current shifts.
    pub fn shifts_consistent(&self) -> bool {
        for pair in self.shifts.windows(2) {
            if pair[1].check_in < pair[0].check_in || pair[0].overlaps(&pair[1]) {
                return false;
            }
        }
        self.shifts
            .iter()
            .rev()
            .skip(1)
            .all(|s| !s.is_open())
    }
}
