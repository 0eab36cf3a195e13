use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{OwnedMutexGuard, RwLock};

use crate::model::attendance::AttendanceDay;
use crate::model::employee::EmployeeRef;
use crate::utils::keyed_lock::KeyedLock;

pub type DayKey = (EmployeeRef, NaiveDate);

/// Shared attendance state: the per-day records, the per-day mutation locks,
/// and two small indexes (which employee has an open shift, which days still
/// await their boundary close).
///
/// Every read-modify-write of a day must hold the guard returned by
/// [`AttendanceStore::lock_day`] for the duration of the update; the inner
/// RwLock only protects individual map accesses.
pub struct AttendanceStore {
    days: RwLock<HashMap<DayKey, AttendanceDay>>,
    open: RwLock<HashMap<EmployeeRef, NaiveDate>>,
    unclosed: RwLock<HashSet<DayKey>>,
    activity: RwLock<HashMap<DayKey, DateTime<Utc>>>,
    locks: KeyedLock<DayKey>,
}

impl AttendanceStore {
    pub fn new() -> Self {
        Self {
            days: RwLock::new(HashMap::new()),
            open: RwLock::new(HashMap::new()),
            unclosed: RwLock::new(HashSet::new()),
            activity: RwLock::new(HashMap::new()),
            locks: KeyedLock::new(),
        }
    }

    pub async fn lock_day(&self, employee: EmployeeRef, date: NaiveDate) -> OwnedMutexGuard<()> {
        self.locks.acquire((employee, date)).await
    }

    pub async fn get(&self, employee: EmployeeRef, date: NaiveDate) -> Option<AttendanceDay> {
        self.days.read().await.get(&(employee, date)).cloned()
    }

    pub async fn put(&self, day: AttendanceDay) {
        let has_open = day.open_shift().is_some();
        let key = (day.employee, day.date);
        self.days.write().await.insert(key, day);

        let mut open = self.open.write().await;
        if has_open {
            open.insert(key.0, key.1);
        } else if open.get(&key.0) == Some(&key.1) {
            open.remove(&key.0);
        }
        drop(open);

        // A closed day has no open shift to be idle.
        if !has_open {
            self.activity.write().await.remove(&key);
        }
    }

    /// Last evaluation tick recorded for the day's open shift.
    pub async fn last_activity(
        &self,
        employee: EmployeeRef,
        date: NaiveDate,
    ) -> Option<DateTime<Utc>> {
        self.activity.read().await.get(&(employee, date)).copied()
    }

    pub async fn touch_activity(&self, employee: EmployeeRef, date: NaiveDate, at: DateTime<Utc>) {
        self.activity.write().await.insert((employee, date), at);
    }

    /// Date of the employee's currently open shift, if any.
    pub async fn open_date(&self, employee: EmployeeRef) -> Option<NaiveDate> {
        self.open.read().await.get(&employee).copied()
    }

    /// All (employee, date) pairs with an open shift; one sweep tick each.
    pub async fn open_entries(&self) -> Vec<DayKey> {
        self.open
            .read()
            .await
            .iter()
            .map(|(e, d)| (*e, *d))
            .collect()
    }

    pub async fn mark_unclosed(&self, employee: EmployeeRef, date: NaiveDate) {
        self.unclosed.write().await.insert((employee, date));
    }

    pub async fn mark_closed(&self, employee: EmployeeRef, date: NaiveDate) {
        self.unclosed.write().await.remove(&(employee, date));
    }

    /// Days that have not yet had their boundary close evaluated.
    pub async fn unclosed_entries(&self) -> Vec<DayKey> {
        self.unclosed.read().await.iter().copied().collect()
    }

    /// Read-only projection for reports: all days for one employee (or all
    /// employees) in an inclusive date range, ordered by (employee, date).
    pub async fn range(
        &self,
        employee: Option<EmployeeRef>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<AttendanceDay> {
        let days = self.days.read().await;
        let mut out: Vec<AttendanceDay> = days
            .values()
            .filter(|d| d.date >= from && d.date <= to)
            .filter(|d| employee.is_none_or(|e| d.employee == e))
            .cloned()
            .collect();
        out.sort_by_key(|d| (d.employee, d.date));
        out
    }
}
