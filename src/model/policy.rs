use std::collections::HashMap;

use chrono::{NaiveDate, Weekday};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::model::employee::EmployeeRef;
use crate::model::leave::LeaveType;

static WEEKDAYS: Lazy<HashMap<&'static str, Weekday>> = Lazy::new(|| {
    HashMap::from([
        ("Mon", Weekday::Mon),
        ("Tue", Weekday::Tue),
        ("Wed", Weekday::Wed),
        ("Thu", Weekday::Thu),
        ("Fri", Weekday::Fri),
        ("Sat", Weekday::Sat),
        ("Sun", Weekday::Sun),
    ])
});

/// Assignment scope of a policy. Precedence when resolving:
/// User > Department > Role > Organization (most specific wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyScope {
    Organization,
    Role(u64),
    Department(u64),
    User(EmployeeRef),
}

/// Flat scope discriminant used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    Organization,
    Role,
    Department,
    User,
}

impl PolicyScope {
    /// Builds a scope from its wire form; Organization takes no target,
    /// every other scope type requires one.
    pub fn from_parts(scope_type: ScopeType, target: Option<u64>) -> EngineResult<Self> {
        match (scope_type, target) {
            (ScopeType::Organization, None) => Ok(PolicyScope::Organization),
            (ScopeType::Organization, Some(_)) => Err(EngineError::Validation(
                "organization scope takes no target id".into(),
            )),
            (ScopeType::Role, Some(id)) => Ok(PolicyScope::Role(id)),
            (ScopeType::Department, Some(id)) => Ok(PolicyScope::Department(id)),
            (ScopeType::User, Some(id)) => Ok(PolicyScope::User(EmployeeRef(id))),
            (_, None) => Err(EngineError::Validation(
                "scope target id is required for non-organization scopes".into(),
            )),
        }
    }

    pub fn scope_type(&self) -> ScopeType {
        match self {
            PolicyScope::Organization => ScopeType::Organization,
            PolicyScope::Role(_) => ScopeType::Role,
            PolicyScope::Department(_) => ScopeType::Department,
            PolicyScope::User(_) => ScopeType::User,
        }
    }

    pub fn target(&self) -> Option<u64> {
        match self {
            PolicyScope::Organization => None,
            PolicyScope::Role(id) | PolicyScope::Department(id) => Some(*id),
            PolicyScope::User(e) => Some(e.0),
        }
    }
}

/// Rule set attached to a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "required_daily_hours": 8.0,
    "max_idle_gap_minutes": 45,
    "auto_checkout_after_hours": 12,
    "timezone": "Asia/Dhaka",
    "working_days": ["Mon", "Tue", "Wed", "Thu", "Fri"],
    "leave_entitlements": { "annual": 20, "sick": 10 }
}))]
pub struct PolicyRules {
    #[schema(example = 8.0)]
    pub required_daily_hours: f64,
    #[schema(example = 45)]
    pub max_idle_gap_minutes: i64,
    #[schema(example = 12)]
    pub auto_checkout_after_hours: i64,
    /// IANA timezone name the policy's day boundaries are computed in.
    #[schema(example = "Asia/Dhaka")]
    pub timezone: String,
    /// Three-letter English day names, e.g. "Mon".
    #[schema(example = json!(["Mon", "Tue", "Wed", "Thu", "Fri"]))]
    pub working_days: Vec<String>,
    /// Per-leave-type entitlement in days; types absent here cannot be requested.
    #[schema(value_type = Object, example = json!({ "annual": 20, "sick": 10 }))]
    #[serde(default)]
    pub leave_entitlements: HashMap<LeaveType, u32>,
}

impl PolicyRules {
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.required_daily_hours > 0.0 && self.required_daily_hours <= 24.0) {
            return Err(EngineError::Validation(
                "required_daily_hours must be in (0, 24]".into(),
            ));
        }
        if self.max_idle_gap_minutes <= 0 {
            return Err(EngineError::Validation(
                "max_idle_gap_minutes must be positive".into(),
            ));
        }
        if !(1..=24).contains(&self.auto_checkout_after_hours) {
            return Err(EngineError::Validation(
                "auto_checkout_after_hours must be in 1..=24".into(),
            ));
        }
        self.tz()?;
        for day in &self.working_days {
            if !WEEKDAYS.contains_key(day.as_str()) {
                return Err(EngineError::Validation(format!(
                    "unknown weekday name: {day}"
                )));
            }
        }
        Ok(())
    }

    pub fn tz(&self) -> EngineResult<Tz> {
        self.timezone
            .parse()
            .map_err(|_| EngineError::Validation(format!("invalid timezone: {}", self.timezone)))
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        use chrono::Datelike;
        let wd = date.weekday();
        self.working_days
            .iter()
            .any(|d| WEEKDAYS.get(d.as_str()) == Some(&wd))
    }

    /// Required daily presence, full precision.
    pub fn required_seconds(&self) -> i64 {
        (self.required_daily_hours * 3600.0).round() as i64
    }

    pub fn idle_gap(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.max_idle_gap_minutes)
    }

    pub fn auto_checkout_ceiling(&self) -> chrono::Duration {
        chrono::Duration::hours(self.auto_checkout_after_hours)
    }

    pub fn entitlement(&self, leave_type: LeaveType) -> u32 {
        self.leave_entitlements
            .get(&leave_type)
            .copied()
            .unwrap_or(0)
    }
}

/// A stored policy definition. At most one policy exists per scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub id: Uuid,
    pub name: String,
    pub scope: PolicyScope,
    pub rules: PolicyRules,
}

/// The policy chosen for one employee after applying scope precedence.
/// Derived, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectivePolicy {
    pub policy_id: Uuid,
    pub name: String,
    pub scope_type: ScopeType,
    pub rules: PolicyRules,
}

impl EffectivePolicy {
    pub fn from_policy(policy: &Policy) -> Self {
        Self {
            policy_id: policy.id,
            name: policy.name.clone(),
            scope_type: policy.scope.scope_type(),
            rules: policy.rules.clone(),
        }
    }
}
