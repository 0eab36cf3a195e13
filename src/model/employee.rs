use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Canonical employee identity inside the engine.
///
/// The surrounding product merges `id`/`userId` lookups ad hoc; here the
/// identity is resolved once at the boundary and never re-derived.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, ToSchema,
)]
pub struct EmployeeRef(pub u64);

/// Directory scope for one employee, as reported by the directory collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "role_id": 3, "department_id": 10 }))]
pub struct EmployeeScope {
    #[schema(example = 3)]
    pub role_id: u64,
    #[schema(example = 10)]
    pub department_id: u64,
}
