use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::timeout;

use crate::error::{EngineError, EngineResult};
use crate::model::employee::{EmployeeRef, EmployeeScope};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("employee {0} is not registered in the directory")]
    UnknownEmployee(EmployeeRef),
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Employee/role/department directory. Owned by a collaborator; the engine
/// only ever reads `{role, department}` for an already-resolved EmployeeRef.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn employee_scope(&self, employee: EmployeeRef) -> Result<EmployeeScope, DirectoryError>;
}

/// In-process directory backing, seeded through the admin API.
pub struct InMemoryDirectory {
    entries: RwLock<HashMap<EmployeeRef, EmployeeScope>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn upsert(&self, employee: EmployeeRef, scope: EmployeeScope) {
        self.entries.write().await.insert(employee, scope);
    }
}

#[async_trait]
impl EmployeeDirectory for InMemoryDirectory {
    async fn employee_scope(&self, employee: EmployeeRef) -> Result<EmployeeScope, DirectoryError> {
        self.entries
            .read()
            .await
            .get(&employee)
            .copied()
            .ok_or(DirectoryError::UnknownEmployee(employee))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DirectoryRetry {
    pub timeout_ms: u64,
    pub retries: u32,
}

impl Default for DirectoryRetry {
    fn default() -> Self {
        Self {
            timeout_ms: 500,
            retries: 2,
        }
    }
}

/// Bounded-timeout lookup with backoff. An unknown employee is surfaced
/// immediately; timeouts and transient failures are retried up to the budget
/// and then surfaced as a retryable `DirectoryUnavailable`.
pub async fn lookup_scope(
    directory: &dyn EmployeeDirectory,
    employee: EmployeeRef,
    retry: DirectoryRetry,
) -> EngineResult<EmployeeScope> {
    let mut last_err = String::from("no attempts made");
    for attempt in 0..=retry.retries {
        match timeout(
            Duration::from_millis(retry.timeout_ms),
            directory.employee_scope(employee),
        )
        .await
        {
            Ok(Ok(scope)) => return Ok(scope),
            Ok(Err(DirectoryError::UnknownEmployee(e))) => {
                return Err(EngineError::NotFound(format!(
                    "employee {e} is not registered in the directory"
                )));
            }
            Ok(Err(DirectoryError::Unavailable(msg))) => last_err = msg,
            Err(_) => last_err = format!("lookup timed out after {}ms", retry.timeout_ms),
        }
        if attempt < retry.retries {
            tokio::time::sleep(Duration::from_millis(50 << attempt)).await;
        }
    }
    tracing::warn!(%employee, error = %last_err, "directory lookup exhausted retries");
    Err(EngineError::DirectoryUnavailable(last_err))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlakyDirectory {
        fail_first: std::sync::atomic::AtomicU32,
    }

    #[async_trait]
    impl EmployeeDirectory for FlakyDirectory {
        async fn employee_scope(
            &self,
            _employee: EmployeeRef,
        ) -> Result<EmployeeScope, DirectoryError> {
            use std::sync::atomic::Ordering;
            if self.fail_first.load(Ordering::SeqCst) > 0 {
                self.fail_first.fetch_sub(1, Ordering::SeqCst);
                return Err(DirectoryError::Unavailable("transient".into()));
            }
            Ok(EmployeeScope {
                role_id: 1,
                department_id: 2,
            })
        }
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let dir = FlakyDirectory {
            fail_first: std::sync::atomic::AtomicU32::new(2),
        };
        let scope = lookup_scope(
            &dir,
            EmployeeRef(7),
            DirectoryRetry {
                timeout_ms: 100,
                retries: 3,
            },
        )
        .await
        .unwrap();
        assert_eq!(scope.department_id, 2);
    }

    #[tokio::test]
    async fn unknown_employee_is_not_retried() {
        let dir = InMemoryDirectory::new();
        let err = lookup_scope(&dir, EmployeeRef(9), DirectoryRetry::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }
}
