use std::sync::Arc;

use crate::config::Config;
use crate::directory::{DirectoryRetry, InMemoryDirectory};
use crate::engine::attendance_store::AttendanceStore;
use crate::engine::leave_ledger::LeaveLedger;
use crate::engine::policy_resolver::PolicyResolver;
use crate::engine::policy_store::PolicyStore;
use crate::engine::regularization::RegularizationWorkflow;
use crate::engine::shift_tracker::ShiftTracker;

/// Engine wiring shared with every handler and the background sweep.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<InMemoryDirectory>,
    pub policies: Arc<PolicyStore>,
    pub resolver: Arc<PolicyResolver>,
    pub attendance: Arc<AttendanceStore>,
    pub workflow: Arc<RegularizationWorkflow>,
    pub tracker: Arc<ShiftTracker>,
    pub ledger: Arc<LeaveLedger>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        let policies = Arc::new(PolicyStore::new());
        let resolver = Arc::new(PolicyResolver::new(
            policies.clone(),
            directory.clone(),
            DirectoryRetry {
                timeout_ms: config.directory_timeout_ms,
                retries: config.directory_retries,
            },
        ));
        let attendance = Arc::new(AttendanceStore::new());
        let workflow = Arc::new(RegularizationWorkflow::new(attendance.clone()));
        let tracker = Arc::new(ShiftTracker::new(
            attendance.clone(),
            resolver.clone(),
            workflow.clone(),
        ));
        let ledger = Arc::new(LeaveLedger::new(resolver.clone(), attendance.clone()));

        Self {
            directory,
            policies,
            resolver,
            attendance,
            workflow,
            tracker,
            ledger,
        }
    }
}
