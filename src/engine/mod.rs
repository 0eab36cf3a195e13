pub mod attendance_store;
pub mod leave_ledger;
pub mod policy_resolver;
pub mod policy_store;
pub mod regularization;
pub mod shift_tracker;

#[cfg(test)]
pub(crate) mod test_support;
