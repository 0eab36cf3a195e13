pub mod attendance;
pub mod directory;
pub mod leave;
pub mod policy;
pub mod regularization;
