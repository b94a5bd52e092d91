//! Bulk hook re-registration across all jobs

mod coordinator;
mod report;

pub use coordinator::{ReRegistrationCoordinator, DEFAULT_QUEUE_DEPTH};
pub use report::{FailurePolicy, JobFailure, ReRegisterReport};
