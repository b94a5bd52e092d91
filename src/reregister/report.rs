//! Failure policy and pass report

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a pass does when one job's hook registration fails
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failure and return it
    #[default]
    Abort,
    /// Record the failure and carry on with the remaining jobs
    ContinueOnError,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "continue" | "continue-on-error" => Ok(FailurePolicy::ContinueOnError),
            other => Err(format!(
                "unknown failure policy '{other}', expected 'abort' or 'continue'"
            )),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => write!(f, "abort"),
            FailurePolicy::ContinueOnError => write!(f, "continue"),
        }
    }
}

/// A job whose `register_hooks()` failed under [`FailurePolicy::ContinueOnError`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    pub job: String,
    pub message: String,
}

/// Result of one completed re-registration pass
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReRegisterReport {
    /// Jobs whose trigger was called, successful or not
    pub triggered: usize,
    pub failures: Vec<JobFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ReRegisterReport {
    pub fn summary(&self) -> String {
        if self.failures.is_empty() {
            format!("Called re-register hooks for {} jobs", self.triggered)
        } else {
            format!(
                "Called re-register hooks for {} jobs, {} failed",
                self.triggered,
                self.failures.len()
            )
        }
    }
}
